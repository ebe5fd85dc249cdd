//! The exploration session: strategies and the state machine that drives them.
//!
//! ```text
//! Initialization ──► Exploration ──(goal in range)──────► NavigateToGoal
//!                       ▲    │                               │      │
//!                       │    └─(step limit)─► SearchGoal ────┘      │
//!                       └─────(goal unreachable)─┘    ▲  (path      │
//!                                                     │  exhausted) │
//!                                                     └─────────────┤
//!                                                     (goal reached)▼
//!            Completed ◄──(back at start, or give up)── Navigation ◄── PathPlanning
//! ```
//!
//! `stop` moves any state to `Completed`.

pub mod config;
pub mod state;
pub mod state_machine;
pub mod strategy;

pub use config::{ControllerVariant, ExplorationConfig, ExplorationParams};
pub use state::{ExplorationEvent, ExplorationState, MapSummary};
pub use state_machine::ExplorationStateMachine;
pub use strategy::{Action, ExplorationStrategy, FrontierBased, Hybrid, RandomWalk, StrategyKind, WallFollowing};
