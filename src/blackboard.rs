use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use mazebot_geometry::Pose2D;
use mazebot_navigation::{ExplorationEvent, ExplorationState};

/// Latest telemetry of the running session.
#[derive(Debug, Clone)]
pub struct State {
    pub state: ExplorationState,
    pub pose: Pose2D,
    pub step: u64,
    pub progress: f32,
    pub explored_ratio: f32,
    pub obstacle_points: usize,
    pub keyframes: usize,
    pub loop_closures: usize,
    pub last_status: String,
    pub last_update_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            state: ExplorationState::Initialization,
            pose: Pose2D::default(),
            step: 0,
            progress: 0.0,
            explored_ratio: 0.0,
            obstacle_points: 0,
            keyframes: 0,
            loop_closures: 0,
            last_status: String::new(),
            last_update_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

/// Folds one session event into the blackboard.
pub fn record(bb: &Blackboard, event: &ExplorationEvent) {
    let mut g = bb.write();
    match event {
        ExplorationEvent::StateChanged(state) => g.state = *state,
        ExplorationEvent::Status(status) => g.last_status.clone_from(status),
        ExplorationEvent::Progress(progress) => g.progress = *progress,
        ExplorationEvent::PoseChanged(pose) => g.pose = *pose,
        ExplorationEvent::MapUpdated(summary) => {
            g.step = summary.step;
            g.explored_ratio = summary.explored_ratio;
            g.obstacle_points = summary.obstacle_points;
            g.keyframes = summary.keyframes;
            g.loop_closures = summary.loop_closures;
        }
    }
    g.last_update_ts = Instant::now();
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mazebot_navigation::exploration::MapSummary;

    #[test]
    fn test_record() {
        let bb: Blackboard = Arc::default();
        record(&bb, &ExplorationEvent::StateChanged(ExplorationState::Exploration));
        record(&bb, &ExplorationEvent::PoseChanged(Pose2D::new(1.0, 2.0, 0.5)));
        record(
            &bb,
            &ExplorationEvent::MapUpdated(MapSummary {
                step: 7,
                keyframes: 2,
                ..Default::default()
            }),
        );

        let s = snapshot(&bb);
        assert_eq!(s.state, ExplorationState::Exploration);
        assert_eq!(s.pose, Pose2D::new(1.0, 2.0, 0.5));
        assert_eq!(s.step, 7);
        assert_eq!(s.keyframes, 2);
    }

    #[test]
    fn test_raise_fault_dedups() {
        let bb: Blackboard = Arc::default();
        raise_fault(&bb, "tick limit reached");
        raise_fault(&bb, "tick limit reached");
        assert_eq!(snapshot(&bb).faults, vec!["tick limit reached".to_string()]);
    }
}
