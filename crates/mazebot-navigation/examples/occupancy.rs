use std::f32::consts::TAU;

use mazebot_geometry::{Pose2D, WorldPoint};
use mazebot_navigation::{MapConfig, OccupancyMap};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .init();

    let mut map = OccupancyMap::new(MapConfig {
        resolution: 0.1,
        width: 4.0,
        height: 4.0,
        origin: WorldPoint::new(2.0, 2.0),
        max_range: 5.0,
        hit_probability: 0.7,
        miss_probability: 0.3,
    });

    // A robot in the middle of a 3m x 3m box, scanning while it turns
    let half = 1.45;
    for step in 0..8 {
        let pose = Pose2D::new(0.05, 0.05, step as f32 * TAU / 8.0);
        let scan: Vec<WorldPoint> = (0..36)
            .filter_map(|i| {
                let bearing = pose.theta + i as f32 * TAU / 36.0;
                let (s, c) = (bearing.sin(), bearing.cos());
                // Distance to the box walls along this bearing
                let tx = if c.abs() > 1e-6 { (half - pose.x * c.signum()) / c.abs() } else { f32::INFINITY };
                let ty = if s.abs() > 1e-6 { (half - pose.y * s.signum()) / s.abs() } else { f32::INFINITY };
                let range = tx.min(ty);
                // Back into the robot frame
                let local = i as f32 * TAU / 36.0;
                (range < 5.0).then(|| WorldPoint::new(range * local.cos(), range * local.sin()))
            })
            .collect();
        map.update(pose, &scan);
    }

    println!("{}", map.occupancy_grid());
    println!("{}", map.statistics());
    println!("explored: {:.1}%", map.explored_ratio() * 100.0);
}
