use mazebot_geometry::{GridPoint, WorldPoint};
use mazebot_navigation::astar::astar_search;
use mazebot_navigation::map::{Grid, MapConfig, OccupancyMap};
use mazebot_navigation::{PathPlanner, PlannerConfig};
use std::collections::HashSet;

fn main() {
    // 1 = blocked, row 0 printed first
    let layout = [
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        [0, 1, 1, 0, 0, 0, 0, 1, 1, 0],
        [0, 0, 0, 0, 1, 0, 0, 0, 0, 0],
        [0, 0, 1, 1, 1, 1, 0, 1, 0, 0],
        [0, 0, 0, 0, 0, 1, 0, 1, 0, 0],
        [0, 1, 1, 1, 0, 1, 0, 1, 1, 0],
        [0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
        [0, 1, 0, 1, 0, 1, 1, 1, 0, 0],
        [0, 1, 0, 0, 0, 0, 0, 0, 1, 0],
        [0, 0, 0, 1, 1, 1, 0, 0, 0, 0],
    ];

    let mut blocked = Grid::new(10, 10, false);
    for (y, row) in layout.iter().enumerate() {
        for (x, &v) in row.iter().enumerate() {
            if let Some(cell) = blocked.get_mut(GridPoint::new(x as i32, y as i32)) {
                *cell = v == 1;
            }
        }
    }

    let start = GridPoint::new(0, 0);
    let goal = GridPoint::new(9, 9);
    println!("Start: {start}, Goal: {goal}");

    let result = astar_search(&blocked, start, goal, 1.0);
    println!("{result}");

    if let (Some(path), Some(cost)) = (&result.path, result.total_cost) {
        println!("Path found with {} cells, cost {:.2}", path.len(), cost);
        let on_path: HashSet<GridPoint> = path.iter().copied().collect();

        for y in 0..10 {
            for x in 0..10 {
                let p = GridPoint::new(x, y);
                let c = if p == start {
                    'S'
                } else if p == goal {
                    'G'
                } else if on_path.contains(&p) {
                    '*'
                } else if blocked.get(p).copied().unwrap_or(false) {
                    'X'
                } else {
                    '.'
                };
                print!("{c} ");
            }
            println!();
        }
    } else {
        println!("No path found.");
    }

    // The same search through the planner, around a wall of obstacle points
    let mut map = OccupancyMap::new(MapConfig {
        resolution: 0.05,
        width: 20.0,
        height: 20.0,
        origin: WorldPoint::new(10.0, 10.0),
        max_range: 5.0,
        hit_probability: 0.7,
        miss_probability: 0.3,
    });
    for i in 0..20 {
        map.add_obstacle_point(WorldPoint::new(1.0, -1.0 + i as f32 * 0.1));
    }

    let mut planner = PathPlanner::new(PlannerConfig::default());
    if planner.plan_path(WorldPoint::new(0.0, 0.0), WorldPoint::new(2.0, 0.0), &map) {
        println!("\nPlanner: {}", planner.statistics());
        planner.simplify_path();
        println!("Simplified: {}", planner.statistics());
        for p in planner.path() {
            println!("  {p}");
        }
    } else {
        println!("\nPlanner found no path after {} nodes", planner.nodes_explored());
    }
}
