use simple_route::{FloorPlans, RouteWalker};

fn main() {
    let floor_plans = FloorPlans::load("floors.zip").unwrap();

    let floor = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<usize>().ok())
        .unwrap_or(0);

    let route_result = floor_plans
        .get_floor(floor)
        .ok_or_else(|| format!("no floor {floor}"))
        .and_then(|floor_plan| {
            RouteWalker::default()
                .walk(floor_plan)
                .map_err(|e| e.to_string())
        });

    println!("{:?}", route_result.map(|route| route.waypoints()));
}
