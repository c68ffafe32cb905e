use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json,
    Router,
};
use catch_panic::CatchPanicLayer;
use derive_new::new;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use simple_route::{FloorPlan, FloorPlans, Point, Route, RouteError, RouteWalker, Segment, WalkConfig};
use tower_http::catch_panic;

#[derive(Clone)]
struct AppState {
    floor_plans: &'static FloorPlans,
}

impl AppState {
    fn new(floor_plans: FloorPlans) -> Self {
        Self {
            floor_plans: Box::leak(Box::new(floor_plans)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("================Starting server================");

    let port = std::env::var("PORT").unwrap_or("8080".to_string());
    let floors_path = std::env::var("FLOORS_PATH").unwrap_or("./floors.zip".to_string());

    tracing_subscriber::fmt::init();

    let floor_plans = FloorPlans::load(&floors_path)?;

    let app_state = AppState::new(floor_plans);

    let app = Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route("/find-route", post(find_route))
        .route("/route", post(route))
        .layer(CatchPanicLayer::new())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!("listening on {port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize, new)]
struct RouteRes {
    segments: Vec<Segment>,
    waypoints: Vec<Point>,
    stalled_steps: Vec<usize>,
}

impl From<Route> for RouteRes {
    fn from(route: Route) -> Self {
        Self::new(
            route.segments().to_vec(),
            route.waypoints(),
            route.stalled_steps().to_vec(),
        )
    }
}

fn route_response(result: Result<Route, RouteError>) -> Response {
    match result {
        Ok(route) => (StatusCode::OK, Json(RouteRes::from(route))).into_response(),
        Err(e) => {
            warn!("route failed: {e}");
            (StatusCode::BAD_REQUEST, format!("{e}")).into_response()
        }
    }
}

#[derive(Deserialize)]
struct FindRouteReq {
    floor: i32,
    #[serde(default)]
    config: WalkConfig,
}

async fn find_route(state: State<AppState>, Json(req): Json<FindRouteReq>) -> Response {
    let floor_plan = usize::try_from(req.floor)
        .ok()
        .and_then(|floor| state.floor_plans.get_floor(floor));

    match floor_plan {
        Some(floor_plan) => route_response(RouteWalker::new(req.config).walk(floor_plan)),
        None => (StatusCode::BAD_REQUEST, format!("No floor {}", req.floor)).into_response(),
    }
}

#[derive(Deserialize)]
struct RouteReq {
    floor_plan: FloorPlan,
    #[serde(default)]
    config: WalkConfig,
}

async fn route(Json(req): Json<RouteReq>) -> Response {
    route_response(RouteWalker::new(req.config).walk(&req.floor_plan))
}
