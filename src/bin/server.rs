use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use roll_slicer::config::{DEFAULT_OVERLAP, PlannerConfig};
use roll_slicer::error::PlanError;
use roll_slicer::export::grid_tasks;
use roll_slicer::grid;
use roll_slicer::planner::{PlanOutcome, Planner};
use roll_slicer::types::{
    Dimensions, GridPartition, PixelRect, PlanMode, SourceImage, deserialize_u32_from_number,
};
use roll_slicer::units::{MM_PER_INCH, Unit};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

type ApiError = (StatusCode, String);

#[derive(Deserialize, Serialize)]
struct ImageSize {
    width: f64,
    height: f64,
    #[serde(default)]
    unit: Unit,
    /// Required when `unit` is px.
    #[serde(default)]
    dpi: Option<f64>,
}

impl ImageSize {
    fn to_dimensions(&self) -> Result<Dimensions, PlanError> {
        match self.unit {
            Unit::Mm => Ok(Dimensions::new(self.width, self.height)),
            Unit::Px => {
                let dpi = self.dpi.ok_or_else(|| {
                    PlanError::InvalidInput("dpi is required for pixel sizes".to_string())
                })?;
                Dimensions::from_pixels(self.width, self.height, dpi)
            }
        }
    }
}

#[derive(Deserialize, Serialize)]
struct PlansRequest {
    #[serde(flatten)]
    size: ImageSize,
    #[serde(flatten)]
    config: PlannerConfig,
}

#[derive(Serialize)]
struct PlansResponse {
    status: &'static str,
    original_area: f64,
    plans: Vec<PlanResponse>,
}

#[derive(Serialize)]
struct PlanResponse {
    number: usize,
    best: bool,
    mode: PlanMode,
    roll_width: f64,
    usable_width: f64,
    strip_widths: Vec<f64>,
    piece_count: usize,
    cut_count: usize,
    total_area: f64,
    savings_percent: f64,
}

#[derive(Deserialize, Serialize)]
struct GridRequest {
    #[serde(flatten)]
    size: ImageSize,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    cols: u32,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    rows: u32,
    #[serde(default = "default_overlap")]
    overlap: f64,
}

fn default_overlap() -> f64 {
    DEFAULT_OVERLAP
}

#[derive(Serialize)]
struct GridResponse {
    #[serde(flatten)]
    partition: GridPartition,
    piece_count: u64,
    /// Tile rectangles in mm, row by row.
    pieces: Vec<PixelRect>,
}

fn bad_request(e: PlanError) -> ApiError {
    (StatusCode::BAD_REQUEST, e.to_string())
}

async fn plans(Json(req): Json<PlansRequest>) -> Result<Json<PlansResponse>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /plans"
    );

    let dims = req.size.to_dimensions().map_err(bad_request)?;
    let original_area = dims.area();
    let outcome = Planner::new(req.config)
        .plan(dims)
        .map_err(bad_request)?;

    let status = match outcome {
        PlanOutcome::Ranked(_) => "ranked",
        PlanOutcome::NoFeasiblePlan => "no_feasible_plan",
    };
    let plans = outcome
        .into_plans()
        .into_iter()
        .enumerate()
        .map(|(i, p)| PlanResponse {
            number: i + 1,
            best: i == 0,
            mode: p.mode,
            roll_width: p.roll_width,
            usable_width: p.usable_width,
            piece_count: p.piece_count(),
            cut_count: p.cut_count(),
            total_area: p.total_area,
            savings_percent: p.savings_percent(original_area),
            strip_widths: p.strip_widths,
        })
        .collect();

    Ok(Json(PlansResponse {
        status,
        original_area,
        plans,
    }))
}

async fn grid_partition(Json(req): Json<GridRequest>) -> Result<Json<GridResponse>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /grid"
    );

    let dims = req.size.to_dimensions().map_err(bad_request)?;
    let partition =
        grid::partition(dims, req.cols, req.rows, req.overlap).map_err(bad_request)?;

    // At 25.4 dpi pixel coordinates are millimetres.
    let canvas = SourceImage::new("", dims.width, dims.height, MM_PER_INCH);
    let pieces = grid_tasks(&partition, &canvas)
        .map_err(bad_request)?
        .into_iter()
        .map(|t| t.rect)
        .collect();

    Ok(Json(GridResponse {
        piece_count: partition.piece_count(),
        partition,
        pieces,
    }))
}

#[tokio::main]
async fn main() {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/plans", post(plans))
        .route("/grid", post(grid_partition))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.expect("server error");
}
