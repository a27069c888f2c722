use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use extrusion_optimizer::config::ServerConfig;
use extrusion_optimizer::types::{DemandLine, OptimizationResult, StockOption};
use extrusion_optimizer::{BestLengthSearch, OptimizeError, Solver};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Clone)]
struct AppState {
    parallel: bool,
}

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    demand: Vec<DemandLine>,
    stock_options: Vec<StockOption>,
    #[serde(default)]
    kerf: f64,
}

#[derive(Deserialize, Serialize)]
struct BestLengthRequest {
    demand: Vec<DemandLine>,
    min_length: u32,
    max_length: u32,
    #[serde(default)]
    kerf: f64,
}

#[derive(Serialize)]
struct BestLengthResponse {
    stock_length: u32,
}

type ApiError = (StatusCode, String);

fn validate_kerf(kerf: f64) -> Result<(), ApiError> {
    if !kerf.is_finite() || kerf < 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "kerf must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

fn validate_demand(demand: &[DemandLine]) -> Result<(), ApiError> {
    for (i, d) in demand.iter().enumerate() {
        if d.part_number.is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("demand line {}: part number is required", i + 1),
            ));
        }
        if !d.length.is_finite() || d.length <= 0.0 {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("demand line {}: length must be positive", i + 1),
            ));
        }
    }
    Ok(())
}

fn validate_stock(stock: &[StockOption]) -> Result<(), ApiError> {
    for (i, s) in stock.iter().enumerate() {
        let lengths_ok = s.length1.is_finite()
            && s.length1 > 0.0
            && s.length2.is_finite()
            && s.length2 >= 0.0;
        if !lengths_ok {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("stock option {}: lengths must be positive", i + 1),
            ));
        }
    }
    Ok(())
}

/// Bad input maps to 400; anything else is our defect and is reported.
fn map_error(err: OptimizeError) -> ApiError {
    if err.is_user_error() {
        (StatusCode::BAD_REQUEST, err.to_string())
    } else {
        tracing::error!(error = %err, "optimizer failure");
        sentry::capture_error(&err);
        (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

fn map_join_error(err: tokio::task::JoinError) -> ApiError {
    tracing::error!(error = %err, "optimizer task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "optimizer task failed".to_string(),
    )
}

async fn optimize(
    State(state): State<AppState>,
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizationResult>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    validate_kerf(req.kerf)?;
    validate_demand(&req.demand)?;
    validate_stock(&req.stock_options)?;

    let result = tokio::task::spawn_blocking(move || {
        Solver::new(&req.demand, &req.stock_options, req.kerf)
            .parallel(state.parallel)
            .solve()
    })
    .await
    .map_err(map_join_error)?
    .map_err(map_error)?;

    Ok(Json(result))
}

async fn best_length(
    State(state): State<AppState>,
    Json(req): Json<BestLengthRequest>,
) -> Result<Json<BestLengthResponse>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /best-length"
    );

    validate_kerf(req.kerf)?;
    validate_demand(&req.demand)?;
    if req.min_length > req.max_length {
        return Err((
            StatusCode::BAD_REQUEST,
            "min_length must not exceed max_length".to_string(),
        ));
    }

    let stock_length = tokio::task::spawn_blocking(move || {
        BestLengthSearch::new(&req.demand, req.min_length, req.max_length, req.kerf)
            .parallel(state.parallel)
            .run()
    })
    .await
    .map_err(map_join_error)?
    .map_err(map_error)?;

    Ok(Json(BestLengthResponse { stock_length }))
}

fn main() {
    let config = ServerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    // Sentry must be up before the runtime starts its worker threads.
    let _sentry = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to open {}: {e}", config.log_file.display());
            std::process::exit(1);
        });

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to start runtime: {e}");
            std::process::exit(1);
        })
        .block_on(serve(config));
}

async fn serve(config: ServerConfig) {
    let addr = config.addr();
    let state = AppState {
        parallel: config.parallel,
    };

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .route("/best-length", post(best_length))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error: failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    eprintln!("Listening on {addr}");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server stopped");
    }
}
