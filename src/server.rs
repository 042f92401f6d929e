use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::cli::ServeArgs;
use crate::dataset::hospitals::HospitalDirectory;
use crate::dataset::medicines::MedicineCatalog;
use crate::error::LookupError;
use crate::explain::Explainer;
use crate::matcher::MatchResult;
use crate::service::{self, ErrorBody};

#[derive(Clone)]
pub struct AppState {
    pub medicines: Arc<MedicineCatalog>,
    pub hospitals: Arc<HospitalDirectory>,
    pub explainer: Explainer,
    pub threshold: u8,
}

pub async fn run(opts: ServeArgs) -> anyhow::Result<()> {
    let paths = opts.data.paths();
    tracing::info!("data_dir={}", paths.data_dir.display());

    let medicines = MedicineCatalog::open(&paths.medicines_csv).with_context(|| {
        format!(
            "load medicine catalog from {}",
            paths.medicines_csv.display()
        )
    })?;
    let hospitals = HospitalDirectory::open(&paths.hospitals_csv).with_context(|| {
        format!(
            "load hospital directory from {}",
            paths.hospitals_csv.display()
        )
    })?;

    let explainer = Explainer::new(opts.explain.to_config())?;
    if !explainer.is_configured() {
        tracing::warn!("No API key configured; /med/explain will return error text as analysis");
    }

    let state = AppState {
        medicines: Arc::new(medicines),
        hospitals: Arc::new(hospitals),
        explainer,
        threshold: opts.threshold,
    };

    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .context("parse host:port")?;

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(api_root))
        .route("/med", get(api_medicine))
        .route("/med/explain", get(api_medicine_explain))
        .route("/hospitals", get(api_hospitals))
        .route("/nearest_hospitals", get(api_nearest_hospitals))
        .layer(cors)
        .with_state(state)
}

fn error_response(code: StatusCode, msg: impl Into<String>) -> Response {
    (code, Json(ErrorBody::new(msg))).into_response()
}

fn lookup_error_response(e: &LookupError) -> Response {
    match e {
        LookupError::InvalidQuery(_) => {
            (StatusCode::BAD_REQUEST, Json(ErrorBody::from(e))).into_response()
        }
        LookupError::DataLoad { .. } | LookupError::MissingColumn { .. } => {
            tracing::error!("Data load failure: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::from(e))).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct RootResponse {
    status: service::Status,
    message: &'static str,
    endpoints: serde_json::Value,
}

async fn api_root() -> impl IntoResponse {
    Json(RootResponse {
        status: service::Status::Success,
        message: "Healthcare API is running",
        endpoints: serde_json::json!({
            "/med": "Lookup medicine details by name (?query=)",
            "/med/explain": "Lookup a medicine and add a plain-language explanation (?query=)",
            "/hospitals": "Find hospitals near coordinates within a radius (?lat=&lon=&radius=)",
            "/nearest_hospitals": "Find the nearest hospitals to coordinates (?lat=&lon=&limit=&radius=)",
        }),
    })
}

#[derive(Debug, Deserialize)]
struct MedicineParams {
    query: String,
}

async fn api_medicine(
    State(st): State<AppState>,
    params: Result<Query<MedicineParams>, QueryRejection>,
) -> Response {
    let Query(p) = match params {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    match resolve_off_runtime(&st, p.query).await {
        Ok(m) => Json(service::medicine_response(&st.medicines, &m)).into_response(),
        Err(resp) => resp,
    }
}

async fn api_medicine_explain(
    State(st): State<AppState>,
    params: Result<Query<MedicineParams>, QueryRejection>,
) -> Response {
    let Query(p) = match params {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    match resolve_off_runtime(&st, p.query).await {
        Ok(m) => {
            let resp = service::explain_match(&st.medicines, &st.explainer, &m).await;
            Json(resp).into_response()
        }
        Err(resp) => resp,
    }
}

/// A fuzzy miss scans the whole catalog, so matching runs on the blocking
/// pool and never holds an async worker.
async fn resolve_off_runtime(st: &AppState, query: String) -> Result<MatchResult, Response> {
    let catalog = Arc::clone(&st.medicines);
    let threshold = st.threshold;
    tokio::task::spawn_blocking(move || service::resolve_medicine(&catalog, &query, threshold))
        .await
        .map_err(|e| {
            tracing::error!("Medicine match task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "medicine lookup failed")
        })
}

#[derive(Debug, Deserialize)]
struct HospitalParams {
    lat: f64,
    lon: f64,
    radius: Option<f64>,
}

async fn api_hospitals(
    State(st): State<AppState>,
    params: Result<Query<HospitalParams>, QueryRejection>,
) -> Response {
    let Query(p) = match params {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let radius = p.radius.unwrap_or(service::DEFAULT_RADIUS_KM);
    match service::hospitals_within(&st.hospitals, p.lat, p.lon, radius) {
        Ok(r) => Json(r).into_response(),
        Err(e) => lookup_error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct NearestParams {
    lat: f64,
    lon: f64,
    limit: Option<usize>,
    radius: Option<f64>,
}

async fn api_nearest_hospitals(
    State(st): State<AppState>,
    params: Result<Query<NearestParams>, QueryRejection>,
) -> Response {
    let Query(p) = match params {
        Ok(p) => p,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };
    let radius = p.radius.unwrap_or(service::DEFAULT_NEAREST_RADIUS_KM);
    let limit = p.limit.unwrap_or(service::DEFAULT_NEAREST_LIMIT);
    match service::nearest_hospitals(&st.hospitals, p.lat, p.lon, radius, limit) {
        Ok(r) => Json(r).into_response(),
        Err(e) => lookup_error_response(&e),
    }
}
