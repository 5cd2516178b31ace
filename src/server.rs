//! ==============================================================================
//! server.rs - dashboard web server
//! ==============================================================================
//!
//! routes:
//!     GET  /                         html dashboard (?tab=principal|devices|statistics&lang=es|en)
//!     POST /select                   form pick from the html nav, redirects back
//!     GET  /api/sensors              known ids + every tab's selection
//!     GET  /api/sensors/:id          one record (404 if never discovered)
//!     GET  /api/sensors/:id/stats    statistics per metric (null while unset/empty)
//!     POST /api/select               ?view=&sensor= , applies the selection machine
//!     GET  /api/i18n/:lang           translation table
//!
//! the server only ever reads the aggregator, except for selection requests,
//! which go through `Aggregator::select_sensor`.
//!
//! ==============================================================================

use crate::aggregator::Aggregator;
use crate::domain::{Metric, SensorId, SensorRecord};
use crate::i18n::{translations, Language, Translations};
use crate::render::{render_page, PageContext};
use crate::selection::{SelectionState, View};
use crate::stats::SensorStats;

use anyhow::Result;
use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, Json, Redirect},
    routing::{get, post},
    Router,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<RwLock<Aggregator>>,
    pub language: Language,
    pub timezone: Tz,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/select", post(select_form_handler))
        .route("/api/sensors", get(sensors_handler))
        .route("/api/sensors/:id", get(record_handler))
        .route("/api/sensors/:id/stats", get(stats_handler))
        .route("/api/select", post(select_handler))
        .route("/api/i18n/:lang", get(i18n_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(
    state: AppState,
    bind: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("[SERVER] ✓ Dashboard live at http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ==============================================================================
// html
// ==============================================================================

#[derive(Deserialize, Default)]
struct PageParams {
    tab: Option<String>,
    lang: Option<String>,
}

impl AppState {
    fn language(&self, requested: Option<&str>) -> Language {
        requested
            .and_then(|l| l.parse().ok())
            .unwrap_or(self.language)
    }
}

async fn dashboard_handler(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Html<String> {
    let view = params
        .tab
        .as_deref()
        .and_then(|t| t.parse().ok())
        .unwrap_or(View::Principal);
    let ctx = PageContext {
        view,
        language: state.language(params.lang.as_deref()),
        timezone: state.timezone,
    };

    let aggregator = state.aggregator.read().await;
    Html(render_page(&aggregator, ctx))
}

#[derive(Deserialize)]
struct SelectForm {
    view: String,
    sensor: String,
    lang: Option<String>,
}

async fn select_form_handler(
    State(state): State<AppState>,
    Form(form): Form<SelectForm>,
) -> Redirect {
    let view = form.view.parse().unwrap_or(View::Principal);
    state.aggregator.write().await.select_sensor(view, &form.sensor);
    let lang = state.language(form.lang.as_deref());
    Redirect::to(&format!("/?tab={}&lang={}", view.as_str(), lang.tag()))
}

// ==============================================================================
// json api
// ==============================================================================

#[derive(Serialize, Deserialize, Debug)]
pub struct SensorsResponse {
    pub sensors: Vec<SensorId>,
    pub selections: BTreeMap<View, Option<SensorId>>,
}

async fn sensors_handler(State(state): State<AppState>) -> Json<SensorsResponse> {
    let aggregator = state.aggregator.read().await;
    let selections = View::ALL
        .iter()
        .map(|&view| (view, aggregator.active_selection(view).cloned()))
        .collect();
    Json(SensorsResponse {
        sensors: aggregator.known_sensor_ids().to_vec(),
        selections,
    })
}

async fn record_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SensorRecord>, StatusCode> {
    let aggregator = state.aggregator.read().await;
    aggregator
        .record_for(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Serialize, Debug)]
pub struct StatsResponse {
    pub temperature: Option<SensorStats>,
    pub humidity: Option<SensorStats>,
}

async fn stats_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatsResponse>, StatusCode> {
    let aggregator = state.aggregator.read().await;
    if aggregator.record_for(&id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(StatsResponse {
        temperature: aggregator.stats_for(&id, Metric::Temperature),
        humidity: aggregator.stats_for(&id, Metric::Humidity),
    }))
}

#[derive(Deserialize)]
struct SelectParams {
    view: String,
    sensor: String,
}

#[derive(Serialize)]
struct SelectResponse {
    view: View,
    selection: SelectionState,
}

async fn select_handler(
    State(state): State<AppState>,
    Query(params): Query<SelectParams>,
) -> Result<Json<SelectResponse>, (StatusCode, String)> {
    let view: View = params
        .view
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, e))?;
    let selection = state
        .aggregator
        .write()
        .await
        .select_sensor(view, &params.sensor);
    Ok(Json(SelectResponse { view, selection }))
}

async fn i18n_handler(Path(lang): Path<String>) -> Result<Json<&'static Translations>, StatusCode> {
    let language: Language = lang.parse().map_err(|_| StatusCode::NOT_FOUND)?;
    Ok(Json(translations(language)))
}
