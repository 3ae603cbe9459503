//! HTTP route handlers for Axum.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::warn;

use crate::{
    api::types::SignalDto,
    cli::REPORT_FILE,
    config::Settings,
    data::cases::normalize_term,
    signals::{
        alert::{Alert, AlertKind},
        report, AnalysisReport,
    },
};

use super::AppState;

type ApiError = (StatusCode, String);
type ApiResult<T> = Result<Json<T>, ApiError>;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct SignalQuery {
    pub drug: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub kind: Option<AlertKind>,
}

pub async fn list_signals(
    State(state): State<AppState>,
    Query(query): Query<SignalQuery>,
) -> ApiResult<Vec<SignalDto>> {
    let Some(saved) = load_report(&state.settings).await? else {
        return Ok(Json(Vec::new()));
    };
    let drug = query.drug.as_deref().and_then(normalize_term);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let signals = saved
        .candidates
        .iter()
        .filter(|c| drug.as_ref().map_or(true, |d| &c.drug == d))
        .take(limit)
        .map(SignalDto::from)
        .collect();
    Ok(Json(signals))
}

pub async fn drug_signals(
    Path(drug): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Vec<SignalDto>> {
    let drug =
        normalize_term(&drug).ok_or((StatusCode::BAD_REQUEST, "empty drug".to_string()))?;
    let saved = load_report(&state.settings)
        .await?
        .ok_or((StatusCode::NOT_FOUND, "no report available".to_string()))?;
    let signals: Vec<SignalDto> = saved
        .candidates
        .iter()
        .filter(|c| c.drug == drug)
        .map(SignalDto::from)
        .collect();
    if signals.is_empty() {
        return Err((StatusCode::NOT_FOUND, format!("no ranked signals for `{drug}`")));
    }
    Ok(Json(signals))
}

pub async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertQuery>,
) -> ApiResult<Vec<Alert>> {
    let Some(saved) = load_report(&state.settings).await? else {
        return Ok(Json(Vec::new()));
    };
    let mut alerts: Vec<Alert> = saved
        .alerts()
        .filter(|alert| query.kind.map_or(true, |kind| alert.kind == kind))
        .cloned()
        .collect();
    alerts.sort_by(|x, y| y.severity.cmp(&x.severity));
    Ok(Json(alerts))
}

async fn load_report(settings: &Settings) -> Result<Option<AnalysisReport>, ApiError> {
    let path = settings.join_output(REPORT_FILE);
    if !path.exists() {
        warn!(path = %path.display(), "report missing; run `signal` first");
        return Ok(None);
    }
    let loaded = tokio::task::spawn_blocking(move || report::read_json(&path))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    Ok(Some(loaded))
}
