//! HTTP surface for the public scan-orchestrator operations in `spec.md`
//! §4.F.1, wired the way `vinit::vcontrol` wires its `/disk`, `/sys`
//! routes: a `Router` with `Extension`-injected state, layered through
//! `tower::ServiceBuilder`. Uses axum 0.8's `axum::serve` entrypoint rather
//! than the pre-0.7 `axum::Server`.

use std::net::SocketAddr;

use axum::extract::Query;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use tg_rfstate::RfStateSnapshot;
use tg_types::{RadioMac, ScanResp, ScanToken, StartScanRequest};
use tower::ServiceBuilder;
use tracing::debug;

use crate::actor::ControllerHandle;
use crate::error::{AppResult, HttpError};

pub async fn serve(addr: SocketAddr, controller: ControllerHandle) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/ping", get(ping))
        .route("/scan/start", post(start_scan))
        .route("/scan/response", post(record_response))
        .route("/scan/status", get(get_scan_status))
        .route("/scan/status/reset", post(reset_scan_status))
        .route("/rf_state", get(get_rf_state))
        .route("/rf_state/set", post(set_rf_state))
        .route("/rf_state/reset", post(reset_rf_state))
        .route("/la_tpc/set", post(set_la_tpc_params))
        .route("/cbf_config", get(get_cbf_config))
        .route("/cbf_config/reset", post(reset_cbf_config))
        .layer(ServiceBuilder::new().layer(Extension(controller)));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "controller http surface listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ping() -> impl IntoResponse {
    ""
}

async fn start_scan(
    Extension(controller): Extension<ControllerHandle>,
    Json(req): Json<StartScanRequest>,
) -> AppResult<impl IntoResponse> {
    debug!(?req.scan_type, "start_scan");
    let token = controller
        .start_scan(req)
        .await
        .map_err(|e| HttpError::BadRequest(e.to_string()))?;
    Ok(Json(serde_json::json!({ "token": token })))
}

#[derive(Debug, Deserialize)]
struct RecordResponseReq {
    token: ScanToken,
    mac: RadioMac,
    resp: ScanResp,
}

async fn record_response(
    Extension(controller): Extension<ControllerHandle>,
    Json(body): Json<RecordResponseReq>,
) -> AppResult<impl IntoResponse> {
    let outcome = controller
        .record_response(body.token, body.mac, body.resp)
        .await
        .map_err(|e| HttpError::BadRequest(e.to_string()))?;
    Ok(Json(serde_json::json!({ "completed": outcome.is_some() })))
}

#[derive(Debug, Deserialize, Default)]
struct ScanStatusQuery {
    token_lo: Option<ScanToken>,
    token_hi: Option<ScanToken>,
    #[serde(default)]
    concise: bool,
}

async fn get_scan_status(
    Extension(controller): Extension<ControllerHandle>,
    Query(q): Query<ScanStatusQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = tg_scan::ScanStatusFilter {
        token_range: q.token_lo.zip(q.token_hi),
        resp_id_range: None,
        concise: q.concise,
    };
    Ok(Json(controller.get_scan_status(filter).await))
}

async fn reset_scan_status(Extension(controller): Extension<ControllerHandle>) -> AppResult<impl IntoResponse> {
    controller.reset_scan_status().await;
    Ok(())
}

async fn get_rf_state(Extension(controller): Extension<ControllerHandle>) -> AppResult<impl IntoResponse> {
    Ok(Json(controller.get_rf_state().await))
}

async fn set_rf_state(
    Extension(controller): Extension<ControllerHandle>,
    Json(snapshot): Json<RfStateSnapshot>,
) -> AppResult<impl IntoResponse> {
    controller.set_rf_state(snapshot).await;
    Ok(())
}

async fn reset_rf_state(Extension(controller): Extension<ControllerHandle>) -> AppResult<impl IntoResponse> {
    controller.reset_rf_state().await;
    Ok(())
}

async fn set_la_tpc_params(Extension(controller): Extension<ControllerHandle>) -> AppResult<impl IntoResponse> {
    controller.set_la_tpc_params().await;
    Ok(())
}

async fn get_cbf_config(Extension(controller): Extension<ControllerHandle>) -> AppResult<impl IntoResponse> {
    Ok(Json(controller.get_cbf_config().await))
}

async fn reset_cbf_config(Extension(controller): Extension<ControllerHandle>) -> AppResult<impl IntoResponse> {
    controller.reset_cbf_config().await;
    Ok(())
}
