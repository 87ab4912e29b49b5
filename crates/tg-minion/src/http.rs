//! Minion diagnostics HTTP surface (`spec.md` §5): a thin read/trigger API
//! over the ignition/status actor, wired the same way as
//! `tg-controller::http` and, before it, `vinit::vcontrol`.

use std::net::SocketAddr;

use axum::extract::Query;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use tg_types::RadioMac;
use tower::ServiceBuilder;

use crate::actor::MinionHandle;
use crate::error::{AppResult, Error};

pub async fn serve(addr: SocketAddr, minion: MinionHandle) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/ping", get(ping))
        .route("/status_report", get(status_report))
        .route("/ignited_neighbors", get(ignited_neighbors))
        .route("/controller_connected", post(controller_connected))
        .route("/controller_disconnected", post(controller_disconnected))
        .layer(ServiceBuilder::new().layer(Extension(minion)));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "minion http surface listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn ping() -> impl IntoResponse {
    ""
}

async fn status_report(Extension(minion): Extension<MinionHandle>) -> AppResult<impl IntoResponse> {
    Ok(Json(minion.status_report().await))
}

#[derive(Debug, Deserialize)]
struct RadioQuery {
    radio: RadioMac,
}

async fn ignited_neighbors(
    Extension(minion): Extension<MinionHandle>,
    Query(q): Query<RadioQuery>,
) -> AppResult<impl IntoResponse> {
    Ok(Json(minion.ignited_neighbors(q.radio).await))
}

async fn controller_connected(Extension(minion): Extension<MinionHandle>) -> AppResult<impl IntoResponse> {
    minion.controller_connected().await;
    Ok(())
}

async fn controller_disconnected(Extension(minion): Extension<MinionHandle>) -> AppResult<impl IntoResponse> {
    minion.controller_disconnected().await;
    Ok(())
}
