//! Webhook listener.
//!
//! `POST /` takes the alert as an opaque text body, spawns its unit of work
//! and answers 200 at once; order supervision can take minutes and the
//! alert sender does not wait for it.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tvb_engine::{Disposition, TradeOrchestrator};
use tvb_td::Broker;

pub fn create_router<B: Broker + 'static>(engine: Arc<TradeOrchestrator<B>>) -> Router {
    Router::new()
        .route("/", post(receive_alert::<B>))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

async fn receive_alert<B: Broker + 'static>(
    State(engine): State<Arc<TradeOrchestrator<B>>>,
    body: Bytes,
) -> StatusCode {
    let payload = String::from_utf8_lossy(&body).into_owned();
    info!("[webhook] alert received: {payload:?}");

    tokio::spawn(async move {
        // Failures are logged inside the engine with their order context.
        match engine.handle(&payload).await {
            Ok(Disposition::Skipped) => debug!("[webhook] alert skipped"),
            Ok(Disposition::DryRun(request)) => debug!("[webhook] dry run: {request}"),
            Ok(Disposition::Settled(request, outcome)) => debug!("[webhook] {request} → {outcome}"),
            Err(_) => {}
        }
    });

    StatusCode::OK
}
