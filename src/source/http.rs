//! HTTP notification source
//!
//! Local listener for hosts that push notifications over HTTP:
//! `POST /notifications` with the JSON notification object.
//!
//! Responses: 202 when queued, 204 when filtered out, 503 when the daemon
//! is shutting down.

use super::{IncomingNotification, NotificationSource, CHANNEL_CAPACITY};
use crate::error::SourceError;
use crate::session::TargetNotification;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::net::SocketAddr;
use tokio::sync::mpsc;

#[derive(Clone)]
struct HttpState {
    tx: mpsc::Sender<TargetNotification>,
    target_app: String,
}

/// axum-based listener
pub struct HttpSource {
    listen: String,
    target_app: String,
    local_addr: Option<SocketAddr>,
}

impl HttpSource {
    pub fn new(listen: String, target_app: String) -> Self {
        Self {
            listen,
            target_app,
            local_addr: None,
        }
    }

    /// Bound address, available after `start`
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

async fn receive(
    State(state): State<HttpState>,
    Json(incoming): Json<IncomingNotification>,
) -> StatusCode {
    let Some(notification) = incoming.into_target(&state.target_app) else {
        return StatusCode::NO_CONTENT;
    };

    match state.tx.send(notification).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn router(state: HttpState) -> Router {
    Router::new()
        .route("/notifications", post(receive))
        .with_state(state)
}

#[async_trait::async_trait]
impl NotificationSource for HttpSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<TargetNotification>, SourceError> {
        if self.local_addr.is_some() {
            return Err(SourceError::AlreadyStarted);
        }

        let listener = tokio::net::TcpListener::bind(&self.listen)
            .await
            .map_err(|e| SourceError::Bind(self.listen.clone(), e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| SourceError::Bind(self.listen.clone(), e.to_string()))?;
        self.local_addr = Some(addr);

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let app = router(HttpState {
            tx,
            target_app: self.target_app.clone(),
        });

        tracing::info!("Listening for notifications on http://{}/notifications", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Notification listener stopped: {}", e);
            }
        });

        Ok(rx)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
