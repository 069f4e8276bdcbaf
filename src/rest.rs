//! HTTP server hosting the explorer API.

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{pagination::PaginationError, utils::logger::LogMe};

pub struct RestApiRunContext {
    pub rest_addr: String,
    pub router: Router,
}

pub struct RestApi {
    rest_addr: String,
    app: Option<Router>,
}

impl RestApi {
    pub fn build(ctx: RestApiRunContext) -> Self {
        let app = ctx
            .router
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());
        RestApi {
            rest_addr: ctx.rest_addr,
            app: Some(app),
        }
    }

    pub async fn serve(&mut self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.rest_addr)
            .await
            .context("Starting rest server")?;

        info!("rest listening on {}", self.rest_addr);

        let app = self.app.take().context("rest server already started")?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Starting rest server")
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c()
        .await
        .log_warn("Listening for ctrl-c")
        .is_err()
    {
        // No signal handler: run until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("ctrl-c received, shutting down");
}

/// Rejected client input. Always answered with 400.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct BadRequest(pub String);

impl BadRequest {
    pub fn new(msg: impl Into<String>) -> Self {
        BadRequest(msg.into())
    }
}

// Make our own error that wraps `anyhow::Error`.
#[derive(Debug)]
pub struct AppError(pub StatusCode, pub anyhow::Error);

// Tell axum how to convert `AppError` into a response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            warn!("{} {:#}", self.0, self.1);
        }
        let body = json!({
            "statusCode": self.0.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "message": self.1.to_string(),
        });
        (self.0, Json(body)).into_response()
    }
}

// This enables using `?` on functions that return `Result<_, anyhow::Error>` to turn them into
// `Result<_, AppError>`. Client errors found anywhere in the chain are surfaced as they are.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err: anyhow::Error = err.into();
        for cause in err.chain() {
            if let Some(pagination) = cause.downcast_ref::<PaginationError>() {
                return Self(StatusCode::BAD_REQUEST, pagination.clone().into());
            }
            if let Some(bad_request) = cause.downcast_ref::<BadRequest>() {
                return Self(StatusCode::BAD_REQUEST, bad_request.clone().into());
            }
        }
        Self(StatusCode::INTERNAL_SERVER_ERROR, err)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use anyhow::anyhow;

    #[test]
    fn pagination_errors_are_client_errors() {
        let err: AppError = PaginationError::BackwardWithoutCursor.into();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1.to_string(), "Cannot paginate backward without a cursor.");
    }

    #[test]
    fn wrapped_client_errors_are_not_double_wrapped() {
        let err = anyhow::Error::from(PaginationError::ZeroTake).context("Failed to fetch blocks");
        let err: AppError = err.into();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1.to_string(), "\"take\" must be a non-zero integer.");

        let err: AppError = BadRequest::new("Invalid address").into();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn anything_else_is_internal() {
        let err: AppError = anyhow!("connection refused").into();
        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
