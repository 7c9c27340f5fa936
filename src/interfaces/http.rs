//! Processor-facing HTTP endpoint.
//!
//! The processor posts the payment result as a form body and follows (or
//! ignores) the URL in the plain-text response. The response is the same
//! redirect URL with status 200 whatever happened, so an attacker probing the
//! endpoint learns nothing about validation.

use crate::application::engine::NotificationProcessor;
use crate::domain::notification::FormFields;
use crate::domain::ports::RequestOrigin;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::warn;

pub const RESPONSE_PATH: &str = "/hgw/index/response";
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn build_router(processor: Arc<NotificationProcessor>) -> Router {
    Router::new()
        .route(RESPONSE_PATH, post(handle_response))
        .with_state(processor)
}

async fn handle_response(
    State(processor): State<Arc<NotificationProcessor>>,
    request: Request,
) -> impl IntoResponse {
    let origin = origin(&request);
    let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            warn!(
                origin = origin.peer.as_deref().unwrap_or("unknown"),
                error = %e,
                "Unreadable notification body"
            );
            Bytes::new()
        }
    };

    let form = parse_form(&body);
    let response = processor.handle(&form, origin).await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        response.redirect_url,
    )
}

/// The socket peer, plus the first `X-Forwarded-For` hop kept apart since
/// the caller controls it.
fn origin(request: &Request) -> RequestOrigin {
    RequestOrigin {
        peer: request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string()),
        forwarded_for: forwarded_for(request.headers()),
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
}

/// Decodes a form body. Invalid UTF-8 is replaced lossily; an undecodable
/// body yields an empty form, which then fails the integrity gate like any
/// other incomplete notification.
pub fn parse_form(body: &[u8]) -> FormFields {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(e) => {
            warn!(error = %e, "Undecodable notification body");
            FormFields::new()
        }
    }
}
