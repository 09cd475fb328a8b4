//! Request id propagation and access logging.
//!
//! Reuses the caller's `X-Request-Id` when present, otherwise generates one.
//! The id is put on the request (for handlers), on the response, and on the
//! tracing span wrapping the handler.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::{Instrument, info, info_span};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

static SEQ: AtomicU64 = AtomicU64::new(0);

fn incoming_id(req: &Request) -> Option<String> {
    let v = req.headers().get(&REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    (!v.is_empty()).then(|| v.to_string())
}

fn generate_id() -> String {
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    format!("req-{nanos}-{seq}")
}

pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = incoming_id(&req).unwrap_or_else(generate_id);
    let header = HeaderValue::from_str(&id).ok();
    if let Some(h) = &header {
        req.headers_mut().insert(REQUEST_ID_HEADER, h.clone());
    }

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let t0 = Instant::now();

    let mut res = next
        .run(req)
        .instrument(info_span!("request", request_id = %id))
        .await;

    if let Some(h) = header {
        res.headers_mut().insert(REQUEST_ID_HEADER, h);
    }
    info!(
        request_id = %id,
        %method,
        path,
        status = res.status().as_u16(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "request served"
    );
    res
}
