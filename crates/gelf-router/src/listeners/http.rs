//! HTTP GELF listener.
//!
//! Scalar fields come from the URL query string (`version`, `host`,
//! `short`, `timestamp`, `level`, `facility`, `file`, `line`, plus any
//! `_`-prefixed extension key). The long body comes from a `full` field in
//! either an `application/x-www-form-urlencoded` body or a
//! `multipart/form-data` field, decompressed via the same magic-byte rule
//! the codec uses elsewhere:
//!
//! ```text
//! curl -F timestamp=$(date +%s) -F short=abraka -F host=$(hostname) \
//!      -F full=dabra -F facility=proba -F level=6 http://host:12203/
//!
//! curl -d full=dabra "http://host:12203/?host=$(hostname)&facility=proba&level=6&short=abraka"
//! ```

use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use gelf_common::Message;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Clone)]
struct AppState {
    out: mpsc::Sender<Message>,
}

/// Bind `port` and serve the GELF HTTP ingestion route until the process
/// shuts down.
pub async fn serve_http(port: u16, out: mpsc::Sender<Message>) -> std::io::Result<()> {
    let app = build_router(out);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "listening for GELF HTTP requests");
    axum::serve(listener, app).await
}

fn build_router(out: mpsc::Sender<Message>) -> Router {
    Router::new()
        .route("/", post(ingest).put(ingest))
        .with_state(AppState { out })
}

/// Apply one query-string scalar onto `message`. Unknown keys (other than
/// the `_`-prefixed extensions, handled by the caller) are ignored, same
/// as `url.Values` keys `parseValues` doesn't recognize.
fn apply_scalar(message: &mut Message, key: &str, value: &str) -> Result<(), String> {
    match key {
        "version" => message.version = value.to_string(),
        "host" => message.host = value.to_string(),
        "short" => message.short = value.to_string(),
        "facility" => message.facility = value.to_string(),
        "file" => message.file = value.to_string(),
        "timestamp" => {
            let trimmed = value.split('.').next().unwrap_or(value);
            message.timestamp = trimmed
                .parse()
                .map_err(|e| format!("error parsing timestamp {value}: {e}"))?;
        }
        "level" => {
            message.level = value.parse().map_err(|e| format!("error parsing level {value}: {e}"))?;
        }
        "line" => {
            message.line = value.parse().map_err(|e| format!("error parsing line {value}: {e}"))?;
        }
        _ => {}
    }
    Ok(())
}

/// Pull the `full` field's raw bytes out of the request body: a
/// `multipart/form-data` field named `full` (text or file), or a
/// `full` key in an `application/x-www-form-urlencoded` body. Neither
/// present is not an error — `full` stays empty, same as `r.FormValue`
/// returning `""`.
async fn extract_full(req: Request, content_type: &str, state: &AppState) -> Result<Option<Vec<u8>>, String> {
    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| format!("malformed multipart body: {e}"))?;
        loop {
            let field = multipart
                .next_field()
                .await
                .map_err(|e| format!("malformed multipart body: {e}"))?;
            let Some(field) = field else { return Ok(None) };
            if field.name() == Some("full") {
                let bytes = field.bytes().await.map_err(|e| format!("error reading full: {e}"))?;
                return Ok(Some(bytes.to_vec()));
            }
        }
    }

    let body = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .map_err(|e| format!("error reading request body: {e}"))?;
    if body.is_empty() {
        return Ok(None);
    }
    Ok(url::form_urlencoded::parse(&body)
        .find(|(key, _)| key == "full")
        .map(|(_, value)| value.into_owned().into_bytes()))
}

async fn ingest(State(state): State<AppState>, req: Request<Body>) -> impl IntoResponse {
    let mut message = Message::default();
    let mut extra: BTreeMap<String, Value> = BTreeMap::new();

    if let Some(query) = req.uri().query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key.starts_with('_') {
                extra.insert(key.into_owned(), Value::String(value.into_owned()));
            } else if let Err(e) = apply_scalar(&mut message, &key, &value) {
                return (StatusCode::BAD_REQUEST, format!("{e}\n"));
            }
        }
    }

    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let full = match extract_full(req, &content_type, &state).await {
        Ok(full) => full,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("{e}\n")),
    };

    if let Some(raw) = full {
        match gelf_codec::compression::decompress(&raw) {
            Ok(plain) => message.full = String::from_utf8_lossy(&plain).into_owned(),
            Err(e) => return (StatusCode::BAD_REQUEST, format!("error decompressing full: {e}\n")),
        }
    }

    message.extra = extra;
    message.fix();

    if !message.facility.is_empty() && state.out.send(message).await.is_err() {
        warn!("fan-in channel closed, dropping http message");
    }

    (StatusCode::CREATED, String::new())
}
