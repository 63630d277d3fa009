use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue, Method, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::web::{log, ClientError, Error, REQUEST_ID_HEADER};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const ALLOWED_METHODS: &str = "POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type";

/// Turns a `web::Error` stored in the response extensions into the `{ ok: false, error }` body
/// and logs the request.
/// Failed `/api` responses produced outside our handlers (extractor rejections, unknown paths)
/// get the same body, so everything under `/api` is JSON.
pub async fn response_mapper(
    req_method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    resp: Response,
) -> Response {
    // Reuse the propagated request id so log lines and the response header match.
    let uuid = req_headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .unwrap_or_else(Uuid::new_v4);

    let web_error = resp.extensions().get::<Arc<Error>>().map(Arc::as_ref);
    let client_status_and_error = web_error
        .map(Error::status_code_and_client_error)
        .or_else(|| {
            let status = resp.status();
            let failed = status.is_client_error() || status.is_server_error();
            (failed && uri.path().starts_with("/api"))
                .then(|| (status, ClientError::from_status(status)))
        });

    if let Some(er) = web_error.filter(|er| er.is_server_error()) {
        tracing::error!("SERVER ERROR: {er:?} ID: {uuid}");
    }

    let err_resp = client_status_and_error.as_ref().map(|(status, cl_err)| {
        let client_error_body = json!({
            "ok": false,
            "error": cl_err.to_string(),
        });

        let mut err_resp = (*status, Json(client_error_body)).into_response();
        if let Some(req_id) = resp.headers().get(REQUEST_ID_HEADER) {
            err_resp.headers_mut().insert(REQUEST_ID_HEADER, req_id.clone());
        }
        err_resp
    });

    log::log_request(
        uuid,
        req_method,
        uri,
        resp.status(),
        web_error,
        client_status_and_error,
    );

    err_resp.unwrap_or(resp)
}

/// Stamps the JSON content type, `no-store` and the CORS headers on every `/api` response.
/// The allowed origin echoes the request's `Origin` header (with `Vary: Origin`), or `*` without one.
pub async fn api_headers(uri: Uri, req_headers: HeaderMap, mut resp: Response) -> Response {
    if !uri.path().starts_with("/api") {
        return resp;
    }

    let origin = req_headers.get(header::ORIGIN).cloned();

    let headers = resp.headers_mut();
    if origin.is_some() {
        // The response differs per origin, caches must key on it.
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
    let allow_origin = origin.unwrap_or_else(|| HeaderValue::from_static("*"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );

    resp
}
