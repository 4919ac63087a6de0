use std::io::{Cursor, Read};

use serde::Serialize;
use serde_json::json;
use tiny_http::{Header, Method, Request, Response, StatusCode};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::handlers;
use crate::state::SharedState;

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

pub fn json_response<T: Serialize>(status: u16, body: &T) -> Response<Cursor<Vec<u8>>> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let len = bytes.len();
    let mut headers = Vec::new();
    if let Ok(h) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        headers.push(h);
    }
    Response::new(StatusCode(status), headers, Cursor::new(bytes), Some(len), None)
}

pub fn error_response(err: &ApiError) -> Response<Cursor<Vec<u8>>> {
    json_response(err.status, &json!({ "detail": err.detail }))
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Health,
    Predict,
}

/// Maps a method and path (query string already removed) to a route.
pub fn resolve(method: &Method, path: &str) -> Result<Route, ApiError> {
    match (method, path) {
        (Method::Get, "/") => Ok(Route::Health),
        (Method::Post, "/predict") => Ok(Route::Predict),
        (_, "/") | (_, "/predict") => Err(ApiError::method_not_allowed()),
        _ => Err(ApiError::not_found()),
    }
}

/// Handles one request end to end and sends the response.
pub fn dispatch(mut request: Request, state: SharedState) {
    let method = request.method().clone();
    let url = request.url().to_owned();
    let path = url.split('?').next().unwrap_or("").to_owned();

    let (status, response) = match resolve(&method, &path) {
        Ok(Route::Health) => (200, json_response(200, &handlers::health::handle())),
        Ok(Route::Predict) => {
            let content_type = header_value(&request, "Content-Type");
            let mut body = Vec::new();
            let result = match request.as_reader().read_to_end(&mut body) {
                Ok(_) => handlers::predict::handle(&state, content_type.as_deref(), &body),
                Err(e) => {
                    warn!(error = %e, "failed to read request body");
                    Err(ApiError::bad_request("Could not read request body"))
                }
            };
            match result {
                Ok(prediction) => (200, json_response(200, &prediction)),
                Err(err) => (err.status, error_response(&err)),
            }
        }
        Err(err) => (err.status, error_response(&err)),
    };

    info!(method = %method, path = %path, status, "request");
    if let Err(e) = request.respond(response) {
        warn!(error = %e, "failed to send response");
    }
}

fn header_value(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_resolve_by_method_and_path() {
        assert_eq!(resolve(&Method::Get, "/"), Ok(Route::Health));
        assert_eq!(resolve(&Method::Post, "/predict"), Ok(Route::Predict));
        assert_eq!(resolve(&Method::Get, "/predict"), Err(ApiError::method_not_allowed()));
        assert_eq!(resolve(&Method::Delete, "/"), Err(ApiError::method_not_allowed()));
        assert_eq!(resolve(&Method::Get, "/missing"), Err(ApiError::not_found()));
    }

    #[test]
    fn error_body_carries_detail() {
        let mut body = String::new();
        let response = error_response(&ApiError::not_found());
        assert_eq!(response.status_code(), StatusCode(404));
        response.into_reader().read_to_string(&mut body).unwrap();
        assert_eq!(body, r#"{"detail":"Not Found"}"#);
    }
}
