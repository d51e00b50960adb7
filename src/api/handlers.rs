//! API handlers

use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{BytesRejection, JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;

use crate::api::AppState;
use crate::handler::{internal_error, Action};
use crate::types::{RequestEvent, ResponseEnvelope};
use crate::Error;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Health check with storage description
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.storage_description(),
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: String,
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.exporter {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter disabled").into_response(),
    }
}

/// Plain HTTP entry point: any method on `/orders`
pub async fn orders(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ResponseEnvelope {
    let mut event = RequestEvent::new(method.as_str());

    match query {
        Ok(Query(params)) => {
            for (key, value) in params {
                event = event.with_query(key, value);
            }
        }
        Err(rejection) => tracing::warn!(error = %rejection, "ignoring unparseable query string"),
    }

    match decode_body(body) {
        Ok(Some(body)) => event = event.with_body(body),
        Ok(None) => {}
        // Only a create reads the body
        Err(err) if Action::from_method(method.as_str()) == Action::Create => {
            return internal_error(err);
        }
        Err(err) => tracing::debug!(error = %err, "ignoring unreadable request body"),
    }

    if let Some(request_id) = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        event = event.with_request_id(request_id);
    }

    state.handler.handle(event).await
}

fn decode_body(body: Result<Bytes, BytesRejection>) -> crate::Result<Option<String>> {
    let bytes = body.map_err(|rejection| {
        Error::invalid_request(format!("unreadable request body: {}", rejection.body_text()))
    })?;
    if bytes.is_empty() {
        return Ok(None);
    }

    String::from_utf8(bytes.to_vec())
        .map(Some)
        .map_err(|e| Error::invalid_request(format!("request body is not valid UTF-8: {}", e)))
}

/// Gateway-style entry point: takes a proxy event, returns the raw envelope
pub async fn events(
    State(state): State<AppState>,
    payload: Result<Json<RequestEvent>, JsonRejection>,
) -> Json<ResponseEnvelope> {
    match payload {
        Ok(Json(event)) => Json(state.handler.handle(event).await),
        Err(rejection) => Json(internal_error(Error::invalid_request(format!(
            "malformed proxy event: {}",
            rejection.body_text()
        )))),
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(%name, "dropping invalid response header"),
            }
        }

        response
    }
}
