//! Blocking HTTP plumbing shared by the API clients.
use crate::error::{Error, Result, Service};
use serde_json::Value;
use std::time::Duration;
use ureq::http::Response;
use ureq::Body;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const ERROR_BODY_LIMIT: usize = 500;

/// Agent with a global timeout that hands non-2xx responses back to us.
pub(crate) fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(REQUEST_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Turn a sent request into JSON, classifying failures for the retry wrapper.
pub(crate) fn json_response(
    service: Service,
    sent: std::result::Result<Response<Body>, ureq::Error>,
) -> Result<Value> {
    let mut response = sent.map_err(|err| Error::transport(service, err))?;
    let status = response.status().as_u16();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|err| Error::transport(service, err))?;
    if !(200..300).contains(&status) {
        return Err(Error::from_status(service, status, error_message(&text)));
    }
    serde_json::from_str(&text).map_err(|err| Error::Decode {
        service,
        message: err.to_string(),
    })
}

/// Pull a readable message out of an error body (`{"error":{"message":..}}`,
/// `{"chart":{"error":{"description":..}}}`, `{"message":..}`), otherwise a
/// truncated copy of the raw text.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let described = |error: &Value| {
            error
                .get("message")
                .or_else(|| error.get("description"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let message = value
            .get("error")
            .and_then(described)
            .or_else(|| value.pointer("/chart/error").and_then(described))
            .or_else(|| value.get("message").and_then(Value::as_str).map(str::to_string));
        if let Some(message) = message {
            return message;
        }
    }
    crate::util::truncate_string(body.trim(), ERROR_BODY_LIMIT)
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod mock_server_tests;
