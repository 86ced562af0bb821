//! # Errors (Feathers-style)
//!
//! tgstore reports every failed request with the same JSON shape:
//! `name`, `message`, `code`, `className` and an optional `data` value.
//! The type is transport-agnostic; the HTTP crate decides how to send it.

use std::fmt;

use serde_json::{json, Value};

/// Error categories with their status code, `name` and `className`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotAuthenticated,
    NotFound,
    PayloadTooLarge,
    GeneralError,
    BadGateway,
    Unavailable,
}

impl ErrorKind {
    fn parts(&self) -> (u16, &'static str, &'static str) {
        match self {
            ErrorKind::BadRequest => (400, "BadRequest", "bad-request"),
            ErrorKind::NotAuthenticated => (401, "NotAuthenticated", "not-authenticated"),
            ErrorKind::NotFound => (404, "NotFound", "not-found"),
            ErrorKind::PayloadTooLarge => (413, "PayloadTooLarge", "payload-too-large"),
            ErrorKind::GeneralError => (500, "GeneralError", "general-error"),
            ErrorKind::BadGateway => (502, "BadGateway", "bad-gateway"),
            ErrorKind::Unavailable => (503, "Unavailable", "unavailable"),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.parts().0
    }

    pub fn name(&self) -> &'static str {
        self.parts().1
    }

    /// Kebab-cased `className`
    pub fn class_name(&self) -> &'static str {
        self.parts().2
    }
}

/// A structured error carried to the client.
///
/// `source` keeps the underlying failure for logs; it is dropped by
/// [`ApiError::sanitize_for_client`] and never serialized.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Copy safe to send: same kind, message and data, no `source`.
    pub fn sanitize_for_client(&self) -> ApiError {
        ApiError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            source: None,
        }
    }

    /// JSON body sent to clients.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });
        if let Some(data) = &self.data {
            body["data"] = data.clone();
        }
        body
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadGateway, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_matches_feathers() {
        let err = ApiError::not_found("No record found for id '7'");
        let body = err.to_json();

        assert_eq!(body["name"], "NotFound");
        assert_eq!(body["code"], 404);
        assert_eq!(body["className"], "not-found");
        assert_eq!(body["message"], "No record found for id '7'");
        assert!(body.get("data").is_none());
    }

    #[test]
    fn sanitize_drops_source_but_keeps_data() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "secret path /var/lib");
        let err = ApiError::bad_gateway("backend failed")
            .with_data(json!({"class": "bot"}))
            .with_source(io);

        let safe = err.sanitize_for_client();
        assert!(safe.source.is_none());
        assert_eq!(safe.data, Some(json!({"class": "bot"})));
        assert_eq!(safe.code(), 502);
    }
}
