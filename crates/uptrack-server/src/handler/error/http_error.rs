//! The error every handler returns.

use std::borrow::Cow;
use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::handler::response::ErrorResponse;

/// Tracing target for rendered error responses.
const TRACING_TARGET: &str = "uptrack_server::handler::error";

/// Status classes the API answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// 400, the request is malformed.
    BadRequest,
    /// 404, no progress is recorded under the token.
    NotFound,
    /// 413, the upload is over the body limit.
    PayloadTooLarge,
    /// 500, the server failed on its own.
    #[strum(serialize = "internal_server_error")]
    Internal,
    /// 503, the token store did not answer in time.
    #[strum(serialize = "service_unavailable")]
    Unavailable,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message shown when the error carries none of its own.
    const fn summary(self) -> &'static str {
        match self {
            Self::BadRequest => "Invalid request data.",
            Self::NotFound => "Resource not found.",
            Self::PayloadTooLarge => "Payload too large.",
            Self::Internal => "Internal server error.",
            Self::Unavailable => "Service unavailable.",
        }
    }

    /// Machine-readable name sent as `name` in the body.
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl IntoResponse for ErrorKind {
    fn into_response(self) -> Response {
        Error::new(self).into_response()
    }
}

/// A failed request: what the client sees plus a detail only the log sees.
#[derive(Debug, Clone)]
#[must_use = "errors do nothing unless returned"]
pub struct Error {
    kind: ErrorKind,
    message: Option<Cow<'static, str>>,
    resource: Option<&'static str>,
    detail: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            resource: None,
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::BadRequest).with_message(message)
    }

    pub fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::NotFound).with_message(message)
    }

    pub fn unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Unavailable).with_message(message)
    }

    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Replaces the kind's summary in the response body.
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Names the field or resource the error is about.
    pub fn with_resource(mut self, resource: &'static str) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Attaches a diagnostic that is logged and never sent.
    pub fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message the client receives.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(self.kind.summary())
    }

    #[inline]
    pub fn resource(&self) -> Option<&'static str> {
        self.resource
    }

    #[inline]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Builds the JSON body.
    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            name: self.kind.name(),
            message: self.message().to_owned(),
            resource: self.resource,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind.name(), self.kind.status(), self.message())?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        if status.is_server_error() {
            tracing::error!(
                target: TRACING_TARGET,
                status = status.as_u16(),
                message = self.message(),
                resource = self.resource,
                detail = self.detail(),
                "Request failed"
            );
        } else {
            tracing::debug!(
                target: TRACING_TARGET,
                status = status.as_u16(),
                message = self.message(),
                resource = self.resource,
                detail = self.detail(),
                "Request rejected"
            );
        }

        (status, Json(self.to_body())).into_response()
    }
}

/// Handler result defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
