//! Error taxonomy of the HTTP API and rendering of the JSON error envelope

use crate::state::AppState;
use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError, UrlencodedError};
use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{web, HttpResponse, ResponseError};
use common::ErrorEnvelope;
use std::backtrace::BacktraceStatus;
use std::fmt::Display;
use tracing::error;

const VALIDATION_TITLE: &str = "VALIDATION_ERROR";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("No endpoints found")]
    NotFound,

    #[error("{}", first_message(.errors))]
    Validation { errors: Vec<String> },

    #[error("{0:#}")]
    Internal(anyhow::Error),
}

fn first_message(errors: &[String]) -> &str {
    errors.first().map(String::as_str).unwrap_or("validation error")
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            errors: vec![message.into()],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::NotFound => "Not Found",
            ApiError::Validation { .. } => VALIDATION_TITLE,
            ApiError::Internal(_) => reason_phrase(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    pub fn errors(&self) -> Vec<String> {
        match self {
            ApiError::Validation { errors } => errors.clone(),
            _ => Vec::new(),
        }
    }

    /// Error chain, plus the backtrace when one was captured (RUST_BACKTRACE=1)
    pub fn stack(&self) -> Vec<String> {
        match self {
            ApiError::Internal(err) => {
                let mut stack: Vec<String> = err.chain().map(|cause| cause.to_string()).collect();
                let backtrace = err.backtrace();
                if backtrace.status() == BacktraceStatus::Captured {
                    stack.extend(backtrace.to_string().lines().map(str::to_string));
                }
                stack
            }
            other => vec![format!("{}: {}", other.title(), other)],
        }
    }

    pub fn envelope(&self, include_stack: bool) -> ErrorEnvelope {
        ErrorEnvelope {
            code: self.status_code().as_u16(),
            title: self.title().to_string(),
            message: self.to_string(),
            errors: self.errors(),
            stack: include_stack.then(|| self.stack()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.envelope(false))
    }
}

/// Log a server-side failure and wrap it as a 500
pub fn handle_server_error<C, E>(msg: C, e: E) -> ApiError
where
    C: Display + Send + Sync + 'static,
    E: Into<anyhow::Error>,
{
    let err = e.into().context(msg);
    error!("{:#}", err);
    ApiError::Internal(err)
}

fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Error")
}

/// Build the envelope for any error response.
///
/// `ApiError`s render themselves. Extraction failures are validation errors.
/// Anything else is titled with the status reason phrase.
pub fn envelope_for(
    error: Option<&actix_web::Error>,
    status: StatusCode,
    include_stack: bool,
) -> ErrorEnvelope {
    let Some(error) = error else {
        return ErrorEnvelope {
            code: status.as_u16(),
            title: reason_phrase(status).to_string(),
            message: reason_phrase(status).to_string(),
            errors: Vec::new(),
            stack: None,
        };
    };

    if let Some(api_error) = error.as_error::<ApiError>() {
        return api_error.envelope(include_stack);
    }

    let message = error.to_string();
    let stack = include_stack.then(|| vec![format!("{:?}", error)]);

    if is_validation_error(error) {
        return ErrorEnvelope {
            code: status.as_u16(),
            title: VALIDATION_TITLE.to_string(),
            message: message.clone(),
            errors: vec![message],
            stack,
        };
    }

    ErrorEnvelope {
        code: status.as_u16(),
        title: reason_phrase(status).to_string(),
        message,
        errors: Vec::new(),
        stack,
    }
}

fn is_validation_error(error: &actix_web::Error) -> bool {
    error.as_error::<PathError>().is_some()
        || error.as_error::<QueryPayloadError>().is_some()
        || error.as_error::<JsonPayloadError>().is_some()
        || error.as_error::<UrlencodedError>().is_some()
}

/// Error handler middleware callback: replace any 4xx/5xx body with the envelope.
///
/// Stack traces are included unless the app runs in production.
pub fn render_error<B: MessageBody>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let include_stack = res
        .request()
        .app_data::<web::Data<AppState>>()
        .map(|state| !state.config.is_production())
        .unwrap_or(false);

    let envelope = envelope_for(res.response().error(), res.status(), include_stack);
    let body = serde_json::to_string(&envelope)?;

    let (req, mut res) = res.into_parts();
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    let res = res.set_body(body);
    let res = ServiceResponse::new(req, res)
        .map_into_boxed_body()
        .map_into_right_body();
    Ok(ErrorHandlerResponse::Response(res))
}
