use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Error outcomes of a request. Besides the usual status+message JSON
/// pair this carries two shapes the form flows need: a redirect (the
/// unauthenticated and wrong-post-author outcomes are navigational, not
/// error bodies) and a field-error map echoing the submitted form.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    location: Option<String>,
    fields: Option<BTreeMap<String, String>>,
    form: Option<Value>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    form: Option<Value>,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            location: None,
            fields: None,
            form: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// A navigational outcome: See Other to the given path.
    pub fn see_other(location: impl Into<String>) -> Self {
        let mut error = Self::new(StatusCode::SEE_OTHER, "");
        error.location = Some(location.into());
        error
    }

    /// What every protected route answers to an unauthenticated request.
    pub fn login_redirect() -> Self {
        Self::see_other("/auth/login")
    }

    pub fn validation(fields: BTreeMap<String, String>) -> Self {
        let mut error = Self::new(StatusCode::BAD_REQUEST, "validation failed");
        error.fields = Some(fields);
        error
    }

    /// Attach the submitted values so the client can re-render the form.
    pub fn with_form(mut self, form: Value) -> Self {
        self.form = Some(form);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(location) = &self.location {
            return Redirect::to(location).into_response();
        }

        let body = Json(ErrorResponse {
            error: self.message,
            fields: self.fields,
            form: self.form,
        });
        (self.status, body).into_response()
    }
}
