use thiserror::Error;

/// Marker UIMS puts in an error page that is still served with 200 OK.
pub const UIMS_ERROR_MARKER: &str = "Whoops, Something broke!";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Incorrect UID or password")]
    IncorrectCredentials,

    #[error("UIMS internal error occurred")]
    UimsInternal,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", cut, body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if body.contains(UIMS_ERROR_MARKER) {
            return ApiError::UimsInternal;
        }
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 | 403 => ApiError::IncorrectCredentials,
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Short text suitable for the status bar.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::IncorrectCredentials => "Incorrect UID or password".to_string(),
            ApiError::UimsInternal => "UIMS is having trouble. Try again later.".to_string(),
            ApiError::RateLimited => "Too many requests. Try again shortly.".to_string(),
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            other => format!("Update failed: {}", other),
        }
    }
}
