use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No bearer token set")]
    MissingToken,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Whether the server refused the credential itself, as opposed to a transport failure
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::AccessDenied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(StatusCode::FORBIDDEN, "no"), ApiError::AccessDenied(b) if b == "no"));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_GATEWAY, ""), ApiError::ServerError(_)));
        assert!(matches!(ApiError::from_status(StatusCode::IM_A_TEAPOT, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_truncate_body() {
        let long = "ε".repeat(400);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated, 800 total bytes"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_auth_rejection() {
        assert!(ApiError::Unauthorized.is_auth_rejection());
        assert!(ApiError::AccessDenied(String::new()).is_auth_rejection());
        assert!(!ApiError::RateLimited.is_auth_rejection());
    }
}
