use thiserror::Error;

const AUTH_ERROR_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "SignatureDoesNotMatch",
    "ExpiredTokenException",
    "InvalidClientTokenId",
];

const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "ProvisionedThroughputExceededException",
];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("{code}: {message} (HTTP {status})")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Failed to sign request: {0}")]
    Signing(String),

    #[error("Failed to load credentials: {0}")]
    Credentials(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    /// Builds a service error from the status, error type and message AWS returned
    pub fn from_service(status: u16, code: &str, message: String) -> Self {
        let code = normalize_code(code);
        if AUTH_ERROR_CODES.contains(&code.as_str()) {
            return ApiError::AuthError(format!("{}: {}", code, message));
        }
        ApiError::Service {
            status,
            code,
            message,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn code_is(&self, expected: &str) -> bool {
        self.code() == Some(expected)
    }

    /// True when the error has the given code and its message contains `needle`
    pub fn message_contains(&self, expected_code: &str, needle: &str) -> bool {
        match self {
            ApiError::Service { code, message, .. } => {
                code == expected_code && message.contains(needle)
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code_is("ResourceNotFoundException")
    }

    pub fn is_throttling(&self) -> bool {
        self.code()
            .map(|code| THROTTLING_CODES.contains(&code))
            .unwrap_or(false)
    }
}

/// Maps `ResourceNotFoundException` to `None`
pub fn not_found_as_none<T>(result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Strips the namespace and type suffix AWS sometimes adds to error codes,
/// e.g. `com.amazonaws.kendra#ValidationException` or `ValidationException:http://...`
pub fn normalize_code(code: &str) -> String {
    let code = code.split(':').next().unwrap_or(code);
    let code = code.rsplit('#').next().unwrap_or(code);
    code.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_normalized() {
        assert_eq!(
            normalize_code("com.amazonaws.kendra#ValidationException"),
            "ValidationException"
        );
        assert_eq!(
            normalize_code("ResourceNotFoundException:http://internal.amazon.com/"),
            "ResourceNotFoundException"
        );
        assert_eq!(normalize_code("ValidationException"), "ValidationException");
    }

    #[test]
    fn not_found_is_detected() {
        let err = ApiError::from_service(
            409,
            "ResourceNotFoundException",
            "Domain not found: search".to_string(),
        );
        assert!(err.is_not_found());
        assert!(!err.is_throttling());
    }

    #[test]
    fn auth_codes_become_auth_errors() {
        let err = ApiError::from_service(
            400,
            "UnrecognizedClientException",
            "The security token included in the request is invalid.".to_string(),
        );
        assert!(matches!(err, ApiError::AuthError(_)));
    }

    #[test]
    fn message_contains_checks_code_and_text() {
        let err = ApiError::from_service(
            400,
            "ValidationException",
            "Domain is still being deleted".to_string(),
        );
        assert!(err.message_contains("ValidationException", "still being deleted"));
        assert!(!err.message_contains("InvalidTypeException", "still being deleted"));
        assert!(!err.message_contains("ValidationException", "passed role"));
    }

    #[test]
    fn service_error_formatting() {
        let err = ApiError::from_service(400, "ValidationException", "bad input".to_string());
        let rendered = err.to_string();
        assert!(rendered.contains("ValidationException"));
        assert!(rendered.contains("bad input"));
        assert!(rendered.contains("HTTP 400"));
    }
}
