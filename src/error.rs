use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FacetGateError {
    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Field not found in schema: {0}")]
    FieldNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Search engine returned {status}: {body}")]
    SearchEngine { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, FacetGateError>;

impl From<std::io::Error> for FacetGateError {
    fn from(e: std::io::Error) -> Self {
        FacetGateError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for FacetGateError {
    fn from(e: serde_json::Error) -> Self {
        FacetGateError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for FacetGateError {
    fn from(e: reqwest::Error) -> Self {
        FacetGateError::Transport(e.to_string())
    }
}

impl FacetGateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FacetGateError::ConfigNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FacetGateError::ConfigParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FacetGateError::InvalidSchema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FacetGateError::FieldNotFound(_) => StatusCode::BAD_REQUEST,
            FacetGateError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
            FacetGateError::SearchEngine { .. } => StatusCode::BAD_GATEWAY,
            FacetGateError::Transport(_) => StatusCode::BAD_GATEWAY,
            FacetGateError::Json(_) => StatusCode::BAD_REQUEST,
            FacetGateError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── status_code mapping ─────────────────────────────────────────────

    #[test]
    fn config_not_found_is_500() {
        let e = FacetGateError::ConfigNotFound("catalog.json".into());
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn document_not_found_is_404() {
        let e = FacetGateError::DocumentNotFound("42".into());
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn search_engine_failure_is_502() {
        let e = FacetGateError::SearchEngine {
            status: 500,
            body: "shard failure".into(),
        };
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn transport_is_502() {
        let e = FacetGateError::Transport("connection refused".into());
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn field_not_found_is_400() {
        let e = FacetGateError::FieldNotFound("color".into());
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    }

    // ── From conversions ────────────────────────────────────────────────

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: FacetGateError = io.into();
        assert!(matches!(e, FacetGateError::Io(_)));
    }

    #[test]
    fn json_error_converts() {
        let bad: serde_json::Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: FacetGateError = bad.into();
        assert!(matches!(e, FacetGateError::Json(_)));
    }

    #[test]
    fn error_message_includes_engine_status() {
        let e = FacetGateError::SearchEngine {
            status: 503,
            body: "unavailable".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("unavailable"));
    }
}
