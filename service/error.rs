use thiserror::Error;

/// An HTTP error answered as `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {detail}")]
pub struct ApiError {
    pub status: u16,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        ApiError {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        ApiError::new(400, detail)
    }

    pub fn missing_field(field: &str) -> Self {
        ApiError::new(422, format!("Field required: {}", field))
    }

    pub fn not_found() -> Self {
        ApiError::new(404, "Not Found")
    }

    pub fn method_not_allowed() -> Self {
        ApiError::new(405, "Method Not Allowed")
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiError::new(500, detail)
    }
}

impl From<leafscan::Error> for ApiError {
    fn from(err: leafscan::Error) -> Self {
        match err {
            leafscan::Error::ImageDecode(_) => ApiError::bad_request("Invalid or corrupted image file"),
            leafscan::Error::LabelMismatch { .. } => {
                ApiError::internal("Model output does not match class labels")
            }
            other => ApiError::internal(format!("Prediction failed: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_errors_map_to_statuses() {
        let mismatch: ApiError = leafscan::Error::LabelMismatch { index: 20, labels: 15 }.into();
        assert_eq!(mismatch, ApiError::internal("Model output does not match class labels"));

        let shape: ApiError = leafscan::Error::ShapeMismatch {
            expected: vec![224, 224, 3],
            actual: vec![1, 1],
        }
        .into();
        assert_eq!(shape.status, 500);
        assert!(shape.detail.starts_with("Prediction failed"));
    }
}
