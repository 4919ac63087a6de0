use tracing::{debug, warn};

use leafscan::predict::{predict_image, PredictionResponse};

use crate::error::ApiError;
use crate::state::AppState;
use crate::util::multipart::{extract_boundary, find_part};

/// Form field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// `POST /predict` with a `multipart/form-data` body.
pub fn handle(state: &AppState, content_type: Option<&str>, body: &[u8]) -> Result<PredictionResponse, ApiError> {
    let part = content_type
        .and_then(extract_boundary)
        .and_then(|boundary| find_part(body, &boundary, FILE_FIELD))
        .ok_or_else(|| ApiError::missing_field(FILE_FIELD))?;

    let is_image = part
        .content_type
        .as_deref()
        .map_or(false, |ct| ct.starts_with("image/"));
    if !is_image {
        return Err(ApiError::bad_request("Only image uploads are allowed"));
    }

    debug!(filename = ?part.filename, bytes = part.data.len(), "classifying upload");
    predict_image(&state.model, state.labels, &part.data).map_err(|e| {
        warn!(error = %e, "prediction failed");
        ApiError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use leafscan::catalog::CLASS_NAMES;
    use leafscan::network::{LayerConfig, ModelConfig};
    use leafscan::{ConfidenceTier, Layer, Sequential, Severity};
    use std::io::Cursor;

    const BOUNDARY: &str = "leafscan-test";

    /// Pools the 224×224 input down to 28×28 and lets the output bias decide.
    fn state_favouring(class: usize, classes: usize) -> AppState {
        let config = ModelConfig::sequential(
            "tiny",
            vec![
                LayerConfig::input("input_layer", &[224, 224, 3]),
                LayerConfig::max_pooling2d("pool", [8, 8]),
                LayerConfig::flatten("flatten"),
                LayerConfig::dense("dense", classes, "softmax"),
            ],
        );
        let mut model = Sequential::from_config(&config).unwrap();
        if let Some(Layer::Dense(dense)) = model.layers_mut().last_mut() {
            let mut bias = vec![0.0; classes];
            bias[class] = 5.0;
            dense.biases = Some(bias);
        }
        AppState {
            model,
            labels: &CLASS_NAMES,
        }
    }

    fn png() -> Vec<u8> {
        let img = RgbImage::from_pixel(30, 20, Rgb([40, 160, 60]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageOutputFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn form(field: &str, part_type: Option<&str>, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"leaf.png\"\r\n",
            BOUNDARY, field
        )
        .into_bytes();
        if let Some(ct) = part_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", ct).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn content_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    #[test]
    fn classifies_uploaded_png() {
        let state = state_favouring(14, 15);
        let body = form("file", Some("image/png"), &png());
        let response = handle(&state, Some(&content_type()), &body).unwrap();

        assert_eq!(response.disease, "Healthy");
        assert_eq!(response.severity, Severity::Low);
        assert_eq!(response.confidence, ConfidenceTier::High);
        assert_eq!(response.top_predictions.len(), 3);
    }

    #[test]
    fn missing_file_part_is_422() {
        let state = state_favouring(0, 15);
        let body = form("image", Some("image/png"), &png());
        let err = handle(&state, Some(&content_type()), &body).unwrap_err();
        assert_eq!(err, ApiError::missing_field("file"));

        let err = handle(&state, Some("application/json"), b"{}").unwrap_err();
        assert_eq!(err.status, 422);
        let err = handle(&state, None, b"").unwrap_err();
        assert_eq!(err.status, 422);
    }

    #[test]
    fn non_image_content_type_is_rejected() {
        let state = state_favouring(0, 15);
        for part_type in [Some("text/plain"), None] {
            let body = form("file", part_type, &png());
            let err = handle(&state, Some(&content_type()), &body).unwrap_err();
            assert_eq!(err, ApiError::bad_request("Only image uploads are allowed"));
        }
    }

    #[test]
    fn corrupted_image_is_400() {
        let state = state_favouring(0, 15);
        let body = form("file", Some("image/jpeg"), b"\xff\xd8 not really a jpeg");
        let err = handle(&state, Some(&content_type()), &body).unwrap_err();
        assert_eq!(err, ApiError::bad_request("Invalid or corrupted image file"));

        let image = png();
        let body = form("file", Some("image/png"), &image[..image.len() / 2]);
        let err = handle(&state, Some(&content_type()), &body).unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn identical_uploads_get_identical_responses() {
        let state = state_favouring(3, 15);
        let body = form("file", Some("image/png"), &png());
        let first = handle(&state, Some(&content_type()), &body).unwrap();
        let second = handle(&state, Some(&content_type()), &body).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn output_wider_than_labels_is_500() {
        let state = state_favouring(15, 16);
        let body = form("file", Some("image/png"), &png());
        let err = handle(&state, Some(&content_type()), &body).unwrap_err();
        assert_eq!(err, ApiError::internal("Model output does not match class labels"));
    }
}
