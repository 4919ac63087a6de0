use serde_json::{json, Value};

/// `GET /`
pub fn handle() -> Value {
    json!({"status": "AI service running"})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::json_response;
    use std::io::Read;
    use tiny_http::StatusCode;

    #[test]
    fn health_reports_service_running() {
        assert_eq!(handle(), json!({"status": "AI service running"}));

        let mut body = String::new();
        let response = json_response(200, &handle());
        assert_eq!(response.status_code(), StatusCode(200));
        response.into_reader().read_to_string(&mut body).unwrap();
        assert_eq!(body, r#"{"status":"AI service running"}"#);
    }
}
