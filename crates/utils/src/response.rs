use serde::{Deserialize, Serialize};

/// Envelope used for every non-success response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<E = ()> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_data: Option<E>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<E> ApiResponse<E> {
    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            error_data: None,
            message: Some(message.to_string()),
        }
    }

    pub fn error_with_data(message: &str, data: E) -> Self {
        Self {
            success: false,
            error_data: Some(data),
            message: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_omits_empty_fields() {
        let body: ApiResponse<Vec<String>> =
            ApiResponse::error_with_data("Validation failed", vec!["Name is required".into()]);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "errorData": ["Name is required"],
                "message": "Validation failed",
            })
        );
    }

    #[test]
    fn bare_error_has_only_a_message() {
        let body: ApiResponse = ApiResponse::error("An unexpected error occurred");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "success": false,
                "message": "An unexpected error occurred",
            })
        );
    }
}
