//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::DurationSpec;

/// Request body for storing an entry (PUT /entry/:key)
///
/// # Fields
/// - `content`: The content to cache
/// - `duration`: Milliseconds or a string like `"5 minutes"` (cache default if omitted)
/// - `group`: Optional group to file the key under
#[derive(Debug, Clone, Deserialize)]
pub struct PutEntryRequest {
    pub content: String,
    #[serde(default)]
    pub duration: Option<DurationSpec>,
    #[serde(default)]
    pub group: Option<String>,
}

impl PutEntryRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match &self.group {
            Some(group) if group.trim().is_empty() => Some("Group cannot be empty".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_request_deserialize() {
        let json = r#"{"content": "hello"}"#;
        let req: PutEntryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.content, "hello");
        assert!(req.duration.is_none());
        assert!(req.group.is_none());
    }

    #[test]
    fn test_put_request_durations() {
        let json = r#"{"content": "a", "duration": 1500}"#;
        let req: PutEntryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.duration, Some(DurationSpec::Millis(1500)));

        let json = r#"{"content": "a", "duration": "2 hours", "group": "users"}"#;
        let req: PutEntryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.duration, Some(DurationSpec::Text("2 hours".to_string())));
        assert_eq!(req.group.as_deref(), Some("users"));
    }

    #[test]
    fn test_validate_blank_group() {
        let req = PutEntryRequest {
            content: "v".to_string(),
            duration: None,
            group: Some("  ".to_string()),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = PutEntryRequest {
            content: "v".to_string(),
            duration: Some(DurationSpec::Millis(60)),
            group: Some("g".to_string()),
        };
        assert!(req.validate().is_none());
    }
}
