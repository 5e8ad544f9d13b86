mod http;

pub use http::HttpBackend;

use crate::error::ClientError;
use async_trait::async_trait;
use serde_json::Value;

// Transport to the voting backend. Paths are relative to the resolved base URL.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get(&self, path: &str) -> Result<Value, ClientError>;
    async fn post(&self, path: &str, body: Value) -> Result<Value, ClientError>;
}

// Parse a response body, substituting an empty record for anything that is not JSON
pub fn parse_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or_else(|_| Value::Object(Default::default()))
}

// Shared success/failure split for every verb
pub fn into_result(status: u16, body: Value) -> Result<Value, ClientError> {
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(ClientError::from_status(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_bodies_become_empty_records() {
        assert_eq!(parse_body(b""), json!({}));
        assert_eq!(parse_body(b"<html>bad gateway</html>"), json!({}));
        assert_eq!(parse_body(br#"{"status":"ok"}"#), json!({ "status": "ok" }));
    }

    #[test]
    fn non_success_statuses_fail() {
        assert!(into_result(200, json!({})).is_ok());
        assert!(into_result(204, json!({})).is_ok());

        let err = into_result(404, json!({})).unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
        assert_eq!(err.to_string(), "Erro HTTP 404");
    }
}
