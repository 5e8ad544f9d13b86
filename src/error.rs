use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    // Bad local input; never reaches the network
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("session storage unavailable: {0}")]
    Storage(String),
}

impl ClientError {
    // Build an API error from a non-2xx status and its (possibly empty) body
    pub fn from_status(status: u16, body: &serde_json::Value) -> Self {
        let message = match body.get("detail") {
            Some(serde_json::Value::String(detail)) if !detail.is_empty() => detail.clone(),
            Some(other) if !other.is_string() && !is_falsy(other) => other.to_string(),
            _ => format!("Erro HTTP {}", status),
        };
        ClientError::Api { status, message }
    }
}

fn is_falsy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Null => true,
        _ => false,
    }
}
