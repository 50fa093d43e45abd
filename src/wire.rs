use serde::Deserialize;
use serde_json::Value;

/// Envelope wrapping every REST response.
#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    pub error: Vec<String>,
    #[serde(default)]
    pub result: Option<Value>,
}
