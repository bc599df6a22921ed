//! Maps a raw JSON response body to the single display value of its endpoint.

use serde_json::Value;

use crate::models::endpoint::Endpoint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Value(String),
    /// The body parsed but the endpoint's field is absent or not a scalar.
    MissingField { field: &'static str },
    /// No field mapping exists for this endpoint id.
    Unmapped { id: String },
}

impl Extraction {
    pub fn value(&self) -> Option<&str> {
        match self {
            Extraction::Value(v) => Some(v),
            _ => None,
        }
    }
}

pub fn extract(endpoint_id: &str, body: &Value) -> Extraction {
    match endpoint_id.parse::<Endpoint>() {
        Ok(endpoint) => extract_for(endpoint, body),
        Err(_) => Extraction::Unmapped {
            id: endpoint_id.to_string(),
        },
    }
}

pub fn extract_for(endpoint: Endpoint, body: &Value) -> Extraction {
    let field = endpoint.field();
    match body.get(field) {
        Some(Value::String(s)) => Extraction::Value(s.clone()),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Extraction::Value(v.to_string()),
        _ => Extraction::MissingField { field },
    }
}
