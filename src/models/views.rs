use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Last known value for one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValueSlot {
    pub value: String,
    /// True when `value` is an error placeholder.
    pub error: bool,
    /// Sequence number of the request that produced `value`; 0 when never written.
    pub seq: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ValueSlot {
    pub fn is_set(&self) -> bool {
        self.updated_at.is_some()
    }
}

pub fn error_placeholder(endpoint_id: &str) -> String {
    format!("Error loading '{}'", endpoint_id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnreachableCause {
    Generic,
    /// A regular endpoint fetch failed at the transport level.
    Endpoint { id: String },
    /// The probe got a response with a non-OK status.
    HttpStatus { code: u16 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BackendStatus {
    #[default]
    Unknown,
    Reachable {
        status: String,
    },
    Unreachable {
        cause: UnreachableCause,
    },
}

impl BackendStatus {
    pub fn is_reachable(&self) -> bool {
        matches!(self, BackendStatus::Reachable { .. })
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, BackendStatus::Unreachable { .. })
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendStatus::Unknown => f.write_str("Checking..."),
            BackendStatus::Reachable { status } if status.is_empty() => f.write_str("Backend OK!"),
            BackendStatus::Reachable { status } => write!(f, "Backend OK! ({})", status),
            BackendStatus::Unreachable { cause } => match cause {
                UnreachableCause::Generic => f.write_str("Backend OFFLINE"),
                UnreachableCause::Endpoint { id } => write!(f, "Backend OFFLINE ({} failed)", id),
                UnreachableCause::HttpStatus { code } => write!(f, "Backend error: {}", code),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub id: String,
    #[serde(flatten)]
    pub slot: ValueSlot,
}

/// Everything the rendering layer is allowed to see.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub backend_status: String,
    pub reachable: bool,
    pub slots: Vec<SlotView>,
}

impl Snapshot {
    pub fn value(&self, id: &str) -> Option<&str> {
        self.slots
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.slot.value.as_str())
    }
}
