use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch, RwLock};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use crate::models::endpoint::Endpoint;
use crate::models::views::{
    error_placeholder, BackendStatus, SlotView, Snapshot, UnreachableCause, ValueSlot,
};
use crate::normalizer::{extract, extract_for, Extraction};

use super::{read_json, ApiClient, ClientError};

/// Slots kept for ids outside the endpoint table; the oldest write is evicted beyond this.
pub const MAX_UNMAPPED_SLOTS: usize = 16;

fn is_tracked_id(id: &str) -> bool {
    id.parse::<Endpoint>().is_ok_and(|e| e.is_tracked())
}

/// What to store when a successful response lacks the endpoint's field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Store an empty value, as if the field were blank.
    #[default]
    Blank,
    /// Store the endpoint's error placeholder.
    Error,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrchestratorOptions {
    pub missing_field: MissingFieldPolicy,
    /// Drop completions that are older than the value already in the slot.
    pub fencing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RequestKey {
    pub endpoint: String,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Updated(String),
    /// An application error; the slot now holds the placeholder.
    Failed(String),
    /// No usable response; the slot is untouched and the backend marked unreachable.
    Unreachable,
    /// Discarded by fencing because a newer request already wrote the slot.
    Stale,
}

pub struct RequestTicket {
    pub key: RequestKey,
    pub handle: JoinHandle<FetchOutcome>,
}

impl RequestTicket {
    /// Waits for the request; `None` if it was cancelled.
    pub async fn wait(self) -> Option<FetchOutcome> {
        self.handle.await.ok()
    }
}

pub struct Mounted {
    pub requests: Vec<RequestTicket>,
    pub probe: JoinHandle<BackendStatus>,
}

pub struct Orchestrator {
    client: ApiClient,
    options: OrchestratorOptions,
    slots: RwLock<HashMap<String, ValueSlot>>,
    status: RwLock<BackendStatus>,
    next_seq: AtomicU64,
    in_flight: Mutex<HashMap<RequestKey, AbortHandle>>,
    revision: watch::Sender<u64>,
}

struct InFlightGuard {
    orch: Arc<Orchestrator>,
    key: RequestKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut m) = self.orch.in_flight.lock() {
            m.remove(&self.key);
        }
    }
}

impl Orchestrator {
    pub fn new(client: ApiClient, options: OrchestratorOptions) -> Self {
        let slots = Endpoint::TRACKED
            .iter()
            .map(|e| (e.id().to_string(), ValueSlot::default()))
            .collect();
        let (revision, _) = watch::channel(0);

        Self {
            client,
            options,
            slots: RwLock::new(slots),
            status: RwLock::new(BackendStatus::Unknown),
            next_seq: AtomicU64::new(1),
            in_flight: Mutex::new(HashMap::new()),
            revision,
        }
    }

    /// Fires every tracked endpoint and the liveness probe without awaiting any of them.
    pub fn mount(self: &Arc<Self>) -> Mounted {
        info!(
            "mounting {} endpoints against {:?}",
            Endpoint::TRACKED.len(),
            self.client.base_url
        );
        let requests = Endpoint::TRACKED
            .iter()
            .map(|e| self.request(e.id()))
            .collect();
        let probe = self.spawn_health_check();
        Mounted { requests, probe }
    }

    /// Starts an independent fetch for `id` and returns immediately.
    pub fn request(self: &Arc<Self>, id: &str) -> RequestTicket {
        let key = self.next_key(id);
        let guard = InFlightGuard {
            orch: self.clone(),
            key: key.clone(),
        };
        let (start_tx, start_rx) = oneshot::channel::<()>();

        let task_key = key.clone();
        let orch = self.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            // Wait until the abort handle is registered so the guard never runs first.
            let _ = start_rx.await;
            orch.run(&task_key).await
        });

        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), handle.abort_handle());
        let _ = start_tx.send(());

        RequestTicket { key, handle }
    }

    /// Runs one fetch for `id` to completion on the current task.
    pub async fn fetch(&self, id: &str) -> FetchOutcome {
        let key = self.next_key(id);
        self.run(&key).await
    }

    pub fn cancel(&self, key: &RequestKey) -> bool {
        let handle = self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        match handle {
            Some(h) => {
                h.abort();
                debug!("cancelled request {}#{}", key.endpoint, key.seq);
                true
            }
            None => false,
        }
    }

    pub fn abort_all(&self) {
        let drained: Vec<_> = self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .collect();
        if !drained.is_empty() {
            info!("aborting {} in-flight requests", drained.len());
        }
        for (_, h) in drained {
            h.abort();
        }
    }

    pub fn in_flight(&self) -> Vec<RequestKey> {
        let mut keys: Vec<_> = self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        keys.sort_by_key(|k| k.seq);
        keys
    }

    pub fn spawn_health_check(self: &Arc<Self>) -> JoinHandle<BackendStatus> {
        let orch = self.clone();
        tokio::spawn(async move { orch.check_health().await })
    }

    /// Liveness probe against `/health`.
    pub async fn check_health(&self) -> BackendStatus {
        let path = Endpoint::Health.id();
        let status = match self.client.get(path).await {
            Ok(resp) if resp.status().is_success() => match read_json(path, resp).await {
                Ok(body) => BackendStatus::Reachable {
                    status: extract_for(Endpoint::Health, &body)
                        .value()
                        .unwrap_or_default()
                        .to_string(),
                },
                Err(e) => {
                    warn!("health check failed: {}", e);
                    BackendStatus::Unreachable {
                        cause: UnreachableCause::Generic,
                    }
                }
            },
            Ok(resp) => {
                warn!("health check returned {}", resp.status());
                BackendStatus::Unreachable {
                    cause: UnreachableCause::HttpStatus {
                        code: resp.status().as_u16(),
                    },
                }
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                BackendStatus::Unreachable {
                    cause: UnreachableCause::Generic,
                }
            }
        };

        self.set_status(status.clone()).await;
        status
    }

    pub async fn backend_status(&self) -> BackendStatus {
        self.status.read().await.clone()
    }

    pub async fn slot(&self, id: &str) -> Option<ValueSlot> {
        self.slots.read().await.get(id).cloned()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let status = self.status.read().await.clone();
        let slots = self.slots.read().await;

        let mut views: Vec<SlotView> = Endpoint::TRACKED
            .iter()
            .filter_map(|e| {
                slots.get(e.id()).map(|s| SlotView {
                    id: e.id().to_string(),
                    slot: s.clone(),
                })
            })
            .collect();

        let mut extra: Vec<SlotView> = slots
            .iter()
            .filter(|(id, _)| !is_tracked_id(id))
            .map(|(id, s)| SlotView {
                id: id.clone(),
                slot: s.clone(),
            })
            .collect();
        extra.sort_by(|a, b| a.id.cmp(&b.id));
        views.extend(extra);

        Snapshot {
            backend_status: status.to_string(),
            reachable: status.is_reachable(),
            slots: views,
        }
    }

    /// Bumped after every slot or status write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn next_key(&self, id: &str) -> RequestKey {
        RequestKey {
            endpoint: id.to_string(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        }
    }

    async fn run(&self, key: &RequestKey) -> FetchOutcome {
        let path = key.endpoint.as_str();

        let resp = match self.client.get(path).await {
            Ok(r) => r,
            Err(e) => return self.transport_failure(key, e).await,
        };
        let http_status = resp.status();
        let body = match read_json(path, resp).await {
            Ok(b) => b,
            Err(e) => return self.transport_failure(key, e).await,
        };
        debug!("received {} for '{}': {}", http_status, path, body);

        if !http_status.is_success() {
            let detail = body
                .get("detail")
                .and_then(Value::as_str)
                .or_else(|| http_status.canonical_reason())
                .unwrap_or_default();
            warn!("error fetching '{}': {}", path, detail);
            return self.apply(key, error_placeholder(path), true).await;
        }

        match extract(path, &body) {
            Extraction::Value(v) => self.apply(key, v, false).await,
            Extraction::MissingField { field } => {
                warn!("response for '{}' has no usable '{}' field", path, field);
                match self.options.missing_field {
                    MissingFieldPolicy::Blank => self.apply(key, String::new(), false).await,
                    MissingFieldPolicy::Error => {
                        self.apply(key, error_placeholder(path), true).await
                    }
                }
            }
            Extraction::Unmapped { id } => {
                warn!("no field mapping for endpoint '{}'", id);
                self.apply(key, error_placeholder(path), true).await
            }
        }
    }

    async fn apply(&self, key: &RequestKey, value: String, error: bool) -> FetchOutcome {
        let mut slots = self.slots.write().await;
        if !slots.contains_key(&key.endpoint) {
            evict_unmapped(&mut slots);
        }
        let slot = slots.entry(key.endpoint.clone()).or_default();

        if self.options.fencing && slot.seq > key.seq {
            debug!(
                "discarding stale response for '{}' (#{} < #{})",
                key.endpoint, key.seq, slot.seq
            );
            return FetchOutcome::Stale;
        }

        *slot = ValueSlot {
            value: value.clone(),
            error,
            seq: key.seq,
            updated_at: Some(Utc::now()),
        };
        drop(slots);
        self.bump();

        if error {
            FetchOutcome::Failed(value)
        } else {
            FetchOutcome::Updated(value)
        }
    }

    async fn transport_failure(&self, key: &RequestKey, err: ClientError) -> FetchOutcome {
        warn!("request for '{}' failed: {}", key.endpoint, err);
        self.set_status(BackendStatus::Unreachable {
            cause: UnreachableCause::Endpoint {
                id: key.endpoint.clone(),
            },
        })
        .await;
        FetchOutcome::Unreachable
    }

    async fn set_status(&self, status: BackendStatus) {
        *self.status.write().await = status;
        self.bump();
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}

/// Makes room for one more unmapped slot.
fn evict_unmapped(slots: &mut HashMap<String, ValueSlot>) {
    let unmapped: Vec<(String, u64)> = slots
        .iter()
        .filter(|(id, _)| !is_tracked_id(id))
        .map(|(id, s)| (id.clone(), s.seq))
        .collect();
    if unmapped.len() < MAX_UNMAPPED_SLOTS {
        return;
    }
    let oldest = unmapped.into_iter().min_by_key(|(_, seq)| *seq);
    if let Some((id, _)) = oldest {
        debug!("evicting unmapped slot '{}'", id);
        slots.remove(&id);
    }
}
