//! Port doubles for unit and integration tests.
//!
//! Enabled with the `test-utils` feature.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{ClientId, CloudEvent, SubscriberRecord};

use crate::errors::{DeliveryError, RegistryError, StoreError};
use crate::ports::outbound::{MetricsSink, Outcome, RestDelivery, SubscriberRegistry, SubscriptionStore};

/// Metrics sink that remembers every update.
#[derive(Default)]
pub struct RecordingMetrics {
    received: Mutex<HashMap<(String, Outcome), u64>>,
    acked: Mutex<HashMap<(String, Outcome), u64>>,
    status: Mutex<HashMap<(String, Outcome), u64>>,
    adjustments: Mutex<Vec<i64>>,
    gauge: AtomicI64,
}

impl RecordingMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn received(&self, address: &str, outcome: Outcome) -> u64 {
        lookup(&self.received, address, outcome)
    }

    pub fn acked(&self, address: &str, outcome: Outcome) -> u64 {
        lookup(&self.acked, address, outcome)
    }

    pub fn status(&self, address: &str, outcome: Outcome) -> u64 {
        lookup(&self.status, address, outcome)
    }

    /// Every delta applied to the active subscription gauge, in order.
    pub fn adjustments(&self) -> Vec<i64> {
        self.adjustments.lock().clone()
    }

    /// Net value of the active subscription gauge.
    pub fn active_subscriptions(&self) -> i64 {
        self.gauge.load(Ordering::SeqCst)
    }

    /// Whether no metric was touched at all.
    pub fn is_untouched(&self) -> bool {
        self.received.lock().is_empty()
            && self.acked.lock().is_empty()
            && self.status.lock().is_empty()
            && self.adjustments.lock().is_empty()
    }
}

fn lookup(map: &Mutex<HashMap<(String, Outcome), u64>>, address: &str, outcome: Outcome) -> u64 {
    map.lock()
        .get(&(address.to_string(), outcome))
        .copied()
        .unwrap_or(0)
}

fn bump(map: &Mutex<HashMap<(String, Outcome), u64>>, address: &str, outcome: Outcome) {
    *map.lock().entry((address.to_string(), outcome)).or_insert(0) += 1;
}

impl MetricsSink for RecordingMetrics {
    fn event_received(&self, address: &str, outcome: Outcome) {
        bump(&self.received, address, outcome);
    }

    fn event_acknowledged(&self, address: &str, outcome: Outcome) {
        bump(&self.acked, address, outcome);
    }

    fn status_acknowledged(&self, address: &str, outcome: Outcome) {
        bump(&self.status, address, outcome);
    }

    fn adjust_active_subscriptions(&self, delta: i64) {
        self.adjustments.lock().push(delta);
        self.gauge.fetch_add(delta, Ordering::SeqCst);
    }
}

/// Canned answer of a [`ScriptedRestClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scripted {
    /// Respond with this HTTP status.
    Status(u16),
    /// Connection refused by the remote host.
    Refused,
    /// Deadline exceeded.
    Timeout,
    /// Host lookup failure.
    Dns,
    /// Transport failure that is not a connectivity problem.
    Broken,
}

/// Which port method was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Post,
    PostEvent,
    PostCloudEvent,
}

/// One request seen by a [`ScriptedRestClient`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub uri: String,
    pub body: Vec<u8>,
}

impl RecordedCall {
    /// Decode the body as a CloudEvent.
    pub fn event(&self) -> Option<CloudEvent> {
        CloudEvent::from_bytes(&self.body).ok()
    }
}

/// REST delivery double answering per URI, `204` unless scripted.
#[derive(Default)]
pub struct ScriptedRestClient {
    answers: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRestClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer every request to `uri` with `answer`.
    pub fn respond(&self, uri: impl Into<String>, answer: Scripted) {
        self.answers.lock().insert(uri.into(), answer);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, uri: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.uri == uri)
            .cloned()
            .collect()
    }

    fn answer(&self, kind: CallKind, uri: &str, body: Vec<u8>) -> Result<u16, DeliveryError> {
        self.calls.lock().push(RecordedCall {
            kind,
            uri: uri.to_string(),
            body,
        });
        let answer = self
            .answers
            .lock()
            .get(uri)
            .copied()
            .unwrap_or(Scripted::Status(204));
        match answer {
            Scripted::Status(status) => Ok(status),
            Scripted::Refused => Err(DeliveryError::connect(
                uri,
                io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
            Scripted::Timeout => Err(DeliveryError::timeout(uri)),
            Scripted::Dns => Err(DeliveryError::connect(
                uri,
                io::Error::new(
                    io::ErrorKind::Other,
                    "dns error: failed to lookup address information",
                ),
            )),
            Scripted::Broken => Err(DeliveryError::request(
                uri,
                io::Error::new(io::ErrorKind::InvalidData, "invalid HTTP response"),
            )),
        }
    }
}

#[async_trait]
impl RestDelivery for ScriptedRestClient {
    async fn post(&self, uri: &str, body: Vec<u8>) -> Result<u16, DeliveryError> {
        self.answer(CallKind::Post, uri, body)
    }

    async fn post_event(&self, uri: &str, event: &CloudEvent) -> Result<(), DeliveryError> {
        let body = event
            .to_bytes()
            .map_err(|e| DeliveryError::Encode(e.to_string()))?;
        match self.answer(CallKind::PostEvent, uri, body)? {
            status if (200..300).contains(&status) => Ok(()),
            status => Err(DeliveryError::UnexpectedStatus {
                uri: uri.to_string(),
                status,
            }),
        }
    }

    async fn post_cloud_event(&self, uri: &str, raw: Vec<u8>) -> Result<u16, DeliveryError> {
        self.answer(CallKind::PostCloudEvent, uri, raw)
    }
}

/// One `upsert` call seen by a [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreWrite {
    pub records: Vec<SubscriberRecord>,
    pub node_name: String,
    pub namespace: String,
}

/// Subscription store double, optionally failing every write.
#[derive(Default)]
pub struct RecordingStore {
    writes: Mutex<Vec<StoreWrite>>,
    failing: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl SubscriptionStore for RecordingStore {
    async fn upsert(
        &self,
        records: Vec<SubscriberRecord>,
        node_name: &str,
        namespace: &str,
    ) -> Result<(), StoreError> {
        self.writes.lock().push(StoreWrite {
            records,
            node_name: node_name.to_string(),
            namespace: namespace.to_string(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::NotInitialized("store offline".into()));
        }
        Ok(())
    }
}

/// Registry wrapper whose deletions fail while `failing` is set.
pub struct FlakyDeleteRegistry<R> {
    inner: R,
    failing: AtomicBool,
}

impl<R: SubscriberRegistry> FlakyDeleteRegistry<R> {
    pub fn new(inner: R) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failing: AtomicBool::new(true),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: SubscriberRegistry> SubscriberRegistry for FlakyDeleteRegistry<R> {
    fn subscribers_by_resource(&self, address: &str) -> HashMap<ClientId, Option<String>> {
        self.inner.subscribers_by_resource(address)
    }

    fn increment_failure_and_check_threshold(&self, client_id: ClientId) -> bool {
        self.inner.increment_failure_and_check_threshold(client_id)
    }

    fn reset_failure_count(&self, client_id: ClientId) {
        self.inner.reset_failure_count(client_id);
    }

    fn failure_count(&self, client_id: ClientId) -> u32 {
        self.inner.failure_count(client_id)
    }

    fn failure_threshold(&self) -> u32 {
        self.inner.failure_threshold()
    }

    fn delete_all_subscriptions(&self, client_id: ClientId) -> Result<usize, RegistryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("registry offline".into()));
        }
        self.inner.delete_all_subscriptions(client_id)
    }
}
