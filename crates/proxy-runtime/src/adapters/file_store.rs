//! # File Subscription Store
//!
//! Durable snapshot of active subscribers, one JSON file per node under
//! `<store_path>/<namespace>/<node>.json`. Writes go to a temp file that is
//! renamed over the snapshot, so readers never see a partial file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use cep_01_dispatch::{StoreError, SubscriptionStore};
use serde::{Deserialize, Serialize};
use shared_types::{ClientId, SubscriberAction, SubscriberRecord};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Retry policy for store initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreInit {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for StoreInit {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            attempts: 5,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    subscribers: Vec<SubscriberRecord>,
}

/// File-backed [`SubscriptionStore`].
#[derive(Debug)]
pub struct FileSubscriptionStore {
    root: PathBuf,
    // Serialises read-modify-write cycles on the snapshot files.
    write_lock: Mutex<()>,
}

impl FileSubscriptionStore {
    /// Open the store and make sure the snapshot for `node_name` exists,
    /// retrying per `policy`.
    pub async fn init(
        root: impl Into<PathBuf>,
        node_name: &str,
        namespace: &str,
        policy: StoreInit,
    ) -> Result<Self, StoreError> {
        let store = Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        };
        if node_name.is_empty() || namespace.is_empty() {
            return Err(StoreError::NotInitialized(
                "node name and namespace are required".into(),
            ));
        }

        let attempts = policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match store.ensure_snapshot(node_name, namespace).await {
                Ok(()) => {
                    info!(
                        path = %store.snapshot_path(node_name, namespace).display(),
                        "Subscription store initialized"
                    );
                    return Ok(store);
                }
                Err(e) if attempt < attempts => {
                    warn!(attempt, error = %e, "Subscription store init failed, retrying");
                    tokio::time::sleep(policy.interval).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(StoreError::NotInitialized(format!(
                        "giving up after {attempts} attempts: {e}"
                    )))
                }
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot_path(&self, node_name: &str, namespace: &str) -> PathBuf {
        self.root.join(namespace).join(format!("{node_name}.json"))
    }

    /// Persisted subscribers of `node_name`, ordered by client id.
    pub async fn load(
        &self,
        node_name: &str,
        namespace: &str,
    ) -> Result<Vec<SubscriberRecord>, StoreError> {
        Ok(self
            .read(node_name, namespace)
            .await?
            .into_values()
            .collect())
    }

    async fn ensure_snapshot(&self, node_name: &str, namespace: &str) -> Result<(), StoreError> {
        let path = self.snapshot_path(node_name, namespace);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::try_exists(&path).await? {
            // Fail early on a corrupt snapshot rather than on the first write.
            self.read(node_name, namespace).await?;
            return Ok(());
        }
        self.write(&path, &BTreeMap::new()).await
    }

    async fn read(
        &self,
        node_name: &str,
        namespace: &str,
    ) -> Result<BTreeMap<ClientId, SubscriberRecord>, StoreError> {
        let path = self.snapshot_path(node_name, namespace);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.is_empty() {
            return Ok(BTreeMap::new());
        }
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        Ok(snapshot
            .subscribers
            .into_iter()
            .map(|record| (record.client_id, record))
            .collect())
    }

    async fn write(
        &self,
        path: &Path,
        clients: &BTreeMap<ClientId, SubscriberRecord>,
    ) -> Result<(), StoreError> {
        let snapshot = Snapshot {
            subscribers: clients.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &bytes).await?;
        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for FileSubscriptionStore {
    async fn upsert(
        &self,
        records: Vec<SubscriberRecord>,
        node_name: &str,
        namespace: &str,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.snapshot_path(node_name, namespace);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut clients = self.read(node_name, namespace).await?;
        for record in records {
            match record.action {
                SubscriberAction::Delete => {
                    if clients.remove(&record.client_id).is_none() {
                        debug!(client_id = %record.client_id, "Deleted client was not persisted");
                    }
                }
                SubscriberAction::Upsert => {
                    clients.insert(record.client_id, record);
                }
            }
        }
        self.write(&path, &clients).await
    }
}
