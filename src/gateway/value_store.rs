//! Value-store client: `K(inode[, block])` -> opaque bytes,
//! last-writer-wins by microsecond timestamp (spec.md sections 4.3, 6).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_stream::once;
use tonic::transport::Channel;

use crate::config::STORE_CALL_TIMEOUT_SECS;
use crate::error::{Result, ServerError};
use crate::gateway::{now_tsm, Tsm};
use crate::keys::Key;
use crate::pb::formic::store::{
    value_store_client::ValueStoreClient, ValueDeleteRequest, ValueReadRequest,
    ValueWriteRequest,
};

/// chunk-store operations the Filesystem Operations layer needs.
#[async_trait]
pub trait ValueStore: Send + Sync {
    /// Read the value stored at `key`. A missing key returns an empty
    /// byte sequence, not an error (spec.md section 4.3).
    async fn get_chunk(&self, key: Key) -> Result<Vec<u8>>;

    /// Write `value` to `key`, stamped with the current time. Returns
    /// `Err(ServerError::Conflict(..))` if a newer value already won the
    /// race at this key.
    async fn put_chunk(&self, key: Key, value: Vec<u8>) -> Result<()>;

    /// Delete the value at `key`, accepted only if this call's timestamp
    /// is newer than whatever is currently stored.
    async fn delete_chunk(&self, key: Key) -> Result<()>;
}

fn timeout() -> Duration {
    Duration::from_secs(STORE_CALL_TIMEOUT_SECS)
}

/// `ValueStore` backed by the generated `ValueStoreClient` gRPC stub.
pub struct RemoteValueStore {
    client: RwLock<ValueStoreClient<Channel>>,
}

impl RemoteValueStore {
    pub fn new(channel: Channel) -> Self {
        RemoteValueStore {
            client: RwLock::new(ValueStoreClient::new(channel)),
        }
    }

    /// Replace the underlying connection, e.g. after a ring change moves
    /// this key range to a different backend address. Callers hold only a
    /// read lock during normal request traffic; this is the sole writer.
    pub async fn reconnect(&self, channel: Channel) {
        let mut guard = self.client.write().await;
        *guard = ValueStoreClient::new(channel);
    }
}

#[async_trait]
impl ValueStore for RemoteValueStore {
    async fn get_chunk(&self, key: Key) -> Result<Vec<u8>> {
        let mut client = self.client.read().await.clone();
        let req = ValueReadRequest { key_a: key.a, key_b: key.b };
        let resp = tokio::time::timeout(timeout(), client.read(req)).await??;
        let mut stream = resp.into_inner();
        match stream.message().await? {
            Some(msg) => Ok(msg.value),
            None => Ok(Vec::new()),
        }
    }

    async fn put_chunk(&self, key: Key, value: Vec<u8>) -> Result<()> {
        let mut client = self.client.read().await.clone();
        let tsm = now_tsm();
        let req = ValueWriteRequest { key_a: key.a, key_b: key.b, value, tsm };
        let resp = tokio::time::timeout(timeout(), client.write(once(req))).await??;
        let mut stream = resp.into_inner();
        if let Some(msg) = stream.message().await? {
            if msg.tsm > tsm {
                return Err(ServerError::Conflict(format!("{key:?}")));
            }
        }
        Ok(())
    }

    async fn delete_chunk(&self, key: Key) -> Result<()> {
        let mut client = self.client.read().await.clone();
        let tsm = now_tsm();
        let req = ValueDeleteRequest { key_a: key.a, key_b: key.b, tsm };
        tokio::time::timeout(timeout(), client.delete(req)).await??;
        Ok(())
    }
}

/// In-memory `ValueStore`, used by the filesystem-operations test suite
/// and by integration tests that don't need a real store behind gRPC.
#[derive(Default)]
pub struct MemoryValueStore {
    records: Mutex<HashMap<(u64, u64), (Vec<u8>, Tsm)>>,
}

impl MemoryValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ValueStore for MemoryValueStore {
    async fn get_chunk(&self, key: Key) -> Result<Vec<u8>> {
        let records = self.records.lock().expect("value store mutex poisoned");
        Ok(records
            .get(&(key.a, key.b))
            .map(|(value, _)| value.clone())
            .unwrap_or_default())
    }

    async fn put_chunk(&self, key: Key, value: Vec<u8>) -> Result<()> {
        let tsm = now_tsm();
        let mut records = self.records.lock().expect("value store mutex poisoned");
        if let Some((_, existing_tsm)) = records.get(&(key.a, key.b)) {
            if *existing_tsm > tsm {
                return Err(ServerError::Conflict(format!("{key:?}")));
            }
        }
        records.insert((key.a, key.b), (value, tsm));
        Ok(())
    }

    async fn delete_chunk(&self, key: Key) -> Result<()> {
        let tsm = now_tsm();
        let mut records = self.records.lock().expect("value store mutex poisoned");
        if let Some((_, existing_tsm)) = records.get(&(key.a, key.b)) {
            if *existing_tsm > tsm {
                return Err(ServerError::Conflict(format!("{key:?}")));
            }
        }
        records.remove(&(key.a, key.b));
        Ok(())
    }
}
