//! Group-store client: `(groupKey, memberKey)` -> opaque bytes, plus a
//! `list(group)` operation, used for directory membership rows
//! (spec.md sections 3, 4.3, 6).

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
    group_store_client::GroupStoreClient, GroupDeleteRequest, GroupListRequest,
    GroupLookupRequest, GroupWriteRequest,
};

/// Directory-membership operations the Filesystem Operations layer needs.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Write `value` under `(group, member)`, stamped with the current time.
    async fn write(&self, group: Key, member: Key, value: Vec<u8>) -> Result<()>;

    /// Read the value under `(group, member)`. Empty if absent.
    async fn read(&self, group: Key, member: Key) -> Result<Vec<u8>>;

    /// `true` if `(group, member)` currently has a live record.
    async fn lookup(&self, group: Key, member: Key) -> Result<bool>;

    /// All `(member, value)` pairs currently live under `group`.
    async fn list(&self, group: Key) -> Result<Vec<(Key, Vec<u8>)>>;

    /// Delete `(group, member)`, accepted only if this call's timestamp is
    /// newer than whatever is currently stored.
    async fn delete(&self, group: Key, member: Key) -> Result<()>;
}

fn timeout() -> Duration {
    Duration::from_secs(STORE_CALL_TIMEOUT_SECS)
}

/// `GroupStore` backed by the generated `GroupStoreClient` gRPC stub.
pub struct RemoteGroupStore {
    client: RwLock<GroupStoreClient<Channel>>,
}

impl RemoteGroupStore {
    pub fn new(channel: Channel) -> Self {
        RemoteGroupStore {
            client: RwLock::new(GroupStoreClient::new(channel)),
        }
    }

    pub async fn reconnect(&self, channel: Channel) {
        let mut guard = self.client.write().await;
        *guard = GroupStoreClient::new(channel);
    }
}

#[async_trait]
impl GroupStore for RemoteGroupStore {
    async fn write(&self, group: Key, member: Key, value: Vec<u8>) -> Result<()> {
        let mut client = self.client.read().await.clone();
        let tsm = now_tsm();
        let req = GroupWriteRequest {
            key_a: group.a,
            key_b: group.b,
            name_key_a: member.a,
            name_key_b: member.b,
            value,
            tsm,
        };
        let resp = tokio::time::timeout(timeout(), client.write(once(req))).await??;
        let mut stream = resp.into_inner();
        if let Some(msg) = stream.message().await? {
            if msg.tsm > tsm {
                return Err(ServerError::Conflict(format!("{group:?}/{member:?}")));
            }
        }
        Ok(())
    }

    async fn read(&self, group: Key, member: Key) -> Result<Vec<u8>> {
        let mut client = self.client.read().await.clone();
        let req = crate::pb::formic::store::GroupReadRequest {
            key_a: group.a,
            key_b: group.b,
            name_key_a: member.a,
            name_key_b: member.b,
        };
        let resp = tokio::time::timeout(timeout(), client.read(req)).await??;
        let mut stream = resp.into_inner();
        match stream.message().await? {
            Some(msg) => Ok(msg.value),
            None => Ok(Vec::new()),
        }
    }

    async fn lookup(&self, group: Key, member: Key) -> Result<bool> {
        let mut client = self.client.read().await.clone();
        let req = GroupLookupRequest {
            key_a: group.a,
            key_b: group.b,
            name_key_a: member.a,
            name_key_b: member.b,
        };
        let resp = tokio::time::timeout(timeout(), client.lookup(req)).await??;
        Ok(resp.into_inner().found)
    }

    async fn list(&self, group: Key) -> Result<Vec<(Key, Vec<u8>)>> {
        let mut client = self.client.read().await.clone();
        let req = GroupListRequest { key_a: group.a, key_b: group.b };
        let resp = tokio::time::timeout(timeout(), client.lookup_group(req)).await??;
        Ok(resp
            .into_inner()
            .items
            .into_iter()
            .map(|item| (Key::new(item.name_key_a, item.name_key_b), item.value))
            .collect())
    }

    async fn delete(&self, group: Key, member: Key) -> Result<()> {
        let mut client = self.client.read().await.clone();
        let tsm = now_tsm();
        let req = GroupDeleteRequest {
            key_a: group.a,
            key_b: group.b,
            name_key_a: member.a,
            name_key_b: member.b,
            tsm,
        };
        tokio::time::timeout(timeout(), client.delete(req)).await??;
        Ok(())
    }
}

type GroupKey = (u64, u64, u64, u64);

/// In-memory `GroupStore`, used by the filesystem-operations test suite.
#[derive(Default)]
pub struct MemoryGroupStore {
    records: Mutex<HashMap<GroupKey, (Vec<u8>, Tsm)>>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn full_key(group: Key, member: Key) -> GroupKey {
        (group.a, group.b, member.a, member.b)
    }
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn write(&self, group: Key, member: Key, value: Vec<u8>) -> Result<()> {
        let tsm = now_tsm();
        let mut records = self.records.lock().expect("group store mutex poisoned");
        let key = Self::full_key(group, member);
        if let Some((_, existing_tsm)) = records.get(&key) {
            if *existing_tsm > tsm {
                return Err(ServerError::Conflict(format!("{group:?}/{member:?}")));
            }
        }
        records.insert(key, (value, tsm));
        Ok(())
    }

    async fn read(&self, group: Key, member: Key) -> Result<Vec<u8>> {
        let records = self.records.lock().expect("group store mutex poisoned");
        Ok(records
            .get(&Self::full_key(group, member))
            .map(|(value, _)| value.clone())
            .unwrap_or_default())
    }

    async fn lookup(&self, group: Key, member: Key) -> Result<bool> {
        let records = self.records.lock().expect("group store mutex poisoned");
        Ok(records.contains_key(&Self::full_key(group, member)))
    }

    async fn list(&self, group: Key) -> Result<Vec<(Key, Vec<u8>)>> {
        let records = self.records.lock().expect("group store mutex poisoned");
        Ok(records
            .iter()
            .filter(|((ga, gb, _, _), _)| *ga == group.a && *gb == group.b)
            .map(|((_, _, ma, mb), (value, _))| (Key::new(*ma, *mb), value.clone()))
            .collect())
    }

    async fn delete(&self, group: Key, member: Key) -> Result<()> {
        let tsm = now_tsm();
        let mut records = self.records.lock().expect("group store mutex poisoned");
        let key = Self::full_key(group, member);
        if let Some((_, existing_tsm)) = records.get(&key) {
            if *existing_tsm > tsm {
                return Err(ServerError::Conflict(format!("{group:?}/{member:?}")));
            }
        }
        records.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_lookup_read_roundtrip() {
        let store = MemoryGroupStore::new();
        let group = Key::new(1, 1);
        let member = Key::new(2, 2);
        assert!(!store.lookup(group, member).await.unwrap());
        store.write(group, member, b"child".to_vec()).await.unwrap();
        assert!(store.lookup(group, member).await.unwrap());
        assert_eq!(store.read(group, member).await.unwrap(), b"child");
    }

    #[tokio::test]
    async fn list_returns_only_this_group() {
        let store = MemoryGroupStore::new();
        let group_a = Key::new(1, 1);
        let group_b = Key::new(2, 2);
        store.write(group_a, Key::new(10, 10), b"a".to_vec()).await.unwrap();
        store.write(group_a, Key::new(11, 11), b"b".to_vec()).await.unwrap();
        store.write(group_b, Key::new(12, 12), b"c".to_vec()).await.unwrap();
        let items = store.list(group_a).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn delete_then_lookup_is_false() {
        let store = MemoryGroupStore::new();
        let group = Key::new(1, 1);
        let member = Key::new(2, 2);
        store.write(group, member, b"x".to_vec()).await.unwrap();
        store.delete(group, member).await.unwrap();
        assert!(!store.lookup(group, member).await.unwrap());
    }
}
