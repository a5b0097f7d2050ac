//! Storage Gateway: a thin, typed wrapper over the two external stores
//! (spec.md section 4.3). Hides per-call stream setup/send/receive/close,
//! stamps every write with a microsecond timestamp, and turns the
//! store's "a newer value was already written" signal into
//! [`crate::error::ServerError::Conflict`] rather than a retryable failure.
//!
//! Two implementations exist behind each trait: a `Remote*` one backed by
//! the generated `tonic` clients for `proto/store.proto`, and an in-memory
//! one used by the filesystem-operations test suite — this mirrors the
//! reference's split between `OortFS` (real store client) and the
//! hand-written `TestFS`/`TestDS` mocks in `formicd/api_test.go`.

pub mod group_store;
pub mod value_store;

pub use group_store::{GroupStore, MemoryGroupStore, RemoteGroupStore};
pub use value_store::{MemoryValueStore, RemoteValueStore, ValueStore};

use std::time::{SystemTime, UNIX_EPOCH};

/// Microsecond-resolution timestamp, as stamped on every store write.
pub type Tsm = i64;

/// Current time in microseconds since the Unix epoch.
pub fn now_tsm() -> Tsm {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_micros() as Tsm
}
