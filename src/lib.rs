//! `formicd`: metadata-and-data service for a network-backed POSIX-style
//! filesystem. See `DESIGN.md` for how each module is grounded.

pub mod config;
pub mod error;
pub mod fsops;
pub mod gateway;
pub mod idgen;
pub mod keys;
pub mod metrics;
pub mod pb;
pub mod rpc;
pub mod telemetry;
