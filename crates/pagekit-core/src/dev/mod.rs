//! Serving layer: the resident build service and request resolution.

pub mod serve;
pub mod service;

pub use serve::{negotiate_encoding, resolve_request, AssetSource, DirSource, Resolution};
pub use service::{BuildService, RebuildEvent, SnapshotBuilder};
