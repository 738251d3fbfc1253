//! [`StorageItem`] and [`StorageMetadata`]: what `list` and `metadata`
//! hand back (spec §4.7), modelled after `object_store::ObjectMeta`.

use crate::uri::StorageUri;
use chrono::{DateTime, Utc};

/// One entry returned by [`crate::StorageProvider::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageItem {
    /// The entry's full location.
    pub uri: StorageUri,
    /// Size in bytes; `0` for a directory placeholder on a hierarchical
    /// provider.
    pub size: u64,
    /// `true` if this entry is itself a prefix/directory rather than a
    /// leaf object (only meaningful when `capabilities().hierarchical`).
    pub is_dir: bool,
}

/// Metadata for a single location, returned by
/// [`crate::StorageProvider::metadata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageMetadata {
    /// Size in bytes.
    pub size: u64,
    /// Last-modified time, if the backend tracks one.
    pub last_modified: Option<DateTime<Utc>>,
    /// An opaque version/content identifier, if the backend exposes one
    /// (used for conditional writes by a connector, not interpreted here).
    pub etag: Option<String>,
}

/// What a provider supports, queried once by a connector before it commits
/// to an access pattern (spec §4.7 `capabilities()`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageCapabilities {
    /// Supports [`crate::StorageProvider::open_read`].
    pub read: bool,
    /// Supports [`crate::StorageProvider::open_write`].
    pub write: bool,
    /// Supports deleting a location (not part of the minimal trait surface
    /// spec.md enumerates, but every real backend can report whether it
    /// would accept one).
    pub delete: bool,
    /// Supports [`crate::StorageProvider::list`].
    pub list: bool,
    /// Supports [`crate::StorageProvider::metadata`].
    pub metadata: bool,
    /// Locations form a true directory hierarchy rather than a flat key
    /// namespace with `/`-delimited prefixes (local filesystems: yes;
    /// most object stores: no).
    pub hierarchical: bool,
}
