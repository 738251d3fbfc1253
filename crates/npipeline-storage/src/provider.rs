//! The [`StorageProvider`] trait (spec §4.7): the uniform interface
//! connector nodes consume. Modelled on `object_store::ObjectStore`'s
//! shape (see the teacher's `object_store.rs`), narrowed to the six
//! operations spec.md names and restated over this crate's own
//! [`StorageUri`]/[`StorageItem`]/[`StorageMetadata`] types rather than
//! re-exporting the `object_store` crate directly, since no concrete
//! backend ships here.

use crate::error::Error;
use crate::item::{StorageCapabilities, StorageItem, StorageMetadata};
use crate::uri::StorageUri;
use futures::io::{AsyncRead, AsyncWrite};
use futures::stream::BoxStream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// A readable byte stream handed back by [`StorageProvider::open_read`].
pub type ReadStream = Pin<Box<dyn AsyncRead + Send>>;

/// A writable byte sink handed back by [`StorageProvider::open_write`].
pub type WriteStream = Pin<Box<dyn AsyncWrite + Send>>;

/// The storage-provider contract (spec §4.7): a uniform file/object
/// interface a connector node depends on without needing to know which
/// backend (local disk, S3, Azure, GCS) resolves it.
///
/// `Send + Sync` because, unlike the rest of this framework, concrete
/// backends do real network/disk I/O and are expected to run on a
/// multi-threaded executor shared across connector nodes — the same
/// reason `object_store::ObjectStore` itself requires `Send + Sync`.
#[async_trait::async_trait]
pub trait StorageProvider: Send + Sync {
    /// Opens `uri` for reading. Fails with [`Error::NotFound`] if it does
    /// not exist.
    async fn open_read(&self, uri: &StorageUri, cancel: CancellationToken) -> Result<ReadStream, Error>;

    /// Opens `uri` for writing, creating it if absent and overwriting it
    /// if present (providers that need conditional semantics express them
    /// through `uri`'s query parameters, e.g. `?if-none-match=*`).
    async fn open_write(&self, uri: &StorageUri, cancel: CancellationToken) -> Result<WriteStream, Error>;

    /// Whether `uri` currently exists.
    async fn exists(&self, uri: &StorageUri, cancel: CancellationToken) -> Result<bool, Error>;

    /// Lists entries under `prefix`. When `recursive` is `false` and the
    /// provider is [`StorageCapabilities::hierarchical`], only the
    /// immediate children are yielded; otherwise every descendant is.
    fn list(&self, prefix: &StorageUri, recursive: bool, cancel: CancellationToken) -> BoxStream<'static, Result<StorageItem, Error>>;

    /// Metadata for a single location, or `None` if it does not exist.
    async fn metadata(&self, uri: &StorageUri, cancel: CancellationToken) -> Result<Option<StorageMetadata>, Error>;

    /// What this provider supports, queried once by a connector before it
    /// commits to an access pattern.
    fn capabilities(&self) -> StorageCapabilities;
}
