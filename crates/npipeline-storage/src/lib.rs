#![deny(missing_docs, unsafe_code)]
#![warn(unreachable_pub)]

//! The storage-provider contract (spec §4.7): a uniform file/object
//! interface over local and cloud backends that connector nodes depend
//! on. Interface only — spec.md explicitly scopes concrete connectors
//! (Excel, JSON, CSV, PostgreSQL, cloud object stores) out, so this crate
//! ships no backend, only the trait, its supporting value types, and the
//! closed error taxonomy every backend must map onto.
//!
//! Shaped after the teacher's `object_store` integration
//! (`otap/src/object_store.rs`), which resolves a declarative
//! `StorageType` config into a concrete `object_store::ObjectStore` —
//! this crate keeps that trait shape (`open_read`/`open_write`/`exists`/
//! `list`/`metadata`/`capabilities`) without depending on the
//! `object_store` crate itself, since no implementation lives here.

mod error;
mod item;
mod provider;
mod uri;

pub use error::Error;
pub use item::{StorageCapabilities, StorageItem, StorageMetadata};
pub use provider::{ReadStream, StorageProvider, WriteStream};
pub use uri::StorageUri;
