#![doc(test(attr(deny(warnings))))]

//! An advisory cache for SPARQL query results.
//!
//! A [`Cache`] combines a [`CacheStore`] (where bytes live) with a [`Compressor`] (how they are
//! encoded). Reads never fail: storage faults and undecodable payloads are reported as misses,
//! and writes only log their failures.

mod cache;
mod compressor;
mod entry;
mod error;
mod key;
pub mod store;

pub use cache::Cache;
pub use compressor::Compressor;
pub use entry::CacheEntry;
pub use error::CacheError;
pub use key::cache_key;
pub use store::{CacheStore, CacheStoreConfig, CacheStoreKind};
