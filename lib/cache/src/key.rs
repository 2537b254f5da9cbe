use crate::Compressor;
use md5::{Digest, Md5};

/// Derives the cache key of a query.
///
/// The key is the MD5 digest of the canonical query text and the `Accept` header (separated by
/// a NUL byte), suffixed with the compressor identifier.
pub fn cache_key(canonical_query: &str, accept: &str, compressor: Compressor) -> String {
    let digest = Md5::new()
        .chain_update(canonical_query)
        .chain_update([0_u8])
        .chain_update(accept)
        .finalize();
    format!("{}.{}", hex::encode(digest), compressor.id())
}
