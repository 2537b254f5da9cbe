use crate::CacheError;
use std::fmt;
use std::str::FromStr;

/// A reversible byte transform applied to serialized entries before they are stored.
///
/// The identifier of the compressor is part of every cache key, hence switching compressors
/// never makes a store decode bytes written with another format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compressor {
    /// Stores the bytes as they are.
    #[default]
    Raw,
    /// Snappy raw-format compression.
    Snappy,
}

impl Compressor {
    /// The identifier used in configuration and in cache keys.
    pub fn id(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Snappy => "snappy",
        }
    }

    pub fn compress(self, data: Vec<u8>) -> Result<Vec<u8>, CacheError> {
        match self {
            Self::Raw => Ok(data),
            Self::Snappy => Ok(snap::raw::Encoder::new().compress_vec(&data)?),
        }
    }

    pub fn decompress(self, data: Vec<u8>) -> Result<Vec<u8>, CacheError> {
        match self {
            Self::Raw => Ok(data),
            Self::Snappy => Ok(snap::raw::Decoder::new().decompress_vec(&data)?),
        }
    }
}

impl FromStr for Compressor {
    type Err = CacheError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "raw" => Ok(Self::Raw),
            "snappy" => Ok(Self::Snappy),
            _ => Err(CacheError::UnknownStrategy {
                kind: "compressor",
                name: name.to_owned(),
            }),
        }
    }
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snappy_shrinks_repetitive_payloads() {
        let data = "SELECT * { ?s ?p ?o } ".repeat(100).into_bytes();
        let compressed = Compressor::Snappy.compress(data.clone()).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(Compressor::Snappy.decompress(compressed).unwrap(), data);
    }

    #[test]
    fn raw_is_identity() {
        let data = b"hello".to_vec();
        assert_eq!(Compressor::Raw.compress(data.clone()).unwrap(), data);
    }

    #[test]
    fn snappy_rejects_garbage() {
        assert!(Compressor::Snappy.decompress(vec![0xff; 8]).is_err());
    }

    #[test]
    fn names_are_resolved() {
        assert_eq!("raw".parse::<Compressor>().unwrap(), Compressor::Raw);
        assert_eq!("snappy".parse::<Compressor>().unwrap(), Compressor::Snappy);
        assert!("gzip".parse::<Compressor>().is_err());
    }
}
