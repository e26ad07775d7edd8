use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeySourceError {
    #[error("reading key file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where PEM key material comes from.
///
/// Deserializes from configuration as either
/// `{ type = "string", data = "-----BEGIN ..." }` or
/// `{ type = "file", file = "keys/ec_private.pem" }`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeySource {
    String { data: String },
    File { file: PathBuf },
}

impl KeySource {
    pub fn load(&self) -> Result<Vec<u8>, KeySourceError> {
        match self {
            KeySource::String { data } => Ok(data.as_bytes().to_vec()),
            KeySource::File { file } => std::fs::read(file).map_err(|source| KeySourceError::Read {
                path: file.clone(),
                source,
            }),
        }
    }
}
