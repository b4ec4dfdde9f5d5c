//! Encoding of token records into vault blobs

use sandbox_access_core::{CapabilityToken, StoreError, TOKEN_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    schema_version: u32,
    token: &'a CapabilityToken,
}

#[derive(Deserialize)]
struct Envelope {
    schema_version: u32,
    token: CapabilityToken,
}

/// Encode a token record for storage under `key`
pub fn encode(key: &str, token: &CapabilityToken) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&EnvelopeRef {
        schema_version: TOKEN_SCHEMA_VERSION,
        token,
    })
    .map_err(|e| StoreError::Codec {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Decode a blob read from `key`
pub fn decode(key: &str, bytes: &[u8]) -> Result<CapabilityToken, StoreError> {
    let envelope: Envelope = serde_json::from_slice(bytes).map_err(|e| StoreError::Codec {
        key: key.to_string(),
        message: e.to_string(),
    })?;

    if envelope.schema_version != TOKEN_SCHEMA_VERSION {
        return Err(StoreError::Codec {
            key: key.to_string(),
            message: format!("unsupported schema version {}", envelope.schema_version),
        });
    }
    Ok(envelope.token)
}
