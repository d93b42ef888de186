//! Blob codec for share payloads: base64 over zlib or gzip over JSON

use crate::store::{RemoteError, RemoteResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;
use teamdb_core::SubmissionData;

/// Decode a base64 blob and inflate it, trying zlib first and gzip second.
pub fn decode_blob(encoded: &str) -> RemoteResult<Vec<u8>> {
    let compressed = STANDARD
        .decode(encoded.trim())
        .map_err(|e| RemoteError::Decode(format!("base64: {}", e)))?;

    let mut out = Vec::new();
    if ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut out).is_ok() {
        return Ok(out);
    }
    out.clear();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut out)
        .map_err(|e| RemoteError::Decode(format!("neither zlib nor gzip: {}", e)))?;
    Ok(out)
}

pub fn decode_submission(encoded: &str) -> RemoteResult<SubmissionData> {
    let json = decode_blob(encoded)?;
    SubmissionData::from_slice(&json).map_err(|e| RemoteError::Decode(e.to_string()))
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// The id a share reference points at: its last non-empty path segment.
///
/// `https://gcsim.app/viewer/share/perm_AY1M` yields `perm_AY1M`.
pub fn share_id(reference: &str) -> &str {
    reference
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}
