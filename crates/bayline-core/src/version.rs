//! Opaque version tokens for optimistic concurrency control.
//!
//! Every mutable record carries a monotonic `revision` counter bumped
//! on each write. The token handed to clients is the revision plus a
//! short SHA-256 digest over `(kind, id, revision)`, so a token from
//! one record can never validate against another.
//!
//! Validation here produces precise early errors; the authoritative
//! check is the storage layer's compare-and-swap on the revision,
//! executed atomically with the write.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{BaylineError, BaylineResult};

/// Length of the digest fragment embedded in a token.
const DIGEST_LEN: usize = 16;

fn digest(kind: &str, id: Uuid, revision: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(b":");
    hasher.update(id.as_bytes());
    hasher.update(b":");
    hasher.update(revision.to_be_bytes());
    let encoded = URL_SAFE_NO_PAD.encode(hasher.finalize());
    encoded[..DIGEST_LEN].to_string()
}

/// Compute the opaque version token for a record snapshot.
pub fn compute(kind: &str, id: Uuid, revision: u64) -> String {
    format!("{revision}.{}", digest(kind, id, revision))
}

/// Validate a client-supplied token against the current snapshot.
///
/// - Missing or malformed tokens are a [`BaylineError::Validation`]:
///   without a token no optimistic-concurrency check is possible and
///   the protocol refuses to guess.
/// - A well-formed token for an older (or foreign) snapshot is a
///   [`BaylineError::ConcurrencyConflict`].
pub fn validate(kind: &str, id: Uuid, revision: u64, supplied: &str) -> BaylineResult<()> {
    if supplied.is_empty() {
        return Err(BaylineError::validation(format!(
            "missing version token for {kind} {id}"
        )));
    }
    let Some((rev_part, digest_part)) = supplied.split_once('.') else {
        return Err(BaylineError::validation(format!(
            "malformed version token for {kind} {id}"
        )));
    };
    let Ok(supplied_revision) = rev_part.parse::<u64>() else {
        return Err(BaylineError::validation(format!(
            "malformed version token for {kind} {id}"
        )));
    };
    if digest_part != digest(kind, id, supplied_revision) {
        return Err(BaylineError::validation(format!(
            "version token does not belong to {kind} {id}"
        )));
    }
    if supplied_revision != revision {
        return Err(BaylineError::ConcurrencyConflict {
            entity: kind.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Records that carry a revision counter and expose a version token.
///
/// Every read response includes the current token so a subsequent
/// write can present it as its precondition.
pub trait Versioned {
    const KIND: &'static str;

    fn record_id(&self) -> Uuid;
    fn revision(&self) -> u64;

    fn version_token(&self) -> String {
        compute(Self::KIND, self.record_id(), self.revision())
    }
}
