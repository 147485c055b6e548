//! Artifact integrity verification and the signed-pack policy gate.
//!
//! Every downloaded pack archive is classified against its manifest's
//! integrity metadata before it may be registered:
//!
//! - **Unsigned** — the manifest declares neither a hash nor a signature
//! - **HashVerified** — the manifest declares a SHA-256 and the artifact
//!   matches it
//! - **SignatureVerified** — a publisher signature over the hash also
//!   checks out against a trusted key
//!
//! Classification failures (hash mismatch, bad signature, unknown
//! algorithm) are distinct from [`IntegrityError::PolicyBlocked`], which
//! marks a perfectly valid artifact rejected by the administrator's
//! `require_signed_packs` policy — the UI needs to tell a corrupted
//! download apart from a policy decision.

use std::fmt;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::pack::PackManifest;

/// Signature algorithm tag recognized by the verifier.
///
/// A closed set: unknown tags are a classification failure, not a
/// silent downgrade to hash-only verification.
pub const SIG_ALG_ED25519: &str = "ed25519";

/// How far an artifact's integrity could be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    /// No integrity metadata declared.
    Unsigned,
    /// Content hash matched the manifest's SHA-256.
    HashVerified,
    /// Hash matched and the publisher signature verified.
    SignatureVerified,
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrustLevel::Unsigned => "unsigned",
            TrustLevel::HashVerified => "hash-verified",
            TrustLevel::SignatureVerified => "signature-verified",
        };
        f.write_str(name)
    }
}

/// Installation policy supplied by the host application.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityPolicy {
    /// Only signature-verified artifacts may be installed.
    pub require_signed_packs: bool,
}

/// Errors raised during artifact verification.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// The artifact's content hash does not match the manifest.
    #[error("hash mismatch for {pack_id}: expected {expected}, got {actual}")]
    HashMismatch {
        pack_id: String,
        expected: String,
        actual: String,
    },

    /// The declared signature failed to verify against every trusted key.
    #[error("signature verification failed for {pack_id}: {reason}")]
    SignatureInvalid { pack_id: String, reason: String },

    /// The manifest declares a signature algorithm the engine does not
    /// recognize.
    #[error("unsupported signature algorithm for {pack_id}: {sig_alg}")]
    UnsupportedAlgorithm { pack_id: String, sig_alg: String },

    /// The artifact verified as far as its metadata allows, but the
    /// signed-pack policy requires a publisher signature.
    #[error("pack {pack_id} is {level} but policy requires signed packs")]
    PolicyBlocked { pack_id: String, level: TrustLevel },
}

/// Result of a successful verification.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// The pack the artifact was verified for.
    pub pack_id: String,
    /// Established trust level.
    pub level: TrustLevel,
}

/// Verifies downloaded artifacts against manifests and policy.
///
/// # Example
///
/// ```
/// use tilevault::integrity::{IntegrityPolicy, IntegrityVerifier, TrustLevel};
/// use tilevault::pack::PackManifest;
///
/// let verifier = IntegrityVerifier::new(IntegrityPolicy::default());
/// let manifest = PackManifest::new("et-base", "Ethiopia Base", "1.0");
///
/// let report = verifier.verify_artifact(&manifest, b"tile bytes").unwrap();
/// assert_eq!(report.level, TrustLevel::Unsigned);
/// ```
#[derive(Debug, Clone)]
pub struct IntegrityVerifier {
    policy: IntegrityPolicy,
    trusted_keys: Vec<VerifyingKey>,
}

impl IntegrityVerifier {
    /// Create a verifier with no trusted publisher keys.
    pub fn new(policy: IntegrityPolicy) -> Self {
        Self {
            policy,
            trusted_keys: Vec::new(),
        }
    }

    /// Add a trusted publisher key (builder pattern).
    pub fn with_trusted_key(mut self, key: VerifyingKey) -> Self {
        self.trusted_keys.push(key);
        self
    }

    /// Add a trusted publisher key from its 64-character hex form.
    pub fn with_trusted_key_hex(self, hex: &str) -> Result<Self, IntegrityError> {
        let bytes = decode_hex(hex).ok_or_else(|| IntegrityError::SignatureInvalid {
            pack_id: String::new(),
            reason: "trusted key is not valid hex".to_string(),
        })?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IntegrityError::SignatureInvalid {
                pack_id: String::new(),
                reason: "trusted key must be 32 bytes".to_string(),
            })?;
        let key = VerifyingKey::from_bytes(&arr).map_err(|e| IntegrityError::SignatureInvalid {
            pack_id: String::new(),
            reason: format!("invalid trusted key: {e}"),
        })?;
        Ok(self.with_trusted_key(key))
    }

    /// The active policy.
    pub fn policy(&self) -> IntegrityPolicy {
        self.policy
    }

    /// Verify a downloaded artifact against its manifest.
    ///
    /// Classification runs first (hash, then signature over the hash);
    /// the policy gate runs last so a policy rejection always carries the
    /// level the artifact actually reached.
    pub fn verify_artifact(
        &self,
        manifest: &PackManifest,
        artifact: &[u8],
    ) -> Result<VerificationReport, IntegrityError> {
        let level = self.classify(manifest, artifact)?;

        if self.policy.require_signed_packs && level != TrustLevel::SignatureVerified {
            return Err(IntegrityError::PolicyBlocked {
                pack_id: manifest.pack_id.clone(),
                level,
            });
        }

        Ok(VerificationReport {
            pack_id: manifest.pack_id.clone(),
            level,
        })
    }

    fn classify(
        &self,
        manifest: &PackManifest,
        artifact: &[u8],
    ) -> Result<TrustLevel, IntegrityError> {
        let Some(expected_hash) = manifest.sha256.as_deref() else {
            return Ok(TrustLevel::Unsigned);
        };

        let digest = Sha256::digest(artifact);
        let actual = encode_hex(&digest);
        if !actual.eq_ignore_ascii_case(expected_hash) {
            return Err(IntegrityError::HashMismatch {
                pack_id: manifest.pack_id.clone(),
                expected: expected_hash.to_lowercase(),
                actual,
            });
        }

        let Some(signature_hex) = manifest.signature.as_deref() else {
            return Ok(TrustLevel::HashVerified);
        };

        let sig_alg = manifest.sig_alg.as_deref().unwrap_or(SIG_ALG_ED25519);
        if sig_alg != SIG_ALG_ED25519 {
            return Err(IntegrityError::UnsupportedAlgorithm {
                pack_id: manifest.pack_id.clone(),
                sig_alg: sig_alg.to_string(),
            });
        }

        self.verify_signature(manifest, &digest, signature_hex)?;
        Ok(TrustLevel::SignatureVerified)
    }

    /// Verify the publisher signature over the raw 32-byte digest.
    fn verify_signature(
        &self,
        manifest: &PackManifest,
        digest: &[u8],
        signature_hex: &str,
    ) -> Result<(), IntegrityError> {
        let invalid = |reason: String| IntegrityError::SignatureInvalid {
            pack_id: manifest.pack_id.clone(),
            reason,
        };

        let bytes =
            decode_hex(signature_hex).ok_or_else(|| invalid("signature is not valid hex".into()))?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| invalid("signature must be 64 bytes".into()))?;
        let signature = Signature::from_bytes(&arr);

        if self.trusted_keys.is_empty() {
            return Err(invalid("no trusted publisher keys configured".into()));
        }

        for key in &self.trusted_keys {
            if key.verify(digest, &signature).is_ok() {
                return Ok(());
            }
        }
        Err(invalid("signature does not match any trusted key".into()))
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}
