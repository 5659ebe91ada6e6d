//! Token wire codec
//!
//! Wire form: `base64url(payload JSON) + "." + hex(HMAC-SHA256(secret,
//! payload))`. Issued-at is floor-aligned to TTL boundaries so that every
//! token minted within one window carries identical `iat`/`exp`, making
//! re-issuance idempotent and independent of per-instance clock jitter.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::ProtocolConfig;
use crate::crypto::HmacKey;
use crate::verify::VerifyError;
use rollcall_types::{DomainId, SessionId, SessionPhase};

/// Signed token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Session ID
    pub sid: SessionId,
    /// Truncated domain ID (at most 8 chars)
    pub did: String,
    /// Issued at, epoch seconds, aligned to TTL boundaries
    pub iat: i64,
    /// Expires at, epoch seconds (`iat + ttl`)
    pub exp: i64,
    /// Rotation counter within the current phase
    pub rot: i64,
    /// Phase the token belongs to
    pub pha: SessionPhase,
}

/// Decoded token: payload plus the raw segments needed for verification
#[derive(Debug, Clone)]
pub(crate) struct DecodedToken {
    pub payload: TokenPayload,
    pub signature: String,
    /// The base64url payload segment the signature covers
    pub signed_segment: String,
}

/// Encodes and decodes signed rotating tokens
#[derive(Clone)]
pub struct TokenCodec {
    key: HmacKey,
    ttl_secs: i64,
}

impl TokenCodec {
    /// Create a codec from a validated protocol config.
    ///
    /// # Panics
    /// Panics if the secret is shorter than 32 bytes; `ProtocolConfig`
    /// construction already enforces this.
    pub fn new(config: &ProtocolConfig) -> Self {
        let key = HmacKey::new(&config.secret).expect("protocol secret already validated");
        Self {
            key,
            ttl_secs: config.token_ttl_secs(),
        }
    }

    /// Mint the token for the current TTL-aligned window.
    ///
    /// Deterministic: identical `(session, domain, rot, phase)` within one
    /// window produce a byte-identical token.
    pub fn mint(
        &self,
        session: SessionId,
        domain: DomainId,
        rot: i64,
        phase: SessionPhase,
    ) -> String {
        let now = Utc::now().timestamp();
        let iat = (now / self.ttl_secs) * self.ttl_secs;

        self.encode(&TokenPayload {
            sid: session,
            did: domain.short(),
            iat,
            exp: iat + self.ttl_secs,
            rot,
            pha: phase,
        })
    }

    /// Encode and sign an explicit payload
    pub fn encode(&self, payload: &TokenPayload) -> String {
        // Payload shape is fixed; serialization cannot fail
        let json = serde_json::to_vec(payload).expect("token payload serializes");
        let segment = URL_SAFE_NO_PAD.encode(&json);
        let signature = hex::encode(self.key.sign(segment.as_bytes()));
        format!("{segment}.{signature}")
    }

    /// Decode a token without applying any verification policy
    pub(crate) fn decode(&self, token: &str) -> Result<DecodedToken, VerifyError> {
        let mut parts = token.split('.');
        let (segment, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(segment), Some(signature), None) => (segment, signature),
            _ => return Err(VerifyError::MalformedToken),
        };

        let json = URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| VerifyError::MalformedToken)?;
        let payload: TokenPayload =
            serde_json::from_slice(&json).map_err(|_| VerifyError::MalformedToken)?;

        Ok(DecodedToken {
            payload,
            signature: signature.to_string(),
            signed_segment: segment.to_string(),
        })
    }

    /// Recompute the signature for a payload segment
    pub(crate) fn signature_for(&self, segment: &str) -> String {
        hex::encode(self.key.sign(segment.as_bytes()))
    }

    /// Token TTL in seconds
    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
