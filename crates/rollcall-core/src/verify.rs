//! Token verification policy
//!
//! Checks run in a fixed order and short-circuit on the first failure:
//! decode, signature (constant time), expiry, issued-in-future, and, once
//! session context is available, rotation tolerance and phase match.

use chrono::Utc;
use thiserror::Error;

use crate::config::ProtocolConfig;
use crate::crypto::constant_time_eq;
use crate::token::{TokenCodec, TokenPayload};
use rollcall_types::SessionPhase;

/// Why a submitted token was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// Not two dot-separated segments, or the payload fails to decode
    #[error("malformed token")]
    MalformedToken,

    /// Signature does not match the payload
    #[error("invalid signature")]
    InvalidSignature,

    /// Token validity window has passed
    #[error("token expired")]
    Expired,

    /// Issued-at is further in the future than the permitted clock skew
    #[error("token issued in the future")]
    IssuedInFuture,

    /// Rotation counter outside the tolerance window
    #[error("rotation counter mismatch: submitted {submitted}, expected {expected}")]
    RotationMismatch { submitted: i64, expected: i64 },

    /// Token was minted for the other phase
    #[error("phase mismatch: submitted {submitted}, expected {expected}")]
    PhaseMismatch {
        submitted: SessionPhase,
        expected: SessionPhase,
    },
}

/// Applies verification policy to submitted tokens
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    codec: TokenCodec,
    clock_skew_secs: i64,
    rotation_tolerance: i64,
}

impl TokenVerifier {
    /// Create a verifier sharing the codec's signing key
    pub fn new(codec: TokenCodec, config: &ProtocolConfig) -> Self {
        Self {
            codec,
            clock_skew_secs: config.clock_skew.as_secs() as i64,
            rotation_tolerance: config.rotation_tolerance,
        }
    }

    /// Stateless verification: signature, expiry, and clock skew.
    ///
    /// Used before the session's current phase and counter are known.
    pub fn verify(&self, token: &str) -> Result<TokenPayload, VerifyError> {
        let decoded = self.codec.decode(token)?;

        let expected = self.codec.signature_for(&decoded.signed_segment);
        if !constant_time_eq(decoded.signature.as_bytes(), expected.as_bytes()) {
            tracing::debug!("token signature mismatch");
            return Err(VerifyError::InvalidSignature);
        }

        let now = Utc::now().timestamp();
        if now > decoded.payload.exp {
            return Err(VerifyError::Expired);
        }
        if decoded.payload.iat > now + self.clock_skew_secs {
            return Err(VerifyError::IssuedInFuture);
        }

        Ok(decoded.payload)
    }

    /// Full verification against the session's current rotation counter and
    /// phase.
    ///
    /// The counter may drift one rotation step in either direction to
    /// absorb display/scan latency; anything further is rejected.
    pub fn verify_with_session(
        &self,
        token: &str,
        expected_rot: i64,
        expected_phase: SessionPhase,
    ) -> Result<TokenPayload, VerifyError> {
        let payload = self.verify(token)?;

        if (payload.rot - expected_rot).abs() > self.rotation_tolerance {
            return Err(VerifyError::RotationMismatch {
                submitted: payload.rot,
                expected: expected_rot,
            });
        }

        if payload.pha != expected_phase {
            return Err(VerifyError::PhaseMismatch {
                submitted: payload.pha,
                expected: expected_phase,
            });
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_types::{DomainId, SessionId};

    fn setup() -> (TokenCodec, TokenVerifier) {
        let config = ProtocolConfig::try_new("test-secret-which-is-long-enough!!").unwrap();
        let codec = TokenCodec::new(&config);
        let verifier = TokenVerifier::new(codec.clone(), &config);
        (codec, verifier)
    }

    fn payload_with_window(iat: i64, exp: i64) -> TokenPayload {
        TokenPayload {
            sid: SessionId::new(),
            did: DomainId::new().short(),
            iat,
            exp,
            rot: 0,
            pha: SessionPhase::Entry,
        }
    }

    #[test]
    fn test_minted_token_verifies() {
        let (codec, verifier) = setup();
        let session = SessionId::new();
        let token = codec.mint(session, DomainId::new(), 0, SessionPhase::Entry);
        let payload = verifier.verify(&token).unwrap();
        assert_eq!(payload.sid, session);
    }

    #[test]
    fn test_tampered_signature_is_invalid_signature() {
        let (codec, verifier) = setup();
        let token = codec.mint(SessionId::new(), DomainId::new(), 0, SessionPhase::Entry);

        // Flip the last hex digit; length stays the same so decoding
        // succeeds and only the signature check can reject it.
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });

        assert_eq!(
            verifier.verify(&tampered),
            Err(VerifyError::InvalidSignature)
        );
    }

    #[test]
    fn test_tampered_payload_is_invalid_signature() {
        let (codec, verifier) = setup();
        let token = codec.mint(SessionId::new(), DomainId::new(), 0, SessionPhase::Entry);
        let signature = token.split('.').nth(1).unwrap();

        let other = codec.mint(SessionId::new(), DomainId::new(), 0, SessionPhase::Entry);
        let other_segment = other.split('.').next().unwrap();

        let spliced = format!("{other_segment}.{signature}");
        assert_eq!(
            verifier.verify(&spliced),
            Err(VerifyError::InvalidSignature)
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (codec, _) = setup();
        let other_config = ProtocolConfig::try_new("another-secret-also-long-enough!!!").unwrap();
        let other_verifier = TokenVerifier::new(TokenCodec::new(&other_config), &other_config);

        let token = codec.mint(SessionId::new(), DomainId::new(), 0, SessionPhase::Entry);
        assert_eq!(
            other_verifier.verify(&token),
            Err(VerifyError::InvalidSignature)
        );
    }

    #[test]
    fn test_expired_exactly_at_exp_succeeds() {
        let (codec, verifier) = setup();
        let now = Utc::now().timestamp();
        // exp == now: still valid
        let token = codec.encode(&payload_with_window(now - 30, now));
        assert!(verifier.verify(&token).is_ok());
    }

    #[test]
    fn test_expired_one_second_past_exp_fails() {
        let (codec, verifier) = setup();
        let now = Utc::now().timestamp();
        let token = codec.encode(&payload_with_window(now - 31, now - 1));
        assert_eq!(verifier.verify(&token), Err(VerifyError::Expired));
    }

    #[test]
    fn test_issued_in_future_rejected() {
        let (codec, verifier) = setup();
        let now = Utc::now().timestamp();
        let token = codec.encode(&payload_with_window(now + 60, now + 90));
        assert_eq!(verifier.verify(&token), Err(VerifyError::IssuedInFuture));
    }

    #[test]
    fn test_issued_within_skew_accepted() {
        let (codec, verifier) = setup();
        let now = Utc::now().timestamp();
        let token = codec.encode(&payload_with_window(now + 4, now + 34));
        assert!(verifier.verify(&token).is_ok());
    }

    #[test]
    fn test_rotation_tolerance_window() {
        let (codec, verifier) = setup();
        let session = SessionId::new();
        let domain = DomainId::new();

        for rot in [4, 5, 6] {
            let token = codec.mint(session, domain, rot, SessionPhase::Entry);
            assert!(
                verifier
                    .verify_with_session(&token, 5, SessionPhase::Entry)
                    .is_ok(),
                "rot {rot} should be within tolerance of 5"
            );
        }

        for rot in [3, 7] {
            let token = codec.mint(session, domain, rot, SessionPhase::Entry);
            assert!(
                matches!(
                    verifier.verify_with_session(&token, 5, SessionPhase::Entry),
                    Err(VerifyError::RotationMismatch { .. })
                ),
                "rot {rot} should be outside tolerance of 5"
            );
        }
    }

    #[test]
    fn test_phase_mismatch_both_directions() {
        let (codec, verifier) = setup();
        let session = SessionId::new();
        let domain = DomainId::new();

        let entry_token = codec.mint(session, domain, 0, SessionPhase::Entry);
        assert!(matches!(
            verifier.verify_with_session(&entry_token, 0, SessionPhase::Exit),
            Err(VerifyError::PhaseMismatch { .. })
        ));

        let exit_token = codec.mint(session, domain, 0, SessionPhase::Exit);
        assert!(matches!(
            verifier.verify_with_session(&exit_token, 0, SessionPhase::Entry),
            Err(VerifyError::PhaseMismatch { .. })
        ));
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let (codec, verifier) = setup();
        let now = Utc::now().timestamp();
        let expired = codec.encode(&payload_with_window(now - 100, now - 50));

        let mut tampered = expired.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });

        // Tampered and expired: signature failure wins
        assert_eq!(
            verifier.verify(&tampered),
            Err(VerifyError::InvalidSignature)
        );
    }
}
