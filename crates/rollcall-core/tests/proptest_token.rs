//! Property tests for the token codec and verification policy

use proptest::prelude::*;

use rollcall_core::{ProtocolConfig, TokenCodec, TokenVerifier};
use rollcall_types::{DomainId, SessionId, SessionPhase};

fn setup() -> (TokenCodec, TokenVerifier) {
    let config = ProtocolConfig::try_new("proptest-secret-0123456789abcdefghij").unwrap();
    let codec = TokenCodec::new(&config);
    let verifier = TokenVerifier::new(codec.clone(), &config);
    (codec, verifier)
}

proptest! {
    #[test]
    fn verify_never_panics_on_arbitrary_input(input in ".*") {
        let (_, verifier) = setup();
        let _ = verifier.verify(&input);
    }

    #[test]
    fn arbitrary_input_never_verifies(input in "[A-Za-z0-9_.=-]{0,256}") {
        let (_, verifier) = setup();
        prop_assert!(verifier.verify(&input).is_err());
    }

    #[test]
    fn minted_tokens_always_verify(rot in 0i64..10_000, exit in any::<bool>()) {
        let (codec, verifier) = setup();
        let session = SessionId::new();
        let phase = if exit { SessionPhase::Exit } else { SessionPhase::Entry };

        let token = codec.mint(session, DomainId::new(), rot, phase);
        let payload = verifier.verify_with_session(&token, rot, phase).unwrap();

        prop_assert_eq!(payload.sid, session);
        prop_assert_eq!(payload.rot, rot);
        prop_assert_eq!(payload.pha, phase);
        prop_assert_eq!(payload.exp - payload.iat, codec.ttl_secs());
    }

    #[test]
    fn single_character_tamper_always_rejected(
        rot in 0i64..100,
        index in any::<prop::sample::Index>(),
    ) {
        let (codec, verifier) = setup();
        let token = codec.mint(SessionId::new(), DomainId::new(), rot, SessionPhase::Entry);

        let at = index.index(token.len());
        let original = token.as_bytes()[at] as char;
        let replacement = if original == 'x' { 'y' } else { 'x' };

        let mut tampered: Vec<char> = token.chars().collect();
        tampered[at] = replacement;
        let tampered: String = tampered.into_iter().collect();

        prop_assert!(verifier.verify(&tampered).is_err());
    }

    #[test]
    fn rotation_tolerance_is_exactly_one_step(
        rot in 0i64..1000,
        expected in 0i64..1000,
    ) {
        let (codec, verifier) = setup();
        let token = codec.mint(SessionId::new(), DomainId::new(), rot, SessionPhase::Entry);

        let verdict = verifier.verify_with_session(&token, expected, SessionPhase::Entry);
        if (rot - expected).abs() <= 1 {
            prop_assert!(verdict.is_ok());
        } else {
            prop_assert!(verdict.is_err());
        }
    }
}
