//! Rollcall Core - Attendance verification protocol
//!
//! Verifies physical presence at a scheduled event: short-lived rotating
//! HMAC-signed tokens are displayed as a QR code, participants submit the
//! currently valid token, and a two-phase (entry/exit) outcome is recorded
//! per participant per session.
//!
//! Components:
//! - [`crypto`] / [`token`]: HMAC-SHA256 signing and the token wire codec
//! - [`verify`]: expiry, skew, signature, rotation-tolerance, phase policy
//! - [`rotation`]: one rotation timer per active session
//! - [`lifecycle`]: the session phase state machine, coupled to rotation
//! - [`anomaly`]: TTL-bound per-token usage stats and geo-dispersion flags
//! - [`attendance`]: the per-participant attendance state machine
//! - [`broadcast`]: fan-out of tokens and attendance events to observers

pub mod anomaly;
pub mod attendance;
pub mod broadcast;
pub mod config;
pub mod crypto;
pub mod error;
pub mod lifecycle;
pub mod rotation;
pub mod token;
pub mod verify;

pub use anomaly::{AnomalyDetector, AnomalyVerdict, TokenUsage, TokenUsageStats};
pub use attendance::{AttendanceService, ScanOutcome};
pub use broadcast::Broadcaster;
pub use config::{ConfigError, ProtocolConfig};
pub use crypto::{constant_time_eq, HmacKey, HmacKeyError};
pub use error::{LifecycleError, ScanError};
pub use lifecycle::SessionLifecycle;
pub use rotation::RotationScheduler;
pub use token::{TokenCodec, TokenPayload};
pub use verify::{TokenVerifier, VerifyError};
