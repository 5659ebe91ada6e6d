//! Attendance outcome types and scan metadata

use serde::{Deserialize, Serialize};

use crate::session::InvalidEnumValue;

/// Per-participant attendance outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    /// Entry observed, exit not yet observed
    Pending,
    /// Both entry and exit observed
    Present,
    /// Entry never observed, or session stopped while still pending
    Absent,
}

impl AttendanceStatus {
    /// Stable string form (matches the stored column value)
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Present => "PRESENT",
            Self::Absent => "ABSENT",
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PRESENT" => Ok(Self::Present),
            "ABSENT" => Ok(Self::Absent),
            _ => Err(InvalidEnumValue::new("attendance status", s)),
        }
    }
}

/// Anomaly annotation attached to an attendance record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFlags {
    pub flagged: bool,
    pub reason: String,
}

impl VerificationFlags {
    /// Reason string for the geo-dispersion flag
    pub const GEO_DISPERSION: &'static str = "geo-dispersion";

    /// Flag raised when one token is used from too many distinct countries
    pub fn geo_dispersion() -> Self {
        Self {
            flagged: true,
            reason: Self::GEO_DISPERSION.to_string(),
        }
    }
}

/// Client-supplied geolocation hint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoHint {
    pub country: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Submission metadata captured with every scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanMetadata {
    /// Network origin of the submission
    pub ip: String,
    /// User agent string, if supplied
    pub user_agent: Option<String>,
    /// Device fingerprint, if supplied
    pub device_fingerprint: Option<String>,
    /// Client-resolved geolocation, if supplied
    pub geo: Option<GeoHint>,
}

impl ScanMetadata {
    /// Metadata with only a network origin
    pub fn from_ip(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: None,
            device_fingerprint: None,
            geo: None,
        }
    }

    /// Resolve a country code for anomaly tracking.
    ///
    /// Prefers the client-supplied geo hint; falls back to a loopback
    /// special case. All other unresolved origins contribute no country.
    pub fn country(&self) -> Option<String> {
        if let Some(country) = self.geo.as_ref().and_then(|g| g.country.clone()) {
            return Some(country);
        }
        if self.ip == "127.0.0.1" || self.ip == "::1" {
            return Some("LOCAL".to_string());
        }
        None
    }
}
