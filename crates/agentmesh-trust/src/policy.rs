//! Trust policy: the knobs a caller hands to [`TrustManager`](crate::TrustManager).

use std::time::Duration;

use crate::error::{TrustError, TrustResult};

/// Storage format version written by this build.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Default certificate validity: 90 days.
pub const DEFAULT_VALIDITY_WINDOW: Duration = Duration::from_secs(7_776_000);

/// Upper bound on the validity window: 10 years.
pub const MAX_VALIDITY_WINDOW: Duration = Duration::from_secs(315_360_000);

/// How certificates are issued and how slots are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustPolicy {
    /// Time from issuance until a certificate's `expires_at`.
    pub validity_window: Duration,
    /// Envelope version stamped on every slot written.
    pub format_version: u32,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            validity_window: DEFAULT_VALIDITY_WINDOW,
            format_version: CURRENT_FORMAT_VERSION,
        }
    }
}

impl TrustPolicy {
    /// Replace the validity window.
    #[must_use]
    pub fn with_validity_window(mut self, window: Duration) -> Self {
        self.validity_window = window;
        self
    }

    /// Replace the validity window with a number of whole days.
    #[must_use]
    pub fn with_validity_days(self, days: u64) -> Self {
        self.with_validity_window(Duration::from_secs(days.saturating_mul(86_400)))
    }

    /// Check the policy can produce certificates that verify.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidPolicy`] for a validity window under one
    /// second or over ten years, or an unknown format version.
    pub fn validate(&self) -> TrustResult<()> {
        if self.validity_window < Duration::from_secs(1) {
            return Err(TrustError::InvalidPolicy {
                reason: "validity window must be at least one second".to_owned(),
            });
        }
        if self.validity_window > MAX_VALIDITY_WINDOW {
            return Err(TrustError::InvalidPolicy {
                reason: format!(
                    "validity window of {}s exceeds the {}s maximum",
                    self.validity_window.as_secs(),
                    MAX_VALIDITY_WINDOW.as_secs()
                ),
            });
        }
        if !is_supported_version(self.format_version) {
            return Err(TrustError::InvalidPolicy {
                reason: format!(
                    "storage format version {} is not supported (max {CURRENT_FORMAT_VERSION})",
                    self.format_version
                ),
            });
        }
        Ok(())
    }
}

/// Versions this build can read and write.
pub(crate) fn is_supported_version(version: u32) -> bool {
    (1..=CURRENT_FORMAT_VERSION).contains(&version)
}
