//! Request access policy for Gale.
//!
//! Every file operation and peer query is checked against an
//! [`AccessPolicy`] before any other work happens. The policy is a
//! read-only snapshot taken from configuration at startup; evaluation
//! holds no state and mutates nothing.
//!
//! ## Evaluation order
//!
//! 1. Caller IP on the allow list → allowed, secret ignored entirely
//! 2. Non-empty configured secret and the caller's secret differs → denied
//! 3. Otherwise → allowed (an empty secret means anyone may connect)

use std::collections::HashSet;
use std::net::IpAddr;

use crate::config::SecurityConfig;
use crate::error::{Error, Result};

/// Read-only access policy snapshot.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    /// Caller addresses admitted without a secret
    allowed_ips: HashSet<IpAddr>,
    /// Shared secret; empty means open access
    access_secret: String,
}

impl AccessPolicy {
    /// Create a policy from explicit parts.
    #[must_use]
    pub fn new(allowed_ips: HashSet<IpAddr>, access_secret: impl Into<String>) -> Self {
        Self {
            allowed_ips,
            access_secret: access_secret.into(),
        }
    }

    /// Check a caller against the policy.
    ///
    /// `provided_secret` is the credential the caller sent out of band
    /// (the `Authorization` header on the HTTP surface), if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccessDenied`] when the caller is not on the
    /// allow list and the configured secret does not match.
    pub fn check(&self, caller: IpAddr, provided_secret: Option<&str>) -> Result<()> {
        if self.allowed_ips.contains(&caller) {
            return Ok(());
        }

        if !self.access_secret.is_empty() && provided_secret != Some(self.access_secret.as_str()) {
            return Err(Error::denied(format!(
                "{caller} is not on the allow list and the secret does not match"
            )));
        }

        Ok(())
    }
}

impl From<&SecurityConfig> for AccessPolicy {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            allowed_ips: config.allowed_ips.clone(),
            access_secret: config.access_secret.clone(),
        }
    }
}
