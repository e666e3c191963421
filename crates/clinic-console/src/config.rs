//! Console configuration: API endpoint, per-call timeouts and per-kind profiles.
//!
//! # Design
//! - Watchdog durations and timeout policy are explicit per-kind data rather
//!   than constants repeated across list views.
//! - Defaults mirror the deployed console: 9 s patient list watchdog, 5 s for
//!   the staff and medicine lists, 12 s for treatments and the board, 5 s for
//!   single records.

use std::collections::HashMap;
use std::time::Duration;

use clinic_models::ResourceKind;
use url::Url;

use crate::error::ConsoleError;

/// Default API root.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8081";
/// Default watchdog for the patient list, the slowest single-resource listing.
pub const DEFAULT_LIST_WATCHDOG: Duration = Duration::from_millis(9_000);
/// Default watchdog for the staff and medicine lists.
pub const DEFAULT_DIRECTORY_WATCHDOG: Duration = Duration::from_millis(5_000);
/// Default watchdog for get-by-id and save.
pub const DEFAULT_RECORD_WATCHDOG: Duration = Duration::from_millis(5_000);
/// Default watchdog for the multi-resource treatment board.
pub const DEFAULT_AGGREGATE_WATCHDOG: Duration = Duration::from_millis(12_000);

/// What a watchdog timeout does to data that was already loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Empty the collection (list views).
    Clear,
    /// Keep whatever was loaded before (form and detail views).
    Preserve,
}

/// Per-kind loading behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindProfile {
    /// Resource kind the profile applies to.
    pub kind: ResourceKind,
    /// Watchdog for list loads.
    pub list_watchdog: Duration,
    /// Watchdog for get-by-id, save and delete calls.
    pub record_watchdog: Duration,
    /// Timeout policy for list loads.
    pub timeout_policy: TimeoutPolicy,
}

/// Default list watchdog for a kind.
#[must_use]
pub const fn default_list_watchdog(kind: ResourceKind) -> Duration {
    match kind {
        ResourceKind::Patients => DEFAULT_LIST_WATCHDOG,
        ResourceKind::Staff | ResourceKind::Medicines => DEFAULT_DIRECTORY_WATCHDOG,
        ResourceKind::Treatments => DEFAULT_AGGREGATE_WATCHDOG,
    }
}

impl KindProfile {
    /// Profile used by list views.
    #[must_use]
    pub const fn list_view(kind: ResourceKind) -> Self {
        Self {
            kind,
            list_watchdog: default_list_watchdog(kind),
            record_watchdog: DEFAULT_RECORD_WATCHDOG,
            timeout_policy: TimeoutPolicy::Clear,
        }
    }

    /// Same profile with a different list watchdog.
    #[must_use]
    pub const fn with_list_watchdog(mut self, duration: Duration) -> Self {
        self.list_watchdog = duration;
        self
    }

    /// Same profile with a different single-record watchdog.
    #[must_use]
    pub const fn with_record_watchdog(mut self, duration: Duration) -> Self {
        self.record_watchdog = duration;
        self
    }

    /// Same profile with a different timeout policy.
    #[must_use]
    pub const fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }
}

/// Per-call transport timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    /// List loads.
    pub list: Duration,
    /// Get-by-id.
    pub single: Duration,
    /// Create, update, delete and bulk delete.
    pub mutation: Duration,
}

impl Default for ApiTimeouts {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(8),
            single: Duration::from_secs(5),
            mutation: Duration::from_secs(8),
        }
    }
}

impl ApiTimeouts {
    /// Apply one timeout to every call class.
    #[must_use]
    pub const fn uniform(duration: Duration) -> Self {
        Self {
            list: duration,
            single: duration,
            mutation: duration,
        }
    }
}

/// Top-level console configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// API root; resource paths are `/api/{kind}` beneath it.
    pub base_url: Url,
    /// Transport timeouts.
    pub timeouts: ApiTimeouts,
    /// Watchdog for the treatment board.
    pub aggregate_watchdog: Duration,
    profiles: HashMap<ResourceKind, KindProfile>,
}

impl ConsoleConfig {
    /// Defaults against [`DEFAULT_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidConfig`] if the default URL does not parse.
    pub fn local() -> Result<Self, ConsoleError> {
        let base_url = Url::parse(DEFAULT_API_URL).map_err(|_| ConsoleError::InvalidConfig {
            field: "base_url",
            reason: "default API URL does not parse",
        })?;
        Ok(Self::new(base_url))
    }

    /// Configuration with defaults for every kind.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        let profiles = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, KindProfile::list_view(kind)))
            .collect();
        Self {
            base_url,
            timeouts: ApiTimeouts::default(),
            aggregate_watchdog: DEFAULT_AGGREGATE_WATCHDOG,
            profiles,
        }
    }

    /// Profile for a kind.
    #[must_use]
    pub fn profile(&self, kind: ResourceKind) -> KindProfile {
        self.profiles
            .get(&kind)
            .copied()
            .unwrap_or_else(|| KindProfile::list_view(kind))
    }

    /// Replace the profile for its kind.
    pub fn set_profile(&mut self, profile: KindProfile) {
        self.profiles.insert(profile.kind, profile);
    }

    /// Apply one list watchdog to every kind.
    pub fn set_list_watchdog(&mut self, duration: Duration) {
        for profile in self.profiles.values_mut() {
            profile.list_watchdog = duration;
        }
    }

    /// Apply one single-record watchdog to every kind.
    pub fn set_record_watchdog(&mut self, duration: Duration) {
        for profile in self.profiles.values_mut() {
            profile.record_watchdog = duration;
        }
    }

    /// Reject zero durations and non-HTTP base URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConsoleError> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(ConsoleError::InvalidConfig {
                field: "base_url",
                reason: "scheme must be http or https",
            });
        }
        if self.base_url.cannot_be_a_base() {
            return Err(ConsoleError::InvalidConfig {
                field: "base_url",
                reason: "URL cannot be used as a base",
            });
        }
        let durations = [
            ("timeouts.list", self.timeouts.list),
            ("timeouts.single", self.timeouts.single),
            ("timeouts.mutation", self.timeouts.mutation),
            ("aggregate_watchdog", self.aggregate_watchdog),
        ];
        for (field, duration) in durations {
            if duration.is_zero() {
                return Err(ConsoleError::InvalidConfig {
                    field,
                    reason: "duration must be greater than zero",
                });
            }
        }
        for profile in self.profiles.values() {
            if profile.list_watchdog.is_zero() {
                return Err(ConsoleError::InvalidConfig {
                    field: "list_watchdog",
                    reason: "duration must be greater than zero",
                });
            }
            if profile.record_watchdog.is_zero() {
                return Err(ConsoleError::InvalidConfig {
                    field: "record_watchdog",
                    reason: "duration must be greater than zero",
                });
            }
        }
        Ok(())
    }
}
