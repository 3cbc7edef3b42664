//! Whether plugin metadata handling runs for this invocation
//!
//! Periodic (nightly) jobs deploy the plugin configuration exactly as
//! authored, so metadata loading and injection are switched off for them.

use std::fmt;

use tracing::info;

/// Any non-empty value disables metadata handling
pub const SKIP_INJECTION_ENV: &str = "DEVHUB_SKIP_PLUGIN_METADATA_INJECTION";

/// CI job identifier
pub const JOB_NAME_ENV: &str = "JOB_NAME";

const PERIODIC_JOB_MARKER: &str = "periodic-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisabledReason {
    /// The opt-out flag was set
    OptOut,
    /// The job identifier marks a periodic run
    PeriodicJob(String),
}

/// Decision evaluated once per invocation and passed to the metadata pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GatingDecision {
    #[default]
    Enabled,
    Disabled(DisabledReason),
}

impl GatingDecision {
    /// Apply the gating rules; the first matching rule wins.
    pub fn evaluate(opt_out: Option<&str>, job_name: Option<&str>) -> Self {
        if opt_out.is_some_and(|flag| !flag.is_empty()) {
            return GatingDecision::Disabled(DisabledReason::OptOut);
        }

        match job_name {
            Some(job) if job.contains(PERIODIC_JOB_MARKER) => {
                GatingDecision::Disabled(DisabledReason::PeriodicJob(job.to_string()))
            }
            _ => GatingDecision::Enabled,
        }
    }

    /// Evaluate using [`SKIP_INJECTION_ENV`] and [`JOB_NAME_ENV`] from the process environment.
    pub fn from_env() -> Self {
        let opt_out = std::env::var(SKIP_INJECTION_ENV).ok();
        let job_name = std::env::var(JOB_NAME_ENV).ok();
        let decision = Self::evaluate(opt_out.as_deref(), job_name.as_deref());
        info!("Plugin metadata handling: {}", decision);
        decision
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, GatingDecision::Enabled)
    }
}

impl fmt::Display for GatingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatingDecision::Enabled => write!(f, "enabled"),
            GatingDecision::Disabled(DisabledReason::OptOut) => {
                write!(f, "disabled ({} is set)", SKIP_INJECTION_ENV)
            }
            GatingDecision::Disabled(DisabledReason::PeriodicJob(job)) => {
                write!(f, "disabled (periodic job {})", job)
            }
        }
    }
}
