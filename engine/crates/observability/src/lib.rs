use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` overrides the default `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Timing of one dispatched player command.
#[derive(Debug, Clone)]
pub struct CommandTiming {
    pub session_id: u64,
    pub verb: String,
    pub duration: Duration,
}

impl CommandTiming {
    pub const BUDGET: Duration = Duration::from_millis(50);

    pub fn new(session_id: u64, verb: impl Into<String>, duration: Duration) -> Self {
        Self {
            session_id,
            verb: verb.into(),
            duration,
        }
    }

    pub fn over_budget(&self) -> bool {
        self.duration > Self::BUDGET
    }

    pub fn log(&self) {
        let duration_us = self.duration.as_micros() as u64;
        if self.over_budget() {
            tracing::warn!(
                session = self.session_id,
                verb = %self.verb,
                duration_us,
                "command exceeded budget ({}us > {}us)",
                duration_us,
                Self::BUDGET.as_micros()
            );
        } else {
            tracing::debug!(
                session = self.session_id,
                verb = %self.verb,
                duration_us,
                "command completed"
            );
        }
    }
}
