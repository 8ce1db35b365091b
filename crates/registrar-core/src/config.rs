use std::time::Duration;

use crate::error::CoreError;

/// Timeouts and fan-out limits for one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Deadline for a known peer to return its `/net_info` table.
    pub crawl_timeout: Duration,
    /// Deadline for the `/status` liveness probe of a single peer.
    pub probe_timeout: Duration,
    /// Total budget per candidate while resolving the settled height,
    /// including catch-up retries.
    pub height_timeout: Duration,
    /// Pause between `/status` retries against a catching-up node.
    pub catch_up_backoff: Duration,
    /// Deadline for a single peer's `/commit` answer in a consensus round.
    pub commit_timeout: Duration,
    /// Upper bound on concurrent network calls within one fan-out.
    pub max_in_flight: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            crawl_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(1),
            height_timeout: Duration::from_secs(2),
            catch_up_backoff: Duration::from_millis(200),
            commit_timeout: Duration::from_secs(1),
            max_in_flight: 64,
        }
    }
}

impl RefreshConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_in_flight == 0 {
            return Err(CoreError::InvalidConfig(
                "max_in_flight must be at least 1".to_owned(),
            ));
        }
        let timeouts = [
            ("crawl_timeout", self.crawl_timeout),
            ("probe_timeout", self.probe_timeout),
            ("height_timeout", self.height_timeout),
            ("commit_timeout", self.commit_timeout),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, d)| d.is_zero()) {
            return Err(CoreError::InvalidConfig(format!("{name} must be non-zero")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RefreshConfig::default()
            .validate()
            .expect("default config must validate");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = RefreshConfig {
            max_in_flight: 0,
            ..RefreshConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_is_named_in_error() {
        let config = RefreshConfig {
            commit_timeout: Duration::ZERO,
            ..RefreshConfig::default()
        };
        let err = config.validate().expect_err("zero timeout must be rejected");
        assert!(err.to_string().contains("commit_timeout"));
    }
}
