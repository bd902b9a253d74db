use std::sync::Arc;
use std::time::{Duration, Instant};

use super::health::HealthProbe;
use crate::bot::Bot;

/// Upper bound for a single health probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct AppState {
    pub bot: Bot,

    /// Events API signatures are only checked when this is set.
    pub signing_secret: Option<Arc<str>>,

    pub probes: Arc<Vec<Arc<dyn HealthProbe>>>,

    pub probe_timeout: Duration,

    pub started_at: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let probes: Vec<&str> = self.probes.iter().map(|p| p.name()).collect();
        f.debug_struct("AppState")
            .field("bot", &self.bot)
            .field("verifies_signatures", &self.signing_secret.is_some())
            .field("probes", &probes)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        bot: Bot,
        signing_secret: Option<String>,
        probes: Vec<Arc<dyn HealthProbe>>,
    ) -> Self {
        Self {
            bot,
            signing_secret: signing_secret.map(Arc::from),
            probes: Arc::new(probes),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            started_at: Instant::now(),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}
