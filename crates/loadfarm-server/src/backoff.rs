use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use loadfarm_common::config;
use log::warn;

/// A bounded number of attempts separated by exponentially growing pauses.
/// A multiplier of 1 keeps the pause fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    attempts: usize,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: u32,
}

impl Backoff {
    pub fn new(
        attempts: usize,
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: u32,
    ) -> Self {
        Self {
            attempts: attempts.max(1),
            initial_delay,
            max_delay,
            multiplier: multiplier.max(1),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// The pauses taken between consecutive attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + Send + 'static {
        let max_delay = self.max_delay;
        let multiplier = self.multiplier;
        std::iter::successors(Some(self.initial_delay.min(max_delay)), move |delay| {
            Some(delay.saturating_mul(multiplier).min(max_delay))
        })
        .take(self.attempts - 1)
    }

    /// Calls `f` until it succeeds or every attempt has failed,
    /// in which case the last error is returned.
    pub async fn retry<F, Fut, T, E>(&self, operation: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut delays = self.delays();
        let mut attempt = 1;
        loop {
            let error = match f().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            let Some(delay) = delays.next() else {
                warn!("{operation} failed after {attempt} attempts: {error}");
                return Err(error);
            };
            warn!(
                "{operation} failed at attempt {attempt} of {}, retrying in {delay:?}: {error}",
                self.attempts
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl From<&config::RegistrationBackoff> for Backoff {
    fn from(config: &config::RegistrationBackoff) -> Self {
        Self::new(
            config.attempts,
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.multiplier,
        )
    }
}
