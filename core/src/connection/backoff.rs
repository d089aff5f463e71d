use crate::prelude::ReconnectPolicy;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;

/// Computes the delay before each reconnect attempt.
pub struct Backoff {
    policy: ReconnectPolicy,
    rng: StdRng,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        let rng = match &policy {
            ReconnectPolicy::Exponential {
                seed: Some(seed), ..
            } => StdRng::seed_from_u64(*seed),
            _ => StdRng::from_entropy(),
        };
        Self { policy, rng }
    }

    /// Nominal delay for `attempt` (1-based) before jitter is applied.
    pub fn nominal(&self, attempt: u32) -> Duration {
        match self.policy {
            ReconnectPolicy::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            ReconnectPolicy::Exponential {
                initial_ms,
                max_ms,
                multiplier,
                ..
            } => {
                let exponent = attempt.saturating_sub(1).min(64) as i32;
                let grown = initial_ms as f64 * multiplier.powi(exponent);
                Duration::from_millis(grown.min(max_ms as f64) as u64)
            }
        }
    }

    pub fn delay(&mut self, attempt: u32) -> Duration {
        let nominal = self.nominal(attempt);
        match self.policy {
            ReconnectPolicy::Fixed { .. } => nominal,
            ReconnectPolicy::Exponential { max_ms, jitter, .. } => {
                if jitter <= 0.0 {
                    return nominal;
                }
                let base = nominal.as_millis() as f64;
                let spread = base * jitter;
                let jittered = base + self.rng.gen_range(-spread..=spread);
                Duration::from_millis(jittered.clamp(0.0, max_ms as f64) as u64)
            }
        }
    }
}
