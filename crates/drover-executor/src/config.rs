use std::time::Duration;

/// Exponential backoff between retry attempts.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
  /// Delay before the first retry.
  pub base: Duration,
  /// Growth factor applied per further retry.
  pub multiplier: f64,
  /// Upper bound on any single delay.
  pub max: Duration,
}

impl Default for BackoffPolicy {
  fn default() -> Self {
    Self {
      base: Duration::from_secs(1),
      multiplier: 2.0,
      max: Duration::from_secs(10),
    }
  }
}

impl BackoffPolicy {
  /// Delay before the attempt that follows `completed_attempts` tries.
  pub fn delay_for(&self, completed_attempts: u32) -> Duration {
    let exponent = completed_attempts.saturating_sub(1).min(1_000) as i32;
    let scaled = self.base.as_secs_f64() * self.multiplier.powi(exponent);
    if scaled.is_finite() && scaled >= 0.0 {
      Duration::from_secs_f64(scaled.min(self.max.as_secs_f64()))
    } else {
      self.max
    }
  }
}

/// Tuning for the execution pipeline.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
  pub backoff: BackoffPolicy,
  /// How long a cancelled in-flight runner may keep going before its item is
  /// force-marked cancelled and the runner abandoned.
  pub grace_period: Duration,
}

impl Default for ExecutorConfig {
  fn default() -> Self {
    Self {
      backoff: BackoffPolicy::default(),
      grace_period: Duration::from_secs(3),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backoff_grows_and_caps() {
    let policy = BackoffPolicy::default();
    assert_eq!(policy.delay_for(1), Duration::from_secs(1));
    assert_eq!(policy.delay_for(2), Duration::from_secs(2));
    assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    assert_eq!(policy.delay_for(4), Duration::from_secs(8));
    // 16s is past the cap.
    assert_eq!(policy.delay_for(5), Duration::from_secs(10));
    assert_eq!(policy.delay_for(30), Duration::from_secs(10));
  }

  #[test]
  fn backoff_honors_custom_base() {
    let policy = BackoffPolicy {
      base: Duration::from_millis(250),
      multiplier: 3.0,
      max: Duration::from_secs(60),
    };
    assert_eq!(policy.delay_for(1), Duration::from_millis(250));
    assert_eq!(policy.delay_for(2), Duration::from_millis(750));
    assert_eq!(policy.delay_for(3), Duration::from_millis(2250));
  }

  #[test]
  fn backoff_survives_extreme_exponents() {
    let policy = BackoffPolicy::default();
    assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(10));
  }
}
