//! Periodic background cleanup jobs.

use std::time::Duration;

use miala_core::error::MialaResult;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error};

/// OTP expiry sweep period.
pub const OTP_SWEEP_PERIOD: Duration = Duration::from_secs(5 * 60);
/// Pending signup sweep period.
pub const SIGNUP_SWEEP_PERIOD: Duration = Duration::from_secs(30 * 60);

/// Run `job` every `period`, first after one full period. Failures are
/// logged and the timer keeps going.
pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = MialaResult<u64>> + Send,
{
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match job().await {
                Ok(removed) => debug!(sweeper = name, removed, "Sweep finished"),
                Err(e) => error!(sweeper = name, error = %e, "Sweep failed"),
            }
        }
    })
}
