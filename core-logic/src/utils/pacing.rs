use crate::config::SleepRange;
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Every deliberate delay of the bot goes through a `Pacer`, so tests can
/// count sleeps instead of waiting for them.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Sleeps a random duration from `range` and returns it.
    async fn pause(&self, range: SleepRange, label: &str) -> Duration;

    async fn sleep_until(&self, at: DateTime<Utc>, label: &str);
}

/// Real pacer: tokio timers, cut short when the token is cancelled.
#[derive(Clone)]
pub struct TokioPacer {
    cancel: CancellationToken,
}

impl TokioPacer {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    async fn sleep(&self, duration: Duration) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, range: SleepRange, label: &str) -> Duration {
        let duration = range.sample(&mut rand::thread_rng());
        if !duration.is_zero() {
            info!("{} | Sleeping {}s", label, duration.as_secs());
            self.sleep(duration).await;
        }
        duration
    }

    async fn sleep_until(&self, at: DateTime<Utc>, label: &str) {
        let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        info!(
            "{} | Next run at {} ({}s from now)",
            label,
            at.format("%Y-%m-%d %H:%M:%S UTC"),
            wait.as_secs()
        );
        self.sleep(wait).await;
    }
}

/// Random moment on the day after `now` (as seen in `tz`) between
/// `window[0]:00` and `window[1]:00` local time.
pub fn next_daily_run<R: Rng + ?Sized>(
    now: DateTime<Utc>,
    tz: Tz,
    window: [u32; 2],
    rng: &mut R,
) -> DateTime<Utc> {
    let [start_hour, end_hour] = window;
    let start = start_hour.min(23) * 3600;
    let end = (end_hour.min(24) * 3600).max(start + 1);
    let offset = rng.gen_range(start..end);

    let local_today = now.with_timezone(&tz).date_naive();
    let tomorrow = local_today
        .checked_add_days(Days::new(1))
        .unwrap_or(local_today);
    let naive = tomorrow.and_time(NaiveTime::MIN) + chrono::Duration::seconds(offset as i64);

    // Nonexistent local times (DST gap) resolve an hour later.
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now + chrono::Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_next_daily_run_is_tomorrow_inside_window() {
        let tz: Tz = "Europe/Moscow".parse().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 22, 30, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let at = next_daily_run(now, tz, [9, 18], &mut rng).with_timezone(&tz);
            // 22:30 UTC is already June 2nd in Moscow, so tomorrow is June 3rd.
            assert_eq!(at.date_naive().to_string(), "2024-06-03");
            assert!(at.hour() >= 9 && at.hour() < 18);
        }
    }

    #[tokio::test]
    async fn test_pause_returns_early_on_cancel() {
        let token = CancellationToken::new();
        let pacer = TokioPacer::new(token.clone());
        token.cancel();

        let started = std::time::Instant::now();
        pacer.pause(SleepRange::fixed(30), "test").await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
