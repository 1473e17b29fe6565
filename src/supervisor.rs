//! Keeps the server running: a crashed worker is relaunched, and a worker
//! that keeps crashing takes the process down with it.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use rocket::tokio;
use tracing::{error, info, warn};

use crate::errors::*;

#[derive(Debug, Clone)]
pub struct RestartPolicy {
    /// Crashes tolerated inside `window` before giving up
    pub max_restarts: u32,
    pub window: Duration,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 5,
            window: Duration::from_secs(60),
            base_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RestartPolicy {
    /// Exponential in the number of recent crashes, capped, with up to one
    /// `base_backoff` of jitter.
    fn backoff(&self, recent_crashes: u32) -> Duration {
        let exp = recent_crashes.saturating_sub(1).min(16);
        let delay = self
            .base_backoff
            .checked_mul(1 << exp)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff);

        let jitter_ms = self.base_backoff.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };

        delay + Duration::from_millis(jitter)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}

/// Runs `launch` in its own task until it returns cleanly.
///
/// An error or a panic counts as a crash and the worker is relaunched after
/// a backoff. More than `max_restarts` crashes inside `window` is fatal.
pub async fn supervise<F, Fut>(policy: &RestartPolicy, mut launch: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let mut crashes: VecDeque<Instant> = VecDeque::new();

    loop {
        let reason = match tokio::spawn(launch()).await {
            Ok(Ok(())) => {
                info!("worker stopped cleanly");
                return Ok(());
            }
            Ok(Err(e)) => e.render(),
            Err(join) => {
                if join.is_panic() {
                    format!("panicked: {}", panic_message(join.into_panic()))
                } else {
                    format!("cancelled: {}", join)
                }
            }
        };

        let now = Instant::now();
        crashes.push_back(now);
        while let Some(first) = crashes.front() {
            if now.duration_since(*first) > policy.window {
                crashes.pop_front();
            } else {
                break;
            }
        }

        if crashes.len() as u32 > policy.max_restarts {
            error!(crashes = crashes.len(), %reason, "worker crashed too often, giving up");
            bail!(ErrorKind::Launch(format!(
                "{} crashes within {:?}, last: {}",
                crashes.len(),
                policy.window,
                reason
            )));
        }

        let delay = policy.backoff(crashes.len() as u32);
        warn!(%reason, delay_ms = delay.as_millis() as u64, "worker crashed, restarting");
        tokio::time::sleep(delay).await;
    }
}
