use chrono::{DateTime, Utc};

/// Wall-clock source. Credential expiry is a wall-clock instant, so the
/// countdown is always recomputed from here rather than decremented.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall clock that advances with tokio's (possibly paused) time.
/// `jump` moves it ahead of tokio time to simulate drift.
#[cfg(test)]
pub(crate) struct TokioClock {
    wall_origin: DateTime<Utc>,
    origin: tokio::time::Instant,
    skew: std::sync::Mutex<chrono::Duration>,
}

#[cfg(test)]
impl TokioClock {
    pub(crate) fn starting_at(wall_origin: DateTime<Utc>) -> Self {
        Self {
            wall_origin,
            origin: tokio::time::Instant::now(),
            skew: std::sync::Mutex::new(chrono::Duration::zero()),
        }
    }

    pub(crate) fn jump(&self, secs: i64) {
        let mut skew = self.skew.lock().unwrap();
        *skew += chrono::Duration::seconds(secs);
    }
}

#[cfg(test)]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = tokio::time::Instant::now() - self.origin;
        let skew = *self.skew.lock().unwrap();
        self.wall_origin
            + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
            + skew
    }
}
