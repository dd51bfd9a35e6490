use arc_swap::{ArcSwap, Guard};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

/// Default refresh cadence of the cached date header
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// The formatted `Date` header line, shared by every connection
///
/// A single refresh task rebuilds the line and publishes it with an atomic
/// pointer swap. Readers load the current line without locking and always see
/// a complete value, at most one refresh interval old.
#[derive(Debug)]
pub struct DateCache {
    current: ArcSwap<Bytes>,
}

impl DateCache {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(format_line(SystemTime::now())),
        }
    }

    /// `Date: <IMF-fixdate>\r\n`
    pub fn header_line(&self) -> Guard<Arc<Bytes>> {
        self.current.load()
    }

    pub fn refresh(&self) {
        self.refresh_at(SystemTime::now());
    }

    pub fn refresh_at(&self, now: SystemTime) {
        self.current.store(Arc::new(format_line(now)));
    }

    /// Spawns the task that keeps the header current until `shutdown` fires
    pub fn spawn_refresh(
        self: &Arc<Self>,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => cache.refresh(),
                    _ = shutdown.recv() => break,
                }
            }
            debug!("Date refresh task stopped");
        })
    }
}

impl Default for DateCache {
    fn default() -> Self {
        Self::new()
    }
}

fn format_line(now: SystemTime) -> Bytes {
    let date = httpdate::fmt_http_date(now);
    let mut line = BytesMut::with_capacity(6 + date.len() + 2);
    line.put_slice(b"Date: ");
    line.put_slice(date.as_bytes());
    line.put_slice(b"\r\n");
    line.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_line_format() {
        let cache = DateCache::new();
        cache.refresh_at(SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777));

        assert_eq!(&cache.header_line()[..], b"Date: Sun, 06 Nov 1994 08:49:37 GMT\r\n");
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let cache = DateCache::new();
        cache.refresh_at(SystemTime::UNIX_EPOCH);
        let before = cache.header_line();

        cache.refresh_at(SystemTime::UNIX_EPOCH + Duration::from_secs(86_400));

        assert_eq!(&before[..], b"Date: Thu, 01 Jan 1970 00:00:00 GMT\r\n");
        assert_eq!(&cache.header_line()[..], b"Date: Fri, 02 Jan 1970 00:00:00 GMT\r\n");
    }

    #[tokio::test]
    async fn test_refresh_task_publishes_and_stops() {
        let cache = Arc::new(DateCache::new());
        cache.refresh_at(SystemTime::UNIX_EPOCH);
        let (shutdown, rx) = broadcast::channel(1);

        let task = cache.spawn_refresh(Duration::from_millis(10), rx);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_ne!(&cache.header_line()[..], b"Date: Thu, 01 Jan 1970 00:00:00 GMT\r\n");

        shutdown.send(()).unwrap();
        task.await.unwrap();
    }
}
