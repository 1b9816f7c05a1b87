use std::future::Future;
use std::time::Duration;
use dashmap::DashMap;

/// Per-key debounce: a call waits out the window and only runs when no
/// newer call for the same key arrived meanwhile. Work that already started
/// is never aborted.
pub struct Debouncer {
    window: Duration,
    generations: DashMap<String, u64>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generations: DashMap::new(),
        }
    }

    /// Returns `None` when a later call for `key` superseded this one.
    pub async fn run<T, F, Fut>(&self, key: &str, op: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let ticket = {
            let mut generation = self.generations.entry(key.to_string()).or_insert(0);
            *generation += 1;
            *generation
        };
        let _release = TicketGuard {
            generations: &self.generations,
            key,
            ticket,
        };

        tokio::time::sleep(self.window).await;

        let latest = self.generations.get(key).map(|generation| *generation);
        if latest != Some(ticket) {
            return None;
        }

        Some(op().await)
    }
}

/// Forgets the key once its newest call ends, finished or dropped mid-flight.
struct TicketGuard<'a> {
    generations: &'a DashMap<String, u64>,
    key: &'a str,
    ticket: u64,
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        self.generations.remove_if(self.key, |_, generation| *generation == self.ticket);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn later_call_supersedes_earlier() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(300)));

        let first = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.run("session-1", || async { "ca" }).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.run("session-1", || async { "caf" }).await })
        };

        assert_eq!(first.await.unwrap(), None);
        assert_eq!(second.await.unwrap(), Some("caf"));
    }

    #[tokio::test(start_paused = true)]
    async fn independent_keys_do_not_interfere() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(300)));

        let a = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.run("a", || async { 1 }).await })
        };
        let b = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.run("b", || async { 2 }).await })
        };

        assert_eq!(a.await.unwrap(), Some(1));
        assert_eq!(b.await.unwrap(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_calls_are_forgotten() {
        let debouncer = Debouncer::new(Duration::from_millis(300));

        for session in 0..100 {
            let key = format!("session-{}", session);
            let abandoned = tokio::time::timeout(
                Duration::from_millis(10),
                debouncer.run(&key, || async { "never" }),
            )
            .await;
            assert!(abandoned.is_err());
        }

        let slow_op = tokio::time::timeout(
            Duration::from_millis(400),
            debouncer.run("slow", || tokio::time::sleep(Duration::from_secs(5))),
        )
        .await;
        assert!(slow_op.is_err());

        assert!(debouncer.generations.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_call_keeps_the_newer_entry() {
        let debouncer = Arc::new(Debouncer::new(Duration::from_millis(300)));

        let first = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.run("s", || async { 1 }).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.run("s", || async { 2 }).await })
        };

        assert_eq!(first.await.unwrap(), None);
        assert_eq!(debouncer.generations.get("s").map(|g| *g), Some(2));
        assert_eq!(second.await.unwrap(), Some(2));
        assert!(debouncer.generations.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_keys_are_forgotten() {
        let debouncer = Debouncer::new(Duration::from_millis(10));
        assert_eq!(debouncer.run("a", || async { 1 }).await, Some(1));
        assert!(debouncer.generations.is_empty());
    }
}
