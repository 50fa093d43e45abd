//! Client-side sliding-window rate limiting.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    sync::Notify,
    time::{sleep_until, Instant},
};

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Entry {
    id: u64,
    /// `None` while the request is in flight.
    sent: Option<Instant>,
}

#[derive(Debug, Default)]
struct Window {
    next_id: u64,
    entries: VecDeque<Entry>,
}

impl Window {
    fn prune(&mut self, now: Instant) {
        self.entries
            .retain(|entry| entry.sent.map_or(true, |sent| sent + WINDOW > now));
    }

    /// Earliest instant a stamped entry leaves the window.
    fn next_expiry(&self) -> Option<Instant> {
        self.entries
            .iter()
            .filter_map(|entry| entry.sent)
            .min()
            .map(|sent| sent + WINDOW)
    }
}

/// Admits at most `capacity` sends in any trailing one-second window.
///
/// A send occupies the window from admission until one second after its
/// exchange finished. Entries are stamped when the [`Permit`] is dropped,
/// so a send stays counted for as long as it is in flight and the next
/// caller measures its second from a point after the server saw the request.
/// Check and record happen under one lock; waits happen with the lock
/// released.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    capacity: usize,
    window: Mutex<Window>,
    released: Notify,
}

/// One admitted send. Dropping it records the send time.
#[derive(Debug)]
#[must_use = "dropping the permit records the send immediately"]
pub(crate) struct Permit<'a> {
    limiter: &'a RateLimiter,
    id: u64,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.limiter.record(self.id, Instant::now());
    }
}

impl RateLimiter {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window: Mutex::new(Window {
                next_id: 0,
                entries: VecDeque::with_capacity(capacity),
            }),
            released: Notify::new(),
        }
    }

    /// Waits until one more send keeps the window at or below capacity.
    /// Never fails. Hold the returned permit until the exchange completes.
    pub(crate) async fn admit(&self) -> Permit<'_> {
        let mut waited = false;

        loop {
            // Registered before the check so a release in between is not missed.
            let released = self.released.notified();
            let wake_at = match self.try_acquire(Instant::now()) {
                Ok(id) => return Permit { limiter: self, id },
                Err(wake_at) => wake_at,
            };

            if !waited {
                waited = true;
                self.log_wait();
            }

            match wake_at {
                Some(at) => {
                    tokio::select! {
                        _ = sleep_until(at) => {}
                        _ = released => {}
                    }
                }
                None => released.await,
            }
        }
    }

    /// Takes a slot when one is free; otherwise returns when the next
    /// stamped entry expires, or `None` if every entry is still in flight.
    fn try_acquire(&self, now: Instant) -> Result<u64, Option<Instant>> {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        window.prune(now);
        if window.entries.len() >= self.capacity {
            return Err(window.next_expiry());
        }
        let id = window.next_id;
        window.next_id += 1;
        window.entries.push_back(Entry { id, sent: None });
        Ok(id)
    }

    fn log_wait(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!("rate limit of {}/s reached, delaying send", self.capacity);
    }

    fn record(&self, id: u64, at: Instant) {
        {
            let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = window.entries.iter_mut().find(|entry| entry.id == id) {
                entry.sent = Some(at);
            }
        }
        self.released.notify_waiters();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.window
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::time::Instant;

    use super::RateLimiter;

    #[tokio::test(start_paused = true)]
    async fn first_n_sends_are_immediate() {
        let limiter = RateLimiter::new(3);
        let start = Instant::now();
        let mut permits = Vec::new();
        for _ in 0..3 {
            permits.push(limiter.admit().await);
        }
        assert_eq!(Instant::now(), start);
        assert_eq!(limiter.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn send_beyond_ceiling_waits_for_the_window() {
        let limiter = RateLimiter::new(3);
        let start = Instant::now();
        for _ in 0..3 {
            drop(limiter.admit().await);
        }
        let _permit = limiter.admit().await;
        assert!(Instant::now() - start >= Duration::from_secs(1));
        assert_eq!(limiter.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_sends_do_not_wait() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        drop(limiter.admit().await);
        tokio::time::sleep(Duration::from_millis(600)).await;
        drop(limiter.admit().await);
        tokio::time::sleep(Duration::from_millis(600)).await;
        drop(limiter.admit().await);
        assert!(Instant::now() - start < Duration::from_millis(1_300));
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_send_holds_its_slot_until_a_second_after_completion() {
        let limiter = Arc::new(RateLimiter::new(1));
        let start = Instant::now();
        let permit = limiter.admit().await;

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move {
                drop(limiter.admit().await);
                Instant::now()
            })
        };

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!waiter.is_finished());
        drop(permit);

        let admitted = waiter.await.expect("task must not panic");
        assert!(admitted - start >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_exceed_the_ceiling() {
        let limiter = Arc::new(RateLimiter::new(5));
        let start = Instant::now();
        let tasks: Vec<_> = (0..23)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    let _permit = limiter.admit().await;
                    Instant::now()
                })
            })
            .collect();

        let mut sent = Vec::with_capacity(tasks.len());
        for task in tasks {
            sent.push(task.await.expect("task must not panic"));
        }
        sent.sort();

        for window in sent.windows(6) {
            assert!(window[5] - window[0] >= Duration::from_secs(1));
        }
        assert!(sent[22] - start >= Duration::from_secs(4));
    }
}
