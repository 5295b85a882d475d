use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of "now" in unix seconds. Every actor receives one at construction
/// so tests can drive time without sleeping.
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> i64;
    fn clone_box(&self) -> Box<dyn Clock>;
}

impl Clone for Box<dyn Clock> {
    fn clone(&self) -> Box<dyn Clock> {
        self.clone_box()
    }
}

#[derive(Debug, Clone)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn clone_box(&self) -> Box<dyn Clock> {
        Box::new(self.clone())
    }
}

/// Shared, settable clock for tests. Clones observe the same instant.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: Arc<AtomicI64>,
}

impl MockClock {
    pub fn new(start: i64) -> Self {
        Self { now: Arc::new(AtomicI64::new(start)) }
    }

    pub fn set(&self, t: i64) {
        self.now.store(t, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn clone_box(&self) -> Box<dyn Clock> {
        Box::new(self.clone())
    }
}
