//! Session fixture over a fake connection, in-process cache and manual clock

use querycache::{Cache, Clock, MemoryCache, Session, SessionConfig};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::fake_db::FakeConnection;

pub const TEST_SITE_KEY: &str = "test-site";
pub const START_TIME: i64 = 1_700_000_000;

/// Clock advanced by hand
#[derive(Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn at(now: i64) -> Self {
        ManualClock(AtomicI64::new(now))
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct TestFixture {
    pub session: Session<FakeConnection>,
    pub cache: Arc<MemoryCache>,
    pub clock: Arc<ManualClock>,
}

impl TestFixture {
    pub fn new(connection: FakeConnection) -> Self {
        super::init_logging();

        let clock = Arc::new(ManualClock::at(START_TIME));
        let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
        let config = SessionConfig {
            site_key: TEST_SITE_KEY.to_string(),
            ..SessionConfig::default()
        };
        let shared: Arc<dyn Cache> = cache.clone();
        let session = Session::with_clock(connection, shared, &config, clock.clone());

        TestFixture {
            session,
            cache,
            clock,
        }
    }

    pub fn db(&self) -> &FakeConnection {
        self.session.connection()
    }
}
