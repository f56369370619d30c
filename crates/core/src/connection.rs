//! Connection health aggregation and delayed clear/close fan-out.
//!
//! The monitor owns a fixed set of external links established at bootstrap.
//! Health is the logical AND over every member; clear/close are delayed
//! fan-out operations that let in-flight messages drain before touching the
//! links, scheduled as tasks so the host keeps running meanwhile.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Settling interval before a clear/close fan-out executes.
pub const SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Capability set of one external link.
///
/// Implementations are supplied by the host at construction; the monitor
/// only aggregates status and fans out lifecycle calls. Implementations log
/// their own transport failures; the monitor never retries.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Current liveness of the link. Status read only; may be called by any
    /// component.
    fn is_connected(&self) -> bool;

    /// Discards messages queued on the link.
    async fn clear(&self);

    /// Shuts the link down.
    async fn close(&self);
}

/// Aggregates liveness over the fixed link set of one session.
#[derive(Clone)]
pub struct ConnectionMonitor {
    connections: Arc<[Arc<dyn Connection>]>,
}

impl ConnectionMonitor {
    pub fn new(connections: Vec<Arc<dyn Connection>>) -> Self {
        Self {
            connections: connections.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// True iff every member link reports connected, short-circuiting on the
    /// first unhealthy member. An empty set is healthy.
    pub fn is_healthy(&self) -> bool {
        self.connections.iter().all(|c| c.is_connected())
    }

    /// Clears every link after [`SETTLE_DELAY`]. Returns the handle of the
    /// scheduled task; the caller may await or abort it.
    pub fn schedule_clear(&self) -> JoinHandle<()> {
        let connections = Arc::clone(&self.connections);
        tokio::spawn(async move {
            tokio::time::sleep(SETTLE_DELAY).await;
            for connection in connections.iter() {
                connection.clear().await;
            }
            info!(count = connections.len(), "Cleared connections");
        })
    }

    /// Closes every link after [`SETTLE_DELAY`]. Returns the handle of the
    /// scheduled task; the caller may await or abort it.
    pub fn schedule_close(&self) -> JoinHandle<()> {
        let connections = Arc::clone(&self.connections);
        tokio::spawn(async move {
            tokio::time::sleep(SETTLE_DELAY).await;
            for connection in connections.iter() {
                connection.close().await;
            }
            info!(count = connections.len(), "Closed connections");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeLink {
        connected: AtomicBool,
        cleared: AtomicUsize,
        closed: AtomicUsize,
    }

    impl FakeLink {
        fn up() -> Arc<Self> {
            let link = Self::default();
            link.connected.store(true, Ordering::SeqCst);
            Arc::new(link)
        }

        fn down() -> Arc<Self> {
            Arc::new(Self::default())
        }
    }

    #[async_trait]
    impl Connection for FakeLink {
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn clear(&self) {
            self.cleared.fetch_add(1, Ordering::SeqCst);
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn monitor(links: &[Arc<FakeLink>]) -> ConnectionMonitor {
        ConnectionMonitor::new(
            links
                .iter()
                .map(|link| Arc::clone(link) as Arc<dyn Connection>)
                .collect(),
        )
    }

    #[test]
    fn empty_set_is_healthy() {
        assert!(ConnectionMonitor::new(Vec::new()).is_healthy());
    }

    #[test]
    fn all_connected_set_is_healthy() {
        let links = [FakeLink::up(), FakeLink::up(), FakeLink::up()];
        assert!(monitor(&links).is_healthy());
    }

    #[test]
    fn one_disconnected_member_makes_the_set_unhealthy() {
        let links = [FakeLink::up(), FakeLink::down(), FakeLink::up()];
        assert!(!monitor(&links).is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_clear_waits_for_the_settle_delay_then_fans_out() {
        let links = [FakeLink::up(), FakeLink::up()];
        let handle = monitor(&links).schedule_clear();

        tokio::time::advance(Duration::from_millis(1000)).await;
        tokio::task::yield_now().await;
        for link in &links {
            assert_eq!(link.cleared.load(Ordering::SeqCst), 0);
        }

        handle.await.unwrap();
        for link in &links {
            assert_eq!(link.cleared.load(Ordering::SeqCst), 1);
            assert_eq!(link.closed.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_close_closes_every_member_once() {
        let links = [FakeLink::up(), FakeLink::down()];
        monitor(&links).schedule_close().await.unwrap();

        for link in &links {
            assert_eq!(link.closed.load(Ordering::SeqCst), 1);
            assert_eq!(link.cleared.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_fanout_can_be_aborted() {
        let links = [FakeLink::up()];
        let handle = monitor(&links).schedule_close();
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert_eq!(links[0].closed.load(Ordering::SeqCst), 0);
    }
}
