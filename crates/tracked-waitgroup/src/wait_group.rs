use parking_lot::RwLock;
use std::panic::Location;
use std::time::Duration;

use crate::counter::Counter;
use crate::registry::{Resolution, SiteRegistry};
use crate::{Options, OutstandingSnapshot, Site};

/// A wait group that remembers where its outstanding work was registered.
///
/// Every [`add`](Self::add) returns the [`Site`] it was charged to; hand that
/// site back to [`done`](Self::done) once per unit. When a bounded
/// [`wait`](Self::wait) stalls, the sites that still owe completions are
/// written to the configured [`DiagnosticSink`](crate::DiagnosticSink).
///
/// ```rust,no_run
/// # async fn demo() {
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tracked_waitgroup::TrackedWaitGroup;
///
/// let wg = Arc::new(TrackedWaitGroup::new());
/// for _ in 0..4 {
///     let site = wg.add(1);
///     let wg = Arc::clone(&wg);
///     tokio::spawn(async move {
///         // ...
///         wg.done(&site);
///     });
/// }
/// wg.wait(Duration::from_secs(5)).await;
/// # }
/// ```
#[derive(Debug)]
pub struct TrackedWaitGroup {
    counter: Counter,
    registry: RwLock<SiteRegistry>,
    options: Options,
}

impl TrackedWaitGroup {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            counter: Counter::new(),
            registry: RwLock::new(SiteRegistry::new()),
            options,
        }
    }

    /// Registers `n` units against the caller's `file:line`.
    ///
    /// Every call made from the same line shares one site.
    #[track_caller]
    pub fn add(&self, n: usize) -> Site {
        self.add_at(Site::from_location(Location::caller()), n)
    }

    /// Registers `n` units against an explicit site.
    pub fn add_at(&self, site: impl Into<Site>, n: usize) -> Site {
        let site = site.into();
        if n == 0 {
            return site;
        }

        let mut registry = self.registry.write();
        self.counter.add(n);
        registry.record(&site, n);
        tracing::trace!(%site, n, "registered outstanding work");
        site
    }

    /// Completes one unit registered under `site`.
    ///
    /// The total is decremented even if `site` has no entry; only the
    /// per-site bookkeeping is skipped.
    ///
    /// # Panics
    ///
    /// Panics if nothing is outstanding, i.e. `done` was called more times
    /// than units were added.
    pub fn done(&self, site: &Site) {
        let mut registry = self.registry.write();
        if self.counter.checked_sub_one().is_none() {
            drop(registry);
            panic!(
                "tracked wait group counter underflow: done() for {site} with nothing outstanding"
            );
        }
        match registry.resolve(site) {
            Resolution::Unknown => {
                tracing::debug!(%site, "completion for a site with no outstanding entry")
            }
            Resolution::Cleared => tracing::trace!(%site, "site resolved"),
            Resolution::Remaining(left) => tracing::trace!(%site, left, "completed one unit"),
        }
    }

    /// Units added but not yet completed.
    pub fn pending(&self) -> usize {
        self.counter.get()
    }

    pub fn snapshot(&self) -> OutstandingSnapshot {
        let registry = self.registry.read();
        OutstandingSnapshot {
            pending: self.counter.get() as u64,
            sites: registry.sites(),
        }
    }

    /// Writes the outstanding sites to the sink. Writes nothing when no site
    /// has outstanding work.
    pub fn dump_outstanding(&self) {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return;
        }
        if let Err(err) = self.options.sink.write_report(&snapshot.to_string()) {
            tracing::error!(%err, "failed to write outstanding sites to diagnostic sink");
        }
    }

    /// Waits until every unit is completed.
    ///
    /// If `timeout` elapses first the outstanding sites are dumped, and the
    /// wait carries on. With [`RedumpPolicy::Once`](crate::RedumpPolicy::Once)
    /// that is the only dump; with
    /// [`RedumpPolicy::Every`](crate::RedumpPolicy::Every) the dump repeats
    /// each period. The timeout never ends the wait early.
    ///
    /// The wait covers the work outstanding when it starts: it returns once
    /// the count reaches zero, even if new work is added right after.
    pub async fn wait(&self, timeout: Duration) {
        let Some(round) = self.counter.round() else {
            return;
        };
        let released = self.counter.released(round);
        tokio::pin!(released);

        let mut bound = timeout;
        let mut waited = Duration::ZERO;
        loop {
            tokio::select! {
                biased;
                () = &mut released => return,
                () = tokio::time::sleep(bound) => {
                    waited = waited.saturating_add(bound);
                    self.report_stall(waited);
                    match self.options.redump.period() {
                        None => break,
                        Some(period) => bound = period,
                    }
                }
            }
        }
        released.await;
    }

    /// Thread-blocking version of [`wait`](Self::wait), for callers outside
    /// an async runtime.
    pub fn wait_blocking(&self, timeout: Duration) {
        let Some(round) = self.counter.round() else {
            return;
        };
        if self.counter.block_for(round, timeout) {
            return;
        }
        let mut waited = timeout;
        self.report_stall(waited);

        if let Some(period) = self.options.redump.period() {
            while !self.counter.block_for(round, period) {
                waited = waited.saturating_add(period);
                self.report_stall(waited);
            }
            return;
        }
        self.counter.block(round);
    }

    fn report_stall(&self, waited: Duration) {
        tracing::warn!(
            ?waited,
            pending = self.pending(),
            "wait group still has outstanding work"
        );
        self.dump_outstanding();
    }
}

impl Default for TrackedWaitGroup {
    fn default() -> Self {
        Self::new()
    }
}
