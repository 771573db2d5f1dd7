//! Counting core: a non-negative counter with block-until-zero for both
//! async tasks and OS threads.
//!
//! Every transition to zero ends a round. A waiter joins the round that is
//! open when it starts and is released when that round ends, even if new
//! work is added before it gets to run again.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct State {
    count: usize,
    /// Number of completed rounds.
    epoch: u64,
}

/// A round of outstanding work a waiter is blocked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Round(u64);

impl State {
    fn is_over(&self, round: Round) -> bool {
        self.count == 0 || self.epoch != round.0
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counter {
    state: Mutex<State>,
    zero_cond: Condvar,
    zero_notify: Notify,
}

impl Counter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self) -> usize {
        self.state.lock().count
    }

    /// The round currently open, or `None` when nothing is outstanding.
    pub(crate) fn round(&self) -> Option<Round> {
        let state = self.state.lock();
        (state.count != 0).then_some(Round(state.epoch))
    }

    pub(crate) fn add(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut state = self.state.lock();
        let Some(total) = state.count.checked_add(n) else {
            panic!("tracked wait group counter overflow: {} + {n}", state.count);
        };
        state.count = total;
    }

    /// Removes one unit. Returns `None` without touching the count when
    /// nothing is outstanding; the caller decides how loudly to fail.
    pub(crate) fn checked_sub_one(&self) -> Option<usize> {
        let mut state = self.state.lock();
        if state.count == 0 {
            return None;
        }
        state.count -= 1;
        let left = state.count;
        if left == 0 {
            state.epoch = state.epoch.wrapping_add(1);
        }
        drop(state);

        if left == 0 {
            self.zero_cond.notify_all();
            self.zero_notify.notify_waiters();
        }
        Some(left)
    }

    /// Resolves once `round` has ended. Every waiter of the round is released
    /// by the same transition to zero.
    pub(crate) async fn released(&self, round: Round) {
        loop {
            let notified = self.zero_notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent transition to zero
            // can't slip between the check and the await.
            notified.as_mut().enable();
            if self.state.lock().is_over(round) {
                return;
            }
            notified.await;
        }
    }

    pub(crate) fn block(&self, round: Round) {
        let mut state = self.state.lock();
        while !state.is_over(round) {
            self.zero_cond.wait(&mut state);
        }
    }

    /// Blocks for at most `timeout`. Returns `true` if `round` ended.
    pub(crate) fn block_for(&self, round: Round, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.block(round);
            return true;
        };
        let mut state = self.state.lock();
        while !state.is_over(round) {
            if self.zero_cond.wait_until(&mut state, deadline).timed_out() {
                return state.is_over(round);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn open_round(counter: &Counter) -> Round {
        counter.round().expect("work is outstanding")
    }

    #[test]
    fn zero_add_is_a_noop() {
        let counter = Counter::new();
        counter.add(0);
        assert_eq!(counter.get(), 0);
        assert_eq!(counter.round(), None);
    }

    #[test]
    fn sub_below_zero_is_rejected_without_mutation() {
        let counter = Counter::new();
        counter.add(1);
        assert_eq!(counter.checked_sub_one(), Some(0));
        assert_eq!(counter.checked_sub_one(), None);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn block_for_times_out_while_outstanding() {
        let counter = Counter::new();
        counter.add(2);
        let round = open_round(&counter);
        assert!(!counter.block_for(round, Duration::from_millis(20)));
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn block_for_accepts_unrepresentable_deadline() {
        let counter = Arc::new(Counter::new());
        counter.add(1);
        let round = open_round(&counter);

        let worker = {
            let counter = Arc::clone(&counter);
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                counter.checked_sub_one().expect("one unit outstanding");
            })
        };
        assert!(counter.block_for(round, Duration::MAX));
        worker.join().expect("worker thread panicked");
    }

    #[test]
    fn new_round_opens_after_release() {
        let counter = Counter::new();
        counter.add(1);
        let first = open_round(&counter);
        counter.checked_sub_one().expect("one unit outstanding");
        counter.add(1);

        let second = open_round(&counter);
        assert_ne!(first, second);
        assert!(counter.block_for(first, Duration::from_millis(1)));
        assert!(!counter.block_for(second, Duration::from_millis(1)));
    }

    #[test]
    fn block_releases_every_thread() {
        let counter = Arc::new(Counter::new());
        counter.add(1);
        let round = open_round(&counter);

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || counter.block(round))
            })
            .collect();

        std::thread::sleep(Duration::from_millis(20));
        counter.checked_sub_one().expect("one unit outstanding");
        counter.add(1);
        for waiter in waiters {
            waiter.join().expect("waiter thread panicked");
        }
        assert_eq!(counter.get(), 1);
    }

    #[tokio::test]
    async fn released_wakes_all_tasks_and_gate_reopens() {
        let counter = Arc::new(Counter::new());
        counter.add(1);
        let round = open_round(&counter);

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move { counter.released(round).await })
            })
            .collect();

        tokio::task::yield_now().await;
        counter.checked_sub_one().expect("one unit outstanding");
        counter.add(1);
        for waiter in waiters {
            waiter.await.expect("waiter task panicked");
        }

        let next = open_round(&counter);
        let reopened =
            tokio::time::timeout(Duration::from_millis(20), counter.released(next)).await;
        assert!(reopened.is_err(), "gate must be closed again after add");
        counter.checked_sub_one().expect("one unit outstanding");
        counter.released(next).await;
    }
}
