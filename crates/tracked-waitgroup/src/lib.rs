//! A wait group that tells you what it is waiting for.
//!
//! [`TrackedWaitGroup`] counts outstanding units of work like any wait group,
//! and also remembers *where* each unit was registered. When a bounded
//! [`wait`](TrackedWaitGroup::wait) runs past its timeout, the registration
//! sites that still owe a [`done`](TrackedWaitGroup::done) are written to a
//! [`DiagnosticSink`], so a hang points at a line of code instead of
//! stalling silently.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tracked_waitgroup::TrackedWaitGroup;
//!
//! #[tokio::main]
//! async fn main() {
//!     let wg = Arc::new(TrackedWaitGroup::new());
//!
//!     let site = wg.add(1);
//!     let worker = Arc::clone(&wg);
//!     tokio::spawn(async move {
//!         // ...
//!         worker.done(&site);
//!     });
//!
//!     // Forgot to call done() for this one.
//!     let _leaked = wg.add(1);
//!
//!     // After 5s, stderr shows:
//!     //   tracked wait group currently waiting on:
//!     //    src/main.rs:<line of the add above> (1 outstanding)
//!     wg.wait(Duration::from_secs(5)).await;
//! }
//! ```
//!
//! # Sites
//!
//! [`add`](TrackedWaitGroup::add) charges work to the caller's `file:line`.
//! [`add_at`](TrackedWaitGroup::add_at) takes an explicit [`Site`] label.
//! Registrations sharing a site are summed into one entry.
//!
//! # Where dumps go
//!
//! Wait groups built with [`TrackedWaitGroup::new`] write to the process-wide
//! [`global_sink`], which targets standard error. Redirect it once at
//! startup with [`DiagnosticSink::set_writer`], or pass [`Options`] to
//! [`TrackedWaitGroup::with_options`].
//!
//! # Misuse
//!
//! Calling `done` more times than units were added panics. Calling `done`
//! with a site that has no outstanding entry still counts toward the total.

mod counter;
mod options;
mod registry;
mod site;
mod sink;
mod snapshot;
mod wait_group;

pub use self::options::{Options, OptionsError, REDUMP_ENV, RedumpPolicy};
pub use self::sink::{CaptureBuffer, DiagnosticSink, global_sink};
pub use self::site::Site;
pub use self::snapshot::{DUMP_HEADER, OutstandingSnapshot, SiteSnapshot};
pub use self::wait_group::TrackedWaitGroup;
