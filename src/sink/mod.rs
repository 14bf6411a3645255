//! Destinations for normalized records.
//!
//! A [`Sink`] receives the records of one relation at a time, writes them in
//! batches of the configured size, and reports a [`WriteStats`]. Duplicates are
//! never an error: a row the target already holds is counted as a conflict and
//! skipped. A row (or batch) the target rejects is logged and counted as failed;
//! the run carries on with the next one.
//!
//! - [`PostgresSink`]: direct connection, one parameterized insert per record
//! - [`RestSink`]: hosted PostgREST-style API, one request per batch

pub mod postgres;
pub mod rest;

use crate::models::TargetRow;
use std::ops::AddAssign;

pub use postgres::PostgresSink;
pub use rest::RestSink;

/// Outcome of writing one relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub submitted: usize,
    pub written: usize,
    /// Rows skipped because the target already held them.
    pub conflicts: usize,
    pub failed: usize,
}

impl WriteStats {
    pub fn merge(&mut self, other: &WriteStats) {
        self.submitted += other.submitted;
        self.written += other.written;
        self.conflicts += other.conflicts;
        self.failed += other.failed;
    }
}

impl AddAssign for WriteStats {
    fn add_assign(&mut self, other: WriteStats) {
        self.merge(&other);
    }
}

/// A store that accepts normalized records.
///
/// Calls are awaited one after another; no sink is ever driven concurrently.
#[allow(async_fn_in_trait)]
pub trait Sink {
    /// Write `rows` in batches, skipping rows that conflict with existing ones.
    async fn insert<R: TargetRow>(&mut self, rows: &[R]) -> WriteStats;

    /// Release the connection or client.
    async fn close(self)
    where
        Self: Sized;
}
