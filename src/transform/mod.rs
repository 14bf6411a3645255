//! Record transformers.
//!
//! One transformer per target relation turns a [`RawRecord`] into a normalized
//! record or a [`SkipReason`]. Transformers borrow the read-only
//! [`IdentityResolver`](crate::identity::IdentityResolver); the pair relations
//! additionally keep a per-run seen-set for deduplication.
//!
//! - **`people`**: users, username placeholders, user links, projects, videos
//! - **`pairs`**: likes (directed), met-ups (symmetric), pairings
//! - **`content`**: messages, friend testimonials, app testimonials
//!
//! Skips are values, not errors: [`transform_all`] folds every outcome into a
//! [`TransformReport`] with the kept records and a count per reason.

pub mod content;
pub mod pairs;
pub mod people;

use crate::models::TargetRow;
use crate::source::RawRecord;
use std::collections::BTreeMap;
use std::fmt;

pub use content::{AppTestimonialTransformer, FriendTestimonialTransformer, MessageTransformer};
pub use pairs::{LikeTransformer, MetUpTransformer, PairingTransformer};
pub use people::{
    ProjectTransformer, UserLinkTransformer, UserTransformer, VideoTransformer, username_records,
};

/// Why a raw row produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// Users row without an email address.
    MissingEmail,
    /// A required person reference did not resolve.
    UnresolvedPerson,
    /// One or both ends of a pair did not resolve.
    UnresolvedPair,
    /// Pair already emitted earlier in this run.
    DuplicatePair,
    /// Message or testimonial without a body.
    EmptyContent,
    /// Video without a URL.
    EmptyUrl,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::MissingEmail => "missing email",
            SkipReason::UnresolvedPerson => "unresolved person",
            SkipReason::UnresolvedPair => "unresolved pair",
            SkipReason::DuplicatePair => "duplicate pair",
            SkipReason::EmptyContent => "empty content",
            SkipReason::EmptyUrl => "empty url",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns one raw row into a normalized record.
pub trait Transform {
    type Output: TargetRow;

    fn apply(&mut self, row: &RawRecord) -> Result<Self::Output, SkipReason>;
}

/// Outcome of running a transformer over a whole relation.
#[derive(Debug, Clone)]
pub struct TransformReport<R> {
    pub records: Vec<R>,
    pub read: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl<R> TransformReport<R> {
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Run `transform` over `rows` in order, collecting records and skip counts.
pub fn transform_all<T: Transform>(transform: &mut T, rows: &[RawRecord]) -> TransformReport<T::Output> {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped: BTreeMap<SkipReason, usize> = BTreeMap::new();

    for (index, row) in rows.iter().enumerate() {
        match transform.apply(row) {
            Ok(record) => records.push(record),
            Err(reason) => {
                log::debug!("{}: skipping row {}: {}", T::Output::RELATION, index + 1, reason);
                *skipped.entry(reason).or_default() += 1;
            }
        }
    }

    TransformReport {
        records,
        read: rows.len(),
        skipped,
    }
}
