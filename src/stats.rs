//! Run summary.
//!
//! One [`RelationStats`] per migration step, collected into a
//! [`MigrationStats`] that renders as the end-of-run table.

use crate::sink::WriteStats;
use crate::transform::{SkipReason, TransformReport};
use std::collections::BTreeMap;
use std::fmt;

/// Counts for one relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationStats {
    /// Table name, or a qualified label for the username placeholders.
    pub label: String,
    /// Raw rows read from the export.
    pub read: usize,
    /// Records that survived transformation.
    pub kept: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub write: WriteStats,
}

impl RelationStats {
    pub fn from_report<R>(label: impl Into<String>, report: &TransformReport<R>, write: WriteStats) -> Self {
        Self {
            label: label.into(),
            read: report.read,
            kept: report.records.len(),
            skipped: report.skipped.clone(),
            write,
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Counts for a whole run, in migration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationStats {
    pub relations: Vec<RelationStats>,
}

impl MigrationStats {
    pub fn push(&mut self, stats: RelationStats) {
        self.relations.push(stats);
    }

    pub fn get(&self, label: &str) -> Option<&RelationStats> {
        self.relations.iter().find(|stats| stats.label == label)
    }

    pub fn write_totals(&self) -> WriteStats {
        let mut total = WriteStats::default();
        for stats in &self.relations {
            total.merge(&stats.write);
        }
        total
    }

    pub fn skipped_total(&self) -> usize {
        self.relations.iter().map(RelationStats::skipped_total).sum()
    }
}

impl fmt::Display for MigrationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<22} {:>7} {:>7} {:>7} {:>8} {:>8} {:>7}",
            "relation", "read", "kept", "skipped", "inserted", "existing", "failed"
        )?;
        for stats in &self.relations {
            writeln!(
                f,
                "{:<22} {:>7} {:>7} {:>7} {:>8} {:>8} {:>7}",
                stats.label,
                stats.read,
                stats.kept,
                stats.skipped_total(),
                stats.write.written,
                stats.write.conflicts,
                stats.write.failed
            )?;
            for (reason, count) in &stats.skipped {
                writeln!(f, "  skipped {}: {}", reason, count)?;
            }
        }
        let totals = self.write_totals();
        writeln!(
            f,
            "total: {} inserted, {} existing, {} failed, {} skipped",
            totals.written,
            totals.conflicts,
            totals.failed,
            self.skipped_total()
        )
    }
}
