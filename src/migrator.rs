//! One forward pass from exports to the target store.
//!
//! Order matters: users and the username placeholders are written first so
//! every later reference has a row to point at. Each relation is transformed in
//! full, then handed to the sink; a relation that fails to write does not stop
//! the ones after it.

use crate::config::{Settings, Target};
use crate::error::MigrateError;
use crate::identity::IdentityResolver;
use crate::models::{Relation, TargetRow};
use crate::sink::{PostgresSink, RestSink, Sink};
use crate::source::{ExportSet, RawRecord, SourceReader};
use crate::stats::{MigrationStats, RelationStats};
use crate::transform::{
    AppTestimonialTransformer, FriendTestimonialTransformer, LikeTransformer, MessageTransformer,
    MetUpTransformer, PairingTransformer, ProjectTransformer, Transform, TransformReport,
    UserLinkTransformer, UserTransformer, VideoTransformer, transform_all, username_records,
};
use std::collections::BTreeMap;

/// Label under which the username placeholders appear in the summary.
pub const USERNAME_PLACEHOLDERS: &str = "users (usernames)";

async fn step<S: Sink, T: Transform>(
    sink: &mut S,
    mut transform: T,
    rows: &[RawRecord],
) -> RelationStats {
    let label = <T::Output as TargetRow>::RELATION.table();
    let report = transform_all(&mut transform, rows);
    log::info!(
        "{}: {} read, {} kept, {} skipped",
        label,
        report.read,
        report.records.len(),
        report.skipped_total()
    );
    let write = sink.insert(&report.records).await;
    RelationStats::from_report(label, &report, write)
}

/// Migrate every relation of `exports` into `sink`.
///
/// The sink is left open; the caller owns it and closes it.
pub async fn migrate<S: Sink>(sink: &mut S, exports: &ExportSet) -> MigrationStats {
    let resolver = IdentityResolver::from_exports(exports);
    let mut stats = MigrationStats::default();

    stats.push(
        step(
            sink,
            UserTransformer::new(&resolver),
            exports.rows(Relation::Users),
        )
        .await,
    );

    let placeholders = username_records(&resolver);
    let report = TransformReport {
        read: placeholders.len(),
        records: placeholders,
        skipped: BTreeMap::new(),
    };
    log::info!("writing {} username placeholders", report.records.len());
    let write = sink.insert(&report.records).await;
    stats.push(RelationStats::from_report(USERNAME_PLACEHOLDERS, &report, write));

    stats.push(
        step(
            sink,
            UserLinkTransformer::new(&resolver),
            exports.rows(Relation::UserLinks),
        )
        .await,
    );
    stats.push(step(sink, ProjectTransformer::new(), exports.rows(Relation::Projects)).await);
    stats.push(
        step(
            sink,
            VideoTransformer::new(&resolver),
            exports.rows(Relation::Videos),
        )
        .await,
    );
    stats.push(
        step(
            sink,
            LikeTransformer::new(&resolver),
            exports.rows(Relation::Likes),
        )
        .await,
    );
    stats.push(
        step(
            sink,
            MetUpTransformer::new(&resolver),
            exports.rows(Relation::MetUps),
        )
        .await,
    );
    stats.push(
        step(
            sink,
            MessageTransformer::new(&resolver),
            exports.rows(Relation::Messages),
        )
        .await,
    );
    stats.push(
        step(
            sink,
            FriendTestimonialTransformer::new(&resolver),
            exports.rows(Relation::FriendTestimonials),
        )
        .await,
    );
    stats.push(
        step(
            sink,
            AppTestimonialTransformer::new(&resolver),
            exports.rows(Relation::AppTestimonials),
        )
        .await,
    );
    stats.push(
        step(
            sink,
            PairingTransformer::new(&resolver),
            exports.rows(Relation::Pairings),
        )
        .await,
    );

    let totals = stats.write_totals();
    log::info!(
        "migration finished: {} inserted, {} existing, {} failed",
        totals.written,
        totals.conflicts,
        totals.failed
    );
    stats
}

/// Load the exports, open the sink for `target`, migrate, and close the sink.
///
/// Only opening the target is fatal. Once open, the sink is closed whatever the
/// individual relations do.
pub async fn run(target: &Target, settings: &Settings) -> Result<MigrationStats, MigrateError> {
    let reader = SourceReader::new(settings.export_dir.clone());
    log::info!("reading exports from {}", reader.export_dir().display());

    match target {
        Target::Direct { database_url } => {
            let mut sink = PostgresSink::connect(database_url, settings.batch_size).await?;
            let exports = reader.load_all();
            let stats = migrate(&mut sink, &exports).await;
            sink.close().await;
            Ok(stats)
        }
        Target::Hosted { url, key } => {
            let mut sink = RestSink::new(url, key, settings.batch_size)?;
            let exports = reader.load_all();
            let stats = migrate(&mut sink, &exports).await;
            sink.close().await;
            Ok(stats)
        }
    }
}
