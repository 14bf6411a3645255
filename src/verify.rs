//! Post-run row counts for the target tables.

use crate::error::MigrateError;
use crate::models::Relation;
use crate::sink::postgres::connect_pool;
use sqlx::PgPool;
use std::fmt::Write;

/// `SELECT COUNT(*)` for every target table, in relation order.
pub async fn row_counts(pool: &PgPool) -> Result<Vec<(Relation, i64)>, sqlx::Error> {
    let mut counts = Vec::with_capacity(Relation::ALL.len());
    for relation in Relation::ALL {
        // Table names come from the closed `Relation` set, never from input.
        let sql = format!("SELECT COUNT(*) FROM {}", relation.table());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
        log::debug!("{}: {} rows", relation, count);
        counts.push((relation, count));
    }
    Ok(counts)
}

/// Connect to `database_url`, count every table, and close the connection.
pub async fn verify_target(database_url: &str) -> Result<Vec<(Relation, i64)>, MigrateError> {
    let pool = connect_pool(database_url).await?;
    let counts = row_counts(&pool).await;
    pool.close().await;
    Ok(counts?)
}

pub fn format_row_counts(counts: &[(Relation, i64)]) -> String {
    let mut out = String::new();
    for (relation, count) in counts {
        let _ = writeln!(out, "{:<22} {:>8}", relation.table(), count);
    }
    out
}
