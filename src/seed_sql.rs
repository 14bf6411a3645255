//! Offline seed SQL for the users relation.
//!
//! Used when no connection to the target is available: the users export is
//! rendered as literal `INSERT` statements that can be pasted into a SQL
//! console. Other relations need identity resolution against the live target
//! and are left to the full migration.

use crate::identity::ResolverBuilder;
use crate::models::{Relation, UserRecord};
use crate::source::{RawRecord, SourceReader};
use crate::transform::{UserTransformer, transform_all};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to write seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Single-quoted literal with embedded quotes doubled.
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn optional_literal(value: Option<&str>) -> String {
    value.map(sql_literal).unwrap_or_else(|| "NULL".to_string())
}

/// `ARRAY['a','b']::TEXT[]`, or `'{}'::TEXT[]` when empty.
pub fn array_literal(items: &[String]) -> String {
    if items.is_empty() {
        return "'{}'::TEXT[]".to_string();
    }
    let quoted: Vec<String> = items.iter().map(|item| sql_literal(item)).collect();
    format!("ARRAY[{}]::TEXT[]", quoted.join(","))
}

pub fn user_insert_statement(user: &UserRecord) -> String {
    format!(
        "INSERT INTO users (email, bubble_id, age, short_description, background_color, consent, collaborators, communities) \
         VALUES ({}, {}, {}, {}, {}, {}, {}, {}) ON CONFLICT (email) DO NOTHING;",
        sql_literal(&user.email),
        optional_literal(user.bubble_id.as_deref()),
        user.age
            .map(|age| age.to_string())
            .unwrap_or_else(|| "NULL".to_string()),
        optional_literal(user.short_description.as_deref()),
        optional_literal(user.background_color.as_deref()),
        if user.consent { "TRUE" } else { "FALSE" },
        array_literal(&user.collaborators),
        array_literal(&user.communities),
    )
}

/// Write the seed script for `users` rows; returns the number of statements.
pub fn write_seed_sql<W: Write>(mut out: W, users: &[RawRecord]) -> io::Result<usize> {
    let resolver = ResolverBuilder::new().register_emails(users).build();
    let report = transform_all(&mut UserTransformer::new(&resolver), users);

    writeln!(out, "-- Seed data for users, generated from the Bubble export")?;
    writeln!(
        out,
        "-- {} statements ({} rows without an email skipped)",
        report.records.len(),
        report.skipped_total()
    )?;
    writeln!(out)?;
    for user in &report.records {
        writeln!(out, "{}", user_insert_statement(user))?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "-- Messages, likes, testimonials, met-ups, projects, links, videos and pairings"
    )?;
    writeln!(
        out,
        "-- reference people by username and need the full migration to resolve them."
    )?;
    out.flush()?;

    Ok(report.records.len())
}

/// Load the users export through `reader` and write the seed script to `output`.
pub fn generate_seed_file(reader: &SourceReader, output: &Path) -> Result<usize, SeedError> {
    let users = reader.load(Relation::Users);
    let io_error = |source| SeedError::Io {
        path: output.to_path_buf(),
        source,
    };

    let file = File::create(output).map_err(io_error)?;
    let count = write_seed_sql(BufWriter::new(file), &users).map_err(io_error)?;
    log::info!("wrote {} user statements to {}", count, output.display());
    Ok(count)
}
