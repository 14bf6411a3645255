//! Migration of Bubble CSV exports into a relational schema.
//!
//! A run reads every export ([`source`]), builds the identity maps
//! ([`identity`]), normalizes each relation ([`transform`]) and hands the
//! records to a [`sink::Sink`] in dependency order ([`migrator`]). Writes are
//! conflict-skipping, so a run can be repeated against the same target.

pub mod config;
pub mod error;
pub mod identity;
pub mod migrator;
pub mod models;
pub mod normalize;
pub mod seed_sql;
pub mod sink;
pub mod source;
pub mod stats;
pub mod transform;
pub mod verify;

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use crate::models::TargetRow;
    use crate::sink::{Sink, WriteStats};
    use std::collections::{BTreeMap, HashSet};

    pub use database::{TestDatabase, TestDatabaseError};

    /// In-memory sink with the target's conflict-skip behaviour.
    ///
    /// Rows are kept as JSON per table; a second row with a natural key the
    /// table already holds counts as a conflict and is not stored.
    #[derive(Debug, Default)]
    pub struct MemorySink {
        tables: BTreeMap<&'static str, Vec<serde_json::Value>>,
        keys: HashSet<(&'static str, String)>,
        /// Natural keys rejected as failed writes, for exercising the failure path.
        reject: HashSet<String>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail every write of a record with this natural key.
        pub fn reject_key(&mut self, natural_key: impl Into<String>) {
            self.reject.insert(natural_key.into());
        }

        pub fn rows(&self, table: &str) -> &[serde_json::Value] {
            self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
        }

        pub fn count(&self, table: &str) -> usize {
            self.rows(table).len()
        }
    }

    impl Sink for MemorySink {
        async fn insert<R: TargetRow>(&mut self, rows: &[R]) -> WriteStats {
            let table = R::RELATION.table();
            let mut stats = WriteStats::default();

            for record in rows {
                stats.submitted += 1;
                let key = record.natural_key();
                if self.reject.contains(&key) {
                    stats.failed += 1;
                    continue;
                }
                if !self.keys.insert((table, key)) {
                    stats.conflicts += 1;
                    continue;
                }
                match serde_json::to_value(record) {
                    Ok(value) => {
                        self.tables.entry(table).or_default().push(value);
                        stats.written += 1;
                    }
                    Err(_) => stats.failed += 1,
                }
            }

            stats
        }

        async fn close(self) {}
    }

    pub mod database {
        use log::LevelFilter;
        use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use sqlx::{ConnectOptions, Executor, PgPool};
        use testcontainers::{ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner};
        use testcontainers_modules::postgres::Postgres;
        use thiserror::Error;

        /// Target tables the migration writes into.
        pub const TARGET_SCHEMA: &str = include_str!("../tests/fixtures/target_schema.sql");

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Disposable Postgres with the target schema applied.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            database_url: String,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Launch a Postgres container and create the target tables.
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let database_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                let options: PgConnectOptions = database_url.parse()?;
                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(options.log_statements(LevelFilter::Off))
                    .await?;

                pool.execute(TARGET_SCHEMA).await?;

                Ok(Self {
                    pool: Some(pool),
                    database_url,
                    container: Some(container),
                })
            }

            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn database_url(&self) -> &str {
                &self.database_url
            }

            pub async fn count(&self, table: &str) -> Result<i64, sqlx::Error> {
                let sql = format!("SELECT COUNT(*) FROM {}", table);
                sqlx::query_scalar(&sql).fetch_one(self.pool()).await
            }

            /// Close pool connections and stop the container.
            pub async fn close(mut self) {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }
                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }
    }
}
