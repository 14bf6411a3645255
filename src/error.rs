use crate::config::ConfigError;
use crate::seed_sql::SeedError;
use crate::sink::rest::RestError;
use thiserror::Error;

/// Faults that stop a run.
///
/// Everything per-row or per-batch is counted in the run summary instead.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Http(#[from] RestError),
    #[error("{0}")]
    Io(#[from] SeedError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = MigrateError::from(ConfigError::MissingDirect("DATABASE_URL"));
        assert_eq!(
            err.to_string(),
            "configuration error: DATABASE_URL must be set for a direct database connection"
        );
    }
}
