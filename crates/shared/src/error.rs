//! Error types for Multihost

use thiserror::Error;

/// Failures raised by a [`crate::SiteStore`]
///
/// A missing site is not an error; lookups return `Ok(None)` for that.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Site store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt site record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(err.to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}
