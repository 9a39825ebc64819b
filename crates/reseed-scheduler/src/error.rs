use reseed_database::DatabaseError;
use reseed_transfer::TransferError;
use thiserror::Error;

/// Why a refresh cycle failed. Never leaves the orchestrator: it is logged
/// and turned into a `false` result.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// Existence check, drop or creation of the managed database failed.
    #[error("Database step failed: {0}")]
    Database(#[from] DatabaseError),

    /// Neither the snapshot copy nor the direct copy produced a usable file.
    #[error("File transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn messages_name_the_failed_step() {
        let err = RefreshError::from(TransferError::SourceInaccessible {
            path: PathBuf::from("/exports/reporting.db"),
        });
        assert!(err.to_string().starts_with("File transfer failed: "));

        let err = RefreshError::from(DatabaseError::FileInaccessible {
            path: PathBuf::from("/live/reporting.db"),
        });
        assert!(err.to_string().starts_with("Database step failed: "));
    }
}
