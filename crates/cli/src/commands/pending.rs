//! Pending registration maintenance.

use bazaar_server::db::PendingRegistrationRepository;

use super::{CliError, connect};

/// Delete every pending registration whose code has expired.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable.
pub async fn purge() -> Result<(), CliError> {
    let store = connect().await?;
    let removed = store.purge_expired_pending(chrono::Utc::now()).await?;
    tracing::info!(removed, "Expired pending registrations purged");
    Ok(())
}
