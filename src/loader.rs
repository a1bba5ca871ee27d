//! Loader: one parameterized insert per user, each failure contained to its row.

use tracing::{debug, info, warn};

use crate::db::UserStore;
use crate::normalize::UserRecord;

/// An insert the database refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedInsert {
    pub email: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct LoadSummary {
    pub attempted: usize,
    pub inserted: usize,
    pub failed: Vec<FailedInsert>,
}

/// Insert `records` in order. No transaction: what got in stays in.
pub async fn load<S>(store: &mut S, records: &[UserRecord]) -> LoadSummary
where
    S: UserStore + ?Sized,
{
    let mut summary = LoadSummary::default();

    for user in records {
        summary.attempted += 1;
        match store.insert_user(user).await {
            Ok(()) => {
                summary.inserted += 1;
                debug!(email = user.email(), "inserted");
            }
            Err(err) => {
                warn!(email = user.email(), error = %err, "insert failed, skipping");
                summary.failed.push(FailedInsert {
                    email: user.email().to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        attempted = summary.attempted,
        inserted = summary.inserted,
        failed = summary.failed.len(),
        "load complete"
    );
    summary
}
