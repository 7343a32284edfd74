//! Action queue repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::{debug, warn};

use super::model::{ActionId, ActionKind, ActionPayload, ActionStatus, QueuedAction};
use crate::Result;
use crate::store::LocalStore;

/// Durable queue of write operations awaiting replay.
///
/// Shares the local store's database so that a [`LocalStore::reset`] wipes
/// queued actions atomically with everything else. Mutated only by enqueue
/// (from the client) and by the sync manager's drain loop; an enqueue during
/// an active drain is picked up by the next drain cycle.
pub struct ActionQueue {
    pool: SqlitePool,
}

impl ActionQueue {
    /// Creates a queue over the given store's database.
    #[must_use]
    pub fn new(store: &LocalStore) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Durably enqueues an action and returns its identifier.
    ///
    /// The row is committed before the identifier is returned: durability
    /// precedes acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized or the insert
    /// fails.
    pub async fn enqueue(&self, payload: ActionPayload) -> Result<ActionId> {
        let id = ActionId::new();
        let body = serde_json::to_string(&payload)?;

        sqlx::query(
            r"
            INSERT INTO queued_actions (id, kind, payload, status, retry_count, queued_at)
            VALUES (?, ?, ?, 'pending', 0, ?)
            ",
        )
        .bind(id.to_string())
        .bind(payload.kind().as_str())
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(action_id = %id, kind = payload.kind().as_str(), "queued action");
        Ok(id)
    }

    /// Looks up an action by its identifier.
    ///
    /// Resolvable for pending and terminal actions alike; only a confirmed
    /// successful replay (or an explicit clear) removes the row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: ActionId) -> Result<Option<QueuedAction>> {
        let row = sqlx::query(
            r"
            SELECT id, payload, status, retry_count, last_error, queued_at, next_attempt_at
            FROM queued_actions
            WHERE id = ?
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(action_from_row))
    }

    /// Returns pending actions whose backoff delay has elapsed, in enqueue
    /// order (FIFO; ties break by identifier).
    ///
    /// Terminal actions and actions still waiting out their backoff are
    /// excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn due_pending(&self, now: DateTime<Utc>) -> Result<Vec<QueuedAction>> {
        let rows = sqlx::query(
            r"
            SELECT id, payload, status, retry_count, last_error, queued_at, next_attempt_at
            FROM queued_actions
            WHERE status = 'pending'
              AND (next_attempt_at IS NULL OR next_attempt_at <= ?)
            ORDER BY queued_at ASC, id ASC
            ",
        )
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(action_from_row).collect())
    }

    /// Counts pending actions of one kind, excluding terminal failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn pending_count(&self, kind: ActionKind) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM queued_actions WHERE status = 'pending' AND kind = ?",
        )
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Records a failed attempt: bumps the retry count, stores the error,
    /// and schedules the earliest next attempt. The action stays pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn record_failure(
        &self,
        id: ActionId,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE queued_actions
            SET retry_count = retry_count + 1,
                last_error = ?,
                next_attempt_at = ?
            WHERE id = ?
            ",
        )
        .bind(error)
        .bind(next_attempt_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Transitions an action to the terminal failure state.
    ///
    /// The action is excluded from further automatic drains but remains
    /// queryable until explicitly cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_terminal(&self, id: ActionId, error: &str) -> Result<()> {
        sqlx::query(
            r"
            UPDATE queued_actions
            SET status = 'failed_terminal',
                retry_count = retry_count + 1,
                last_error = ?,
                next_attempt_at = NULL
            WHERE id = ?
            ",
        )
        .bind(error)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        warn!(action_id = %id, error, "queued action failed terminally");
        Ok(())
    }

    /// Removes an action after its confirmed successful replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn remove(&self, id: ActionId) -> Result<()> {
        sqlx::query(r"DELETE FROM queued_actions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Returns all terminally failed actions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn terminal_actions(&self) -> Result<Vec<QueuedAction>> {
        let rows = sqlx::query(
            r"
            SELECT id, payload, status, retry_count, last_error, queued_at, next_attempt_at
            FROM queued_actions
            WHERE status = 'failed_terminal'
            ORDER BY queued_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(action_from_row).collect())
    }

    /// Deletes all terminally failed actions.
    ///
    /// This is the explicit operator acknowledgment of permanent failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn clear_terminal(&self) -> Result<u64> {
        let result = sqlx::query(r"DELETE FROM queued_actions WHERE status = 'failed_terminal'")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn action_from_row(row: &SqliteRow) -> Option<QueuedAction> {
    let id_str: String = row.get("id");
    let id = ActionId(id_str.parse().ok()?);

    let payload_str: String = row.get("payload");
    let payload = match serde_json::from_str::<ActionPayload>(&payload_str) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(action_id = %id, error = %e, "skipping undecodable queued action");
            return None;
        }
    };

    let status = match row.get::<String, _>("status").as_str() {
        "failed_terminal" => ActionStatus::FailedTerminal,
        _ => ActionStatus::Pending,
    };

    let queued_at_str: String = row.get("queued_at");
    let queued_at = DateTime::parse_from_rfc3339(&queued_at_str)
        .ok()?
        .with_timezone(&Utc);

    let next_attempt_at: Option<String> = row.get("next_attempt_at");
    let next_attempt_at = next_attempt_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Some(QueuedAction {
        id,
        payload,
        status,
        retry_count: u32::try_from(row.get::<i64, _>("retry_count")).unwrap_or(0),
        last_error: row.get("last_error"),
        queued_at,
        next_attempt_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use starbank_api::{BillPaymentRequest, TransferRequest};

    fn transfer_payload() -> ActionPayload {
        ActionPayload::Transfer(TransferRequest {
            from_account_id: "acc-1".into(),
            to_account_number: "110-222-333".into(),
            amount_minor: 50_000,
            memo: Some("rent".into()),
        })
    }

    fn bill_payload() -> ActionPayload {
        ActionPayload::BillPayment(BillPaymentRequest {
            account_id: "acc-1".into(),
            biller: "X".into(),
            amount_minor: 10_000,
            reference: None,
        })
    }

    async fn queue() -> (LocalStore, ActionQueue) {
        let store = LocalStore::in_memory().await.unwrap();
        let queue = ActionQueue::new(&store);
        (store, queue)
    }

    #[tokio::test]
    async fn enqueue_is_durable_and_resolvable() {
        let (_store, queue) = queue().await;

        let id = queue.enqueue(transfer_payload()).await.unwrap();

        let action = queue.get(id).await.unwrap().unwrap();
        assert_eq!(action.id, id);
        assert_eq!(action.status, ActionStatus::Pending);
        assert_eq!(action.retry_count, 0);
        assert_eq!(queue.pending_count(ActionKind::Transfer).await.unwrap(), 1);
        assert_eq!(queue.pending_count(ActionKind::BillPayment).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn due_pending_preserves_enqueue_order() {
        let (_store, queue) = queue().await;

        let first = queue.enqueue(transfer_payload()).await.unwrap();
        let second = queue.enqueue(bill_payload()).await.unwrap();

        let due = queue.due_pending(Utc::now()).await.unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].id, first);
        assert_eq!(due[1].id, second);
    }

    #[tokio::test]
    async fn failed_action_waits_out_its_backoff() {
        let (_store, queue) = queue().await;
        let id = queue.enqueue(transfer_payload()).await.unwrap();

        let later = Utc::now() + chrono::Duration::seconds(60);
        queue.record_failure(id, "connection refused", later).await.unwrap();

        // Still pending (and counted), but not due yet.
        assert_eq!(queue.pending_count(ActionKind::Transfer).await.unwrap(), 1);
        assert!(queue.due_pending(Utc::now()).await.unwrap().is_empty());
        assert_eq!(queue.due_pending(later).await.unwrap().len(), 1);

        let action = queue.get(id).await.unwrap().unwrap();
        assert_eq!(action.retry_count, 1);
        assert_eq!(action.last_error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn terminal_actions_are_excluded_but_visible() {
        let (_store, queue) = queue().await;
        let id = queue.enqueue(bill_payload()).await.unwrap();

        queue.mark_terminal(id, "rejected by backend").await.unwrap();

        assert_eq!(queue.pending_count(ActionKind::BillPayment).await.unwrap(), 0);
        assert!(queue.due_pending(Utc::now()).await.unwrap().is_empty());

        let terminal = queue.terminal_actions().await.unwrap();
        assert_eq!(terminal.len(), 1);
        assert_eq!(terminal[0].status, ActionStatus::FailedTerminal);

        assert_eq!(queue.clear_terminal().await.unwrap(), 1);
        assert!(queue.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_after_success_deletes_the_row() {
        let (store, queue) = queue().await;
        let id = queue.enqueue(transfer_payload()).await.unwrap();

        queue.remove(id).await.unwrap();

        assert!(queue.get(id).await.unwrap().is_none());
        assert_eq!(store.storage_stats().await.unwrap().queued_actions, 0);
    }
}
