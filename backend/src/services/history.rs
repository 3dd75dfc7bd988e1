//! Audit trail for feed purchases

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};

use crate::error::{AppError, AppResult};
use crate::models::{FeedPurchaseHistory, HistoryType};

/// Read access to purchase history
#[derive(Clone)]
pub struct HistoryService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    history_id: i64,
    purchase_id: i64,
    feed_id: i64,
    supplier: String,
    batch_number: Option<String>,
    quantity_kg: Decimal,
    cost_per_kg: Decimal,
    purchase_date: NaiveDate,
    expiry_date: Option<NaiveDate>,
    notes: Option<String>,
    history_type: String,
    history_date: DateTime<Utc>,
    history_change_reason: String,
}

impl TryFrom<HistoryRow> for FeedPurchaseHistory {
    type Error = AppError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let history_type = HistoryType::from_marker(&row.history_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown history type '{}'", row.history_type))
        })?;

        Ok(Self {
            history_id: row.history_id,
            purchase_id: row.purchase_id,
            feed_id: row.feed_id,
            supplier: row.supplier,
            batch_number: row.batch_number,
            quantity_kg: row.quantity_kg,
            cost_per_kg: row.cost_per_kg,
            purchase_date: row.purchase_date,
            expiry_date: row.expiry_date,
            notes: row.notes,
            history_type,
            history_date: row.history_date,
            history_change_reason: row.history_change_reason,
        })
    }
}

impl HistoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// History of one purchase, newest first
    pub async fn list_for_purchase(&self, purchase_id: i64) -> AppResult<Vec<FeedPurchaseHistory>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT history_id, purchase_id, feed_id, supplier, batch_number, quantity_kg,
                   cost_per_kg, purchase_date, expiry_date, notes, history_type,
                   history_date, history_change_reason
            FROM feed_purchase_history
            WHERE purchase_id = $1
            ORDER BY history_date DESC, history_id DESC
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.db)
        .await?;

        // Deleted purchases keep their trail, so only an empty trail is a 404
        if rows.is_empty() {
            return Err(AppError::NotFound("Feed purchase history".to_string()));
        }

        rows.into_iter().map(FeedPurchaseHistory::try_from).collect()
    }
}

/// Snapshot the current state of a purchase into its history.
///
/// Must run on the same transaction as the write it records.
pub async fn record_change(
    conn: &mut PgConnection,
    purchase_id: i64,
    history_type: HistoryType,
    reason: &str,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO feed_purchase_history (purchase_id, feed_id, supplier, batch_number,
                                           quantity_kg, cost_per_kg, purchase_date,
                                           expiry_date, notes, history_type,
                                           history_change_reason)
        SELECT id, feed_id, supplier, batch_number, quantity_kg, cost_per_kg, purchase_date,
               expiry_date, notes, $2, $3
        FROM feed_purchases
        WHERE id = $1
        "#,
    )
    .bind(purchase_id)
    .bind(history_type.as_str())
    .bind(reason)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Feed purchase".to_string()));
    }

    tracing::debug!(purchase_id, history_type = history_type.as_str(), reason, "History recorded");

    Ok(())
}
