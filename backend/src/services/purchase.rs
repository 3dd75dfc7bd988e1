//! Feed purchase service for recording purchases and summarizing spend

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};

use crate::error::{AppError, AppResult};
use crate::models::{
    change_reason, parse_date_param, parse_id_param, validate_batch_number,
    validate_cost_per_kg, validate_expiry_date, validate_quantity_kg, validate_supplier,
    FeedPurchase, FilterError, HistoryType, PaginatedResponse, Pagination, PurchaseAggregator,
    PurchaseOrdering, PurchaseRecord, PurchaseSummary, SummaryOptions,
};
use crate::services::history::record_change;

/// Feed purchase service backed by Postgres
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

const PURCHASE_COLUMNS: &str = r#"
    SELECT fp.id, fp.feed_id, f.name AS feed_name, fp.supplier, fp.batch_number,
           fp.quantity_kg, fp.cost_per_kg, fp.purchase_date, fp.expiry_date, fp.notes,
           fp.created_at, fp.updated_at
    FROM feed_purchases fp
    JOIN feeds f ON f.id = fp.feed_id
"#;

/// Database row for a purchase joined with its feed
#[derive(Debug, Clone, FromRow)]
struct FeedPurchaseRow {
    id: i64,
    feed_id: i64,
    feed_name: String,
    supplier: String,
    batch_number: Option<String>,
    quantity_kg: Decimal,
    cost_per_kg: Decimal,
    purchase_date: NaiveDate,
    expiry_date: Option<NaiveDate>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FeedPurchaseRow> for FeedPurchase {
    fn from(row: FeedPurchaseRow) -> Self {
        Self {
            id: row.id,
            feed_id: row.feed_id,
            feed_name: row.feed_name,
            supplier: row.supplier,
            batch_number: row.batch_number,
            quantity_kg: row.quantity_kg,
            cost_per_kg: row.cost_per_kg,
            total_cost: row.quantity_kg * row.cost_per_kg,
            purchase_date: row.purchase_date,
            expiry_date: row.expiry_date,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Only the columns aggregation needs
#[derive(Debug, FromRow)]
struct PurchaseRecordRow {
    supplier: String,
    feed_id: i64,
    feed_name: String,
    quantity_kg: Decimal,
    cost_per_kg: Decimal,
    purchase_date: NaiveDate,
}

impl From<PurchaseRecordRow> for PurchaseRecord {
    fn from(row: PurchaseRecordRow) -> Self {
        Self {
            supplier: row.supplier,
            feed_id: row.feed_id,
            feed_name: row.feed_name,
            quantity_kg: row.quantity_kg,
            cost_per_kg: row.cost_per_kg,
            purchase_date: row.purchase_date,
        }
    }
}

/// Raw query string parameters for listing and summarizing purchases.
///
/// Everything arrives as text so that blank values behave like missing ones
/// and malformed values can be reported against the right field.
#[derive(Debug, Default, Deserialize)]
pub struct PurchaseQuery {
    pub feed: Option<String>,
    pub supplier: Option<String>,
    pub purchase_date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub include_supplier_breakdown: Option<String>,
    pub include_feed_breakdown: Option<String>,
}

impl PurchaseQuery {
    pub fn summary_options(&self) -> SummaryOptions {
        SummaryOptions::from_flags(
            self.include_supplier_breakdown.as_deref(),
            self.include_feed_breakdown.as_deref(),
        )
    }

    pub fn ordering(&self) -> PurchaseOrdering {
        PurchaseOrdering::parse(self.ordering.as_deref())
    }
}

/// Typed filters shared by the list and summary endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchaseFilter {
    pub feed_id: Option<i64>,
    pub supplier: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Search terms; every term must match supplier, batch number or notes
    pub search_terms: Vec<String>,
}

impl PurchaseFilter {
    pub fn from_query(query: &PurchaseQuery) -> Result<Self, FilterError> {
        Ok(Self {
            feed_id: parse_id_param("feed", query.feed.as_deref())?,
            // Exact match, so the value is bound as given
            supplier: query
                .supplier
                .clone()
                .filter(|supplier| !supplier.trim().is_empty()),
            purchase_date: parse_date_param("purchase_date", query.purchase_date.as_deref())?,
            start_date: parse_date_param("start_date", query.start_date.as_deref())?,
            end_date: parse_date_param("end_date", query.end_date.as_deref())?,
            search_terms: split_search_terms(query.search.as_deref()),
        })
    }

    /// Append the `WHERE` clause for this filter
    fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(feed_id) = self.feed_id {
            qb.push(" AND fp.feed_id = ").push_bind(feed_id);
        }
        if let Some(supplier) = &self.supplier {
            qb.push(" AND fp.supplier = ").push_bind(supplier.clone());
        }
        if let Some(date) = self.purchase_date {
            qb.push(" AND fp.purchase_date = ").push_bind(date);
        }
        if let Some(start) = self.start_date {
            qb.push(" AND fp.purchase_date >= ").push_bind(start);
        }
        if let Some(end) = self.end_date {
            qb.push(" AND fp.purchase_date <= ").push_bind(end);
        }
        for term in &self.search_terms {
            let pattern = like_pattern(term);
            qb.push(" AND (fp.supplier ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR fp.batch_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR fp.notes ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// Split a search string on whitespace and commas
fn split_search_terms(search: Option<&str>) -> Vec<String> {
    search
        .unwrap_or_default()
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// Case-insensitive substring pattern with LIKE wildcards escaped
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_ordering(qb: &mut QueryBuilder<'_, Postgres>, ordering: &PurchaseOrdering) {
    qb.push(" ORDER BY ");
    for sort in ordering.terms() {
        qb.push("fp.")
            .push(sort.field.column())
            .push(if sort.descending { " DESC, " } else { " ASC, " });
    }
    qb.push("fp.id DESC");
}

/// Full set of writable purchase fields, used for create and replace
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseInput {
    #[serde(alias = "feed")]
    pub feed_id: i64,
    pub supplier: String,
    pub batch_number: Option<String>,
    pub quantity_kg: Decimal,
    pub cost_per_kg: Decimal,
    pub purchase_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl PurchaseInput {
    /// Trim text fields and drop blank optional ones
    fn normalized(self) -> Self {
        let blank_to_none = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            supplier: self.supplier.trim().to_string(),
            batch_number: blank_to_none(self.batch_number),
            notes: blank_to_none(self.notes),
            ..self
        }
    }

    fn validate(&self) -> AppResult<()> {
        validate_supplier(&self.supplier).map_err(|m| AppError::validation("supplier", m))?;
        if let Some(batch_number) = &self.batch_number {
            validate_batch_number(batch_number)
                .map_err(|m| AppError::validation("batch_number", m))?;
        }
        validate_quantity_kg(self.quantity_kg)
            .map_err(|m| AppError::validation("quantity_kg", m))?;
        validate_cost_per_kg(self.cost_per_kg)
            .map_err(|m| AppError::validation("cost_per_kg", m))?;
        validate_expiry_date(self.purchase_date, self.expiry_date)
            .map_err(|m| AppError::validation("expiry_date", m))?;
        Ok(())
    }
}

/// Partial update of a purchase
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePurchaseInput {
    #[serde(alias = "feed")]
    pub feed_id: Option<i64>,
    pub supplier: Option<String>,
    pub batch_number: Option<String>,
    pub quantity_kg: Option<Decimal>,
    pub cost_per_kg: Option<Decimal>,
    pub purchase_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl UpdatePurchaseInput {
    /// Overlay the provided fields on an existing purchase
    fn merge_into(self, existing: FeedPurchaseRow) -> PurchaseInput {
        PurchaseInput {
            feed_id: self.feed_id.unwrap_or(existing.feed_id),
            supplier: self.supplier.unwrap_or(existing.supplier),
            batch_number: self.batch_number.or(existing.batch_number),
            quantity_kg: self.quantity_kg.unwrap_or(existing.quantity_kg),
            cost_per_kg: self.cost_per_kg.unwrap_or(existing.cost_per_kg),
            purchase_date: self.purchase_date.unwrap_or(existing.purchase_date),
            expiry_date: self.expiry_date.or(existing.expiry_date),
            notes: self.notes.or(existing.notes),
        }
    }
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List purchases matching the filter, one page at a time
    pub async fn list_purchases(
        &self,
        filter: &PurchaseFilter,
        ordering: &PurchaseOrdering,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<FeedPurchase>> {
        let mut count_qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM feed_purchases fp JOIN feeds f ON f.id = fp.feed_id",
        );
        filter.push_conditions(&mut count_qb);
        let (total,) = count_qb
            .build_query_as::<(i64,)>()
            .fetch_one(&self.db)
            .await?;

        let mut qb = QueryBuilder::new(PURCHASE_COLUMNS);
        filter.push_conditions(&mut qb);
        push_ordering(&mut qb, ordering);
        qb.push(" LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows = qb
            .build_query_as::<FeedPurchaseRow>()
            .fetch_all(&self.db)
            .await?;

        let purchases = rows.into_iter().map(FeedPurchase::from).collect();
        Ok(PaginatedResponse::new(
            purchases,
            pagination,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Get a purchase by ID
    pub async fn get_purchase(&self, purchase_id: i64) -> AppResult<FeedPurchase> {
        let mut qb = QueryBuilder::new(PURCHASE_COLUMNS);
        qb.push(" WHERE fp.id = ").push_bind(purchase_id);

        let row = qb
            .build_query_as::<FeedPurchaseRow>()
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Feed purchase".to_string()))?;

        Ok(FeedPurchase::from(row))
    }

    /// Record a new purchase
    pub async fn create_purchase(
        &self,
        input: PurchaseInput,
        reason: Option<&str>,
    ) -> AppResult<FeedPurchase> {
        let input = input.normalized();
        input.validate()?;

        let mut tx = self.db.begin().await?;
        ensure_feed_exists(&mut tx, input.feed_id).await?;

        let purchase_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO feed_purchases (feed_id, supplier, batch_number, quantity_kg, cost_per_kg,
                                        purchase_date, expiry_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(input.feed_id)
        .bind(&input.supplier)
        .bind(&input.batch_number)
        .bind(input.quantity_kg)
        .bind(input.cost_per_kg)
        .bind(input.purchase_date)
        .bind(input.expiry_date)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        let reason = change_reason(HistoryType::Created, reason);
        record_change(&mut tx, purchase_id, HistoryType::Created, &reason).await?;

        tx.commit().await?;

        tracing::info!(purchase_id, supplier = %input.supplier, "Feed purchase recorded");

        self.get_purchase(purchase_id).await
    }

    /// Replace every writable field of a purchase
    pub async fn update_purchase(
        &self,
        purchase_id: i64,
        input: PurchaseInput,
        reason: Option<&str>,
    ) -> AppResult<FeedPurchase> {
        let mut tx = self.db.begin().await?;
        lock_purchase(&mut tx, purchase_id).await?;
        apply_update(&mut tx, purchase_id, input, reason).await?;
        tx.commit().await?;

        tracing::info!(purchase_id, "Feed purchase updated");

        self.get_purchase(purchase_id).await
    }

    /// Update only the provided fields of a purchase
    pub async fn patch_purchase(
        &self,
        purchase_id: i64,
        input: UpdatePurchaseInput,
        reason: Option<&str>,
    ) -> AppResult<FeedPurchase> {
        let mut tx = self.db.begin().await?;
        let existing = lock_purchase(&mut tx, purchase_id).await?;
        apply_update(&mut tx, purchase_id, input.merge_into(existing), reason).await?;
        tx.commit().await?;

        tracing::info!(purchase_id, "Feed purchase patched");

        self.get_purchase(purchase_id).await
    }

    /// Delete a purchase, keeping its audit trail
    pub async fn delete_purchase(&self, purchase_id: i64, reason: Option<&str>) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        lock_purchase(&mut tx, purchase_id).await?;

        // Snapshot before the row disappears
        let reason = change_reason(HistoryType::Deleted, reason);
        record_change(&mut tx, purchase_id, HistoryType::Deleted, &reason).await?;

        sqlx::query("DELETE FROM feed_purchases WHERE id = $1")
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(purchase_id, "Feed purchase deleted");

        Ok(())
    }

    /// Aggregate totals over every purchase matching the filter
    pub async fn summarize(
        &self,
        filter: &PurchaseFilter,
        options: SummaryOptions,
    ) -> AppResult<PurchaseSummary> {
        let mut qb = QueryBuilder::new(
            r#"
            SELECT fp.supplier, fp.feed_id, f.name AS feed_name, fp.quantity_kg,
                   fp.cost_per_kg, fp.purchase_date
            FROM feed_purchases fp
            JOIN feeds f ON f.id = fp.feed_id
            "#,
        );
        filter.push_conditions(&mut qb);

        let rows = qb
            .build_query_as::<PurchaseRecordRow>()
            .fetch_all(&self.db)
            .await?;

        let mut aggregator = PurchaseAggregator::new(options);
        for row in rows {
            aggregator
                .push(&PurchaseRecord::from(row))
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }

        tracing::debug!(
            records = aggregator.record_count(),
            include_supplier_breakdown = options.include_supplier_breakdown,
            include_feed_breakdown = options.include_feed_breakdown,
            "Summarized feed purchases"
        );

        Ok(aggregator.finish())
    }
}

/// Reject writes referencing a feed that does not exist
async fn ensure_feed_exists(conn: &mut PgConnection, feed_id: i64) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM feeds WHERE id = $1)")
        .bind(feed_id)
        .fetch_one(&mut *conn)
        .await?;

    if !exists {
        return Err(AppError::validation("feed_id", "Feed does not exist"));
    }
    Ok(())
}

/// Fetch a purchase and hold a row lock until the transaction ends
async fn lock_purchase(conn: &mut PgConnection, purchase_id: i64) -> AppResult<FeedPurchaseRow> {
    let mut qb = QueryBuilder::new(PURCHASE_COLUMNS);
    qb.push(" WHERE fp.id = ")
        .push_bind(purchase_id)
        .push(" FOR UPDATE OF fp");

    qb.build_query_as::<FeedPurchaseRow>()
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Feed purchase".to_string()))
}

async fn apply_update(
    conn: &mut PgConnection,
    purchase_id: i64,
    input: PurchaseInput,
    reason: Option<&str>,
) -> AppResult<()> {
    let input = input.normalized();
    input.validate()?;
    ensure_feed_exists(&mut *conn, input.feed_id).await?;

    sqlx::query(
        r#"
        UPDATE feed_purchases
        SET feed_id = $1, supplier = $2, batch_number = $3, quantity_kg = $4,
            cost_per_kg = $5, purchase_date = $6, expiry_date = $7, notes = $8,
            updated_at = NOW()
        WHERE id = $9
        "#,
    )
    .bind(input.feed_id)
    .bind(&input.supplier)
    .bind(&input.batch_number)
    .bind(input.quantity_kg)
    .bind(input.cost_per_kg)
    .bind(input.purchase_date)
    .bind(input.expiry_date)
    .bind(&input.notes)
    .bind(purchase_id)
    .execute(&mut *conn)
    .await?;

    let reason = change_reason(HistoryType::Changed, reason);
    record_change(&mut *conn, purchase_id, HistoryType::Changed, &reason).await
}
