//! Central index repository.
//!
//! Implements the core `IndexStore` trait over the `payment_index`
//! table. Upserts are single `ON CONFLICT` statements so a replaced row
//! never leaves a visible gap; full rebuilds load the shadow table and
//! swap the two names in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, QueryOrder, Set,
    Statement, TransactionTrait, Value,
};
use tracing::debug;

use payrail_core::index::{IndexRow, IndexStore, StoreError};
use payrail_core::request::{PaymentMethod, RequestKind, RequestStatus};
use payrail_shared::types::{Currency, RecordId, RequestRef, TenantId};

use crate::entities::payment_index;

/// Rows per multi-value insert during a rebuild load.
const INSERT_CHUNK: usize = 200;

const COLUMNS: [&str; 16] = [
    "tenant_id",
    "record_id",
    "kind",
    "status",
    "amount",
    "currency",
    "title",
    "created_at",
    "updated_at",
    "paid_at",
    "category",
    "method",
    "wordcamp_name",
    "date_paid",
    "sponsor_name",
    "due_date",
];

/// Central index repository.
#[derive(Debug, Clone)]
pub struct IndexRowRepository {
    db: DatabaseConnection,
}

impl IndexRowRepository {
    /// Creates a new index repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn db_err(e: DbErr) -> StoreError {
    match e {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => StoreError::Unavailable(e.to_string()),
        other => StoreError::Query(other.to_string()),
    }
}

fn to_active_model(row: &IndexRow) -> payment_index::ActiveModel {
    payment_index::ActiveModel {
        tenant_id: Set(row.tenant_id.into_inner()),
        record_id: Set(row.record_id.into_inner()),
        kind: Set(row.kind.as_str().to_string()),
        status: Set(row.status.as_str().to_string()),
        amount: Set(row.amount),
        currency: Set(row.currency.as_str().to_string()),
        title: Set(row.title.clone()),
        created_at: Set(row.created_at.fixed_offset()),
        updated_at: Set(row.updated_at.fixed_offset()),
        paid_at: Set(row.paid_at.map(|t| t.fixed_offset())),
        category: Set(row.category.clone()),
        method: Set(row.method.map(|m| m.as_str().to_string())),
        wordcamp_name: Set(row.wordcamp_name.clone()),
        date_paid: Set(row.date_paid),
        sponsor_name: Set(row.sponsor_name.clone()),
        due_date: Set(row.due_date),
    }
}

fn to_index_row(model: payment_index::Model) -> Result<IndexRow, StoreError> {
    let kind = RequestKind::parse(&model.kind)
        .ok_or_else(|| StoreError::Query(format!("unknown kind {:?}", model.kind)))?;
    let status = RequestStatus::parse(&model.status)
        .ok_or_else(|| StoreError::Query(format!("unknown status {:?}", model.status)))?;
    let currency = if model.currency.is_empty() {
        Currency::unset()
    } else {
        Currency::new(&model.currency)
            .ok_or_else(|| StoreError::Query(format!("bad currency {:?}", model.currency)))?
    };
    let method = model
        .method
        .as_deref()
        .map(|m| {
            PaymentMethod::parse(m)
                .ok_or_else(|| StoreError::Query(format!("unknown method {m:?}")))
        })
        .transpose()?;

    Ok(IndexRow {
        tenant_id: TenantId(model.tenant_id),
        record_id: RecordId(model.record_id),
        kind,
        status,
        amount: model.amount,
        currency,
        title: model.title,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        paid_at: model.paid_at.map(|t| t.with_timezone(&Utc)),
        category: model.category,
        method,
        wordcamp_name: model.wordcamp_name,
        date_paid: model.date_paid,
        sponsor_name: model.sponsor_name,
        due_date: model.due_date,
    })
}

fn row_values(row: &IndexRow) -> Vec<Value> {
    vec![
        row.tenant_id.into_inner().into(),
        row.record_id.into_inner().into(),
        row.kind.as_str().into(),
        row.status.as_str().into(),
        row.amount.into(),
        row.currency.as_str().into(),
        row.title.clone().into(),
        row.created_at.fixed_offset().into(),
        row.updated_at.fixed_offset().into(),
        row.paid_at.map(|t| t.fixed_offset()).into(),
        row.category.clone().into(),
        row.method.map(|m| m.as_str().to_string()).into(),
        row.wordcamp_name.clone().into(),
        row.date_paid.into(),
        row.sponsor_name.clone().into(),
        row.due_date.into(),
    ]
}

/// Builds a multi-row insert into the shadow table.
fn shadow_insert(rows: &[IndexRow]) -> Statement {
    let mut placeholders = Vec::with_capacity(rows.len());
    let mut values: Vec<Value> = Vec::with_capacity(rows.len() * COLUMNS.len());
    for (i, row) in rows.iter().enumerate() {
        let base = i * COLUMNS.len();
        let group: Vec<String> = (1..=COLUMNS.len()).map(|j| format!("${}", base + j)).collect();
        placeholders.push(format!("({})", group.join(", ")));
        values.extend(row_values(row));
    }
    Statement::from_sql_and_values(
        DbBackend::Postgres,
        format!(
            "INSERT INTO payment_index_shadow ({}) VALUES {}",
            COLUMNS.join(", "),
            placeholders.join(", ")
        ),
        values,
    )
}

#[async_trait]
impl IndexStore for IndexRowRepository {
    async fn upsert(&self, row: IndexRow) -> Result<(), StoreError> {
        payment_index::Entity::insert(to_active_model(&row))
            .on_conflict(
                OnConflict::columns([
                    payment_index::Column::TenantId,
                    payment_index::Column::RecordId,
                ])
                .update_columns([
                    payment_index::Column::Kind,
                    payment_index::Column::Status,
                    payment_index::Column::Amount,
                    payment_index::Column::Currency,
                    payment_index::Column::Title,
                    payment_index::Column::CreatedAt,
                    payment_index::Column::UpdatedAt,
                    payment_index::Column::PaidAt,
                    payment_index::Column::Category,
                    payment_index::Column::Method,
                    payment_index::Column::WordcampName,
                    payment_index::Column::DatePaid,
                    payment_index::Column::SponsorName,
                    payment_index::Column::DueDate,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, reference: RequestRef) -> Result<(), StoreError> {
        payment_index::Entity::delete_by_id((
            reference.tenant_id.into_inner(),
            reference.record_id.into_inner(),
        ))
        .exec(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn swap_in(&self, rows: Vec<IndexRow>) -> Result<(), StoreError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        txn.execute_unprepared("TRUNCATE payment_index_shadow")
            .await
            .map_err(db_err)?;
        for chunk in rows.chunks(INSERT_CHUNK) {
            txn.execute(shadow_insert(chunk)).await.map_err(db_err)?;
        }
        // Rename both tables inside the transaction; readers see either
        // the old index or the new one, never an empty table.
        txn.execute_unprepared(
            "ALTER TABLE payment_index RENAME TO payment_index_retired;
             ALTER TABLE payment_index_shadow RENAME TO payment_index;
             ALTER TABLE payment_index_retired RENAME TO payment_index_shadow;",
        )
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        debug!(rows = rows.len(), "index swapped in");
        Ok(())
    }

    async fn select_window(
        &self,
        statuses: &[RequestStatus],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RequestRef>, StoreError> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let slugs: Vec<Value> = statuses.iter().map(|s| s.as_str().into()).collect();
        let in_list: Vec<String> = (1..=slugs.len()).map(|i| format!("${i}")).collect();
        let mut values = slugs;
        let start_param = values.len() + 1;
        let end_param = values.len() + 2;
        values.push(start.fixed_offset().into());
        values.push(end.fixed_offset().into());

        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            format!(
                "SELECT tenant_id, record_id FROM payment_index \
                 WHERE status IN ({}) \
                 AND COALESCE(paid_at, updated_at) BETWEEN ${start_param} AND ${end_param} \
                 ORDER BY COALESCE(paid_at, updated_at), tenant_id, record_id",
                in_list.join(", ")
            ),
            values,
        );

        let rows = self.db.query_all(statement).await.map_err(db_err)?;
        rows.into_iter()
            .map(|row| {
                let tenant: i64 = row.try_get("", "tenant_id").map_err(db_err)?;
                let record: i64 = row.try_get("", "record_id").map_err(db_err)?;
                Ok(RequestRef::new(TenantId(tenant), RecordId(record)))
            })
            .collect()
    }

    async fn all(&self) -> Result<Vec<IndexRow>, StoreError> {
        payment_index::Entity::find()
            .order_by_asc(payment_index::Column::TenantId)
            .order_by_asc(payment_index::Column::RecordId)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(to_index_row)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_row() -> IndexRow {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        IndexRow {
            tenant_id: TenantId(42),
            record_id: RecordId(7),
            kind: RequestKind::VendorPayment,
            status: RequestStatus::Approved,
            amount: dec!(150.01),
            currency: Currency::usd(),
            title: "Venue deposit".to_string(),
            created_at: t,
            updated_at: t,
            paid_at: None,
            category: Some("venue".to_string()),
            method: Some(PaymentMethod::Check),
            wordcamp_name: None,
            date_paid: None,
            sponsor_name: None,
            due_date: None,
        }
    }

    #[test]
    fn test_model_roundtrip() {
        let row = sample_row();
        let model = payment_index::Model {
            tenant_id: row.tenant_id.into_inner(),
            record_id: row.record_id.into_inner(),
            kind: row.kind.as_str().to_string(),
            status: row.status.as_str().to_string(),
            amount: row.amount,
            currency: row.currency.as_str().to_string(),
            title: row.title.clone(),
            created_at: row.created_at.fixed_offset(),
            updated_at: row.updated_at.fixed_offset(),
            paid_at: None,
            category: row.category.clone(),
            method: Some("Check".to_string()),
            wordcamp_name: None,
            date_paid: None,
            sponsor_name: None,
            due_date: None,
        };
        assert_eq!(to_index_row(model).unwrap(), row);
    }

    #[test]
    fn test_unset_currency_survives_storage() {
        let mut row = sample_row();
        row.currency = Currency::unset();
        let active = to_active_model(&row);
        let sea_orm::ActiveValue::Set(code) = active.currency else {
            panic!("currency not set");
        };
        assert_eq!(code, "");
    }

    #[test]
    fn test_corrupt_status_is_a_query_error() {
        let row = sample_row();
        let model = payment_index::Model {
            tenant_id: row.tenant_id.into_inner(),
            record_id: row.record_id.into_inner(),
            kind: row.kind.as_str().to_string(),
            status: "mystery".to_string(),
            amount: row.amount,
            currency: String::new(),
            title: row.title,
            created_at: row.created_at.fixed_offset(),
            updated_at: row.updated_at.fixed_offset(),
            paid_at: None,
            category: None,
            method: None,
            wordcamp_name: None,
            date_paid: None,
            sponsor_name: None,
            due_date: None,
        };
        assert!(matches!(
            to_index_row(model),
            Err(StoreError::Query(_))
        ));
    }

    #[test]
    fn test_shadow_insert_numbers_placeholders_per_row() {
        let rows = vec![sample_row(), sample_row()];
        let statement = shadow_insert(&rows);
        let sql = statement.sql.as_str();
        assert!(sql.contains("$1"));
        assert!(sql.contains("$32"));
        assert!(!sql.contains("$33"));
    }
}
