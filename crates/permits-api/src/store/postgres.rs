//! Postgres [`PermitStore`] via SQLx.
//!
//! Rows are read into `FromRow` structs and converted to domain types at
//! the boundary. A row that no longer parses (an unknown status, a
//! malformed application number) is reported as a backend error rather
//! than silently defaulted.
//!
//! Every call goes through [`with_retry`], so pool timeouts and dropped
//! connections are retried before surfacing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use permits_core::{
    ApplicationId, ApplicationNumber, BusinessDetails, BusinessDetailsInput, DocumentId,
    DocumentType, EventId, Fee, PaymentId, PermitTypeId, Role, Timestamp, UserId,
};
use permits_state::{
    Application, ApplicationStatus, Document, PermitType, PermitTypeSpec, StatusHistoryEvent,
};

use super::retry::with_retry;
use super::{NewApplication, PermitStore, StoreError, TransitionWrite};
use crate::config::DatabaseConfig;
use crate::model::{ApplicationFilter, Payment, PaymentMethod, PaymentStatus, User};

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect with the configured pool bounds and apply embedded migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;
        tracing::info!("Connected to PostgreSQL");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ─── Rows ────────────────────────────────────────────────────────────

fn corrupt(what: &str, value: impl std::fmt::Display) -> StoreError {
    tracing::error!(column = what, value = %value, "unreadable value in stored row");
    StoreError::Backend(format!("unreadable {what} in stored row: {value}"))
}

fn ts(dt: DateTime<Utc>) -> Timestamp {
    Timestamp::from_utc(dt)
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
    id_number: Option<String>,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            role: Role::from_name(&row.role).ok_or_else(|| corrupt("role", &row.role))?,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone_number: row.phone_number,
            id_number: row.id_number,
            is_active: row.is_active,
            created_at: ts(row.created_at),
        })
    }
}

#[derive(FromRow)]
struct PermitTypeRow {
    id: Uuid,
    name: String,
    description: String,
    fee_cents: i64,
    is_active: bool,
    required_documents: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PermitTypeRow> for PermitType {
    type Error = StoreError;

    fn try_from(row: PermitTypeRow) -> Result<Self, Self::Error> {
        let required_documents = row
            .required_documents
            .iter()
            .map(|d| DocumentType::from_name(d).ok_or_else(|| corrupt("document_type", d)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: PermitTypeId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            fee: Fee::from_minor_units(row.fee_cents)
                .map_err(|_| corrupt("fee_cents", row.fee_cents))?,
            is_active: row.is_active,
            required_documents,
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
        })
    }
}

#[derive(FromRow)]
struct ApplicationRow {
    id: Uuid,
    application_number: String,
    status: String,
    business_name: String,
    business_type: String,
    phone_number: String,
    national_id: String,
    business_address: String,
    user_id: Uuid,
    permit_type_id: Uuid,
    assigned_officer_id: Option<Uuid>,
    submitted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = StoreError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        let application_number = ApplicationNumber::parse(&row.application_number)
            .map_err(|_| corrupt("application_number", &row.application_number))?;
        let status =
            ApplicationStatus::from_name(&row.status).ok_or_else(|| corrupt("status", &row.status))?;
        let business = BusinessDetails::parse(BusinessDetailsInput {
            business_name: row.business_name,
            business_type: row.business_type,
            phone_number: row.phone_number,
            national_id: row.national_id,
            business_address: row.business_address,
        })
        .map_err(|e| corrupt("business details", e))?;
        Ok(Self {
            id: ApplicationId::from_uuid(row.id),
            application_number,
            status,
            business,
            user_id: UserId::from_uuid(row.user_id),
            permit_type_id: PermitTypeId::from_uuid(row.permit_type_id),
            assigned_officer_id: row.assigned_officer_id.map(UserId::from_uuid),
            submitted_at: row.submitted_at.map(ts),
            created_at: ts(row.created_at),
            updated_at: ts(row.updated_at),
            version: row.version,
        })
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    application_id: Uuid,
    file_name: String,
    original_name: String,
    file_size: i64,
    mime_type: String,
    document_type: String,
    file_url: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: DocumentId::from_uuid(row.id),
            application_id: ApplicationId::from_uuid(row.application_id),
            document_type: DocumentType::from_name(&row.document_type)
                .ok_or_else(|| corrupt("document_type", &row.document_type))?,
            file_name: row.file_name,
            original_name: row.original_name,
            file_size: row.file_size,
            mime_type: row.mime_type,
            file_url: row.file_url,
            created_at: ts(row.created_at),
        })
    }
}

#[derive(FromRow)]
struct HistoryRow {
    id: Uuid,
    application_id: Uuid,
    status: String,
    comment: Option<String>,
    updated_by: Uuid,
    created_at: DateTime<Utc>,
    sequence: i64,
}

impl TryFrom<HistoryRow> for StatusHistoryEvent {
    type Error = StoreError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EventId::from_uuid(row.id),
            application_id: ApplicationId::from_uuid(row.application_id),
            status: ApplicationStatus::from_name(&row.status)
                .ok_or_else(|| corrupt("status", &row.status))?,
            comment: row.comment,
            updated_by: UserId::from_uuid(row.updated_by),
            created_at: ts(row.created_at),
            sequence: row.sequence,
        })
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: Uuid,
    application_id: Uuid,
    transaction_id: String,
    amount_cents: i64,
    method: String,
    status: String,
    reported_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PaymentId::from_uuid(row.id),
            application_id: ApplicationId::from_uuid(row.application_id),
            amount: Fee::from_minor_units(row.amount_cents)
                .map_err(|_| corrupt("amount_cents", row.amount_cents))?,
            method: PaymentMethod::from_name(&row.method)
                .ok_or_else(|| corrupt("method", &row.method))?,
            status: PaymentStatus::from_name(&row.status)
                .ok_or_else(|| corrupt("payment status", &row.status))?,
            transaction_id: row.transaction_id,
            reported_at: ts(row.reported_at),
            created_at: ts(row.created_at),
        })
    }
}

fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ─── Queries ─────────────────────────────────────────────────────────

const APPLICATION_COLUMNS: &str = "id, application_number, status, business_name, business_type, \
     phone_number, national_id, business_address, user_id, permit_type_id, assigned_officer_id, \
     submitted_at, created_at, updated_at, version";

const PERMIT_TYPE_COLUMNS: &str =
    "id, name, description, fee_cents, is_active, required_documents, created_at, updated_at";

fn document_names(types: &[DocumentType]) -> Vec<String> {
    types.iter().map(|t| t.as_str().to_string()).collect()
}

async fn insert_documents(
    tx: &mut Transaction<'_, Postgres>,
    documents: &[Document],
) -> Result<(), sqlx::Error> {
    for doc in documents {
        sqlx::query(
            "INSERT INTO documents (id, application_id, file_name, original_name, file_size,
                                    mime_type, document_type, file_url, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(doc.id.as_uuid())
        .bind(doc.application_id.as_uuid())
        .bind(&doc.file_name)
        .bind(&doc.original_name)
        .bind(doc.file_size)
        .bind(&doc.mime_type)
        .bind(doc.document_type.as_str())
        .bind(&doc.file_url)
        .bind(doc.created_at.as_datetime())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &StatusHistoryEvent,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO status_history (id, application_id, status, comment, updated_by, created_at, sequence)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(event.id.as_uuid())
    .bind(event.application_id.as_uuid())
    .bind(event.status.as_str())
    .bind(event.comment.as_deref())
    .bind(event.updated_by.as_uuid())
    .bind(event.created_at.as_datetime())
    .bind(event.sequence)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_payment_row<'e, E>(executor: E, payment: &Payment) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        "INSERT INTO payments (id, application_id, transaction_id, amount_cents, method, status,
                               reported_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(payment.id.as_uuid())
    .bind(payment.application_id.as_uuid())
    .bind(&payment.transaction_id)
    .bind(payment.amount.minor_units())
    .bind(payment.method.as_str())
    .bind(payment.status.as_str())
    .bind(payment.reported_at.as_datetime())
    .bind(payment.created_at.as_datetime())
    .execute(executor)
    .await?;
    Ok(())
}

impl PgStore {
    async fn insert_application_once(&self, new: &NewApplication) -> Result<(), StoreError> {
        let app = &new.application;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO applications (id, application_number, status, business_name, business_type,
                                       phone_number, national_id, business_address, user_id,
                                       permit_type_id, assigned_officer_id, submitted_at,
                                       created_at, updated_at, version)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(app.id.as_uuid())
        .bind(app.application_number.as_str())
        .bind(app.status.as_str())
        .bind(&app.business.business_name)
        .bind(app.business.business_type.as_str())
        .bind(app.business.phone_number.as_str())
        .bind(app.business.national_id.as_str())
        .bind(&app.business.business_address)
        .bind(app.user_id.as_uuid())
        .bind(app.permit_type_id.as_uuid())
        .bind(app.assigned_officer_id.map(|u| *u.as_uuid()))
        .bind(app.submitted_at.map(|t| *t.as_datetime()))
        .bind(app.created_at.as_datetime())
        .bind(app.updated_at.as_datetime())
        .bind(app.version)
        .execute(&mut *tx)
        .await?;
        insert_documents(&mut tx, &new.documents).await?;
        insert_event(&mut tx, &new.event).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn apply_transition_once(&self, write: &TransitionWrite) -> Result<(), StoreError> {
        let app = &write.application;
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE applications
                SET status = $1, assigned_officer_id = $2, submitted_at = $3,
                    updated_at = $4, version = $5
              WHERE id = $6 AND version = $7",
        )
        .bind(app.status.as_str())
        .bind(app.assigned_officer_id.map(|u| *u.as_uuid()))
        .bind(app.submitted_at.map(|t| *t.as_datetime()))
        .bind(app.updated_at.as_datetime())
        .bind(app.version)
        .bind(app.id.as_uuid())
        .bind(write.expected_version)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::VersionConflict);
        }
        if let Some(payment) = &write.payment {
            insert_payment_row(&mut *tx, payment).await?;
        }
        insert_documents(&mut tx, &write.documents).await?;
        insert_event(&mut tx, &write.event).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_permit_type_once(
        &self,
        spec: &PermitTypeSpec,
        now: Timestamp,
    ) -> Result<PermitType, StoreError> {
        let fresh = PermitType::from_spec(spec.clone(), now);
        let row: PermitTypeRow = sqlx::query_as(&format!(
            "INSERT INTO permit_types (id, name, description, fee_cents, is_active,
                                       required_documents, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             ON CONFLICT (name) DO UPDATE
                SET description = EXCLUDED.description,
                    fee_cents = EXCLUDED.fee_cents,
                    is_active = EXCLUDED.is_active,
                    required_documents = EXCLUDED.required_documents,
                    updated_at = EXCLUDED.updated_at
             RETURNING {PERMIT_TYPE_COLUMNS}"
        ))
        .bind(fresh.id.as_uuid())
        .bind(&fresh.name)
        .bind(&fresh.description)
        .bind(fresh.fee.minor_units())
        .bind(fresh.is_active)
        .bind(document_names(&fresh.required_documents))
        .bind(now.as_datetime())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list_applications_once(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));
        let rows: Vec<ApplicationRow> = sqlx::query_as(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications
              WHERE ($1::uuid IS NULL OR user_id = $1)
                AND ($2::text IS NULL OR status = $2)
                AND ($2::text IS NOT NULL OR $3 OR status <> 'DRAFT')
                AND ($4::uuid IS NULL OR permit_type_id = $4)
                AND ($5::text IS NULL OR application_number ILIKE $5 OR business_name ILIKE $5)
              ORDER BY created_at DESC, application_number DESC"
        ))
        .bind(filter.owner.map(|u| *u.as_uuid()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.include_drafts)
        .bind(filter.permit_type_id.map(|p| *p.as_uuid()))
        .bind(search)
        .fetch_all(&self.pool)
        .await?;
        convert(rows)
    }
}

#[async_trait]
impl PermitStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        with_retry("ping", move || async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }

    async fn list_permit_types(&self, active_only: bool) -> Result<Vec<PermitType>, StoreError> {
        with_retry("list_permit_types", move || async move {
            let rows: Vec<PermitTypeRow> = sqlx::query_as(&format!(
                "SELECT {PERMIT_TYPE_COLUMNS} FROM permit_types
                  WHERE ($1 = FALSE OR is_active)
                  ORDER BY name"
            ))
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;
            convert(rows)
        })
        .await
    }

    async fn get_permit_type(&self, id: PermitTypeId) -> Result<Option<PermitType>, StoreError> {
        with_retry("get_permit_type", move || async move {
            let row: Option<PermitTypeRow> = sqlx::query_as(&format!(
                "SELECT {PERMIT_TYPE_COLUMNS} FROM permit_types WHERE id = $1"
            ))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
            row.map(PermitType::try_from).transpose()
        })
        .await
    }

    async fn upsert_permit_type(
        &self,
        spec: PermitTypeSpec,
        now: Timestamp,
    ) -> Result<PermitType, StoreError> {
        let spec = &spec;
        with_retry("upsert_permit_type", move || self.upsert_permit_type_once(spec, now)).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        with_retry("insert_user", move || async move {
            sqlx::query(
                "INSERT INTO users (id, email, first_name, last_name, phone_number, id_number,
                                    role, is_active, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(user.id.as_uuid())
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.phone_number.as_deref())
            .bind(user.id_number.as_deref())
            .bind(user.role.as_str())
            .bind(user.is_active)
            .bind(user.created_at.as_datetime())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        with_retry("get_user", move || async move {
            let row: Option<UserRow> = sqlx::query_as(
                "SELECT id, email, first_name, last_name, phone_number, id_number, role,
                        is_active, created_at
                   FROM users WHERE id = $1",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
            row.map(User::try_from).transpose()
        })
        .await
    }

    async fn user_names(&self, ids: &[UserId]) -> Result<HashMap<UserId, String>, StoreError> {
        let uuids: Vec<Uuid> = ids.iter().map(|u| *u.as_uuid()).collect();
        let uuids = &uuids;
        with_retry("user_names", move || async move {
            let rows: Vec<UserRow> = sqlx::query_as(
                "SELECT id, email, first_name, last_name, phone_number, id_number, role,
                        is_active, created_at
                   FROM users WHERE id = ANY($1)",
            )
            .bind(uuids)
            .fetch_all(&self.pool)
            .await?;
            let users: Vec<User> = convert(rows)?;
            Ok(users.into_iter().map(|u| (u.id, u.display_name())).collect())
        })
        .await
    }

    async fn insert_application(&self, new: NewApplication) -> Result<(), StoreError> {
        let new = &new;
        with_retry("insert_application", move || self.insert_application_once(new)).await
    }

    async fn get_application(
        &self,
        number: &ApplicationNumber,
    ) -> Result<Option<Application>, StoreError> {
        with_retry("get_application", move || async move {
            let row: Option<ApplicationRow> = sqlx::query_as(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM applications WHERE application_number = $1"
            ))
            .bind(number.as_str())
            .fetch_optional(&self.pool)
            .await?;
            row.map(Application::try_from).transpose()
        })
        .await
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError> {
        with_retry("list_applications", move || self.list_applications_once(filter)).await
    }

    async fn list_documents(&self, id: ApplicationId) -> Result<Vec<Document>, StoreError> {
        with_retry("list_documents", move || async move {
            let rows: Vec<DocumentRow> = sqlx::query_as(
                "SELECT id, application_id, file_name, original_name, file_size, mime_type,
                        document_type, file_url, created_at
                   FROM documents WHERE application_id = $1
                  ORDER BY created_at, document_type",
            )
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
            convert(rows)
        })
        .await
    }

    async fn list_history(
        &self,
        id: ApplicationId,
    ) -> Result<Vec<StatusHistoryEvent>, StoreError> {
        with_retry("list_history", move || async move {
            let rows: Vec<HistoryRow> = sqlx::query_as(
                "SELECT id, application_id, status, comment, updated_by, created_at, sequence
                   FROM status_history WHERE application_id = $1
                  ORDER BY created_at, sequence",
            )
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
            convert(rows)
        })
        .await
    }

    async fn apply_transition(&self, write: TransitionWrite) -> Result<(), StoreError> {
        let write = &write;
        with_retry("apply_transition", move || self.apply_transition_once(write)).await
    }

    async fn count_transitions_since(
        &self,
        status: ApplicationStatus,
        since: Timestamp,
    ) -> Result<i64, StoreError> {
        with_retry("count_transitions_since", move || async move {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM status_history WHERE status = $1 AND created_at >= $2",
            )
            .bind(status.as_str())
            .bind(since.as_datetime())
            .fetch_one(&self.pool)
            .await?;
            Ok(count)
        })
        .await
    }

    async fn find_payment(&self, transaction_id: &str) -> Result<Option<Payment>, StoreError> {
        with_retry("find_payment", move || async move {
            let row: Option<PaymentRow> = sqlx::query_as(
                "SELECT id, application_id, transaction_id, amount_cents, method, status,
                        reported_at, created_at
                   FROM payments WHERE transaction_id = $1",
            )
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await?;
            row.map(Payment::try_from).transpose()
        })
        .await
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        with_retry("insert_payment", move || async move {
            insert_payment_row(&self.pool, payment).await?;
            Ok(())
        })
        .await
    }
}
