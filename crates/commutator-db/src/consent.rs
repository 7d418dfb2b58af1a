use chrono::Utc;
use commutator_core::models::{ConsentRecord, NewConsentRecord};
use commutator_core::AppError;
use sqlx::{Sqlite, SqlitePool};

/// Repository for the `cookie_consents` audit table
#[derive(Clone)]
pub struct ConsentRepository {
    pool: SqlitePool,
}

impl ConsentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, consent), fields(db.table = "cookie_consents", db.operation = "insert", service = %consent.service_name))]
    pub async fn insert(&self, consent: &NewConsentRecord) -> Result<i64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO cookie_consents (
                service_name, fingerprint, user_agent, ip_address, accepted, timestamp,
                language, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&consent.service_name)
        .bind(&consent.fingerprint)
        .bind(&consent.user_agent)
        .bind(&consent.ip_address)
        .bind(consent.accepted)
        .bind(&consent.timestamp)
        .bind(&consent.language)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Consent history for one browser fingerprint, oldest first
    #[tracing::instrument(skip(self, fingerprint), fields(db.table = "cookie_consents", db.operation = "select"))]
    pub async fn find_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Vec<ConsentRecord>, AppError> {
        let rows = sqlx::query_as::<Sqlite, ConsentRecord>(
            r#"
            SELECT id, service_name, fingerprint, user_agent, ip_address, accepted, timestamp,
                   language, created_at
            FROM cookie_consents
            WHERE fingerprint = ?
            ORDER BY id ASC
            "#,
        )
        .bind(fingerprint)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "cookie_consents", db.operation = "count"))]
    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM cookie_consents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
