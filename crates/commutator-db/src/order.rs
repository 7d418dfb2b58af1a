use chrono::Utc;
use commutator_core::models::{NewOrderRecord, OrderRecord};
use commutator_core::AppError;
use sqlx::{Sqlite, SqlitePool};

/// Repository for the `project_orders` audit table
#[derive(Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one order row and return its id.
    #[tracing::instrument(skip(self, order), fields(db.table = "project_orders", db.operation = "insert", service = %order.service_name))]
    pub async fn insert(&self, order: &NewOrderRecord) -> Result<i64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO project_orders (
                service_name, full_name, company_name, country, address, contact_info,
                project_link, payment_method, start_date, language, ip_address, user_agent,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.service_name)
        .bind(&order.full_name)
        .bind(&order.company_name)
        .bind(&order.country)
        .bind(&order.address)
        .bind(&order.contact_info)
        .bind(&order.project_link)
        .bind(&order.payment_method)
        .bind(&order.start_date)
        .bind(&order.language)
        .bind(&order.ip_address)
        .bind(&order.user_agent)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    #[tracing::instrument(skip(self), fields(db.table = "project_orders", db.operation = "select"))]
    pub async fn list_recent(
        &self,
        service_name: &str,
        limit: i64,
    ) -> Result<Vec<OrderRecord>, AppError> {
        let rows = sqlx::query_as::<Sqlite, OrderRecord>(
            r#"
            SELECT id, service_name, full_name, company_name, country, address, contact_info,
                   project_link, payment_method, start_date, language, ip_address, user_agent,
                   created_at
            FROM project_orders
            WHERE service_name = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(service_name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "project_orders", db.operation = "count"))]
    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM project_orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
