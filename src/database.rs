use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use arc_swap::ArcSwapOption;
use log::{error, info, warn};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
    fixtures,
    models::{CreateExpenseRequest, Expense, ExpenseCategory, ExpenseStatus, User, DEFAULT_CURRENCY},
};

pub type Database = Pool<Postgres>;

const EXPENSE_SELECT: &str = r#"
    SELECT e.expense_id AS id, e.user_id, e.category_id, e.status_id, e.amount_minor,
           e.currency, e.expense_date, e.description, e.receipt_file,
           e.submitted_at, e.reviewed_by, e.reviewed_at, e.created_at,
           u.user_name, c.category_name, s.status_name
    FROM expenses e
    JOIN users u ON e.user_id = u.user_id
    JOIN expense_categories c ON e.category_id = c.category_id
    JOIN expense_status s ON e.status_id = s.status_id
"#;

pub async fn create_database_pool(config: &DatabaseConfig, database_url: &str) -> Result<Database, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(database_url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await?;

    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub mode: &'static str,
    pub last_error: Option<String>,
}

/// Single data-access service shared by every handler.
///
/// Reads degrade to the fixture dataset once the database fails; writes never
/// do and report [`AppError::ServiceUnavailable`] instead. Fallback mode is
/// sticky for the lifetime of the process.
pub struct DatabaseService {
    pool: Option<Database>,
    use_fixtures: AtomicBool,
    last_error: ArcSwapOption<String>,
}

impl DatabaseService {
    pub async fn connect(config: &DatabaseConfig) -> Self {
        let Some(url) = config.url.as_deref() else {
            warn!("DATABASE_URL is not set, serving fixture data");
            let service = Self::fixtures_only();
            service.record_error("No database is configured; showing sample data.");
            return service;
        };

        match create_database_pool(config, url).await {
            Ok(pool) => {
                info!("Database connection successful");
                if config.run_migrations {
                    if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                        error!("Failed to run migrations: {}", e);
                    }
                }
                Self::with_pool(pool)
            }
            Err(e) => {
                error!("Failed to connect to database, using fixture data: {}", e);
                let service = Self::fixtures_only();
                service.record_error("Could not connect to the database; showing sample data.");
                service
            }
        }
    }

    pub fn with_pool(pool: Database) -> Self {
        Self {
            pool: Some(pool),
            use_fixtures: AtomicBool::new(false),
            last_error: ArcSwapOption::empty(),
        }
    }

    pub fn fixtures_only() -> Self {
        Self {
            pool: None,
            use_fixtures: AtomicBool::new(true),
            last_error: ArcSwapOption::empty(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.use_fixtures.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.load_full().map(|msg| (*msg).clone())
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            mode: if self.is_fallback() { "fixture" } else { "database" },
            last_error: self.last_error(),
        }
    }

    fn record_error(&self, message: &str) {
        self.last_error.store(Some(Arc::new(message.to_string())));
    }

    fn enter_fallback(&self, message: &str) {
        self.record_error(message);
        self.use_fixtures.store(true, Ordering::Release);
    }

    // Pool to use for this call, or None when reads must come from fixtures.
    fn live_pool(&self) -> Option<&Database> {
        if self.is_fallback() {
            None
        } else {
            self.pool.as_ref()
        }
    }

    fn writable_pool(&self) -> AppResult<&Database> {
        self.live_pool().ok_or_else(|| {
            AppError::ServiceUnavailable(
                "The database is unavailable; changes cannot be saved while showing sample data".to_string(),
            )
        })
    }

    pub async fn get_expenses(&self, status_id: Option<i32>, user_id: Option<i32>) -> Vec<Expense> {
        let Some(pool) = self.live_pool() else {
            return fixtures::expenses(status_id, user_id);
        };

        let query = format!(
            "{EXPENSE_SELECT}
             WHERE ($1::int4 IS NULL OR e.status_id = $1)
               AND ($2::int4 IS NULL OR e.user_id = $2)
             ORDER BY e.expense_date DESC, e.expense_id DESC"
        );
        match sqlx::query_as::<_, Expense>(&query)
            .bind(status_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
        {
            Ok(expenses) => expenses,
            Err(e) => {
                error!("Error retrieving expenses: {}", e);
                self.enter_fallback("Could not load expenses from the database; showing sample data.");
                fixtures::expenses(status_id, user_id)
            }
        }
    }

    pub async fn get_expense(&self, expense_id: i32) -> Option<Expense> {
        let Some(pool) = self.live_pool() else {
            return fixtures::expense(expense_id);
        };

        let query = format!("{EXPENSE_SELECT} WHERE e.expense_id = $1");
        match sqlx::query_as::<_, Expense>(&query)
            .bind(expense_id)
            .fetch_optional(pool)
            .await
        {
            Ok(expense) => expense,
            Err(e) => {
                error!("Error retrieving expense {}: {}", expense_id, e);
                self.enter_fallback("Could not load the expense from the database; showing sample data.");
                fixtures::expense(expense_id)
            }
        }
    }

    pub async fn create_expense(&self, request: &CreateExpenseRequest, user_id: i32) -> AppResult<i32> {
        request.validate()?;
        let pool = self.writable_pool()?;

        let result = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO expenses (user_id, category_id, status_id, amount_minor, currency, expense_date, description, receipt_file, submitted_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NULL, NOW())
            RETURNING expense_id
            "#,
        )
        .bind(user_id)
        .bind(request.category_id)
        .bind(ExpenseStatus::Draft.id())
        .bind(request.amount_minor()?)
        .bind(DEFAULT_CURRENCY)
        .bind(request.date)
        .bind(request.trimmed_description())
        .bind(request.receipt_file.as_deref())
        .fetch_one(pool)
        .await;

        match result {
            Ok(id) => {
                info!("Created expense {} for user {}", id, user_id);
                Ok(id)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(AppError::BadRequest("Unknown category or user".to_string()))
            }
            Err(e) => {
                self.record_error("Could not create the expense.");
                Err(e.into())
            }
        }
    }

    /// Returns false when no expense with that id exists.
    pub async fn update_expense_status(
        &self,
        expense_id: i32,
        status: ExpenseStatus,
        reviewer_id: Option<i32>,
    ) -> AppResult<bool> {
        let pool = self.writable_pool()?;

        let result = sqlx::query(
            r#"
            UPDATE expenses
            SET status_id = $1,
                submitted_at = CASE WHEN $1 = 2 AND submitted_at IS NULL THEN NOW() ELSE submitted_at END,
                reviewed_by = $2,
                reviewed_at = CASE WHEN $1 IN (3, 4) THEN NOW() ELSE reviewed_at END
            WHERE expense_id = $3
            "#,
        )
        .bind(status.id())
        .bind(reviewer_id)
        .bind(expense_id)
        .execute(pool)
        .await;

        match result {
            Ok(done) => {
                let updated = done.rows_affected() > 0;
                if updated {
                    info!("Expense {} moved to {}", expense_id, status.name());
                }
                Ok(updated)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                Err(AppError::BadRequest("Unknown reviewer".to_string()))
            }
            Err(e) => {
                self.record_error("Could not update the expense status.");
                Err(e.into())
            }
        }
    }

    pub async fn get_categories(&self) -> Vec<ExpenseCategory> {
        let Some(pool) = self.live_pool() else {
            return fixtures::categories();
        };

        match sqlx::query_as::<_, ExpenseCategory>(
            "SELECT category_id AS id, category_name AS name, is_active FROM expense_categories WHERE is_active = true ORDER BY category_name",
        )
        .fetch_all(pool)
        .await
        {
            Ok(categories) => categories,
            Err(e) => {
                error!("Error retrieving categories: {}", e);
                self.enter_fallback("Could not load categories from the database; showing sample data.");
                fixtures::categories()
            }
        }
    }

    pub async fn get_user(&self, user_id: i32) -> Option<User> {
        let Some(pool) = self.live_pool() else {
            return fixtures::user(user_id);
        };

        match sqlx::query_as::<_, User>(
            "SELECT user_id AS id, user_name, email, role_id, manager_id, is_active, created_at FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        {
            Ok(user) => user,
            Err(e) => {
                error!("Error retrieving user {}: {}", user_id, e);
                self.enter_fallback("Could not load users from the database; showing sample data.");
                fixtures::user(user_id)
            }
        }
    }
}
