//! Account repository

use super::AccountStore;
use crate::{error::AppError, models::account::*};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

pub struct AccountRepository {
    db: PgPool,
}

impl AccountRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Shared WHERE clause for list/count; $1 owner, $2 type, $3 active, $4 search pattern
const FILTER_CLAUSE: &str = r#"
    WHERE user_id = $1
      AND ($2::text IS NULL OR account_type = $2)
      AND ($3::boolean IS NULL OR is_active = $3)
      AND ($4::text IS NULL
           OR name ILIKE $4 ESCAPE '\'
           OR bank_name ILIKE $4 ESCAPE '\'
           OR description ILIKE $4 ESCAPE '\')
"#;

/// 搜索词按字面匹配：转义 LIKE 通配符
fn search_pattern(filter: &AccountFilter) -> Option<String> {
    filter.search.as_ref().map(|term| {
        let mut escaped = String::with_capacity(term.len() + 2);
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        format!("%{}%", escaped)
    })
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn create(&self, owner_id: i64, req: &CreateAccountRequest) -> Result<Account, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (user_id, name, account_type, bank_name, account_number, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(&req.name)
        .bind(req.account_type.as_str())
        .bind(&req.bank_name)
        .bind(&req.account_number)
        .bind(&req.description)
        .fetch_one(&self.db)
        .await?;

        Ok(account)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(account)
    }

    async fn find_active_by_name(
        &self,
        owner_id: i64,
        name: &str,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE user_id = $1 AND name = $2 AND is_active = TRUE LIMIT 1",
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    async fn list(&self, filter: &AccountFilter) -> Result<Vec<Account>, AppError> {
        let sql = format!(
            "SELECT * FROM accounts {} ORDER BY name, id LIMIT $5 OFFSET $6",
            FILTER_CLAUSE
        );

        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(filter.owner_id)
            .bind(filter.account_type.map(|t| t.as_str()))
            .bind(filter.is_active)
            .bind(search_pattern(filter))
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&self.db)
            .await?;

        Ok(accounts)
    }

    async fn count(&self, filter: &AccountFilter) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM accounts {}", FILTER_CLAUSE);

        let count: i64 = sqlx::query(&sql)
            .bind(filter.owner_id)
            .bind(filter.account_type.map(|t| t.as_str()))
            .bind(filter.is_active)
            .bind(search_pattern(filter))
            .fetch_one(&self.db)
            .await?
            .get(0);

        Ok(count)
    }

    async fn update(
        &self,
        id: i64,
        changes: &UpdateAccountRequest,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET
                name = COALESCE($2, name),
                account_type = COALESCE($3, account_type),
                bank_name = COALESCE($4, bank_name),
                account_number = COALESCE($5, account_number),
                description = COALESCE($6, description),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(changes.account_type.map(|t| t.as_str()))
        .bind(&changes.bank_name)
        .bind(&changes.account_number)
        .bind(&changes.description)
        .bind(changes.is_active)
        .fetch_optional(&self.db)
        .await?;

        Ok(account)
    }

    async fn deactivate(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE accounts SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
