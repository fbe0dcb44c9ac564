//! In-process store backing both [`UserStore`] and [`AccountStore`].
//!
//! Used by the HTTP tests and for running the service without a database.
//! Every method takes the lock once, so each operation is atomic in the same
//! way the single-statement SQL versions are.

use super::{AccountStore, UserStore, EMAIL_TAKEN};
use crate::{
    db::HealthStatus,
    error::AppError,
    models::{
        account::{Account, AccountFilter, CreateAccountRequest, UpdateAccountRequest},
        user::{normalize_email, NewUser, UpdateProfileRequest, User},
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    accounts: BTreeMap<i64, Account>,
    next_user_id: i64,
    next_account_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Grant or revoke the superuser flag; there is no HTTP route for this
    pub fn set_superuser(&self, id: i64, is_superuser: bool) -> bool {
        match self.lock().users.get_mut(&id) {
            Some(user) => {
                user.is_superuser = is_superuser;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = normalize_email(email);
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.password_reset_token.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn create(&self, new_user: &NewUser) -> Result<User, AppError> {
        let mut tables = self.lock();
        let email = normalize_email(&new_user.email);
        if tables.email_taken(&email, None) {
            return Err(AppError::Validation(EMAIL_TAKEN.to_string()));
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: tables.next_user_id,
            email,
            password_hash: new_user.password_hash.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
            is_active: true,
            is_superuser: false,
            password_reset_token: None,
            password_reset_expires: None,
            timezone: "UTC".to_string(),
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: &UpdateProfileRequest,
    ) -> Result<Option<User>, AppError> {
        let mut tables = self.lock();
        let email = changes.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            if tables.email_taken(email, Some(id)) {
                return Err(AppError::Validation(EMAIL_TAKEN.to_string()));
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(first_name) = &changes.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &changes.last_name {
            user.last_name = last_name.clone();
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, AppError> {
        let mut tables = self.lock();
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_reset_token(
        &self,
        id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if let Some(user) = self.lock().users.get_mut(&id) {
            user.password_reset_token = Some(token_hash.to_string());
            user.password_reset_expires = Some(expires_at);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn consume_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tables = self.lock();
        let user = tables.users.values_mut().find(|u| {
            u.password_reset_token.as_deref() == Some(token_hash)
                && u.password_reset_expires.is_some_and(|exp| exp > now)
        });

        match user {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.password_reset_token = None;
                user.password_reset_expires = None;
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_last_login(&self, id: i64) -> Result<(), AppError> {
        if let Some(user) = self.lock().users.get_mut(&id) {
            let now = Utc::now();
            user.last_login = Some(now);
            user.updated_at = now;
        }
        Ok(())
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<Option<User>, AppError> {
        let mut tables = self.lock();
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        user.is_active = active;
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus::Healthy
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create(&self, owner_id: i64, req: &CreateAccountRequest) -> Result<Account, AppError> {
        let mut tables = self.lock();
        tables.next_account_id += 1;
        let now = Utc::now();
        let account = Account {
            id: tables.next_account_id,
            user_id: owner_id,
            name: req.name.clone(),
            account_type: req.account_type.as_str().to_string(),
            bank_name: req.bank_name.clone(),
            account_number: req.account_number.clone(),
            description: req.description.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, AppError> {
        Ok(self.lock().accounts.get(&id).cloned())
    }

    async fn find_active_by_name(
        &self,
        owner_id: i64,
        name: &str,
    ) -> Result<Option<Account>, AppError> {
        Ok(self
            .lock()
            .accounts
            .values()
            .find(|a| a.user_id == owner_id && a.name == name && a.is_active)
            .cloned())
    }

    async fn list(&self, filter: &AccountFilter) -> Result<Vec<Account>, AppError> {
        let tables = self.lock();
        let mut accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(accounts
            .into_iter()
            .skip(filter.skip as usize)
            .take(filter.limit as usize)
            .collect())
    }

    async fn count(&self, filter: &AccountFilter) -> Result<i64, AppError> {
        let tables = self.lock();
        Ok(tables.accounts.values().filter(|a| filter.matches(a)).count() as i64)
    }

    async fn update(
        &self,
        id: i64,
        changes: &UpdateAccountRequest,
    ) -> Result<Option<Account>, AppError> {
        let mut tables = self.lock();
        let Some(account) = tables.accounts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            account.name = name.clone();
        }
        if let Some(account_type) = changes.account_type {
            account.account_type = account_type.as_str().to_string();
        }
        if let Some(bank_name) = &changes.bank_name {
            account.bank_name = Some(bank_name.clone());
        }
        if let Some(account_number) = &changes.account_number {
            account.account_number = Some(account_number.clone());
        }
        if let Some(description) = &changes.description {
            account.description = Some(description.clone());
        }
        if let Some(is_active) = changes.is_active {
            account.is_active = is_active;
        }
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }

    async fn deactivate(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.lock();
        let Some(account) = tables.accounts.get_mut(&id) else {
            return Ok(false);
        };
        account.is_active = false;
        account.updated_at = Utc::now();
        Ok(true)
    }
}
