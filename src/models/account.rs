//! Bank account domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Bank account owned by a single user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub account_type: String, // checking, savings, credit_card, mortgage, line_of_credit
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Name with the bank appended when known
    pub fn display_name(&self) -> String {
        match &self.bank_name {
            Some(bank) => format!("{} ({})", self.name, bank),
            None => self.name.clone(),
        }
    }

    /// Only the last four digits are ever shown
    pub fn masked_account_number(&self) -> String {
        match &self.account_number {
            None => String::new(),
            Some(number) => {
                let chars: Vec<char> = number.chars().collect();
                if chars.len() <= 4 {
                    number.clone()
                } else {
                    let tail: String = chars[chars.len() - 4..].iter().collect();
                    format!("****{}", tail)
                }
            }
        }
    }
}

/// Account type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Checking,
    Savings,
    CreditCard,
    Mortgage,
    LineOfCredit,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Checking,
        AccountType::Savings,
        AccountType::CreditCard,
        AccountType::Mortgage,
        AccountType::LineOfCredit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::CreditCard => "credit_card",
            AccountType::Mortgage => "mortgage",
            AccountType::LineOfCredit => "line_of_credit",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccountType::Checking => "Checking Account",
            AccountType::Savings => "Savings Account",
            AccountType::CreditCard => "Credit Card",
            AccountType::Mortgage => "Mortgage",
            AccountType::LineOfCredit => "Line of Credit",
        }
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown account type: {}", s))
    }
}

/// Create account request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
    pub account_type: AccountType,
    #[validate(length(max = 255, message = "bank_name must be at most 255 characters"))]
    pub bank_name: Option<String>,
    #[validate(length(max = 50, message = "account_number must be at most 50 characters"))]
    pub account_number: Option<String>,
    pub description: Option<String>,
}

/// Update account request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    #[validate(length(max = 255, message = "bank_name must be at most 255 characters"))]
    pub bank_name: Option<String>,
    #[validate(length(max = 50, message = "account_number must be at most 50 characters"))]
    pub account_number: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// List query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct AccountQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub account_type: Option<AccountType>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

fn default_limit() -> i64 {
    100
}

impl Default for AccountQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
            account_type: None,
            is_active: None,
            search: None,
        }
    }
}

/// Store-level filter, always scoped to a single owner
#[derive(Debug, Clone)]
pub struct AccountFilter {
    pub owner_id: i64,
    pub account_type: Option<AccountType>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

impl AccountFilter {
    pub fn for_owner(owner_id: i64, query: &AccountQuery) -> Self {
        Self {
            owner_id,
            account_type: query.account_type,
            is_active: query.is_active,
            search: query
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            skip: query.skip.max(0),
            limit: query.limit.clamp(1, 500),
        }
    }

    /// In-memory equivalent of the SQL WHERE clause
    pub fn matches(&self, account: &Account) -> bool {
        if account.user_id != self.owner_id {
            return false;
        }
        if let Some(t) = self.account_type {
            if account.account_type != t.as_str() {
                return false;
            }
        }
        if let Some(active) = self.is_active {
            if account.is_active != active {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&term));
            if !hit(Some(&account.name))
                && !hit(account.bank_name.as_deref())
                && !hit(account.description.as_deref())
            {
                return false;
            }
        }
        true
    }
}

/// Account response (safe fields only)
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: i64,
    pub name: String,
    pub account_type: String,
    pub bank_name: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub masked_account_number: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            masked_account_number: account.masked_account_number(),
            display_name: account.display_name(),
            id: account.id,
            name: account.name,
            account_type: account.account_type,
            bank_name: account.bank_name,
            description: account.description,
            is_active: account.is_active,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Paged account list
#[derive(Debug, Serialize)]
pub struct AccountListResponse {
    pub accounts: Vec<AccountResponse>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

/// Entry of the account-type catalogue
#[derive(Debug, Serialize)]
pub struct AccountTypeInfo {
    pub value: &'static str,
    pub label: &'static str,
}
