use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::error::AppError;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Accounts {
    next_id: i64,
    by_id: HashMap<i64, Account>,
}

/// Account storage shared by all handlers. Lives for the process lifetime.
#[derive(Clone, Default)]
pub struct AccountStore {
    inner: Arc<RwLock<Accounts>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new account. Email and username are unique, case-insensitively.
    pub fn create_account(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, AppError> {
        let mut accounts = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if accounts
            .by_id
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(email))
        {
            return Err(AppError::BadRequest("Email already registered".into()));
        }
        if accounts
            .by_id
            .values()
            .any(|a| a.username.eq_ignore_ascii_case(username))
        {
            return Err(AppError::BadRequest("Username already taken".into()));
        }

        accounts.next_id += 1;
        let account = Account {
            id: accounts.next_id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            display_name: Some(username.to_string()),
            created_at: Utc::now(),
        };
        accounts.by_id.insert(account.id, account.clone());
        Ok(account)
    }

    pub fn get_account_by_id(&self, id: i64) -> Option<Account> {
        let accounts = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        accounts.by_id.get(&id).cloned()
    }

    pub fn get_account_by_email(&self, email: &str) -> Option<Account> {
        let accounts = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        accounts
            .by_id
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned()
    }
}
