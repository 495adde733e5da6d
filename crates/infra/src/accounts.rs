//! User accounts: registration creates the user and its cart together.

use std::sync::Arc;

use tracing::{info, instrument};

use storefront_core::{DomainError, DomainResult, UserId};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{Storage, StoreError, StoreTx};
use crate::unit_of_work::transactional;

const MAX_USERNAME_LEN: usize = 50;
const MAX_EMAIL_LEN: usize = 255;

/// A validated registration request.
///
/// `password_hash` is stored as given; producing it is the caller's job.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    username: String,
    email: String,
    password_hash: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> DomainResult<Self> {
        let username = username.into().trim().to_string();
        let email = email.into().trim().to_string();
        if username.is_empty() {
            return Err(DomainError::invalid("username must not be empty"));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(DomainError::invalid(format!(
                "username must be at most {MAX_USERNAME_LEN} characters"
            )));
        }
        if email.is_empty() {
            return Err(DomainError::invalid("email must not be empty"));
        }
        if email.chars().count() > MAX_EMAIL_LEN {
            return Err(DomainError::invalid(format!(
                "email must be at most {MAX_EMAIL_LEN} characters"
            )));
        }
        Ok(Self {
            username,
            email,
            password_hash: password_hash.into(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

impl core::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Account registration service.
#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn Storage>,
}

impl Accounts {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Insert the user and its cart in one transaction.
    #[instrument(skip(self), fields(username = %user.username()), err(level = "warn"))]
    pub async fn create_user(&self, user: NewUser) -> ServiceResult<UserId> {
        let user_id = transactional(&*self.store, "create_user", move |tx| {
            Box::pin(async move { insert_account(tx, &user).await })
        })
        .await?;

        info!(user_id = %user_id, "user registered");
        Ok(user_id)
    }
}

async fn insert_account(tx: &mut dyn StoreTx, user: &NewUser) -> ServiceResult<UserId> {
    let user_id = tx.insert_user(user).await.map_err(|err| match err {
        StoreError::UniqueViolation(_) => {
            ServiceError::from(DomainError::invalid("username or email already registered"))
        }
        other => ServiceError::from(other),
    })?;
    tx.insert_cart(user_id).await?;
    Ok(user_id)
}
