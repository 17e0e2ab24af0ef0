//! Identity: sign-up, login, self profile and account administration.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use bookhive_domain::model::normalize_email;
use bookhive_domain::catalog::MyBooksScope;
use bookhive_domain::{Account, Book, DomainError, Principal, Role};
use bookhive_storage::{AccountFilter, AccountPatch, BookFilter, DataStore, StorageError};

use super::views::{render_books, AccountSummary, BookView};
use super::{required, AccountLocks, ServiceError, ServiceResult};
use crate::auth::{PasswordHasher, TokenIssuer};

const DUPLICATE_EMAIL: &str = "User already exists";
const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Admin edit of an account. Passwords are not editable here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
    pub logo_url: Option<String>,
    pub awards: Option<Vec<String>>,
}

/// A freshly issued token and who it was issued to.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: AccountSummary,
}

/// Handles identity and account administration.
pub struct AccountHandler<S> {
    store: Arc<S>,
    locks: Arc<AccountLocks>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl<S: DataStore> AccountHandler<S> {
    pub fn new(
        store: Arc<S>,
        locks: Arc<AccountLocks>,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            store,
            locks,
            hasher,
            tokens,
        }
    }

    fn session(&self, account: &Account) -> ServiceResult<AuthSession> {
        Ok(AuthSession {
            token: self.tokens.issue(&account.id, account.role)?,
            user: AccountSummary::from(account),
        })
    }

    async fn register(
        &self,
        name: String,
        email: String,
        password: String,
        role: Role,
    ) -> ServiceResult<Account> {
        let email = normalize_email(&email);
        if !email.contains('@') {
            return Err(DomainError::validation(format!("invalid email: {email}")).into());
        }
        if self.store.find_account_by_email(&email).await?.is_some() {
            return Err(DomainError::validation(DUPLICATE_EMAIL).into());
        }

        let hash = self.hasher.hash_async(password).await?;
        let account = Account::new(name, &email, hash, role);
        let account = self
            .store
            .create_account(account)
            .await
            .map_err(|e| match e {
                StorageError::DuplicateEmail { .. } => {
                    ServiceError::from(DomainError::validation(DUPLICATE_EMAIL))
                }
                other => ServiceError::from(other),
            })?;
        info!(account_id = %account.id, role = %account.role, "account registered");
        Ok(account)
    }

    /// Creates an account with any of the four roles (default `user`).
    #[instrument(skip_all)]
    pub async fn signup(&self, request: SignupRequest) -> ServiceResult<AuthSession> {
        let name = required(request.name.as_deref(), "name")?;
        let email = required(request.email.as_deref(), "email")?;
        let password = required(request.password.as_deref(), "password")?;
        let role = match request.role.as_deref().map(str::trim) {
            Some(role) if !role.is_empty() => role.parse::<Role>()?,
            _ => Role::User,
        };

        let account = self.register(name, email, password, role).await?;
        self.session(&account)
    }

    #[instrument(skip_all)]
    pub async fn login(&self, credentials: Credentials) -> ServiceResult<AuthSession> {
        let email = required(credentials.email.as_deref(), "email")?;
        let password = required(credentials.password.as_deref(), "password")?;

        let Some(account) = self.store.find_account_by_email(&email).await? else {
            return Err(DomainError::validation(BAD_CREDENTIALS).into());
        };
        if !self
            .hasher
            .verify_async(password, account.password_hash.clone())
            .await?
        {
            warn!(account_id = %account.id, "login failed: wrong password");
            return Err(DomainError::validation(BAD_CREDENTIALS).into());
        }
        self.session(&account)
    }

    /// Author self-registration: always creates an `author` account.
    #[instrument(skip_all)]
    pub async fn register_author(&self, request: SignupRequest) -> ServiceResult<AuthSession> {
        let name = required(request.name.as_deref(), "name")?;
        let email = required(request.email.as_deref(), "email")?;
        let password = required(request.password.as_deref(), "password")?;

        let account = self.register(name, email, password, Role::Author).await?;
        self.session(&account)
    }

    /// Author login: only `author` accounts match.
    #[instrument(skip_all)]
    pub async fn login_author(&self, credentials: Credentials) -> ServiceResult<AuthSession> {
        let email = required(credentials.email.as_deref(), "email")?;
        let password = required(credentials.password.as_deref(), "password")?;

        let account = self
            .store
            .find_account_by_email(&email)
            .await?
            .filter(|a| a.role == Role::Author)
            .ok_or_else(|| DomainError::not_found("author", normalize_email(&email)))?;
        if !self
            .hasher
            .verify_async(password, account.password_hash.clone())
            .await?
        {
            warn!(account_id = %account.id, "author login failed: wrong password");
            return Err(DomainError::unauthenticated("invalid credentials").into());
        }
        self.session(&account)
    }

    /// The caller's account, with cart and wishlist entries for deleted
    /// books dropped. The cleanup is persisted.
    #[instrument(skip_all, fields(account_id = %principal.id))]
    pub async fn me(&self, principal: &Principal) -> ServiceResult<Account> {
        let _guard = self.locks.lock(&principal.id).await;
        let mut account = self.load(&principal.id).await?;

        let mut ids: Vec<String> = account.cart.iter().map(|line| line.book.clone()).collect();
        ids.extend(account.wishlist.iter().cloned());
        let existing: HashSet<String> = self
            .store
            .find_books(&ids)
            .await?
            .into_iter()
            .map(|b| b.id)
            .collect();

        let dropped = account.prune_cart(|id| existing.contains(id))
            + account.prune_wishlist(|id| existing.contains(id));
        if dropped > 0 {
            self.store.save_account_collections(&account).await?;
            info!(account_id = %account.id, dropped, "pruned references to deleted books");
        }
        Ok(account)
    }

    /// An author's profile with the books they wrote.
    pub async fn author_profile(&self, principal: &Principal) -> ServiceResult<(Account, Vec<BookView>)> {
        let account = self.load(&principal.id).await?;
        let filter = BookFilter {
            scope: Some(MyBooksScope::for_principal(principal)?),
            ..Default::default()
        };
        let books: Vec<Book> = self.store.list_books(&filter).await?;
        let books = render_books(self.store.as_ref(), books).await?;
        Ok((account, books))
    }

    pub async fn list_accounts(&self) -> ServiceResult<Vec<Account>> {
        Ok(self.store.list_accounts(&AccountFilter::default()).await?)
    }

    pub async fn get_account(&self, id: &str) -> ServiceResult<Account> {
        self.load(id).await
    }

    /// Sets an account's role with a targeted field update.
    #[instrument(skip(self))]
    pub async fn set_role(&self, id: &str, role: &str) -> ServiceResult<Account> {
        let role = role.parse::<Role>()?;
        let _guard = self.locks.lock(id).await;
        let account = self
            .store
            .update_account_fields(id, &AccountPatch::role(role))
            .await?
            .ok_or_else(|| DomainError::not_found("account", id))?;
        info!(account_id = %id, role = %role, "role updated");
        Ok(account)
    }

    #[instrument(skip(self, update))]
    pub async fn update_account(&self, id: &str, update: AccountUpdate) -> ServiceResult<Account> {
        let patch = AccountPatch {
            name: update.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            email: update.email,
            role: update.role.as_deref().map(str::parse::<Role>).transpose()?,
            bio: update.bio,
            logo_url: update.logo_url,
            awards: update.awards,
        };
        if patch.is_empty() {
            return Err(DomainError::validation("no fields to update").into());
        }
        let _guard = self.locks.lock(id).await;
        let account = self
            .store
            .update_account_fields(id, &patch)
            .await
            .map_err(|e| match e {
                StorageError::DuplicateEmail { .. } => {
                    ServiceError::from(DomainError::validation(DUPLICATE_EMAIL))
                }
                other => ServiceError::from(other),
            })?
            .ok_or_else(|| DomainError::not_found("account", id))?;
        if let Some(name) = &patch.name {
            if account.role == Role::Publisher {
                self.store.rename_publisher(id, name).await?;
            }
        }
        Ok(account)
    }

    /// Deletes an account. Orders, reviews and proposals it made are kept.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, id: &str) -> ServiceResult<Account> {
        let account = self
            .store
            .delete_account(id)
            .await?
            .ok_or_else(|| DomainError::not_found("account", id))?;
        info!(account_id = %id, "account deleted");
        Ok(account)
    }

    /// Creates the configured admin unless the email is already taken.
    /// Returns whether an account was created.
    pub async fn bootstrap_admin(&self, name: &str, email: &str, password: &str) -> ServiceResult<bool> {
        if self.store.find_account_by_email(email).await?.is_some() {
            return Ok(false);
        }
        self.register(
            name.to_string(),
            email.to_string(),
            password.to_string(),
            Role::Admin,
        )
        .await?;
        Ok(true)
    }

    async fn load(&self, id: &str) -> ServiceResult<Account> {
        Ok(self
            .store
            .find_account(id)
            .await?
            .ok_or_else(|| DomainError::not_found("account", id))?)
    }
}
