//! Application state for HTTP handlers.

use std::sync::Arc;

use bookhive_server::auth::TokenError;
use bookhive_server::handlers::{
    AccountHandler, AccountLocks, CartHandler, CatalogHandler, OrderHandler, ProposalHandler,
    PublisherHandler,
};
use bookhive_server::{Authenticator, PasswordHasher, ServerConfig, TokenIssuer};
use bookhive_storage::DataStore;

use crate::errors::ErrorConfig;

/// Application state shared across all HTTP handlers.
///
/// Every service handler shares one store and one [`AccountLocks`] map, so
/// the per-account serialization holds across routes: a cart add and an
/// order placement for the same account never interleave.
pub struct AppState<S: DataStore> {
    /// The storage backend.
    pub storage: Arc<S>,
    /// First gate stage: bearer token to principal.
    pub authenticator: Authenticator<S>,
    pub accounts: Arc<AccountHandler<S>>,
    pub cart: Arc<CartHandler<S>>,
    pub catalog: Arc<CatalogHandler<S>>,
    pub orders: Arc<OrderHandler<S>>,
    pub proposals: Arc<ProposalHandler<S>>,
    pub publisher: Arc<PublisherHandler<S>>,
    /// Detail level of client-facing error messages.
    pub errors: ErrorConfig,
    /// Gated routes trust the token's role instead of re-reading the account.
    pub trust_token_role: bool,
}

impl<S: DataStore> AppState<S> {
    /// Creates state with production error messages and account re-reads.
    pub fn new(storage: Arc<S>, tokens: TokenIssuer, hasher: PasswordHasher) -> Self {
        let locks = Arc::new(AccountLocks::new());
        Self {
            authenticator: Authenticator::new(Arc::clone(&storage), tokens.clone()),
            accounts: Arc::new(AccountHandler::new(
                Arc::clone(&storage),
                Arc::clone(&locks),
                hasher,
                tokens,
            )),
            cart: Arc::new(CartHandler::new(Arc::clone(&storage), Arc::clone(&locks))),
            catalog: Arc::new(CatalogHandler::new(Arc::clone(&storage), Arc::clone(&locks))),
            orders: Arc::new(OrderHandler::new(Arc::clone(&storage), Arc::clone(&locks))),
            proposals: Arc::new(ProposalHandler::new(Arc::clone(&storage))),
            publisher: Arc::new(PublisherHandler::new(Arc::clone(&storage), Arc::clone(&locks))),
            storage,
            errors: ErrorConfig::production(),
            trust_token_role: false,
        }
    }

    /// Creates state from the loaded server configuration.
    pub fn from_config(storage: Arc<S>, config: &ServerConfig) -> Result<Self, TokenError> {
        let tokens = TokenIssuer::new(config.auth.jwt_secret.as_bytes(), config.auth.token_ttl_secs)?;
        let hasher = PasswordHasher::new(config.auth.bcrypt_cost);
        let errors = ErrorConfig {
            detailed_errors: config.errors.detailed,
        };
        Ok(Self::new(storage, tokens, hasher)
            .with_error_config(errors)
            .with_trust_token_role(config.auth.trust_token_role))
    }

    pub fn with_error_config(mut self, errors: ErrorConfig) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_trust_token_role(mut self, trust: bool) -> Self {
        self.trust_token_role = trust;
        self
    }
}
