//! Authorization gate: authenticate, resolve the principal, enforce roles.

use std::sync::Arc;

use tracing::{debug, instrument};

use bookhive_domain::{DomainError, DomainResult, Principal, Role};
use bookhive_storage::DataStore;

use super::token::{Claims, TokenIssuer};
use crate::handlers::ServiceResult;

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> DomainResult<&str> {
    let header = header.ok_or_else(|| DomainError::unauthenticated("no token provided"))?;
    let malformed = || DomainError::unauthenticated("malformed authorization header");
    let (scheme, token) = header.trim().split_once(' ').ok_or_else(malformed)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(malformed());
    }
    Ok(token)
}

/// Second gate stage: the principal's role must be one of `allowed`.
pub fn require_roles(principal: &Principal, allowed: &[Role]) -> DomainResult<()> {
    if principal.has_any_role(allowed) {
        return Ok(());
    }
    let allowed = allowed
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(DomainError::forbidden(format!(
        "Access denied. Allowed roles: {allowed}"
    )))
}

/// First gate stage: turns a bearer credential into a [`Principal`].
pub struct Authenticator<S> {
    store: Arc<S>,
    tokens: TokenIssuer,
}

impl<S> Clone for Authenticator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tokens: self.tokens.clone(),
        }
    }
}

impl<S: DataStore> Authenticator<S> {
    pub fn new(store: Arc<S>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Checks the bearer token's signature and expiry and returns its
    /// claims. No account is read.
    pub fn verify_header(&self, header: Option<&str>) -> DomainResult<Claims> {
        let token = bearer_token(header)?;
        self.tokens.verify(token).map_err(|e| {
            debug!(error = %e, "token rejected");
            DomainError::unauthenticated("Not authorized, token failed")
        })
    }

    /// Authenticates a request's `Authorization` header.
    ///
    /// With `trust_token_role = false` (the canonical path) the account is
    /// re-read so the role is current and deleted accounts are rejected.
    /// With `true` the token's claims are used as-is; the role may be stale
    /// and the principal carries no name or email.
    #[instrument(skip(self, header))]
    pub async fn authenticate(
        &self,
        header: Option<&str>,
        trust_token_role: bool,
    ) -> ServiceResult<Principal> {
        let claims = self.verify_header(header)?;
        if trust_token_role {
            return Ok(Principal::new(claims.sub, String::new(), claims.role));
        }

        let account = self
            .store
            .find_account(&claims.sub)
            .await?
            .ok_or_else(|| DomainError::unauthenticated("account no longer exists"))?;
        Ok(Principal::from(&account))
    }
}
