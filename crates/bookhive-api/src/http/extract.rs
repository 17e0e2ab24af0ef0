//! Authorization gate extractors.
//!
//! [`Authenticated`] runs the first gate stage (bearer token to principal).
//! [`Authorized`] adds the role stage for a fixed [`RoleSet`]. Both reject
//! before the handler body runs, so a denied request never reaches the
//! store beyond the account lookup.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use tracing::warn;

use bookhive_domain::{DomainError, Principal, Role};
use bookhive_server::auth::require_roles;
use bookhive_server::ServiceError;
use bookhive_storage::DataStore;

use super::routes::ApiError;
use super::state::AppState;
use crate::observability::record_auth_rejection;

/// The roles a route admits.
pub trait RoleSet: Send + Sync + 'static {
    const ALLOWED: &'static [Role];
}

pub struct AdminOnly;
pub struct AuthorOnly;
pub struct PublisherOnly;
pub struct PublisherOrAdmin;
/// Roles that may create books.
pub struct Contributors;

impl RoleSet for AdminOnly {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

impl RoleSet for AuthorOnly {
    const ALLOWED: &'static [Role] = &[Role::Author];
}

impl RoleSet for PublisherOnly {
    const ALLOWED: &'static [Role] = &[Role::Publisher];
}

impl RoleSet for PublisherOrAdmin {
    const ALLOWED: &'static [Role] = &[Role::Publisher, Role::Admin];
}

impl RoleSet for Contributors {
    const ALLOWED: &'static [Role] = &[Role::Author, Role::Publisher, Role::Admin];
}

/// Any authenticated principal.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

/// An authenticated principal whose role is in `R`.
pub struct Authorized<R>(pub Principal, pub PhantomData<R>);

pub(crate) fn authorization_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

#[async_trait]
impl<S: DataStore> FromRequestParts<Arc<AppState<S>>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = authorization_header(parts);
        match state
            .authenticator
            .authenticate(header, state.trust_token_role)
            .await
        {
            Ok(principal) => Ok(Self(principal)),
            Err(err) => {
                if matches!(err, ServiceError::Domain(DomainError::Unauthenticated { .. })) {
                    record_auth_rejection("unauthenticated");
                }
                Err(ApiError::from_service(&err, &state.errors))
            }
        }
    }
}

#[async_trait]
impl<S: DataStore, R: RoleSet> FromRequestParts<Arc<AppState<S>>> for Authorized<R> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated(principal) = Authenticated::from_request_parts(parts, state).await?;

        if let Err(err) = require_roles(&principal, R::ALLOWED) {
            warn!(
                principal_id = %principal.id,
                role = %principal.role,
                path = %parts.uri.path(),
                "role gate denied request"
            );
            record_auth_rejection("forbidden");
            return Err(ApiError::from_service(&ServiceError::from(err), &state.errors));
        }

        Ok(Self(principal, PhantomData))
    }
}
