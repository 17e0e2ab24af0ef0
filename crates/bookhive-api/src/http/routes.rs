//! HTTP route handlers and router construction.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use bookhive_domain::{BookStatus, DomainError, Principal};
use bookhive_server::handlers::{
    AccountSummary, AccountUpdate, AddToCart, BookUpdate, Credentials, NewBook, NewProposal,
    PlaceOrder, OrderUpdate, ProfileUpdate, SignupRequest,
};
use bookhive_server::{ServiceError, ServiceResult};
use bookhive_storage::DataStore;

use super::extract::{
    AdminOnly, Authenticated, Authorized, AuthorOnly, Contributors,
    PublisherOnly, PublisherOrAdmin,
};
use super::state::AppState;
use crate::errors::{classify_service_error_with_config, ErrorConfig, ErrorKind};
use crate::observability::{
    metrics_handler, record_login_failure, record_order_placed, record_signup, MetricsState,
};

/// JSON extractor that rejects malformed bodies with 400 instead of 422.
///
/// Body limit rejections keep their 413 status.
pub struct JsonBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBadRequest(value)),
            Err(rejection) => {
                let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    StatusCode::PAYLOAD_TOO_LARGE
                } else {
                    StatusCode::BAD_REQUEST
                };

                let message = rejection.body_text();
                let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    ApiError::new(error_codes::PAYLOAD_TOO_LARGE, message)
                } else {
                    ApiError::validation_error(message)
                };

                Err((status, Json(error)))
            }
        }
    }
}

/// Default request body size limit (1MB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// All `/api` routes.
fn api_routes<S: DataStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        // Identity
        .route("/api/auth/signup", post(signup::<S>))
        .route("/api/auth/login", post(login::<S>))
        .route("/api/auth/session", get(session::<S>))
        .route("/api/auth/setrole", put(set_role_by_body::<S>))
        .route("/api/auth/admin/users", get(list_accounts::<S>))
        .route(
            "/api/auth/admin/users/:id",
            get(get_account::<S>)
                .put(update_account::<S>)
                .delete(delete_account::<S>),
        )
        .route("/api/authors-auth/register", post(register_author::<S>))
        .route("/api/authors-auth/login", post(login_author::<S>))
        // Author dashboard
        .route("/api/authors/me", get(author_profile::<S>))
        .route(
            "/api/authors/books",
            get(author_books::<S>).post(create_authored_book::<S>),
        )
        .route(
            "/api/authors/books/:book_id",
            put(author_update_book::<S>).delete(author_delete_book::<S>),
        )
        // Catalog
        .route("/api/books", get(list_books::<S>).post(create_book::<S>))
        .route("/api/books/my-books", get(my_books::<S>))
        .route("/api/books/author/:author_id", get(books_by_author::<S>))
        .route("/api/books/category/:category", get(books_by_category::<S>))
        .route("/api/books/admin/all", get(admin_list_books::<S>))
        .route(
            "/api/books/admin/:id",
            put(admin_update_book::<S>).delete(admin_delete_book::<S>),
        )
        .route("/api/books/approve/:id", put(approve_book::<S>))
        .route("/api/books/reject/:id", put(reject_book::<S>))
        .route(
            "/api/books/:id",
            get(get_book::<S>)
                .put(update_book::<S>)
                .delete(delete_book::<S>),
        )
        .route("/api/books/:id/review", post(add_review::<S>))
        .route(
            "/api/books/:id/review/:review_id",
            axum::routing::delete(delete_review::<S>),
        )
        // Cart
        .route("/api/cart", get(get_cart::<S>).post(add_to_cart::<S>))
        .route(
            "/api/cart/:book_id",
            axum::routing::patch(set_cart_quantity::<S>).delete(remove_from_cart::<S>),
        )
        // Orders
        .route("/api/orders", post(place_order::<S>))
        .route("/api/orders/my-orders", get(my_orders::<S>))
        .route("/api/orders/admin/all", get(list_orders::<S>))
        .route("/api/orders/admin/analytics", get(order_analytics::<S>))
        .route(
            "/api/orders/admin/:id",
            put(update_order::<S>).delete(delete_order::<S>),
        )
        // Proposals
        .route("/api/proposals", post(submit_proposal::<S>))
        .route("/api/proposals/myproposals", get(my_proposals::<S>))
        .route("/api/proposals/:id", put(set_proposal_status::<S>))
        // Publisher dashboard
        .route(
            "/api/publisher/profile",
            get(publisher_profile::<S>).put(update_publisher_profile::<S>),
        )
        .route("/api/publisher/books", get(publisher_books::<S>))
        .route("/api/publisher/books/:id", axum::routing::delete(publisher_delete_book::<S>))
        .route("/api/publisher/books/:id/price", put(publisher_update_price::<S>))
        .route("/api/publisher/proposals", get(publisher_proposals::<S>))
        .route("/api/publisher/proposals/:id/accept", put(accept_proposal::<S>))
        .route("/api/publisher/proposals/:id/reject", put(reject_proposal::<S>))
        .route("/api/publisher/insights", get(publisher_insights::<S>))
        // Account self-service and administration
        .route("/api/users", get(list_accounts::<S>))
        .route("/api/users/me", get(me::<S>))
        .route("/api/users/address", get(addresses::<S>).post(add_address::<S>))
        .route(
            "/api/users/address/:address_id",
            put(edit_address::<S>).delete(delete_address::<S>),
        )
        .route(
            "/api/users/address/:address_id/default",
            put(set_default_address::<S>),
        )
        .route("/api/users/wishlist", get(wishlist::<S>))
        .route(
            "/api/users/wishlist/:book_id",
            post(add_to_wishlist::<S>).delete(remove_from_wishlist::<S>),
        )
        .route(
            "/api/users/cart/:book_id",
            post(add_one_to_cart::<S>).delete(remove_from_cart::<S>),
        )
        .route(
            "/api/users/:id",
            get(get_account::<S>).delete(delete_account::<S>),
        )
        .route("/api/users/:id/role", put(set_role::<S>))
}

/// Creates the HTTP router with the default body limit.
pub fn create_router<S: DataStore>(state: AppState<S>) -> Router {
    create_router_with_body_limit(state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router with a custom body size limit.
pub fn create_router_with_body_limit<S: DataStore>(
    state: AppState<S>,
    body_limit: usize,
) -> Router {
    api_routes::<S>()
        .route("/api/health", get(health_check))
        .route("/ready", get(readiness_check::<S>))
        .with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(body_limit))
}

/// Creates the HTTP router plus `/metrics`.
pub fn create_router_with_observability<S: DataStore>(
    state: AppState<S>,
    metrics_state: MetricsState,
) -> Router {
    create_router_with_observability_and_limit(state, metrics_state, DEFAULT_BODY_LIMIT)
}

/// Creates the HTTP router plus `/metrics` with a custom body size limit.
///
/// The body limit applies to API routes only.
pub fn create_router_with_observability_and_limit<S: DataStore>(
    state: AppState<S>,
    metrics_state: MetricsState,
    body_limit: usize,
) -> Router {
    let api_router = api_routes::<S>()
        .route("/ready", get(readiness_check::<S>))
        .with_state(Arc::new(state))
        .layer(RequestBodyLimitLayer::new(body_limit));

    let observability_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/api/health", get(health_check))
        .with_state(metrics_state);

    api_router.merge(observability_router)
}

// ============================================================
// Error Handling
// ============================================================

/// Error codes carried in the `code` field of every error body.
///
/// Each code maps to one HTTP status in [`ApiError::into_response`].
pub mod error_codes {
    /// 401: no usable credential
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    /// 403: wrong role or not the owner
    pub const FORBIDDEN: &str = "forbidden";
    /// 404
    pub const NOT_FOUND: &str = "not_found";
    /// 400: missing or malformed input
    pub const VALIDATION_ERROR: &str = "validation_error";
    /// 400: conflicts with existing state
    pub const CONFLICT: &str = "conflict";
    /// 413
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    /// 500
    pub const INTERNAL_ERROR: &str = "internal_error";
    /// 503
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";
}

/// JSON error body: `{"code": "...", "message": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::VALIDATION_ERROR, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    /// Converts a service error, logging internal failures in full.
    ///
    /// The client only ever sees the classified message.
    pub fn from_service(err: &ServiceError, config: &ErrorConfig) -> Self {
        let kind = classify_service_error_with_config(err, config);
        if kind.is_internal() {
            error!(error = %err, "request failed");
        }
        match kind {
            ErrorKind::Unauthenticated(m) => Self::new(error_codes::UNAUTHENTICATED, m),
            ErrorKind::Forbidden(m) => Self::new(error_codes::FORBIDDEN, m),
            ErrorKind::NotFound(m) => Self::new(error_codes::NOT_FOUND, m),
            ErrorKind::InvalidInput(m) => Self::validation_error(m),
            ErrorKind::Conflict(m) => Self::new(error_codes::CONFLICT, m),
            ErrorKind::Unavailable(m) => Self::new(error_codes::SERVICE_UNAVAILABLE, m),
            ErrorKind::Internal(m) => Self::internal_error(m),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use error_codes::*;

        let status = match self.code.as_str() {
            UNAUTHENTICATED => StatusCode::UNAUTHORIZED,
            FORBIDDEN => StatusCode::FORBIDDEN,
            NOT_FOUND => StatusCode::NOT_FOUND,
            VALIDATION_ERROR | CONFLICT => StatusCode::BAD_REQUEST,
            PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            SERVICE_UNAVAILABLE => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Converts handler results with the state's error detail level.
trait ServiceResultExt<T> {
    fn or_api(self, config: &ErrorConfig) -> ApiResult<T>;
}

impl<T> ServiceResultExt<T> for ServiceResult<T> {
    fn or_api(self, config: &ErrorConfig) -> ApiResult<T> {
        self.map_err(|e| ApiError::from_service(&e, config))
    }
}

/// Logs an ownership denial with who tried and on what.
fn log_denial<T>(result: ServiceResult<T>, principal: &Principal, resource_id: &str) -> ServiceResult<T> {
    if let Err(ServiceError::Domain(DomainError::Forbidden { .. })) = &result {
        warn!(
            principal_id = %principal.id,
            role = %principal.role,
            resource_id,
            "mutation denied"
        );
    }
    result
}

// ============================================================
// Health and Readiness Checks
// ============================================================

/// Liveness probe; does not touch dependencies.
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Readiness probe: 200 when the store answers, 503 otherwise.
///
/// Failure detail is logged, not returned.
async fn readiness_check<S: DataStore>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    match state.storage.health_check().await {
        Ok(status) if status.healthy => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "checks": { "storage": "ok" } })),
        ),
        Ok(status) => {
            error!(message = ?status.message, "readiness check failed: storage unhealthy");
            not_ready()
        }
        Err(e) => {
            error!(error = %e, "readiness check failed: storage unavailable");
            not_ready()
        }
    }
}

fn not_ready() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "status": "not_ready", "checks": { "storage": "unavailable" } })),
    )
}

// ============================================================
// Identity
// ============================================================

async fn signup<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.accounts.signup(body).await.or_api(&state.errors)?;
    record_signup(session.user.role);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "token": session.token,
            "user": session.user,
        })),
    ))
}

async fn login<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let session = state.accounts.login(body).await.map_err(|e| {
        record_login_failure("user");
        ApiError::from_service(&e, &state.errors)
    })?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": session.token,
        "user": session.user,
    })))
}

async fn register_author<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let session = state.accounts.register_author(body).await.or_api(&state.errors)?;
    record_signup(session.user.role);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Author registered successfully",
            "token": session.token,
            "author": session.user,
        })),
    ))
}

async fn login_author<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    JsonBadRequest(body): JsonBadRequest<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let session = state.accounts.login_author(body).await.map_err(|e| {
        record_login_failure("author");
        ApiError::from_service(&e, &state.errors)
    })?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": session.token,
        "author": session.user,
    })))
}

/// Session probe: echoes the token's own claims without reading the account.
///
/// The role may be stale after a role change; gated routes re-read it.
async fn session<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    headers: axum::http::HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let claims = state
        .authenticator
        .verify_header(header)
        .map_err(ServiceError::from)
        .or_api(&state.errors)?;
    let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    Ok(Json(json!({
        "id": claims.sub,
        "role": claims.role,
        "expiresAt": expires_at,
    })))
}

// ============================================================
// Account administration
// ============================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRoleRequest {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: Option<String>,
}

fn required_role(role: Option<String>) -> ApiResult<String> {
    role.filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::validation_error("missing required field: role"))
}

async fn list_accounts<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
) -> ApiResult<impl IntoResponse> {
    let accounts = state.accounts.list_accounts().await.or_api(&state.errors)?;
    Ok(Json(accounts))
}

async fn get_account<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let account = state.accounts.get_account(&id).await.or_api(&state.errors)?;
    Ok(Json(account))
}

async fn update_account<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
    Path(id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<AccountUpdate>,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .accounts
        .update_account(&id, body)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "User updated", "user": account })))
}

async fn delete_account<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(admin, _): Authorized<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let account = state.accounts.delete_account(&id).await.or_api(&state.errors)?;
    info!(account_id = %account.id, by = %admin.id, "account removed by admin");
    Ok(Json(json!({
        "message": "User deleted",
        "user": AccountSummary::from(&account),
    })))
}

async fn set_role<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
    Path(id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<RoleBody>,
) -> ApiResult<impl IntoResponse> {
    let role = required_role(body.role)?;
    let account = state
        .accounts
        .set_role(&id, &role)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Role updated", "user": account })))
}

async fn set_role_by_body<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
    JsonBadRequest(body): JsonBadRequest<SetRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    let id = body
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::validation_error("missing required field: userId"))?;
    let role = required_role(body.role)?;
    let account = state
        .accounts
        .set_role(&id, &role)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Role updated", "user": account })))
}

async fn me<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let account = state.accounts.me(&principal).await.or_api(&state.errors)?;
    Ok(Json(account))
}

// ============================================================
// Author dashboard
// ============================================================

async fn author_profile<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(author, _): Authorized<AuthorOnly>,
) -> ApiResult<impl IntoResponse> {
    let (account, books) = state
        .accounts
        .author_profile(&author)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "author": account, "books": books })))
}

async fn author_books<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(author, _): Authorized<AuthorOnly>,
) -> ApiResult<impl IntoResponse> {
    let books = state.catalog.my_books(&author).await.or_api(&state.errors)?;
    Ok(Json(books))
}

async fn create_authored_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(author, _): Authorized<AuthorOnly>,
    JsonBadRequest(body): JsonBadRequest<NewBook>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .catalog
        .create_authored_book(&author, body)
        .await
        .or_api(&state.errors)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Book created", "book": book })),
    ))
}

async fn author_update_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(author, _): Authorized<AuthorOnly>,
    Path(book_id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<BookUpdate>,
) -> ApiResult<impl IntoResponse> {
    let result = state.catalog.update_book(&author, &book_id, body).await;
    let book = log_denial(result, &author, &book_id).or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Book updated", "book": book })))
}

async fn author_delete_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(author, _): Authorized<AuthorOnly>,
    Path(book_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let result = state.catalog.delete_book(&author, &book_id).await;
    let book = log_denial(result, &author, &book_id).or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Book deleted", "book": book })))
}

// ============================================================
// Catalog
// ============================================================

async fn list_books<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<impl IntoResponse> {
    let books = state.catalog.list_approved().await.or_api(&state.errors)?;
    Ok(Json(books))
}

async fn books_by_category<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(category): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let books = state
        .catalog
        .list_by_category(&category)
        .await
        .or_api(&state.errors)?;
    Ok(Json(books))
}

async fn books_by_author<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(author_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let books = state
        .catalog
        .books_by_author(&author_id)
        .await
        .or_api(&state.errors)?;
    Ok(Json(books))
}

async fn get_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state.catalog.get_book(&id).await.or_api(&state.errors)?;
    Ok(Json(book))
}

async fn my_books<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let books = state.catalog.my_books(&principal).await.or_api(&state.errors)?;
    Ok(Json(books))
}

async fn create_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(principal, _): Authorized<Contributors>,
    JsonBadRequest(body): JsonBadRequest<NewBook>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .catalog
        .create_book(&principal, body)
        .await
        .or_api(&state.errors)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Book created", "book": book })),
    ))
}

async fn update_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(principal, _): Authorized<Contributors>,
    Path(id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<BookUpdate>,
) -> ApiResult<impl IntoResponse> {
    let result = state.catalog.update_book(&principal, &id, body).await;
    let book = log_denial(result, &principal, &id).or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Book updated", "book": book })))
}

async fn delete_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(principal, _): Authorized<Contributors>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let result = state.catalog.delete_book(&principal, &id).await;
    let book = log_denial(result, &principal, &id).or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Book deleted", "book": book })))
}

async fn approve_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _moderator: Authorized<PublisherOrAdmin>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .catalog
        .moderate(&id, BookStatus::Approved)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Book approved", "book": book })))
}

async fn reject_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _moderator: Authorized<PublisherOrAdmin>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .catalog
        .moderate(&id, BookStatus::Rejected)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Book rejected", "book": book })))
}

async fn admin_list_books<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
) -> ApiResult<impl IntoResponse> {
    let books = state.catalog.admin_list().await.or_api(&state.errors)?;
    Ok(Json(books))
}

async fn admin_update_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
    Path(id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<BookUpdate>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .catalog
        .admin_update(&id, body)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Book updated", "book": book })))
}

async fn admin_delete_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state.catalog.admin_delete(&id).await.or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Book deleted", "book": book })))
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

async fn add_review<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<ReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .catalog
        .add_review(&principal, &id, body.rating, body.comment.as_deref())
        .await
        .or_api(&state.errors)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Review added", "book": book })),
    ))
}

async fn delete_review<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path((id, review_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let result = state.catalog.delete_review(&principal, &id, &review_id).await;
    let review = log_denial(result, &principal, &review_id).or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Review deleted", "review": review })))
}

// ============================================================
// Cart and wishlist
// ============================================================

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    #[serde(alias = "newQuantity")]
    pub quantity: Option<u32>,
}

async fn get_cart<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let cart = state.cart.cart(&principal).await.or_api(&state.errors)?;
    Ok(Json(json!({ "status": "ok", "cart": cart })))
}

async fn add_to_cart<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    JsonBadRequest(body): JsonBadRequest<AddToCart>,
) -> ApiResult<impl IntoResponse> {
    let quantity = state
        .cart
        .add_to_cart(&principal, body)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Added to cart", "quantity": quantity })))
}

async fn add_one_to_cart<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(book_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let request = AddToCart {
        book_id: Some(book_id),
        quantity: Some(1),
    };
    let quantity = state
        .cart
        .add_to_cart(&principal, request)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Added to cart", "quantity": quantity })))
}

async fn set_cart_quantity<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(book_id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<QuantityBody>,
) -> ApiResult<impl IntoResponse> {
    let quantity = body
        .quantity
        .ok_or_else(|| ApiError::validation_error("missing required field: quantity"))?;
    let account = state
        .cart
        .set_quantity(&principal, &book_id, quantity)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Cart updated", "cart": account.cart })))
}

async fn remove_from_cart<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(book_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .cart
        .remove_from_cart(&principal, &book_id)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Removed from cart", "cart": account.cart })))
}

async fn wishlist<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let books = state.cart.wishlist(&principal).await.or_api(&state.errors)?;
    Ok(Json(books))
}

async fn add_to_wishlist<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(book_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .cart
        .add_to_wishlist(&principal, &book_id)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Added to wishlist", "wishlist": account.wishlist })))
}

async fn remove_from_wishlist<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(book_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .cart
        .remove_from_wishlist(&principal, &book_id)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Removed from wishlist", "wishlist": account.wishlist })))
}

// ============================================================
// Addresses
// ============================================================

#[derive(Debug, Deserialize)]
pub struct AddressBody {
    pub address: Option<String>,
}

fn address_text(body: AddressBody) -> ApiResult<String> {
    body.address
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| ApiError::validation_error("missing required field: address"))
}

async fn addresses<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let addresses = state.cart.addresses(&principal).await.or_api(&state.errors)?;
    Ok(Json(addresses))
}

async fn add_address<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    JsonBadRequest(body): JsonBadRequest<AddressBody>,
) -> ApiResult<impl IntoResponse> {
    let text = address_text(body)?;
    let addresses = state
        .cart
        .add_address(&principal, &text)
        .await
        .or_api(&state.errors)?;
    Ok((StatusCode::CREATED, Json(addresses)))
}

async fn edit_address<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(address_id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<AddressBody>,
) -> ApiResult<impl IntoResponse> {
    let text = address_text(body)?;
    let addresses = state
        .cart
        .edit_address(&principal, &address_id, &text)
        .await
        .or_api(&state.errors)?;
    Ok(Json(addresses))
}

async fn delete_address<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(address_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let addresses = state
        .cart
        .delete_address(&principal, &address_id)
        .await
        .or_api(&state.errors)?;
    Ok(Json(addresses))
}

async fn set_default_address<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    Path(address_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let addresses = state
        .cart
        .set_default_address(&principal, &address_id)
        .await
        .or_api(&state.errors)?;
    Ok(Json(addresses))
}

// ============================================================
// Orders
// ============================================================

async fn place_order<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
    JsonBadRequest(body): JsonBadRequest<PlaceOrder>,
) -> ApiResult<impl IntoResponse> {
    let order = state
        .orders
        .place_order(&principal, body)
        .await
        .or_api(&state.errors)?;
    record_order_placed(order.total_amount);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Order placed", "order": order })),
    ))
}

async fn my_orders<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
) -> ApiResult<impl IntoResponse> {
    let orders = state.orders.my_orders(&principal).await.or_api(&state.errors)?;
    Ok(Json(orders))
}

async fn list_orders<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
) -> ApiResult<impl IntoResponse> {
    let orders = state.orders.list_all().await.or_api(&state.errors)?;
    Ok(Json(orders))
}

async fn update_order<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
    Path(id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<OrderUpdate>,
) -> ApiResult<impl IntoResponse> {
    let order = state.orders.update(&id, body).await.or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Order updated", "order": order })))
}

async fn delete_order<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let order = state.orders.delete(&id).await.or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Order deleted", "order": order })))
}

async fn order_analytics<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Authorized<AdminOnly>,
) -> ApiResult<impl IntoResponse> {
    let buckets = state.orders.analytics().await.or_api(&state.errors)?;
    Ok(Json(buckets))
}

// ============================================================
// Proposals
// ============================================================

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: Option<String>,
}

async fn submit_proposal<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(author, _): Authorized<AuthorOnly>,
    JsonBadRequest(body): JsonBadRequest<NewProposal>,
) -> ApiResult<impl IntoResponse> {
    let proposal = state
        .proposals
        .submit(&author, body)
        .await
        .or_api(&state.errors)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Proposal submitted", "proposal": proposal })),
    ))
}

async fn my_proposals<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(author, _): Authorized<AuthorOnly>,
) -> ApiResult<impl IntoResponse> {
    let proposals = state.proposals.mine(&author).await.or_api(&state.errors)?;
    Ok(Json(proposals))
}

async fn set_proposal_status<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(principal, _): Authorized<PublisherOrAdmin>,
    Path(id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<StatusBody>,
) -> ApiResult<impl IntoResponse> {
    let status = body
        .status
        .ok_or_else(|| ApiError::validation_error("missing required field: status"))?;
    decide_proposal(&state, &principal, &id, &status).await
}

async fn accept_proposal<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(publisher, _): Authorized<PublisherOnly>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    decide_proposal(&state, &publisher, &id, "accepted").await
}

async fn reject_proposal<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(publisher, _): Authorized<PublisherOnly>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    decide_proposal(&state, &publisher, &id, "rejected").await
}

async fn decide_proposal<S: DataStore>(
    state: &AppState<S>,
    principal: &Principal,
    id: &str,
    status: &str,
) -> ApiResult<Json<serde_json::Value>> {
    let result = state.proposals.set_status(principal, id, status).await;
    let proposal = log_denial(result, principal, id).or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Proposal updated", "proposal": proposal })))
}

// ============================================================
// Publisher dashboard
// ============================================================

#[derive(Debug, Deserialize)]
pub struct PriceBody {
    pub price: Option<f64>,
}

async fn publisher_profile<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(publisher, _): Authorized<PublisherOnly>,
) -> ApiResult<impl IntoResponse> {
    let account = state.publisher.profile(&publisher).await.or_api(&state.errors)?;
    Ok(Json(account))
}

async fn update_publisher_profile<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(publisher, _): Authorized<PublisherOnly>,
    JsonBadRequest(body): JsonBadRequest<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .publisher
        .update_profile(&publisher, body)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Profile updated", "publisher": account })))
}

async fn publisher_books<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(publisher, _): Authorized<PublisherOnly>,
) -> ApiResult<impl IntoResponse> {
    let books = state.publisher.books(&publisher).await.or_api(&state.errors)?;
    Ok(Json(books))
}

async fn publisher_update_price<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(publisher, _): Authorized<PublisherOnly>,
    Path(id): Path<String>,
    JsonBadRequest(body): JsonBadRequest<PriceBody>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .publisher
        .update_price(&publisher, &id, body.price)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Price updated", "book": book })))
}

async fn publisher_delete_book<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(publisher, _): Authorized<PublisherOnly>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let book = state
        .publisher
        .delete_book(&publisher, &id)
        .await
        .or_api(&state.errors)?;
    Ok(Json(json!({ "message": "Book deleted", "book": book })))
}

async fn publisher_proposals<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(publisher, _): Authorized<PublisherOnly>,
) -> ApiResult<impl IntoResponse> {
    let proposals = state
        .proposals
        .for_publisher(&publisher)
        .await
        .or_api(&state.errors)?;
    Ok(Json(proposals))
}

async fn publisher_insights<S: DataStore>(
    State(state): State<Arc<AppState<S>>>,
    Authorized(publisher, _): Authorized<PublisherOnly>,
) -> ApiResult<impl IntoResponse> {
    let insights = state.publisher.insights(&publisher).await.or_api(&state.errors)?;
    Ok(Json(insights))
}
