//! Router and handlers.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use schoolgate_auth::{
    AuthConfig, LoginInput, LoginOutcome, MfaVerifyInput, SessionManager, TokenPair,
};
use schoolgate_authz::{
    AccessGrant, AuthzError, Authorizer, EntitlementConfig, EntitlementResolver, QuotaDecision,
    QuotaSource, QuotaTable, RouteRequirement, bearer_token,
};
use schoolgate_core::capability::{Capability, CapabilitySet};
use schoolgate_core::error::GateError;
use schoolgate_core::models::limit::{Limit, ResourceKind};
use schoolgate_core::models::subscription::BillingState;
use schoolgate_core::models::tenant::TenantId;
use schoolgate_core::module::ModuleKey;
use schoolgate_store::repository::{
    MemoryEntitlementRepository, MemoryPrincipalRepository, MemoryResourceRepository,
    MemoryTenantRepository, ResourceRecord,
};
use schoolgate_store::{MemoryDb, StoreError};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub type AppSessions = SessionManager<MemoryPrincipalRepository>;
pub type AppAuthorizer = Authorizer<
    MemoryPrincipalRepository,
    MemoryTenantRepository,
    MemoryEntitlementRepository,
    MemoryResourceRepository,
>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<AppSessions>,
    pub authz: Arc<AppAuthorizer>,
    pub resources: MemoryResourceRepository,
}

impl AppState {
    /// Wire every component over one shared store.
    pub fn new(db: MemoryDb, auth: AuthConfig, entitlements: EntitlementConfig) -> Self {
        let principals = match auth.pepper.clone() {
            Some(pepper) => MemoryPrincipalRepository::with_pepper(db.clone(), pepper),
            None => MemoryPrincipalRepository::new(db.clone()),
        };
        let resources = MemoryResourceRepository::new(db.clone());
        let sessions = Arc::new(SessionManager::new(principals, auth));
        let authz = Arc::new(Authorizer::new(
            sessions.clone(),
            MemoryTenantRepository::new(db.clone()),
            EntitlementResolver::new(MemoryEntitlementRepository::new(db), entitlements),
            resources.clone(),
        ));

        Self {
            sessions,
            authz,
            resources,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/mfa/verify", post(verify_mfa))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout-all", post(logout_all))
        .route(
            "/school/{tenant_id}/students",
            get(list_students).post(create_student),
        )
        .route("/school/{tenant_id}/entitlements", get(entitlements))
        .with_state(state)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
}

// -----------------------------------------------------------------------
// Auth routes
// -----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginResponse {
    Authenticated(TokenResponse),
    #[serde(rename_all = "camelCase")]
    MfaRequired {
        challenge_token: String,
        expires_in: u64,
    },
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = state
        .sessions
        .login(LoginInput {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok(Json(match outcome {
        LoginOutcome::Authenticated(pair) => LoginResponse::Authenticated(pair.into()),
        LoginOutcome::MfaRequired {
            challenge_token,
            expires_in,
        } => LoginResponse::MfaRequired {
            challenge_token,
            expires_in,
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaVerifyRequest {
    pub challenge_token: String,
    pub code: String,
}

async fn verify_mfa(
    State(state): State<AppState>,
    Json(payload): Json<MfaVerifyRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let pair = state
        .sessions
        .verify_mfa(MfaVerifyInput {
            challenge_token: payload.challenge_token,
            code: payload.code,
        })
        .await?;
    Ok(Json(pair.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: u64,
}

async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let out = state.sessions.refresh(&payload.refresh_token).await?;
    Ok(Json(RefreshResponse {
        access_token: out.access_token,
        expires_in: out.expires_in,
    }))
}

/// Revoke every credential of the caller. Only the credential itself is
/// checked, so a principal on a lapsed or inactive tenant can still log
/// out.
async fn logout_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer(&headers)
        .ok_or_else(|| AuthzError::Unauthenticated("missing bearer credential".into()))?;
    let principal = state.sessions.validate_access(token).await?;
    state.sessions.revoke_all(principal.principal_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -----------------------------------------------------------------------
// School routes
// -----------------------------------------------------------------------

async fn list_students(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    headers: HeaderMap,
) -> Result<Json<Vec<ResourceRecord>>, ApiError> {
    let req = RouteRequirement::tenant(tenant_id).require(Capability::ManageStudents);
    state.authz.authorize(bearer(&headers), &req).await?;
    Ok(Json(
        state.resources.list(tenant_id, ResourceKind::Students).await,
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub name: String,
}

async fn create_student(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    headers: HeaderMap,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = RouteRequirement::tenant(tenant_id)
        .require(Capability::ManageStudents)
        .creating(ResourceKind::Students);
    let grant = state.authz.authorize(bearer(&headers), &req).await?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(GateError::Validation {
            message: "name is required".into(),
        }
        .into());
    }

    // The authorizer's count may be stale by now; the store re-checks
    // under its own lock.
    let (limit, source) = quota_of(&grant, ResourceKind::Students);
    let record = state
        .resources
        .insert_within_limit(tenant_id, ResourceKind::Students, name.to_string(), limit)
        .await
        .map_err(|e| match e {
            StoreError::LimitReached {
                resource,
                current,
                max,
            } => ApiError::from(AuthzError::LimitExceeded(QuotaDecision {
                allowed: false,
                resource,
                current,
                max: Limit::Finite(max),
                source,
            })),
            other => ApiError::from(GateError::from(other)),
        })?;

    Ok((StatusCode::CREATED, Json(record)))
}

fn quota_of(grant: &AccessGrant, kind: ResourceKind) -> (Limit, QuotaSource) {
    match (&grant.quota, &grant.policy) {
        (Some(decision), _) => (decision.max, decision.source),
        (None, Some(policy)) => {
            let resolved = policy.quotas.get(kind);
            (resolved.limit, resolved.source)
        }
        (None, None) => (Limit::Finite(0), QuotaSource::Default),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementsResponse {
    pub tenant_id: TenantId,
    pub billing: BillingState,
    pub active_modules: BTreeSet<ModuleKey>,
    pub quotas: QuotaTable,
    pub capabilities: CapabilitySet,
}

async fn entitlements(
    State(state): State<AppState>,
    Path(tenant_id): Path<TenantId>,
    headers: HeaderMap,
) -> Result<Json<EntitlementsResponse>, ApiError> {
    let req = RouteRequirement::tenant(tenant_id).require(Capability::ViewDashboard);
    let grant = state.authz.authorize(bearer(&headers), &req).await?;
    let policy = grant
        .policy
        .ok_or_else(|| AuthzError::Internal("tenant route resolved without a policy".into()))?;

    Ok(Json(EntitlementsResponse {
        tenant_id,
        billing: policy.billing,
        active_modules: policy.active_modules,
        quotas: policy.quotas,
        capabilities: grant.capabilities,
    }))
}
