//! Identity-verification repository.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use domain::AuthResult;
use resilience::{CallRequest, ResilientClient, Transport, TransportError};
use serde::{Deserialize, Serialize};

use crate::error::PurchaseError;

const AUTH_SERVICE: &str = "auth.AuthService";
const AUTH_METHOD: &str = "Auth";

/// Verifies access tokens with the identity service.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Resolves an access token to the customer it authenticates.
    async fn auth(&self, access_token: &str) -> Result<AuthResult, PurchaseError>;
}

#[derive(Serialize)]
struct AuthPayload<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    customer_id: u64,
    active: bool,
    expired: bool,
}

/// Production implementation calling the identity service through the
/// resilient client.
pub struct RemoteAuthRepository<T: Transport> {
    client: ResilientClient<T>,
}

impl<T: Transport> RemoteAuthRepository<T> {
    /// Wraps a resilient client connected to the identity service.
    pub fn new(client: ResilientClient<T>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<T: Transport> AuthRepository for RemoteAuthRepository<T> {
    async fn auth(&self, access_token: &str) -> Result<AuthResult, PurchaseError> {
        let payload = serde_json::to_vec(&AuthPayload { access_token })?;
        let response = self
            .client
            .call(CallRequest::new(AUTH_SERVICE, AUTH_METHOD, payload))
            .await?;
        let decoded: AuthResponse = serde_json::from_slice(&response.payload)?;
        Ok(AuthResult {
            customer_id: decoded.customer_id.into(),
            active: decoded.active,
            expired: decoded.expired,
        })
    }
}

/// Test double keyed by token string.
#[derive(Default)]
pub struct InMemoryAuthRepository {
    tokens: RwLock<HashMap<String, AuthResult>>,
    calls: AtomicU32,
    unavailable: std::sync::atomic::AtomicBool,
}

impl InMemoryAuthRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token and the result it resolves to.
    pub fn insert_token(&self, token: impl Into<String>, result: AuthResult) {
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.into(), result);
    }

    /// Makes subsequent calls fail as if the service were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of verification calls performed.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthRepository for InMemoryAuthRepository {
    async fn auth(&self, access_token: &str) -> Result<AuthResult, PurchaseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PurchaseError::Remote(
                TransportError::Unavailable("auth service down".to_string()).into(),
            ));
        }
        // Unknown tokens verify as inactive, the way the identity
        // service reports them.
        Ok(self
            .tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(access_token)
            .copied()
            .unwrap_or(AuthResult {
                customer_id: common::CustomerId::new(0),
                active: false,
                expired: false,
            }))
    }
}
