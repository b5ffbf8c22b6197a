//! Name resolution and round-robin endpoint selection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::TransportError;

/// A resolved network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// `host:port` address.
    pub addr: String,
}

impl Endpoint {
    /// Creates an endpoint from an address string.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Pluggable name-resolution strategy.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves a logical target into one or more endpoints.
    async fn resolve(&self, target: &str) -> Result<Vec<Endpoint>, TransportError>;
}

/// DNS-style static resolution: the target is a comma-separated address
/// list, resolved once at connect time.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver;

impl StaticResolver {
    /// Creates a static resolver.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, target: &str) -> Result<Vec<Endpoint>, TransportError> {
        let endpoints: Vec<Endpoint> = target
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(Endpoint::new)
            .collect();
        if endpoints.is_empty() {
            return Err(TransportError::Resolution {
                target: target.to_string(),
                reason: "empty address list".to_string(),
            });
        }
        Ok(endpoints)
    }
}

/// Dynamic resolution against a service registry.
///
/// The registry table is shared; a discovery loop elsewhere updates it
/// as instances come and go, and resolution reads whatever is current.
#[derive(Clone, Default)]
pub struct RegistryResolver {
    services: Arc<RwLock<HashMap<String, Vec<Endpoint>>>>,
}

impl RegistryResolver {
    /// Creates an empty registry resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registered endpoints for a service.
    pub async fn register(&self, service: impl Into<String>, endpoints: Vec<Endpoint>) {
        self.services.write().await.insert(service.into(), endpoints);
    }

    /// Removes a service from the registry.
    pub async fn deregister(&self, service: &str) {
        self.services.write().await.remove(service);
    }
}

#[async_trait]
impl Resolver for RegistryResolver {
    async fn resolve(&self, target: &str) -> Result<Vec<Endpoint>, TransportError> {
        let services = self.services.read().await;
        match services.get(target) {
            Some(endpoints) if !endpoints.is_empty() => Ok(endpoints.clone()),
            _ => Err(TransportError::Resolution {
                target: target.to_string(),
                reason: "no registered instances".to_string(),
            }),
        }
    }
}

/// Resolved endpoints with deterministic round-robin selection.
#[derive(Clone)]
pub struct Endpoints {
    list: Arc<Vec<Endpoint>>,
    next: Arc<AtomicUsize>,
}

impl Endpoints {
    /// Wraps a non-empty endpoint list.
    pub fn new(list: Vec<Endpoint>) -> Self {
        debug_assert!(!list.is_empty());
        Self {
            list: Arc::new(list),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Picks the next endpoint in round-robin order.
    pub fn pick(&self) -> &Endpoint {
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        &self.list[idx % self.list.len()]
    }

    /// Number of resolved endpoints.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// True if no endpoints are held (never the case after `new`).
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_resolver_splits_address_list() {
        let resolver = StaticResolver::new();
        let endpoints = resolver
            .resolve("auth-1:8000, auth-2:8000")
            .await
            .unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].addr, "auth-1:8000");
        assert_eq!(endpoints[1].addr, "auth-2:8000");
    }

    #[tokio::test]
    async fn static_resolver_rejects_empty_target() {
        let resolver = StaticResolver::new();
        assert!(resolver.resolve("").await.is_err());
    }

    #[tokio::test]
    async fn registry_resolver_tracks_instances() {
        let resolver = RegistryResolver::new();
        assert!(resolver.resolve("product").await.is_err());

        resolver
            .register("product", vec![Endpoint::new("10.0.0.1:8000")])
            .await;
        let endpoints = resolver.resolve("product").await.unwrap();
        assert_eq!(endpoints.len(), 1);

        resolver.deregister("product").await;
        assert!(resolver.resolve("product").await.is_err());
    }

    #[test]
    fn round_robin_cycles_deterministically() {
        let endpoints = Endpoints::new(vec![
            Endpoint::new("a:1"),
            Endpoint::new("b:1"),
            Endpoint::new("c:1"),
        ]);

        let picks: Vec<_> = (0..6).map(|_| endpoints.pick().addr.clone()).collect();
        assert_eq!(picks, ["a:1", "b:1", "c:1", "a:1", "b:1", "c:1"]);
    }
}
