//! In-memory records for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::store::{DocumentStore, IdentityService, StoreError, TenantRecord, UserRecord};

/// A fixed set of tenants and users.
///
/// Counts every lookup so tests can assert that a request was rejected
/// before any external call was made.
#[derive(Default)]
pub struct InMemoryStore {
    tenants: RwLock<HashMap<(String, String), TenantRecord>>,
    users: RwLock<HashMap<String, UserRecord>>,
    lookups: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tenant document.
    pub fn put_tenant(&self, collection: &str, tenant: TenantRecord) {
        let mut tenants = self.tenants.write().expect("tenant map lock poisoned");
        tenants.insert((collection.to_string(), tenant.id.clone()), tenant);
    }

    /// Insert or replace a user with a single string claim.
    pub fn put_user(&self, uid: &str, claims: &[(&str, &str)]) {
        let claims: Map<String, Value> = claims
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        let mut users = self.users.write().expect("user map lock poisoned");
        users.insert(uid.to_string(), UserRecord { uid: uid.to_string(), claims });
    }

    /// Number of lookups served so far (tenants and users).
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_tenant(&self, collection: &str, id: &str) -> Result<TenantRecord, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let tenants = self
            .tenants
            .read()
            .map_err(|_| StoreError::Transport("tenant map lock poisoned".into()))?;
        tenants
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound { kind: "document", id: id.to_string() })
    }
}

#[async_trait]
impl IdentityService for InMemoryStore {
    async fn lookup_user(&self, uid: &str) -> Result<UserRecord, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let users = self
            .users
            .read()
            .map_err(|_| StoreError::Transport("user map lock poisoned".into()))?;
        users
            .get(uid)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { kind: "user", id: uid.to_string() })
    }
}
