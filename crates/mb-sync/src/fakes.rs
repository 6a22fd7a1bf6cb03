//! In-memory gateway fakes shared by the core's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use mb_common::{Account, Entitlement, STATE_CREATION_REQUESTED};
use mb_gateway::{
    AccountSink, AccountSource, EntitlementApprover, EntitlementSink, EntitlementSource,
    GatewayError,
};

fn not_found(endpoint: &'static str) -> GatewayError {
    GatewayError::Status {
        endpoint,
        status: 404,
        body: String::new(),
    }
}

/// Fake procurement API: canonical state plus a record of approval calls.
#[derive(Default)]
pub struct FakeCommerce {
    entitlements: Mutex<HashMap<String, Entitlement>>,
    accounts: Mutex<HashMap<String, Account>>,
    approved: Mutex<Vec<String>>,
    plan_changes: Mutex<Vec<(String, String)>>,
}

impl FakeCommerce {
    pub fn put_entitlement(&self, entitlement: Entitlement) {
        self.entitlements
            .lock()
            .unwrap()
            .insert(entitlement.id.clone(), entitlement);
    }

    pub fn put_account(&self, account: Account) {
        self.accounts.lock().unwrap().insert(account.id.clone(), account);
    }

    pub fn approved(&self) -> Vec<String> {
        self.approved.lock().unwrap().clone()
    }

    pub fn plan_changes(&self) -> Vec<(String, String)> {
        self.plan_changes.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntitlementSource for FakeCommerce {
    async fn get_entitlement(&self, id: &str) -> Result<Entitlement, GatewayError> {
        self.entitlements
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("get entitlement"))
    }
}

#[async_trait]
impl AccountSource for FakeCommerce {
    async fn get_account(&self, id: &str) -> Result<Account, GatewayError> {
        self.accounts
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("get account"))
    }
}

#[async_trait]
impl EntitlementApprover for FakeCommerce {
    async fn approve_entitlement(&self, id: &str) -> Result<(), GatewayError> {
        self.approved.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn approve_plan_change(&self, id: &str, pending_plan: &str) -> Result<(), GatewayError> {
        self.plan_changes
            .lock()
            .unwrap()
            .push((id.to_string(), pending_plan.to_string()));
        Ok(())
    }
}

/// Fake subscription store: the mirror, with upsert/delete accounting.
#[derive(Default)]
pub struct FakeStore {
    entitlements: Mutex<HashMap<String, Entitlement>>,
    accounts: Mutex<HashMap<String, Account>>,
    entitlement_upserts: AtomicUsize,
    account_upserts: AtomicUsize,
    deleted_entitlements: Mutex<Vec<String>>,
    deleted_accounts: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn put_account(&self, account: Account) {
        self.accounts.lock().unwrap().insert(account.id.clone(), account);
    }

    pub fn put_entitlement(&self, entitlement: Entitlement) {
        self.entitlements
            .lock()
            .unwrap()
            .insert(entitlement.id.clone(), entitlement);
    }

    pub fn entitlement(&self, id: &str) -> Option<Entitlement> {
        self.entitlements.lock().unwrap().get(id).cloned()
    }

    pub fn entitlement_count(&self) -> usize {
        self.entitlements.lock().unwrap().len()
    }

    pub fn entitlement_upserts(&self) -> usize {
        self.entitlement_upserts.load(Ordering::SeqCst)
    }

    pub fn account_upserts(&self) -> usize {
        self.account_upserts.load(Ordering::SeqCst)
    }

    pub fn account_mirrored(&self, id: &str) -> bool {
        self.accounts.lock().unwrap().contains_key(id)
    }

    pub fn deleted_entitlements(&self) -> Vec<String> {
        self.deleted_entitlements.lock().unwrap().clone()
    }

    pub fn deleted_accounts(&self) -> Vec<String> {
        self.deleted_accounts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntitlementSink for FakeStore {
    async fn upsert_entitlement(&self, entitlement: &Entitlement) -> Result<(), GatewayError> {
        self.entitlement_upserts.fetch_add(1, Ordering::SeqCst);
        self.entitlements
            .lock()
            .unwrap()
            .insert(entitlement.id.clone(), entitlement.clone());
        Ok(())
    }

    async fn delete_entitlement(&self, id: &str) -> Result<(), GatewayError> {
        self.entitlements.lock().unwrap().remove(id);
        self.deleted_entitlements.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn unapproved_entitlements(
        &self,
        account_id: &str,
    ) -> Result<Vec<Entitlement>, GatewayError> {
        Ok(self
            .entitlements
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.account == account_id && e.state == STATE_CREATION_REQUESTED)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AccountSink for FakeStore {
    async fn upsert_account(&self, account: &Account) -> Result<(), GatewayError> {
        self.account_upserts.fetch_add(1, Ordering::SeqCst);
        self.accounts.lock().unwrap().insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn delete_account(&self, id: &str) -> Result<(), GatewayError> {
        self.accounts.lock().unwrap().remove(id);
        self.deleted_accounts.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn account_exists(&self, id: &str) -> Result<bool, GatewayError> {
        Ok(self.accounts.lock().unwrap().contains_key(id))
    }
}
