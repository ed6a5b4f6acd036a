//! Hand-written doubles for remote instances and the message sender, plus
//! helpers for reading what a mock database connection executed.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fedidir_common::{AppError, AppResult};
use sea_orm::{DatabaseConnection, Statement, Transaction};
use serde_json::Value;

use super::messaging::DirectMessageSender;
use super::probe::{ProbeFailure, RemoteInstanceClient};

/// Canned JSON responses keyed by URL. Unknown URLs fail as network errors.
#[derive(Default)]
pub struct MockRemote {
    responses: HashMap<String, Result<Value, ProbeFailure>>,
    bodies: Mutex<HashMap<String, Value>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: Value) -> Self {
        self.responses.insert(url.to_string(), Ok(body));
        self
    }

    pub fn with_failure(mut self, url: &str, failure: ProbeFailure) -> Self {
        self.responses.insert(url.to_string(), Err(failure));
        self
    }

    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_body(&self, url: &str) -> Option<Value> {
        self.bodies.lock().unwrap().get(url).cloned()
    }

    async fn respond(&self, url: &str) -> Result<Value, ProbeFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses.get(url).cloned().unwrap_or_else(|| {
            Err(ProbeFailure::Network {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        })
    }
}

#[async_trait]
impl RemoteInstanceClient for MockRemote {
    async fn get_json(&self, url: &str) -> Result<Value, ProbeFailure> {
        self.respond(url).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ProbeFailure> {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.clone());
        self.respond(url).await
    }
}

/// Records every direct message; optionally fails delivery.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectMessageSender for RecordingSender {
    async fn send_direct(&self, recipient: &str, body: &str) -> AppResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), body.to_string()));
        if self.fail {
            return Err(AppError::ExternalService("status rejected".to_string()));
        }
        Ok(())
    }
}

/// Everything a mock connection executed, one entry per transaction.
///
/// Statements run outside a transaction appear as single-statement entries.
pub fn transaction_log(db: Arc<DatabaseConnection>) -> Vec<Transaction> {
    let Ok(db) = Arc::try_unwrap(db) else {
        panic!("mock connection is still shared");
    };
    db.into_transaction_log()
}

/// SQL text of each statement in `txn`.
pub fn statement_sql(txn: &Transaction) -> Vec<&str> {
    txn.statements().iter().map(|stmt| stmt.sql.as_str()).collect()
}

/// Values bound to `stmt`.
pub fn bound_values(stmt: &Statement) -> Vec<sea_orm::Value> {
    stmt.values.as_ref().map(|values| values.0.clone()).unwrap_or_default()
}

/// The first statement in `txn` whose SQL starts with `prefix`.
pub fn find_statement<'a>(txn: &'a Transaction, prefix: &str) -> &'a Statement {
    txn.statements()
        .iter()
        .find(|stmt| stmt.sql.starts_with(prefix))
        .unwrap_or_else(|| panic!("no statement starting with {prefix}"))
}
