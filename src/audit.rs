//! Transaction audit trail
//!
//! One append-only JSONL record per submitted transaction. Audit writes are
//! fire-and-forget: a write failure is logged and never fails the run.

use alloy::primitives::TxHash;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Kind of on-chain operation a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Deposit,
    Withdraw,
    Approve,
    Claim,
    Swap,
    Compound,
}

#[derive(Debug, Serialize)]
struct AuditRecord {
    timestamp: DateTime<Utc>,
    operation: OpKind,
    tx_hash: Option<String>,
    details: Value,
}

struct AuditWriter {
    path: PathBuf,
}

impl AuditWriter {
    fn append(&self, record: &AuditRecord) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let json = serde_json::to_string(record)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Append-only audit log, cheap to clone and share between components
#[derive(Clone)]
pub struct AuditLog {
    writer: Option<Arc<Mutex<AuditWriter>>>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Some(Arc::new(Mutex::new(AuditWriter { path: path.into() }))),
        }
    }

    /// An audit log that drops every record
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    pub fn from_config(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::new(crate::config::expand_home(p)),
            None => Self::disabled(),
        }
    }

    /// Append one record. Never fails the caller.
    pub async fn record(&self, operation: OpKind, tx_hash: Option<TxHash>, details: Value) {
        let Some(writer) = &self.writer else {
            return;
        };

        let record = AuditRecord {
            timestamp: Utc::now(),
            operation,
            tx_hash: tx_hash.map(|h| format!("{h}")),
            details,
        };

        let writer = writer.lock().await;
        if let Err(e) = writer.append(&record) {
            tracing::warn!(error = %e, "failed to write audit record");
        }
    }
}
