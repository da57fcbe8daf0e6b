use std::fmt::{self, Debug};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::utils::now_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditSeverity::Info => write!(f, "info"),
            AuditSeverity::Warning => write!(f, "warning"),
            AuditSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// One record handed to the audit collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// e.g. "config.create", "config.update", "config.delete"
    pub action: String,
    /// The plugin id the action applied to
    pub subject: String,
    pub actor: String,
    pub severity: AuditSeverity,
    pub timestamp: u64,
}

impl AuditEntry {
    pub fn new(action: &str, subject: &str, actor: &str, severity: AuditSeverity) -> Self {
        Self {
            action: action.to_string(),
            subject: subject.to_string(),
            actor: actor.to_string(),
            severity,
            timestamp: now_millis(),
        }
    }
}

/// Write-only sink for config audit records
pub trait AuditSink: Send + Sync + Debug {
    fn record(&self, entry: AuditEntry);
}

/// Emits audit records through the `log` facade under the `audit` target
#[derive(Debug, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, entry: AuditEntry) {
        match entry.severity {
            AuditSeverity::Info => log::info!(target: "audit", "{} {} by {}", entry.action, entry.subject, entry.actor),
            AuditSeverity::Warning => log::warn!(target: "audit", "{} {} by {}", entry.action, entry.subject, entry.actor),
            AuditSeverity::Critical => log::error!(target: "audit", "{} {} by {}", entry.action, entry.subject, entry.actor),
        }
    }
}

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
