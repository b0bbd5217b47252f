//! Audit trail - append-only record of sensitive actions

use std::sync::Arc;

use crate::domain::result::Result;
use crate::domain::{Actor, AuditAction, AuditLog, NewAuditLog};
use crate::ports::{atomically, read, AuditRepository, Clock, Store};

pub struct AuditTrail {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Append an entry through the caller's session
    ///
    /// The entry commits or rolls back with the rest of that session, and a
    /// failed append fails the operation.
    pub fn append<R: AuditRepository + ?Sized>(
        &self,
        repo: &R,
        actor: &Actor,
        action: AuditAction,
        details: impl Into<String>,
    ) -> Result<AuditLog> {
        repo.add_audit_log(&NewAuditLog {
            user_id: actor.user_id,
            action,
            details: details.into(),
            ip_address: actor.ip_address.clone(),
            timestamp: self.clock.now(),
        })
    }

    /// Append an entry in its own session, for events that happen after (or
    /// instead of) a committed operation
    ///
    /// Failures are logged and swallowed; the caller already has an outcome
    /// to report.
    pub fn record_detached(&self, actor: &Actor, action: AuditAction, details: impl Into<String>) {
        let details = details.into();
        let result = atomically(self.store.as_ref(), |session| {
            self.append(session, actor, action, details.as_str())
        });
        if let Err(e) = result {
            tracing::warn!(action = %action, "could not write audit entry: {}", e);
        }
    }

    /// Every entry, newest first
    pub fn list_all(&self) -> Result<Vec<AuditLog>> {
        read(self.store.as_ref(), |session| session.get_audit_logs(None))
    }

    /// The `limit` newest entries
    pub fn list_recent(&self, limit: usize) -> Result<Vec<AuditLog>> {
        read(self.store.as_ref(), |session| session.get_audit_logs(Some(limit)))
    }
}
