//! Authorization Module
//!
//! Resolves an acting identity, maps it to exactly one role and checks the
//! requested permission against that role's permission set. Every step that
//! cannot complete ends in a deny:
//! - no token, a bad token, or an unknown user -> `IdentityUnresolved`
//! - a known user without a role -> `RoleUnmapped`
//! - a role that lacks the permission -> `PermissionNotGranted`

pub mod audit;
pub mod evaluator;
pub mod identity;
pub mod permissions;

pub use audit::{
    AuditOutcome, AuditRecord, AuditSink, ChannelAuditSink, FanoutAuditSink, MemoryAuditSink,
    TracingAuditSink,
};
pub use evaluator::{Decision, DenyReason, Grant, PermissionEvaluator};
pub use identity::{
    DirectIdentitySource, Identity, IdentityError, IdentitySource, RoleStore, StaticRoleStore,
};
pub use permissions::{Permission, PermissionTable, Role};
