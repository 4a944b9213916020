//! Engine-facing services.
//!
//! Services orchestrate a [`SearchClient`](crate::SearchClient) into
//! higher-level operations: task tracking, index duplication and renaming,
//! tenant tokens and the instance registry.

pub mod credentials;
pub mod index_operations;
pub mod tasks;
pub mod tenant_token;

pub use credentials::{CredentialsRecord, CredentialsStore};
pub use index_operations::{IndexOperationResult, IndexOperations};
pub use tasks::{TaskOutcome, TaskProcessor, TaskStatus};
pub use tenant_token::{SigningKey, TenantClaims, create_tenant_token};
