//! crates/job_portal_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the portal's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    Application, ApplicationStatus, ChatMessage, Connection, ConnectionRequest, Job, JobPosting,
    PairChange, PairState, Profile, RemoteApplication, RemoteReceipt, User, UserCredentials,
    UserPair,
};
use crate::error::ConnectionError;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflicts with an existing record: {0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// Network failure, timeout or 5xx from a remote service.
    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(String),
    /// 4xx, `success: false` or an unreadable body from a remote service.
    #[error("Remote service rejected the request: {0}")]
    RemoteRejected(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Decides the write for a pair given its current state. Runs inside the
/// store's write transaction for that pair. Owned so the store can finish the
/// transaction on its own task once it has begun.
pub type PairDecision =
    Arc<dyn Fn(&PairState) -> Result<PairChange, ConnectionError> + Send + Sync>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Profiles ---
    async fn get_profile(&self, user_id: Uuid) -> PortResult<Option<Profile>>;

    async fn save_profile(&self, profile: &Profile) -> PortResult<()>;

    /// Returns `false` when there was no profile to delete.
    async fn delete_profile(&self, user_id: Uuid) -> PortResult<bool>;

    // --- Job Cache Store ---
    async fn list_jobs(&self) -> PortResult<Vec<Job>>;

    async fn get_job(&self, job_id: Uuid) -> PortResult<Job>;

    /// Inserts the job, or updates every mutable field of the row with the same
    /// external id (keeping that row's local id).
    async fn upsert_job(&self, job: &Job) -> PortResult<()>;

    async fn delete_job(&self, job_id: Uuid) -> PortResult<()>;

    /// External ids of every job referenced by at least one application.
    async fn external_ids_with_applications(&self) -> PortResult<HashSet<String>>;

    // --- Applications ---
    /// Fails with [`PortError::Conflict`] if the user already holds a
    /// non-withdrawn application for the same job.
    async fn insert_application(&self, application: &Application) -> PortResult<()>;

    async fn get_application(&self, application_id: Uuid) -> PortResult<Application>;

    async fn find_active_application(
        &self,
        user_id: Uuid,
        job_id: Uuid,
    ) -> PortResult<Option<Application>>;

    async fn list_applications_for_user(&self, user_id: Uuid) -> PortResult<Vec<Application>>;

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> PortResult<()>;

    async fn set_remote_application_id(
        &self,
        application_id: Uuid,
        remote_id: &str,
    ) -> PortResult<()>;

    // --- Connections ---
    async fn get_pair_state(&self, pair: UserPair) -> PortResult<PairState>;

    /// Reads the pair's state, asks `decide` for a change and applies it, all
    /// atomically with respect to other writers on the same pair.
    async fn update_pair(
        &self,
        pair: UserPair,
        decide: PairDecision,
    ) -> Result<PairState, ConnectionError>;

    async fn list_connections_for(&self, user_id: Uuid) -> PortResult<Vec<Connection>>;

    /// Pending requests in either direction involving `user_id`, newest first.
    async fn list_requests_for(&self, user_id: Uuid) -> PortResult<Vec<ConnectionRequest>>;

    // --- Chat ---
    async fn save_chat_message(&self, message: &ChatMessage) -> PortResult<()>;

    async fn list_chat_messages(&self, room: &str) -> PortResult<Vec<ChatMessage>>;
}

/// The external system that is authoritative for job postings and application intake.
#[async_trait]
pub trait JobSourceService: Send + Sync {
    /// Fetches every posting currently published.
    async fn fetch_jobs(&self) -> PortResult<Vec<JobPosting>>;

    /// Forwards an application, returning the remote identifier on success.
    async fn submit_application(&self, application: &RemoteApplication)
        -> PortResult<RemoteReceipt>;
}
