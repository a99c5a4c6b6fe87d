//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use job_portal_core::domain::{
    Application, ApplicationStatus, ChatMessage, Connection, ConnectionRequest, Job, PairChange,
    PairState, Profile, User, UserCredentials, UserPair,
};
use job_portal_core::error::ConnectionError;
use job_portal_core::ports::{DatabaseService, PairDecision, PortError, PortResult};
use sqlx::sqlite::SqliteConnection;
use sqlx::{FromRow, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

//=========================================================================================
// Error and Encoding Helpers
//=========================================================================================

fn unexpected(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(db.message().to_string())
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

fn not_found_or(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        other => unexpected(other),
    }
}

fn encode_list(items: &[String]) -> PortResult<String> {
    serde_json::to_string(items).map_err(|e| PortError::Unexpected(e.to_string()))
}

fn decode_list(column: &str, raw: &str) -> PortResult<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|e| PortError::Unexpected(format!("Corrupt list in column {}: {}", column, e)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.id,
            username: self.username,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    username: String,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            username: self.username,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    user_id: Uuid,
    headline: Option<String>,
    summary: Option<String>,
    experience: Option<String>,
    resume_link: Option<String>,
    skills: String,
    certifications: String,
    updated_at: DateTime<Utc>,
}
impl ProfileRecord {
    fn to_domain(self) -> PortResult<Profile> {
        Ok(Profile {
            user_id: self.user_id,
            headline: self.headline,
            summary: self.summary,
            experience: self.experience,
            resume_link: self.resume_link,
            skills: decode_list("skills", &self.skills)?,
            certifications: decode_list("certifications", &self.certifications)?,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct JobRecord {
    id: Uuid,
    external_id: String,
    title: String,
    role: String,
    company: String,
    location: String,
    description: String,
    required_skills: String,
    required_certifications: String,
    posted_at: DateTime<Utc>,
    last_synced_at: DateTime<Utc>,
}
impl JobRecord {
    fn to_domain(self) -> PortResult<Job> {
        Ok(Job {
            id: self.id,
            external_id: self.external_id,
            title: self.title,
            role: self.role,
            company: self.company,
            location: self.location,
            description: self.description,
            required_skills: decode_list("required_skills", &self.required_skills)?,
            required_certifications: decode_list(
                "required_certifications",
                &self.required_certifications,
            )?,
            posted_at: self.posted_at,
            last_synced_at: self.last_synced_at,
        })
    }
}

#[derive(FromRow)]
struct ApplicationRecord {
    id: Uuid,
    user_id: Uuid,
    job_id: Uuid,
    resume_link: String,
    skills: String,
    certifications: String,
    cover_letter: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    remote_application_id: Option<String>,
}
impl ApplicationRecord {
    fn to_domain(self) -> PortResult<Application> {
        let status = self
            .status
            .parse::<ApplicationStatus>()
            .map_err(PortError::Unexpected)?;
        Ok(Application {
            id: self.id,
            user_id: self.user_id,
            job_id: self.job_id,
            resume_link: self.resume_link,
            skills: decode_list("skills", &self.skills)?,
            certifications: decode_list("certifications", &self.certifications)?,
            cover_letter: self.cover_letter,
            status,
            created_at: self.created_at,
            remote_application_id: self.remote_application_id,
        })
    }
}

#[derive(FromRow)]
struct ConnectionRequestRecord {
    id: Uuid,
    requester_id: Uuid,
    recipient_id: Uuid,
    created_at: DateTime<Utc>,
}
impl ConnectionRequestRecord {
    fn to_domain(self) -> ConnectionRequest {
        ConnectionRequest {
            id: self.id,
            requester_id: self.requester_id,
            recipient_id: self.recipient_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ConnectionRecord {
    id: Uuid,
    user_one_id: Uuid,
    user_two_id: Uuid,
    created_at: DateTime<Utc>,
}
impl ConnectionRecord {
    fn to_domain(self) -> Connection {
        Connection {
            id: self.id,
            user_one_id: self.user_one_id,
            user_two_id: self.user_two_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ChatMessageRecord {
    id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    room: String,
    content: String,
    created_at: DateTime<Utc>,
}
impl ChatMessageRecord {
    fn to_domain(self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            room: self.room,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

const JOB_COLUMNS: &str = "id, external_id, title, role, company, location, description, \
     required_skills, required_certifications, posted_at, last_synced_at";

const APPLICATION_COLUMNS: &str = "id, user_id, job_id, resume_link, skills, certifications, \
     cover_letter, status, created_at, remote_application_id";

//=========================================================================================
// Connection Pair Helpers
//=========================================================================================

async fn load_pair_state(conn: &mut SqliteConnection, pair: UserPair) -> PortResult<PairState> {
    let connected: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM connections WHERE user_one_id = ? AND user_two_id = ?",
    )
    .bind(pair.low())
    .bind(pair.high())
    .fetch_optional(&mut *conn)
    .await
    .map_err(unexpected)?;
    if connected.is_some() {
        return Ok(PairState::Connected);
    }

    let pending: Option<(Uuid, Uuid)> = sqlx::query_as(
        "SELECT requester_id, recipient_id FROM connection_requests \
         WHERE (requester_id = ? AND recipient_id = ?) OR (requester_id = ? AND recipient_id = ?) \
         ORDER BY created_at ASC LIMIT 1",
    )
    .bind(pair.low())
    .bind(pair.high())
    .bind(pair.high())
    .bind(pair.low())
    .fetch_optional(&mut *conn)
    .await
    .map_err(unexpected)?;

    Ok(match pending {
        Some((requester, recipient)) => PairState::Pending {
            requester,
            recipient,
        },
        None => PairState::Unconnected,
    })
}

async fn clear_requests(conn: &mut SqliteConnection, pair: UserPair) -> PortResult<()> {
    sqlx::query(
        "DELETE FROM connection_requests \
         WHERE (requester_id = ? AND recipient_id = ?) OR (requester_id = ? AND recipient_id = ?)",
    )
    .bind(pair.low())
    .bind(pair.high())
    .bind(pair.high())
    .bind(pair.low())
    .execute(&mut *conn)
    .await
    .map_err(unexpected)?;
    Ok(())
}

async fn apply_pair_change(
    conn: &mut SqliteConnection,
    pair: UserPair,
    decide: &PairDecision,
) -> Result<PairState, ConnectionError> {
    let current = load_pair_state(conn, pair).await?;
    let now = Utc::now();

    match decide(&current)? {
        PairChange::Keep => return Ok(current),
        PairChange::OpenRequest {
            requester,
            recipient,
        } => {
            sqlx::query(
                "INSERT OR IGNORE INTO connection_requests (id, requester_id, recipient_id, created_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(requester)
            .bind(recipient)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(unexpected)?;
        }
        PairChange::Connect => {
            clear_requests(conn, pair).await?;
            sqlx::query(
                "INSERT OR IGNORE INTO connections (id, user_one_id, user_two_id, created_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(pair.low())
            .bind(pair.high())
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(unexpected)?;
        }
        PairChange::ClearRequests => clear_requests(conn, pair).await?,
        PairChange::Disconnect => {
            sqlx::query("DELETE FROM connections WHERE user_one_id = ? AND user_two_id = ?")
                .bind(pair.low())
                .bind(pair.high())
                .execute(&mut *conn)
                .await
                .map_err(unexpected)?;
            clear_requests(conn, pair).await?;
        }
    }

    Ok(load_pair_state(conn, pair).await?)
}

async fn run_pair_transaction(
    pool: SqlitePool,
    pair: UserPair,
    decide: PairDecision,
) -> Result<PairState, ConnectionError> {
    let mut conn = pool.acquire().await.map_err(unexpected)?;

    // IMMEDIATE takes the write lock up front, so two writers on the same
    // pair cannot both read "no request" and both insert one.
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *conn)
        .await
        .map_err(unexpected)?;

    let result = apply_pair_change(&mut conn, pair, &decide).await;
    let finish = if result.is_ok() { "COMMIT" } else { "ROLLBACK" };
    let finished = sqlx::query(finish).execute(&mut *conn).await;
    if let Err(e) = finished {
        // A connection that may still be inside a transaction is closed, not pooled.
        drop(conn.detach());
        return Err(unexpected(e).into());
    }
    result
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (id, username, email, hashed_password, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING id, username, email",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email.to_lowercase())
        .bind(hashed_password)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, email FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or(format!("User {} not found", user_id)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, email, hashed_password FROM users WHERE email = ?",
        )
        .bind(email.to_lowercase())
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or(format!("User with email {} not found", email)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let (user_id, expires_at): (Uuid, DateTime<Utc>) =
            sqlx::query_as("SELECT user_id, expires_at FROM auth_sessions WHERE id = ?")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| match e {
                    sqlx::Error::RowNotFound => PortError::Unauthorized,
                    other => unexpected(other),
                })?;
        if expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        Ok(user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Option<Profile>> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, headline, summary, experience, resume_link, skills, certifications, updated_at \
             FROM profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(ProfileRecord::to_domain).transpose()
    }

    async fn save_profile(&self, profile: &Profile) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO profiles (user_id, headline, summary, experience, resume_link, skills, certifications, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
                headline = excluded.headline, summary = excluded.summary, \
                experience = excluded.experience, resume_link = excluded.resume_link, \
                skills = excluded.skills, certifications = excluded.certifications, \
                updated_at = excluded.updated_at",
        )
        .bind(profile.user_id)
        .bind(&profile.headline)
        .bind(&profile.summary)
        .bind(&profile.experience)
        .bind(&profile.resume_link)
        .bind(encode_list(&profile.skills)?)
        .bind(encode_list(&profile.certifications)?)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_profile(&self, user_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_jobs(&self) -> PortResult<Vec<Job>> {
        let records = sqlx::query_as::<_, JobRecord>(&format!(
            "SELECT {} FROM jobs ORDER BY posted_at DESC, external_id ASC",
            JOB_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(JobRecord::to_domain).collect()
    }

    async fn get_job(&self, job_id: Uuid) -> PortResult<Job> {
        let record = sqlx::query_as::<_, JobRecord>(&format!(
            "SELECT {} FROM jobs WHERE id = ?",
            JOB_COLUMNS
        ))
        .bind(job_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or(format!("Job {} not found", job_id)))?;
        record.to_domain()
    }

    async fn upsert_job(&self, job: &Job) -> PortResult<()> {
        sqlx::query(&format!(
            "INSERT INTO jobs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(external_id) DO UPDATE SET \
                title = excluded.title, role = excluded.role, company = excluded.company, \
                location = excluded.location, description = excluded.description, \
                required_skills = excluded.required_skills, \
                required_certifications = excluded.required_certifications, \
                posted_at = excluded.posted_at, last_synced_at = excluded.last_synced_at",
            JOB_COLUMNS
        ))
        .bind(job.id)
        .bind(&job.external_id)
        .bind(&job.title)
        .bind(&job.role)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.description)
        .bind(encode_list(&job.required_skills)?)
        .bind(encode_list(&job.required_certifications)?)
        .bind(job.posted_at)
        .bind(job.last_synced_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_job(&self, job_id: Uuid) -> PortResult<()> {
        // The applications foreign key refuses this for jobs that still have applications.
        sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn external_ids_with_applications(&self) -> PortResult<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT jobs.external_id FROM jobs \
             JOIN applications ON applications.job_id = jobs.id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn insert_application(&self, application: &Application) -> PortResult<()> {
        sqlx::query(&format!(
            "INSERT INTO applications ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            APPLICATION_COLUMNS
        ))
        .bind(application.id)
        .bind(application.user_id)
        .bind(application.job_id)
        .bind(&application.resume_link)
        .bind(encode_list(&application.skills)?)
        .bind(encode_list(&application.certifications)?)
        .bind(&application.cover_letter)
        .bind(application.status.as_str())
        .bind(application.created_at)
        .bind(&application.remote_application_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_application(&self, application_id: Uuid) -> PortResult<Application> {
        sqlx::query_as::<_, ApplicationRecord>(&format!(
            "SELECT {} FROM applications WHERE id = ?",
            APPLICATION_COLUMNS
        ))
        .bind(application_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or(format!("Application {} not found", application_id)))?
        .to_domain()
    }

    async fn find_active_application(
        &self,
        user_id: Uuid,
        job_id: Uuid,
    ) -> PortResult<Option<Application>> {
        let record = sqlx::query_as::<_, ApplicationRecord>(&format!(
            "SELECT {} FROM applications WHERE user_id = ? AND job_id = ? AND status <> 'withdrawn'",
            APPLICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(ApplicationRecord::to_domain).transpose()
    }

    async fn list_applications_for_user(&self, user_id: Uuid) -> PortResult<Vec<Application>> {
        let records = sqlx::query_as::<_, ApplicationRecord>(&format!(
            "SELECT {} FROM applications WHERE user_id = ? ORDER BY created_at DESC, id ASC",
            APPLICATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(ApplicationRecord::to_domain).collect()
    }

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> PortResult<()> {
        let result = sqlx::query("UPDATE applications SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(application_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Application {} not found",
                application_id
            )));
        }
        Ok(())
    }

    async fn set_remote_application_id(
        &self,
        application_id: Uuid,
        remote_id: &str,
    ) -> PortResult<()> {
        sqlx::query("UPDATE applications SET remote_application_id = ? WHERE id = ?")
            .bind(remote_id)
            .bind(application_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_pair_state(&self, pair: UserPair) -> PortResult<PairState> {
        let mut conn = self.pool.acquire().await.map_err(unexpected)?;
        load_pair_state(&mut conn, pair).await
    }

    async fn update_pair(
        &self,
        pair: UserPair,
        decide: PairDecision,
    ) -> Result<PairState, ConnectionError> {
        // The transaction runs on its own task: a caller dropped between BEGIN
        // and COMMIT must not hand an open transaction back to the pool.
        tokio::spawn(run_pair_transaction(self.pool.clone(), pair, decide))
            .await
            .map_err(|e| PortError::Unexpected(format!("Pair update task failed: {}", e)))?
    }

    async fn list_connections_for(&self, user_id: Uuid) -> PortResult<Vec<Connection>> {
        let records = sqlx::query_as::<_, ConnectionRecord>(
            "SELECT id, user_one_id, user_two_id, created_at FROM connections \
             WHERE user_one_id = ? OR user_two_id = ? ORDER BY created_at ASC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ConnectionRecord::to_domain).collect())
    }

    async fn list_requests_for(&self, user_id: Uuid) -> PortResult<Vec<ConnectionRequest>> {
        let records = sqlx::query_as::<_, ConnectionRequestRecord>(
            "SELECT id, requester_id, recipient_id, created_at FROM connection_requests \
             WHERE requester_id = ? OR recipient_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records
            .into_iter()
            .map(ConnectionRequestRecord::to_domain)
            .collect())
    }

    async fn save_chat_message(&self, message: &ChatMessage) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO chat_messages (id, sender_id, receiver_id, room, content, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.room)
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_chat_messages(&self, room: &str) -> PortResult<Vec<ChatMessage>> {
        let records = sqlx::query_as::<_, ChatMessageRecord>(
            "SELECT id, sender_id, receiver_id, room, content, created_at FROM chat_messages \
             WHERE room = ? ORDER BY created_at ASC",
        )
        .bind(room)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(ChatMessageRecord::to_domain).collect())
    }
}
