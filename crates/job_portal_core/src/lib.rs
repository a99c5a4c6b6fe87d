pub mod applications;
pub mod chat;
pub mod connections;
pub mod domain;
pub mod error;
pub mod ports;
pub mod profiles;
pub mod scoring;
pub mod seed;
pub mod sync;

pub use applications::{ApplicationForm, ApplicationWorkflow, Submission, SubmissionOutcome};
pub use chat::{room_id, ChatService};
pub use connections::{ConnectionGate, ConnectionOverview, GateAction};
pub use domain::{
    Application, ApplicationStatus, ChatMessage, Connection, ConnectionRequest, Job, JobPosting,
    PairChange, PairState, Profile, RemoteApplication, RemoteReceipt, User, UserCredentials,
    UserPair,
};
pub use error::{ApplicationError, ChatError, ConnectionError, ProfileError};
pub use ports::{DatabaseService, JobSourceService, PairDecision, PortError, PortResult};
pub use profiles::{ProfileDraft, ProfileService};
pub use scoring::{match_score, rank_feed, FeedFilter, ScoredJob};
pub use sync::{SyncEngine, SyncOutcome, SyncResult};
