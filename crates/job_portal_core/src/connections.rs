//! crates/job_portal_core/src/connections.rs
//!
//! The connection gate: a request / accept / decline / cancel / remove state
//! machine over unordered user pairs, and the single `is_connected` check every
//! chat entry point consults.
//!
//! Transitions are decided by [`decide`] and applied by the store inside one
//! write transaction per pair, so crossed requests and double accepts cannot
//! produce two connections.

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Connection, ConnectionRequest, PairChange, PairState, UserPair};
use crate::error::ConnectionError;
use crate::ports::{DatabaseService, PairDecision, PortError, PortResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    Request,
    Accept,
    Decline,
    /// The requester takes back their own pending request.
    Cancel,
    Remove,
}

/// Resolves `action` taken by `actor` on `other` against the pair's current state.
pub fn decide(
    state: &PairState,
    actor: Uuid,
    other: Uuid,
    action: GateAction,
) -> Result<PairChange, ConnectionError> {
    use GateAction::*;

    match (action, *state) {
        (Request, PairState::Unconnected) => Ok(PairChange::OpenRequest {
            requester: actor,
            recipient: other,
        }),
        // A request meeting the reverse request is a mutual acceptance.
        (Request, PairState::Pending { requester, .. }) if requester == other => {
            Ok(PairChange::Connect)
        }
        (Request, PairState::Pending { .. }) | (Request, PairState::Connected) => {
            Ok(PairChange::Keep)
        }

        (Accept, PairState::Pending { requester, .. }) if requester == other => {
            Ok(PairChange::Connect)
        }
        (Decline, PairState::Pending { requester, .. }) if requester == other => {
            Ok(PairChange::ClearRequests)
        }
        (Cancel, PairState::Pending { requester, .. }) if requester == actor => {
            Ok(PairChange::ClearRequests)
        }
        (Accept | Decline | Cancel, _) => Err(ConnectionError::NoPendingRequest),

        (Remove, PairState::Connected) => Ok(PairChange::Disconnect),
        (Remove, _) => Err(ConnectionError::NotConnected),
    }
}

/// A user's connections and pending requests.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverview {
    pub connected_user_ids: Vec<Uuid>,
    pub incoming: Vec<ConnectionRequest>,
    pub outgoing: Vec<ConnectionRequest>,
}

pub struct ConnectionGate {
    db: Arc<dyn DatabaseService>,
}

impl ConnectionGate {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// The authorization check for chat. Never true for a user and themselves.
    pub async fn is_connected(&self, a: Uuid, b: Uuid) -> PortResult<bool> {
        match UserPair::new(a, b) {
            Some(pair) => Ok(self.db.get_pair_state(pair).await? == PairState::Connected),
            None => Ok(false),
        }
    }

    /// Runs `action` from `actor` towards `other` and returns the resulting state.
    pub async fn act(
        &self,
        actor: Uuid,
        other: Uuid,
        action: GateAction,
    ) -> Result<PairState, ConnectionError> {
        let pair = UserPair::new(actor, other).ok_or(ConnectionError::SelfConnection)?;

        if action == GateAction::Request {
            self.db.get_user(other).await.map_err(|e| match e {
                PortError::NotFound(_) => ConnectionError::UserNotFound(other),
                e => ConnectionError::Port(e),
            })?;
        }

        let decision: PairDecision =
            Arc::new(move |state: &PairState| decide(state, actor, other, action));
        match self.db.update_pair(pair, decision).await {
            Ok(state) => {
                info!("{:?} from {} to {} left the pair {:?}", action, actor, other, state);
                Ok(state)
            }
            Err(e) => {
                debug!("{:?} from {} to {} refused: {}", action, actor, other, e);
                Err(e)
            }
        }
    }

    pub async fn request(&self, requester: Uuid, recipient: Uuid) -> Result<PairState, ConnectionError> {
        self.act(requester, recipient, GateAction::Request).await
    }

    pub async fn accept(&self, recipient: Uuid, requester: Uuid) -> Result<PairState, ConnectionError> {
        self.act(recipient, requester, GateAction::Accept).await
    }

    pub async fn decline(&self, recipient: Uuid, requester: Uuid) -> Result<PairState, ConnectionError> {
        self.act(recipient, requester, GateAction::Decline).await
    }

    pub async fn cancel(&self, requester: Uuid, recipient: Uuid) -> Result<PairState, ConnectionError> {
        self.act(requester, recipient, GateAction::Cancel).await
    }

    /// Removes the connection along with any stray request between the pair.
    pub async fn remove(&self, user: Uuid, other: Uuid) -> Result<PairState, ConnectionError> {
        self.act(user, other, GateAction::Remove).await
    }

    pub async fn overview(&self, user_id: Uuid) -> PortResult<ConnectionOverview> {
        let connections: Vec<Connection> = self.db.list_connections_for(user_id).await?;
        let requests = self.db.list_requests_for(user_id).await?;

        let (incoming, outgoing): (Vec<_>, Vec<_>) = requests
            .into_iter()
            .partition(|request| request.recipient_id == user_id);

        Ok(ConnectionOverview {
            connected_user_ids: connections
                .iter()
                .filter_map(|c| c.counterpart_for(user_id))
                .collect(),
            incoming,
            outgoing,
        })
    }
}
