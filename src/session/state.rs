//! Connection lifecycle state

use alloy_primitives::Address;

use crate::domain::resolve::ResolvedName;

/// Why a connection attempt ended in `Failed`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectFailure {
    #[error("no wallet provider is installed")]
    NoProviderInstalled,

    #[error("the connection request was rejected")]
    UserRejected,

    #[error("wallet is unavailable: {0}")]
    Unavailable(String),
}

impl ConnectFailure {
    /// Retrying is pointless until the environment changes (a provider
    /// gets installed); UIs can suppress their retry affordance on this.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ConnectFailure::NoProviderInstalled)
    }
}

/// Wallet session state, owned and mutated only by the controller loop.
/// Consumers read snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected {
        address: Address,
        /// `None` with `resolution_pending: false` means resolution ran to
        /// completion and found nothing, distinct from "still resolving".
        resolved_name: Option<ResolvedName>,
        resolution_pending: bool,
    },
    Failed {
        reason: ConnectFailure,
    },
}

impl ConnectionState {
    pub fn address(&self) -> Option<Address> {
        match self {
            ConnectionState::Connected { address, .. } => Some(*address),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }

    /// Whether the session has stopped moving on its own: failed, idle, or
    /// connected with resolution finished.
    pub fn is_settled(&self) -> bool {
        match self {
            ConnectionState::Disconnected | ConnectionState::Failed { .. } => true,
            ConnectionState::Connecting => false,
            ConnectionState::Connected {
                resolution_pending, ..
            } => !resolution_pending,
        }
    }
}
