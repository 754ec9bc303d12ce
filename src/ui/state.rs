//! Shared application state.

use std::{sync::Arc, time::Duration};

use crate::domain::SessionRepository;

/// State handed to every handler.
pub struct AppState {
    /// Session store (connection registry + room directory)
    pub repository: Arc<dyn SessionRepository>,
    /// Deadline for the peer-pull sync handshake
    pub sync_timeout: Duration,
}
