//! Domain layer for the session relay.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod factory;
pub mod repository;
pub mod value_object;

pub use entity::{Admission, Participant, Role, Room};
pub use error::{RepositoryError, RoomError, ValueObjectError};
pub use factory::ConnectionIdFactory;
pub use repository::{ConnectionSnapshot, JoinOutcome, LeaveOutcome, SessionRepository};
pub use value_object::{ConnectionId, DisplayName, RoomId, Timestamp};

#[cfg(test)]
pub use repository::MockSessionRepository;
