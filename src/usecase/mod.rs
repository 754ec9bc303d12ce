//! UseCase layer.
//!
//! One usecase per core operation, called from the UI layer and
//! operating on the domain through the `SessionRepository` trait.

pub mod disconnect_participant;
pub mod error;
pub mod join_room;
pub mod leave_room;
pub mod relay_event;
pub mod sync_state;

pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{JoinError, LeaveError, RelayError};
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use relay_event::{RelayEventUseCase, RelayScope};
pub use sync_state::SyncStateUseCase;
