//! In-memory store implementations.

mod session;

pub use session::InMemorySessionRepository;
