//! Repository implementations.
//!
//! The domain layer defines the `SessionRepository` trait; this module
//! provides the concrete stores. The usecase layer depends on the trait,
//! not on these implementations.

pub mod inmemory;

pub use inmemory::InMemorySessionRepository;
