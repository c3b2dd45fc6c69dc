//! Infrastructure layer.
//!
//! Concrete implementations of the traits the domain layer defines, the
//! wire DTOs, and the cancellable background task scheduler.

pub mod dto;
pub mod message_pusher;
pub mod repository;
pub mod scheduler;
