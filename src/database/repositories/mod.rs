//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod category;
pub mod event;
pub mod flag;
pub mod offer;
pub mod participant;
pub mod payment;

// Re-export repositories
pub use category::CategoryRepository;
pub use event::EventRepository;
pub use flag::FlagRepository;
pub use offer::OfferRepository;
pub use participant::{NewParticipant, ParticipantRepository};
pub use payment::PaymentRepository;
