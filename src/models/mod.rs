//! Data models module
//!
//! This module contains all entities and value objects used throughout the
//! registration engine

pub mod amount_range;
pub mod capacity;
pub mod category;
pub mod event;
pub mod flag;
pub mod lifecycle;
pub mod offer;
pub mod participant;
pub mod payment;
pub mod price;

// Re-export commonly used models
pub use amount_range::AmountRange;
pub use capacity::{Capacity, CapacityUsage};
pub use category::{CreateCategoryRequest, ParticipantCategory};
pub use event::{CreateEventRequest, Event, EventTree, UpdateEventRequest};
pub use flag::{
    CreateFlagCategoryRequest, CreateFlagOfferRequest, CreateFlagRequest, FlagOfferView,
    RegistrationFlag, RegistrationFlagCategory, RegistrationFlagOffer,
};
pub use lifecycle::{ActivationState, EntityState};
pub use offer::{CreateOfferRequest, RegistrationOffer, UpdateOfferRequest};
pub use participant::{
    FlagSelection, Participant, ParticipantFlag, ParticipantFlagGroup, ParticipantToken,
    RegistrationRequest,
};
pub use payment::{CreatePaymentRequest, ParticipantPayment, PaymentRow};
pub use price::{Price, PriceTotal};
