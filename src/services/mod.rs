//! Services module
//!
//! This module contains the registration engine's business logic services

pub mod flags;
pub mod notification;
pub mod offer;
pub mod payment;
pub mod registration;
pub mod token;

// Re-export commonly used services
pub use flags::{FlagAggregate, FlagService};
pub use notification::{
    MessageTemplate, NotificationGateway, NotificationKind, NotificationService, OutboundMessage,
    TracingGateway,
};
pub use offer::OfferService;
pub use payment::{parse_payment_rows, ImportReport, PaymentService};
pub use registration::RegistrationService;
pub use token::{TokenService, ACTIVATION_TOKEN_TYPE};

use std::sync::Arc;

use crate::config::Settings;
use crate::database::{DatabasePool, DatabaseService};

/// Service factory for creating and wiring all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub db: DatabaseService,
    pub offer_service: OfferService,
    pub flag_service: FlagService,
    pub token_service: TokenService,
    pub notification_service: NotificationService,
    pub registration_service: RegistrationService,
    pub payment_service: PaymentService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(
        pool: DatabasePool,
        settings: Settings,
        gateway: Arc<dyn NotificationGateway>,
    ) -> Self {
        let db = DatabaseService::new(pool);

        let offer_service =
            OfferService::new(db.offers.clone(), db.events.clone(), settings.clone());
        let flag_service = FlagService::new(db.flags.clone());
        let token_service = TokenService::new(db.participants.clone(), settings.clone());
        let notification_service = NotificationService::new(gateway);
        let registration_service = RegistrationService::new(
            db.clone(),
            offer_service.clone(),
            flag_service.clone(),
            token_service.clone(),
            notification_service.clone(),
            settings.clone(),
        );
        let payment_service = PaymentService::new(
            db.clone(),
            registration_service.clone(),
            notification_service.clone(),
            settings,
        );

        Self {
            db,
            offer_service,
            flag_service,
            token_service,
            notification_service,
            registration_service,
            payment_service,
        }
    }
}
