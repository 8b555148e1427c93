//! Test fixtures and service wiring for integration tests

use std::sync::{Arc, Mutex};

use evreg::config::Settings;
use evreg::models::category::CreateCategoryRequest;
use evreg::models::event::{CreateEventRequest, Event};
use evreg::models::flag::{
    CreateFlagCategoryRequest, CreateFlagOfferRequest, CreateFlagRequest, RegistrationFlagOffer,
};
use evreg::models::offer::{CreateOfferRequest, RegistrationOffer};
use evreg::services::{NotificationGateway, OutboundMessage, ServiceFactory};
use evreg::utils::errors::Result;

use super::database_helper::TestDatabase;

/// Gateway that captures outbound messages instead of delivering them
pub struct RecordingGateway {
    pub delivered: Mutex<Vec<OutboundMessage>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.delivered.lock().unwrap().clone()
    }
}

impl NotificationGateway for RecordingGateway {
    fn deliver(&self, message: &OutboundMessage) -> Result<()> {
        self.delivered.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A cleaned database, wired services and the capturing gateway
pub struct TestContext {
    pub db: TestDatabase,
    pub services: ServiceFactory,
    pub gateway: Arc<RecordingGateway>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_settings(Settings::default()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let db = TestDatabase::new().await.expect("test database");
        db.cleanup().await.expect("cleanup");

        let gateway = Arc::new(RecordingGateway::new());
        let services = ServiceFactory::new(db.pool.clone(), settings, gateway.clone());

        Self {
            db,
            services,
            gateway,
        }
    }
}

/// Create an event with a "regular" participant category and one offer
pub async fn seed_offer(
    ctx: &TestContext,
    slug: &str,
    base_capacity: i32,
    full_capacity: i32,
    price: Option<i32>,
    deposit: Option<i32>,
) -> (Event, RegistrationOffer) {
    let event = ctx
        .services
        .db
        .events
        .create(CreateEventRequest {
            slug: format!("{slug}-event"),
            name: format!("{slug} event"),
            start_date_time: None,
            end_date_time: None,
            super_event_id: None,
            series_id: None,
            event_type: Some("camp".to_string()),
            public_on_web: true,
        })
        .await
        .expect("event");

    let category = ctx
        .services
        .db
        .categories
        .create(CreateCategoryRequest {
            slug: format!("{slug}-regular"),
            name: "Regular participant".to_string(),
            category_type: "regular".to_string(),
        })
        .await
        .expect("category");

    let offer = ctx
        .services
        .db
        .offers
        .create(CreateOfferRequest {
            slug: slug.to_string(),
            event_id: event.id,
            category_id: category.id,
            required_offer_id: None,
            start_date_time: None,
            end_date_time: None,
            public_on_web: true,
            base_capacity,
            full_capacity,
            price,
            deposit,
        })
        .await
        .expect("offer");

    (event, offer)
}

/// Attach a flag with one flag offer to an existing registration offer
pub async fn seed_flag_offer(
    ctx: &TestContext,
    offer_id: i64,
    slug: &str,
    min_amount: i32,
    max_amount: Option<i32>,
    base_capacity: i32,
    full_capacity: i32,
    price: Option<i32>,
) -> RegistrationFlagOffer {
    let category = ctx
        .services
        .db
        .flags
        .create_category(CreateFlagCategoryRequest {
            slug: format!("{slug}-category"),
            name: format!("{slug} category"),
            description: None,
        })
        .await
        .expect("flag category");

    let flag = ctx
        .services
        .db
        .flags
        .create_flag(CreateFlagRequest {
            slug: slug.to_string(),
            name: slug.to_string(),
            category_id: category.id,
            price,
            deposit: None,
        })
        .await
        .expect("flag");

    ctx.services
        .db
        .flags
        .create_flag_offer(CreateFlagOfferRequest {
            flag_id: flag.id,
            offer_id,
            public_on_web: true,
            base_capacity,
            full_capacity,
            min_amount,
            max_amount,
        })
        .await
        .expect("flag offer")
}

/// Pull the activation code out of a captured activation message body
pub fn extract_token(message: &OutboundMessage) -> String {
    let tail = message
        .body
        .split("code: ")
        .nth(1)
        .expect("activation body carries a code");
    tail.chars().take_while(|c| c.is_ascii_alphanumeric()).collect()
}
