//! Database service layer
//!
//! Aggregates all repositories over one connection pool; the persistence
//! facade the engine services call into.

use crate::database::{
    CategoryRepository, DatabasePool, EventRepository, FlagRepository, OfferRepository,
    ParticipantRepository, PaymentRepository,
};

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub events: EventRepository,
    pub categories: CategoryRepository,
    pub offers: OfferRepository,
    pub flags: FlagRepository,
    pub participants: ParticipantRepository,
    pub payments: PaymentRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            categories: CategoryRepository::new(pool.clone()),
            offers: OfferRepository::new(pool.clone()),
            flags: FlagRepository::new(pool.clone()),
            participants: ParticipantRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool),
        }
    }
}
