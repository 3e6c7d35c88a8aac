pub mod app_config;
pub mod database;
pub mod events;
pub mod notification_repo;
pub mod redis_repo;
pub mod request_repo;

pub use database::DbClient;
pub use events::EventProducer;
pub use notification_repo::StoreNotificationRepository;
pub use redis_repo::RedisClient;
pub use request_repo::StoreFlightRequestRepository;
