use async_trait::async_trait;
use sqlx::PgPool;

use jetvision_core::notification::Notification;
use jetvision_core::repository::NotificationRepository;
use jetvision_core::BoxError;

pub struct StoreNotificationRepository {
    pool: PgPool,
}

impl StoreNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for StoreNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<(), BoxError> {
        sqlx::query(
            "INSERT INTO notifications (id, request_id, recipient_role, kind, message, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(notification.id)
        .bind(notification.request_id)
        .bind(notification.recipient_role.as_str())
        .bind(&notification.kind)
        .bind(&notification.message)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
