mod fcm;

use async_trait::async_trait;

use crate::models::notification::PushNotification;

pub use fcm::{FcmError, FcmPushSender};

#[async_trait]
pub trait PushSender: Send + Sync + 'static {
    async fn send(&self, device_token: &str, notification: &PushNotification) -> anyhow::Result<()>;
}

/// Used when no push credentials are configured; every send fails and is logged
/// by the dispatcher like any other delivery failure.
pub struct DisabledPushSender;

#[async_trait]
impl PushSender for DisabledPushSender {
    async fn send(
        &self,
        _device_token: &str,
        _notification: &PushNotification,
    ) -> anyhow::Result<()> {
        anyhow::bail!("push delivery is not configured")
    }
}
