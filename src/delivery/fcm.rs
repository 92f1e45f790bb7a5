use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{models::notification::PushNotification, settings::PushSettings};

use super::PushSender;

#[derive(Debug, Error)]
pub enum FcmError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("FCM rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("FCM could not deliver to the device: {0}")]
    Delivery(String),

    #[error("FCM returned an unreadable response: {0}")]
    UnreadableResponse(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    to: &'a str,
    notification: FcmNotification<'a>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    failure: u32,
    #[serde(default)]
    results: Vec<FcmResult>,
}

#[derive(Debug, Deserialize)]
struct FcmResult {
    error: Option<String>,
}

impl FcmResponse {
    fn parse(body: &str) -> Result<(), FcmError> {
        serde_json::from_str::<FcmResponse>(body)?.into_result()
    }

    fn into_result(self) -> Result<(), FcmError> {
        if self.failure == 0 {
            return Ok(());
        }

        let error = self
            .results
            .into_iter()
            .find_map(|result| result.error)
            .unwrap_or_else(|| "unknown error".to_owned());
        Err(FcmError::Delivery(error))
    }
}

/// Sends notifications through the FCM HTTP send endpoint.
pub struct FcmPushSender {
    client: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl FcmPushSender {
    pub fn new(settings: &PushSettings, server_key: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("failed to build FCM HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            server_key: server_key.into(),
        })
    }

    async fn send_message(&self, message: &FcmMessage<'_>) -> Result<(), FcmError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, format!("key={}", self.server_key))
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FcmError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        FcmResponse::parse(&body)
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    async fn send(
        &self,
        device_token: &str,
        notification: &PushNotification,
    ) -> anyhow::Result<()> {
        let message = FcmMessage {
            to: device_token,
            notification: FcmNotification {
                title: &notification.title,
                body: &notification.body,
            },
        };

        self.send_message(&message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_has_legacy_send_shape() {
        let message = FcmMessage {
            to: "tok1",
            notification: FcmNotification {
                title: "Habit Reminder",
                body: "Don't forget your streak!",
            },
        };

        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "to": "tok1",
                "notification": { "title": "Habit Reminder", "body": "Don't forget your streak!" }
            })
        );
    }

    #[test]
    fn per_device_error_is_a_failure() {
        let response: FcmResponse = serde_json::from_str(
            r#"{"multicast_id":1,"success":0,"failure":1,"results":[{"error":"NotRegistered"}]}"#,
        )
        .unwrap();

        match response.into_result() {
            Err(FcmError::Delivery(error)) => assert_eq!(error, "NotRegistered"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn success_response_is_ok() {
        let response: FcmResponse = serde_json::from_str(
            r#"{"multicast_id":1,"success":1,"failure":0,"results":[{"message_id":"m1"}]}"#,
        )
        .unwrap();

        assert!(response.into_result().is_ok());
    }

    #[test]
    fn unreadable_success_body_is_a_failure() {
        assert!(matches!(
            FcmResponse::parse("<html>502 Bad Gateway</html>"),
            Err(FcmError::UnreadableResponse(_))
        ));
        assert!(FcmResponse::parse(r#"{"success":1,"failure":0}"#).is_ok());
    }

    #[tokio::test]
    async fn disabled_sender_always_fails() {
        let notification = PushNotification::from_template(None);
        let result = crate::delivery::DisabledPushSender
            .send("tok", &notification)
            .await;
        assert!(result.is_err());
    }
}
