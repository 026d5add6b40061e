use crate::ports::PushSender;
use crate::storage::models;

use serde::{Deserialize, Serialize};
use tracing::warn;

pub(crate) mod vapid;

pub use vapid::{VapidConfigStatus, generate_vapid_credentials, load_vapid_config};

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}

/// Delivery coordinates of one browser push endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

impl From<&models::PushSubscription> for Subscription {
    fn from(row: &models::PushSubscription) -> Self {
        Self {
            endpoint: row.endpoint.clone(),
            p256dh: row.p256dh.clone(),
            auth: row.auth.clone(),
        }
    }
}

/// Message body handed to the service worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub data: PushData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
}

/// Fan a payload out to every subscription of a user.
///
/// Delivery failures are logged per endpoint and never propagated; a dead
/// endpoint must not break the others.
pub async fn send_to_user<S: PushSender>(
    sender: &S,
    user_id: &str,
    subscriptions: &[Subscription],
    payload: &PushPayload,
) -> usize {
    let message = match serde_json::to_string(payload) {
        Ok(message) => message,
        Err(err) => {
            warn!("push delivery error: failed to encode payload ({err})");
            return 0;
        }
    };

    if subscriptions.is_empty() {
        warn!("push delivery warning: no subscriptions for user {user_id}");
        return 0;
    }

    let mut sent = 0;
    for subscription in subscriptions {
        match sender.send(subscription, &message).await {
            Ok(()) => sent += 1,
            Err(err) => {
                warn!("push delivery error: {err} (user {user_id})");
            }
        }
    }
    sent
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct TestSendError;

    impl std::fmt::Display for TestSendError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("test send error")
        }
    }

    #[derive(Clone, Default)]
    struct TestSender {
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl PushSender for TestSender {
        type Error = TestSendError;
        type Fut<'a>
            = std::future::Ready<Result<(), Self::Error>>
        where
            Self: 'a;

        fn send<'a>(&'a self, subscription: &'a Subscription, message: &'a str) -> Self::Fut<'a> {
            self.sent
                .lock()
                .expect("sent lock")
                .push((subscription.endpoint.clone(), message.to_string()));
            std::future::ready(Ok(()))
        }
    }

    fn subscription(endpoint: &str) -> Subscription {
        Subscription {
            endpoint: endpoint.to_string(),
            p256dh: "p256".to_string(),
            auth: "auth".to_string(),
        }
    }

    #[tokio::test]
    async fn send_to_user__should_send_to_every_subscription() {
        // Given
        let sender = TestSender::default();
        let subscriptions = vec![
            subscription("https://push.example/1"),
            subscription("https://push.example/2"),
        ];
        let payload = PushPayload {
            title: "Task assigned".to_string(),
            body: "You were assigned 'Ship the release'.".to_string(),
            data: PushData {
                related_type: Some("task".to_string()),
                related_id: Some("task-7".to_string()),
            },
        };

        // When
        let sent = send_to_user(&sender, "u1", &subscriptions, &payload).await;

        // Then
        assert_eq!(sent, 2);
        let sent_messages = sender.sent.lock().expect("sent lock").clone();
        assert_eq!(sent_messages.len(), 2);
        assert_eq!(sent_messages[0].0, "https://push.example/1");
        assert_eq!(sent_messages[1].0, "https://push.example/2");
    }

    #[tokio::test]
    async fn send_to_user__should_return_zero_without_subscriptions() {
        // Given
        let sender = TestSender::default();
        let payload = PushPayload {
            title: "Hello".to_string(),
            body: "World".to_string(),
            data: PushData::default(),
        };

        // When
        let sent = send_to_user(&sender, "u1", &[], &payload).await;

        // Then
        assert_eq!(sent, 0);
        assert!(sender.sent.lock().expect("sent lock").is_empty());
    }

    #[test]
    fn push_payload__should_serialize_camel_case_data() {
        // Given
        let payload = PushPayload {
            title: "Task assigned".to_string(),
            body: "Details inside.".to_string(),
            data: PushData {
                related_type: Some("project".to_string()),
                related_id: Some("proj-3".to_string()),
            },
        };

        // When
        let json = serde_json::to_value(&payload).expect("serialize payload");

        // Then
        assert_eq!(json["title"], "Task assigned");
        assert_eq!(json["data"]["relatedType"], "project");
        assert_eq!(json["data"]["relatedId"], "proj-3");
    }

    #[test]
    fn push_payload__should_omit_absent_data_fields() {
        // Given
        let payload = PushPayload {
            title: "Heads up".to_string(),
            body: "General notice.".to_string(),
            data: PushData::default(),
        };

        // When
        let json = serde_json::to_value(&payload).expect("serialize payload");

        // Then
        assert!(json["data"].get("relatedType").is_none());
        assert!(json["data"].get("relatedId").is_none());
    }
}
