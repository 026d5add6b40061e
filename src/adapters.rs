use std::pin::Pin;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::ports;
use crate::push;
use crate::reset;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ports::Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[derive(Clone)]
pub struct WebPushSender {
    vapid: push::VapidConfig,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(vapid: push::VapidConfig) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
        })
    }
}

impl ports::PushSender for WebPushSender {
    type Error = web_push::WebPushError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a push::Subscription, message: &'a str) -> Self::Fut<'a> {
        Box::pin(async move {
            let subscription_info = web_push::SubscriptionInfo::new(
                subscription.endpoint.clone(),
                subscription.p256dh.clone(),
                subscription.auth.clone(),
            );
            let mut builder = web_push::WebPushMessageBuilder::new(&subscription_info)?;
            builder.set_payload(web_push::ContentEncoding::Aes128Gcm, message.as_bytes());
            let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
                &self.vapid.private_key,
                web_push::URL_SAFE_NO_PAD,
                &subscription_info,
            )?;
            signature_builder.add_claim("sub", self.vapid.subject.as_str());
            builder.set_vapid_signature(signature_builder.build()?);
            self.client.send(builder.build()?).await?;
            Ok(())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Request(String),

    #[error("mail API returned status {status}")]
    Api { status: u16 },
}

/// Delivers mail through an HTTP mail API with bearer-token auth.
#[derive(Clone)]
pub struct HttpMailer {
    http: reqwest::Client,
    config: reset::MailConfig,
}

impl HttpMailer {
    pub fn new(config: reset::MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

impl ports::Mailer for HttpMailer {
    type Error = MailError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, message: &'a ports::MailMessage) -> Self::Fut<'a> {
        Box::pin(async move {
            let response = self
                .http
                .post(&self.config.api_url)
                .header(
                    "Authorization",
                    format!("Bearer {}", self.config.api_token),
                )
                .json(&serde_json::json!({
                    "from": self.config.from,
                    "to": message.to,
                    "subject": message.subject,
                    "text": message.body,
                }))
                .send()
                .await
                .map_err(|err| MailError::Request(err.to_string()))?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(MailError::Api {
                    status: status.as_u16(),
                })
            }
        })
    }
}
