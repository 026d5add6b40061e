use std::path::PathBuf;
use time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub app_name: String,
    pub public_url: String,
    pub auth: AuthConfig,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub mail_api_url: Option<String>,
    pub mail_api_token: Option<String>,
    pub mail_from: Option<String>,
    pub cache_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub key: String,
    pub token_ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        use base64::{URL_SAFE_NO_PAD, encode_config};

        Self {
            database_path: "taskara.db".into(),
            app_name: "Taskara".to_string(),
            public_url: "http://localhost:3000".to_string(),
            auth: AuthConfig {
                key: encode_config(b"taskara-test-secret", URL_SAFE_NO_PAD),
                token_ttl: Duration::days(7),
                cookie_name: "auth".to_string(),
                cookie_secure: false,
            },
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
            mail_api_url: None,
            mail_api_token: None,
            mail_from: None,
            cache_capacity: 100,
        }
    }
}
