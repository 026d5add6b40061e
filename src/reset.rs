use crate::adapters::HttpMailer;
use crate::config::AppConfig;
use crate::password;
use crate::ports::{MailMessage, Mailer};
use crate::storage::{Database, DatabaseError, unix_timestamp};

use base64::{URL_SAFE_NO_PAD, encode_config};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use tracing::{debug, error, warn};

#[derive(Debug)]
pub enum ResetError {
    InvalidToken,
    WeakPassword,
    UserNotFound,
    Hash,
    Mail(String),
    Storage(DatabaseError),
}

impl std::fmt::Display for ResetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetError::InvalidToken => f.write_str("invalid or expired reset token"),
            ResetError::WeakPassword => write!(
                f,
                "password must be at least {} characters",
                password::MIN_PASSWORD_LENGTH
            ),
            ResetError::UserNotFound => f.write_str("user not found"),
            ResetError::Hash => f.write_str("failed to hash password"),
            ResetError::Mail(message) => write!(f, "failed to send reset mail: {message}"),
            ResetError::Storage(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl From<DatabaseError> for ResetError {
    fn from(err: DatabaseError) -> Self {
        ResetError::Storage(err)
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_token: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub enum MailConfigStatus {
    Missing,
    Incomplete,
    Ready(MailConfig),
}

pub fn load_mail_config(config: &AppConfig) -> MailConfigStatus {
    let api_url = config.mail_api_url.as_ref();
    let api_token = config.mail_api_token.as_ref();
    let from = config.mail_from.as_ref();
    let has_any = api_url.is_some() || api_token.is_some() || from.is_some();

    match (api_url, api_token, from) {
        (Some(api_url), Some(api_token), Some(from)) => MailConfigStatus::Ready(MailConfig {
            api_url: api_url.clone(),
            api_token: api_token.clone(),
            from: from.clone(),
        }),
        _ if has_any => MailConfigStatus::Incomplete,
        _ => MailConfigStatus::Missing,
    }
}

fn reset_token_ttl() -> time::Duration {
    time::Duration::hours(1)
}

pub fn generate_reset_token() -> String {
    let mut rng = OsRng;
    generate_reset_token_with_rng(&mut rng)
}

pub(crate) fn generate_reset_token_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    encode_config(bytes, URL_SAFE_NO_PAD)
}

/// Issue a reset token for the account behind `email` and mail out the link.
///
/// An unknown email also reports success so the endpoint cannot be used to
/// probe which addresses have accounts.
pub async fn request_reset(db: &Database, config: &AppConfig, email: &str) -> Result<(), ResetError> {
    match load_mail_config(config) {
        MailConfigStatus::Ready(mail_config) => {
            let mailer = HttpMailer::new(mail_config);
            request_reset_with_mailer(
                db,
                Some(&mailer),
                &config.public_url,
                &config.app_name,
                email,
            )
            .await
        }
        MailConfigStatus::Incomplete => {
            warn!("mail delivery disabled: incomplete mail configuration");
            request_reset_with_mailer::<HttpMailer>(
                db,
                None,
                &config.public_url,
                &config.app_name,
                email,
            )
            .await
        }
        MailConfigStatus::Missing => {
            warn!("mail delivery disabled: no mail configuration; reset link not sent");
            request_reset_with_mailer::<HttpMailer>(
                db,
                None,
                &config.public_url,
                &config.app_name,
                email,
            )
            .await
        }
    }
}

pub(crate) async fn request_reset_with_mailer<M: Mailer>(
    db: &Database,
    mailer: Option<&M>,
    public_url: &str,
    app_name: &str,
    email: &str,
) -> Result<(), ResetError> {
    let Some(user) = db.get_user_by_email(email).await? else {
        debug!("password reset requested for unknown email");
        return Ok(());
    };

    let token = generate_reset_token();
    let expires_at = unix_timestamp() + reset_token_ttl().whole_seconds();
    db.create_reset_token(&token, &user.id, expires_at).await?;

    let link = format!(
        "{}/reset-password?token={token}",
        public_url.trim_end_matches('/')
    );

    if let Some(mailer) = mailer {
        let message = MailMessage {
            to: user.email.clone(),
            subject: format!("{app_name} password reset"),
            body: format!(
                "A password reset was requested for your account.\n\n\
                 Reset your password: {link}\n\n\
                 The link expires in one hour. If you did not request this, \
                 you can ignore this message."
            ),
        };
        mailer.send(&message).await.map_err(|err| {
            error!("failed to send reset mail: {err}");
            ResetError::Mail(err.to_string())
        })?;
    }

    Ok(())
}

/// Consume a reset token and return the owning user id.
///
/// First consumer wins; replays, unknown tokens, and expired tokens all
/// surface as `InvalidToken`.
pub async fn verify_and_consume(db: &Database, token: &str) -> Result<String, ResetError> {
    db.consume_reset_token(token, unix_timestamp())
        .await?
        .ok_or(ResetError::InvalidToken)
}

pub async fn apply_new_password(
    db: &Database,
    user_id: &str,
    new_password: &str,
) -> Result<(), ResetError> {
    if new_password.chars().count() < password::MIN_PASSWORD_LENGTH {
        return Err(ResetError::WeakPassword);
    }

    let password_hash = password::hash_password(new_password).map_err(|err| {
        error!("failed to hash password: {err}");
        ResetError::Hash
    })?;

    if db.update_password(user_id, &password_hash).await? == 0 {
        return Err(ResetError::UserNotFound);
    }

    Ok(())
}

/// Full redemption: validate the password, consume the token, store the hash.
///
/// The length check runs before consumption so a too-short password does not
/// burn the token.
pub async fn redeem(db: &Database, token: &str, new_password: &str) -> Result<String, ResetError> {
    if new_password.chars().count() < password::MIN_PASSWORD_LENGTH {
        return Err(ResetError::WeakPassword);
    }

    let user_id = verify_and_consume(db, token).await?;
    apply_new_password(db, &user_id, new_password).await?;
    Ok(user_id)
}
