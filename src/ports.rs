mod clock;
mod mail;
mod push;

pub use clock::Clock;
pub use mail::{MailMessage, Mailer};
pub use push::PushSender;
