//! Customer contact messages to the shop inbox.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use planbe_core::{CoreError, UserId};

use super::ShopError;
use super::email::{Notification, Notifier};
use crate::db::users::UserRepository;

const MAX_SUBJECT_LENGTH: usize = 200;
const MAX_MESSAGE_LENGTH: usize = 5000;

/// Contact form.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactMessage {
    pub subject: String,
    /// Message body. The web client posts it as `textarea`.
    #[serde(alias = "textarea")]
    pub message: String,
}

impl ContactMessage {
    fn normalized(self) -> Result<Self, CoreError> {
        let subject = self.subject.trim().to_owned();
        let message = self.message.trim().to_owned();

        if subject.is_empty() {
            return Err(CoreError::invalid("subject", "must not be blank"));
        }
        if subject.chars().count() > MAX_SUBJECT_LENGTH {
            return Err(CoreError::invalid(
                "subject",
                format!("must be at most {MAX_SUBJECT_LENGTH} characters"),
            ));
        }
        if message.is_empty() {
            return Err(CoreError::invalid("message", "must not be blank"));
        }
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(CoreError::invalid(
                "message",
                format!("must be at most {MAX_MESSAGE_LENGTH} characters"),
            ));
        }

        Ok(Self { subject, message })
    }
}

/// Forward a customer's message to the shop, with reply-to set to the customer.
///
/// Unlike post-commit notifications, a delivery failure is returned: the
/// message is the whole point of the request.
///
/// # Errors
///
/// - `CoreError::Invalid` for a blank or oversized subject or message.
/// - `CoreError::NotFound` for an unknown user.
/// - `ShopError::Email` if the message could not be sent.
#[instrument(skip(pool, notifier, form), fields(user_id = %user))]
pub async fn send<N: Notifier>(
    pool: &PgPool,
    notifier: &N,
    user: &UserId,
    form: ContactMessage,
) -> Result<(), ShopError> {
    let form = form.normalized()?;
    let customer = UserRepository::new(pool)
        .get_by_id(user)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("user {user}")))?;

    let name = customer.full_name();
    notifier
        .send(Notification::Contact {
            reply_to: customer.email,
            name,
            username: customer.username,
            subject: form.subject,
            message: form.message,
        })
        .await?;

    tracing::info!("Contact message sent");
    Ok(())
}
