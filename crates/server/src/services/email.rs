//! Transactional email: registration, account updates, contact messages and
//! order confirmations.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and plain-text templates.
//! Handlers never talk to SMTP directly: they hand a [`Notification`] to a
//! [`Notifier`], which [`EmailService`] implements.

use std::future::Future;

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use planbe_core::{Email, OrderConfirmation};

use crate::config::EmailConfig;

#[derive(Template)]
#[template(path = "email/registration.html")]
struct RegistrationHtml<'a> {
    name: &'a str,
    username: &'a str,
}

#[derive(Template)]
#[template(path = "email/registration.txt")]
struct RegistrationText<'a> {
    name: &'a str,
    username: &'a str,
}

#[derive(Template)]
#[template(path = "email/account_updated.html")]
struct AccountUpdatedHtml<'a> {
    name: &'a str,
    username: &'a str,
}

#[derive(Template)]
#[template(path = "email/account_updated.txt")]
struct AccountUpdatedText<'a> {
    name: &'a str,
    username: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact.html")]
struct ContactHtml<'a> {
    name: &'a str,
    username: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact.txt")]
struct ContactText<'a> {
    name: &'a str,
    username: &'a str,
    email: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmed.html")]
struct OrderConfirmedHtml<'a> {
    order: &'a OrderConfirmation,
}

#[derive(Template)]
#[template(path = "email/order_confirmed.txt")]
struct OrderConfirmedText<'a> {
    order: &'a OrderConfirmation,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A message the shop sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Sent after a successful sign-up.
    Registration {
        to: Email,
        name: String,
        username: String,
    },
    /// Sent after a profile or password change.
    AccountUpdated {
        to: Email,
        name: String,
        username: String,
    },
    /// A customer message for the shop inbox.
    Contact {
        reply_to: Email,
        name: String,
        username: String,
        subject: String,
        message: String,
    },
    /// Sent once an order has its delivery details.
    OrderConfirmed(OrderConfirmation),
}

impl Notification {
    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Registration { .. } => "registration",
            Self::AccountUpdated { .. } => "account_updated",
            Self::Contact { .. } => "contact",
            Self::OrderConfirmed(_) => "order_confirmed",
        }
    }

    /// Render subject and bodies.
    ///
    /// Contact messages go to `shop_inbox`; everything else goes to the
    /// customer and is eligible for the configured BCC.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if a template fails to render.
    pub fn render(&self, shop_inbox: &str) -> Result<RenderedEmail, EmailError> {
        let rendered = match self {
            Self::Registration { to, name, username } => RenderedEmail {
                to: to.to_string(),
                reply_to: None,
                customer_facing: true,
                subject: "Sign up completed".to_owned(),
                text: RegistrationText { name, username }.render()?,
                html: RegistrationHtml { name, username }.render()?,
            },
            Self::AccountUpdated { to, name, username } => RenderedEmail {
                to: to.to_string(),
                reply_to: None,
                customer_facing: true,
                subject: "Account updated".to_owned(),
                text: AccountUpdatedText { name, username }.render()?,
                html: AccountUpdatedHtml { name, username }.render()?,
            },
            Self::Contact {
                reply_to,
                name,
                username,
                subject,
                message,
            } => {
                let email = reply_to.as_str();
                RenderedEmail {
                    to: shop_inbox.to_owned(),
                    reply_to: Some(email.to_owned()),
                    customer_facing: false,
                    subject: subject.clone(),
                    text: ContactText {
                        name,
                        username,
                        email,
                        message,
                    }
                    .render()?,
                    html: ContactHtml {
                        name,
                        username,
                        email,
                        subject,
                        message,
                    }
                    .render()?,
                }
            }
            Self::OrderConfirmed(order) => RenderedEmail {
                to: order.email.to_string(),
                reply_to: None,
                customer_facing: true,
                subject: "Order completed!".to_owned(),
                text: OrderConfirmedText { order }.render()?,
                html: OrderConfirmedHtml { order }.render()?,
            },
        };
        Ok(rendered)
    }
}

/// A rendered message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub to: String,
    pub reply_to: Option<String>,
    pub customer_facing: bool,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivers notifications.
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    fn send(&self, notification: Notification)
    -> impl Future<Output = Result<(), EmailError>> + Send;
}

/// Send a notification after the triggering write has committed.
///
/// Failures are logged and reported to Sentry but never returned: the
/// customer's request already succeeded.
pub async fn deliver<N: Notifier>(notifier: &N, notification: Notification) {
    let kind = notification.kind();
    if let Err(err) = notifier.send(notification).await {
        let event_id = sentry::capture_error(&err);
        tracing::error!(
            error = %err,
            notification = kind,
            sentry_event_id = %event_id,
            "Failed to send notification"
        );
    }
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    shop_inbox: String,
    bcc: Option<String>,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            shop_inbox: config.shop_inbox.clone(),
            bcc: config.bcc.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(&self, email: RenderedEmail) -> Result<(), EmailError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.from_address)?)
            .to(parse_mailbox(&email.to)?)
            .subject(&email.subject);

        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(parse_mailbox(reply_to)?);
        }
        if email.customer_facing
            && let Some(bcc) = &self.bcc
        {
            builder = builder.bcc(parse_mailbox(bcc)?);
        }

        let message = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.text),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(email.html),
                ),
        )?;

        self.mailer.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

impl Notifier for EmailService {
    async fn send(&self, notification: Notification) -> Result<(), EmailError> {
        let email = notification.render(&self.shop_inbox)?;
        self.send_multipart_email(email).await
    }
}

fn parse_mailbox(address: &str) -> Result<lettre::message::Mailbox, EmailError> {
    address
        .parse()
        .map_err(|_| EmailError::InvalidAddress(address.to_string()))
}
