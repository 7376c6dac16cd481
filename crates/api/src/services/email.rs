//! Email service for purchase confirmations and welcome messages.
//!
//! Uses SMTP via lettre for delivery with Askama HTML templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::services::notifications::{Mailer, PurchaseReceipt};

/// Fields shared by both purchase confirmation templates.
struct ReceiptView<'a> {
    customer_name: &'a str,
    movie_title: &'a str,
    genre: &'a str,
    duration: String,
    quantity: i32,
    total: String,
    status: &'a str,
    purchase_id: String,
    purchased_at: String,
}

impl<'a> ReceiptView<'a> {
    fn new(receipt: &'a PurchaseReceipt) -> Self {
        Self {
            customer_name: &receipt.customer_name,
            movie_title: &receipt.movie_title,
            genre: &receipt.movie_genre,
            duration: format_duration(receipt.movie_duration_min),
            quantity: receipt.purchase.quantity,
            total: receipt.purchase.total_amount.to_string(),
            status: receipt.purchase.status.as_str(),
            purchase_id: receipt.purchase.id.to_string(),
            purchased_at: receipt
                .purchase
                .created_at
                .format("%Y-%m-%d %H:%M UTC")
                .to_string(),
        }
    }
}

/// HTML template for purchase confirmation email.
#[derive(Template)]
#[template(path = "email/purchase_confirmation.html")]
struct PurchaseConfirmationHtml<'a> {
    r: &'a ReceiptView<'a>,
}

/// Plain text template for purchase confirmation email.
#[derive(Template)]
#[template(path = "email/purchase_confirmation.txt")]
struct PurchaseConfirmationText<'a> {
    r: &'a ReceiptView<'a>,
}

/// HTML template for welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
}

/// Plain text template for welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
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

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
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
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

impl Mailer for EmailService {
    async fn send_purchase_confirmation(&self, receipt: &PurchaseReceipt) -> Result<(), EmailError> {
        let (subject, text, html) = render_purchase_confirmation(receipt)?;
        self.send_multipart_email(receipt.customer_email.as_str(), &subject, text, html)
            .await
    }

    async fn send_welcome(&self, to: &str, first_name: &str) -> Result<(), EmailError> {
        let (subject, text, html) = render_welcome(first_name)?;
        self.send_multipart_email(to, subject, text, html).await
    }
}

/// Render subject, text and HTML bodies for a purchase confirmation.
fn render_purchase_confirmation(
    receipt: &PurchaseReceipt,
) -> Result<(String, String, String), EmailError> {
    let view = ReceiptView::new(receipt);
    let html = PurchaseConfirmationHtml { r: &view }.render()?;
    let text = PurchaseConfirmationText { r: &view }.render()?;
    let subject = format!("Your tickets for {}", receipt.movie_title);
    Ok((subject, text, html))
}

/// Render subject, text and HTML bodies for a welcome email.
fn render_welcome(first_name: &str) -> Result<(&'static str, String, String), EmailError> {
    let html = WelcomeEmailHtml { name: first_name }.render()?;
    let text = WelcomeEmailText { name: first_name }.render()?;
    Ok(("Welcome to Marquee", text, html))
}

/// "2h 15m", "45m" or "3h".
fn format_duration(minutes: i32) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}
