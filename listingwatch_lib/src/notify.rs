//! Delivery of new-listing notifications.
//!
//! Each recipient is attempted independently; one failure never prevents
//! delivery to the others, and no failure affects persistence.

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use listingwatch_api::Listing;

use crate::config::{EmailConfig, TlsMode, PASSWORD_ENV};

#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    #[error("invalid address {address:?}: {reason}")]
    Address { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("smtp error: {0}")]
    Transport(String),
    #[error("notifier not configured: {0}")]
    NotConfigured(String),
}

/// Outcome of delivering to one recipient.
#[derive(Debug)]
pub struct Delivery {
    pub recipient: String,
    pub result: Result<(), NotifyError>,
}

/// Per-recipient outcomes of one notification.
#[derive(Debug, Default)]
pub struct NotifyReport {
    pub deliveries: Vec<Delivery>,
}

impl NotifyReport {
    pub fn succeeded(&self) -> usize {
        self.deliveries.iter().filter(|d| d.result.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(|d| d.result.is_err())
    }

    /// True when there were recipients and none of them got the message.
    pub fn all_failed(&self) -> bool {
        !self.deliveries.is_empty() && self.succeeded() == 0
    }
}

/// Consumer of the new-listings sequence of a run.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn notify(&self, listings: &[Listing]) -> NotifyReport;
}

/// Sends one plain-text email per recipient over SMTP.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
    subject_prefix: String,
}

impl EmailNotifier {
    pub fn from_config(config: &EmailConfig) -> Result<Self, NotifyError> {
        let from = parse_mailbox(&config.from)?;
        let recipients = config
            .recipients
            .iter()
            .map(|r| parse_mailbox(r))
            .collect::<Result<Vec<_>, _>>()?;

        let host = config.smtp_host.trim();
        let builder = match config.tls {
            TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?,
            TlsMode::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?,
            TlsMode::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };
        let mut builder = builder.port(config.smtp_port);
        if !config.username.is_empty() {
            let password = config.resolve_password().ok_or_else(|| {
                NotifyError::NotConfigured(format!(
                    "no SMTP password for {}; set email.password or {}",
                    config.username, PASSWORD_ENV
                ))
            })?;
            builder = builder.credentials(Credentials::new(config.username.clone(), password));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            recipients,
            subject_prefix: config.subject_prefix.clone(),
        })
    }

    /// Sends a test message to every recipient.
    pub async fn send_test(&self) -> NotifyReport {
        let subject = format!("{}: test notification", self.subject_prefix);
        let body = format!(
            "This is a test message from listingwatch.\n\nSent at {}.\n",
            Local::now().format("%Y-%m-%d %H:%M")
        );
        self.deliver(&subject, &body).await
    }

    async fn deliver(&self, subject: &str, body: &str) -> NotifyReport {
        let mut report = NotifyReport::default();
        for to in &self.recipients {
            let result = self.send_one(to, subject, body).await;
            match &result {
                Ok(()) => tracing::info!("Sent notification to {}", to),
                Err(e) => tracing::error!("Failed to notify {}: {}", to, e),
            }
            report.deliveries.push(Delivery {
                recipient: to.to_string(),
                result,
            });
        }
        report
    }

    async fn send_one(&self, to: &Mailbox, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotifyError::Message(e.to_string()))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }
}

impl Notifier for EmailNotifier {
    async fn notify(&self, listings: &[Listing]) -> NotifyReport {
        let subject = render_subject(&self.subject_prefix, listings.len());
        let body = render_body(listings, Local::now());
        self.deliver(&subject, &body).await
    }
}

/// Writes new listings to the log instead of sending them anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, listings: &[Listing]) -> NotifyReport {
        for listing in listings {
            tracing::info!(
                identifier = %listing.identifier,
                price = listing.display_price(),
                url = %listing.listing_url,
                "New listing: {}",
                listing.display_title()
            );
        }
        NotifyReport {
            deliveries: vec![Delivery {
                recipient: "log".to_string(),
                result: Ok(()),
            }],
        }
    }
}

/// Notifier chosen at startup from configuration.
pub enum AnyNotifier {
    Email(EmailNotifier),
    Log(LogNotifier),
}

impl AnyNotifier {
    /// Email when an `[email]` section exists and `dry_run` is off, else log.
    pub fn from_config(email: Option<&EmailConfig>, dry_run: bool) -> Result<Self, NotifyError> {
        match email {
            Some(config) if !dry_run => Ok(Self::Email(EmailNotifier::from_config(config)?)),
            _ => Ok(Self::Log(LogNotifier)),
        }
    }
}

impl Notifier for AnyNotifier {
    async fn notify(&self, listings: &[Listing]) -> NotifyReport {
        match self {
            Self::Email(n) => n.notify(listings).await,
            Self::Log(n) => n.notify(listings).await,
        }
    }
}

pub fn render_subject(prefix: &str, count: usize) -> String {
    let noun = if count == 1 { "listing" } else { "listings" };
    format!("{}: {} new {}", prefix, count, noun)
}

/// Plain-text body listing each new record in discovery order.
pub fn render_body(listings: &[Listing], checked_at: DateTime<Local>) -> String {
    let mut body = String::new();
    let noun = if listings.len() == 1 { "listing" } else { "listings" };
    let _ = writeln!(body, "{} new {} found:\n", listings.len(), noun);
    for (i, listing) in listings.iter().enumerate() {
        let _ = writeln!(body, "{}. {}", i + 1, listing.display_title());
        let _ = writeln!(body, "   GI#: {}", listing.identifier);
        let _ = writeln!(body, "   Price: {}", listing.display_price());
        let _ = writeln!(body, "   URL: {}", listing.listing_url);
        if let Some(description) = &listing.description {
            let _ = writeln!(body, "   {}", description);
        }
        body.push('\n');
    }
    let _ = writeln!(body, "Checked at {}.", checked_at.format("%Y-%m-%d %H:%M"));
    body
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.trim().parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn listing(id: &str, price: Option<&str>, description: Option<&str>) -> Listing {
        Listing {
            identifier: id.to_string(),
            title: Some(format!("Revolver {}", id)),
            description: description.map(str::to_string),
            price: price.map(str::to_string),
            listing_url: format!("https://www.gunsinternational.com/guns-for-sale-online/{}.cfm", id),
        }
    }

    fn email_config() -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".into(),
            smtp_port: 2525,
            tls: TlsMode::None,
            username: String::new(),
            password: None,
            from: "Watcher <watcher@example.com>".into(),
            recipients: vec!["a@example.com".into(), "b@example.com".into()],
            subject_prefix: "New revolvers".into(),
        }
    }

    #[test]
    fn subject_pluralizes() {
        assert_eq!(render_subject("New listings", 1), "New listings: 1 new listing");
        assert_eq!(render_subject("New listings", 3), "New listings: 3 new listings");
    }

    #[test]
    fn body_lists_records_in_order() {
        let checked_at = Local.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap();
        let listings = vec![
            listing("102", Some("$1,249.99"), Some("Seven shot.")),
            listing("103", None, None),
        ];
        let body = render_body(&listings, checked_at);
        let expected = "\
2 new listings found:

1. Revolver 102
   GI#: 102
   Price: $1,249.99
   URL: https://www.gunsinternational.com/guns-for-sale-online/102.cfm
   Seven shot.

2. Revolver 103
   GI#: 103
   Price: Price not listed
   URL: https://www.gunsinternational.com/guns-for-sale-online/103.cfm

Checked at 2026-10-14 09:30.
";
        assert_eq!(body, expected);
    }

    #[tokio::test]
    async fn email_notifier_builds_from_config() {
        let notifier = EmailNotifier::from_config(&email_config()).unwrap();
        assert_eq!(notifier.recipients.len(), 2);
        assert_eq!(notifier.from.email.to_string(), "watcher@example.com");
    }

    #[test]
    fn bad_recipient_rejected() {
        let mut config = email_config();
        config.recipients.push("not an address".into());
        assert!(matches!(
            EmailNotifier::from_config(&config),
            Err(NotifyError::Address { .. })
        ));
    }

    #[tokio::test]
    async fn dry_run_uses_log() {
        let config = email_config();
        assert!(matches!(
            AnyNotifier::from_config(Some(&config), true),
            Ok(AnyNotifier::Log(_))
        ));
        assert!(matches!(
            AnyNotifier::from_config(None, false),
            Ok(AnyNotifier::Log(_))
        ));
        assert!(matches!(
            AnyNotifier::from_config(Some(&config), false),
            Ok(AnyNotifier::Email(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_fails_each_recipient_independently() {
        let mut config = email_config();
        // Port 9 (discard) is not an SMTP server on CI hosts.
        config.smtp_host = "127.0.0.1".into();
        config.smtp_port = 9;
        let notifier = EmailNotifier::from_config(&config).unwrap();
        let report = notifier.notify(&[listing("1", None, None)]).await;
        assert_eq!(report.deliveries.len(), 2);
        assert!(report.all_failed());
        assert_eq!(report.failures().count(), 2);
    }

    #[tokio::test]
    async fn log_notifier_reports_success() {
        let report = LogNotifier.notify(&[listing("1", None, None)]).await;
        assert_eq!(report.succeeded(), 1);
        assert!(!report.all_failed());
    }
}
