/// Email notifications for subscription workflow events
///
/// Sends transactional emails over SMTP in production, or writes them to a
/// directory in development so no mail server is needed locally.
///
/// Email delivery is best-effort throughout: callers log failures and move
/// on, they never roll back the triggering operation.
///
/// # Example
///
/// ```no_run
/// use reviora_shared::email::{EmailConfig, EmailService, EmailTransportConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = EmailService::new(EmailConfig {
///     transport: EmailTransportConfig::File {
///         path: "./emails".to_string(),
///     },
///     from_email: "noreply@reviora.app".to_string(),
///     from_name: "Reviora".to_string(),
/// })?;
///
/// service
///     .send_upgrade_decision("user@example.com", Some("Jane"), "starter", true, None)
///     .await?;
/// # Ok(())
/// # }
/// ```

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::path::Path;

/// Error type for email operations
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// Transport could not be constructed
    #[error("Failed to set up email transport: {0}")]
    Transport(String),

    /// An address did not parse as a mailbox
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message construction failed
    #[error("Failed to build email message: {0}")]
    Message(String),

    /// Delivery failed
    #[error("Failed to send email: {0}")]
    Send(String),
}

/// How outgoing mail is delivered
#[derive(Debug, Clone)]
pub enum EmailTransportConfig {
    /// Real SMTP relay
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        use_tls: bool,
    },

    /// Write .eml files into a directory (development and tests)
    File { path: String },
}

/// Email service configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Delivery transport
    pub transport: EmailTransportConfig,

    /// From address for all outgoing mail
    pub from_email: String,

    /// Display name on the From header
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        EmailConfig {
            transport: EmailTransportConfig::File {
                path: "./emails".to_string(),
            },
            from_email: "noreply@reviora.app".to_string(),
            from_name: "Reviora".to_string(),
        }
    }
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

/// Sends transactional emails for subscription events
pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
}

impl EmailService {
    /// Creates an email service from configuration
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Transport` if the SMTP relay cannot be
    /// constructed or the file transport directory cannot be created
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let transport = match &config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !*use_tls {
                    tracing::warn!("SMTP TLS is disabled, credentials travel in plaintext");
                }

                let builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                        host,
                    ))
                }
                .map_err(|e| EmailError::Transport(format!("SMTP relay setup failed: {}", e)))?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                EmailTransport::Smtp(builder.build())
            }
            EmailTransportConfig::File { path } => {
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| {
                        EmailError::Transport(format!("Cannot create emails directory: {}", e))
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        Ok(Self {
            transport,
            from_email: config.from_email,
            from_name: config.from_name,
        })
    }

    /// Notifies a user that their upgrade request was approved or rejected
    ///
    /// # Errors
    ///
    /// Returns an error when the addresses do not parse or delivery fails.
    /// Callers treat this as best-effort and only log the failure.
    pub async fn send_upgrade_decision(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        requested_plan: &str,
        approved: bool,
        note: Option<&str>,
    ) -> Result<(), EmailError> {
        let subject = if approved {
            format!("Your upgrade to the {} plan is active", requested_plan)
        } else {
            "Your plan upgrade request".to_string()
        };

        let body = upgrade_decision_body(to_name, requested_plan, approved, note);

        self.send(to_email, to_name, &subject, &body).await
    }

    async fn send(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| EmailError::InvalidAddress(format!("from address: {}", e)))?;

        let to = match to_name {
            Some(name) => format!("{} <{}>", name, to_email),
            None => to_email.to_string(),
        }
        .parse::<Mailbox>()
        .map_err(|e| EmailError::InvalidAddress(format!("to address: {}", e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| EmailError::Message(format!("{}", e)))?;

        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message)
                    .await
                    .map_err(|e| EmailError::Send(format!("SMTP: {}", e)))?;
            }
            EmailTransport::File(file) => {
                file.send(message)
                    .await
                    .map_err(|e| EmailError::Send(format!("file transport: {}", e)))?;
            }
        }

        Ok(())
    }
}

fn upgrade_decision_body(
    to_name: Option<&str>,
    requested_plan: &str,
    approved: bool,
    note: Option<&str>,
) -> String {
    let greeting = match to_name {
        Some(name) => format!("Hello {},", name),
        None => "Hello,".to_string(),
    };

    let decision = if approved {
        format!(
            "<p>Good news! Your request to upgrade to the <strong>{}</strong> plan \
             has been approved. The new limits are active now and your usage \
             counters have been reset.</p>",
            requested_plan
        )
    } else {
        format!(
            "<p>Your request to upgrade to the <strong>{}</strong> plan was not \
             approved at this time. You can submit a new request from your \
             subscription settings.</p>",
            requested_plan
        )
    };

    let note_block = match note {
        Some(text) => format!("<p>Note from our team: {}</p>", text),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Plan Upgrade Request</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .footer {{ margin-top: 30px; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <h2>Plan Upgrade Request</h2>

        <p>{greeting}</p>

        {decision}

        {note_block}

        <div class="footer">
            <p>This is an automated message, please do not reply to this email.</p>
        </div>
    </div>
</body>
</html>"#,
        greeting = greeting,
        decision = decision,
        note_block = note_block,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approved_body() {
        let body = upgrade_decision_body(Some("Jane Doe"), "starter", true, None);

        assert!(body.contains("Hello Jane Doe,"));
        assert!(body.contains("starter"));
        assert!(body.contains("has been approved"));
    }

    #[test]
    fn test_rejected_body_with_note() {
        let body = upgrade_decision_body(None, "business", false, Some("Contact billing first."));

        assert!(body.contains("Hello,"));
        assert!(body.contains("was not"));
        assert!(body.contains("Contact billing first."));
    }

    #[test]
    fn test_file_transport_service() {
        let dir = std::env::temp_dir().join("reviora-email-test");
        let service = EmailService::new(EmailConfig {
            transport: EmailTransportConfig::File {
                path: dir.to_string_lossy().to_string(),
            },
            from_email: "noreply@reviora.app".to_string(),
            from_name: "Reviora".to_string(),
        });
        assert!(service.is_ok());
    }
}
