use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;

/// Content of a signature request email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEmail {
    pub to_email: String,
    pub full_name: String,
    pub session_title: String,
    pub classroom_name: String,
    /// Local start time, already formatted.
    pub starts_at: String,
    /// Local expiry time, already formatted.
    pub expires_at: String,
    pub link: String,
}

impl SignatureEmail {
    pub fn subject_line(&self) -> String {
        format!("Signature requested: {} - KlassFlow", self.session_title)
    }

    pub fn body(&self) -> String {
        format!(
            r#"
Hello {},

Please sign your attendance for "{}" ({}), which started on {}.

Open the link below to sign, or to declare an absence:

{}

This link can be used once and is valid until {}.

---
KlassFlow
"#,
            self.full_name,
            self.session_title,
            self.classroom_name,
            self.starts_at,
            self.link,
            self.expires_at
        )
    }
}

pub struct EmailService {
    mailer: SmtpTransport,
    from_address: String,
    skip_send: bool,
}

impl EmailService {
    pub fn new() -> Result<Self> {
        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .unwrap_or(587);
        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let from_address = env::var("SMTP_FROM_ADDRESS")
            .unwrap_or_else(|_| "noreply@klassflow.local".to_string());
        let skip_send = env::var("SMTP_SKIP_SEND").unwrap_or_default() == "true";

        let mailer = if smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&smtp_host)
                .port(smtp_port)
                .build()
        } else {
            let creds = Credentials::new(smtp_username, smtp_password);
            SmtpTransport::relay(&smtp_host)?
                .port(smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            mailer,
            from_address,
            skip_send,
        })
    }

    /// Sends a signature request. Blocks on SMTP; call from a blocking task.
    pub fn send_signature_request(&self, email: &SignatureEmail) -> Result<()> {
        if self.skip_send {
            return Ok(());
        }
        let message = Message::builder()
            .from(self.from_address.parse()?)
            .to(email.to_email.parse()?)
            .subject(email.subject_line())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body())?;

        self.mailer.send(&message)?;
        Ok(())
    }
}
