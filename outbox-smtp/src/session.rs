//! The SMTP session: one live, authenticated connection to the submission
//! endpoint, and the capability traits the session pool works with.

use async_trait::async_trait;
use outbox_common::{Email, SmtpConfig, TlsPolicy};
use tracing::debug;

use crate::{
    client::SmtpClient,
    error::{Result, SessionError},
    message,
};

/// One live connection that can deliver emails.
///
/// A transport is exclusively owned by at most one in-flight delivery at a
/// time; after a failed `deliver` it must be treated as unusable and
/// recycled rather than reused.
#[async_trait]
pub trait Transport: Send {
    /// Executes one full delivery: sender, every recipient, then the
    /// message payload.
    async fn deliver(&mut self, email: &Email) -> Result<()>;

    /// Releases the connection. Best-effort and idempotent.
    async fn close(&mut self);
}

/// Opens new transports; the pool uses this to populate and to replace
/// recycled sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Transport>>;
}

/// Opens [`SmtpSession`]s against a fixed endpoint with fixed credentials.
#[derive(Debug, Clone)]
pub struct SmtpConnector {
    config: SmtpConfig,
}

impl SmtpConnector {
    #[must_use]
    pub const fn new(config: SmtpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for SmtpConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>> {
        Ok(Box::new(SmtpSession::open(&self.config).await?))
    }
}

/// An authenticated, (optionally) encrypted SMTP session.
#[derive(Debug)]
pub struct SmtpSession {
    client: SmtpClient,
}

impl SmtpSession {
    /// Dials, negotiates STARTTLS per policy, and authenticates.
    ///
    /// The session is unusable unless all three steps succeed.
    ///
    /// # Errors
    ///
    /// [`SessionError::Connection`] if the endpoint cannot be dialed or
    /// rejects the handshake, [`SessionError::Tls`] if encryption
    /// negotiation fails, [`SessionError::Auth`] if the credentials are
    /// rejected.
    pub async fn open(config: &SmtpConfig) -> Result<Self> {
        let host = config.host();

        let mut client = SmtpClient::connect(&config.addr)
            .await
            .map_err(|e| SessionError::Connection(format!("failed to dial {}: {e}", config.addr)))?;

        let greeting = client
            .greeting()
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        if greeting.code != 220 {
            return Err(SessionError::Connection(format!(
                "unexpected greeting: {} {}",
                greeting.code,
                greeting.message()
            )));
        }

        let mut ehlo = client
            .ehlo(host)
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        if !ehlo.is_positive() {
            return Err(SessionError::Connection(format!(
                "server rejected EHLO: {}",
                ehlo.message()
            )));
        }

        if config.tls == TlsPolicy::Required {
            if ehlo.capability("STARTTLS").is_none() {
                return Err(SessionError::Tls(
                    "server does not advertise STARTTLS".to_owned(),
                ));
            }

            client
                .starttls(host, config.accept_invalid_certs)
                .await
                .map_err(|e| match e {
                    SessionError::Tls(_) => e,
                    other => SessionError::Tls(other.to_string()),
                })?;

            // RFC 3207: the pre-TLS EHLO response no longer applies.
            ehlo = client
                .ehlo(host)
                .await
                .map_err(|e| SessionError::Tls(e.to_string()))?;
            if !ehlo.is_positive() {
                return Err(SessionError::Tls(format!(
                    "server rejected EHLO after STARTTLS: {}",
                    ehlo.message()
                )));
            }
            debug!(server = host, "TLS negotiated");
        }

        if !config.username.is_empty() {
            let reply = client
                .auth_plain(&config.username, &config.password)
                .await
                .map_err(|e| SessionError::Auth(e.to_string()))?;
            if reply.code != 235 {
                return Err(SessionError::Auth(format!(
                    "{} {}",
                    reply.code,
                    reply.message()
                )));
            }
            debug!(server = host, username = %config.username, "authenticated");
        }

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for SmtpSession {
    async fn deliver(&mut self, email: &Email) -> Result<()> {
        let reply = self.client.mail_from(&email.from().to_string()).await?;
        if !reply.is_positive() {
            return Err(SessionError::Smtp {
                code: reply.code,
                message: format!("server rejected MAIL FROM: {}", reply.message()),
            });
        }

        // Each recipient is declared individually; one rejection fails the
        // whole delivery.
        for recipient in email.recipients() {
            let recipient = recipient.to_string();
            let reply = self.client.rcpt_to(&recipient).await?;
            if !reply.is_positive() {
                return Err(SessionError::Smtp {
                    code: reply.code,
                    message: format!("server rejected RCPT TO {recipient}: {}", reply.message()),
                });
            }
        }

        let reply = self.client.data().await?;
        if !reply.is_intermediate() {
            return Err(SessionError::Smtp {
                code: reply.code,
                message: format!("server rejected DATA: {}", reply.message()),
            });
        }

        let reply = self.client.send_payload(&message::render(email)).await?;
        if !reply.is_positive() {
            return Err(SessionError::Smtp {
                code: reply.code,
                message: format!("server rejected message: {}", reply.message()),
            });
        }

        Ok(())
    }

    async fn close(&mut self) {
        // The QUIT reply is irrelevant; the connection drops either way.
        if let Err(e) = self.client.quit().await {
            debug!("QUIT failed while closing session: {e}");
        }
    }
}
