//! Configuration for the delivery daemon.
//!
//! Everything is supplied at construction; there is no runtime
//! reconfiguration.

use serde::Deserialize;

const fn default_connection_count() -> usize {
    4
}

/// The SMTP submission endpoint and session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// Endpoint as `host:port`.
    pub addr: String,

    /// AUTH PLAIN username. Leave empty to skip authentication.
    #[serde(default)]
    pub username: String,

    /// AUTH PLAIN password.
    #[serde(default)]
    pub password: String,

    /// Number of pooled sessions; also the cap on concurrent deliveries.
    #[serde(default = "default_connection_count")]
    pub connection_count: usize,

    /// Whether STARTTLS is negotiated when opening a session.
    #[serde(default)]
    pub tls: TlsPolicy,

    /// Accept invalid TLS certificates (for testing with self-signed
    /// certificates only).
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl SmtpConfig {
    /// The host portion of `addr`, used as the TLS server name and the EHLO
    /// argument.
    #[must_use]
    pub fn host(&self) -> &str {
        self.addr
            .rsplit_once(':')
            .map_or(self.addr.as_str(), |(host, _)| host)
    }
}

/// TLS negotiation policy for new sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum TlsPolicy {
    /// STARTTLS must succeed before authentication; failure to negotiate is
    /// a session-creation error.
    #[default]
    Required,

    /// Plaintext session. Only sensible against local test rigs.
    Disabled,
}
