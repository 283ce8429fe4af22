//! Low-level SMTP command client over plain TCP or TLS.

use std::{sync::Arc, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
};

use crate::{
    error::{Result, SessionError},
    response::Reply,
};

/// Initial read buffer size.
const BUFFER_SIZE: usize = 4096;

/// Cap on reply size; a server sending more than this is misbehaving.
const MAX_BUFFER_SIZE: usize = 512 * 1024;

/// How long to wait for any single reply.
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
enum Wire {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl Wire {
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Plain(stream) => stream.write_all(data).await?,
            Self::Tls(stream) => stream.write_all(data).await?,
        }
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = match self {
            Self::Plain(stream) => stream.read(buf).await?,
            Self::Tls(stream) => stream.read(buf).await?,
        };
        if n == 0 {
            return Err(SessionError::ConnectionClosed);
        }
        Ok(n)
    }
}

/// A connected SMTP client: sends command lines, reads replies, and can
/// upgrade itself to TLS mid-stream.
#[derive(Debug)]
pub struct SmtpClient {
    wire: Option<Wire>,
    buffer: Vec<u8>,
    filled: usize,
}

impl SmtpClient {
    /// Dials the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the TCP connection fails.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            wire: Some(Wire::Plain(stream)),
            buffer: vec![0; BUFFER_SIZE],
            filled: 0,
        })
    }

    /// Reads the server greeting that precedes any command.
    pub async fn greeting(&mut self) -> Result<Reply> {
        self.reply().await
    }

    /// Sends one command line and reads the reply.
    pub async fn command(&mut self, line: &str) -> Result<Reply> {
        let data = format!("{line}\r\n");
        self.wire_mut()?.write_all(data.as_bytes()).await?;
        self.reply().await
    }

    pub async fn ehlo(&mut self, domain: &str) -> Result<Reply> {
        self.command(&format!("EHLO {domain}")).await
    }

    pub async fn mail_from(&mut self, from: &str) -> Result<Reply> {
        self.command(&format!("MAIL FROM:<{from}>")).await
    }

    pub async fn rcpt_to(&mut self, to: &str) -> Result<Reply> {
        self.command(&format!("RCPT TO:<{to}>")).await
    }

    pub async fn data(&mut self) -> Result<Reply> {
        self.command("DATA").await
    }

    pub async fn quit(&mut self) -> Result<Reply> {
        self.command("QUIT").await
    }

    /// Authenticates with AUTH PLAIN using an initial response
    /// (RFC 4616: `\0user\0password`, base64-encoded).
    pub async fn auth_plain(&mut self, username: &str, password: &str) -> Result<Reply> {
        let token = BASE64.encode(format!("\0{username}\0{password}"));
        self.command(&format!("AUTH PLAIN {token}")).await
    }

    /// Transmits an already-rendered message after a 354 reply to DATA,
    /// terminated by the CRLF-dot-CRLF marker, and reads the final reply.
    ///
    /// The payload must already be CRLF-delimited and dot-stuffed.
    pub async fn send_payload(&mut self, payload: &str) -> Result<Reply> {
        let wire = self.wire_mut()?;
        wire.write_all(payload.as_bytes()).await?;
        if !payload.ends_with("\r\n") {
            wire.write_all(b"\r\n").await?;
        }
        wire.write_all(b".\r\n").await?;
        self.reply().await
    }

    /// Sends STARTTLS and, on a 220 reply, performs the TLS handshake with
    /// the platform trust store.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Tls`] if the server refuses or the handshake
    /// fails.
    pub async fn starttls(&mut self, server_name: &str, accept_invalid_certs: bool) -> Result<()> {
        let reply = self.command("STARTTLS").await?;
        if reply.code != 220 {
            return Err(SessionError::Tls(format!(
                "server refused STARTTLS: {} {}",
                reply.code,
                reply.message()
            )));
        }

        let Some(Wire::Plain(stream)) = self.wire.take() else {
            return Err(SessionError::Tls("connection is already TLS".to_owned()));
        };

        let mut roots = RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for cert in native.certs {
            roots
                .add(cert)
                .map_err(|e| SessionError::Tls(format!("failed to add certificate: {e}")))?;
        }
        if !native.errors.is_empty() {
            tracing::warn!(?native.errors, "some platform certificates could not be loaded");
        }

        let mut config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        if accept_invalid_certs {
            config
                .dangerous()
                .set_certificate_verifier(Arc::new(danger::NoVerifier));
        }

        let name = ServerName::try_from(server_name.to_owned())
            .map_err(|e| SessionError::Tls(format!("invalid server name: {e}")))?;
        let stream = TlsConnector::from(Arc::new(config))
            .connect(name, stream)
            .await
            .map_err(|e| SessionError::Tls(e.to_string()))?;

        self.wire = Some(Wire::Tls(Box::new(stream)));
        // Leftover plaintext bytes must not leak into the TLS session.
        self.filled = 0;
        Ok(())
    }

    fn wire_mut(&mut self) -> Result<&mut Wire> {
        self.wire.as_mut().ok_or(SessionError::ConnectionClosed)
    }

    async fn reply(&mut self) -> Result<Reply> {
        tokio::time::timeout(REPLY_TIMEOUT, self.read_reply())
            .await
            .map_err(|_| SessionError::Timeout)?
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        loop {
            if let Some((reply, consumed)) = Reply::parse(&self.buffer[..self.filled])? {
                self.buffer.copy_within(consumed..self.filled, 0);
                self.filled -= consumed;
                return Ok(reply);
            }

            if self.filled == self.buffer.len() {
                if self.buffer.len() >= MAX_BUFFER_SIZE {
                    return Err(SessionError::Parse(format!(
                        "reply exceeds {MAX_BUFFER_SIZE} bytes"
                    )));
                }
                self.buffer.resize(self.buffer.len() * 2, 0);
            }

            let wire = self.wire.as_mut().ok_or(SessionError::ConnectionClosed)?;
            let n = wire.read(&mut self.buffer[self.filled..]).await?;
            self.filled += n;
        }
    }
}

mod danger {
    //! Certificate verification bypass for self-signed test endpoints.

    use tokio_rustls::rustls::{
        self, DigitallySignedStruct, SignatureScheme,
        client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
        pki_types::{CertificateDer, ServerName, UnixTime},
    };

    #[derive(Debug)]
    pub(super) struct NoVerifier;

    impl ServerCertVerifier for NoVerifier {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn verify_tls13_signature(
            &self,
            _message: &[u8],
            _cert: &CertificateDer<'_>,
            _dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            Ok(HandshakeSignatureValid::assertion())
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            vec![
                SignatureScheme::RSA_PKCS1_SHA256,
                SignatureScheme::RSA_PSS_SHA256,
                SignatureScheme::ECDSA_NISTP256_SHA256,
                SignatureScheme::ED25519,
            ]
        }
    }
}
