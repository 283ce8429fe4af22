//! SMTP submission sessions: connect, STARTTLS, AUTH, and a single
//! blocking deliver operation per message.

pub mod client;
pub mod error;
pub mod message;
pub mod response;
pub mod session;

pub use client::SmtpClient;
pub use error::{Result, SessionError};
pub use response::Reply;
pub use session::{Connector, SmtpConnector, SmtpSession, Transport};
