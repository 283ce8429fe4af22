//! A scripted SMTP server for exercising session handshakes and deliveries
//! without a real mail endpoint.

use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::Mutex,
};

/// Canned replies, one per SMTP verb.
#[derive(Debug, Clone)]
pub struct Script {
    pub greeting: String,
    /// Full EHLO reply lines, e.g. `["250-mock", "250 AUTH PLAIN"]`.
    pub ehlo: Vec<String>,
    pub auth: String,
    pub mail: String,
    pub rcpt: String,
    /// Recipients whose RCPT TO is answered with a 550 instead of `rcpt`.
    pub reject_recipients: Vec<String>,
    pub data: String,
    pub end_of_data: String,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            greeting: "220 mock.example.com ready".into(),
            ehlo: vec!["250-mock.example.com".into(), "250 AUTH PLAIN".into()],
            auth: "235 2.7.0 accepted".into(),
            mail: "250 sender ok".into(),
            rcpt: "250 recipient ok".into(),
            reject_recipients: Vec::new(),
            data: "354 go ahead".into(),
            end_of_data: "250 queued".into(),
        }
    }
}

/// Everything one connection said to us, in order. `DATA` payloads are
/// recorded as a single `<payload>` entry.
pub type Transcript = Arc<Mutex<Vec<String>>>;

pub struct MockSmtpServer {
    addr: SocketAddr,
    transcript: Transcript,
}

impl MockSmtpServer {
    /// Binds to an ephemeral local port and serves connections until
    /// dropped with the runtime.
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let transcript: Transcript = Arc::default();

        let accept_log = transcript.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(serve(stream, script.clone(), accept_log.clone()));
            }
        });

        Self { addr, transcript }
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    pub async fn transcript(&self) -> Vec<String> {
        self.transcript.lock().await.clone()
    }
}

async fn serve(stream: TcpStream, script: Script, transcript: Transcript) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let _ = write_half
        .write_all(format!("{}\r\n", script.greeting).as_bytes())
        .await;

    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let command = line.trim_end().to_owned();
        transcript.lock().await.push(command.clone());

        let verb = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        let reply = match verb.as_str() {
            "EHLO" | "HELO" => script.ehlo.join("\r\n"),
            "AUTH" => script.auth.clone(),
            "MAIL" => script.mail.clone(),
            "RCPT" => {
                if script
                    .reject_recipients
                    .iter()
                    .any(|addr| command.contains(addr.as_str()))
                {
                    "550 no such user".to_owned()
                } else {
                    script.rcpt.clone()
                }
            }
            "DATA" => {
                let _ = write_half
                    .write_all(format!("{}\r\n", script.data).as_bytes())
                    .await;
                let mut payload = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) => {}
                    }
                    if line.trim_end() == "." {
                        break;
                    }
                    payload.push_str(&line);
                }
                transcript.lock().await.push(format!("<{payload}>"));
                script.end_of_data.clone()
            }
            "QUIT" => {
                let _ = write_half.write_all(b"221 bye\r\n").await;
                break;
            }
            _ => "500 unrecognized command".to_owned(),
        };

        if write_half
            .write_all(format!("{reply}\r\n").as_bytes())
            .await
            .is_err()
        {
            break;
        }
    }
}
