//! Rendering an email into an SMTP DATA payload.

use outbox_common::Email;

/// Renders RFC-822-style headers and the body into the payload transmitted
/// after DATA: `From`, `To`, `Cc`, `Bcc`, and `Subject` headers with
/// comma-joined address lists, a blank line, then the body.
///
/// Lines are CRLF-delimited and leading dots are stuffed, so the result can
/// be written verbatim ahead of the end-of-data marker.
#[must_use]
pub fn render(email: &Email) -> String {
    let mut out = String::new();

    out.push_str("From: ");
    out.push_str(&email.from().to_string());
    out.push_str("\r\n");
    out.push_str("To: ");
    out.push_str(&email.to().to_string());
    out.push_str("\r\n");
    out.push_str("Cc: ");
    out.push_str(&email.cc().to_string());
    out.push_str("\r\n");
    out.push_str("Bcc: ");
    out.push_str(&email.bcc().to_string());
    out.push_str("\r\n");
    out.push_str("Subject: ");
    out.push_str(&sanitize_header(email.subject()));
    out.push_str("\r\n\r\n");

    for line in email.body().split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }

    out
}

/// Header values must stay on one line; fold any CR/LF into spaces.
fn sanitize_header(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::new(
            "sender@example.com",
            &["a@example.com", "b@example.com"],
            &["c@example.com"],
            &[],
            "greetings",
            "first line\nsecond line",
        )
        .unwrap()
    }

    #[test]
    fn renders_headers_then_blank_line_then_body() {
        let payload = render(&email());
        assert!(payload.starts_with("From: sender@example.com\r\n"));
        assert!(payload.contains("To: a@example.com, b@example.com\r\n"));
        assert!(payload.contains("Cc: c@example.com\r\n"));
        assert!(payload.contains("Bcc: \r\n"));
        assert!(payload.contains("Subject: greetings\r\n\r\nfirst line\r\nsecond line\r\n"));
    }

    #[test]
    fn stuffs_leading_dots() {
        let email = Email::new(
            "sender@example.com",
            &["a@example.com"],
            &[],
            &[],
            "s",
            ".hidden\n..more\nplain",
        )
        .unwrap();
        let payload = render(&email);
        assert!(payload.ends_with("..hidden\r\n...more\r\nplain\r\n"));
    }

    #[test]
    fn folds_newlines_out_of_the_subject() {
        let email = Email::new(
            "sender@example.com",
            &["a@example.com"],
            &[],
            &[],
            "evil\r\nX-Injected: yes",
            "body",
        )
        .unwrap();
        let payload = render(&email);
        assert!(payload.contains("Subject: evil  X-Injected: yes\r\n"));
    }

    #[test]
    fn normalizes_crlf_body_input() {
        let email = Email::new(
            "sender@example.com",
            &["a@example.com"],
            &[],
            &[],
            "s",
            "already\r\nterminated\r\n",
        )
        .unwrap();
        let payload = render(&email);
        assert!(payload.ends_with("already\r\nterminated\r\n\r\n"));
    }
}
