//! SMTP reply parsing.

use crate::error::{Result, SessionError};

/// A complete, possibly multi-line SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// The three-digit status code.
    pub code: u16,
    /// The text of each line, without code and separator.
    pub lines: Vec<String>,
}

impl Reply {
    /// 2xx: the command completed.
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    /// 3xx: the server expects more input (354 after DATA).
    #[must_use]
    pub const fn is_intermediate(&self) -> bool {
        self.code >= 300 && self.code < 400
    }

    /// The reply text, lines joined with newlines.
    #[must_use]
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }

    /// Looks up an EHLO capability by its leading keyword and returns the
    /// rest of that line (empty for bare keywords such as `STARTTLS`).
    #[must_use]
    pub fn capability(&self, keyword: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| {
            let (head, rest) = line
                .split_once(' ')
                .map_or((line.as_str(), ""), |(head, rest)| (head, rest));
            head.eq_ignore_ascii_case(keyword).then_some(rest)
        })
    }

    /// Tries to parse one complete reply from the start of `buffer`.
    ///
    /// Returns the reply and the number of bytes consumed, or `None` if the
    /// buffer does not yet hold a complete reply.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Parse`] on lines that are not
    /// `code[- ]text`, or on code changes within a multi-line reply.
    pub fn parse(buffer: &[u8]) -> Result<Option<(Self, usize)>> {
        let text = std::str::from_utf8(buffer)?;

        let mut consumed = 0;
        let mut code = None;
        let mut lines = Vec::new();

        loop {
            let rest = &text[consumed..];
            let Some(end) = rest.find('\n') else {
                return Ok(None);
            };
            let raw = rest[..end].trim_end_matches('\r');
            consumed += end + 1;

            if raw.len() < 3 || !raw.is_char_boundary(3) {
                return Err(SessionError::Parse(format!("reply line too short: {raw:?}")));
            }
            let line_code = raw[..3]
                .parse::<u16>()
                .map_err(|_| SessionError::Parse(format!("invalid status code in {raw:?}")))?;

            match code {
                None => code = Some(line_code),
                Some(expected) if expected != line_code => {
                    return Err(SessionError::Parse(format!(
                        "status code changed mid-reply: {expected} then {line_code}"
                    )));
                }
                Some(_) => {}
            }

            let (is_last, message) = match raw.as_bytes().get(3) {
                None => (true, ""),
                Some(b' ') => (true, &raw[4..]),
                Some(b'-') => (false, &raw[4..]),
                Some(other) => {
                    return Err(SessionError::Parse(format!(
                        "invalid separator {:?} in {raw:?}",
                        char::from(*other)
                    )));
                }
            };
            lines.push(message.to_owned());

            if is_last {
                return Ok(Some((
                    Self {
                        code: line_code,
                        lines,
                    },
                    consumed,
                )));
            }
        }
    }
}
