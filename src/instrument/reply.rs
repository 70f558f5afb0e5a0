//! Reply framing and parsing.

use std::fmt;

const STX: char = '\u{2}';
const ETX: char = '\u{3}';

/// Which framing characters surround a reply line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplyFraming {
    /// Reply terminator byte; reading stops once it arrives
    pub terminator: u8,
    /// Strip a leading STX / trailing ETX pair
    pub strip_stx_etx: bool,
    /// Drop a two-digit network address prefix (Aladdin pumps answer "00S")
    pub strip_address: bool,
}

impl ReplyFraming {
    /// Plain line ending in `terminator`.
    pub fn line(terminator: u8) -> Self {
        Self {
            terminator,
            strip_stx_etx: false,
            strip_address: false,
        }
    }

    /// Also strip STX/ETX.
    pub fn with_stx_etx(mut self) -> Self {
        self.strip_stx_etx = true;
        self
    }

    /// Also drop the two-digit address.
    pub fn with_address_prefix(mut self) -> Self {
        self.strip_address = true;
        self
    }

    /// Remove framing from a raw reply and return the payload text.
    pub fn strip(&self, raw: &str) -> String {
        let mut text = raw.trim_matches(|c: char| c == '\r' || c == '\n' || c.is_whitespace());
        if self.strip_stx_etx {
            text = text.trim_start_matches(STX).trim_end_matches(ETX);
        }
        if self.strip_address && text.len() >= 2 && text.as_bytes()[..2].iter().all(u8::is_ascii_digit) {
            text = &text[2..];
        }
        text.trim().to_string()
    }
}

/// A parsed instrument reply
///
/// Either a leading numeric value (NAMUR readings such as `"25.4 2"`) or a
/// leading status code (`"S"`, `"Position"`), followed by optional text.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusReply {
    raw: String,
    value: Option<f64>,
    code: Option<String>,
    text: Option<String>,
}

impl StatusReply {
    /// Parse an already de-framed reply line.
    pub fn parse(line: &str) -> Self {
        let raw = line.trim().to_string();
        let (head, tail) = match raw.split_once(char::is_whitespace) {
            Some((head, tail)) => (head, tail.trim()),
            None => (raw.as_str(), ""),
        };
        let text = (!tail.is_empty()).then(|| tail.to_string());

        // "INF" is a pump direction, not infinity
        let numeric = head.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
        let (value, code) = match head.parse::<f64>() {
            Ok(v) if numeric => (Some(v), None),
            _ if head.is_empty() => (None, None),
            _ => (None, Some(head.to_string())),
        };

        Self {
            raw: raw.clone(),
            value,
            code,
            text,
        }
    }

    /// The de-framed reply line.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Leading numeric value.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Leading status token when the reply is not numeric.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Text after the first token, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// True for an empty reply line.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Prefix test on the de-framed line.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.raw.starts_with(prefix)
    }

    /// The last run of ASCII digits in the reply, e.g. 5 in `"Position is = 5"`.
    pub fn trailing_integer(&self) -> Option<i64> {
        let trimmed = self.raw.trim_end_matches(|c: char| !c.is_ascii_digit());
        let start = trimmed
            .rfind(|c: char| !c.is_ascii_digit())
            .map_or(0, |i| i + 1);
        trimmed[start..].parse().ok()
    }
}

impl fmt::Display for StatusReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_pump_framing() {
        let framing = ReplyFraming::line(0x03).with_stx_etx().with_address_prefix();
        assert_eq!(framing.strip("\u{2}00SNE1000V3.930\u{3}"), "SNE1000V3.930");
        assert_eq!(framing.strip("\u{2}01I\u{3}"), "I");
    }

    #[test]
    fn test_strip_line_only() {
        let framing = ReplyFraming::line(b'\n');
        assert_eq!(framing.strip("21.5 2\r\n"), "21.5 2");
        // Digits are payload when no address prefix is expected
        assert_eq!(framing.strip("12.0 4\r\n"), "12.0 4");
    }

    #[test]
    fn test_parse_numeric_reply() {
        let reply = StatusReply::parse("25.4 2");
        assert_eq!(reply.value(), Some(25.4));
        assert_eq!(reply.code(), None);
        assert_eq!(reply.text(), Some("2"));
    }

    #[test]
    fn test_parse_status_code() {
        let reply = StatusReply::parse("S");
        assert_eq!(reply.code(), Some("S"));
        assert_eq!(reply.value(), None);
        assert_eq!(reply.text(), None);
        assert!(reply.starts_with("S"));

        let reply = StatusReply::parse("INF");
        assert_eq!(reply.value(), None);
        assert_eq!(reply.code(), Some("INF"));
    }

    #[test]
    fn test_trailing_integer() {
        assert_eq!(StatusReply::parse("Position is = 5").trailing_integer(), Some(5));
        assert_eq!(StatusReply::parse("CP10").trailing_integer(), Some(10));
        assert_eq!(StatusReply::parse("NP = 10 ").trailing_integer(), Some(10));
        assert_eq!(StatusReply::parse("BUSY").trailing_integer(), None);
    }

    #[test]
    fn test_empty_reply() {
        let reply = StatusReply::parse("   ");
        assert!(reply.is_empty());
        assert_eq!(reply.code(), None);
        assert_eq!(reply.value(), None);
    }
}
