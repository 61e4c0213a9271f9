//! Subject and body extraction from raw messages.

use mail_parser::{Message, MessageParser, MimeHeaders, PartType};

/// Subject shown when a message has none.
pub const NO_SUBJECT: &str = "No subject";

/// Display fields derived from a raw message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMail {
    pub subject: String,
    pub body: String,
}

impl ParsedMail {
    /// Parse raw message bytes. Never fails: unparseable input keeps the
    /// default subject and shows the raw bytes as body.
    pub fn parse(raw: &[u8]) -> Self {
        match MessageParser::new().parse(raw) {
            Some(message) => Self {
                subject: subject_of(&message),
                body: body_of(&message),
            },
            None => Self {
                subject: NO_SUBJECT.to_string(),
                body: String::from_utf8_lossy(raw).into_owned(),
            },
        }
    }
}

/// The display subject of a raw message.
pub fn extract_subject(raw: &[u8]) -> String {
    MessageParser::new()
        .parse(raw)
        .map(|message| subject_of(&message))
        .unwrap_or_else(|| NO_SUBJECT.to_string())
}

fn subject_of(message: &Message<'_>) -> String {
    message
        .subject()
        .map(str::to_string)
        .unwrap_or_else(|| NO_SUBJECT.to_string())
}

fn is_multipart(message: &Message<'_>) -> bool {
    matches!(
        message.parts.first().map(|part| &part.body),
        Some(PartType::Multipart(_))
    )
}

/// First `text/plain` part that is not an attachment; the whole decoded
/// payload for single-part mail.
fn body_of(message: &Message<'_>) -> String {
    if !is_multipart(message) {
        return message
            .parts
            .first()
            .map(|part| String::from_utf8_lossy(part.contents()).into_owned())
            .unwrap_or_default();
    }

    for part in &message.parts {
        let PartType::Text(text) = &part.body else {
            continue;
        };

        // Parts without a Content-Type default to text/plain
        let is_plain = part.content_type().map_or(true, |ct| {
            ct.ctype().eq_ignore_ascii_case("text")
                && ct
                    .subtype()
                    .map_or(false, |sub| sub.eq_ignore_ascii_case("plain"))
        });
        let is_attachment = part
            .content_disposition()
            .is_some_and(|cd| cd.ctype().eq_ignore_ascii_case("attachment"));

        if is_plain && !is_attachment {
            return text.to_string();
        }
    }

    String::new()
}
