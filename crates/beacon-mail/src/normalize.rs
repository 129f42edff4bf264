use crate::inbox::{PartKind, RawMessage};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use beacon_core::NormalizedMessage;
use chrono::{SecondsFormat, Utc};
use mailparse::{parse_mail, MailHeaderMap, ParsedMail};
use regex::Regex;

pub const SENDER_DISPLAY_LIMIT: usize = 20;
pub const SUBJECT_DISPLAY_LIMIT: usize = 20;
pub const PREVIEW_DISPLAY_LIMIT: usize = 30;

const BODY_CONTAINER_STYLE: &str =
    "font-family: Arial, sans-serif; color: #202124; line-height: 1.5; padding: 12px;";
const LINK_STYLE: &str = "color: #1a73e8; text-decoration: none;";

/// Why one message was dropped from the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The fetch returned no header part; nothing to display.
    MissingHeader,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingHeader => write!(f, "missing header part"),
        }
    }
}

/// Normalize a whole fetched batch. Failed messages are logged and dropped;
/// survivors keep mailbox order within the unread-first partition.
pub fn normalize_batch(batch: &[RawMessage]) -> Vec<NormalizedMessage> {
    let mut messages = Vec::with_capacity(batch.len());
    for (index, raw) in batch.iter().enumerate() {
        match normalize_message(raw, index) {
            Ok(message) => messages.push(message),
            Err(reason) => {
                tracing::warn!(sequence = index, %reason, "skipping inbox message");
            }
        }
    }

    sort_unread_first(&mut messages);
    messages
}

/// Unread records precede read ones; relative order within each group is
/// preserved. Deliberately not a date sort.
pub fn sort_unread_first(messages: &mut [NormalizedMessage]) {
    messages.sort_by_key(|message| !message.is_unread);
}

/// Convert one raw message into its display record. The only unrecoverable
/// condition is a missing header part; everything else degrades to defaults
/// or the plain-text fallback.
pub fn normalize_message(
    raw: &RawMessage,
    sequence_id: usize,
) -> Result<NormalizedMessage, SkipReason> {
    let header = raw.part(PartKind::Header).ok_or(SkipReason::MissingHeader)?;
    let fields = parse_header_fields(&header.bytes);

    let sender_raw = fields.from.unwrap_or_else(|| "Unknown".to_string());
    let subject_full = fields.subject.unwrap_or_else(|| "No Subject".to_string());
    let received_at = fields
        .date
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

    let (renderable_body, is_html) = match raw.body_part() {
        Some(part) => assemble_body(&part.bytes),
        None => (String::new(), false),
    };

    let preview_full = strip_markup(&renderable_body);
    let sender_full = clean_sender(&sender_raw);

    Ok(NormalizedMessage {
        sequence_id,
        sender_display: truncate_display(&sender_full, SENDER_DISPLAY_LIMIT),
        sender_full,
        subject_display: truncate_display(&subject_full, SUBJECT_DISPLAY_LIMIT),
        subject_full,
        preview_display: truncate_display(&preview_full, PREVIEW_DISPLAY_LIMIT),
        preview_full,
        received_at,
        is_unread: !raw.seen,
        renderable_body,
        is_html,
    })
}

struct HeaderFields {
    from: Option<String>,
    subject: Option<String>,
    date: Option<String>,
}

/// `from`, `subject` and `date` are each absent or a single value; repeated
/// headers beyond the first are ignored.
fn parse_header_fields(bytes: &[u8]) -> HeaderFields {
    match mailparse::parse_headers(bytes) {
        Ok((headers, _)) => HeaderFields {
            from: headers.get_first_value("From"),
            subject: headers.get_first_value("Subject"),
            date: headers.get_first_value("Date"),
        },
        Err(err) => {
            tracing::debug!("unparseable header block: {err}");
            HeaderFields {
                from: None,
                subject: None,
                date: None,
            }
        }
    }
}

/// Build the renderable HTML fragment from the raw body part.
///
/// The flag is true whenever a body was assembled, including the
/// parse-failure fallback, which stays flagged as HTML even though its
/// content is plain text with line breaks inserted.
fn assemble_body(bytes: &[u8]) -> (String, bool) {
    let parsed = match parse_mail(bytes) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::debug!("mime parse failed, falling back to raw text: {err}");
            return (fallback_body(bytes), true);
        }
    };

    let mut body = if let Some(html) = extract_html_body(&parsed) {
        wrap_in_container(&ammonia::clean(&html))
    } else {
        let text = extract_text_body(&parsed).unwrap_or_default();
        wrap_in_container(&linkify(&text.replace('\n', "<br>")))
    };

    append_image_attachments(&parsed, &mut body);
    (body, true)
}

/// Parse-failure path: the raw body text, newlines converted to breaks, in a
/// pre-wrap variant of the standard container.
fn fallback_body(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    format!(
        "<div style=\"{BODY_CONTAINER_STYLE} white-space: pre-wrap;\">{}</div>",
        text.replace('\n', "<br>")
    )
}

fn wrap_in_container(inner: &str) -> String {
    format!("<div style=\"{BODY_CONTAINER_STYLE}\">{inner}</div>")
}

/// Turn bare URLs into anchors. `<` is excluded from the match so inserted
/// `<br>` tags never get swallowed into a link.
fn linkify(text: &str) -> String {
    let pattern = Regex::new(r"(https?://[^\s<]+)").expect("valid link regex");
    pattern
        .replace_all(text, |caps: &regex::Captures<'_>| {
            format!(
                "<a href=\"{0}\" style=\"{LINK_STYLE}\" target=\"_blank\">{0}</a>",
                &caps[1]
            )
        })
        .into_owned()
}

fn extract_text_body(mail: &ParsedMail<'_>) -> Option<String> {
    if mail.subparts.is_empty() {
        let content_type = mail.ctype.mimetype.to_ascii_lowercase();
        if content_type == "text/plain" || content_type == "text/markdown" {
            return mail.get_body().ok();
        }
        return None;
    }

    for part in &mail.subparts {
        if let Some(text) = extract_text_body(part) {
            return Some(text);
        }
    }

    None
}

fn extract_html_body(mail: &ParsedMail<'_>) -> Option<String> {
    if mail.subparts.is_empty() {
        let content_type = mail.ctype.mimetype.to_ascii_lowercase();
        if content_type == "text/html" {
            return mail.get_body().ok();
        }
        return None;
    }

    for part in &mail.subparts {
        if let Some(html) = extract_html_body(part) {
            return Some(html);
        }
    }

    None
}

struct ImageAttachment {
    mime_type: String,
    file_name: String,
    content: Vec<u8>,
}

/// Inline image attachments after the main body, the way the dashboard's
/// detail pane renders them.
fn append_image_attachments(parsed: &ParsedMail<'_>, body: &mut String) {
    let mut images = Vec::new();
    collect_image_attachments(parsed, &mut images);
    if images.is_empty() {
        return;
    }

    body.push_str(
        "<div style=\"margin-top: 20px; border-top: 1px solid #e8eaed; padding-top: 20px;\">",
    );
    body.push_str(
        "<div style=\"font-size: 13px; color: #666; margin-bottom: 10px;\">Attachments:</div>",
    );
    body.push_str("<div style=\"display: flex; flex-wrap: wrap; gap: 10px;\">");
    for image in images {
        let encoded = STANDARD.encode(&image.content);
        body.push_str(&format!(
            "<div style=\"max-width: 100%; margin-bottom: 10px;\">\
             <img src=\"data:{};base64,{}\" \
             style=\"max-width: 100%; height: auto; border-radius: 4px;\" \
             alt=\"{}\" /></div>",
            image.mime_type, encoded, image.file_name,
        ));
    }
    body.push_str("</div></div>");
}

fn collect_image_attachments(mail: &ParsedMail<'_>, images: &mut Vec<ImageAttachment>) {
    if mail.subparts.is_empty() {
        let mime_type = mail.ctype.mimetype.to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return;
        }

        let disposition = header_value(mail, "Content-Disposition")
            .unwrap_or_default()
            .to_ascii_lowercase();
        let file_name = header_filename(&disposition)
            .or_else(|| mail.ctype.params.get("name").cloned())
            .unwrap_or_else(|| "Attached Image".to_string());
        let content = mail.get_body_raw().unwrap_or_default();
        if !content.is_empty() {
            images.push(ImageAttachment {
                mime_type: mail.ctype.mimetype.clone(),
                file_name,
                content,
            });
        }
        return;
    }

    for part in &mail.subparts {
        collect_image_attachments(part, images);
    }
}

fn header_value(mail: &ParsedMail<'_>, key: &str) -> Option<String> {
    for header in mail.get_headers() {
        if header.get_key_ref().eq_ignore_ascii_case(key) {
            return Some(header.get_value());
        }
    }

    None
}

fn header_filename(disposition: &str) -> Option<String> {
    let key = "filename=";
    let idx = disposition.find(key)?;
    let raw = disposition[idx + key.len()..].trim();

    if let Some(stripped) = raw.strip_prefix('"') {
        let end = stripped.find('"')?;
        return Some(stripped[..end].to_string());
    }

    let value = raw
        .split(';')
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty())?;
    Some(value.to_string())
}

/// Tag-strip and whitespace-collapse an HTML fragment into preview text.
fn strip_markup(html: &str) -> String {
    let tags = Regex::new(r"<[^>]*>").expect("valid tag regex");
    let spaces = Regex::new(r"\s+").expect("valid whitespace regex");
    let stripped = tags.replace_all(html, " ");
    spaces.replace_all(&stripped, " ").trim().to_string()
}

/// Universal display truncation: tag-strip and trim, then cut to `limit`
/// characters with an appended `...` marker when over.
pub fn truncate_display(text: &str, limit: usize) -> String {
    let tags = Regex::new(r"<[^>]*>").expect("valid tag regex");
    let cleaned = tags.replace_all(text, "");
    let cleaned = cleaned.trim();

    let chars: Vec<char> = cleaned.chars().collect();
    if chars.len() <= limit {
        return cleaned.to_string();
    }

    let mut truncated: String = chars[..limit].iter().collect();
    truncated.push_str("...");
    truncated
}

/// Prefer the address inside angle brackets, then a bare address anywhere in
/// the value, then the raw header text unmodified.
fn clean_sender(from: &str) -> String {
    let angled = Regex::new(r"<(.+?)>").expect("valid sender regex");
    if let Some(caps) = angled.captures(from) {
        return caps[1].to_string();
    }

    let bare = Regex::new(r"([^\s]+@[^\s]+)").expect("valid address regex");
    if let Some(caps) = bare.captures(from) {
        return caps[1].to_string();
    }

    from.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbox::{MessagePart, PartKind, RawMessage};

    fn raw(header: Option<&str>, body: Option<&str>, seen: bool) -> RawMessage {
        let mut parts = Vec::new();
        if let Some(header) = header {
            parts.push(MessagePart {
                kind: PartKind::Header,
                bytes: header.as_bytes().to_vec(),
            });
        }
        if let Some(body) = body {
            parts.push(MessagePart {
                kind: PartKind::Text,
                bytes: body.as_bytes().to_vec(),
            });
        }
        RawMessage { parts, seen }
    }

    fn header_for(subject: &str) -> String {
        format!(
            "From: sender@example.com\r\nSubject: {subject}\r\nDate: Mon, 3 Feb 2025 10:00:00 +0000\r\n\r\n"
        )
    }

    #[test]
    fn missing_header_skips_without_failing_batch() {
        let batch = vec![
            raw(None, Some("orphan body"), false),
            raw(Some(&header_for("kept")), None, false),
        ];

        let err = normalize_message(&batch[0], 0).unwrap_err();
        assert_eq!(err, SkipReason::MissingHeader);

        let normalized = normalize_batch(&batch);
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].subject_full, "kept");
    }

    #[test]
    fn truncation_passes_short_text_through() {
        assert_eq!(truncate_display("short", 20), "short");
        assert_eq!(truncate_display("exactly-twenty-chars", 20), "exactly-twenty-chars");
        assert_eq!(truncate_display("", 30), "");
    }

    #[test]
    fn truncation_cuts_to_limit_and_appends_marker() {
        assert_eq!(
            truncate_display("abcdefghijklmnopqrstuvwxyz", 20),
            "abcdefghijklmnopqrst..."
        );
        assert_eq!(truncate_display("  padded out   ", 3), "pad...");
    }

    #[test]
    fn truncation_strips_markup_first() {
        assert_eq!(truncate_display("<b>bold</b> text", 20), "bold text");
    }

    #[test]
    fn unread_messages_sort_first_and_stay_stable() {
        let batch = vec![
            raw(Some(&header_for("read-a")), None, true),
            raw(Some(&header_for("unread-b")), None, false),
            raw(Some(&header_for("read-c")), None, true),
            raw(Some(&header_for("unread-d")), None, false),
        ];

        let normalized = normalize_batch(&batch);
        let subjects: Vec<&str> = normalized
            .iter()
            .map(|message| message.subject_full.as_str())
            .collect();
        assert_eq!(subjects, vec!["unread-b", "unread-d", "read-a", "read-c"]);
        // Batch positions survive the reorder.
        assert_eq!(normalized[0].sequence_id, 1);
        assert_eq!(normalized[2].sequence_id, 0);
    }

    #[test]
    fn bare_urls_become_anchors() {
        let message = raw(
            Some(&header_for("link")),
            Some("Content-Type: text/plain\r\n\r\nsee https://example.com/report today"),
            false,
        );
        let message = normalize_ok(&message);

        assert!(message
            .renderable_body
            .contains("<a href=\"https://example.com/report\""));
        assert!(message.renderable_body.contains(">https://example.com/report</a>"));
        assert!(message.is_html);
    }

    #[test]
    fn plain_text_newlines_become_breaks() {
        let message = raw(
            Some(&header_for("multi")),
            Some("Content-Type: text/plain\r\n\r\nline one\nline two"),
            false,
        );
        let message = normalize_ok(&message);

        assert!(message.renderable_body.contains("line one<br>line two"));
    }

    #[test]
    fn html_part_is_preferred_and_wrapped() {
        let message = raw(
            Some(&header_for("html")),
            Some("Content-Type: text/html\r\n\r\n<p>Hi <b>there</b></p>"),
            false,
        );
        let message = normalize_ok(&message);

        assert!(message.renderable_body.starts_with("<div style=\""));
        assert!(message.renderable_body.contains("<p>Hi"));
        assert!(message.is_html);
        assert_eq!(message.preview_full, "Hi there");
    }

    #[test]
    fn missing_body_part_yields_empty_non_html_body() {
        let message = normalize_ok(&raw(Some(&header_for("empty")), None, false));

        assert_eq!(message.renderable_body, "");
        assert!(!message.is_html);
        assert_eq!(message.preview_full, "");
        assert_eq!(message.preview_display, "");
    }

    #[test]
    fn fallback_keeps_raw_text_with_breaks() {
        let body = fallback_body(b"first line\nsecond https://x.test/a");
        assert!(body.contains("white-space: pre-wrap"));
        assert!(body.contains("first line<br>second https://x.test/a"));
    }

    #[test]
    fn image_attachments_are_inlined_after_body() {
        let body = concat!(
            "Content-Type: multipart/mixed; boundary=\"b\"\r\n\r\n",
            "--b\r\n",
            "Content-Type: text/plain\r\n\r\n",
            "see attached\r\n",
            "--b\r\n",
            "Content-Type: image/png; name=\"pixel.png\"\r\n",
            "Content-Disposition: attachment; filename=\"pixel.png\"\r\n",
            "Content-Transfer-Encoding: base64\r\n\r\n",
            "iVBORw0KGgo=\r\n",
            "--b--\r\n",
        );
        let message = normalize_ok(&raw(Some(&header_for("attachment")), Some(body), false));

        assert!(message.renderable_body.contains("Attachments:"));
        assert!(message
            .renderable_body
            .contains("data:image/png;base64,iVBORw0KGgo="));
        assert!(message.renderable_body.contains("alt=\"pixel.png\""));
    }

    #[test]
    fn named_sender_reduces_to_address() {
        let header = "From: \"Jane Doe\" <jane@example.com>\r\n\
                      Subject: Quarterly Report for All Regional Offices\r\n\
                      Date: Mon, 3 Feb 2025 10:00:00 +0000\r\n\r\n";
        let message = raw(
            Some(header),
            Some("Content-Type: text/plain\r\n\r\nHello"),
            false,
        );
        let message = normalize_ok(&message);

        assert_eq!(message.sender_full, "jane@example.com");
        assert_eq!(message.sender_display, "jane@example.com");
        assert_eq!(message.subject_display, "Quarterly Report for...");
        assert_eq!(
            message.subject_full,
            "Quarterly Report for All Regional Offices"
        );
        assert!(message.is_unread);
        assert_eq!(message.preview_full, "Hello");
        assert_eq!(message.received_at, "Mon, 3 Feb 2025 10:00:00 +0000");
    }

    #[test]
    fn sender_fallbacks_cover_bare_and_opaque_values() {
        assert_eq!(clean_sender("plain@example.com"), "plain@example.com");
        assert_eq!(
            clean_sender("Some Person plain@example.com"),
            "plain@example.com"
        );
        assert_eq!(clean_sender("mailer-daemon"), "mailer-daemon");
    }

    #[test]
    fn missing_from_and_subject_use_defaults() {
        let message = raw(
            Some("Date: Mon, 3 Feb 2025 10:00:00 +0000\r\n\r\n"),
            None,
            true,
        );
        let message = normalize_ok(&message);

        assert_eq!(message.sender_full, "Unknown");
        assert_eq!(message.subject_full, "No Subject");
        assert!(!message.is_unread);
    }

    #[test]
    fn display_fields_are_prefixes_of_full_fields() {
        let message = raw(
            Some(&header_for("A very long subject line that keeps on going")),
            Some("Content-Type: text/plain\r\n\r\na preview body that easily exceeds thirty characters"),
            false,
        );
        let message = normalize_ok(&message);

        let subject_prefix = message.subject_display.trim_end_matches("...");
        assert!(message.subject_full.starts_with(subject_prefix));
        assert!(message.subject_display.chars().count() <= SUBJECT_DISPLAY_LIMIT + 3);

        let preview_prefix = message.preview_display.trim_end_matches("...");
        assert!(message.preview_full.starts_with(preview_prefix));
        assert!(message.preview_display.chars().count() <= PREVIEW_DISPLAY_LIMIT + 3);
    }

    fn normalize_ok(raw: &RawMessage) -> beacon_core::NormalizedMessage {
        normalize_message(raw, 0).expect("message normalized")
    }
}
