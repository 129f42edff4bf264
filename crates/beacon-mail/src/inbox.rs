use crate::MailError;
use beacon_config::ImapConfig;

/// Kind tag for one fetched message part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Header,
    Text,
    /// Whole-message fallback for sources that cannot split header/text.
    Raw,
}

#[derive(Debug, Clone)]
pub struct MessagePart {
    pub kind: PartKind,
    pub bytes: Vec<u8>,
}

/// One message as fetched, before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawMessage {
    pub parts: Vec<MessagePart>,
    pub seen: bool,
}

impl RawMessage {
    pub fn part(&self, kind: PartKind) -> Option<&MessagePart> {
        self.parts.iter().find(|part| part.kind == kind)
    }

    /// The textual body part: `Text` when present, otherwise a raw body.
    pub fn body_part(&self) -> Option<&MessagePart> {
        self.part(PartKind::Text).or_else(|| self.part(PartKind::Raw))
    }
}

/// Fetch the whole mailbox transcript over one scoped IMAP session.
///
/// Blocking; callers run it inside `spawn_blocking`. The session is logged
/// out on success and error paths alike, and every fetch opens a fresh
/// connection: there is no pooling and no cache.
pub fn fetch_transcript(config: &ImapConfig) -> Result<Vec<RawMessage>, MailError> {
    let mut session = connect_session(config)?;
    let result = fetch_all(&mut session, &config.mailbox);
    let _ = session.logout();
    result
}

fn connect_session(config: &ImapConfig) -> Result<imap::Session<imap::Connection>, MailError> {
    let username = config
        .username
        .as_deref()
        .ok_or_else(|| MailError::Data("missing imap username".to_string()))?;
    let password = config
        .password
        .as_deref()
        .ok_or_else(|| MailError::Data("missing imap password".to_string()))?;

    let client = imap::ClientBuilder::new(&config.host, config.port)
        .danger_skip_tls_verify(config.danger_accept_invalid_certs)
        .connect()
        .map_err(imap_error)?;

    client
        .login(username, password)
        .map_err(|err| imap_error(err.0))
}

fn fetch_all(
    session: &mut imap::Session<imap::Connection>,
    mailbox: &str,
) -> Result<Vec<RawMessage>, MailError> {
    session.select(mailbox).map_err(imap_error)?;

    let mut sequence: Vec<u32> = session
        .search("ALL")
        .map_err(imap_error)?
        .into_iter()
        .collect();
    if sequence.is_empty() {
        return Ok(Vec::new());
    }

    // SEARCH results come back as an unordered set; mailbox order is the
    // batch order.
    sequence.sort_unstable();
    let set = sequence
        .iter()
        .map(|seq| seq.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let fetches = session
        .fetch(set, "(FLAGS BODY.PEEK[HEADER] BODY.PEEK[TEXT])")
        .map_err(imap_error)?;

    let mut messages = Vec::new();
    for fetched in fetches.iter() {
        let mut parts = Vec::new();
        if let Some(header) = fetched.header() {
            parts.push(MessagePart {
                kind: PartKind::Header,
                bytes: header.to_vec(),
            });
        }
        if let Some(text) = fetched.text() {
            parts.push(MessagePart {
                kind: PartKind::Text,
                bytes: text.to_vec(),
            });
        }

        let mut seen = false;
        for flag in fetched.flags() {
            if matches!(flag, imap::types::Flag::Seen) {
                seen = true;
            }
        }

        messages.push(RawMessage { parts, seen });
    }

    Ok(messages)
}

fn imap_error(error: imap::Error) -> MailError {
    MailError::Imap(error.to_string())
}
