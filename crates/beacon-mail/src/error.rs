use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("imap error: {0}")]
    Imap(String),
    #[error("smtp transport error: {0}")]
    Smtp(String),
    #[error("message build error: {0}")]
    Build(String),
    #[error("mail parse error: {0}")]
    Parse(#[from] mailparse::MailParseError),
    #[error("invalid data: {0}")]
    Data(String),
    #[error("inbox fetch timed out after {0}s")]
    Timeout(u64),
}
