mod error;
mod inbox;
mod normalize;
mod outbound;
mod service;

pub use error::MailError;
pub use inbox::{fetch_transcript, MessagePart, PartKind, RawMessage};
pub use normalize::{
    normalize_batch, normalize_message, sort_unread_first, truncate_display, SkipReason,
    PREVIEW_DISPLAY_LIMIT, SENDER_DISPLAY_LIMIT, SUBJECT_DISPLAY_LIMIT,
};
pub use outbound::{compose_html, send_mail, tracking_pixel_url, OutgoingMail};
pub use service::MailService;
