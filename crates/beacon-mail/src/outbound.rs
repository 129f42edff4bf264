use crate::MailError;
use beacon_config::SmtpConfig;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};

/// Outbound mail as accepted by the compose endpoint. `message` is the
/// operator's raw text; HTML composition happens server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub message: String,
}

/// Compose the HTML payload: fixed-style wrapper, the operator's text, a
/// signature line, and the hidden tracking pixel.
pub fn compose_html(message: &str, from_name: &str, pixel_url: &str) -> String {
    format!(
        concat!(
            "<div style=\"font-family: Arial, sans-serif; padding: 20px;\">",
            "<p>{message}</p>",
            "<p>Sent by {from_name}</p>",
            "<img src=\"{pixel_url}\" width=\"1\" height=\"1\" style=\"display:none;\" />",
            "</div>"
        ),
        message = message,
        from_name = from_name,
        pixel_url = pixel_url,
    )
}

/// Tracking pixel URL for one outbound message. The timestamp parameter
/// defeats intermediary caches between the recipient and us.
pub fn tracking_pixel_url(public_base_url: &str, email_id: &str) -> String {
    let base = public_base_url.trim_end_matches('/');
    format!(
        "{base}/api/trackOpen?emailId={email_id}&t={}",
        chrono::Utc::now().timestamp_millis()
    )
}

/// Deliver one message over SMTP. The transport connection is verified as a
/// separate step before the send itself, so auth failures read as such.
pub async fn send_mail(
    config: &SmtpConfig,
    outgoing: &OutgoingMail,
    html_body: &str,
) -> Result<(), MailError> {
    let username = config
        .username
        .as_deref()
        .ok_or_else(|| MailError::Data("missing smtp username".to_string()))?;
    let password = config
        .password
        .as_deref()
        .ok_or_else(|| MailError::Data("missing smtp password".to_string()))?;
    let from_address = config.from_address.as_deref().unwrap_or(username);

    let from: Mailbox = format!("\"{}\" <{}>", config.from_name, from_address)
        .parse()
        .map_err(|err| MailError::Build(format!("invalid from address: {err}")))?;
    let to: Mailbox = outgoing
        .to
        .parse()
        .map_err(|err| MailError::Build(format!("invalid recipient {}: {err}", outgoing.to)))?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(outgoing.subject.clone())
        .header(header::ContentType::TEXT_HTML)
        .body(html_body.to_string())
        .map_err(|err| MailError::Build(err.to_string()))?;

    let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        .map_err(|err| MailError::Smtp(err.to_string()))?
        .port(config.port)
        .credentials(Credentials::new(username.to_string(), password.to_string()))
        .build();

    let verified = transport
        .test_connection()
        .await
        .map_err(|err| MailError::Smtp(err.to_string()))?;
    if !verified {
        return Err(MailError::Smtp("connection verify failed".to_string()));
    }

    transport
        .send(message)
        .await
        .map_err(|err| MailError::Smtp(err.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_html_embeds_message_signature_and_pixel() {
        let html = compose_html(
            "Hello there",
            "Acme Outreach",
            "http://localhost:8787/api/trackOpen?emailId=abc&t=1",
        );

        assert!(html.contains("<p>Hello there</p>"));
        assert!(html.contains("Sent by Acme Outreach"));
        assert!(html.contains(
            "<img src=\"http://localhost:8787/api/trackOpen?emailId=abc&t=1\" width=\"1\" height=\"1\""
        ));
    }

    #[test]
    fn pixel_url_targets_track_open_with_cache_buster() {
        let url = tracking_pixel_url("http://localhost:8787/", "abc-123");
        assert!(url.starts_with("http://localhost:8787/api/trackOpen?emailId=abc-123&t="));
    }
}
