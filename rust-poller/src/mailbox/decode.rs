//! Message body decoding.
//!
//! The mailbox hands out the raw RFC 5322 message as URL-safe base64. This
//! module undoes that, parses the MIME structure with mailparse and returns
//! the plain-text body with transfer encoding and charset already applied.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use mailparse::{parse_mail, ParsedMail};
use tracing::debug;

use crate::error::DecodeError;

/// URL-safe alphabet, with or without trailing `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a mailbox body into its plain-text content.
pub fn decode_body(encoded: &str) -> Result<String, DecodeError> {
    let raw = URL_SAFE_LENIENT.decode(encoded.trim())?;
    let mail = parse_mail(&raw)?;

    let body = extract_text_body(&mail)?.ok_or(DecodeError::NoTextPart)?;

    debug!(
        raw_length = raw.len(),
        content_type = %mail.ctype.mimetype,
        body_length = body.len(),
        "message_body_decoded"
    );

    Ok(body)
}

/// Pick the text body of a parsed message.
///
/// - text/* (single part): taken as is
/// - multipart/*: first text/plain part, searching nested containers
fn extract_text_body(mail: &ParsedMail) -> Result<Option<String>, DecodeError> {
    let content_type = mail.ctype.mimetype.as_str();

    if content_type.starts_with("multipart/") {
        return find_plain_in_parts(&mail.subparts);
    }

    if content_type.starts_with("text/") {
        return Ok(Some(mail.get_body()?));
    }

    Ok(None)
}

fn find_plain_in_parts(parts: &[ParsedMail]) -> Result<Option<String>, DecodeError> {
    for part in parts {
        let part_type = part.ctype.mimetype.as_str();

        if part_type == "text/plain" {
            return Ok(Some(part.get_body()?));
        }

        if part_type.starts_with("multipart/") {
            if let Some(body) = find_plain_in_parts(&part.subparts)? {
                return Ok(Some(body));
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};

    #[test]
    fn test_decode_plain_utf8() {
        let raw = "Subject: test\r\nContent-Type: text/plain; charset=utf-8\r\n\r\nこんにちは\r\n■伝票番号：1234\r\n";
        let body = decode_body(&URL_SAFE.encode(raw)).unwrap();

        assert!(body.contains("こんにちは"));
        assert!(body.contains("■伝票番号：1234"));
    }

    #[test]
    fn test_decode_without_padding() {
        let raw = "Content-Type: text/plain; charset=utf-8\r\n\r\nab";
        let body = decode_body(&URL_SAFE_NO_PAD.encode(raw)).unwrap();
        assert_eq!(body.trim(), "ab");
    }

    #[test]
    fn test_decode_quoted_printable() {
        let raw = "Content-Type: text/plain; charset=utf-8\r\n\
                   Content-Transfer-Encoding: quoted-printable\r\n\r\n\
                   =E2=96=A0 box\r\n";
        let body = decode_body(&URL_SAFE.encode(raw)).unwrap();
        assert!(body.contains("■ box"));
    }

    #[test]
    fn test_decode_prefers_plain_part() {
        let raw = "Content-Type: multipart/alternative; boundary=\"b1\"\r\n\r\n\
                   --b1\r\n\
                   Content-Type: text/html; charset=utf-8\r\n\r\n\
                   <html><body>HTML version</body></html>\r\n\
                   --b1\r\n\
                   Content-Type: text/plain; charset=utf-8\r\n\r\n\
                   Plain version\r\n\
                   --b1--\r\n";
        let body = decode_body(&URL_SAFE.encode(raw)).unwrap();
        assert!(body.contains("Plain version"));
        assert!(!body.contains("HTML version"));
    }

    #[test]
    fn test_decode_nested_multipart() {
        let raw = "Content-Type: multipart/mixed; boundary=\"outer\"\r\n\r\n\
                   --outer\r\n\
                   Content-Type: multipart/alternative; boundary=\"inner\"\r\n\r\n\
                   --inner\r\n\
                   Content-Type: text/plain; charset=utf-8\r\n\r\n\
                   Nested plain\r\n\
                   --inner--\r\n\
                   --outer--\r\n";
        let body = decode_body(&URL_SAFE.encode(raw)).unwrap();
        assert!(body.contains("Nested plain"));
    }

    #[test]
    fn test_decode_html_only_multipart() {
        let raw = "Content-Type: multipart/alternative; boundary=\"b1\"\r\n\r\n\
                   --b1\r\n\
                   Content-Type: text/html\r\n\r\n\
                   <p>only html</p>\r\n\
                   --b1--\r\n";
        let err = decode_body(&URL_SAFE.encode(raw)).unwrap_err();
        assert!(matches!(err, DecodeError::NoTextPart));
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode_body("@@not base64@@").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }
}
