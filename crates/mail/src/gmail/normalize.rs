//! Gmail API response normalization
//!
//! Reduces a metadata response to the [`MessageSummary`] the analytics run on.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use super::api::{GmailMessage, MessagePayload};
use crate::models::{EmailAddress, MessageId, MessageSummary};

/// Summarize a Gmail metadata message.
///
/// Arrival time prefers the `Date` header so the hour reflects the sender's
/// clock; Gmail's internal date (UTC) covers missing or garbled headers.
/// A message with neither is dated at the Unix epoch.
pub fn summarize_message(gmail_msg: GmailMessage) -> MessageSummary {
    let payload = gmail_msg.payload.as_ref();

    let sender = payload
        .and_then(|p| extract_header(p, "From"))
        .filter(|v| !v.trim().is_empty())
        .map(|v| EmailAddress::parse(&v));

    let subject = payload
        .and_then(|p| extract_header(p, "Subject"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let received_at = payload
        .and_then(|p| extract_header(p, "Date"))
        .and_then(|d| parse_date_header(&d))
        .or_else(|| internal_date(gmail_msg.internal_date.as_deref()))
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.fixed_offset());

    MessageSummary {
        id: MessageId::new(gmail_msg.id),
        sender,
        subject,
        received_at,
        size_bytes: gmail_msg.size_estimate.unwrap_or(0),
    }
}

/// Extract a header value by name (case-insensitive)
pub fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Parse an RFC 2822 `Date` header, tolerating a trailing comment like `(UTC)`
fn parse_date_header(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt);
    }

    let without_comment = match value.rfind('(') {
        Some(idx) if value.ends_with(')') => value[..idx].trim_end(),
        _ => value,
    };
    DateTime::parse_from_rfc2822(without_comment).ok()
}

/// Gmail's internalDate: milliseconds since epoch as a decimal string
fn internal_date(value: Option<&str>) -> Option<DateTime<FixedOffset>> {
    let millis: i64 = value?.trim().parse().ok()?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::Header;
    use chrono::Timelike;

    fn make_message(headers: Vec<(&str, &str)>, internal_date: Option<&str>, size: Option<u64>) -> GmailMessage {
        GmailMessage {
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
            label_ids: None,
            snippet: String::new(),
            internal_date: internal_date.map(str::to_string),
            size_estimate: size,
            payload: Some(MessagePayload {
                headers: Some(
                    headers
                        .into_iter()
                        .map(|(n, v)| Header {
                            name: n.to_string(),
                            value: v.to_string(),
                        })
                        .collect(),
                ),
                mime_type: Some("text/plain".to_string()),
            }),
        }
    }

    #[test]
    fn test_extract_header_case_insensitive() {
        let msg = make_message(vec![("FROM", "test@example.com")], None, None);
        let payload = msg.payload.as_ref().unwrap();
        assert_eq!(extract_header(payload, "from"), Some("test@example.com".to_string()));
        assert_eq!(extract_header(payload, "Cc"), None);
    }

    #[test]
    fn test_summarize_uses_date_header_offset() {
        let msg = make_message(
            vec![
                ("From", "Alice <alice@example.com>"),
                ("Subject", " Quarterly report "),
                ("Date", "Tue, 05 Mar 2024 21:14:03 -0800"),
            ],
            Some("1709702043000"),
            Some(2048),
        );

        let summary = summarize_message(msg);
        assert_eq!(summary.id.as_str(), "m1");
        assert_eq!(summary.sender.unwrap().email, "alice@example.com");
        assert_eq!(summary.subject.as_deref(), Some("Quarterly report"));
        assert_eq!(summary.received_at.hour(), 21);
        assert_eq!(summary.size_bytes, 2048);
    }

    #[test]
    fn test_summarize_accepts_date_with_comment() {
        let msg = make_message(vec![("Date", "Wed, 6 Mar 2024 08:01:00 +0000 (UTC)")], None, None);
        assert_eq!(summarize_message(msg).received_at.hour(), 8);
    }

    #[test]
    fn test_summarize_falls_back_to_internal_date() {
        // 2024-03-06T05:14:03Z
        let msg = make_message(vec![("Date", "not a date")], Some("1709702043000"), None);
        let summary = summarize_message(msg);
        assert_eq!(summary.received_at.hour(), 5);
        assert_eq!(summary.received_at.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_summarize_without_headers() {
        let mut msg = make_message(vec![], Some("0"), None);
        msg.payload = None;

        let summary = summarize_message(msg);
        assert!(summary.sender.is_none());
        assert!(summary.subject.is_none());
        assert_eq!(summary.size_bytes, 0);
        assert_eq!(summary.received_at.timestamp(), 0);
    }

    #[test]
    fn test_undated_message_lands_on_epoch() {
        let undated = || make_message(vec![("Date", "garbage")], None, None);

        let first = summarize_message(undated());
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = summarize_message(undated());

        assert_eq!(first.received_at, second.received_at);
        assert_eq!(first.received_at.timestamp(), 0);
        assert_eq!(first.received_at.hour(), 0);
    }

    #[test]
    fn test_blank_from_is_unknown_sender() {
        let msg = make_message(vec![("From", "   ")], Some("0"), None);
        assert_eq!(summarize_message(msg).sender_key(), crate::models::UNKNOWN_SENDER);
    }
}
