//! Mailbox aggregates
//!
//! Pure functions over a fetched set of [`MessageSummary`]s. Ordered maps and
//! explicit tie-breaks keep the output a deterministic function of the input,
//! whatever order Gmail returned the messages in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::MessageSummary;

/// Messages below this are "small" (1 MiB)
pub const SMALL_MESSAGE_BYTES: u64 = 1024 * 1024;
/// Messages below this (and not small) are "medium" (5 MiB)
pub const MEDIUM_MESSAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Sender label for the folded tail of a truncated top-senders list
pub const OTHER_SENDERS: &str = "(other)";

/// Default number of senders returned by top-senders
pub const DEFAULT_TOP_SENDERS: usize = 10;

/// Message counts by size bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDistribution {
    pub small: usize,
    pub medium: usize,
    pub large: usize,
}

impl SizeDistribution {
    pub fn record(&mut self, size_bytes: u64) {
        if size_bytes < SMALL_MESSAGE_BYTES {
            self.small += 1;
        } else if size_bytes < MEDIUM_MESSAGE_BYTES {
            self.medium += 1;
        } else {
            self.large += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.small + self.medium + self.large
    }
}

/// Hour of day (0-23) -> message count, every hour present
pub type TimeDistribution = BTreeMap<u8, usize>;

/// One row of the top-senders list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderCount {
    pub sender: String,
    pub count: usize,
}

/// Full analytics summary for a window of mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMetrics {
    /// Size of the window the messages were fetched for
    pub days: u32,
    pub total_emails: usize,
    /// Case-folded sender address -> count
    pub senders: BTreeMap<String, usize>,
    /// Subject -> count; messages without a subject are not counted here
    pub subjects: BTreeMap<String, usize>,
    pub time_distribution: TimeDistribution,
    pub email_size_distribution: SizeDistribution,
}

impl EmailMetrics {
    /// Aggregate a fetched message set
    pub fn from_messages(days: u32, messages: &[MessageSummary]) -> Self {
        let mut senders: BTreeMap<String, usize> = BTreeMap::new();
        let mut subjects: BTreeMap<String, usize> = BTreeMap::new();
        let mut time_distribution = empty_time_distribution();
        let mut email_size_distribution = SizeDistribution::default();

        for message in messages {
            *senders.entry(message.sender_key()).or_default() += 1;

            if let Some(subject) = &message.subject {
                *subjects.entry(subject.clone()).or_default() += 1;
            }

            *time_distribution.entry(message.hour()).or_default() += 1;
            email_size_distribution.record(message.size_bytes);
        }

        Self {
            days,
            total_emails: messages.len(),
            senders,
            subjects,
            time_distribution,
            email_size_distribution,
        }
    }

    /// Senders by count descending, then address ascending.
    ///
    /// With a `limit`, senders past it are folded into one [`OTHER_SENDERS`]
    /// row, so the counts always add up to `total_emails`.
    pub fn top_senders(&self, limit: Option<usize>) -> Vec<SenderCount> {
        let mut ranked: Vec<SenderCount> = self
            .senders
            .iter()
            .map(|(sender, &count)| SenderCount {
                sender: sender.clone(),
                count,
            })
            .collect();

        // BTreeMap iteration is already address-ordered; a stable sort keeps it for ties
        ranked.sort_by(|a, b| b.count.cmp(&a.count));

        if let Some(limit) = limit
            && ranked.len() > limit
        {
            let rest: usize = ranked.drain(limit..).map(|s| s.count).sum();
            ranked.push(SenderCount {
                sender: OTHER_SENDERS.to_string(),
                count: rest,
            });
        }

        ranked
    }
}

fn empty_time_distribution() -> TimeDistribution {
    (0..24u8).map(|hour| (hour, 0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmailAddress, MessageId};
    use chrono::DateTime;

    fn message(id: &str, from: Option<&str>, subject: Option<&str>, at: &str, size: u64) -> MessageSummary {
        MessageSummary {
            id: MessageId::new(id),
            sender: from.map(EmailAddress::parse),
            subject: subject.map(str::to_string),
            received_at: DateTime::parse_from_rfc3339(at).unwrap(),
            size_bytes: size,
        }
    }

    fn sample() -> Vec<MessageSummary> {
        vec![
            message("1", Some("Alice <alice@example.com>"), Some("Hi"), "2024-03-01T09:00:00+00:00", 10),
            message("2", Some("alice@EXAMPLE.com"), Some("Hi"), "2024-03-01T09:30:00+02:00", 2 * 1024 * 1024),
            message("3", Some("bob@example.com"), None, "2024-03-02T17:45:00-05:00", 6 * 1024 * 1024),
            message("4", None, Some("Report"), "2024-03-03T00:05:00+00:00", SMALL_MESSAGE_BYTES),
            message("5", Some("carol@example.com"), Some("Report"), "2024-03-03T23:59:59+00:00", MEDIUM_MESSAGE_BYTES),
        ]
    }

    #[test]
    fn test_empty_input() {
        let metrics = EmailMetrics::from_messages(30, &[]);
        assert_eq!(metrics.total_emails, 0);
        assert!(metrics.senders.is_empty());
        assert_eq!(metrics.time_distribution.len(), 24);
        assert!(metrics.time_distribution.values().all(|&c| c == 0));
        assert_eq!(metrics.email_size_distribution, SizeDistribution::default());
        assert!(metrics.top_senders(Some(10)).is_empty());
    }

    #[test]
    fn test_counts() {
        let metrics = EmailMetrics::from_messages(7, &sample());
        assert_eq!(metrics.days, 7);
        assert_eq!(metrics.total_emails, 5);
        assert_eq!(metrics.senders["alice@example.com"], 2);
        assert_eq!(metrics.senders["(unknown)"], 1);
        assert_eq!(metrics.subjects["Hi"], 2);
        assert_eq!(metrics.subjects["Report"], 2);
        assert_eq!(metrics.subjects.len(), 2);
    }

    #[test]
    fn test_time_distribution_uses_local_hour() {
        let metrics = EmailMetrics::from_messages(7, &sample());
        assert_eq!(metrics.time_distribution[&9], 2);
        assert_eq!(metrics.time_distribution[&17], 1);
        assert_eq!(metrics.time_distribution[&0], 1);
        assert_eq!(metrics.time_distribution[&23], 1);
        assert_eq!(metrics.time_distribution.values().sum::<usize>(), 5);
    }

    #[test]
    fn test_size_bucket_boundaries() {
        let metrics = EmailMetrics::from_messages(7, &sample());
        let sizes = metrics.email_size_distribution;
        // 10 B small; 2 MiB and exactly 1 MiB medium; 6 MiB and exactly 5 MiB large
        assert_eq!(sizes.small, 1);
        assert_eq!(sizes.medium, 2);
        assert_eq!(sizes.large, 2);
        assert_eq!(sizes.total(), metrics.total_emails);
    }

    #[test]
    fn test_top_senders_order_and_ties() {
        let metrics = EmailMetrics::from_messages(7, &sample());
        let top = metrics.top_senders(None);
        let names: Vec<_> = top.iter().map(|s| s.sender.as_str()).collect();
        assert_eq!(
            names,
            vec!["alice@example.com", "(unknown)", "bob@example.com", "carol@example.com"]
        );
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn test_top_senders_folds_remainder() {
        let metrics = EmailMetrics::from_messages(7, &sample());
        let top = metrics.top_senders(Some(2));
        assert_eq!(top.len(), 3);
        assert_eq!(top[2], SenderCount { sender: OTHER_SENDERS.to_string(), count: 2 });
        assert_eq!(top.iter().map(|s| s.count).sum::<usize>(), metrics.total_emails);
    }

    #[test]
    fn test_top_senders_limit_zero_folds_everything() {
        let metrics = EmailMetrics::from_messages(7, &sample());
        let top = metrics.top_senders(Some(0));
        assert_eq!(top, vec![SenderCount { sender: OTHER_SENDERS.to_string(), count: 5 }]);
    }

    #[test]
    fn test_aggregation_ignores_input_order() {
        let forward = sample();
        let mut reversed = sample();
        reversed.reverse();

        let a = EmailMetrics::from_messages(7, &forward);
        let b = EmailMetrics::from_messages(7, &reversed);
        assert_eq!(a, b);
        assert_eq!(a.top_senders(Some(3)), b.top_senders(Some(3)));
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_json_shape() {
        let metrics = EmailMetrics::from_messages(30, &sample()[..1]);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["total_emails"], 1);
        assert_eq!(json["time_distribution"]["9"], 1);
        assert_eq!(json["email_size_distribution"]["small"], 1);
        assert_eq!(json["senders"]["alice@example.com"], 1);
    }
}
