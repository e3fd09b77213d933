//! Simulated ingestion driver: a fixed batch of candidate emails for a
//! monitored address, standing in for a real mail feed.

use crate::types::EmailCandidate;
use chrono::{Duration, Utc};

/// Sample batch with message ids salted by the current time, so repeated
/// simulations produce fresh records.
pub fn sample_batch(address: &str) -> Vec<EmailCandidate> {
    sample_batch_tagged(address, &Utc::now().timestamp_millis().to_string())
}

/// Sample batch with caller-controlled message-id tag. Reusing a tag
/// reproduces the duplicate-message skip path.
pub fn sample_batch_tagged(address: &str, tag: &str) -> Vec<EmailCandidate> {
    let now = Utc::now();
    vec![
        EmailCandidate {
            message_id: format!("msg_{tag}_1"),
            sender: "notifications@bank.com".to_string(),
            recipient: address.to_string(),
            subject: "Urgent: Verify your account to prevent suspension".to_string(),
            content: "Dear customer, your account will be suspended. Click here to verify \
                      your login credentials immediately."
                .to_string(),
            received_at: now,
        },
        EmailCandidate {
            message_id: format!("msg_{tag}_2"),
            sender: address.to_string(),
            recipient: "colleague@company.com".to_string(),
            subject: "Meeting notes from today".to_string(),
            content: "Hi, please find attached the meeting notes from our discussion today. \
                      Let me know if you have any questions."
                .to_string(),
            received_at: now - Duration::seconds(30),
        },
        EmailCandidate {
            message_id: format!("msg_{tag}_3"),
            sender: "newsletter@tech-company.com".to_string(),
            recipient: address.to_string(),
            subject: "Weekly Tech Updates".to_string(),
            content: "Here are this week's technology updates and industry news.".to_string(),
            received_at: now - Duration::seconds(60),
        },
        EmailCandidate {
            message_id: format!("msg_{tag}_4"),
            sender: "no-reply@suspicious-site.com".to_string(),
            recipient: address.to_string(),
            subject: "You've won a prize! Act now!".to_string(),
            content: "Congratulations! You've won $1000. Click here to claim your free \
                      prize now. Limited time offer!"
                .to_string(),
            received_at: now - Duration::seconds(90),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_has_four_candidates_with_unique_ids() {
        let batch = sample_batch_tagged("user@example.com", "t1");
        assert_eq!(batch.len(), 4);
        let ids: std::collections::HashSet<&str> =
            batch.iter().map(|c| c.message_id.as_str()).collect();
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn second_sample_is_outgoing_from_the_monitored_address() {
        let batch = sample_batch_tagged("user@example.com", "t1");
        assert_eq!(batch[1].sender, "user@example.com");
        assert_eq!(batch[1].recipient, "colleague@company.com");
    }

    #[test]
    fn batch_is_ordered_newest_received_first() {
        let batch = sample_batch_tagged("user@example.com", "t1");
        for pair in batch.windows(2) {
            assert!(pair[0].received_at > pair[1].received_at);
        }
    }
}
