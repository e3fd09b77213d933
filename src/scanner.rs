use crate::config::Config;
use crate::types::{EmailCandidate, RiskLevel, ScanResult, ThreatDetails};

/// Classification outcome for one email. Pure data; the quarantine decision
/// is a separate policy call.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub scan_result: ScanResult,
    pub risk_level: RiskLevel,
    pub threat_details: Option<ThreatDetails>,
}

struct CompiledRule {
    category: ScanResult,
    risk_level: RiskLevel,
    // Lowercased once at build time; matching is case-insensitive substring
    // containment, no tokenization or word boundaries.
    keywords: Vec<String>,
    details: ThreatDetails,
}

/// Ordered keyword-rule scanner. Rules are evaluated top to bottom and the
/// first matching rule wins; an email matching both phishing and spam
/// keywords is phishing.
pub struct ScanEngine {
    rules: Vec<CompiledRule>,
}

impl ScanEngine {
    pub fn new(config: &Config) -> Self {
        let rules = config
            .rules
            .iter()
            .map(|rule| CompiledRule {
                category: rule.category,
                risk_level: rule.risk_level,
                keywords: rule.keywords.iter().map(|k| k.to_lowercase()).collect(),
                details: ThreatDetails {
                    threat_type: rule.threat_type.clone(),
                    indicators: rule.indicators.clone(),
                },
            })
            .collect();
        Self { rules }
    }

    /// Classify one email. Total and deterministic: any input, including
    /// empty subject and content, gets a verdict.
    pub fn classify(&self, email: &EmailCandidate) -> Verdict {
        let subject = email.subject.to_lowercase();
        let content = email.content.to_lowercase();

        for rule in &self.rules {
            let matched = rule
                .keywords
                .iter()
                .any(|kw| subject.contains(kw.as_str()) || content.contains(kw.as_str()));
            if matched {
                log::debug!(
                    "Message {} matched {} rule",
                    email.message_id,
                    rule.category.as_str()
                );
                return Verdict {
                    scan_result: rule.category,
                    risk_level: rule.risk_level,
                    threat_details: Some(rule.details.clone()),
                };
            }
        }

        Verdict {
            scan_result: ScanResult::Clean,
            risk_level: RiskLevel::Low,
            threat_details: None,
        }
    }
}

/// Quarantine iff the verdict is a critical-risk threat. Under the built-in
/// rules only phishing auto-quarantines; medium-risk spam and suspicious mail
/// is flagged but stays in the inbox view to keep false-positive quarantines
/// down for the lower-confidence categories.
pub fn should_quarantine(scan_result: ScanResult, risk_level: RiskLevel) -> bool {
    scan_result != ScanResult::Clean && risk_level == RiskLevel::Critical
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn email(subject: &str, content: &str) -> EmailCandidate {
        EmailCandidate {
            message_id: "msg_test_1".to_string(),
            sender: "sender@example.com".to_string(),
            recipient: "victim@example.com".to_string(),
            subject: subject.to_string(),
            content: content.to_string(),
            received_at: Utc::now(),
        }
    }

    fn engine() -> ScanEngine {
        ScanEngine::new(&Config::default())
    }

    #[test]
    fn phishing_keyword_is_critical_and_quarantined() {
        let verdict = engine().classify(&email(
            "Security notice",
            "Please confirm identity before Friday",
        ));
        assert_eq!(verdict.scan_result, ScanResult::Phishing);
        assert_eq!(verdict.risk_level, RiskLevel::Critical);
        let details = verdict.threat_details.unwrap();
        assert_eq!(details.threat_type, "phishing");
        assert_eq!(
            details.indicators,
            vec!["suspicious_links", "credential_harvesting"]
        );
        assert!(should_quarantine(ScanResult::Phishing, RiskLevel::Critical));
    }

    #[test]
    fn phishing_matches_regardless_of_case() {
        let verdict = engine().classify(&email("UPDATE PAYMENT required", ""));
        assert_eq!(verdict.scan_result, ScanResult::Phishing);

        let verdict = engine().classify(&email("", "Your PaSsWoRd expires"));
        assert_eq!(verdict.scan_result, ScanResult::Phishing);
    }

    #[test]
    fn substring_matching_has_no_word_boundaries() {
        // "password" inside a longer token still matches.
        let verdict = engine().classify(&email("", "rotate mypassword123 today"));
        assert_eq!(verdict.scan_result, ScanResult::Phishing);
    }

    #[test]
    fn spam_without_phishing_is_medium_not_quarantined() {
        let verdict = engine().classify(&email("Limited time offer", "Great deals inside"));
        assert_eq!(verdict.scan_result, ScanResult::Spam);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
        assert_eq!(
            verdict.threat_details.unwrap().indicators,
            vec!["promotional_content"]
        );
        assert!(!should_quarantine(ScanResult::Spam, RiskLevel::Medium));
    }

    #[test]
    fn suspicious_keywords_rank_below_spam() {
        let verdict = engine().classify(&email("Account suspended", "verify account today"));
        assert_eq!(verdict.scan_result, ScanResult::Suspicious);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn phishing_dominates_spam() {
        // Both a spam keyword (free) and a phishing keyword (login) present.
        let verdict = engine().classify(&email("Free gift", "just login to claim"));
        assert_eq!(verdict.scan_result, ScanResult::Phishing);
        assert_eq!(verdict.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn no_keywords_is_clean_low() {
        let verdict = engine().classify(&email(
            "Weekly Tech Updates",
            "Here are this week's technology updates and industry news.",
        ));
        assert_eq!(verdict.scan_result, ScanResult::Clean);
        assert_eq!(verdict.risk_level, RiskLevel::Low);
        assert!(verdict.threat_details.is_none());
        assert!(!should_quarantine(ScanResult::Clean, RiskLevel::Low));
    }

    #[test]
    fn empty_email_is_clean() {
        let verdict = engine().classify(&email("", ""));
        assert_eq!(verdict.scan_result, ScanResult::Clean);
        assert_eq!(verdict.risk_level, RiskLevel::Low);
    }

    #[test]
    fn bank_scare_scenario_is_phishing() {
        // Subject carries suspicious keywords, but "login" in the body makes
        // the higher-priority phishing rule win.
        let verdict = engine().classify(&email(
            "Urgent: Verify your account to prevent suspension",
            "Dear customer, your account will be suspended. Click here to verify \
             your login credentials immediately.",
        ));
        assert_eq!(verdict.scan_result, ScanResult::Phishing);
        assert_eq!(verdict.risk_level, RiskLevel::Critical);
        assert!(should_quarantine(verdict.scan_result, verdict.risk_level));
    }

    #[test]
    fn prize_scenario_is_spam_not_suspicious() {
        // Spam keywords (congratulations, free, limited time, act now) are
        // checked before the suspicious set (prize, winner).
        let verdict = engine().classify(&email(
            "You've won a prize! Act now!",
            "Congratulations! You've won $1000. Click here to claim your free \
             prize now. Limited time offer!",
        ));
        assert_eq!(verdict.scan_result, ScanResult::Spam);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
        assert!(!should_quarantine(verdict.scan_result, verdict.risk_level));
    }

    #[test]
    fn quarantine_policy_requires_both_threat_and_critical() {
        assert!(!should_quarantine(ScanResult::Clean, RiskLevel::Critical));
        assert!(!should_quarantine(ScanResult::Phishing, RiskLevel::Medium));
        assert!(should_quarantine(ScanResult::Malware, RiskLevel::Critical));
    }

    #[test]
    fn no_rules_means_everything_is_clean() {
        let config = Config {
            rules: Vec::new(),
            ..Config::default()
        };
        let engine = ScanEngine::new(&config);
        let verdict = engine.classify(&email("free login prize", "urgent password"));
        assert_eq!(verdict.scan_result, ScanResult::Clean);
    }
}
