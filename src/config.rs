use crate::types::{RiskLevel, ScanResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_path: String,
    pub default_owner: String,
    /// Ordered, first-match-wins. Rule order is priority order.
    pub rules: Vec<ThreatRule>,
}

/// One classification rule: if any keyword appears in the subject or content,
/// the email gets this category and risk level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatRule {
    pub category: ScanResult,
    pub risk_level: RiskLevel,
    pub keywords: Vec<String>,
    pub threat_type: String,
    pub indicators: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "mailwarden.db".to_string(),
            default_owner: "local".to_string(),
            rules: vec![
                ThreatRule {
                    category: ScanResult::Phishing,
                    risk_level: RiskLevel::Critical,
                    keywords: vec![
                        "login".to_string(),
                        "password".to_string(),
                        "update payment".to_string(),
                        "confirm identity".to_string(),
                    ],
                    threat_type: "phishing".to_string(),
                    indicators: vec![
                        "suspicious_links".to_string(),
                        "credential_harvesting".to_string(),
                    ],
                },
                ThreatRule {
                    category: ScanResult::Spam,
                    risk_level: RiskLevel::Medium,
                    keywords: vec![
                        "free".to_string(),
                        "limited time".to_string(),
                        "act now".to_string(),
                        "congratulations".to_string(),
                    ],
                    threat_type: "spam".to_string(),
                    indicators: vec!["promotional_content".to_string()],
                },
                ThreatRule {
                    category: ScanResult::Suspicious,
                    risk_level: RiskLevel::Medium,
                    keywords: vec![
                        "urgent".to_string(),
                        "click here".to_string(),
                        "verify account".to_string(),
                        "suspended".to_string(),
                        "prize".to_string(),
                        "winner".to_string(),
                    ],
                    threat_type: "suspicious".to_string(),
                    indicators: vec!["suspicious_content".to_string()],
                },
            ],
        }
    }
}

impl Config {
    /// Load configuration from a YAML file. A missing file is not an error:
    /// the built-in defaults apply (logged at startup).
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            log::info!("No config file at {path}, using built-in defaults");
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {path}"))?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rules.is_empty() {
            log::warn!("Config has no rules; every email will scan clean");
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.keywords.is_empty() {
                anyhow::bail!("Rule {} ({}) has no keywords", i, rule.category.as_str());
            }
            if rule.keywords.iter().any(|k| k.trim().is_empty()) {
                anyhow::bail!("Rule {} ({}) has a blank keyword", i, rule.category.as_str());
            }
            if rule.category == ScanResult::Clean {
                anyhow::bail!("Rule {i} classifies as clean; clean is the fallback, not a rule");
            }
        }
        Ok(())
    }
}
