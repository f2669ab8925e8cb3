//! Keyword routing
//!
//! Maps free text to an agent type by counting keyword hits per rule.
//! The rule with the most hits wins; on a tie the rule declared first wins.
//! Messages that hit nothing go to the default agent at a fixed confidence.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::types::RoutingDecision;

/// Confidence reported when no rule matched
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// One row of the routing table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteRule {
    pub agent_type: String,
    pub keywords: Vec<String>,
}

impl RouteRule {
    pub fn new(agent_type: &str, keywords: &[&str]) -> Self {
        Self {
            agent_type: agent_type.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Routing table as loaded from the `[routing]` config section.
/// Rule order is significant: it decides ties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingConfig {
    #[serde(default = "default_agent")]
    pub default_agent: String,
    #[serde(default = "default_rules")]
    pub rules: Vec<RouteRule>,
}

fn default_agent() -> String {
    "threat_intel".to_string()
}

fn default_rules() -> Vec<RouteRule> {
    vec![
        RouteRule::new(
            "individual",
            &[
                "user", "person", "employee", "individual", "account", "login", "access",
                "behavior", "anomaly",
            ],
        ),
        RouteRule::new(
            "organization",
            &[
                "company", "organization", "network", "system", "infrastructure",
                "vulnerability", "scan",
            ],
        ),
        RouteRule::new(
            "transaction",
            &[
                "transaction", "payment", "fraud", "money", "transfer", "financial", "purchase",
            ],
        ),
        RouteRule::new(
            "threat_intel",
            &[
                "threat", "malware", "attack", "indicator", "ioc", "threat intelligence",
                "sanctions",
            ],
        ),
        RouteRule::new(
            "incident",
            &["incident", "breach", "alert", "investigation", "forensic"],
        ),
        RouteRule::new(
            "soar",
            &["automate", "playbook", "workflow", "response", "contain", "block"],
        ),
        RouteRule::new(
            "supervisor",
            &["agent health", "health check", "supervisor", "integrity", "performance"],
        ),
    ]
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_agent: default_agent(),
            rules: default_rules(),
        }
    }
}

/// Pure, deterministic message classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<RouteRule>,
    default_agent: String,
}

impl Classifier {
    /// Build from config. Keywords are lower-cased; blank ones are dropped.
    pub fn new(config: &RoutingConfig) -> Self {
        let rules = config
            .rules
            .iter()
            .map(|rule| {
                let keywords = rule
                    .keywords
                    .iter()
                    .filter_map(|k| {
                        let k = k.trim().to_lowercase();
                        if k.is_empty() {
                            warn!("Dropping empty keyword in routing rule '{}'", rule.agent_type);
                            None
                        } else {
                            Some(k)
                        }
                    })
                    .collect();
                RouteRule {
                    agent_type: rule.agent_type.clone(),
                    keywords,
                }
            })
            .collect();

        Self {
            rules,
            default_agent: config.default_agent.clone(),
        }
    }

    pub fn default_agent(&self) -> &str {
        &self.default_agent
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn classify(&self, message: &str) -> RoutingDecision {
        let lower = message.to_lowercase();

        // (rule index, matched keywords); strict > keeps the earliest rule on ties
        let mut best: Option<(usize, Vec<&str>)> = None;
        for (idx, rule) in self.rules.iter().enumerate() {
            let matched: Vec<&str> = rule
                .keywords
                .iter()
                .filter(|k| lower.contains(k.as_str()))
                .map(|k| k.as_str())
                .collect();
            if matched.is_empty() {
                continue;
            }
            let beats = match &best {
                Some((_, current)) => matched.len() > current.len(),
                None => true,
            };
            if beats {
                best = Some((idx, matched));
            }
        }

        let Some((idx, matched)) = best else {
            debug!("No routing keywords matched, using default '{}'", self.default_agent);
            return RoutingDecision {
                agent_type: self.default_agent.clone(),
                confidence: FALLBACK_CONFIDENCE,
                matched_context: Map::new(),
            };
        };

        let word_count = lower.split_whitespace().count().max(1);
        let confidence = (matched.len() as f64 / word_count as f64 * 2.0).min(1.0);
        let agent_type = self.rules[idx].agent_type.clone();

        debug!(
            "Routed to '{}' ({} keyword(s), confidence {:.2})",
            agent_type,
            matched.len(),
            confidence
        );

        let mut matched_context = Map::new();
        matched_context.insert("keywords_matched".to_string(), Value::from(matched.len()));
        matched_context.insert(
            "matched_keywords".to_string(),
            Value::from(matched.iter().map(|k| k.to_string()).collect::<Vec<_>>()),
        );

        RoutingDecision {
            agent_type,
            confidence,
            matched_context,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}
