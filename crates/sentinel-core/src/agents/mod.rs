//! Built-in specialist agents
//!
//! Each specialist picks an operation from the message text and answers
//! with a fixed report. Record lookups (directories, threat feeds, sanctions
//! lists) belong to external services and are answered as empty results.

pub mod individual;
pub mod organization;
pub mod soar;
pub mod supervisor;
pub mod threat_intel;
pub mod transaction;

use std::sync::Arc;

use crate::agent::Agent;
use crate::registry::RegistrySlot;

pub use individual::IndividualAgent;
pub use organization::OrganizationAgent;
pub use soar::SoarAgent;
pub use supervisor::SupervisorAgent;
pub use threat_intel::ThreatIntelAgent;
pub use transaction::TransactionAgent;

pub const INDIVIDUAL: &str = "individual";
pub const ORGANIZATION: &str = "organization";
pub const TRANSACTION: &str = "transaction";
pub const THREAT_INTEL: &str = "threat_intel";
pub const SOAR: &str = "soar";
pub const SUPERVISOR: &str = "supervisor";

/// The standard set of specialists. The supervisor reads the registry
/// through `slot` once the caller has filled it.
pub fn default_roster(slot: RegistrySlot) -> Vec<Arc<dyn Agent>> {
    vec![
        Arc::new(IndividualAgent::new()),
        Arc::new(OrganizationAgent::new()),
        Arc::new(TransactionAgent::new()),
        Arc::new(SupervisorAgent::new(slot)),
        Arc::new(ThreatIntelAgent::new()),
        Arc::new(SoarAgent::new()),
    ]
}

/// True if the lower-cased message contains any of `words`
pub(crate) fn mentions(lower: &str, words: &[&str]) -> bool {
    words.iter().any(|w| lower.contains(w))
}

fn is_edge_punctuation(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '!' | '?' | '"' | '\'' | '(' | ')')
}

/// First whitespace-separated word satisfying `pred`, with surrounding
/// punctuation stripped
pub(crate) fn find_word<F>(message: &str, pred: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    message
        .split_whitespace()
        .map(|w| w.trim_matches(is_edge_punctuation))
        .map(|w| w.trim_end_matches('.'))
        .find(|w| !w.is_empty() && pred(w))
        .map(|w| w.to_string())
}
