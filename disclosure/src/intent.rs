//! Intent signals: keyword triggers extracted from a single user message
//!
//! Keywords match case-insensitively at word boundaries. A trailing `*` turns
//! a keyword into a prefix match (`urgent*` matches "urgently"), a leading `*`
//! lets it start inside a word (`*office*` matches "headoffice"). Spaces
//! inside a keyword match any run of whitespace.

use crate::error::{PolicyError, PolicyResult};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Keyword sets for each trigger, as configured by the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keywords {
    /// Requests for the invoice or bill itself
    pub invoice: Vec<String>,
    /// Office, claim or reimbursement needs that justify disclosing tax figures
    pub tax_claim: Vec<String>,
    /// Technician visits and installation requests
    pub technician: Vec<String>,
    /// Explicit frustration or urgency markers
    pub frustration: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            invoice: words(&["invoice*", "bill", "bills", "receipt*", "gst"]),
            tax_claim: words(&["*office*", "*claim*", "*reimburs*"]),
            technician: words(&[
                "*technician*",
                "install",
                "installation*",
                "installing",
                "installed",
            ]),
            frustration: words(&[
                "need it now",
                "right now",
                "deadline*",
                "urgent*",
                "asap",
                "immediately",
                "still waiting",
                "fed up",
            ]),
        }
    }
}

/// Triggers present in one message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSignals {
    pub invoice_request: bool,
    pub tax_claim: bool,
    pub service_request: bool,
    pub frustration: bool,
}

impl IntentSignals {
    /// No trigger fired; the message falls through to a generic acknowledgement
    pub fn is_unrecognized(&self) -> bool {
        !(self.invoice_request || self.tax_claim || self.service_request || self.frustration)
    }
}

/// Compiled matcher for one keyword set
#[derive(Debug, Clone)]
struct KeywordMatcher {
    regex: Option<Regex>,
}

impl KeywordMatcher {
    fn compile(set: &'static str, keywords: &[String]) -> PolicyResult<Self> {
        let alternatives: Vec<String> = keywords
            .iter()
            .filter_map(|k| {
                let k = k.trim().to_lowercase();
                let (k, infix) = match k.strip_prefix('*') {
                    Some(rest) => (rest.trim_start().to_string(), true),
                    None => (k.clone(), false),
                };
                let (stem, prefix) = match k.strip_suffix('*') {
                    Some(stem) => (stem.trim_end().to_string(), true),
                    None => (k.clone(), false),
                };
                if stem.is_empty() {
                    return None;
                }
                let body = stem
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+");
                let start = if infix { "" } else { r"\b" };
                let end = if prefix { "" } else { r"\b" };
                Some(format!("{}{}{}", start, body, end))
            })
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { regex: None });
        }

        let pattern = format!("(?i)(?:{})", alternatives.join("|"));
        let regex =
            Regex::new(&pattern).map_err(|e| PolicyError::invalid_keywords(set, e.to_string()))?;
        Ok(Self { regex: Some(regex) })
    }

    fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(text))
    }
}

/// Classifies user messages into [`IntentSignals`]
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    invoice: KeywordMatcher,
    tax_claim: KeywordMatcher,
    technician: KeywordMatcher,
    frustration: KeywordMatcher,
}

impl IntentClassifier {
    pub fn new(keywords: &Keywords) -> PolicyResult<Self> {
        Ok(Self {
            invoice: KeywordMatcher::compile("invoice", &keywords.invoice)?,
            tax_claim: KeywordMatcher::compile("tax_claim", &keywords.tax_claim)?,
            technician: KeywordMatcher::compile("technician", &keywords.technician)?,
            frustration: KeywordMatcher::compile("frustration", &keywords.frustration)?,
        })
    }

    pub fn classify(&self, message: &str) -> IntentSignals {
        IntentSignals {
            invoice_request: self.invoice.is_match(message),
            tax_claim: self.tax_claim.is_match(message),
            service_request: self.technician.is_match(message),
            frustration: self.frustration.is_match(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> IntentClassifier {
        IntentClassifier::new(&Keywords::default()).unwrap()
    }

    #[test]
    fn test_invoice_request() {
        let s = classifier().classify("Where is my INVOICE?");
        assert!(s.invoice_request);
        assert!(!s.tax_claim && !s.service_request && !s.frustration);
    }

    #[test]
    fn test_tax_claim_variants() {
        let c = classifier();
        assert!(c.classify("it's for my office").tax_claim);
        assert!(c.classify("I want to claim it").tax_claim);
        assert!(c.classify("company reimbursement").tax_claim);
        assert!(c.classify("can I get reimbursed").tax_claim);
    }

    #[test]
    fn test_prefix_keyword_matches_inflections() {
        let s = classifier().classify("I need it urgently, deadline today");
        assert!(s.frustration);
        assert!(!s.invoice_request);
    }

    #[test]
    fn test_whole_word_keyword_does_not_match_longer_word() {
        let c = classifier();
        assert!(!c.classify("can I pay in installments").service_request);
        assert!(c.classify("please send a technician").service_request);
        assert!(c.classify("I want installation").service_request);
        assert!(!c.classify("billionaire").invoice_request);
    }

    #[test]
    fn test_claim_and_technician_stems_match_inside_words() {
        let c = classifier();
        assert!(c.classify("send it to our headoffice").tax_claim);
        assert!(c.classify("it's for my insurance reclaim").tax_claim);
        assert!(c.classify("need a servicetechnician").service_request);
        assert!(!c.classify("send it to our head").tax_claim);
    }

    #[test]
    fn test_infix_keyword_needs_leading_star() {
        let keywords = Keywords {
            invoice: vec!["bill*".into()],
            ..Default::default()
        };
        let c = IntentClassifier::new(&keywords).unwrap();
        assert!(c.classify("billing").invoice_request);
        assert!(!c.classify("prebilled").invoice_request);

        let keywords = Keywords {
            invoice: vec!["*bill*".into(), "*".into(), "**".into()],
            ..Default::default()
        };
        let c = IntentClassifier::new(&keywords).unwrap();
        assert!(c.classify("prebilled").invoice_request);
        assert!(!c.classify("hello").invoice_request);
    }

    #[test]
    fn test_phrase_tolerates_extra_whitespace() {
        assert!(classifier().classify("I NEED  it\tnow").frustration);
    }

    #[test]
    fn test_unrecognized() {
        assert!(classifier().classify("hello there").is_unrecognized());
    }

    #[test]
    fn test_empty_keyword_set_never_matches() {
        let keywords = Keywords {
            frustration: vec![],
            ..Default::default()
        };
        let c = IntentClassifier::new(&keywords).unwrap();
        assert!(!c.classify("urgent").frustration);
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let keywords = Keywords {
            invoice: vec!["bill(s)".into()],
            ..Default::default()
        };
        let c = IntentClassifier::new(&keywords).unwrap();
        assert!(!c.classify("bills").invoice_request);
    }
}
