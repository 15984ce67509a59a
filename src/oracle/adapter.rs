// src/oracle/adapter.rs

use anyhow::{anyhow, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio::time::{sleep, Duration};

use super::prompts::{build_choice_prompt, build_coherence_prompt};
use super::rate_limiter::RateLimiter;
use super::TextOracle;
use crate::models::{Candidate, EstablishmentType};
use crate::utils::constants::{DEFAULT_COHERENCE_CONFIDENCE, ORACLE_DEGRADED_CONFIDENCE};

static OPTION_REPLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:option|choice|answer)?\s*[:#]?\s*(\d{1,4})(?:\s*[;,]\s*(\d{1,3})\s*%?)?$")
        .expect("option reply pattern")
});

/// What the oracle decided for one candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum OracleVerdict {
    Accepted { index: usize, confidence: u8 },
    /// The oracle said none of the candidates fits.
    Rejected,
    /// The reply was unusable; the first candidate is taken with low confidence.
    Degraded {
        index: usize,
        confidence: u8,
        reason: String,
    },
}

/// Parsed form of a reply to the choice prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceReply {
    /// Zero-based candidate index, with the confidence when the reply carried one.
    Choice { index: usize, confidence: Option<u8> },
    NoMatch,
    Invalid,
}

fn strip_decorations(reply: &str) -> &str {
    reply.trim().trim_matches(|c: char| {
        c == '`' || c == '"' || c == '\'' || c == '.' || c == '*' || c.is_whitespace()
    })
}

/// Accepts `N`, `N;confidence` and a few wrapped forms like `Option 2`.
/// `0` and `NONE` mean no candidate fits. Out-of-range numbers are invalid.
pub fn parse_choice_reply(reply: &str, candidate_count: usize) -> ChoiceReply {
    let cleaned = strip_decorations(reply);
    if cleaned.eq_ignore_ascii_case("none") || cleaned.eq_ignore_ascii_case("aucune") {
        return ChoiceReply::NoMatch;
    }
    let Some(caps) = OPTION_REPLY.captures(cleaned) else {
        return ChoiceReply::Invalid;
    };
    let option: usize = match caps.get(1).and_then(|m| m.as_str().parse().ok()) {
        Some(n) => n,
        None => return ChoiceReply::Invalid,
    };
    if option == 0 {
        return ChoiceReply::NoMatch;
    }
    if option > candidate_count {
        return ChoiceReply::Invalid;
    }
    let confidence = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<u16>().ok())
        .map(|c| c.min(100) as u8);
    ChoiceReply::Choice {
        index: option - 1,
        confidence,
    }
}

/// Integer confidence in 0..=100, clamped. `None` when the reply holds no number.
pub fn parse_confidence_reply(reply: &str) -> Option<u8> {
    let cleaned = strip_decorations(reply).trim_end_matches('%').trim();
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().map(|f| f.round() as i64))
        .map(|value| value.clamp(0, 100) as u8)
}

/// Meters every oracle call through the rate limiter, parses replies and
/// turns transport or format failures into degraded verdicts.
pub struct OracleAdapter {
    oracle: Box<dyn TextOracle>,
    limiter: RateLimiter,
    coherence_check: bool,
    max_attempts: usize,
    calls: usize,
}

impl OracleAdapter {
    pub fn new(oracle: Box<dyn TextOracle>, limiter: RateLimiter, coherence_check: bool) -> Self {
        Self {
            oracle,
            limiter,
            coherence_check,
            max_attempts: 1,
            calls: 0,
        }
    }

    /// Transport failures are retried up to `max_attempts` times in total.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Calls sent to the oracle so far, retries included.
    pub fn calls(&self) -> usize {
        self.calls
    }

    async fn ask(&mut self, prompt: &str) -> Result<String> {
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            self.limiter.wait_if_needed().await;
            self.limiter.record();
            self.calls += 1;
            match self.oracle.complete(prompt).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    debug!("Oracle attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        sleep(Duration::from_millis(1000 * attempt as u64)).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("oracle was never called")))
    }

    fn degraded(reason: String) -> OracleVerdict {
        OracleVerdict::Degraded {
            index: 0,
            confidence: ORACLE_DEGRADED_CONFIDENCE,
            reason,
        }
    }

    /// Asks the oracle which candidate names the same establishment as
    /// `source_name`. An empty list is rejected without a call.
    pub async fn choose_candidate(
        &mut self,
        source_name: &str,
        candidates: &[Candidate],
        type_hint: EstablishmentType,
    ) -> OracleVerdict {
        if candidates.is_empty() {
            return OracleVerdict::Rejected;
        }
        let prompt = build_choice_prompt(source_name, candidates, type_hint);
        let reply = match self.ask(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("⚠️ Oracle unavailable for '{}': {}. Taking the first candidate.", source_name, e);
                return Self::degraded(format!("transport failure: {}", e));
            }
        };
        debug!("Oracle reply for '{}': {:?}", source_name, reply);

        match parse_choice_reply(&reply, candidates.len()) {
            ChoiceReply::Choice {
                index,
                confidence: Some(confidence),
            } => OracleVerdict::Accepted { index, confidence },
            ChoiceReply::Choice {
                index,
                confidence: None,
            } => {
                let confidence = if self.coherence_check {
                    self.score_coherence(source_name, &candidates[index].name).await
                } else {
                    DEFAULT_COHERENCE_CONFIDENCE
                };
                OracleVerdict::Accepted { index, confidence }
            }
            ChoiceReply::NoMatch => OracleVerdict::Rejected,
            ChoiceReply::Invalid => {
                warn!(
                    "⚠️ Oracle reply {:?} is not an option between 1 and {}. Taking the first candidate.",
                    reply.trim(),
                    candidates.len()
                );
                Self::degraded(format!("invalid reply: {}", reply.trim()))
            }
        }
    }

    /// Confidence (0..=100) that two names designate the same establishment.
    /// Falls back to the default confidence when the reply is unusable.
    pub async fn score_coherence(&mut self, source_name: &str, chosen_name: &str) -> u8 {
        let prompt = build_coherence_prompt(source_name, chosen_name);
        match self.ask(&prompt).await {
            Ok(reply) => parse_confidence_reply(&reply).unwrap_or_else(|| {
                warn!(
                    "⚠️ Oracle coherence reply {:?} is not a number, using {}",
                    reply.trim(),
                    DEFAULT_COHERENCE_CONFIDENCE
                );
                DEFAULT_COHERENCE_CONFIDENCE
            }),
            Err(e) => {
                warn!("⚠️ Oracle coherence check failed: {}", e);
                DEFAULT_COHERENCE_CONFIDENCE
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned replies and records every prompt it receives.
    #[derive(Clone, Default)]
    pub(crate) struct ScriptedOracle {
        pub replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
        pub prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedOracle {
        pub(crate) fn new(replies: Vec<Result<&str, &str>>) -> Self {
            let replies = replies
                .into_iter()
                .map(|r| r.map(str::to_string).map_err(str::to_string))
                .collect();
            Self {
                replies: Arc::new(Mutex::new(replies)),
                prompts: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextOracle for ScriptedOracle {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(e)) => Err(anyhow!(e)),
                None => Err(anyhow!("no scripted reply left")),
            }
        }
    }

    fn candidates(n: usize) -> Vec<Candidate> {
        (1..=n)
            .map(|i| Candidate {
                name: format!("CLINIQUE {}", i),
                secondary_name: None,
                identifier: format!("33000000{}", i),
            })
            .collect()
    }

    fn adapter(oracle: &ScriptedOracle, coherence: bool) -> OracleAdapter {
        OracleAdapter::new(
            Box::new(oracle.clone()),
            RateLimiter::new(50, Duration::from_secs(60)),
            coherence,
        )
    }

    #[test]
    fn test_parse_choice_reply() {
        assert_eq!(parse_choice_reply("2", 3), ChoiceReply::Choice { index: 1, confidence: None });
        assert_eq!(
            parse_choice_reply(" 3;85 ", 3),
            ChoiceReply::Choice { index: 2, confidence: Some(85) }
        );
        assert_eq!(
            parse_choice_reply("Option 1", 3),
            ChoiceReply::Choice { index: 0, confidence: None }
        );
        assert_eq!(parse_choice_reply("`1`.", 3), ChoiceReply::Choice { index: 0, confidence: None });
        assert_eq!(
            parse_choice_reply("2;140", 3),
            ChoiceReply::Choice { index: 1, confidence: Some(100) }
        );
        assert_eq!(parse_choice_reply("0", 3), ChoiceReply::NoMatch);
        assert_eq!(parse_choice_reply("NONE", 3), ChoiceReply::NoMatch);
        assert_eq!(parse_choice_reply("4", 3), ChoiceReply::Invalid);
        assert_eq!(parse_choice_reply("The second one", 3), ChoiceReply::Invalid);
        assert_eq!(parse_choice_reply("", 3), ChoiceReply::Invalid);
    }

    #[test]
    fn test_parse_confidence_reply() {
        assert_eq!(parse_confidence_reply("85"), Some(85));
        assert_eq!(parse_confidence_reply("92%"), Some(92));
        assert_eq!(parse_confidence_reply("150"), Some(100));
        assert_eq!(parse_confidence_reply("-5"), Some(0));
        assert_eq!(parse_confidence_reply("87.6"), Some(88));
        assert_eq!(parse_confidence_reply("very sure"), None);
    }

    #[tokio::test]
    async fn test_reply_with_confidence_is_accepted_in_one_call() {
        let oracle = ScriptedOracle::new(vec![Ok("2;88")]);
        let mut adapter = adapter(&oracle, true);
        let verdict = adapter
            .choose_candidate("Clinique 2", &candidates(3), EstablishmentType::Clinic)
            .await;
        assert_eq!(verdict, OracleVerdict::Accepted { index: 1, confidence: 88 });
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_bare_choice_triggers_coherence_call() {
        let oracle = ScriptedOracle::new(vec![Ok("1"), Ok("91")]);
        let mut adapter = adapter(&oracle, true);
        let verdict = adapter
            .choose_candidate("Clinique 1", &candidates(2), EstablishmentType::Unknown)
            .await;
        assert_eq!(verdict, OracleVerdict::Accepted { index: 0, confidence: 91 });
        assert_eq!(oracle.prompt_count(), 2);
        assert!(oracle.prompts.lock().unwrap()[1].contains("Name 2: \"CLINIQUE 1\""));
    }

    #[tokio::test]
    async fn test_bare_choice_without_coherence_uses_default() {
        let oracle = ScriptedOracle::new(vec![Ok("2"), Ok("1"), Ok("garbage")]);
        let mut plain = adapter(&oracle, false);
        let verdict = plain
            .choose_candidate("Clinique 2", &candidates(2), EstablishmentType::Unknown)
            .await;
        assert_eq!(verdict, OracleVerdict::Accepted { index: 1, confidence: 75 });

        // Unusable coherence reply also falls back to the default.
        let mut checked = adapter(&oracle, true);
        let verdict = checked
            .choose_candidate("Clinique 1", &candidates(2), EstablishmentType::Unknown)
            .await;
        assert_eq!(verdict, OracleVerdict::Accepted { index: 0, confidence: 75 });
    }

    #[tokio::test]
    async fn test_invalid_reply_degrades_to_first_candidate() {
        let oracle = ScriptedOracle::new(vec![Ok("7")]);
        let mut adapter = adapter(&oracle, true);
        match adapter
            .choose_candidate("Clinique", &candidates(3), EstablishmentType::Unknown)
            .await
        {
            OracleVerdict::Degraded { index, confidence, .. } => {
                assert_eq!(index, 0);
                assert_eq!(confidence, 50);
            }
            other => panic!("unexpected verdict {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_rejects_and_empty_list_skips_the_call() {
        let oracle = ScriptedOracle::new(vec![Ok("0")]);
        let mut adapter = adapter(&oracle, true);
        assert_eq!(
            adapter.choose_candidate("Clinique", &[], EstablishmentType::Unknown).await,
            OracleVerdict::Rejected
        );
        assert_eq!(adapter.calls(), 0);
        assert_eq!(
            adapter
                .choose_candidate("Clinique", &candidates(2), EstablishmentType::Unknown)
                .await,
            OracleVerdict::Rejected
        );
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failures_are_retried_then_degraded() {
        let oracle = ScriptedOracle::new(vec![Err("timeout"), Ok("2;70")]);
        let mut retrying = adapter(&oracle, false).with_max_attempts(2);
        let verdict = retrying
            .choose_candidate("Clinique 2", &candidates(2), EstablishmentType::Unknown)
            .await;
        assert_eq!(verdict, OracleVerdict::Accepted { index: 1, confidence: 70 });
        assert_eq!(retrying.calls(), 2);

        let oracle = ScriptedOracle::new(vec![Err("connection refused")]);
        let mut single = adapter(&oracle, false);
        match single
            .choose_candidate("Clinique", &candidates(2), EstablishmentType::Unknown)
            .await
        {
            OracleVerdict::Degraded { index: 0, confidence: 50, reason } => {
                assert!(reason.contains("connection refused"));
            }
            other => panic!("unexpected verdict {:?}", other),
        }
    }
}
