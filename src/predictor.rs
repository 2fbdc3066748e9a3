//! Pattern predictor - rule chain over the outcome history
//!
//! Rules are evaluated in a fixed priority order and the first match wins.
//! Two rule sets are available:
//!
//! - `Strict`: oscillation, streak (break at >= 5, follow at 2..=4),
//!   2-1-2-1 cadence template, reversal
//! - `Lenient`: oscillation, streak (follow at >= 3), repeating 4-window,
//!   reversal
//!
//! Confidence values are constants looked up per rule, not probabilities.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::Outcome;

/// Minimum history length before any rule is evaluated
pub const DEFAULT_MIN_HISTORY: usize = 8;

const OSCILLATION_WINDOW: usize = 6;
const CADENCE_WINDOW: usize = 6;
const REPEAT_WINDOW: usize = 4;

/// Which rule set to run
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RulePolicy {
    /// Richer rule set with streak breaking and the cadence template
    #[default]
    Strict,
    /// Simpler rule set with a single streak threshold and window recurrence
    Lenient,
}

impl RulePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RulePolicy::Strict => "strict",
            RulePolicy::Lenient => "lenient",
        }
    }

    /// Rules after the insufficient-data guard, in priority order
    fn chain(self) -> &'static [Rule] {
        match self {
            RulePolicy::Strict => &[
                Rule::Oscillation,
                Rule::Streak,
                Rule::Cadence,
                Rule::Reversal,
            ],
            RulePolicy::Lenient => &[
                Rule::Oscillation,
                Rule::Streak,
                Rule::RepeatWindow,
                Rule::Reversal,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Oscillation,
    Streak,
    Cadence,
    RepeatWindow,
    Reversal,
}

/// Confidence constant per rule
///
/// Entries a policy never consults are kept so that a single table type
/// serves both policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceTable {
    pub oscillation: u8,
    pub streak_break: u8,
    pub streak_follow: u8,
    pub cadence: u8,
    pub repeat_window: u8,
    pub reversal: u8,
}

impl ConfidenceTable {
    pub fn for_policy(policy: RulePolicy) -> Self {
        match policy {
            RulePolicy::Strict => Self {
                oscillation: 85,
                streak_break: 75,
                streak_follow: 65,
                cadence: 70,
                repeat_window: 70,
                reversal: 50,
            },
            RulePolicy::Lenient => Self {
                oscillation: 60,
                streak_break: 75,
                streak_follow: 90,
                cadence: 70,
                repeat_window: 70,
                reversal: 50,
            },
        }
    }
}

/// Which rule produced a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rationale {
    InsufficientData,
    Oscillation,
    StreakBreak,
    StreakFollow,
    Cadence,
    RepeatWindow,
    Reversal,
}

impl Rationale {
    /// Human-readable tag returned to clients
    pub fn tag(self) -> &'static str {
        match self {
            Rationale::InsufficientData => "Chưa đủ dữ liệu",
            Rationale::Oscillation => "Giằng co",
            Rationale::StreakBreak => "Bẻ bệt",
            Rationale::StreakFollow => "Bệt",
            Rationale::Cadence => "Cầu 2-1",
            Rationale::RepeatWindow => "Lặp pattern",
            Rationale::Reversal => "Đảo cầu",
        }
    }

    /// Stable rule name for logs
    pub fn rule_name(self) -> &'static str {
        match self {
            Rationale::InsufficientData => "insufficient_data",
            Rationale::Oscillation => "oscillation",
            Rationale::StreakBreak => "streak_break",
            Rationale::StreakFollow => "streak_follow",
            Rationale::Cadence => "cadence",
            Rationale::RepeatWindow => "repeat_window",
            Rationale::Reversal => "reversal",
        }
    }
}

/// Result of one predictor run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    /// `None` when there is not enough history
    pub outcome: Option<Outcome>,
    pub confidence: u8,
    pub rationale: Rationale,
}

impl Prediction {
    fn new(outcome: Outcome, confidence: u8, rationale: Rationale) -> Self {
        Self {
            outcome: Some(outcome),
            confidence,
            rationale,
        }
    }

    fn insufficient() -> Self {
        Self {
            outcome: None,
            confidence: 0,
            rationale: Rationale::InsufficientData,
        }
    }

    /// Display label: the predicted outcome, or the not-enough-data tag
    pub fn label(&self) -> &'static str {
        match self.outcome {
            Some(outcome) => outcome.label(),
            None => Rationale::InsufficientData.tag(),
        }
    }
}

/// Everything the predictor needs besides the history itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorSettings {
    pub policy: RulePolicy,
    pub min_history: usize,
    pub confidence: ConfidenceTable,
}

impl PredictorSettings {
    pub fn for_policy(policy: RulePolicy) -> Self {
        Self {
            policy,
            min_history: DEFAULT_MIN_HISTORY,
            confidence: ConfidenceTable::for_policy(policy),
        }
    }
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self::for_policy(RulePolicy::default())
    }
}

/// Predict the next outcome from an oldest-first history
pub fn predict(history: &[Outcome], settings: &PredictorSettings) -> Prediction {
    // The rules below index the tail, so never go under one entry
    if history.len() < settings.min_history.max(1) {
        return Prediction::insufficient();
    }

    for rule in settings.policy.chain() {
        if let Some(prediction) = apply_rule(*rule, history, settings) {
            debug!(
                rule = prediction.rationale.rule_name(),
                policy = settings.policy.as_str(),
                len = history.len(),
                "Predictor rule matched"
            );
            return prediction;
        }
    }

    // The chain always ends in Reversal
    Prediction::insufficient()
}

fn apply_rule(rule: Rule, history: &[Outcome], settings: &PredictorSettings) -> Option<Prediction> {
    let table = &settings.confidence;
    let last = *history.last()?;

    match rule {
        Rule::Oscillation => is_oscillating(tail(history, OSCILLATION_WINDOW)?).then(|| {
            Prediction::new(last.opposite(), table.oscillation, Rationale::Oscillation)
        }),
        Rule::Streak => {
            let run = trailing_run(history);
            match settings.policy {
                RulePolicy::Strict if run >= 5 => Some(Prediction::new(
                    last.opposite(),
                    table.streak_break,
                    Rationale::StreakBreak,
                )),
                RulePolicy::Strict if run >= 2 => Some(Prediction::new(
                    last,
                    table.streak_follow,
                    Rationale::StreakFollow,
                )),
                RulePolicy::Lenient if run >= 3 => Some(Prediction::new(
                    last,
                    table.streak_follow,
                    Rationale::StreakFollow,
                )),
                _ => None,
            }
        }
        Rule::Cadence => cadence_next(tail(history, CADENCE_WINDOW)?)
            .map(|next| Prediction::new(next, table.cadence, Rationale::Cadence)),
        Rule::RepeatWindow => repeat_window_match(history)
            .map(|start| Prediction::new(history[start], table.repeat_window, Rationale::RepeatWindow)),
        Rule::Reversal => Some(Prediction::new(
            last.opposite(),
            table.reversal,
            Rationale::Reversal,
        )),
    }
}

fn tail(history: &[Outcome], n: usize) -> Option<&[Outcome]> {
    history.len().checked_sub(n).map(|start| &history[start..])
}

/// Length of the maximal run of identical outcomes at the end
pub fn trailing_run(history: &[Outcome]) -> usize {
    match history.last() {
        Some(&last) => history.iter().rev().take_while(|&&o| o == last).count(),
        None => 0,
    }
}

/// A-B-A-B-... with every neighbour different
fn is_oscillating(window: &[Outcome]) -> bool {
    window.len() >= 2 && window.windows(2).all(|pair| pair[0] != pair[1])
}

/// Matches A-A-B-A-A-B and returns A, the value that extends the cadence
fn cadence_next(window: &[Outcome]) -> Option<Outcome> {
    let a = window[0];
    let b = a.opposite();
    (window == [a, a, b, a, a, b]).then_some(a)
}

/// Start index of the nearest earlier occurrence of the last four outcomes
///
/// The scan starts at `len - 9` and walks towards the front, so an earlier
/// occurrence never overlaps the current window and is at least one
/// position clear of it.
fn repeat_window_match(history: &[Outcome]) -> Option<usize> {
    if history.len() < 2 * REPEAT_WINDOW {
        return None;
    }
    let window = tail(history, REPEAT_WINDOW)?;
    let newest_start = history.len().checked_sub(2 * REPEAT_WINDOW + 1)?;

    (0..=newest_start)
        .rev()
        .find(|&i| &history[i..i + REPEAT_WINDOW] == window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::parse_codes;

    fn run(codes: &str, policy: RulePolicy) -> Prediction {
        let history = parse_codes(codes).unwrap();
        predict(&history, &PredictorSettings::for_policy(policy))
    }

    #[test]
    fn test_insufficient_data_below_eight() {
        for codes in ["", "t", "xxxxxxx", "txtxtxt", "ttxttxt"] {
            for policy in [RulePolicy::Strict, RulePolicy::Lenient] {
                let p = run(codes, policy);
                assert_eq!(p.outcome, None, "history {:?}", codes);
                assert_eq!(p.confidence, 0);
                assert_eq!(p.rationale, Rationale::InsufficientData);
                assert_eq!(p.label(), "Chưa đủ dữ liệu");
            }
        }
    }

    #[test]
    fn test_strict_long_streak_predicts_break() {
        let p = run("txtxxxxx", RulePolicy::Strict);
        assert_eq!(p.outcome, Some(Outcome::Tai));
        assert_eq!(p.confidence, 75);
        assert_eq!(p.rationale, Rationale::StreakBreak);
    }

    #[test]
    fn test_strict_short_streak_predicts_follow() {
        for codes in ["xtxtxxtt", "xtxxtttt", "txtxtxxx"] {
            let p = run(codes, RulePolicy::Strict);
            assert_eq!(p.outcome.map(|o| o.code()), codes.chars().last());
            assert_eq!(p.confidence, 65, "history {}", codes);
            assert_eq!(p.rationale, Rationale::StreakFollow);
        }
    }

    #[test]
    fn test_oscillation_continues_alternation() {
        let strict = run("ttxtxtxt", RulePolicy::Strict);
        assert_eq!(strict.outcome, Some(Outcome::Xiu));
        assert_eq!(strict.confidence, 85);
        assert_eq!(strict.rationale, Rationale::Oscillation);

        let lenient = run("xxtxtxtx", RulePolicy::Lenient);
        assert_eq!(lenient.outcome, Some(Outcome::Tai));
        assert_eq!(lenient.confidence, 60);
        assert_eq!(lenient.rationale, Rationale::Oscillation);
    }

    #[test]
    fn test_strict_cadence_template() {
        let p = run("xxttxttx", RulePolicy::Strict);
        assert_eq!(p.outcome, Some(Outcome::Tai));
        assert_eq!(p.confidence, 70);
        assert_eq!(p.rationale, Rationale::Cadence);

        let p = run("ttxxtxxt", RulePolicy::Strict);
        assert_eq!(p.outcome, Some(Outcome::Xiu));
        assert_eq!(p.rationale, Rationale::Cadence);
    }

    #[test]
    fn test_cadence_not_used_by_lenient() {
        let p = run("xxttxttx", RulePolicy::Lenient);
        assert_ne!(p.rationale, Rationale::Cadence);
    }

    #[test]
    fn test_reversal_default() {
        let p = run("tttxxtxt", RulePolicy::Strict);
        assert_eq!(p.outcome, Some(Outcome::Xiu));
        assert_eq!(p.confidence, 50);
        assert_eq!(p.rationale, Rationale::Reversal);

        let p = run("tttxxtxt", RulePolicy::Lenient);
        assert_eq!(p.outcome, Some(Outcome::Xiu));
        assert_eq!(p.rationale, Rationale::Reversal);
    }

    #[test]
    fn test_lenient_streak_threshold_three() {
        let p = run("txtxxxxx", RulePolicy::Lenient);
        assert_eq!(p.outcome, Some(Outcome::Xiu));
        assert_eq!(p.confidence, 90);
        assert_eq!(p.rationale, Rationale::StreakFollow);

        // A run of two is not a streak for the lenient rule set
        let p = run("tttxxtxx", RulePolicy::Lenient);
        assert_ne!(p.rationale, Rationale::StreakFollow);
    }

    #[test]
    fn test_lenient_repeat_window() {
        let p = run("txxtxtxxt", RulePolicy::Lenient);
        assert_eq!(p.outcome, Some(Outcome::Tai));
        assert_eq!(p.confidence, 70);
        assert_eq!(p.rationale, Rationale::RepeatWindow);

        // Strict has no window rule and falls through to reversal
        let p = run("txxtxtxxt", RulePolicy::Strict);
        assert_eq!(p.rationale, Rationale::Reversal);
    }

    #[test]
    fn test_repeat_window_prefers_nearest_match() {
        let history = parse_codes("txxtxtxxtxtxxt").unwrap();
        assert_eq!(repeat_window_match(&history), Some(5));

        // A window that only overlaps itself is not a recurrence
        let history = parse_codes("txxtxtxxt").unwrap();
        assert_eq!(repeat_window_match(&history[1..]), None);
    }

    #[test]
    fn test_trailing_run() {
        assert_eq!(trailing_run(&[]), 0);
        assert_eq!(trailing_run(&parse_codes("t").unwrap()), 1);
        assert_eq!(trailing_run(&parse_codes("xttt").unwrap()), 3);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let history = parse_codes("txtxxtttxtxx").unwrap();
        for policy in [RulePolicy::Strict, RulePolicy::Lenient] {
            let settings = PredictorSettings::for_policy(policy);
            assert_eq!(predict(&history, &settings), predict(&history, &settings));
        }
    }

    #[test]
    fn test_confidence_table_override() {
        let mut settings = PredictorSettings::for_policy(RulePolicy::Strict);
        settings.confidence.oscillation = 99;
        let history = parse_codes("ttxtxtxt").unwrap();
        assert_eq!(predict(&history, &settings).confidence, 99);
    }

    #[test]
    fn test_min_history_configurable() {
        let mut settings = PredictorSettings::for_policy(RulePolicy::Strict);
        settings.min_history = 3;
        let history = parse_codes("ttt").unwrap();
        let p = predict(&history, &settings);
        assert_eq!(p.rationale, Rationale::StreakFollow);
        assert_eq!(p.outcome, Some(Outcome::Tai));
    }
}
