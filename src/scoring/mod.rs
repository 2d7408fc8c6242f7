//! Top-six scoring.
//!
//! A prediction is an ordered guess of the six drivers expected to finish
//! highest. Each predicted position earns [`ScoringRules::exact_points`] when
//! the driver finished exactly there, [`ScoringRules::in_top_six_points`] when
//! the driver finished somewhere else in the top six, and nothing otherwise.
//! Having all six drivers somewhere in the top six adds
//! [`ScoringRules::all_in_top_six_bonus`].

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

pub const TOP_SIX: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("Expected 6 drivers, got {0}")]
    WrongLength(usize),

    #[error("Driver at P{0} is empty")]
    EmptyDriver(usize),

    #[error("Missing driver for P{0}")]
    MissingPosition(usize),

    #[error("Unknown position key '{0}', expected P1..P6")]
    UnknownPosition(String),

    #[error("Driver '{0}' appears more than once")]
    DuplicateDriver(String),

    #[error("P{0} is given more than once")]
    DuplicatePosition(usize),
}

/// Accepted wire shapes for a top six: `["ver", ...]` or `{"P1": "ver", ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TopSixInput {
    List(Vec<String>),
    Positions(HashMap<String, String>),
}

/// Six distinct, normalised driver IDs in finishing order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TopSixInput", into = "Vec<String>")]
pub struct TopSix([String; TOP_SIX]);

impl TopSix {
    pub fn parse(input: TopSixInput) -> Result<Self, ScoringError> {
        match input {
            TopSixInput::List(drivers) => Self::from_drivers(drivers),
            TopSixInput::Positions(map) => {
                let mut slots: [Option<String>; TOP_SIX] = Default::default();
                for (key, driver) in map {
                    let index = position_index(&key)
                        .ok_or_else(|| ScoringError::UnknownPosition(key.clone()))?;
                    if slots[index].is_some() {
                        return Err(ScoringError::DuplicatePosition(index + 1));
                    }
                    slots[index] = Some(driver);
                }
                let mut drivers = Vec::with_capacity(TOP_SIX);
                for (i, slot) in slots.into_iter().enumerate() {
                    drivers.push(slot.ok_or(ScoringError::MissingPosition(i + 1))?);
                }
                Self::from_drivers(drivers)
            }
        }
    }

    pub fn from_drivers<S: AsRef<str>>(drivers: Vec<S>) -> Result<Self, ScoringError> {
        if drivers.len() != TOP_SIX {
            return Err(ScoringError::WrongLength(drivers.len()));
        }

        let mut seen = HashSet::with_capacity(TOP_SIX);
        let mut normalised: [String; TOP_SIX] = Default::default();
        for (i, driver) in drivers.iter().enumerate() {
            let id = normalise_driver_id(driver.as_ref());
            if id.is_empty() {
                return Err(ScoringError::EmptyDriver(i + 1));
            }
            if !seen.insert(id.clone()) {
                return Err(ScoringError::DuplicateDriver(id));
            }
            normalised[i] = id;
        }
        Ok(Self(normalised))
    }

    pub fn drivers(&self) -> &[String; TOP_SIX] {
        &self.0
    }

    /// Zero-based finishing index of a driver, if in the top six.
    pub fn position_of(&self, driver: &str) -> Option<usize> {
        self.0.iter().position(|d| d == driver)
    }
}

impl TryFrom<TopSixInput> for TopSix {
    type Error = ScoringError;

    fn try_from(input: TopSixInput) -> Result<Self, Self::Error> {
        TopSix::parse(input)
    }
}

impl From<TopSix> for Vec<String> {
    fn from(top: TopSix) -> Self {
        top.0.into()
    }
}

impl fmt::Display for TopSix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

pub fn normalise_driver_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn position_index(key: &str) -> Option<usize> {
    let digits = key.trim().strip_prefix(|c: char| c == 'P' || c == 'p')?;
    match digits.parse::<usize>() {
        Ok(n) if (1..=TOP_SIX).contains(&n) => Some(n - 1),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub exact_points: u32,
    pub in_top_six_points: u32,
    pub all_in_top_six_bonus: u32,
}

impl ScoringRules {
    /// The league's only rule set.
    pub const CANONICAL: ScoringRules = ScoringRules {
        exact_points: 5,
        in_top_six_points: 3,
        all_in_top_six_bonus: 10,
    };

    pub fn max_points(&self) -> u32 {
        self.exact_points * TOP_SIX as u32 + self.all_in_top_six_bonus
    }

    pub fn score(&self, predicted: &TopSix, actual: &TopSix) -> ScoreBreakdown {
        let mut positions = Vec::with_capacity(TOP_SIX);
        let mut exact_matches = 0;
        let mut top_six_matches = 0;

        for (index, driver) in predicted.drivers().iter().enumerate() {
            let outcome = match actual.position_of(driver) {
                Some(found) if found == index => PositionOutcome::Exact,
                Some(found) => PositionOutcome::InTopSix { finished: found + 1 },
                None => PositionOutcome::Miss,
            };
            let points = match outcome {
                PositionOutcome::Exact => {
                    exact_matches += 1;
                    self.exact_points
                }
                PositionOutcome::InTopSix { .. } => {
                    top_six_matches += 1;
                    self.in_top_six_points
                }
                PositionOutcome::Miss => 0,
            };
            positions.push(PositionScore {
                position: index + 1,
                driver: driver.clone(),
                outcome,
                points,
            });
        }

        let bonus_awarded = exact_matches + top_six_matches == TOP_SIX as u32;
        let bonus_points = if bonus_awarded { self.all_in_top_six_bonus } else { 0 };
        let total_points = positions.iter().map(|p| p.points).sum::<u32>() + bonus_points;

        ScoreBreakdown {
            positions,
            exact_matches,
            top_six_matches,
            bonus_awarded,
            bonus_points,
            total_points,
        }
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::CANONICAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PositionOutcome {
    Exact,
    InTopSix { finished: usize },
    Miss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionScore {
    /// One-based predicted position.
    pub position: usize,
    pub driver: String,
    pub outcome: PositionOutcome,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub positions: Vec<PositionScore>,
    pub exact_matches: u32,
    pub top_six_matches: u32,
    pub bonus_awarded: bool,
    pub bonus_points: u32,
    pub total_points: u32,
}

impl ScoreBreakdown {
    /// One-line description stored alongside the score.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .positions
            .iter()
            .map(|p| {
                let label = match p.outcome {
                    PositionOutcome::Exact => "exact".to_string(),
                    PositionOutcome::InTopSix { finished } => format!("top6 (P{})", finished),
                    PositionOutcome::Miss => "miss".to_string(),
                };
                format!("P{} {} {} +{}", p.position, p.driver, label, p.points)
            })
            .collect();
        if self.bonus_awarded {
            parts.push(format!("bonus +{}", self.bonus_points));
        }
        parts.join(", ")
    }
}

/// Scores a prediction with [`ScoringRules::CANONICAL`].
pub fn calculate_score(predicted: &TopSix, actual: &TopSix) -> ScoreBreakdown {
    ScoringRules::CANONICAL.score(predicted, actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top(drivers: [&str; 6]) -> TopSix {
        TopSix::from_drivers(drivers.to_vec()).unwrap()
    }

    fn actual() -> TopSix {
        top(["ver", "nor", "lec", "pia", "sai", "ham"])
    }

    #[test]
    fn test_identical_prediction_scores_maximum() {
        let breakdown = calculate_score(&actual(), &actual());
        assert_eq!(breakdown.exact_matches, 6);
        assert!(breakdown.bonus_awarded);
        assert_eq!(breakdown.total_points, 40);
        assert_eq!(ScoringRules::CANONICAL.max_points(), 40);
    }

    #[test]
    fn test_no_overlap_scores_zero() {
        let predicted = top(["alo", "str", "gas", "oco", "alb", "tsu"]);
        let breakdown = calculate_score(&predicted, &actual());
        assert_eq!(breakdown.total_points, 0);
        assert!(!breakdown.bonus_awarded);
        assert!(breakdown.positions.iter().all(|p| p.outcome == PositionOutcome::Miss));
    }

    #[test]
    fn test_all_in_top_six_wrong_order_gets_bonus() {
        let predicted = top(["ham", "sai", "pia", "lec", "nor", "ver"]);
        let breakdown = calculate_score(&predicted, &actual());
        assert_eq!(breakdown.exact_matches, 0);
        assert_eq!(breakdown.top_six_matches, 6);
        assert_eq!(breakdown.total_points, 6 * 3 + 10);
    }

    #[test]
    fn test_mixed_prediction() {
        // ver exact, lec exact, nor in top six, three misses
        let predicted = top(["ver", "alo", "lec", "nor", "gas", "str"]);
        let breakdown = calculate_score(&predicted, &actual());
        assert_eq!(breakdown.exact_matches, 2);
        assert_eq!(breakdown.top_six_matches, 1);
        assert!(!breakdown.bonus_awarded);
        assert_eq!(breakdown.total_points, 5 * 2 + 3);
        assert_eq!(
            breakdown.positions[3].outcome,
            PositionOutcome::InTopSix { finished: 2 }
        );
    }

    #[test]
    fn test_total_matches_formula() {
        let predictions = [
            top(["ver", "nor", "lec", "pia", "sai", "ham"]),
            top(["nor", "ver", "lec", "alo", "sai", "gas"]),
            top(["alo", "ver", "str", "pia", "oco", "tsu"]),
            top(["pia", "nor", "ham", "ver", "alb", "sai"]),
        ];
        for predicted in &predictions {
            let b = calculate_score(predicted, &actual());
            let bonus = if b.exact_matches + b.top_six_matches == 6 { 10 } else { 0 };
            assert_eq!(b.total_points, 5 * b.exact_matches + 3 * b.top_six_matches + bonus);
        }
    }

    #[test]
    fn test_order_of_misses_does_not_matter() {
        let a = top(["ver", "alo", "lec", "str", "gas", "oco"]);
        let b = top(["ver", "oco", "lec", "gas", "alo", "str"]);
        assert_eq!(
            calculate_score(&a, &actual()).total_points,
            calculate_score(&b, &actual()).total_points
        );
    }

    #[test]
    fn test_parse_position_map() {
        let input: TopSixInput = serde_json::from_value(serde_json::json!({
            "P3": "LEC", "P1": " Ver ", "P2": "nor", "P4": "pia", "P5": "sai", "p6": "ham"
        }))
        .unwrap();
        assert_eq!(TopSix::parse(input).unwrap(), actual());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            TopSix::from_drivers(vec!["ver", "nor"]).unwrap_err(),
            ScoringError::WrongLength(2)
        );
        assert_eq!(
            TopSix::from_drivers(vec!["ver", "nor", "VER", "pia", "sai", "ham"]).unwrap_err(),
            ScoringError::DuplicateDriver("ver".to_string())
        );
        assert_eq!(
            TopSix::from_drivers(vec!["ver", " ", "lec", "pia", "sai", "ham"]).unwrap_err(),
            ScoringError::EmptyDriver(2)
        );

        let missing: TopSixInput = serde_json::from_value(serde_json::json!({
            "P1": "ver", "P2": "nor", "P3": "lec", "P4": "pia", "P5": "sai", "P7": "ham"
        }))
        .unwrap();
        assert_eq!(
            TopSix::parse(missing).unwrap_err(),
            ScoringError::UnknownPosition("P7".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_case_variant_positions() {
        let input: TopSixInput = serde_json::from_value(serde_json::json!({
            "P1": "ver", "p1": "ham", "P2": "nor", "P3": "lec", "P4": "pia", "P5": "sai", "P6": "rus"
        }))
        .unwrap();
        assert_eq!(TopSix::parse(input).unwrap_err(), ScoringError::DuplicatePosition(1));
    }

    #[test]
    fn test_parse_reports_missing_position() {
        let input: TopSixInput = serde_json::from_value(serde_json::json!({
            "P1": "ver", "P2": "nor", "P3": "lec", "P5": "sai", "P6": "ham"
        }))
        .unwrap();
        assert_eq!(TopSix::parse(input).unwrap_err(), ScoringError::MissingPosition(4));
    }

    #[test]
    fn test_serde_round_trip_as_list() {
        let json = serde_json::to_value(actual()).unwrap();
        assert_eq!(json, serde_json::json!(["ver", "nor", "lec", "pia", "sai", "ham"]));
        let back: TopSix = serde_json::from_value(json).unwrap();
        assert_eq!(back, actual());
    }

    #[test]
    fn test_summary_mentions_bonus() {
        let summary = calculate_score(&actual(), &actual()).summary();
        assert!(summary.starts_with("P1 ver exact +5"));
        assert!(summary.ends_with("bonus +10"));
    }
}
