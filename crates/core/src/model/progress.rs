use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::Skill;
use crate::model::question::Question;

/// Consecutive correct answers needed for [`Badge::FiveStreak`].
pub const STREAK_BADGE_THRESHOLD: u32 = 5;

/// Cumulative points needed for [`Badge::FiveHundredPoints`].
pub const POINTS_BADGE_THRESHOLD: u32 = 500;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("correct count ({correct}) exceeds attempts ({attempts})")]
    CorrectExceedsAttempts { attempts: u32, correct: u32 },

    #[error("unknown badge: {0:?}")]
    UnknownBadge(String),
}

//
// ─── BADGES ────────────────────────────────────────────────────────────────────
//

/// One-way achievement flag. Once earned it stays on the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "5-streak")]
    FiveStreak,
    #[serde(rename = "500-points")]
    FiveHundredPoints,
}

impl Badge {
    pub const ALL: [Badge; 2] = [Badge::FiveStreak, Badge::FiveHundredPoints];

    /// Stable identifier used in storage and on screen.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Badge::FiveStreak => "5-streak",
            Badge::FiveHundredPoints => "500-points",
        }
    }

    /// Whether the record currently satisfies this badge's threshold.
    #[must_use]
    pub fn threshold_met(self, points: u32, streak: u32) -> bool {
        match self {
            Badge::FiveStreak => streak >= STREAK_BADGE_THRESHOLD,
            Badge::FiveHundredPoints => points >= POINTS_BADGE_THRESHOLD,
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Badge {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Badge::ALL
            .into_iter()
            .find(|badge| badge.id() == s)
            .ok_or_else(|| ProgressError::UnknownBadge(s.to_owned()))
    }
}

//
// ─── SKILL STAT ────────────────────────────────────────────────────────────────
//

/// Per-skill rollup of recorded answers.
///
/// Invariant: `correct <= attempts`, enforced on construction and deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SkillStatFields")]
pub struct SkillStat {
    attempts: u32,
    correct: u32,
}

#[derive(Deserialize)]
struct SkillStatFields {
    #[serde(default)]
    attempts: u32,
    #[serde(default)]
    correct: u32,
}

impl TryFrom<SkillStatFields> for SkillStat {
    type Error = ProgressError;

    fn try_from(fields: SkillStatFields) -> Result<Self, Self::Error> {
        SkillStat::new(fields.attempts, fields.correct)
    }
}

impl SkillStat {
    /// # Errors
    ///
    /// Returns `ProgressError::CorrectExceedsAttempts` if `correct > attempts`.
    pub fn new(attempts: u32, correct: u32) -> Result<Self, ProgressError> {
        if correct > attempts {
            return Err(ProgressError::CorrectExceedsAttempts { attempts, correct });
        }
        Ok(Self { attempts, correct })
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    /// `correct / attempts`, or `None` before the first attempt.
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        if self.attempts == 0 {
            None
        } else {
            Some(f64::from(self.correct) / f64::from(self.attempts))
        }
    }

    fn record(&mut self, is_correct: bool) {
        // Both counters saturate together so the invariant survives overflow.
        if self.attempts == u32::MAX {
            return;
        }
        self.attempts += 1;
        if is_correct {
            self.correct += 1;
        }
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// What a single answer changed on the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEffect {
    pub points_awarded: u32,
    pub new_badges: Vec<Badge>,
}

/// A learner's cumulative statistics.
///
/// Mutated only through [`ProgressRecord::apply_answer`]; every field changes
/// together in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    points: u32,
    #[serde(default)]
    streak: u32,
    #[serde(default)]
    skill_stats: BTreeMap<Skill, SkillStat>,
    #[serde(default)]
    badges: BTreeSet<Badge>,
}

impl ProgressRecord {
    /// Fresh zero record for a learner seen for the first time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a record from persisted storage.
    #[must_use]
    pub fn from_persisted(
        points: u32,
        streak: u32,
        skill_stats: BTreeMap<Skill, SkillStat>,
        badges: BTreeSet<Badge>,
    ) -> Self {
        Self {
            points,
            streak,
            skill_stats,
            badges,
        }
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[must_use]
    pub fn skill_stats(&self) -> &BTreeMap<Skill, SkillStat> {
        &self.skill_stats
    }

    #[must_use]
    pub fn stat(&self, skill: &Skill) -> Option<&SkillStat> {
        self.skill_stats.get(skill)
    }

    #[must_use]
    pub fn badges(&self) -> &BTreeSet<Badge> {
        &self.badges
    }

    #[must_use]
    pub fn has_badge(&self, badge: Badge) -> bool {
        self.badges.contains(&badge)
    }

    /// True until the first answer is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points == 0 && self.streak == 0 && self.skill_stats.is_empty() && self.badges.is_empty()
    }

    /// Apply one answer event: points, streak, skill stats, then badges.
    ///
    /// Skills not seen before get a new entry.
    pub fn apply_answer(&mut self, question: &Question, is_correct: bool) -> AnswerEffect {
        let points_awarded = if is_correct {
            question.point_value()
        } else {
            0
        };

        self.points = self.points.saturating_add(points_awarded);
        self.streak = if is_correct {
            self.streak.saturating_add(1)
        } else {
            0
        };
        self.skill_stats
            .entry(question.skill().clone())
            .or_default()
            .record(is_correct);

        let mut new_badges = Vec::new();
        for badge in Badge::ALL {
            if badge.threshold_met(self.points, self.streak) && self.badges.insert(badge) {
                new_badges.push(badge);
            }
        }

        AnswerEffect {
            points_awarded,
            new_badges,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, QuestionId};

    fn question(skill: &str, difficulty: Difficulty) -> Question {
        Question::new(
            QuestionId::from(1),
            Skill::new(skill),
            difficulty,
            vec!["a".into(), "b".into()],
            0,
        )
        .unwrap()
    }

    #[test]
    fn correct_hard_answer_on_empty_record() {
        let mut record = ProgressRecord::new();
        let effect = record.apply_answer(&question("Algebra", Difficulty::Hard), true);

        assert_eq!(effect.points_awarded, 30);
        assert_eq!(record.points(), 30);
        assert_eq!(record.streak(), 1);
        let stat = record.stat(&Skill::new("Algebra")).unwrap();
        assert_eq!((stat.attempts(), stat.correct()), (1, 1));
        assert_eq!(record.skill_stats().len(), 1);
        assert!(record.badges().is_empty());
    }

    #[test]
    fn incorrect_answer_resets_streak_and_awards_nothing() {
        let mut record = ProgressRecord::new();
        let q = question("Geometry", Difficulty::Easy);
        record.apply_answer(&q, true);
        record.apply_answer(&q, true);

        let effect = record.apply_answer(&q, false);

        assert_eq!(effect.points_awarded, 0);
        assert_eq!(record.streak(), 0);
        assert_eq!(record.points(), 20);
        let stat = record.stat(&Skill::new("Geometry")).unwrap();
        assert_eq!((stat.attempts(), stat.correct()), (3, 2));
    }

    #[test]
    fn four_correct_then_wrong_never_earns_streak_badge() {
        let mut record = ProgressRecord::new();
        let q = question("Algebra", Difficulty::Easy);
        for _ in 0..4 {
            record.apply_answer(&q, true);
        }
        record.apply_answer(&q, false);

        assert_eq!(record.streak(), 0);
        assert!(!record.has_badge(Badge::FiveStreak));
    }

    #[test]
    fn streak_badge_fires_exactly_at_fifth_correct_answer() {
        let mut record = ProgressRecord::new();
        let q = question("Algebra", Difficulty::Easy);
        for _ in 0..4 {
            let effect = record.apply_answer(&q, true);
            assert!(effect.new_badges.is_empty());
        }

        let effect = record.apply_answer(&q, true);
        assert_eq!(effect.new_badges, vec![Badge::FiveStreak]);

        let effect = record.apply_answer(&q, true);
        assert!(effect.new_badges.is_empty());
        assert_eq!(
            record.badges().iter().filter(|b| **b == Badge::FiveStreak).count(),
            1
        );
    }

    #[test]
    fn points_badge_fires_when_500_first_reached() {
        let mut record = ProgressRecord::new();
        let hard = question("Algebra", Difficulty::Hard);
        // Alternate wrong answers so the streak badge does not interfere.
        let mut earned_at = None;
        for i in 1..=40 {
            let effect = record.apply_answer(&hard, true);
            if effect.new_badges.contains(&Badge::FiveHundredPoints) {
                earned_at = Some(i);
            }
            record.apply_answer(&hard, false);
        }

        // 17 * 30 = 510 is the first total at or above 500.
        assert_eq!(earned_at, Some(17));
        assert!(record.has_badge(Badge::FiveHundredPoints));
        assert!(!record.has_badge(Badge::FiveStreak));
    }

    #[test]
    fn badges_survive_streak_reset() {
        let mut record = ProgressRecord::new();
        let q = question("Algebra", Difficulty::Medium);
        for _ in 0..5 {
            record.apply_answer(&q, true);
        }
        assert!(record.has_badge(Badge::FiveStreak));

        for _ in 0..10 {
            record.apply_answer(&q, false);
            assert!(record.has_badge(Badge::FiveStreak));
        }
    }

    #[test]
    fn skill_stat_rejects_correct_above_attempts() {
        assert_eq!(
            SkillStat::new(1, 2),
            Err(ProgressError::CorrectExceedsAttempts {
                attempts: 1,
                correct: 2
            })
        );
        assert_eq!(SkillStat::new(0, 0).unwrap().accuracy(), None);
        assert_eq!(SkillStat::new(4, 3).unwrap().accuracy(), Some(0.75));
    }

    #[test]
    fn deserializing_inconsistent_stat_fails() {
        let err = serde_json::from_str::<SkillStat>(r#"{"attempts":1,"correct":3}"#);
        assert!(err.is_err());
    }

    #[test]
    fn record_json_uses_badge_identifiers() {
        let mut record = ProgressRecord::new();
        let q = question("Algebra", Difficulty::Hard);
        for _ in 0..5 {
            record.apply_answer(&q, true);
        }

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["points"], 150);
        assert_eq!(json["badges"][0], "5-streak");
        assert_eq!(json["skillStats"]["Algebra"]["attempts"], 5);

        let back: ProgressRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn badge_ids_parse_back() {
        for badge in Badge::ALL {
            assert_eq!(badge.id().parse::<Badge>().unwrap(), badge);
        }
        assert!("gold".parse::<Badge>().is_err());
    }
}
