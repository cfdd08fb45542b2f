use crate::model::ids::Skill;
use crate::model::progress::{Badge, ProgressRecord};

/// Coarse accuracy rating used when reporting per-skill performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccuracyBand {
    NeedsWork,
    Fair,
    Strong,
}

impl AccuracyBand {
    /// Strong at 80% and above, fair from 60%.
    #[must_use]
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            80.. => AccuracyBand::Strong,
            60..=79 => AccuracyBand::Fair,
            _ => AccuracyBand::NeedsWork,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            AccuracyBand::NeedsWork => "needs work",
            AccuracyBand::Fair => "fair",
            AccuracyBand::Strong => "strong",
        }
    }
}

/// One row of the per-skill breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillSummary {
    pub skill: Skill,
    pub attempts: u32,
    pub correct: u32,
    pub accuracy_percent: u8,
}

impl SkillSummary {
    #[must_use]
    pub fn band(&self) -> AccuracyBand {
        AccuracyBand::from_percent(self.accuracy_percent)
    }
}

/// Read-only report over a `ProgressRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub points: u32,
    pub streak: u32,
    pub total_attempts: u64,
    pub total_correct: u64,
    pub overall_accuracy_percent: u8,
    pub badges: Vec<Badge>,
    /// Weakest skill first; ties broken by label.
    pub skills: Vec<SkillSummary>,
}

impl ProgressSummary {
    #[must_use]
    pub fn from_record(record: &ProgressRecord) -> Self {
        let mut total_attempts = 0_u64;
        let mut total_correct = 0_u64;
        let mut skills = Vec::with_capacity(record.skill_stats().len());

        for (skill, stat) in record.skill_stats() {
            total_attempts += u64::from(stat.attempts());
            total_correct += u64::from(stat.correct());
            skills.push(SkillSummary {
                skill: skill.clone(),
                attempts: stat.attempts(),
                correct: stat.correct(),
                accuracy_percent: percent(u64::from(stat.correct()), u64::from(stat.attempts())),
            });
        }

        skills.sort_by(|a, b| {
            a.accuracy_percent
                .cmp(&b.accuracy_percent)
                .then_with(|| a.skill.cmp(&b.skill))
        });

        Self {
            points: record.points(),
            streak: record.streak(),
            total_attempts,
            total_correct,
            overall_accuracy_percent: percent(total_correct, total_attempts),
            badges: record.badges().iter().copied().collect(),
            skills,
        }
    }

    /// Skill with the lowest accuracy, if any answers were recorded.
    #[must_use]
    pub fn weakest_skill(&self) -> Option<&SkillSummary> {
        self.skills.first()
    }
}

impl From<&ProgressRecord> for ProgressSummary {
    fn from(record: &ProgressRecord) -> Self {
        Self::from_record(record)
    }
}

/// Rounded percentage; 0 when there is nothing to divide.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let ratio = part as f64 / whole as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, Question, QuestionId};

    fn answer(record: &mut ProgressRecord, skill: &str, correct: bool) {
        let q = Question::new(
            QuestionId::from(1),
            Skill::new(skill),
            Difficulty::Easy,
            vec!["a".into(), "b".into()],
            0,
        )
        .unwrap();
        record.apply_answer(&q, correct);
    }

    #[test]
    fn empty_record_reports_zero_accuracy() {
        let summary = ProgressSummary::from_record(&ProgressRecord::new());
        assert_eq!(summary.total_attempts, 0);
        assert_eq!(summary.overall_accuracy_percent, 0);
        assert!(summary.weakest_skill().is_none());
    }

    #[test]
    fn totals_and_weakest_skill() {
        let mut record = ProgressRecord::new();
        answer(&mut record, "Algebra", true);
        answer(&mut record, "Algebra", true);
        answer(&mut record, "Algebra", false);
        answer(&mut record, "Geometry", false);
        answer(&mut record, "Geometry", true);
        answer(&mut record, "Geometry", false);

        let summary = ProgressSummary::from(&record);
        assert_eq!(summary.total_attempts, 6);
        assert_eq!(summary.total_correct, 3);
        assert_eq!(summary.overall_accuracy_percent, 50);

        let weakest = summary.weakest_skill().unwrap();
        assert_eq!(weakest.skill.as_str(), "Geometry");
        assert_eq!(weakest.accuracy_percent, 33);
        assert_eq!(weakest.band(), AccuracyBand::NeedsWork);
        assert_eq!(summary.skills[1].accuracy_percent, 67);
        assert_eq!(summary.skills[1].band(), AccuracyBand::Fair);
    }

    #[test]
    fn band_thresholds() {
        assert_eq!(AccuracyBand::from_percent(100), AccuracyBand::Strong);
        assert_eq!(AccuracyBand::from_percent(80), AccuracyBand::Strong);
        assert_eq!(AccuracyBand::from_percent(79), AccuracyBand::Fair);
        assert_eq!(AccuracyBand::from_percent(60), AccuracyBand::Fair);
        assert_eq!(AccuracyBand::from_percent(59), AccuracyBand::NeedsWork);
    }
}
