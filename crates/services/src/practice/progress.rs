/// Running totals for one practice session, useful for UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTally {
    pub answered: u32,
    pub correct: u32,
    pub points: u32,
}

impl SessionTally {
    pub(crate) fn record(&mut self, is_correct: bool, points_awarded: u32) {
        self.answered = self.answered.saturating_add(1);
        if is_correct {
            self.correct = self.correct.saturating_add(1);
        }
        self.points = self.points.saturating_add(points_awarded);
    }

    /// Rounded accuracy for this session; `None` before the first answer.
    #[must_use]
    pub fn accuracy_percent(&self) -> Option<u8> {
        if self.answered == 0 {
            return None;
        }
        let percent = (u64::from(self.correct) * 100 + u64::from(self.answered) / 2)
            / u64::from(self.answered);
        u8::try_from(percent).ok()
    }
}
