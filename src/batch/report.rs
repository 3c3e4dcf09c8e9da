use std::fmt;
use crate::extract::SessionOutcome;

/// Outcomes of one batch, in the order the archives were processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<SessionOutcome>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<SessionOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn outcome(&self, index: usize) -> Option<&SessionOutcome> {
        self.outcomes.iter().find(|o| o.index == index)
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} archives: {} succeeded, {} failed",
            self.total(),
            self.succeeded(),
            self.failed()
        )
    }
}
