//! The candidate's option selections, keyed by question index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Selected option keys for an exam with a fixed number of questions.
///
/// Unanswered questions have no entry. Keys are always `< question_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerLedger {
    question_count: usize,
    selections: BTreeMap<usize, String>,
}

impl AnswerLedger {
    pub fn new(question_count: usize) -> Self {
        Self {
            question_count,
            selections: BTreeMap::new(),
        }
    }

    /// Record `key` for `index`, replacing any earlier choice.
    ///
    /// Returns the previous selection, if any.
    pub fn select(&mut self, index: usize, key: &str) -> Result<Option<String>, SessionError> {
        if index >= self.question_count {
            return Err(SessionError::invalid(
                "select",
                format!(
                    "question {index} out of range (exam has {})",
                    self.question_count
                ),
            ));
        }
        Ok(self.selections.insert(index, key.to_string()))
    }

    /// The selected key for `index`, or `None` when unanswered.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.selections.get(&index).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.selections.clear();
    }

    pub fn answered(&self) -> usize {
        self.selections.len()
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    /// All selections in question order.
    pub fn entries(&self) -> &BTreeMap<usize, String> {
        &self.selections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let mut ledger = AnswerLedger::new(2);
        assert_eq!(ledger.select(0, "A").unwrap(), None);
        assert_eq!(ledger.select(0, "C").unwrap(), Some("A".to_string()));
        assert_eq!(ledger.get(0), Some("C"));
        assert_eq!(ledger.answered(), 1);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let mut ledger = AnswerLedger::new(2);
        let err = ledger.select(2, "A").unwrap_err();
        assert!(err.is_invalid_action());
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn unanswered_and_clear() {
        let mut ledger = AnswerLedger::new(3);
        ledger.select(1, "B").unwrap();
        assert_eq!(ledger.get(0), None);
        ledger.clear();
        assert_eq!(ledger.get(1), None);
        assert_eq!(ledger.answered(), 0);
        assert_eq!(ledger.question_count(), 3);
    }
}
