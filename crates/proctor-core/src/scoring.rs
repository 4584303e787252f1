//! Scoring of a submitted answer ledger.

use crate::ledger::AnswerLedger;
use crate::model::{Question, ScoreResult, Verdict};

/// Partition `questions` into correct and wrong answers and decide the verdict.
///
/// A question with no ledger entry counts as wrong. The verdict is
/// [`Verdict::Pass`] iff the number of correct answers is at least
/// `passing_marks`.
pub fn score(questions: &[Question], ledger: &AnswerLedger, passing_marks: u32) -> ScoreResult {
    let (correct_answers, wrong_answers): (Vec<_>, Vec<_>) = questions
        .iter()
        .enumerate()
        .partition(|(index, question)| {
            ledger.get(*index) == Some(question.correct_option.as_str())
        });

    let correct_answers: Vec<Question> =
        correct_answers.into_iter().map(|(_, q)| q.clone()).collect();
    let wrong_answers: Vec<Question> = wrong_answers.into_iter().map(|(_, q)| q.clone()).collect();

    let verdict = if correct_answers.len() >= passing_marks as usize {
        Verdict::Pass
    } else {
        Verdict::Fail
    };

    ScoreResult {
        correct_answers,
        wrong_answers,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{question, two_question_exam};

    #[test]
    fn partitions_in_order() {
        let exam = two_question_exam();
        let mut ledger = AnswerLedger::new(2);
        ledger.select(0, "A").unwrap();
        ledger.select(1, "C").unwrap();

        let result = score(&exam.questions, &ledger, exam.passing_marks);
        assert_eq!(result.correct_answers, vec![exam.questions[0].clone()]);
        assert_eq!(result.wrong_answers, vec![exam.questions[1].clone()]);
        assert_eq!(result.verdict, Verdict::Pass);
    }

    #[test]
    fn unanswered_counts_as_wrong() {
        let exam = two_question_exam();
        let ledger = AnswerLedger::new(2);
        let result = score(&exam.questions, &ledger, 0);
        assert!(result.correct_answers.is_empty());
        assert_eq!(result.wrong_answers.len(), 2);
        // zero passing marks passes even with nothing answered
        assert_eq!(result.verdict, Verdict::Pass);
    }

    #[test]
    fn verdict_threshold_is_inclusive() {
        let questions: Vec<_> = (0..5)
            .map(|i| question(&format!("Q{i}"), &["A", "B"], "A"))
            .collect();
        let mut ledger = AnswerLedger::new(5);
        for i in 0..3 {
            ledger.select(i, "A").unwrap();
        }
        ledger.select(3, "B").unwrap();

        for passing in 0..=5u32 {
            let result = score(&questions, &ledger, passing);
            assert_eq!(
                result.correct_answers.len() + result.wrong_answers.len(),
                questions.len()
            );
            let expected = if 3 >= passing { Verdict::Pass } else { Verdict::Fail };
            assert_eq!(result.verdict, expected, "passing_marks = {passing}");
        }
    }

    #[test]
    fn does_not_mutate_inputs() {
        let exam = two_question_exam();
        let mut ledger = AnswerLedger::new(2);
        ledger.select(1, "B").unwrap();
        let before = ledger.clone();
        let _ = score(&exam.questions, &ledger, 1);
        assert_eq!(ledger, before);
    }
}
