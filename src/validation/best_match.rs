//! Choosing which branch of an `anyOf`/`oneOf` to report.

use super::SchemaProblem;

/// Problems one composition branch produced for a node.
#[derive(Debug, Clone)]
pub(crate) struct BranchOutcome {
    /// Declaration index of the branch within its composition list.
    pub index: usize,
    pub problems: Vec<SchemaProblem>,
}

impl BranchOutcome {
    pub fn is_match(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Whether `candidate` beats `incumbent`: fewer problems win and equal
/// counts go to the branch declared first.
pub(crate) fn is_better_match(candidate: &BranchOutcome, incumbent: &BranchOutcome) -> bool {
    let (ours, theirs) = (candidate.problems.len(), incumbent.problems.len());
    ours < theirs || (ours == theirs && candidate.index < incumbent.index)
}

pub(crate) fn best_branch(outcomes: impl IntoIterator<Item = BranchOutcome>) -> Option<BranchOutcome> {
    outcomes.into_iter().fold(None, |best, outcome| match best {
        Some(incumbent) if !is_better_match(&outcome, &incumbent) => Some(incumbent),
        _ => Some(outcome),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextRange;
    use crate::validation::ProblemKind;

    fn outcome(index: usize, problems: usize) -> BranchOutcome {
        BranchOutcome {
            index,
            problems: (0..problems)
                .map(|i| SchemaProblem {
                    kind: ProblemKind::TypeMismatch,
                    range: TextRange::new(i, i + 1),
                    message: format!("branch {} problem {}", index, i),
                })
                .collect(),
        }
    }

    #[test]
    fn test_fewest_problems_win() {
        let best = best_branch([outcome(0, 3), outcome(1, 1), outcome(2, 2)]).unwrap();
        assert_eq!(best.index, 1);
    }

    #[test]
    fn test_ties_keep_first_declared() {
        let best = best_branch([outcome(0, 2), outcome(1, 2)]).unwrap();
        assert_eq!(best.index, 0);
        assert!(!is_better_match(&outcome(1, 2), &outcome(0, 2)));
        assert!(is_better_match(&outcome(0, 2), &outcome(1, 2)));
    }

    #[test]
    fn test_match_and_empty() {
        assert!(outcome(0, 0).is_match());
        assert!(best_branch(Vec::new()).is_none());
    }
}
