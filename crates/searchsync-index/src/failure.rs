//! Scripted failures for the recording test doubles.

use std::fmt;
use std::sync::Mutex;

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

struct Rule<T> {
    remaining: usize,
    predicate: Predicate<T>,
}

/// A list of "fail the next N operations matching P" rules.
///
/// Rules are checked in insertion order; the first matching rule with
/// budget left consumes one failure.
pub struct FailurePlan<T> {
    rules: Mutex<Vec<Rule<T>>>,
}

impl<T> FailurePlan<T> {
    /// Creates a plan that never fails.
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
        }
    }

    /// Fails the next `times` operations matching `predicate`.
    pub fn fail_when<F>(&self, times: usize, predicate: F)
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        rules.push(Rule {
            remaining: times,
            predicate: Box::new(predicate),
        });
    }

    /// Fails the next `times` operations, whatever they are.
    pub fn fail_next(&self, times: usize) {
        self.fail_when(times, |_| true);
    }

    /// Decides whether `op` fails, consuming one failure if so.
    pub fn should_fail(&self, op: &T) -> bool {
        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        for rule in rules.iter_mut() {
            if rule.remaining > 0 && (rule.predicate)(op) {
                rule.remaining -= 1;
                return true;
            }
        }
        false
    }

    /// Failures still scheduled.
    pub fn pending(&self) -> usize {
        self.rules
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|r| r.remaining)
            .sum()
    }

    /// Drops every rule.
    pub fn clear(&self) {
        self.rules.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl<T> Default for FailurePlan<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FailurePlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailurePlan")
            .field("pending", &self.pending())
            .finish()
    }
}
