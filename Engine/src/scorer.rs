//! `InterestingnessScorer`: a pure function mapping a run's `Signals`
//! to a scalar in `[0.0, 1.0]`.

use crate::signals::{Signals, Status};

/// Additive scoring with saturating clamp at `1.0`. Stateless by
/// design — backends are free to combine this with their own reward
/// model (see the UCB tree's separate reward formula in `scheduler::ucb`).
pub fn score(signals: &Signals) -> f64 {
    let mut total = 0.0f64;

    if signals.new_coverage {
        total += 0.4;
    }
    if signals.new_bug {
        total += 0.4;
    }
    if signals.crash || signals.timeout {
        total += 0.2;
    }
    if signals.status == Status::Bug && !signals.new_bug {
        total += 0.1;
    }

    total.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(f: impl FnOnce(&mut Signals)) -> Signals {
        let mut s = Signals::default();
        f(&mut s);
        s
    }

    #[test]
    fn no_signal_scores_zero() {
        assert_eq!(score(&Signals::default()), 0.0);
    }

    #[test]
    fn new_coverage_contributes_0_4() {
        let s = signals(|s| s.new_coverage = true);
        assert!((score(&s) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn new_bug_contributes_0_4() {
        let s = signals(|s| s.new_bug = true);
        assert!((score(&s) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn crash_or_timeout_contributes_0_2() {
        let crash = signals(|s| s.crash = true);
        let timeout = signals(|s| s.timeout = true);
        assert!((score(&crash) - 0.2).abs() < 1e-9);
        assert!((score(&timeout) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn seen_before_bug_contributes_0_1() {
        let s = signals(|s| {
            s.status = Status::Bug;
            s.new_bug = false;
        });
        assert!((score(&s) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn seen_before_bug_does_not_double_count_when_new() {
        let s = signals(|s| {
            s.status = Status::Bug;
            s.new_bug = true;
        });
        assert!((score(&s) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn saturates_at_one() {
        let s = signals(|s| {
            s.new_coverage = true;
            s.new_bug = true;
            s.crash = true;
            s.status = Status::Bug;
        });
        assert_eq!(score(&s), 1.0);
    }

    #[test]
    fn always_in_unit_range() {
        for nc in [false, true] {
            for nb in [false, true] {
                for crash in [false, true] {
                    for timeout in [false, true] {
                        for status in [Status::Ok, Status::Bug, Status::Crash, Status::Timeout] {
                            let s = signals(|s| {
                                s.new_coverage = nc;
                                s.new_bug = nb;
                                s.crash = crash;
                                s.timeout = timeout;
                                s.status = status;
                            });
                            let value = score(&s);
                            assert!((0.0..=1.0).contains(&value));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn pure_function_same_input_same_output() {
        let s = signals(|s| s.new_coverage = true);
        assert_eq!(score(&s), score(&s));
    }
}
