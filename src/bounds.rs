use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundsState {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub gap: f64,
}

/// Bound movements that are not expected from the accumulated cuts.
/// They are reported, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BoundAnomaly {
    LowerBoundDecreased {
        iteration: usize,
        previous: f64,
        current: f64,
    },
    BoundsCrossed {
        iteration: usize,
        lower_bound: f64,
        upper_bound: f64,
    },
}

impl std::fmt::Display for BoundAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowerBoundDecreased {
                iteration,
                previous,
                current,
            } => write!(
                f,
                "iteration {iteration}: lower bound decreased from \
                 {previous:.4} to {current:.4}"
            ),
            Self::BoundsCrossed {
                iteration,
                lower_bound,
                upper_bound,
            } => write!(
                f,
                "iteration {iteration}: lower bound {lower_bound:.4} above \
                 upper bound {upper_bound:.4}"
            ),
        }
    }
}

/// Keeps the latest lower bound, the best upper bound seen so far and
/// the gap between them.
#[derive(Debug)]
pub struct BoundsTracker {
    state: BoundsState,
    relative_slack: f64,
    anomalies: Vec<BoundAnomaly>,
}

impl BoundsTracker {
    /// Bound movements smaller than `relative_slack` times the bound
    /// magnitude (at least 1.0) are not reported as anomalies, since the
    /// backend only solves the master up to its own relative gap.
    pub fn new(relative_slack: f64) -> Self {
        Self {
            state: BoundsState {
                lower_bound: f64::NEG_INFINITY,
                upper_bound: f64::INFINITY,
                gap: f64::INFINITY,
            },
            relative_slack,
            anomalies: vec![],
        }
    }

    fn slack(&self, value: f64) -> f64 {
        self.relative_slack * value.abs().max(1.0)
    }

    /// Registers the bounds found in an iteration and returns the
    /// updated state. The upper bound never increases.
    pub fn update(
        &mut self,
        iteration: usize,
        master_objective: f64,
        candidate_upper_bound: f64,
    ) -> BoundsState {
        let previous = self.state.lower_bound;
        if previous.is_finite()
            && master_objective < previous - self.slack(previous)
        {
            self.report(BoundAnomaly::LowerBoundDecreased {
                iteration,
                previous,
                current: master_objective,
            });
        }

        self.state.lower_bound = master_objective;
        self.state.upper_bound =
            self.state.upper_bound.min(candidate_upper_bound);
        self.state.gap =
            (self.state.upper_bound - self.state.lower_bound).abs();

        let upper = self.state.upper_bound;
        if master_objective > upper + self.slack(upper) {
            self.report(BoundAnomaly::BoundsCrossed {
                iteration,
                lower_bound: master_objective,
                upper_bound: upper,
            });
        }

        self.state
    }

    fn report(&mut self, anomaly: BoundAnomaly) {
        tracing::warn!("bound anomaly at {}", anomaly);
        self.anomalies.push(anomaly);
    }

    pub fn state(&self) -> BoundsState {
        self.state
    }

    pub fn upper_bound(&self) -> f64 {
        self.state.upper_bound
    }

    pub fn anomalies(&self) -> &[BoundAnomaly] {
        &self.anomalies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bounds_tracker() {
        let tracker = BoundsTracker::new(0.0);
        let state = tracker.state();
        assert_eq!(state.lower_bound, f64::NEG_INFINITY);
        assert_eq!(state.upper_bound, f64::INFINITY);
        assert_eq!(state.gap, f64::INFINITY);
        assert!(tracker.anomalies().is_empty());
    }

    #[test]
    fn test_upper_bound_is_running_minimum() {
        let mut tracker = BoundsTracker::new(0.0);
        tracker.update(1, 10.0, 100.0);
        assert_eq!(tracker.upper_bound(), 100.0);
        let state = tracker.update(2, 20.0, 150.0);
        assert_eq!(state.upper_bound, 100.0);
        assert_eq!(state.lower_bound, 20.0);
        assert_eq!(state.gap, 80.0);
        let state = tracker.update(3, 30.0, 40.0);
        assert_eq!(state.upper_bound, 40.0);
        assert_eq!(state.gap, 10.0);
        assert!(tracker.anomalies().is_empty());
    }

    #[test]
    fn test_lower_bound_decrease_is_reported() {
        let mut tracker = BoundsTracker::new(1e-6);
        tracker.update(1, 50.0, 100.0);
        let state = tracker.update(2, 45.0, 100.0);
        // the latest master objective is still kept as the lower bound
        assert_eq!(state.lower_bound, 45.0);
        assert_eq!(
            tracker.anomalies(),
            &[BoundAnomaly::LowerBoundDecreased {
                iteration: 2,
                previous: 50.0,
                current: 45.0
            }]
        );
    }

    #[test]
    fn test_small_decrease_within_slack_is_ignored() {
        let mut tracker = BoundsTracker::new(1e-4);
        tracker.update(1, 1e6, 2e6);
        tracker.update(2, 1e6 - 10.0, 2e6);
        assert!(tracker.anomalies().is_empty());
    }

    #[test]
    fn test_crossed_bounds_are_reported() {
        let mut tracker = BoundsTracker::new(0.0);
        tracker.update(1, 10.0, 20.0);
        let state = tracker.update(2, 30.0, 25.0);
        assert_eq!(state.gap, 10.0);
        assert!(matches!(
            tracker.anomalies(),
            [BoundAnomaly::BoundsCrossed { iteration: 2, .. }]
        ));
    }
}
