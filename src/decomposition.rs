use crate::bounds;
use crate::cut;
use crate::error::SolverFailure;
use crate::input::Config;
use crate::log;
use crate::master::{Commitment, MasterSolver};
use crate::recourse::RecourseEvaluator;
use crate::system;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationStatus {
    Running,
    Converged,
    MaxIterationsReached,
    Aborted,
}

/// The outcome of a completed iteration. Never changed once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub commitment: Commitment,
    pub master_objective: f64,
    pub theta: f64,
    pub dispatch_cost: f64,
    pub candidate_upper_bound: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub gap: f64,
    #[serde(skip)]
    pub time: Duration,
}

/// Final report of a decomposition run
#[derive(Debug, Clone, Serialize)]
pub struct DecompositionReport {
    pub status: TerminationStatus,
    pub iteration_count: usize,
    pub final_lower_bound: f64,
    pub final_upper_bound: f64,
    pub final_gap: f64,
    /// Commitment that realized the final upper bound
    pub final_commitment: Option<Commitment>,
    pub anomalies: Vec<bounds::BoundAnomaly>,
    pub failure: Option<SolverFailure>,
    #[serde(skip)]
    pub history: Vec<IterationRecord>,
}

impl DecompositionReport {
    /// The gap evaluated again from the iteration history: the latest
    /// master objective against the best realized cost.
    pub fn recomputed_gap(&self) -> Option<f64> {
        let last = self.history.last()?;
        let upper_bound = self
            .history
            .iter()
            .map(|r| r.candidate_upper_bound)
            .fold(f64::INFINITY, f64::min);
        Some((upper_bound - last.master_objective).abs())
    }
}

/// Coordinates the master solves, the recourse evaluations, the cuts and
/// the bounds of a single decomposition run. Iterations are strictly
/// sequential, since each master solve depends on every previous cut.
pub struct DecompositionLoop<'a, M: MasterSolver> {
    master: M,
    evaluator: RecourseEvaluator<'a>,
    system: &'a system::System,
    tolerance: f64,
    max_iterations: usize,
    cuts: cut::CutStore,
    bounds: bounds::BoundsTracker,
    history: Vec<IterationRecord>,
    incumbent: Option<Commitment>,
    status: TerminationStatus,
    failure: Option<SolverFailure>,
}

impl<'a, M: MasterSolver> DecompositionLoop<'a, M> {
    pub fn new(system: &'a system::System, config: &Config, master: M) -> Self {
        Self {
            master,
            evaluator: RecourseEvaluator::new(system, config.penalty_rate),
            system,
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
            cuts: cut::CutStore::new(),
            bounds: bounds::BoundsTracker::new(config.solver.mip_rel_gap),
            history: vec![],
            incumbent: None,
            status: TerminationStatus::Running,
            failure: None,
        }
    }

    pub fn status(&self) -> TerminationStatus {
        self.status
    }

    pub fn cuts(&self) -> &cut::CutStore {
        &self.cuts
    }

    pub fn bounds(&self) -> bounds::BoundsState {
        self.bounds.state()
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// Runs a single iteration, unless the loop already terminated.
    /// Returns the status after the iteration.
    pub fn step(&mut self) -> TerminationStatus {
        if self.status != TerminationStatus::Running {
            return self.status;
        }
        let iteration = self.history.len() + 1;
        let begin = Instant::now();

        let solution = match self.master.solve(iteration, &self.cuts) {
            Ok(solution) => solution,
            Err(failure) => {
                tracing::error!("{}", failure);
                self.failure = Some(failure);
                self.status = TerminationStatus::Aborted;
                return self.status;
            }
        };

        let dispatch_cost = self.evaluator.evaluate(&solution.commitment);
        // replaces the surrogate by the realized recourse cost
        let candidate_upper_bound =
            solution.objective - solution.theta + dispatch_cost;

        if candidate_upper_bound < self.bounds.upper_bound() {
            self.incumbent = Some(solution.commitment.clone());
        }
        let state = self.bounds.update(
            iteration,
            solution.objective,
            candidate_upper_bound,
        );
        self.cuts.add(iteration, dispatch_cost);

        self.history.push(IterationRecord {
            iteration,
            commitment: solution.commitment,
            master_objective: solution.objective,
            theta: solution.theta,
            dispatch_cost,
            candidate_upper_bound,
            lower_bound: state.lower_bound,
            upper_bound: state.upper_bound,
            gap: state.gap,
            time: begin.elapsed(),
        });

        if state.gap <= self.tolerance {
            self.status = TerminationStatus::Converged;
        } else if iteration >= self.max_iterations {
            self.status = TerminationStatus::MaxIterationsReached;
        }
        self.status
    }

    /// Iterates until convergence, the iteration budget or a master
    /// failure, displaying the iteration table.
    pub fn run(&mut self) -> DecompositionReport {
        let begin = Instant::now();
        log::decomposition_greeting(
            self.system.meta.states_count,
            self.system.meta.transitions_count,
            self.max_iterations,
            self.tolerance,
        );
        log::iteration_table_header();
        log::iteration_table_divider();

        while self.step() == TerminationStatus::Running {
            self.show_last_iteration();
        }
        if self.status != TerminationStatus::Aborted {
            self.show_last_iteration();
        }

        log::iteration_table_divider();
        log::termination_line(self.status, self.history.len());
        log::decomposition_duration(begin.elapsed());

        self.report()
    }

    fn show_last_iteration(&self) {
        if let Some(r) = self.history.last() {
            log::iteration_table_row(
                r.iteration,
                r.lower_bound,
                r.upper_bound,
                r.dispatch_cost,
                r.gap,
                r.time,
            );
        }
    }

    /// Snapshot of the run so far
    pub fn report(&self) -> DecompositionReport {
        let state = self.bounds.state();
        DecompositionReport {
            status: self.status,
            iteration_count: self.history.len(),
            final_lower_bound: state.lower_bound,
            final_upper_bound: state.upper_bound,
            final_gap: state.gap,
            final_commitment: self.incumbent.clone(),
            anomalies: self.bounds.anomalies().to_vec(),
            failure: self.failure.clone(),
            history: self.history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverFailureKind;
    use crate::input::SolverOptions;
    use crate::master::{HighsMaster, MasterSolution};
    use std::collections::VecDeque;

    /// Replays a fixed sequence of master results, recording how many
    /// cuts it was given at each call
    struct ScriptedMaster {
        results: VecDeque<Result<MasterSolution, SolverFailureKind>>,
        seen_cuts: Vec<usize>,
    }

    impl ScriptedMaster {
        fn new(
            results: Vec<Result<MasterSolution, SolverFailureKind>>,
        ) -> Self {
            Self {
                results: results.into(),
                seen_cuts: vec![],
            }
        }
    }

    impl MasterSolver for ScriptedMaster {
        fn solve(
            &mut self,
            iteration: usize,
            cuts: &cut::CutStore,
        ) -> Result<MasterSolution, SolverFailure> {
            self.seen_cuts.push(cuts.len());
            match self.results.pop_front() {
                Some(Ok(solution)) => Ok(solution),
                Some(Err(kind)) => Err(SolverFailure { iteration, kind }),
                None => Err(SolverFailure {
                    iteration,
                    kind: SolverFailureKind::Backend("exhausted".into()),
                }),
            }
        }
    }

    fn config(tolerance: f64, max_iterations: usize) -> Config {
        Config {
            tolerance,
            max_iterations,
            penalty_rate: 1000.0,
            solver: SolverOptions::default(),
        }
    }

    fn solution(
        values: Vec<bool>,
        objective: f64,
        theta: f64,
    ) -> MasterSolution {
        MasterSolution {
            commitment: Commitment::new(values),
            objective,
            theta,
        }
    }

    fn all_committed() -> Vec<bool> {
        vec![true; 6]
    }

    #[test]
    fn test_step_records_bounds_and_cut() {
        let system = system::System::default();
        let master = ScriptedMaster::new(vec![Ok(solution(
            all_committed(),
            4800.0,
            0.0,
        ))]);
        let mut decomposition =
            DecompositionLoop::new(&system, &config(1e-3, 5), master);
        let status = decomposition.step();
        assert_eq!(status, TerminationStatus::Running);

        let evaluator = RecourseEvaluator::new(&system, 1000.0);
        let dispatch =
            evaluator.evaluate(&Commitment::new(all_committed()));
        let record = &decomposition.history()[0];
        assert_eq!(record.iteration, 1);
        assert_eq!(record.dispatch_cost, dispatch);
        assert_eq!(record.candidate_upper_bound, 4800.0 + dispatch);
        assert_eq!(record.lower_bound, 4800.0);
        assert_eq!(record.gap, dispatch);
        assert_eq!(decomposition.cuts().all(), &[cut::Cut::new(1, dispatch)]);
    }

    #[test]
    fn test_converges_when_gap_closes() {
        let system = system::System::default();
        let evaluator = RecourseEvaluator::new(&system, 1000.0);
        let dispatch =
            evaluator.evaluate(&Commitment::new(all_committed()));
        let master = ScriptedMaster::new(vec![
            Ok(solution(all_committed(), 4800.0, 0.0)),
            Ok(solution(all_committed(), 4800.0 + dispatch, dispatch)),
        ]);
        let report =
            DecompositionLoop::new(&system, &config(1e-3, 10), master).run();
        assert_eq!(report.status, TerminationStatus::Converged);
        assert_eq!(report.iteration_count, 2);
        assert_eq!(report.final_gap, 0.0);
        assert_eq!(
            report.final_commitment,
            Some(Commitment::new(all_committed()))
        );
        assert!(report.anomalies.is_empty());
        assert!(report.failure.is_none());
    }

    #[test]
    fn test_stops_at_max_iterations() {
        let system = system::System::default();
        let results = (0..3)
            .map(|i| Ok(solution(all_committed(), 100.0 * i as f64, 0.0)))
            .collect();
        let mut decomposition = DecompositionLoop::new(
            &system,
            &config(1e-3, 3),
            ScriptedMaster::new(results),
        );
        assert_eq!(decomposition.step(), TerminationStatus::Running);
        assert_eq!(decomposition.step(), TerminationStatus::Running);
        assert_eq!(
            decomposition.step(),
            TerminationStatus::MaxIterationsReached
        );
        // no iteration runs after termination
        assert_eq!(
            decomposition.step(),
            TerminationStatus::MaxIterationsReached
        );
        assert_eq!(decomposition.history().len(), 3);
        assert_eq!(decomposition.cuts().len(), 3);
    }

    #[test]
    fn test_master_failure_aborts_without_cut() {
        let system = system::System::default();
        let master = ScriptedMaster::new(vec![
            Ok(solution(all_committed(), 4800.0, 0.0)),
            Err(SolverFailureKind::ModelStatus("infeasible".into())),
        ]);
        let mut decomposition =
            DecompositionLoop::new(&system, &config(1e-3, 10), master);
        decomposition.step();
        let bounds_before = decomposition.bounds();
        assert_eq!(decomposition.step(), TerminationStatus::Aborted);
        assert_eq!(decomposition.cuts().len(), 1);
        assert_eq!(decomposition.bounds(), bounds_before);

        let report = decomposition.report();
        assert_eq!(report.status, TerminationStatus::Aborted);
        assert_eq!(report.iteration_count, 1);
        assert_eq!(report.final_lower_bound, 4800.0);
        let failure = report.failure.unwrap();
        assert_eq!(failure.iteration, 2);
    }

    #[test]
    fn test_master_receives_every_previous_cut() {
        let system = system::System::default();
        let results = (0..4)
            .map(|_| Ok(solution(all_committed(), 0.0, 0.0)))
            .collect();
        let mut decomposition = DecompositionLoop::new(
            &system,
            &config(0.0, 4),
            ScriptedMaster::new(results),
        );
        while decomposition.step() == TerminationStatus::Running {}
        assert_eq!(decomposition.master.seen_cuts, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_incumbent_follows_best_upper_bound() {
        let system = system::System::default();
        let mut partial = all_committed();
        partial[3] = false;
        let master = ScriptedMaster::new(vec![
            Ok(solution(all_committed(), 4800.0, 0.0)),
            Ok(solution(partial, 10.0, 0.0)),
        ]);
        let report =
            DecompositionLoop::new(&system, &config(0.0, 2), master).run();
        assert_eq!(report.status, TerminationStatus::MaxIterationsReached);
        // the second commitment leaves the peak unserved: it is worse
        assert_eq!(
            report.final_commitment,
            Some(Commitment::new(all_committed()))
        );
        assert_eq!(
            report.final_upper_bound,
            report.history[0].candidate_upper_bound
        );
        assert!(matches!(
            report.anomalies.as_slice(),
            [bounds::BoundAnomaly::LowerBoundDecreased { iteration: 2, .. }]
        ));
    }

    #[test]
    fn test_six_state_case_with_highs() {
        let system = system::System::default();
        let config = config(1e-3, 15);
        let master = HighsMaster::new(&system, &config.solver).unwrap();
        let report = DecompositionLoop::new(&system, &config, master).run();

        assert!(matches!(
            report.status,
            TerminationStatus::Converged
                | TerminationStatus::MaxIterationsReached
        ));
        assert!(report.iteration_count <= 15);
        assert_eq!(report.iteration_count, report.history.len());

        let recomputed = report.recomputed_gap().unwrap();
        assert!((report.final_gap - recomputed).abs() <= 1e-9);
        assert_eq!(
            report.final_gap,
            (report.final_upper_bound - report.final_lower_bound).abs()
        );

        for pair in report.history.windows(2) {
            assert!(pair[1].upper_bound <= pair[0].upper_bound);
            let slack = config.solver.mip_rel_gap * pair[0].lower_bound.abs();
            assert!(pair[1].lower_bound >= pair[0].lower_bound - slack - 1e-6);
        }
    }
}
