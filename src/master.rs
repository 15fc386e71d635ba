use crate::cut;
use crate::error::{SolverFailure, SolverFailureKind};
use crate::input::SolverOptions;
use crate::solver;
use crate::system;
use serde::Serialize;

/// On/off decision for each state, indexed by state id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commitment {
    values: Vec<bool>,
}

impl Commitment {
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    /// Rounds the backend values of the binary variables to the nearest
    /// integer. Also returns the largest distance found to an integer.
    pub fn from_relaxed(values: &[f64]) -> (Self, f64) {
        let mut max_deviation: f64 = 0.0;
        let values = values
            .iter()
            .map(|v| {
                max_deviation = max_deviation.max((v - v.round()).abs());
                v.round() >= 1.0
            })
            .collect();
        (Self { values }, max_deviation)
    }

    /// States outside the vector are never committed
    pub fn is_committed(&self, state_id: usize) -> bool {
        self.values.get(state_id).copied().unwrap_or(false)
    }

    pub fn values(&self) -> &[bool] {
        &self.values
    }

    pub fn as_binary(&self) -> Vec<u8> {
        self.values.iter().map(|v| u8::from(*v)).collect()
    }

    pub fn committed_count(&self) -> usize {
        self.values.iter().filter(|v| **v).count()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The result of a master problem solve
#[derive(Debug, Clone, PartialEq)]
pub struct MasterSolution {
    pub commitment: Commitment,
    pub objective: f64,
    pub theta: f64,
}

/// The integer commitment problem solved at each iteration, given the
/// cuts accumulated so far.
pub trait MasterSolver {
    fn solve(
        &mut self,
        iteration: usize,
        cuts: &cut::CutStore,
    ) -> Result<MasterSolution, SolverFailure>;
}

/// Helper function for applying the configured options to the master
/// model before it is solved for the first time.
fn set_solver_options(
    model: &mut solver::Model,
    options: &SolverOptions,
) -> Result<(), solver::HighsStatus> {
    model.set_option("presolve", options.presolve.as_str())?;
    model.set_option("run_crossover", options.run_crossover.as_str())?;
    model.set_option("threads", options.threads)?;
    model.set_option("time_limit", options.time_limit)?;
    model.set_option("mip_rel_gap", options.mip_rel_gap)?;
    model.set_option(
        "mip_feasibility_tolerance",
        options.integrality_tolerance,
    )?;
    if let Some(limit) = options.iteration_limit {
        model.set_option("simplex_iteration_limit", limit)?;
    }
    if let Some(log_file) = &options.log_file {
        model.set_option("output_flag", true)?;
        model.set_option("log_file", log_file.as_str())?;
    }
    Ok(())
}

/// Helper accessor for indexing the variables and constraints of the
/// master problem
#[derive(Debug)]
pub struct Accessors {
    pub commitment: Vec<usize>,
    pub startup: Vec<usize>,
    pub shutdown: Vec<usize>,
    pub theta: usize,
    pub transition_coupling: Vec<usize>,
    pub min_commitment: usize,
    pub cuts: Vec<usize>,
}

/// Master problem backed by HiGHS. The model is built once and every
/// new cut becomes an indexed `theta >= bound` row before the next solve.
#[derive(Debug)]
pub struct HighsMaster {
    model: solver::Model,
    pub accessors: Accessors,
    integrality_tolerance: f64,
}

impl HighsMaster {
    pub fn new(
        system: &system::System,
        options: &SolverOptions,
    ) -> Result<Self, SolverFailure> {
        let build_failure = |call: &str, status: solver::HighsStatus| {
            SolverFailure::from_backend(0, call, status)
        };
        let mut pb = solver::Problem::new();
        let unit = &system.unit;

        // VARIABLES
        let commitment: Vec<usize> = system
            .states()
            .map(|state| {
                pb.add_integer_column(
                    state.duration * unit.fixed_cost,
                    0.0..=1.0,
                )
            })
            .collect();
        let startup: Vec<usize> = system
            .transitions()
            .iter()
            .map(|t| {
                pb.add_integer_column(t.weight * unit.startup_cost, 0.0..=1.0)
            })
            .collect();
        let shutdown: Vec<usize> = system
            .transitions()
            .iter()
            .map(|t| {
                pb.add_integer_column(t.weight * unit.shutdown_cost, 0.0..=1.0)
            })
            .collect();

        let theta = pb.add_column(1.0, 0.0..);

        // Couples the startup and shutdown indicators to the commitment
        // flips along each transition
        let mut transition_coupling =
            Vec::<usize>::with_capacity(system.meta.transitions_count);
        for t in system.transitions().iter() {
            let mut factors =
                vec![(startup[t.id], -1.0), (shutdown[t.id], 1.0)];
            if t.source_id != t.target_id {
                factors.push((commitment[t.target_id], 1.0));
                factors.push((commitment[t.source_id], -1.0));
            }
            let row = pb
                .add_row(0.0..=0.0, &factors)
                .map_err(|e| build_failure("add_row", e))?;
            transition_coupling.push(row);
        }

        // At least one state must be committed
        let factors: Vec<(usize, f64)> =
            commitment.iter().map(|col| (*col, 1.0)).collect();
        let min_commitment = pb
            .add_row(1.0.., &factors)
            .map_err(|e| build_failure("add_row", e))?;

        let mut model = pb
            .try_optimise()
            .map_err(|e| build_failure("Highs_passMip", e))?;
        set_solver_options(&mut model, options)
            .map_err(|e| build_failure("Highs_setOptionValue", e))?;

        tracing::debug!(
            "master built with {} columns and {} rows",
            theta + 1,
            min_commitment + 1
        );

        let accessors = Accessors {
            commitment,
            startup,
            shutdown,
            theta,
            transition_coupling,
            min_commitment,
            cuts: vec![],
        };

        Ok(Self {
            model,
            accessors,
            integrality_tolerance: options.integrality_tolerance,
        })
    }

    /// Adds a row for each cut that is not yet in the model
    fn add_cut_constraints_to_model(
        &mut self,
        iteration: usize,
        cuts: &cut::CutStore,
    ) -> Result<(), SolverFailure> {
        let theta = self.accessors.theta;
        for c in cuts.since(self.accessors.cuts.len()) {
            let row = self
                .model
                .try_add_row(c.bound_value.., [(theta, 1.0)])
                .map_err(|e| {
                    SolverFailure::from_backend(iteration, "Highs_addRow", e)
                })?;
            self.accessors.cuts.push(row);
        }
        Ok(())
    }

    fn get_commitment_from_solution(
        &self,
        solution: &solver::Solution,
    ) -> Commitment {
        let values: Vec<f64> = self
            .accessors
            .commitment
            .iter()
            .map(|col| solution.colvalue[*col])
            .collect();
        let (commitment, deviation) = Commitment::from_relaxed(&values);
        if deviation > self.integrality_tolerance {
            tracing::warn!(
                "commitment value {:.3e} away from integer, above the \
                 integrality tolerance {:.3e}",
                deviation,
                self.integrality_tolerance
            );
        }
        commitment
    }
}

impl MasterSolver for HighsMaster {
    fn solve(
        &mut self,
        iteration: usize,
        cuts: &cut::CutStore,
    ) -> Result<MasterSolution, SolverFailure> {
        self.add_cut_constraints_to_model(iteration, cuts)?;

        self.model.try_solve().map_err(|e| {
            SolverFailure::from_backend(iteration, "Highs_run", e)
        })?;

        let status = self.model.status().map_err(|e| {
            SolverFailure::from_backend(
                iteration,
                "Highs_getModelStatus",
                e.into(),
            )
        })?;
        if status != solver::HighsModelStatus::Optimal {
            return Err(SolverFailure::from_status(iteration, status));
        }

        let solution = self.model.get_solution().map_err(|e| {
            SolverFailure::from_backend(iteration, "Highs_getSolution", e)
        })?;
        let expected = self.accessors.theta + 1;
        if solution.colvalue.len() != expected {
            return Err(SolverFailure {
                iteration,
                kind: SolverFailureKind::MalformedSolution {
                    expected,
                    found: solution.colvalue.len(),
                },
            });
        }

        let commitment = self.get_commitment_from_solution(&solution);
        let theta = solution.colvalue[self.accessors.theta];
        let objective = self.model.get_objective_value();
        tracing::debug!(
            "iteration {}: master objective {:.4}, theta {:.4}",
            iteration,
            objective,
            theta
        );

        Ok(MasterSolution {
            commitment,
            objective,
            theta,
        })
    }
}
