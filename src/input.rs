use crate::error::InputError;
use crate::system;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::Path;

fn default_threads() -> i32 {
    1
}

fn default_time_limit() -> f64 {
    300.0
}

fn default_mip_rel_gap() -> f64 {
    1e-4
}

fn default_presolve() -> String {
    "on".to_string()
}

fn default_run_crossover() -> String {
    "off".to_string()
}

fn default_integrality_tolerance() -> f64 {
    1e-6
}

/// Options forwarded to the master problem backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SolverOptions {
    #[serde(default = "default_threads")]
    pub threads: i32,
    #[serde(default = "default_time_limit")]
    pub time_limit: f64,
    #[serde(default = "default_mip_rel_gap")]
    pub mip_rel_gap: f64,
    #[serde(default = "default_presolve")]
    pub presolve: String,
    #[serde(default = "default_run_crossover")]
    pub run_crossover: String,
    #[serde(default)]
    pub iteration_limit: Option<i32>,
    #[serde(default = "default_integrality_tolerance")]
    pub integrality_tolerance: f64,
    /// When set, the backend log is written to this file
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            time_limit: default_time_limit(),
            mip_rel_gap: default_mip_rel_gap(),
            presolve: default_presolve(),
            run_crossover: default_run_crossover(),
            iteration_limit: None,
            integrality_tolerance: default_integrality_tolerance(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub penalty_rate: f64,
    #[serde(default)]
    pub solver: SolverOptions,
}

#[derive(Debug, Deserialize)]
pub struct UnitInput {
    pub min_generation: f64,
    pub max_generation: f64,
    pub variable_cost: f64,
    pub startup_cost: f64,
    pub shutdown_cost: f64,
    pub fixed_cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct StateInput {
    pub id: usize,
    pub duration: f64,
    pub net_demand: f64,
}

#[derive(Debug, Deserialize)]
pub struct TransitionInput {
    pub from_state: usize,
    pub to_state: usize,
    pub weight: f64,
}

#[derive(Debug, Deserialize)]
pub struct SystemInput {
    pub unit: UnitInput,
    pub states: Vec<StateInput>,
    pub transitions: Vec<TransitionInput>,
}

fn read_json<T: DeserializeOwned>(filepath: &Path) -> Result<T, InputError> {
    let contents =
        fs::read_to_string(filepath).map_err(|source| InputError::Io {
            path: filepath.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&contents).map_err(|source| InputError::Json {
        path: filepath.to_path_buf(),
        source,
    })
}

pub fn read_config_input(filepath: &Path) -> Result<Config, InputError> {
    read_json(filepath)
}

pub fn read_system_input(filepath: &Path) -> Result<SystemInput, InputError> {
    read_json(filepath)
}

fn invalid(name: &str, reason: &str) -> InputError {
    InputError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_non_negative(value: f64, name: &str) -> Result<(), InputError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(name, "must be finite and non-negative"));
    }
    Ok(())
}

fn validate_id_range(
    ids: &[usize],
    elem_name: &'static str,
) -> Result<(), InputError> {
    for elem_id in 0..ids.len() {
        let count = ids.iter().filter(|id| **id == elem_id).count();
        match count {
            0 => {
                return Err(InputError::MissingId {
                    entity: elem_name,
                    id: elem_id,
                })
            }
            1 => continue,
            _ => {
                return Err(InputError::DuplicatedId {
                    entity: elem_name,
                    id: elem_id,
                    count,
                })
            }
        }
    }
    Ok(())
}

fn validate_switch(value: &str, name: &str) -> Result<(), InputError> {
    match value {
        "on" | "off" | "choose" => Ok(()),
        _ => Err(invalid(name, "must be one of on, off or choose")),
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<(), InputError> {
        if self.threads < 0 {
            return Err(invalid("solver.threads", "must be non-negative"));
        }
        validate_non_negative(self.time_limit, "solver.time_limit")?;
        validate_non_negative(self.mip_rel_gap, "solver.mip_rel_gap")?;
        validate_switch(&self.presolve, "solver.presolve")?;
        validate_switch(&self.run_crossover, "solver.run_crossover")?;
        if let Some(limit) = self.iteration_limit {
            if limit < 0 {
                return Err(invalid(
                    "solver.iteration_limit",
                    "must be non-negative",
                ));
            }
        }
        let tol = self.integrality_tolerance;
        if !(tol > 0.0 && tol < 0.5) {
            return Err(invalid(
                "solver.integrality_tolerance",
                "must be in the (0, 0.5) interval",
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Checks the decomposition parameters against the unit parameters
    pub fn validate(&self, unit: &UnitInput) -> Result<(), InputError> {
        validate_non_negative(self.tolerance, "tolerance")?;
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }
        validate_non_negative(self.penalty_rate, "penalty_rate")?;
        if self.penalty_rate <= unit.variable_cost {
            return Err(invalid(
                "penalty_rate",
                "must be greater than the unit variable cost",
            ));
        }
        self.solver.validate()
    }
}

impl SystemInput {
    pub fn build_system(&self) -> Result<system::System, InputError> {
        let unit = &self.unit;
        validate_non_negative(unit.min_generation, "unit.min_generation")?;
        validate_non_negative(unit.max_generation, "unit.max_generation")?;
        validate_non_negative(unit.variable_cost, "unit.variable_cost")?;
        validate_non_negative(unit.startup_cost, "unit.startup_cost")?;
        validate_non_negative(unit.shutdown_cost, "unit.shutdown_cost")?;
        validate_non_negative(unit.fixed_cost, "unit.fixed_cost")?;
        if unit.min_generation > unit.max_generation {
            return Err(invalid(
                "unit.min_generation",
                "must not exceed unit.max_generation",
            ));
        }

        // ensure valid id ranges (0..)
        let state_ids: Vec<usize> = self.states.iter().map(|s| s.id).collect();
        if state_ids.is_empty() {
            return Err(invalid("states", "at least one state is required"));
        }
        validate_id_range(&state_ids, "states")?;

        let mut states = Vec::<system::SystemState>::with_capacity(
            self.states.len(),
        );
        for id in 0..self.states.len() {
            // ids were validated above, the lookup always succeeds
            if let Some(s) = self.states.iter().find(|s| s.id == id) {
                validate_non_negative(s.duration, "state duration")?;
                validate_non_negative(s.net_demand, "state net_demand")?;
                states.push(system::SystemState::new(
                    id,
                    s.duration,
                    s.net_demand,
                ));
            }
        }

        let mut transitions =
            Vec::<system::Transition>::with_capacity(self.transitions.len());
        for t in self.transitions.iter() {
            validate_non_negative(t.weight, "transition weight")?;
            if t.from_state == t.to_state {
                return Err(invalid(
                    "transition",
                    "a state cannot transition to itself",
                ));
            }
            transitions.push(system::Transition::new(
                t.from_state,
                t.to_state,
                t.weight,
            ));
        }

        let unit = system::UnitParams::new(
            unit.min_generation,
            unit.max_generation,
            unit.variable_cost,
            unit.startup_cost,
            unit.shutdown_cost,
            unit.fixed_cost,
        );
        Ok(system::System::new(unit, states, transitions)?)
    }
}

/// A complete case, read from the `config.json` and `system.json` files
/// of a directory
pub struct Input {
    pub config: Config,
    pub system: system::System,
}

impl Input {
    pub fn build(path: &Path) -> Result<Self, InputError> {
        let config = read_config_input(&path.join("config.json"))?;
        let system_input = read_system_input(&path.join("system.json"))?;
        config.validate(&system_input.unit)?;
        let system = system_input.build_system()?;
        Ok(Self { config, system })
    }
}
