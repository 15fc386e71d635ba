pub mod bounds;
pub mod cut;
pub mod decomposition;
pub mod error;
pub mod graph;
pub mod input;
mod log;
pub mod master;
pub mod output;
pub mod recourse;
mod solver;
pub mod system;
use decomposition::{DecompositionLoop, DecompositionReport};
use error::RunError;
use input::Input;
use master::HighsMaster;
use std::path::Path;
use std::time::Instant;

/// Reads the case in `input_args.path`, runs the decomposition and writes
/// the outputs to the same directory. The outputs are also written when
/// the run is aborted by a master failure.
pub fn run(input_args: &InputArgs) -> Result<DecompositionReport, RunError> {
    log::show_greeting();

    let begin = Instant::now();
    log::input_reading_line(&input_args.path);
    let input = Input::build(Path::new(&input_args.path))?;
    let config = &input.config;

    let master = HighsMaster::new(&input.system, &config.solver)
        .map_err(RunError::MasterBuild)?;
    let mut decomposition =
        DecompositionLoop::new(&input.system, config, master);
    let report = decomposition.run();

    log::output_generation_line(&input_args.path);
    let cuts = decomposition.cuts();
    output::generate_outputs(&report, cuts, &input_args.path)?;

    if let Some(failure) = &report.failure {
        return Err(RunError::Aborted {
            failure: failure.clone(),
            lower_bound: report.final_lower_bound,
            upper_bound: report.final_upper_bound,
        });
    }

    log::show_farewell(begin.elapsed());

    Ok(report)
}

pub struct InputArgs {
    pub path: String,
}

impl InputArgs {
    pub fn build(args: &[String]) -> Result<Self, &'static str> {
        if args.len() < 2 {
            return Err("Not enough arguments [PATH]");
        }

        let path = args[1].clone();

        Ok(Self { path })
    }
}
