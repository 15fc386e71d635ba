use crate::cut;
use crate::decomposition::{DecompositionReport, IterationRecord};
use crate::error::RunError;

use csv::Writer;
use serde;
use std::fs::File;
use std::io::BufWriter;

#[derive(serde::Serialize)]
struct IterationOutput {
    iteration: usize,
    master_objective: f64,
    theta: f64,
    dispatch_cost: f64,
    candidate_upper_bound: f64,
    lower_bound: f64,
    upper_bound: f64,
    gap: f64,
    /// One digit per state, in state order
    committed_states: String,
}

impl From<&IterationRecord> for IterationOutput {
    fn from(record: &IterationRecord) -> Self {
        Self {
            iteration: record.iteration,
            master_objective: record.master_objective,
            theta: record.theta,
            dispatch_cost: record.dispatch_cost,
            candidate_upper_bound: record.candidate_upper_bound,
            lower_bound: record.lower_bound,
            upper_bound: record.upper_bound,
            gap: record.gap,
            committed_states: record
                .commitment
                .as_binary()
                .iter()
                .map(|b| b.to_string())
                .collect(),
        }
    }
}

fn write_iterations(
    history: &[IterationRecord],
    path: &str,
) -> Result<(), RunError> {
    let mut wtr = Writer::from_path(path.to_owned() + "/iterations.csv")?;
    for record in history.iter() {
        wtr.serialize(IterationOutput::from(record))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_cuts(cuts: &cut::CutStore, path: &str) -> Result<(), RunError> {
    let mut wtr = Writer::from_path(path.to_owned() + "/cuts.csv")?;
    for cut in cuts.all().iter() {
        wtr.serialize(cut)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_report(
    report: &DecompositionReport,
    path: &str,
) -> Result<(), RunError> {
    let file = File::create(path.to_owned() + "/report.json")?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;
    Ok(())
}

pub fn generate_outputs(
    report: &DecompositionReport,
    cuts: &cut::CutStore,
    path: &str,
) -> Result<(), RunError> {
    write_iterations(&report.history, path)?;
    write_cuts(cuts, path)?;
    write_report(report, path)?;
    Ok(())
}
