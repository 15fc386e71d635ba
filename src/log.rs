use crate::decomposition::TerminationStatus;
use std::time::Duration;

pub fn show_greeting() {
    println!("\n# ucbenders - unit commitment decomposition");
    println!(
        "- Started at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
}

pub fn input_reading_line(path: &str) {
    println!("\nReading input files from '{path}'");
}

pub fn output_generation_line(path: &str) {
    println!("\nWriting outputs to '{path}'");
}

/// Helper function for displaying the greeting data for the decomposition
pub fn decomposition_greeting(
    num_states: usize,
    num_transitions: usize,
    max_iterations: usize,
    tolerance: f64,
) {
    println!("\n# Decomposition");
    println!("- States: {num_states}");
    println!("- Transitions: {num_transitions}");
    println!("- Max iterations: {max_iterations}");
    println!("- Tolerance: {tolerance:e}\n");
}

/// Helper function for displaying the iteration table header
pub fn iteration_table_header() {
    println!(
        "{0: ^10} | {1: ^16} | {2: ^16} | {3: ^16} | {4: ^12} | {5: ^10}",
        "iteration",
        "lower bound ($)",
        "upper bound ($)",
        "dispatch ($)",
        "gap ($)",
        "time (s)"
    )
}

/// Helper function for displaying a divider for the iteration table
pub fn iteration_table_divider() {
    println!("{}", "-".repeat(95))
}

/// Helper function for displaying a row of iteration results for
/// the iteration table
pub fn iteration_table_row(
    iteration: usize,
    lower_bound: f64,
    upper_bound: f64,
    dispatch_cost: f64,
    gap: f64,
    time: Duration,
) {
    println!(
        "{0: >10} | {1: >16.4} | {2: >16.4} | {3: >16.4} | {4: >12.4} | {5: >10.2}",
        iteration,
        lower_bound,
        upper_bound,
        dispatch_cost,
        gap,
        time.as_millis() as f64 / 1000.0
    )
}

pub fn termination_line(status: TerminationStatus, iteration_count: usize) {
    let text = match status {
        TerminationStatus::Running => "still running",
        TerminationStatus::Converged => "converged",
        TerminationStatus::MaxIterationsReached => {
            "reached the maximum number of iterations"
        }
        TerminationStatus::Aborted => "aborted on a master problem failure",
    };
    println!("\nDecomposition {text} after {iteration_count} iteration(s)");
}

pub fn decomposition_duration(time: Duration) {
    println!(
        "Decomposition time: {:.2} s",
        time.as_millis() as f64 / 1000.0
    )
}

pub fn show_farewell(time: Duration) {
    println!("\nTotal running time: {:.2} s", time.as_millis() as f64 / 1000.0);
}
