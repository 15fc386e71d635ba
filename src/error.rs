use crate::graph;
use crate::solver;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Errors found while reading or validating a case
#[derive(Debug, Error)]
pub enum InputError {
    #[error("error while reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error while parsing {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("ID {id} not found for {entity}")]
    MissingId { entity: &'static str, id: usize },

    #[error("{entity} has {count} entries with ID {id}")]
    DuplicatedId {
        entity: &'static str,
        id: usize,
        count: usize,
    },

    #[error("invalid transition: {0}")]
    Transition(#[from] graph::GraphBuildingError),

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
}

/// Why the backend could not produce a commitment for the master problem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SolverFailureKind {
    /// The solve finished with a status other than optimal
    ModelStatus(String),
    /// A backend call returned an error status
    Backend(String),
    /// The solution does not match the built master problem
    MalformedSolution { expected: usize, found: usize },
}

impl std::fmt::Display for SolverFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModelStatus(status) => write!(f, "model status {status}"),
            Self::Backend(call) => write!(f, "backend error ({call})"),
            Self::MalformedSolution { expected, found } => write!(
                f,
                "solution with {found} columns, expected {expected}"
            ),
        }
    }
}

/// Fatal failure of a master problem solve. Never retried.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("master problem failed at iteration {iteration}: {kind}")]
pub struct SolverFailure {
    pub iteration: usize,
    pub kind: SolverFailureKind,
}

impl SolverFailure {
    pub fn from_status(
        iteration: usize,
        status: solver::HighsModelStatus,
    ) -> Self {
        Self {
            iteration,
            kind: SolverFailureKind::ModelStatus(status.to_string()),
        }
    }

    pub fn from_backend(
        iteration: usize,
        call: &str,
        status: solver::HighsStatus,
    ) -> Self {
        Self {
            iteration,
            kind: SolverFailureKind::Backend(format!("{call}: {status:?}")),
        }
    }
}

/// Top level errors of a decomposition run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("building the master problem: {0}")]
    MasterBuild(SolverFailure),

    #[error(
        "decomposition aborted ({failure}), last bounds: \
         lower {lower_bound}, upper {upper_bound}"
    )]
    Aborted {
        #[source]
        failure: SolverFailure,
        lower_bound: f64,
        upper_bound: f64,
    },

    #[error("error while writing outputs: {0}")]
    Csv(#[from] csv::Error),

    #[error("error while writing outputs: {0}")]
    Io(#[from] std::io::Error),

    #[error("error while writing outputs: {0}")]
    Json(#[from] serde_json::Error),
}
