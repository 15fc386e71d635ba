//! Thin wrapper over the HiGHS C API, in the spirit of the "highs" crate,
//! only supporting a row-oriented problem builder with optional integer
//! columns and the few model operations the master problem needs:
//! incremental row addition, option setting and primal solution retrieval.

use std::borrow::Borrow;
use std::convert::TryFrom;
use std::ffi::{c_void, CStr, CString};
use std::fmt::{Debug, Display, Formatter};
use std::num::TryFromIntError;
use std::ops::{Bound, RangeBounds};
use std::os::raw::{c_char, c_int};

use highs_sys::*;

/// Column integrality markers, as expected by `Highs_passMip`
const VAR_TYPE_CONTINUOUS: HighsInt = 0;
const VAR_TYPE_INTEGER: HighsInt = 1;

/// The kinds of results of an optimization
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsModelStatus {
    /// not initialized
    NotSet = MODEL_STATUS_NOTSET as isize,
    /// Unable to load model
    LoadError = MODEL_STATUS_LOAD_ERROR as isize,
    /// invalid model
    ModelError = MODEL_STATUS_MODEL_ERROR as isize,
    /// Unable to run the pre-solve phase
    PresolveError = MODEL_STATUS_PRESOLVE_ERROR as isize,
    /// Unable to solve
    SolveError = MODEL_STATUS_SOLVE_ERROR as isize,
    /// Unable to clean after solve
    PostsolveError = MODEL_STATUS_POSTSOLVE_ERROR as isize,
    /// No variables in the model: nothing to optimize
    ModelEmpty = MODEL_STATUS_MODEL_EMPTY as isize,
    /// There is no solution to the problem
    Infeasible = MODEL_STATUS_INFEASIBLE as isize,
    /// The problem in unbounded or infeasible
    UnboundedOrInfeasible = MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE as isize,
    /// The problem is unbounded: there is no single optimal value
    Unbounded = MODEL_STATUS_UNBOUNDED as isize,
    /// An optimal solution was found
    Optimal = MODEL_STATUS_OPTIMAL as isize,
    /// objective bound
    ObjectiveBound = MODEL_STATUS_OBJECTIVE_BOUND as isize,
    /// objective target
    ObjectiveTarget = MODEL_STATUS_OBJECTIVE_TARGET as isize,
    /// reached limit
    ReachedTimeLimit = MODEL_STATUS_REACHED_TIME_LIMIT as isize,
    /// reached limit
    ReachedIterationLimit = MODEL_STATUS_REACHED_ITERATION_LIMIT as isize,
    /// Unknown model status
    Unknown = MODEL_STATUS_UNKNOWN as isize,
}

impl Display for HighsModelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NotSet => "not set",
            Self::LoadError => "load error",
            Self::ModelError => "model error",
            Self::PresolveError => "presolve error",
            Self::SolveError => "solve error",
            Self::PostsolveError => "postsolve error",
            Self::ModelEmpty => "empty model",
            Self::Infeasible => "infeasible",
            Self::UnboundedOrInfeasible => "unbounded or infeasible",
            Self::Unbounded => "unbounded",
            Self::Optimal => "optimal",
            Self::ObjectiveBound => "objective bound reached",
            Self::ObjectiveTarget => "objective target reached",
            Self::ReachedTimeLimit => "time limit reached",
            Self::ReachedIterationLimit => "iteration limit reached",
            Self::Unknown => "unknown",
        };
        write!(f, "{text}")
    }
}

/// This error should never happen: an unexpected status was returned
#[derive(PartialEq, Clone, Copy)]
pub struct InvalidStatus(pub c_int);

impl Debug for InvalidStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not a valid HiGHS model status", self.0)
    }
}

impl TryFrom<c_int> for HighsModelStatus {
    type Error = InvalidStatus;

    fn try_from(value: c_int) -> Result<Self, Self::Error> {
        match value {
            MODEL_STATUS_NOTSET => Ok(Self::NotSet),
            MODEL_STATUS_LOAD_ERROR => Ok(Self::LoadError),
            MODEL_STATUS_MODEL_ERROR => Ok(Self::ModelError),
            MODEL_STATUS_PRESOLVE_ERROR => Ok(Self::PresolveError),
            MODEL_STATUS_SOLVE_ERROR => Ok(Self::SolveError),
            MODEL_STATUS_POSTSOLVE_ERROR => Ok(Self::PostsolveError),
            MODEL_STATUS_MODEL_EMPTY => Ok(Self::ModelEmpty),
            MODEL_STATUS_INFEASIBLE => Ok(Self::Infeasible),
            MODEL_STATUS_UNBOUNDED => Ok(Self::Unbounded),
            MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE => {
                Ok(Self::UnboundedOrInfeasible)
            }
            MODEL_STATUS_OPTIMAL => Ok(Self::Optimal),
            MODEL_STATUS_OBJECTIVE_BOUND => Ok(Self::ObjectiveBound),
            MODEL_STATUS_OBJECTIVE_TARGET => Ok(Self::ObjectiveTarget),
            MODEL_STATUS_REACHED_TIME_LIMIT => Ok(Self::ReachedTimeLimit),
            MODEL_STATUS_REACHED_ITERATION_LIMIT => {
                Ok(Self::ReachedIterationLimit)
            }
            MODEL_STATUS_UNKNOWN => Ok(Self::Unknown),
            n => Err(InvalidStatus(n)),
        }
    }
}

/// The status of a highs operation
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsStatus {
    /// Success
    OK = 0,
    /// Done, with warning
    Warning = 1,
    /// An error occurred
    Error = 2,
}

impl From<TryFromIntError> for HighsStatus {
    fn from(_: TryFromIntError) -> Self {
        Self::Error
    }
}

impl From<InvalidStatus> for HighsStatus {
    fn from(_: InvalidStatus) -> Self {
        Self::Error
    }
}

impl TryFrom<c_int> for HighsStatus {
    type Error = InvalidStatus;

    fn try_from(value: c_int) -> Result<Self, InvalidStatus> {
        match value {
            STATUS_OK => Ok(Self::OK),
            STATUS_WARNING => Ok(Self::Warning),
            STATUS_ERROR => Ok(Self::Error),
            n => Err(InvalidStatus(n)),
        }
    }
}

pub trait HighsOptionValue {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int;
}

impl HighsOptionValue for bool {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        highs_sys::Highs_setBoolOptionValue(
            highs,
            option,
            if self { 1 } else { 0 },
        )
    }
}

impl HighsOptionValue for i32 {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        highs_sys::Highs_setIntOptionValue(highs, option, self)
    }
}

impl HighsOptionValue for f64 {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        highs_sys::Highs_setDoubleOptionValue(highs, option, self)
    }
}

impl<'a> HighsOptionValue for &'a CStr {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        highs_sys::Highs_setStringOptionValue(highs, option, self.as_ptr())
    }
}

impl<'a> HighsOptionValue for &'a str {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        match CString::new(self) {
            Ok(value) => value.as_c_str().apply_to_highs(highs, option),
            Err(_) => STATUS_ERROR,
        }
    }
}

fn bound_value<N: Into<f64> + Copy>(b: Bound<&N>) -> Option<f64> {
    match b {
        Bound::Included(v) | Bound::Excluded(v) => Some((*v).into()),
        Bound::Unbounded => None,
    }
}

fn c(n: usize) -> Result<HighsInt, HighsStatus> {
    Ok(n.try_into()?)
}

macro_rules! highs_call {
    ($function_name:ident ($($param:expr),+)) => {
        try_handle_status(
            $function_name($($param),+),
            stringify!($function_name)
        )
    }
}

/// An optimization problem, built row by row over previously
/// declared columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Problem {
    pub num_col: usize,
    pub num_row: usize,
    pub num_nz: usize,
    pub col_cost: Vec<f64>,
    pub col_lower: Vec<f64>,
    pub col_upper: Vec<f64>,
    pub row_lower: Vec<f64>,
    pub row_upper: Vec<f64>,
    integrality: Vec<HighsInt>,
    columns: Vec<(Vec<c_int>, Vec<f64>)>,
}

impl Problem {
    /// Create a new problem instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint over existing columns. Returns the row index,
    /// or an error if a factor references an unknown column.
    pub fn add_row<
        N: Into<f64> + Copy,
        B: RangeBounds<N>,
        ITEM: Borrow<(usize, f64)>,
        I: IntoIterator<Item = ITEM>,
    >(
        &mut self,
        bounds: B,
        row_factors: I,
    ) -> Result<usize, HighsStatus> {
        let num_rows: c_int = c(self.num_row)?;
        for r in row_factors {
            let &(col, factor) = r.borrow();
            let column =
                self.columns.get_mut(col).ok_or(HighsStatus::Error)?;
            column.0.push(num_rows);
            column.1.push(factor);
            self.num_nz += 1;
        }
        let low =
            bound_value(bounds.start_bound()).unwrap_or(f64::NEG_INFINITY);
        let high = bound_value(bounds.end_bound()).unwrap_or(f64::INFINITY);
        self.row_lower.push(low);
        self.row_upper.push(high);
        let old_row_count = self.num_row;
        self.num_row += 1;
        Ok(old_row_count)
    }

    /// Adds a continuous column with the given objective factor
    pub fn add_column<N: Into<f64> + Copy, B: RangeBounds<N>>(
        &mut self,
        col_factor: f64,
        bounds: B,
    ) -> usize {
        self.push_column(col_factor, bounds, VAR_TYPE_CONTINUOUS)
    }

    /// Adds an integer column with the given objective factor. Binary
    /// variables are integer columns bounded by `0.0..=1.0`.
    pub fn add_integer_column<N: Into<f64> + Copy, B: RangeBounds<N>>(
        &mut self,
        col_factor: f64,
        bounds: B,
    ) -> usize {
        self.push_column(col_factor, bounds, VAR_TYPE_INTEGER)
    }

    fn push_column<N: Into<f64> + Copy, B: RangeBounds<N>>(
        &mut self,
        col_factor: f64,
        bounds: B,
        var_type: HighsInt,
    ) -> usize {
        self.col_cost.push(col_factor);
        let low =
            bound_value(bounds.start_bound()).unwrap_or(f64::NEG_INFINITY);
        let high = bound_value(bounds.end_bound()).unwrap_or(f64::INFINITY);
        self.col_lower.push(low);
        self.col_upper.push(high);
        self.integrality.push(var_type);
        self.columns.push((vec![], vec![]));
        let old_col_count = self.num_col;
        self.num_col += 1;
        old_col_count
    }

    pub fn is_mip(&self) -> bool {
        self.integrality.iter().any(|t| *t == VAR_TYPE_INTEGER)
    }

    fn to_compressed_matrix_form(
        &self,
    ) -> Result<(Vec<c_int>, Vec<c_int>, Vec<f64>), HighsStatus> {
        let mut astart = Vec::with_capacity(self.num_col + 1);
        astart.push(0);
        let size: usize = self.num_nz;
        let mut aindex = Vec::with_capacity(size);
        let mut avalue = Vec::with_capacity(size);
        for (row_indices, factors) in self.columns.iter() {
            aindex.extend_from_slice(row_indices);
            avalue.extend_from_slice(factors);
            astart.push(c(aindex.len())?);
        }
        Ok((astart, aindex, avalue))
    }

    /// Create a minimisation model based on this problem. Don't solve
    /// it yet.
    pub fn try_optimise(self) -> Result<Model, HighsStatus> {
        Model::try_new(self)
    }
}

#[derive(Debug)]
struct HighsPtr(*mut c_void);

impl Drop for HighsPtr {
    fn drop(&mut self) {
        unsafe { Highs_destroy(self.0) }
    }
}

impl Default for HighsPtr {
    fn default() -> Self {
        Self(unsafe { Highs_create() })
    }
}

impl HighsPtr {
    // Needed until https://github.com/ERGO-Code/HiGHS/issues/479 is fixed
    unsafe fn unsafe_mut_ptr(&self) -> *mut c_void {
        self.0
    }

    fn mut_ptr(&mut self) -> *mut c_void {
        self.0
    }

    /// Prevents writing anything to the standard output when solving the model
    fn make_quiet(&mut self) -> Result<(), HighsStatus> {
        self.set_option(&b"output_flag"[..], false)?;
        self.set_option(&b"log_to_console"[..], false)
    }

    /// Set a custom parameter on the model
    fn set_option<STR: Into<Vec<u8>>, V: HighsOptionValue>(
        &mut self,
        option: STR,
        value: V,
    ) -> Result<(), HighsStatus> {
        let c_str = CString::new(option).map_err(|_| HighsStatus::Error)?;
        let status =
            unsafe { value.apply_to_highs(self.mut_ptr(), c_str.as_ptr()) };
        try_handle_status(status, "Highs_setOptionValue")?;
        Ok(())
    }

    /// Number of variables
    fn num_cols(&self) -> Result<usize, TryFromIntError> {
        let n = unsafe { Highs_getNumCols(self.0) };
        n.try_into()
    }

    /// Number of constraints
    fn num_rows(&self) -> Result<usize, TryFromIntError> {
        let n = unsafe { Highs_getNumRows(self.0) };
        n.try_into()
    }
}

fn try_handle_status(
    status: c_int,
    msg: &str,
) -> Result<HighsStatus, HighsStatus> {
    match HighsStatus::try_from(status)? {
        status @ HighsStatus::OK => Ok(status),
        status @ HighsStatus::Warning => {
            tracing::debug!("HiGHS emitted a warning: {}", msg);
            Ok(status)
        }
        error => Err(error),
    }
}

/// A model to solve
#[derive(Debug)]
pub struct Model {
    highs: HighsPtr,
}

impl Model {
    /// Create a Highs model to be optimized (but don't solve it yet).
    /// Problems with integer columns are passed as a MIP, the others as
    /// plain LPs. Returns an error if the problem is incoherent.
    pub fn try_new(problem: Problem) -> Result<Self, HighsStatus> {
        let mut highs = HighsPtr::default();
        highs.make_quiet()?;
        let offset = 0.0;
        let (astart, aindex, avalue) = problem.to_compressed_matrix_form()?;
        if problem.is_mip() {
            unsafe {
                highs_call!(Highs_passMip(
                    highs.mut_ptr(),
                    c(problem.num_col)?,
                    c(problem.num_row)?,
                    c(problem.num_nz)?,
                    MATRIX_FORMAT_COLUMN_WISE,
                    OBJECTIVE_SENSE_MINIMIZE,
                    offset,
                    problem.col_cost.as_ptr(),
                    problem.col_lower.as_ptr(),
                    problem.col_upper.as_ptr(),
                    problem.row_lower.as_ptr(),
                    problem.row_upper.as_ptr(),
                    astart.as_ptr(),
                    aindex.as_ptr(),
                    avalue.as_ptr(),
                    problem.integrality.as_ptr()
                ))
            }?;
        } else {
            unsafe {
                highs_call!(Highs_passLp(
                    highs.mut_ptr(),
                    c(problem.num_col)?,
                    c(problem.num_row)?,
                    c(problem.num_nz)?,
                    MATRIX_FORMAT_COLUMN_WISE,
                    OBJECTIVE_SENSE_MINIMIZE,
                    offset,
                    problem.col_cost.as_ptr(),
                    problem.col_lower.as_ptr(),
                    problem.col_upper.as_ptr(),
                    problem.row_lower.as_ptr(),
                    problem.row_upper.as_ptr(),
                    astart.as_ptr(),
                    aindex.as_ptr(),
                    avalue.as_ptr()
                ))
            }?;
        }
        Ok(Self { highs })
    }

    pub fn set_option<STR: Into<Vec<u8>>, V: HighsOptionValue>(
        &mut self,
        option: STR,
        value: V,
    ) -> Result<(), HighsStatus> {
        self.highs.set_option(option, value)
    }

    /// Find the optimal value for the problem, return an error if the
    /// backend call itself fails. The model status must still be checked.
    pub fn try_solve(&mut self) -> Result<(), HighsStatus> {
        unsafe { highs_call!(Highs_run(self.highs.mut_ptr())) }?;
        Ok(())
    }

    /// Tries to add a new constraint to the highs model.
    ///
    /// Returns the added row index, or the error status value if HIGHS returned an error status.
    pub fn try_add_row(
        &mut self,
        bounds: impl RangeBounds<f64>,
        row_factors: impl IntoIterator<Item = (usize, f64)>,
    ) -> Result<usize, HighsStatus> {
        let (cols, factors): (Vec<_>, Vec<_>) = row_factors.into_iter().unzip();
        let cols = cols
            .into_iter()
            .map(c)
            .collect::<Result<Vec<HighsInt>, HighsStatus>>()?;

        unsafe {
            highs_call!(Highs_addRow(
                self.highs.mut_ptr(),
                bound_value(bounds.start_bound()).unwrap_or(f64::NEG_INFINITY),
                bound_value(bounds.end_bound()).unwrap_or(f64::INFINITY),
                c(cols.len())?,
                cols.as_ptr(),
                factors.as_ptr()
            ))
        }?;

        Ok(self.highs.num_rows()? - 1)
    }

    /// The status of the solution. Should be Optimal if everything went well.
    pub fn status(&self) -> Result<HighsModelStatus, InvalidStatus> {
        let model_status =
            unsafe { Highs_getModelStatus(self.highs.unsafe_mut_ptr()) };
        HighsModelStatus::try_from(model_status)
    }

    /// Get the primal values of the columns
    pub fn get_solution(&self) -> Result<Solution, HighsStatus> {
        let cols = self.num_cols()?;
        let rows = self.num_rows()?;
        let mut colvalue: Vec<f64> = vec![0.; cols];
        let mut coldual: Vec<f64> = vec![0.; cols];
        let mut rowvalue: Vec<f64> = vec![0.; rows];
        let mut rowdual: Vec<f64> = vec![0.; rows];

        // the backend always fills the dual and row values too
        unsafe {
            highs_call!(Highs_getSolution(
                self.highs.unsafe_mut_ptr(),
                colvalue.as_mut_ptr(),
                coldual.as_mut_ptr(),
                rowvalue.as_mut_ptr(),
                rowdual.as_mut_ptr()
            ))
        }?;

        Ok(Solution { colvalue })
    }

    pub fn get_objective_value(&self) -> f64 {
        unsafe { Highs_getObjectiveValue(self.highs.unsafe_mut_ptr()) }
    }

    /// Number of variables
    pub fn num_cols(&self) -> Result<usize, HighsStatus> {
        Ok(self.highs.num_cols()?)
    }

    /// Number of constraints
    pub fn num_rows(&self) -> Result<usize, HighsStatus> {
        Ok(self.highs.num_rows()?)
    }
}

/// Concrete values of the solution
#[derive(Clone, Debug)]
pub struct Solution {
    pub colvalue: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_tracks_columns_and_rows() {
        let mut pb = Problem::new();
        let x = pb.add_integer_column(1.0, 0.0..=1.0);
        let y = pb.add_column(2.0, 0.0..);
        let row = pb.add_row(1.0.., [(x, 1.0), (y, 1.0)]).unwrap();
        assert_eq!(row, 0);
        assert_eq!(pb.num_col, 2);
        assert_eq!(pb.num_row, 1);
        assert_eq!(pb.num_nz, 2);
        assert_eq!(pb.col_upper, vec![1.0, f64::INFINITY]);
        assert!(pb.is_mip());
    }

    #[test]
    fn test_add_row_with_unknown_column_fails() {
        let mut pb = Problem::new();
        pb.add_column(1.0, 0.0..);
        assert_eq!(pb.add_row(0.0..0.0, [(3, 1.0)]), Err(HighsStatus::Error));
    }

    #[test]
    fn test_solve_small_mip() {
        // min x + 2y, x + y >= 1.5, x, y integer in [0, 1]
        let mut pb = Problem::new();
        let x = pb.add_integer_column(1.0, 0.0..=1.0);
        let y = pb.add_integer_column(2.0, 0.0..=1.0);
        pb.add_row(1.5.., [(x, 1.0), (y, 1.0)]).unwrap();
        let mut model = pb.try_optimise().unwrap();
        model.try_solve().unwrap();
        assert_eq!(model.status().unwrap(), HighsModelStatus::Optimal);
        let solution = model.get_solution().unwrap();
        assert!((solution.colvalue[x] - 1.0).abs() < 1e-6);
        assert!((solution.colvalue[y] - 1.0).abs() < 1e-6);
        assert!((model.get_objective_value() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_add_row_to_built_model() {
        let mut pb = Problem::new();
        let x = pb.add_column(1.0, 0.0..);
        let mut model = pb.try_optimise().unwrap();
        let row = model.try_add_row(5.0.., [(x, 1.0)]).unwrap();
        assert_eq!(row, 0);
        model.try_solve().unwrap();
        assert_eq!(model.status().unwrap(), HighsModelStatus::Optimal);
        assert!((model.get_objective_value() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_model_status() {
        let mut pb = Problem::new();
        let x = pb.add_integer_column(1.0, 0.0..=1.0);
        pb.add_row(2.0.., [(x, 1.0)]).unwrap();
        let mut model = pb.try_optimise().unwrap();
        model.try_solve().unwrap();
        assert!(matches!(
            model.status().unwrap(),
            HighsModelStatus::Infeasible
                | HighsModelStatus::UnboundedOrInfeasible
        ));
    }
}
