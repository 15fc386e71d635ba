use crate::master::Commitment;
use crate::system;

/// Cost and energy split of the dispatch of a single state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateDispatch {
    pub state_id: usize,
    pub generation: f64,
    pub penalized: f64,
    pub cost: f64,
}

/// Evaluates the dispatch cost of a fixed commitment in closed form.
/// Any mismatch between the demand and the committed unit range is
/// charged at the penalty rate, so the evaluation is always feasible.
#[derive(Debug, Clone, Copy)]
pub struct RecourseEvaluator<'a> {
    system: &'a system::System,
    penalty_rate: f64,
}

impl<'a> RecourseEvaluator<'a> {
    pub fn new(system: &'a system::System, penalty_rate: f64) -> Self {
        Self {
            system,
            penalty_rate,
        }
    }

    fn dispatch_state(
        &self,
        state: &system::SystemState,
        committed: bool,
    ) -> StateDispatch {
        let unit = &self.system.unit;
        let demand = state.net_demand;
        let (generation, penalized) = if !committed {
            (0.0, demand)
        } else if demand < unit.min_generation {
            // the shortfall to the minimum generation is penalized
            (demand, unit.min_generation - demand)
        } else if demand > unit.max_generation {
            (unit.max_generation, demand - unit.max_generation)
        } else {
            (demand, 0.0)
        };
        let cost = state.duration
            * (unit.variable_cost * generation + self.penalty_rate * penalized);
        StateDispatch {
            state_id: state.id,
            generation,
            penalized,
            cost,
        }
    }

    /// Per-state dispatch of the given commitment, ordered by state id
    pub fn breakdown(&self, commitment: &Commitment) -> Vec<StateDispatch> {
        self.system
            .states()
            .map(|s| self.dispatch_state(s, commitment.is_committed(s.id)))
            .collect()
    }

    /// Total dispatch cost of the given commitment
    pub fn evaluate(&self, commitment: &Commitment) -> f64 {
        self.breakdown(commitment).iter().map(|d| d.cost).sum()
    }
}
