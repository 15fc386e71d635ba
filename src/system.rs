use crate::graph;

/// A discrete operating state of the unit, such as a block of hours
/// with a given net demand.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemState {
    pub id: usize,
    pub duration: f64,
    pub net_demand: f64,
}

impl SystemState {
    pub fn new(id: usize, duration: f64, net_demand: f64) -> Self {
        Self {
            id,
            duration,
            net_demand,
        }
    }
}

/// A directed transition between two states. The weight scales the
/// startup and shutdown costs incurred when the commitment flips along it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from_state: usize,
    pub to_state: usize,
    pub weight: f64,
}

impl Transition {
    pub fn new(from_state: usize, to_state: usize, weight: f64) -> Self {
        Self {
            from_state,
            to_state,
            weight,
        }
    }
}

/// Technical and economic parameters of the committed unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitParams {
    pub min_generation: f64,
    pub max_generation: f64,
    pub variable_cost: f64,
    pub startup_cost: f64,
    pub shutdown_cost: f64,
    pub fixed_cost: f64,
}

impl UnitParams {
    pub fn new(
        min_generation: f64,
        max_generation: f64,
        variable_cost: f64,
        startup_cost: f64,
        shutdown_cost: f64,
        fixed_cost: f64,
    ) -> Self {
        Self {
            min_generation,
            max_generation,
            variable_cost,
            startup_cost,
            shutdown_cost,
            fixed_cost,
        }
    }
}

#[derive(Debug)]
pub struct SystemMetadata {
    pub states_count: usize,
    pub transitions_count: usize,
}

/// The static description of the problem: the states graph, with
/// transitions as weighted edges, and the unit parameters.
#[derive(Debug)]
pub struct System {
    pub unit: UnitParams,
    pub graph: graph::DirectedGraph<SystemState>,
    pub meta: SystemMetadata,
}

impl System {
    /// Builds the states graph. States are expected to be ordered by id,
    /// with ids in the range `0..states.len()`.
    pub fn new(
        unit: UnitParams,
        states: Vec<SystemState>,
        transitions: Vec<Transition>,
    ) -> Result<Self, graph::GraphBuildingError> {
        let mut graph = graph::DirectedGraph::new();
        for state in states.into_iter() {
            graph.add_node(state);
        }
        for t in transitions.iter() {
            graph.add_edge(t.from_state, t.to_state, t.weight)?;
        }

        let states_count = graph.node_count();
        let transitions_count = graph.edge_count();

        Ok(Self {
            unit,
            graph,
            meta: SystemMetadata {
                states_count,
                transitions_count,
            },
        })
    }

    pub fn states(&self) -> impl Iterator<Item = &SystemState> {
        self.graph.nodes().map(|node| &node.data)
    }

    pub fn get_state(&self, id: usize) -> Option<&SystemState> {
        self.graph.get_node(id).map(|node| &node.data)
    }

    pub fn transitions(&self) -> &[graph::Edge] {
        self.graph.edges()
    }
}

impl Default for System {
    /// A daily cycle of six four-hour blocks, linked in a ring, for a
    /// unit with a 1000 - 3000 MW operating range.
    fn default() -> Self {
        let unit =
            UnitParams::new(1000.0, 3000.0, 50.0, 5000.0, 1000.0, 200.0);
        let demands = [800.0, 1500.0, 2600.0, 3200.0, 2100.0, 900.0];
        let states = demands
            .iter()
            .enumerate()
            .map(|(id, demand)| SystemState::new(id, 4.0, *demand))
            .collect();
        let num_states = demands.len();
        let transitions = (0..num_states)
            .map(|id| Transition::new(id, (id + 1) % num_states, 1.0))
            .collect();

        match Self::new(unit, states, transitions) {
            Ok(system) => system,
            Err(e) => unreachable!("default system is consistent: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_create_default_system() {
        let system = System::default();
        assert_eq!(system.meta.states_count, 6);
        assert_eq!(system.meta.transitions_count, 6);
        assert_eq!(system.states().count(), 6);
        assert_eq!(system.transitions()[5].source_id, 5);
        assert_eq!(system.transitions()[5].target_id, 0);
    }

    #[test]
    fn test_get_state() {
        let system = System::default();
        let state = system.get_state(3).unwrap();
        assert_eq!(state.id, 3);
        assert_eq!(state.net_demand, 3200.0);
        assert!(system.get_state(6).is_none());
    }

    #[test]
    fn test_create_system_with_invalid_transition() {
        let unit = UnitParams::new(0.0, 10.0, 1.0, 0.0, 0.0, 0.0);
        let states = vec![SystemState::new(0, 1.0, 5.0)];
        let transitions = vec![Transition::new(0, 1, 1.0)];
        let system = System::new(unit, states, transitions);
        assert!(matches!(
            system,
            Err(graph::GraphBuildingError::NodeNotFound(1))
        ));
    }
}
