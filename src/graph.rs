#[derive(Debug)]
pub struct Node<T> {
    pub id: usize,
    pub data: T,
}

impl<T> Node<T> {
    pub fn new(id: usize, data: T) -> Self {
        Self { id, data }
    }
}

/// A directed, weighted edge between two nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub id: usize,
    pub source_id: usize,
    pub target_id: usize,
    pub weight: f64,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum GraphBuildingError {
    #[error("node {0} not found")]
    NodeNotFound(usize),
    #[error("edge {0} -> {1} already exists")]
    EdgeAlreadyExists(usize, usize),
}

/// A simple directed graph with weighted edges, used for storing the
/// operating states of a unit and the transitions allowed between them.
/// Edges keep their insertion order, which is also their id.
#[derive(Debug)]
pub struct DirectedGraph<T> {
    nodes: Vec<Node<T>>,
    edges: Vec<Edge>,
    // adjacency_list[i] contains the IDs of edges leaving node 'i'
    adjacency_list: Vec<Vec<usize>>,
}

impl<T> Default for DirectedGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DirectedGraph<T> {
    pub fn new() -> Self {
        DirectedGraph {
            nodes: vec![],
            edges: vec![],
            adjacency_list: vec![],
        }
    }

    /// Adds a new node to the node collection, returning its id. Ids are
    /// assigned sequentially from zero.
    pub fn add_node(&mut self, data: T) -> usize {
        let id = self.node_count();
        self.nodes.push(Node::new(id, data));
        self.adjacency_list.push(vec![]);
        id
    }

    /// Adds a new weighted edge, returning its id. Parallel edges
    /// between the same pair of nodes are rejected.
    pub fn add_edge(
        &mut self,
        source_id: usize,
        target_id: usize,
        weight: f64,
    ) -> Result<usize, GraphBuildingError> {
        // validation
        if source_id >= self.nodes.len() {
            return Err(GraphBuildingError::NodeNotFound(source_id));
        }
        if target_id >= self.nodes.len() {
            return Err(GraphBuildingError::NodeNotFound(target_id));
        }
        if self.adjacency_list[source_id]
            .iter()
            .any(|&e| self.edges[e].target_id == target_id)
        {
            return Err(GraphBuildingError::EdgeAlreadyExists(
                source_id, target_id,
            ));
        }

        // adding to the topology
        let id = self.edges.len();
        self.edges.push(Edge {
            id,
            source_id,
            target_id,
            weight,
        });
        self.adjacency_list[source_id].push(id);
        Ok(id)
    }

    pub fn get_node(&self, id: usize) -> Option<&Node<T>> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<T>> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_create_directed_graph() {
        let graph = DirectedGraph::<f64>::new();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_add_node_to_directed_graph() {
        let mut graph = DirectedGraph::<f64>::new();
        assert_eq!(graph.add_node(10.0), 0);
        assert_eq!(graph.add_node(20.0), 1);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.get_node(1).unwrap().data, 20.0);
    }

    #[test]
    fn test_add_edge_to_directed_graph() {
        let mut graph = DirectedGraph::<f64>::new();
        graph.add_node(10.0);
        graph.add_node(20.0);
        let edge_id = graph.add_edge(0, 1, 0.5).unwrap();
        assert_eq!(edge_id, 0);
        assert_eq!(graph.edges()[0].weight, 0.5);
        assert_eq!(graph.edges()[0].source_id, 0);
        assert_eq!(graph.edges()[0].target_id, 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_add_edge_to_missing_node() {
        let mut graph = DirectedGraph::<f64>::new();
        graph.add_node(10.0);
        assert_eq!(
            graph.add_edge(0, 1, 1.0),
            Err(GraphBuildingError::NodeNotFound(1))
        );
    }

    #[test]
    fn test_add_duplicated_edge() {
        let mut graph = DirectedGraph::<f64>::new();
        graph.add_node(10.0);
        graph.add_node(20.0);
        graph.add_edge(0, 1, 1.0).unwrap();
        // the reverse direction is a distinct edge
        assert!(graph.add_edge(1, 0, 1.0).is_ok());
        assert_eq!(
            graph.add_edge(0, 1, 2.0),
            Err(GraphBuildingError::EdgeAlreadyExists(0, 1))
        );
    }
}
