//! Execution ordering for workflow graphs.

use flowcore::{Dag, NodeId, Workflow, WorkflowError};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};

/// Topological ordering of a workflow graph.
pub trait TopologicalSort {
    /// Returns node ids so that every connection's source precedes its target.
    ///
    /// Kahn's algorithm. Among simultaneously ready nodes the order is not part
    /// of the contract. A graph with a cycle yields
    /// [`WorkflowError::CyclicDependency`] and no partial order.
    fn topological_sort(&self) -> Result<Vec<NodeId>, WorkflowError>;
}

impl TopologicalSort for Dag {
    fn topological_sort(&self) -> Result<Vec<NodeId>, WorkflowError> {
        let (graph, _) = build_graph(self)?;

        let mut in_degree: HashMap<NodeIndex, usize> = graph
            .node_indices()
            .map(|idx| (idx, graph.neighbors_directed(idx, Direction::Incoming).count()))
            .collect();

        let mut queue: VecDeque<NodeIndex> = graph
            .node_indices()
            .filter(|idx| in_degree.get(idx) == Some(&0))
            .collect();

        let mut order = Vec::with_capacity(graph.node_count());
        while let Some(idx) = queue.pop_front() {
            order.push(graph[idx].clone());

            // Parallel edges show up once per edge, matching the in-degree count.
            for next in graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(next);
                    }
                }
            }
        }

        if order.len() < graph.node_count() {
            return Err(WorkflowError::CyclicDependency);
        }
        Ok(order)
    }
}

impl TopologicalSort for Workflow {
    fn topological_sort(&self) -> Result<Vec<NodeId>, WorkflowError> {
        self.dag.topological_sort()
    }
}

/// Build a dependency graph from the workflow connections
fn build_graph(dag: &Dag) -> Result<(DiGraph<NodeId, ()>, HashMap<&str, NodeIndex>), WorkflowError> {
    let mut graph = DiGraph::new();
    let mut node_to_index = HashMap::new();

    for id in dag.nodes.keys() {
        let idx = graph.add_node(id.clone());
        node_to_index.insert(id.as_str(), idx);
    }

    for conn in &dag.connections {
        let endpoint = |id: &str, side: &'static str| {
            node_to_index
                .get(id)
                .copied()
                .ok_or_else(|| WorkflowError::NodeNotFound {
                    connection: conn.id.clone(),
                    side,
                    node: id.to_string(),
                })
        };
        let from = endpoint(&conn.from.node_id, "source")?;
        let to = endpoint(&conn.to.node_id, "target")?;
        graph.add_edge(from, to, ());
    }

    Ok((graph, node_to_index))
}
