//! Structural validation of pipelines
//!
//! Checks block identities, connection endpoints and ports against the
//! catalog, and detects cycles with Kahn's algorithm. The engine runs the
//! fatal subset of these checks before dispatching anything.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::catalog::{BlockCatalog, PortDirection};
use crate::error::{PipelineError, Result};
use crate::graph::Pipeline;
use crate::types::NodeId;

/// Validation error with location context
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Two nodes share an id
    DuplicateNodeId { node_id: NodeId },
    /// A node references a block that is not in the catalog
    UnknownBlock { node_id: NodeId, block_id: String },
    /// A connection references a node that does not exist
    DanglingConnection {
        connection_id: String,
        node_id: NodeId,
    },
    /// A connection uses a port its block does not declare
    UndeclaredPort {
        connection_id: String,
        node_id: NodeId,
        port: String,
    },
    /// A connection starts and ends on the same node
    SelfLoop { connection_id: String },
    /// Nodes on or behind a dependency cycle
    CycleDetected { nodes: Vec<NodeId> },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateNodeId { node_id } => write!(f, "Node id '{}' is used twice", node_id),
            Self::UnknownBlock { node_id, block_id } => {
                write!(f, "Unknown block '{}' on node '{}'", block_id, node_id)
            }
            Self::DanglingConnection {
                connection_id,
                node_id,
            } => write!(
                f,
                "Connection '{}' references unknown node '{}'",
                connection_id, node_id
            ),
            Self::UndeclaredPort {
                connection_id,
                node_id,
                port,
            } => write!(
                f,
                "Connection '{}' uses undeclared port '{}' on node '{}'",
                connection_id, port, node_id
            ),
            Self::SelfLoop { connection_id } => {
                write!(f, "Connection '{}' loops back to its own node", connection_id)
            }
            Self::CycleDetected { nodes } => {
                write!(f, "Cycle detected between nodes: {}", nodes.join(", "))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::UnknownBlock { node_id, block_id } => {
                PipelineError::UnknownBlock { node_id, block_id }
            }
            ValidationError::DanglingConnection {
                connection_id,
                node_id,
            } => PipelineError::DanglingConnection {
                connection_id,
                node_id,
            },
            ValidationError::CycleDetected { nodes } => PipelineError::CycleDetected(nodes),
            other => PipelineError::Validation(other.to_string()),
        }
    }
}

/// Validate a pipeline
///
/// Returns all validation errors found (not just the first).
pub fn validate_pipeline(pipeline: &Pipeline, catalog: &BlockCatalog) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_node_ids(pipeline, &mut errors);
    validate_blocks(pipeline, catalog, &mut errors);
    validate_connections(pipeline, catalog, &mut errors);
    if let Err(nodes) = topological_order(pipeline) {
        errors.push(ValidationError::CycleDetected { nodes });
    }

    errors
}

/// Checks that must pass before a run may dispatch anything
///
/// Runs the same checks as [`validate_pipeline`] and fails on the first
/// error found.
pub fn preflight(pipeline: &Pipeline, catalog: &BlockCatalog) -> Result<()> {
    let mut errors = Vec::new();
    validate_node_ids(pipeline, &mut errors);
    validate_blocks(pipeline, catalog, &mut errors);
    validate_connections(pipeline, catalog, &mut errors);
    if let Some(first) = errors.into_iter().next() {
        return Err(first.into());
    }
    topological_order(pipeline)
        .map(|_| ())
        .map_err(PipelineError::CycleDetected)
}

/// Kahn's algorithm over node indices
///
/// Ties are broken by definition order. On a cycle, returns the ids of the
/// nodes that could not be ordered. Connections to unknown nodes are ignored.
pub fn topological_order(pipeline: &Pipeline) -> std::result::Result<Vec<usize>, Vec<NodeId>> {
    let index: HashMap<&str, usize> = pipeline
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut in_degree = vec![0usize; pipeline.nodes.len()];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); pipeline.nodes.len()];
    for conn in &pipeline.connections {
        if let (Some(&from), Some(&to)) = (
            index.get(conn.source.node_id.as_str()),
            index.get(conn.target.node_id.as_str()),
        ) {
            adjacency[from].push(to);
            in_degree[to] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..pipeline.nodes.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(pipeline.nodes.len());

    while let Some(current) = queue.pop_front() {
        order.push(current);
        for &next in &adjacency[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() == pipeline.nodes.len() {
        Ok(order)
    } else {
        Err(pipeline
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, n)| n.id.clone())
            .collect())
    }
}

fn validate_node_ids(pipeline: &Pipeline, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for node in &pipeline.nodes {
        if !seen.insert(node.id.as_str()) {
            errors.push(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }
}

fn validate_blocks(pipeline: &Pipeline, catalog: &BlockCatalog, errors: &mut Vec<ValidationError>) {
    for node in &pipeline.nodes {
        if !catalog.contains(&node.block_id) {
            errors.push(ValidationError::UnknownBlock {
                node_id: node.id.clone(),
                block_id: node.block_id.clone(),
            });
        }
    }
}

fn validate_endpoints(pipeline: &Pipeline, errors: &mut Vec<ValidationError>) {
    let node_ids: HashSet<&str> = pipeline.nodes.iter().map(|n| n.id.as_str()).collect();
    for conn in &pipeline.connections {
        for end in [&conn.source, &conn.target] {
            if !node_ids.contains(end.node_id.as_str()) {
                errors.push(ValidationError::DanglingConnection {
                    connection_id: conn.id.clone(),
                    node_id: end.node_id.clone(),
                });
            }
        }
    }
}

fn validate_connections(
    pipeline: &Pipeline,
    catalog: &BlockCatalog,
    errors: &mut Vec<ValidationError>,
) {
    validate_endpoints(pipeline, errors);

    for conn in &pipeline.connections {
        if conn.source.node_id == conn.target.node_id {
            errors.push(ValidationError::SelfLoop {
                connection_id: conn.id.clone(),
            });
        }
        for (end, direction) in [
            (&conn.source, PortDirection::Output),
            (&conn.target, PortDirection::Input),
        ] {
            let Some(node) = pipeline.find_node(&end.node_id) else {
                continue;
            };
            let Some(def) = catalog.get(&node.block_id) else {
                continue;
            };
            if !def.has_port(&end.port, direction) {
                errors.push(ValidationError::UndeclaredPort {
                    connection_id: conn.id.clone(),
                    node_id: end.node_id.clone(),
                    port: end.port.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Connection, Node, PortRef, Position};

    fn node(id: &str, block_id: &str) -> Node {
        Node::new(id, block_id, Position::default())
    }

    fn conn(id: &str, from: (&str, &str), to: (&str, &str)) -> Connection {
        Connection {
            id: id.to_string(),
            source: PortRef::new(from.0, from.1),
            target: PortRef::new(to.0, to.1),
        }
    }

    #[test]
    fn test_valid_chain() {
        let catalog = BlockCatalog::builtin();
        let pipeline = Pipeline {
            name: "chain".to_string(),
            nodes: vec![node("w", "script_writer"), node("c", "caption_writer")],
            connections: vec![conn("c1", ("w", "script"), ("c", "script_in"))],
        };
        assert!(validate_pipeline(&pipeline, &catalog).is_empty());
        assert!(preflight(&pipeline, &catalog).is_ok());
    }

    #[test]
    fn test_topological_order_respects_edges() {
        // Defined downstream-first
        let pipeline = Pipeline {
            name: "reverse".to_string(),
            nodes: vec![node("c", "caption_writer"), node("w", "script_writer")],
            connections: vec![conn("c1", ("w", "script"), ("c", "script_in"))],
        };
        assert_eq!(topological_order(&pipeline).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_cycle_detected() {
        let catalog = BlockCatalog::builtin();
        let pipeline = Pipeline {
            name: "loop".to_string(),
            nodes: vec![
                node("a", "persona_filter"),
                node("b", "persona_filter"),
                node("root", "script_writer"),
            ],
            connections: vec![
                conn("c1", ("a", "text_out"), ("b", "text_in")),
                conn("c2", ("b", "text_out"), ("a", "text_in")),
            ],
        };
        let errors = validate_pipeline(&pipeline, &catalog);
        assert_eq!(
            errors,
            vec![ValidationError::CycleDetected {
                nodes: vec!["a".to_string(), "b".to_string()]
            }]
        );
        let err = preflight(&pipeline, &catalog).unwrap_err();
        assert!(matches!(err, PipelineError::CycleDetected(ref nodes) if nodes.len() == 2));
    }

    #[test]
    fn test_collects_all_errors() {
        let catalog = BlockCatalog::builtin();
        let pipeline = Pipeline {
            name: "broken".to_string(),
            nodes: vec![
                node("x", "teleporter"),
                node("w", "script_writer"),
                node("w", "script_writer"),
            ],
            connections: vec![
                conn("c1", ("w", "script"), ("ghost", "text_in")),
                conn("c2", ("w", "nope"), ("w", "product_data")),
            ],
        };
        let errors = validate_pipeline(&pipeline, &catalog);
        assert!(errors.contains(&ValidationError::DuplicateNodeId {
            node_id: "w".to_string()
        }));
        assert!(errors.contains(&ValidationError::UnknownBlock {
            node_id: "x".to_string(),
            block_id: "teleporter".to_string()
        }));
        assert!(errors.contains(&ValidationError::DanglingConnection {
            connection_id: "c1".to_string(),
            node_id: "ghost".to_string()
        }));
        assert!(errors.contains(&ValidationError::SelfLoop {
            connection_id: "c2".to_string()
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UndeclaredPort { port, .. } if port == "nope")));
    }

    #[test]
    fn test_preflight_reports_unknown_block_first() {
        let catalog = BlockCatalog::builtin();
        let pipeline = Pipeline {
            name: "unknown".to_string(),
            nodes: vec![node("x", "teleporter")],
            connections: vec![],
        };
        let err = preflight(&pipeline, &catalog).unwrap_err();
        assert!(err.is_malformed_graph());
        assert!(matches!(err, PipelineError::UnknownBlock { .. }));
    }

    #[test]
    fn test_preflight_rejects_duplicate_ids() {
        let catalog = BlockCatalog::builtin();
        let pipeline = Pipeline {
            name: "twins".to_string(),
            nodes: vec![node("a", "script_writer"), node("a", "caption_writer")],
            connections: vec![],
        };
        let err = preflight(&pipeline, &catalog).unwrap_err();
        assert!(err.is_malformed_graph());
        assert!(err.to_string().contains("Node id 'a' is used twice"));
    }

    #[test]
    fn test_preflight_rejects_undeclared_port() {
        let catalog = BlockCatalog::builtin();
        let pipeline = Pipeline {
            name: "ports".to_string(),
            nodes: vec![node("w", "script_writer"), node("c", "caption_writer")],
            connections: vec![conn("c1", ("w", "hooks"), ("c", "script_in"))],
        };
        let err = preflight(&pipeline, &catalog).unwrap_err();
        assert!(err.is_malformed_graph());
        assert!(matches!(err, PipelineError::Validation(ref msg) if msg.contains("'hooks'")));
    }
}
