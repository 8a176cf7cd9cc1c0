//! Pipeline graph model
//!
//! A `Pipeline` owns its nodes and connections in insertion order. Every
//! mutation here is synchronous and total: it either applies completely or
//! returns a `GraphEditError` and leaves the graph untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{BlockCatalog, PortDirection};
use crate::types::{Connection, ConnectionId, FieldValue, Node, NodeId, PortRef, Position};

/// Errors raised by graph edits
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphEditError {
    #[error("Node '{0}' not found")]
    UnknownNode(NodeId),

    #[error("Block '{0}' is not in the catalog")]
    UnknownBlock(String),

    #[error("Block '{block_id}' has no {direction:?} port '{port}'")]
    UndeclaredPort {
        block_id: String,
        port: String,
        direction: PortDirection,
    },

    #[error("Block '{block_id}' has no field '{key}'")]
    UnknownField { block_id: String, key: String },

    #[error("Node '{0}' cannot be connected to itself")]
    SelfLoop(NodeId),

    #[error("Connection '{0}' not found")]
    UnknownConnection(ConnectionId),
}

/// A named graph of nodes and connections
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn find_node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn find_node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == node_id)
    }

    pub fn find_connection(&self, connection_id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == connection_id)
    }

    /// Connections ending at the node, in connection order
    pub fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.target.node_id == node_id)
    }

    /// Connections starting at the node, in connection order
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| c.source.node_id == node_id)
    }

    /// Nodes with no incoming connection, in definition order
    pub fn roots(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| !self.connections.iter().any(|c| c.target.node_id == n.id))
            .collect()
    }

    /// Advisory cost of one run: sum of each node's lower-bound block cost
    ///
    /// Nodes whose block is not in the catalog count as free.
    pub fn estimated_cost(&self, catalog: &BlockCatalog) -> f64 {
        self.nodes
            .iter()
            .filter_map(|n| catalog.get(&n.block_id))
            .map(|def| def.estimated_cost())
            .sum()
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Place a new idle node with an empty config
    pub fn add_node(
        &mut self,
        catalog: &BlockCatalog,
        block_id: &str,
        position: Position,
    ) -> Result<NodeId, GraphEditError> {
        if !catalog.contains(block_id) {
            return Err(GraphEditError::UnknownBlock(block_id.to_string()));
        }
        let id = format!("node_{}", uuid::Uuid::new_v4().simple());
        self.nodes.push(Node::new(id.clone(), block_id, position));
        Ok(id)
    }

    pub fn move_node(&mut self, node_id: &str, position: Position) -> Result<(), GraphEditError> {
        let node = self
            .find_node_mut(node_id)
            .ok_or_else(|| GraphEditError::UnknownNode(node_id.to_string()))?;
        node.position = position;
        Ok(())
    }

    /// Remove a node and every connection touching it
    pub fn delete_node(&mut self, node_id: &str) -> Result<Node, GraphEditError> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == node_id)
            .ok_or_else(|| GraphEditError::UnknownNode(node_id.to_string()))?;
        let node = self.nodes.remove(index);
        let before = self.connections.len();
        self.connections.retain(|c| !c.touches(node_id));
        log::debug!(
            "Deleted node '{}' and {} connection(s)",
            node_id,
            before - self.connections.len()
        );
        Ok(node)
    }

    /// Set a configuration field declared by the node's block
    pub fn set_field(
        &mut self,
        catalog: &BlockCatalog,
        node_id: &str,
        key: &str,
        value: FieldValue,
    ) -> Result<(), GraphEditError> {
        let node = self
            .find_node_mut(node_id)
            .ok_or_else(|| GraphEditError::UnknownNode(node_id.to_string()))?;
        let def = catalog
            .get(&node.block_id)
            .ok_or_else(|| GraphEditError::UnknownBlock(node.block_id.clone()))?;
        if def.field(key).is_none() {
            return Err(GraphEditError::UnknownField {
                block_id: node.block_id.clone(),
                key: key.to_string(),
            });
        }
        node.config.set(key, value);
        Ok(())
    }

    /// Remove a configuration field; returns the previous value
    pub fn clear_field(
        &mut self,
        node_id: &str,
        key: &str,
    ) -> Result<Option<FieldValue>, GraphEditError> {
        let node = self
            .find_node_mut(node_id)
            .ok_or_else(|| GraphEditError::UnknownNode(node_id.to_string()))?;
        Ok(node.config.remove(key))
    }

    /// Wire an output port to an input port
    ///
    /// Connecting the same pair twice is a no-op that returns the existing
    /// connection's id.
    pub fn add_connection(
        &mut self,
        catalog: &BlockCatalog,
        source: PortRef,
        target: PortRef,
    ) -> Result<ConnectionId, GraphEditError> {
        if source.node_id == target.node_id {
            return Err(GraphEditError::SelfLoop(source.node_id));
        }
        self.check_port(catalog, &source, PortDirection::Output)?;
        self.check_port(catalog, &target, PortDirection::Input)?;

        if let Some(existing) = self
            .connections
            .iter()
            .find(|c| c.source == source && c.target == target)
        {
            return Ok(existing.id.clone());
        }

        let id = format!("conn_{}", uuid::Uuid::new_v4().simple());
        self.connections.push(Connection {
            id: id.clone(),
            source,
            target,
        });
        Ok(id)
    }

    pub fn delete_connection(&mut self, connection_id: &str) -> Result<Connection, GraphEditError> {
        let index = self
            .connections
            .iter()
            .position(|c| c.id == connection_id)
            .ok_or_else(|| GraphEditError::UnknownConnection(connection_id.to_string()))?;
        Ok(self.connections.remove(index))
    }

    fn check_port(
        &self,
        catalog: &BlockCatalog,
        port: &PortRef,
        direction: PortDirection,
    ) -> Result<(), GraphEditError> {
        let node = self
            .find_node(&port.node_id)
            .ok_or_else(|| GraphEditError::UnknownNode(port.node_id.clone()))?;
        let def = catalog
            .get(&node.block_id)
            .ok_or_else(|| GraphEditError::UnknownBlock(node.block_id.clone()))?;
        if !def.has_port(&port.port, direction) {
            return Err(GraphEditError::UndeclaredPort {
                block_id: node.block_id.clone(),
                port: port.port.clone(),
                direction,
            });
        }
        Ok(())
    }

    /// Return every node to idle and drop previews from the last run
    pub(crate) fn reset_run_state(&mut self) {
        for node in &mut self.nodes {
            node.status = Default::default();
            node.output = None;
        }
    }
}
