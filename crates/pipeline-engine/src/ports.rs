//! Port anchor geometry
//!
//! Canvas coordinates of a node's ports, used to draw wires. Inputs sit on
//! the left edge, outputs on the right edge, stacked below the header.

use serde::{Deserialize, Serialize};

use crate::catalog::{BlockCatalog, BlockDefinition, PortDirection};
use crate::graph::Pipeline;
use crate::types::{Connection, Position};

/// Rendered node width
pub const NODE_WIDTH: f64 = 280.0;
/// Height of the node header above the first port
pub const HEADER_HEIGHT: f64 = 40.0;
/// Gap between the header and the first port
pub const PORT_PADDING: f64 = 8.0;
/// Vertical distance between consecutive ports
pub const PORT_SPACING: f64 = 22.0;

/// A point on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Anchor point of a port, or `None` if the block has no such port
pub fn port_anchor(
    position: Position,
    block: &BlockDefinition,
    port: &str,
    direction: PortDirection,
) -> Option<Point> {
    let index = block.port_index(port, direction)?;
    let x = match direction {
        PortDirection::Input => position.x,
        PortDirection::Output => position.x + NODE_WIDTH,
    };
    Some(Point {
        x,
        y: position.y + HEADER_HEIGHT + PORT_PADDING + index as f64 * PORT_SPACING,
    })
}

/// Start and end of a connection's wire
pub fn wire_endpoints(
    pipeline: &Pipeline,
    catalog: &BlockCatalog,
    connection: &Connection,
) -> Option<(Point, Point)> {
    let anchor = |node_id: &str, port: &str, direction| {
        let node = pipeline.find_node(node_id)?;
        let block = catalog.get(&node.block_id)?;
        port_anchor(node.position, block, port, direction)
    };
    let from = anchor(&connection.source.node_id, &connection.source.port, PortDirection::Output)?;
    let to = anchor(&connection.target.node_id, &connection.target.port, PortDirection::Input)?;
    Some((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PortRef;

    #[test]
    fn test_anchor_positions() {
        let catalog = BlockCatalog::builtin();
        let video = catalog.get("video_generator").unwrap();
        let pos = Position::new(100.0, 50.0);

        let first = port_anchor(pos, video, "first_frame", PortDirection::Input).unwrap();
        assert_eq!(first, Point { x: 100.0, y: 98.0 });

        let prompt = port_anchor(pos, video, "prompt", PortDirection::Input).unwrap();
        assert_eq!(prompt, Point { x: 100.0, y: 142.0 });

        let thumb = port_anchor(pos, video, "thumbnail", PortDirection::Output).unwrap();
        assert_eq!(thumb, Point { x: 380.0, y: 120.0 });
    }

    #[test]
    fn test_unknown_port() {
        let catalog = BlockCatalog::builtin();
        let video = catalog.get("video_generator").unwrap();
        assert!(port_anchor(Position::default(), video, "video", PortDirection::Input).is_none());
        assert!(
            port_anchor(Position::default(), video, "missing", PortDirection::Output).is_none()
        );
    }

    #[test]
    fn test_wire_endpoints() {
        let catalog = BlockCatalog::builtin();
        let mut pipeline = Pipeline::new("wires");
        let writer = pipeline
            .add_node(&catalog, "script_writer", Position::new(0.0, 0.0))
            .unwrap();
        let video = pipeline
            .add_node(&catalog, "video_generator", Position::new(400.0, 100.0))
            .unwrap();
        let id = pipeline
            .add_connection(
                &catalog,
                PortRef::new(&writer, "prompt"),
                PortRef::new(&video, "prompt"),
            )
            .unwrap();

        let conn = pipeline.find_connection(&id).unwrap();
        let (from, to) = wire_endpoints(&pipeline, &catalog, conn).unwrap();
        assert_eq!(from, Point { x: 280.0, y: 70.0 });
        assert_eq!(to, Point { x: 400.0, y: 192.0 });
    }
}
