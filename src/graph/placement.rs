//! Angular placement of new child nodes.
//!
//! A new child goes into the widest angular gap between the edges already
//! leaving its parent, at a fixed distance from the parent's centre. Angles
//! are measured counter-clockwise from east as seen on screen, so the `y`
//! axis (which grows downward in world coordinates) is flipped.

use std::f64::consts::{PI, TAU};

use crate::error::EditorError;
use crate::graph::model::{Graph, NodeId, Point, Rgb, Size, content_size};

/// Direction used for the first child of a node: straight down.
pub const SOUTH: f64 = 1.5 * PI;

/// Angle of the vector `from -> to`, in `[0, 2π)`.
pub fn direction(from: Point, to: Point) -> f64 {
    (from.y - to.y).atan2(to.x - from.x).rem_euclid(TAU)
}

/// The direction in which a new child of `node` should be placed.
pub fn biggest_angle_at(graph: &Graph, node: NodeId) -> Result<f64, EditorError> {
    let origin = graph
        .node(node)
        .ok_or(EditorError::UnknownNode(node))?
        .center();
    let angles = graph
        .edges_at(node)
        .into_iter()
        .filter_map(|edge| edge.other_end(node))
        .filter_map(|other| graph.node(other))
        .map(|other| direction(origin, other.center()))
        .collect();
    Ok(widest_gap_midpoint(angles))
}

/// Midpoint of the widest gap between `angles` (radians, any order).
///
/// The wrap-around gap from the largest angle back to the smallest is the
/// initial candidate; a later gap only wins when strictly wider.
pub fn widest_gap_midpoint(mut angles: Vec<f64>) -> f64 {
    match angles.len() {
        0 => SOUTH,
        1 => (angles[0] + PI).rem_euclid(TAU),
        _ => {
            angles.sort_by(f64::total_cmp);
            let first = angles[0];
            let last = angles[angles.len() - 1];
            let mut widest = TAU - last + first;
            let mut start = last;
            for pair in angles.windows(2) {
                let gap = pair[1] - pair[0];
                if gap > widest {
                    widest = gap;
                    start = pair[0];
                }
            }
            (start + widest / 2.0).rem_euclid(TAU)
        }
    }
}

/// Top-left position for a box of `size` whose centre lies `distance`
/// away from the centre of `parent`, in the parent's widest gap.
pub fn placement_for_child(
    graph: &Graph,
    parent: NodeId,
    size: Size,
    distance: f64,
) -> Result<Point, EditorError> {
    let angle = biggest_angle_at(graph, parent)?;
    let center = graph
        .node(parent)
        .ok_or(EditorError::UnknownNode(parent))?
        .center()
        .offset(distance * angle.cos(), -distance * angle.sin());
    Ok(center.offset(-size.w / 2.0, -size.h / 2.0))
}

/// Create a child of `parent` holding `content`, placed in the widest gap
/// and connected by a tree edge. The child inherits the parent's colours.
pub fn insert_child(
    graph: &mut Graph,
    parent: NodeId,
    content: &str,
    distance: f64,
) -> Result<NodeId, EditorError> {
    let (background, text_color): (Rgb, Rgb) = graph
        .node(parent)
        .map(|p| (p.background, p.text_color))
        .ok_or(EditorError::UnknownNode(parent))?;
    let pos = placement_for_child(graph, parent, content_size(content, 1.0), distance)?;
    let child = graph.create_node(content);
    if let Some(node) = graph.node_mut(child) {
        node.pos = pos;
        node.background = background;
        node.text_color = text_color;
    }
    graph.add_edge(parent, child)?;
    Ok(child)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn degrees(rad: f64) -> f64 {
        rad.to_degrees()
    }

    /// Put `id` so that its centre sits `distance` away from `around` at
    /// `angle_deg`.
    fn place_at(graph: &mut Graph, id: NodeId, around: Point, angle_deg: f64, distance: f64) {
        let a = angle_deg.to_radians();
        let center = around.offset(distance * a.cos(), -distance * a.sin());
        let size = graph.node(id).unwrap().size();
        graph.node_mut(id).unwrap().pos = center.offset(-size.w / 2.0, -size.h / 2.0);
    }

    #[test]
    fn no_edges_points_south() {
        let mut g = Graph::new();
        let root = g.create_node("root");
        assert!((biggest_angle_at(&g, root).unwrap() - SOUTH).abs() < EPS);
    }

    #[test]
    fn single_edge_points_the_other_way() {
        let mut g = Graph::new();
        let root = g.create_node("root");
        let child = g.create_node("child");
        g.add_edge(root, child).unwrap();
        let center = g.node(root).unwrap().center();
        place_at(&mut g, child, center, 0.0, 100.0);
        assert!((degrees(biggest_angle_at(&g, root).unwrap()) - 180.0).abs() < 1e-6);
        // Seen from the child, the parent lies west, so the answer is east.
        assert!(degrees(biggest_angle_at(&g, child).unwrap()).abs() < 1e-6);
    }

    #[test]
    fn picks_midpoint_of_widest_gap() {
        let angles = [0.0_f64, 90.0, 200.0].iter().map(|d| d.to_radians()).collect();
        assert!((degrees(widest_gap_midpoint(angles)) - 280.0).abs() < 1e-9);
    }

    #[test]
    fn widest_gap_between_neighbours() {
        let angles = [10.0_f64, 30.0, 300.0].iter().map(|d| d.to_radians()).collect();
        assert!((degrees(widest_gap_midpoint(angles)) - 165.0).abs() < 1e-9);
    }

    #[test]
    fn ties_keep_the_first_gap() {
        // Four evenly spaced edges: every gap is 90°, the wrap gap wins.
        let angles = [0.0_f64, 90.0, 180.0, 270.0].iter().map(|d| d.to_radians()).collect();
        assert!((degrees(widest_gap_midpoint(angles)) - 315.0).abs() < 1e-9);
    }

    #[test]
    fn graph_angles_count_edges_in_both_directions() {
        let mut g = Graph::new();
        let root = g.create_node("root");
        let hub = g.create_node("hub");
        let east = g.create_node("east");
        let north = g.create_node("north");
        let center = Point::new(500.0, 500.0);
        let size = g.node(hub).unwrap().size();
        g.node_mut(hub).unwrap().pos = center.offset(-size.w / 2.0, -size.h / 2.0);
        place_at(&mut g, root, center, 200.0, 120.0);
        place_at(&mut g, east, center, 0.0, 120.0);
        place_at(&mut g, north, center, 90.0, 120.0);
        g.add_edge(root, hub).unwrap();
        g.add_edge(hub, east).unwrap();
        g.add_edge(hub, north).unwrap();
        let angle = degrees(biggest_angle_at(&g, hub).unwrap());
        assert!((angle - 280.0).abs() < 1e-6, "got {angle}");
    }

    #[test]
    fn first_child_lands_below_its_parent() {
        let mut g = Graph::new();
        let root = g.create_node("root");
        let child = insert_child(&mut g, root, "", 100.0).unwrap();
        let parent_center = g.node(root).unwrap().center();
        let child_center = g.node(child).unwrap().center();
        assert!((child_center.x - parent_center.x).abs() < 1e-6);
        assert!((child_center.y - parent_center.y - 100.0).abs() < 1e-6);
        assert!(g.is_connected(root, child));
    }

    #[test]
    fn inserted_child_inherits_colours() {
        let mut g = Graph::new();
        let root = g.create_node("root");
        {
            let node = g.node_mut(root).unwrap();
            node.background = Rgb::new(1, 2, 3);
            node.text_color = Rgb::new(4, 5, 6);
        }
        let child = insert_child(&mut g, root, "x", 100.0).unwrap();
        let node = g.node(child).unwrap();
        assert_eq!(node.background, Rgb::new(1, 2, 3));
        assert_eq!(node.text_color, Rgb::new(4, 5, 6));
    }

    #[test]
    fn second_child_goes_opposite_the_first() {
        let mut g = Graph::new();
        let root = g.create_node("root");
        let first = insert_child(&mut g, root, "", 100.0).unwrap();
        let second = insert_child(&mut g, root, "", 100.0).unwrap();
        let center = g.node(root).unwrap().center();
        let a = degrees(direction(center, g.node(first).unwrap().center()));
        let b = degrees(direction(center, g.node(second).unwrap().center()));
        assert!((a - 270.0).abs() < 1e-6);
        assert!((b - 90.0).abs() < 1e-6);
    }
}
