use std::collections::BTreeMap;
use std::fmt;

use crate::error::EditorError;

/// Width of one content character in world units at scale 1.0.
pub const CHAR_WIDTH: f64 = 8.0;
/// Height of one content line in world units at scale 1.0.
pub const LINE_HEIGHT: f64 = 16.0;
/// Inner padding around the content of a node box.
pub const NODE_PADDING: f64 = 4.0;

/// Stable identity of a node within one editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `r,g,b` or `#rrggbb`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return None;
            }
            let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).ok();
            return Some(Self::new(channel(0)?, channel(2)?, channel(4)?));
        }
        let mut parts = text.split(',').map(|p| p.trim().parse::<u8>());
        let rgb = Self::new(
            parts.next()?.ok()?,
            parts.next()?.ok()?,
            parts.next()?.ok()?,
        );
        if parts.next().is_some() {
            return None;
        }
        Some(rgb)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A point in world coordinates. `y` grows downward, like the screen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

/// A mind-map node. Parentage is not stored here; it is derived from edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Top-left corner of the node box.
    pub pos: Point,
    pub scale: f64,
    pub text_color: Rgb,
    pub background: Rgb,
    pub content: String,
    pub active: bool,
    incidence: Vec<EdgeId>,
}

impl Node {
    fn new(id: NodeId, content: String) -> Self {
        Self {
            id,
            pos: Point::default(),
            scale: 1.0,
            text_color: Rgb::BLACK,
            background: Rgb::WHITE,
            content,
            active: false,
            incidence: Vec::new(),
        }
    }

    pub fn size(&self) -> Size {
        content_size(&self.content, self.scale)
    }

    pub fn center(&self) -> Point {
        let size = self.size();
        self.pos.offset(size.w / 2.0, size.h / 2.0)
    }

    pub fn contains(&self, point: Point) -> bool {
        let size = self.size();
        point.x >= self.pos.x
            && point.x <= self.pos.x + size.w
            && point.y >= self.pos.y
            && point.y <= self.pos.y + size.h
    }
}

/// Box size of a node holding `content` at `scale`.
///
/// Empty content still occupies one character cell so a fresh node stays
/// visible and clickable.
pub fn content_size(content: &str, scale: f64) -> Size {
    let columns = content
        .lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
        .max(1);
    let rows = content.lines().count().max(1) + usize::from(content.ends_with('\n'));
    Size {
        w: (columns as f64 * CHAR_WIDTH + 2.0 * NODE_PADDING) * scale,
        h: (rows as f64 * LINE_HEIGHT + 2.0 * NODE_PADDING) * scale,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub destination: NodeId,
    pub color: Rgb,
    pub width: f64,
    /// An additional association into a node that already has a tree parent.
    pub secondary: bool,
}

impl Edge {
    /// True when the edge joins `a` and `b` in either orientation.
    pub fn joins(&self, a: NodeId, b: NodeId) -> bool {
        (self.source == a && self.destination == b) || (self.source == b && self.destination == a)
    }

    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.destination)
        } else if self.destination == node {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Attributes of an edge read back from a saved document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub destination: NodeId,
    pub color: Rgb,
    pub width: f64,
    pub secondary: bool,
}

/// The mind map: an ordered node list plus an edge arena.
///
/// Node order is creation order. It is what hint numbers and saved edge
/// endpoints refer to, so it is never reshuffled.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: BTreeMap<EdgeId, Edge>,
    root: Option<NodeId>,
    active: Option<NodeId>,
    next_node: usize,
    next_edge: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Position of `id` in the node list.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        self.nodes.get(index).map(|n| n.id)
    }

    /// Allocate a node with default attributes. The first node ever created
    /// in a document becomes the root.
    pub fn create_node(&mut self, content: impl Into<String>) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.push(Node::new(id, content.into()));
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Remove a node and every edge touching it.
    pub fn delete_node(&mut self, id: NodeId) -> Result<(), EditorError> {
        self.delete_nodes(&[id])
    }

    /// Remove several nodes at once. Nothing is removed unless every id is
    /// known and none of them is the root.
    pub fn delete_nodes(&mut self, ids: &[NodeId]) -> Result<(), EditorError> {
        for &id in ids {
            if Some(id) == self.root {
                return Err(EditorError::RootNodeProtected);
            }
            if !self.contains(id) {
                return Err(EditorError::UnknownNode(id));
            }
        }
        for &id in ids {
            let Some(idx) = self.index_of(id) else {
                continue;
            };
            let incidence = self.nodes[idx].incidence.clone();
            for edge_id in incidence {
                self.detach_edge(edge_id);
            }
            self.nodes.remove(idx);
            if self.active == Some(id) {
                self.active = None;
            }
        }
        Ok(())
    }

    /// Connect `source` to `destination`.
    ///
    /// The new edge is secondary when `destination` already has a tree
    /// parent. It takes the destination's background colour and a width
    /// derived from the destination's scale.
    pub fn add_edge(&mut self, source: NodeId, destination: NodeId) -> Result<EdgeId, EditorError> {
        self.check_new_edge(source, destination)?;
        let secondary = self.primary_parent(destination).is_some();
        let (color, width) = match self.node(destination) {
            Some(dst) => (dst.background, dst.scale * 2.0 + 1.0),
            None => return Err(EditorError::UnknownNode(destination)),
        };
        Ok(self.attach_edge(source, destination, color, width, secondary))
    }

    /// Re-create an edge read from a saved document.
    ///
    /// A stored secondary flag is kept as is; a stored primary edge into a
    /// node that already has a tree parent is demoted to secondary so the
    /// tree shape stays a forest.
    pub fn restore_edge(&mut self, record: EdgeRecord) -> Result<EdgeId, EditorError> {
        self.check_new_edge(record.source, record.destination)?;
        let has_parent = self.primary_parent(record.destination).is_some();
        if has_parent && !record.secondary {
            tracing::warn!(
                destination = %record.destination,
                "stored edge into a node that already has a parent; marking it secondary"
            );
        }
        Ok(self.attach_edge(
            record.source,
            record.destination,
            record.color,
            record.width,
            record.secondary || has_parent,
        ))
    }

    /// Remove the first edge joining `a` and `b`, whatever its orientation.
    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<(), EditorError> {
        let node = self.node(a).ok_or(EditorError::UnknownNode(a))?;
        let found = node
            .incidence
            .iter()
            .copied()
            .find(|edge_id| self.edges.get(edge_id).is_some_and(|e| e.joins(a, b)));
        match found {
            Some(edge_id) => {
                self.detach_edge(edge_id);
                Ok(())
            }
            None => Err(EditorError::NoSuchEdge),
        }
    }

    /// True when an edge joins `a` and `b` in either orientation.
    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.node(a).is_some_and(|node| {
            node.incidence
                .iter()
                .any(|edge_id| self.edges.get(edge_id).is_some_and(|e| e.joins(a, b)))
        })
    }

    /// Edges leaving `node`. With `include_secondary == false` only the
    /// tree edges are returned.
    pub fn incident_edges(&self, node: NodeId, include_secondary: bool) -> Vec<&Edge> {
        self.edges_at(node)
            .into_iter()
            .filter(|e| e.source == node && (include_secondary || !e.secondary))
            .collect()
    }

    /// Edges arriving at `node`.
    pub fn incoming_edges(&self, node: NodeId, include_secondary: bool) -> Vec<&Edge> {
        self.edges_at(node)
            .into_iter()
            .filter(|e| e.destination == node && (include_secondary || !e.secondary))
            .collect()
    }

    /// Every edge touching `node`, in attachment order.
    pub fn edges_at(&self, node: NodeId) -> Vec<&Edge> {
        self.node(node)
            .map(|n| {
                n.incidence
                    .iter()
                    .filter_map(|edge_id| self.edges.get(edge_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All edges, grouped by source in node-list order. Secondary edges are
    /// included. This is the enumeration renderers and the writer use.
    pub fn all_edges(&self) -> Vec<&Edge> {
        self.nodes
            .iter()
            .flat_map(|n| self.incident_edges(n.id, true))
            .collect()
    }

    /// The source of the tree edge into `node`, if any.
    pub fn primary_parent(&self, node: NodeId) -> Option<NodeId> {
        self.incoming_edges(node, false).first().map(|e| e.source)
    }

    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    /// Make `id` the active node, clearing the flag on the previous holder.
    pub fn set_active(&mut self, id: Option<NodeId>) -> Result<(), EditorError> {
        if let Some(id) = id
            && !self.contains(id)
        {
            return Err(EditorError::UnknownNode(id));
        }
        for node in &mut self.nodes {
            node.active = Some(node.id) == id;
        }
        self.active = id;
        Ok(())
    }

    /// Make the first node in list order active. Returns it, or `None` for
    /// an empty graph.
    pub fn activate_first(&mut self) -> Option<NodeId> {
        let first = self.node_at(0)?;
        for node in &mut self.nodes {
            node.active = node.id == first;
        }
        self.active = Some(first);
        Some(first)
    }

    /// Recolour every edge arriving at `node`, secondaries included.
    pub fn paint_incoming_edges(&mut self, node: NodeId, color: Rgb) {
        for edge in self.edges.values_mut() {
            if edge.destination == node {
                edge.color = color;
            }
        }
    }

    /// Drop every node and edge. The next created node becomes the root.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn check_new_edge(&self, source: NodeId, destination: NodeId) -> Result<(), EditorError> {
        if !self.contains(source) {
            return Err(EditorError::UnknownNode(source));
        }
        if !self.contains(destination) {
            return Err(EditorError::UnknownNode(destination));
        }
        if Some(destination) == self.root {
            return Err(EditorError::TargetIsRoot);
        }
        if source == destination {
            return Err(EditorError::SelfLoop);
        }
        if self.is_connected(source, destination) {
            return Err(EditorError::EdgeAlreadyExists);
        }
        Ok(())
    }

    fn attach_edge(
        &mut self,
        source: NodeId,
        destination: NodeId,
        color: Rgb,
        width: f64,
        secondary: bool,
    ) -> EdgeId {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(
            id,
            Edge {
                id,
                source,
                destination,
                color,
                width,
                secondary,
            },
        );
        for end in [source, destination] {
            if let Some(node) = self.node_mut(end) {
                node.incidence.push(id);
            }
        }
        id
    }

    fn detach_edge(&mut self, id: EdgeId) {
        let Some(edge) = self.edges.remove(&id) else {
            return;
        };
        for end in [edge.source, edge.destination] {
            if let Some(node) = self.node_mut(end) {
                node.incidence.retain(|e| *e != id);
            }
        }
    }
}
