//! The editing session: one open document plus the interaction modes
//! layered on top of it.
//!
//! Front-ends feed [`Command`]s into [`Controller::dispatch`] and act on the
//! returned [`Effect`]s. Refused commands never touch the document; their
//! error becomes a notification.

use std::mem;
use std::path::{Path, PathBuf};

use crate::editor::command::{Command, Direction, ScaleStep};
use crate::editor::hint::{HintOutcome, HintSelector};
use crate::error::EditorError;
use crate::graph::model::{Graph, NodeId, Point, Rgb};
use crate::graph::placement;
use crate::graph::subtree::Scope;
use crate::parser::config::Config;
use crate::parser::document;

pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 10.0;

/// The exclusive modes. Hint mode is tracked separately because it can
/// overlap an edge pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingOp {
    #[default]
    None,
    EditingText,
    AddingEdge,
    DeletingEdge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Notify(String),
    ContentChanged,
    Saved(PathBuf),
    Loaded,
    Quit,
}

/// Modal colour selection. `None` means the user backed out.
pub trait ColorPicker {
    fn pick(&mut self, title: &str, current: Rgb) -> Option<Rgb>;
}

/// What part of the world is on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// World point shown in the middle of the canvas.
    pub center: Point,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: Point::default(),
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Discard {
    Quit,
    Reload,
    NewDocument,
}

#[derive(Debug, Clone, Copy)]
enum Paint {
    Background,
    Text,
}

#[derive(Debug)]
pub struct Controller {
    graph: Graph,
    hints: HintSelector,
    pending: PendingOp,
    config: Config,
    view: Viewport,
    path: Option<PathBuf>,
    read_only: bool,
    dirty: bool,
    armed: Option<Discard>,
}

impl Controller {
    /// A blank, unnamed document.
    pub fn new(config: Config) -> Self {
        let graph = document::blank("", config.node_background, config.node_text);
        Self::with_graph(graph, config, None)
    }

    pub fn with_graph(graph: Graph, config: Config, path: Option<PathBuf>) -> Self {
        let mut controller = Self {
            graph,
            hints: HintSelector::new(),
            pending: PendingOp::None,
            config,
            view: Viewport::default(),
            path,
            read_only: false,
            dirty: false,
            armed: None,
        };
        controller.ensure_active();
        controller.center_view_on_active();
        controller
    }

    /// Open `path`, or start a blank document that will be written there on
    /// the first save.
    pub fn open(path: PathBuf, config: Config) -> Result<Self, EditorError> {
        if path.exists() {
            let graph = document::load(&path)?;
            return Ok(Self::with_graph(graph, config, Some(path)));
        }
        tracing::info!(path = %path.display(), "starting a new document");
        let mut controller = Self::new(config);
        controller.path = Some(path);
        Ok(controller)
    }

    /// Never write this document anywhere.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn hints(&self) -> &HintSelector {
        &self.hints
    }

    pub fn pending(&self) -> PendingOp {
        self.pending
    }

    pub fn view(&self) -> Viewport {
        self.view
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty && !self.read_only
    }

    pub fn is_editing_text(&self) -> bool {
        self.pending == PendingOp::EditingText
    }

    pub fn mode_label(&self) -> String {
        let base = match self.pending {
            PendingOp::None => "Normal",
            PendingOp::EditingText => "Editing text",
            PendingOp::AddingEdge => "Add edge",
            PendingOp::DeletingEdge => "Delete edge",
        };
        if self.hints.is_engaged() {
            format!("{base} | hint {}", self.hints.prefix())
        } else {
            base.to_string()
        }
    }

    /// Topmost node whose box contains `point`.
    pub fn node_under(&self, point: Point) -> Option<NodeId> {
        self.graph
            .nodes()
            .iter()
            .rev()
            .find(|node| node.contains(point))
            .map(|node| node.id)
    }

    pub fn center_view_on_active(&mut self) {
        if let Some(node) = self.graph.active().and_then(|id| self.graph.node(id)) {
            self.view.center = node.center();
        }
    }

    pub fn dispatch(&mut self, command: Command, picker: &mut dyn ColorPicker) -> Vec<Effect> {
        tracing::trace!(?command, mode = %self.mode_label(), "dispatch");
        let discard = match command {
            Command::Quit => Some(Discard::Quit),
            Command::Reload => Some(Discard::Reload),
            Command::NewDocument => Some(Discard::NewDocument),
            _ => None,
        };
        if discard != self.armed {
            self.armed = None;
        }

        let mut effects = Vec::new();
        if let Err(err) = self.apply(command, picker, &mut effects) {
            tracing::debug!(%err, "command refused");
            effects.push(Effect::Notify(err.to_string()));
        }
        if effects.contains(&Effect::ContentChanged) {
            self.dirty = true;
        }
        effects
    }

    fn apply(
        &mut self,
        command: Command,
        picker: &mut dyn ColorPicker,
        effects: &mut Vec<Effect>,
    ) -> Result<(), EditorError> {
        match command {
            Command::InsertChild => self.insert_child(effects),
            Command::Delete(scope) => self.delete(scope, effects),
            Command::EditText => self.begin_text_edit(effects),
            Command::RecolorBackground(scope) => {
                self.recolor(Paint::Background, scope, picker, effects)
            }
            Command::RecolorText(scope) => self.recolor(Paint::Text, scope, picker, effects),
            Command::BeginAddEdge => self.begin_edge_op(PendingOp::AddingEdge, effects),
            Command::BeginDeleteEdge => self.begin_edge_op(PendingOp::DeletingEdge, effects),
            Command::ToggleHint => {
                if self.pending == PendingOp::EditingText {
                    self.pending = PendingOp::None;
                    effects.push(Effect::Notify("Text editing finished.".to_string()));
                }
                self.hints.toggle(&self.graph);
                Ok(())
            }
            Command::HintDigit(digit) => match self.hints.push_digit(digit) {
                HintOutcome::Committed(node) => self.pick(node, effects),
                HintOutcome::NoMatch => Err(EditorError::HintNoMatch),
                HintOutcome::Ignored | HintOutcome::Narrowed | HintOutcome::Widened => Ok(()),
            },
            Command::HintBackspace => {
                self.hints.backspace();
                Ok(())
            }
            Command::CommitHint => match self.hints.commit() {
                Some(node) => self.pick(node, effects),
                None => Ok(()),
            },
            Command::Cancel => {
                self.cancel(effects);
                Ok(())
            }
            Command::Move(direction, scope) => {
                let (dx, dy) = direction.delta();
                let step = self.config.move_step;
                self.translate(dx * step, dy * step, scope, effects)
            }
            Command::Scale(step, scope) => self.scale(step, scope, effects),
            Command::Pan(direction) => {
                self.pan(direction);
                Ok(())
            }
            Command::Drag { dx, dy, scope } => self.translate(dx, dy, scope, effects),
            Command::Pick(node) => {
                if !self.graph.contains(node) {
                    return Err(EditorError::UnknownNode(node));
                }
                self.hints.cancel();
                self.pick(node, effects)
            }
            Command::TextInput(ch) => self.edit_text(
                |content| {
                    content.push(ch);
                    true
                },
                effects,
            ),
            Command::TextBackspace => self.edit_text(|content| content.pop().is_some(), effects),
            Command::ZoomView(step) => {
                let zoom = self.view.zoom * step.factor(self.config.scale_factor);
                if (MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
                    self.view.zoom = zoom;
                }
                Ok(())
            }
            Command::Save => self.save(effects),
            Command::Reload => self.reload(effects),
            Command::NewDocument => {
                self.new_document(effects);
                Ok(())
            }
            Command::Quit => {
                if self.confirm_discard(Discard::Quit, effects) {
                    effects.push(Effect::Quit);
                }
                Ok(())
            }
            Command::Noop => Ok(()),
        }
    }

    fn require_active(&self) -> Result<NodeId, EditorError> {
        self.graph.active().ok_or(EditorError::NoActiveNode)
    }

    fn ensure_active(&mut self) {
        if self.graph.active().is_none() {
            self.graph.activate_first();
        }
    }

    fn insert_child(&mut self, effects: &mut Vec<Effect>) -> Result<(), EditorError> {
        let parent = self.require_active()?;
        self.hints.cancel();
        let child = placement::insert_child(
            &mut self.graph,
            parent,
            "",
            self.config.placement_distance,
        )?;
        self.graph.set_active(Some(child))?;
        self.pending = PendingOp::EditingText;
        tracing::debug!(%parent, %child, "inserted child");
        effects.push(Effect::ContentChanged);
        Ok(())
    }

    fn delete(&mut self, scope: Scope, effects: &mut Vec<Effect>) -> Result<(), EditorError> {
        let active = self.require_active()?;
        if Some(active) == self.graph.root() {
            return Err(EditorError::RootNodeProtected);
        }
        let targets = scope.resolve(&self.graph, active);
        match scope {
            Scope::Single => self.graph.delete_node(active)?,
            Scope::Subtree => self.graph.delete_nodes(&targets)?,
        }
        for &node in &targets {
            self.hints.forget(node);
        }
        self.hints.refresh(&self.graph);
        self.pending = PendingOp::None;
        tracing::debug!(count = targets.len(), ?scope, "deleted nodes");
        effects.push(Effect::ContentChanged);
        Ok(())
    }

    fn begin_text_edit(&mut self, effects: &mut Vec<Effect>) -> Result<(), EditorError> {
        if self.hints.is_engaged() {
            effects.push(Effect::Notify(
                "Leave hint mode before editing text.".to_string(),
            ));
            return Ok(());
        }
        self.require_active()?;
        self.pending = PendingOp::EditingText;
        Ok(())
    }

    fn edit_text(
        &mut self,
        edit: impl FnOnce(&mut String) -> bool,
        effects: &mut Vec<Effect>,
    ) -> Result<(), EditorError> {
        if self.pending != PendingOp::EditingText {
            return Ok(());
        }
        let Some(active) = self.graph.active() else {
            self.pending = PendingOp::None;
            return Err(EditorError::NoActiveNode);
        };
        let node = self
            .graph
            .node_mut(active)
            .ok_or(EditorError::UnknownNode(active))?;
        if edit(&mut node.content) {
            effects.push(Effect::ContentChanged);
        }
        Ok(())
    }

    fn recolor(
        &mut self,
        paint: Paint,
        scope: Scope,
        picker: &mut dyn ColorPicker,
        effects: &mut Vec<Effect>,
    ) -> Result<(), EditorError> {
        let active = self.require_active()?;
        let node = self
            .graph
            .node(active)
            .ok_or(EditorError::UnknownNode(active))?;
        let (title, current) = match paint {
            Paint::Background => ("Select node color", node.background),
            Paint::Text => ("Select text color", node.text_color),
        };
        let Some(color) = picker.pick(title, current) else {
            return Ok(());
        };
        for id in scope.resolve(&self.graph, active) {
            match paint {
                Paint::Background => {
                    if let Some(node) = self.graph.node_mut(id) {
                        node.background = color;
                    }
                    self.graph.paint_incoming_edges(id, color);
                }
                Paint::Text => {
                    if let Some(node) = self.graph.node_mut(id) {
                        node.text_color = color;
                    }
                }
            }
        }
        effects.push(Effect::ContentChanged);
        Ok(())
    }

    fn begin_edge_op(&mut self, op: PendingOp, effects: &mut Vec<Effect>) -> Result<(), EditorError> {
        self.require_active()?;
        self.pending = op;
        let message = match op {
            PendingOp::AddingEdge => "Add edge: select destination node.",
            _ => "Delete edge: select other end-node.",
        };
        effects.push(Effect::Notify(message.to_string()));
        Ok(())
    }

    /// Esc: leave the innermost mode.
    fn cancel(&mut self, effects: &mut Vec<Effect>) {
        match mem::take(&mut self.pending) {
            PendingOp::EditingText => {
                effects.push(Effect::Notify("Text editing finished.".to_string()));
            }
            PendingOp::AddingEdge => {
                effects.push(Effect::Notify("Edge adding cancelled.".to_string()));
            }
            PendingOp::DeletingEdge => {
                effects.push(Effect::Notify("Edge deleting cancelled.".to_string()));
            }
            PendingOp::None if self.hints.is_engaged() => {
                self.hints.cancel();
                effects.push(Effect::Notify("Hint mode cancelled.".to_string()));
            }
            PendingOp::None => {}
        }
    }

    /// A node was chosen by click or hint. A pending edge pick consumes it;
    /// otherwise it becomes the active node.
    fn pick(&mut self, node: NodeId, effects: &mut Vec<Effect>) -> Result<(), EditorError> {
        match mem::take(&mut self.pending) {
            PendingOp::AddingEdge => {
                let source = self.require_active()?;
                let edge = self.graph.add_edge(source, node)?;
                if self.graph.edge(edge).is_some_and(|e| e.secondary) {
                    effects.push(Effect::Notify(
                        "Node already has a parent, edge added as secondary edge.".to_string(),
                    ));
                }
                tracing::debug!(%source, destination = %node, "added edge");
                self.graph.set_active(Some(node))?;
                effects.push(Effect::ContentChanged);
            }
            PendingOp::DeletingEdge => {
                let source = self.require_active()?;
                self.graph.remove_edge(source, node)?;
                tracing::debug!(%source, other = %node, "removed edge");
                self.graph.set_active(Some(node))?;
                effects.push(Effect::ContentChanged);
            }
            PendingOp::None | PendingOp::EditingText => self.graph.set_active(Some(node))?,
        }
        Ok(())
    }

    fn translate(
        &mut self,
        dx: f64,
        dy: f64,
        scope: Scope,
        effects: &mut Vec<Effect>,
    ) -> Result<(), EditorError> {
        let active = self.require_active()?;
        if dx == 0.0 && dy == 0.0 {
            return Ok(());
        }
        for id in scope.resolve(&self.graph, active) {
            if let Some(node) = self.graph.node_mut(id) {
                node.pos = node.pos.offset(dx, dy);
            }
        }
        effects.push(Effect::ContentChanged);
        Ok(())
    }

    fn scale(
        &mut self,
        step: ScaleStep,
        scope: Scope,
        effects: &mut Vec<Effect>,
    ) -> Result<(), EditorError> {
        let active = self.require_active()?;
        let factor = step.factor(self.config.scale_factor);
        for id in scope.resolve(&self.graph, active) {
            if let Some(node) = self.graph.node_mut(id) {
                node.scale *= factor;
            }
        }
        effects.push(Effect::ContentChanged);
        Ok(())
    }

    fn pan(&mut self, direction: Direction) {
        let (dx, dy) = direction.delta();
        let step = self.config.pan_step / self.view.zoom;
        self.view.center = self.view.center.offset(dx * step, dy * step);
    }

    fn save(&mut self, effects: &mut Vec<Effect>) -> Result<(), EditorError> {
        if self.read_only {
            effects.push(Effect::Notify(
                "Demo documents are never saved.".to_string(),
            ));
            return Ok(());
        }
        let Some(path) = self.path.clone() else {
            effects.push(Effect::Notify(
                "No file name; start mindtree with a FILE to save.".to_string(),
            ));
            return Ok(());
        };
        document::save(&self.graph, &path)?;
        self.dirty = false;
        effects.push(Effect::Saved(path));
        effects.push(Effect::Notify("Saved.".to_string()));
        Ok(())
    }

    fn reload(&mut self, effects: &mut Vec<Effect>) -> Result<(), EditorError> {
        let path = match (&self.path, self.read_only) {
            (Some(path), false) if path.exists() => path.clone(),
            _ => {
                effects.push(Effect::Notify("Nothing to reload.".to_string()));
                return Ok(());
            }
        };
        if !self.confirm_discard(Discard::Reload, effects) {
            return Ok(());
        }
        let graph = document::load(&path)?;
        self.replace_document(graph);
        effects.push(Effect::Loaded);
        effects.push(Effect::Notify(format!("Reloaded {}.", path.display())));
        Ok(())
    }

    fn new_document(&mut self, effects: &mut Vec<Effect>) {
        if !self.confirm_discard(Discard::NewDocument, effects) {
            return;
        }
        document::reset(
            &mut self.graph,
            "",
            self.config.node_background,
            self.config.node_text,
        );
        self.reset_session();
        // The file on disk, if any, still holds the previous map.
        self.dirty = self.path.is_some();
        effects.push(Effect::Loaded);
    }

    fn replace_document(&mut self, graph: Graph) {
        self.graph = graph;
        self.reset_session();
    }

    /// Drop every mode and selection state tied to the previous map.
    fn reset_session(&mut self) {
        self.hints.cancel();
        self.pending = PendingOp::None;
        self.dirty = false;
        self.ensure_active();
        self.center_view_on_active();
    }

    /// With unsaved changes, the first request only warns; repeating the
    /// same command right away goes ahead.
    fn confirm_discard(&mut self, kind: Discard, effects: &mut Vec<Effect>) -> bool {
        if !self.has_unsaved_changes() || self.armed == Some(kind) {
            self.armed = None;
            return true;
        }
        self.armed = Some(kind);
        let message = match kind {
            Discard::Quit => "Unsaved changes. Press Ctrl+Q again to quit.",
            Discard::Reload => "Unsaved changes. Press Ctrl+R again to reload.",
            Discard::NewDocument => "Unsaved changes. Press Ctrl+N again to discard them.",
        };
        effects.push(Effect::Notify(message.to_string()));
        false
    }
}
