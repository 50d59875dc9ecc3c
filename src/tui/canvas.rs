use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::Rect;
use ratatui::{Frame, Terminal};

use crate::editor::command::{Command, ScaleStep};
use crate::editor::controller::{ColorPicker, Controller, Effect, PendingOp};
use crate::error::EditorError;
use crate::graph::model::{Graph, Point, Rgb};
use crate::graph::placement;
use crate::parser::config::Config;
use crate::parser::document;
use crate::tui::input;
use crate::tui::render::{self, PALETTE, PALETTE_COLUMNS, Scene};
use crate::workspace;

#[derive(Debug)]
struct AppState {
    controller: Controller,
    status_message: Option<String>,
    /// World point under the mouse while a node is being dragged.
    drag_anchor: Option<Point>,
    canvas_area: Rect,
}

impl AppState {
    fn load(path: Option<PathBuf>, demo: bool) -> Result<Self> {
        let controller = if demo {
            let graph = demo_graph().context("failed to build the demo map")?;
            Controller::with_graph(graph, Config::default(), None).read_only()
        } else {
            let config = workspace::load_config(path.as_deref())?;
            match path {
                Some(path) => Controller::open(path, config)?,
                None => Controller::new(config),
            }
        };
        let status_message = if demo {
            Some("Demo map: changes are not saved.".to_string())
        } else {
            None
        };
        Ok(Self {
            controller,
            status_message,
            drag_anchor: None,
            canvas_area: Rect::default(),
        })
    }

    fn hints(&self) -> &'static str {
        if self.controller.is_editing_text() {
            return "type to edit  [Enter] newline  [Backspace] delete  [Esc] done";
        }
        if self.controller.hints().is_engaged() {
            return "[0-9] narrow  [Enter] pick  [Backspace] widen  [Esc] leave";
        }
        match self.controller.pending() {
            PendingOp::AddingEdge | PendingOp::DeletingEdge => {
                "click a node or [f] number it  [Esc] cancel"
            }
            _ => {
                "[i] insert  [x] delete  [e] edit  [a/d] edge +/-  [f] hints  [c/t] colour  \
                 [Ctrl+arrows] move  [Ctrl+S] save  [Ctrl+Q] quit"
            }
        }
    }

    fn scene(&self) -> Scene {
        Scene::capture(
            &self.controller,
            self.hints(),
            self.status_message.as_deref(),
        )
    }

    fn draw(&mut self, frame: &mut Frame) {
        self.canvas_area = render::canvas_area(frame.area());
        render::draw(frame, &self.scene());
    }

    /// Returns true when the editor should close.
    fn dispatch(&mut self, command: Command, picker: &mut dyn ColorPicker) -> bool {
        let mut quit = false;
        for effect in self.controller.dispatch(command, picker) {
            match effect {
                Effect::Notify(message) => self.status_message = Some(message),
                Effect::Saved(path) => {
                    tracing::debug!(path = %path.display(), "document written");
                }
                Effect::Loaded => self.drag_anchor = None,
                Effect::ContentChanged => {}
                Effect::Quit => quit = true,
            }
        }
        quit
    }

    fn handle_key<B: Backend>(&mut self, key: KeyEvent, terminal: &mut Terminal<B>) -> bool {
        self.status_message = None;
        let command = input::resolve_command(key, self.controller.is_editing_text());
        match command {
            Command::RecolorBackground(_) | Command::RecolorText(_) => {
                let mut picker = PalettePicker {
                    terminal,
                    scene: self.scene(),
                };
                self.dispatch(command, &mut picker)
            }
            Command::Noop => false,
            command => self.dispatch(command, &mut NoPicker),
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        let view = self.controller.view();
        let point = render::screen_to_world(self.canvas_area, view, mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.drag_anchor = None;
                let Some(point) = point else {
                    return false;
                };
                let Some(node) = self.controller.node_under(point) else {
                    return false;
                };
                self.status_message = None;
                self.drag_anchor = Some(point);
                self.dispatch(Command::Pick(node), &mut NoPicker)
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let (Some(anchor), Some(point)) = (self.drag_anchor, point) else {
                    return false;
                };
                self.drag_anchor = Some(point);
                let command = Command::Drag {
                    dx: point.x - anchor.x,
                    dy: point.y - anchor.y,
                    scope: input::scope_for(mouse.modifiers),
                };
                self.dispatch(command, &mut NoPicker)
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.drag_anchor = None;
                false
            }
            MouseEventKind::ScrollUp => {
                self.dispatch(Command::ZoomView(ScaleStep::Up), &mut NoPicker)
            }
            MouseEventKind::ScrollDown => {
                self.dispatch(Command::ZoomView(ScaleStep::Down), &mut NoPicker)
            }
            _ => false,
        }
    }
}

/// Used for commands that never ask for a colour.
struct NoPicker;

impl ColorPicker for NoPicker {
    fn pick(&mut self, _title: &str, _current: Rgb) -> Option<Rgb> {
        None
    }
}

/// Modal palette drawn over a snapshot of the map.
struct PalettePicker<'t, B: Backend> {
    terminal: &'t mut Terminal<B>,
    scene: Scene,
}

impl<B: Backend> PalettePicker<'_, B> {
    fn run(&mut self, title: &str, current: Rgb) -> Result<Option<Rgb>> {
        let scene = &self.scene;
        let mut selected = PALETTE.iter().position(|&c| c == current).unwrap_or(0);
        loop {
            self.terminal.draw(|f| {
                render::draw(f, scene);
                render::draw_palette(f, title, selected, current);
            })?;
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(PALETTE.get(selected).copied()),
                KeyCode::Esc | KeyCode::Char('q') => return Ok(None),
                code => selected = palette_step(selected, code),
            }
        }
    }
}

impl<B: Backend> ColorPicker for PalettePicker<'_, B> {
    fn pick(&mut self, title: &str, current: Rgb) -> Option<Rgb> {
        match self.run(title, current) {
            Ok(choice) => choice,
            Err(err) => {
                tracing::warn!(error = %err, "colour picker failed");
                None
            }
        }
    }
}

fn palette_step(selected: usize, code: KeyCode) -> usize {
    let len = PALETTE.len();
    match code {
        KeyCode::Left | KeyCode::Char('h') => (selected + len - 1) % len,
        KeyCode::Right | KeyCode::Char('l') => (selected + 1) % len,
        KeyCode::Up | KeyCode::Char('k') => (selected + len - PALETTE_COLUMNS) % len,
        KeyCode::Down | KeyCode::Char('j') => (selected + PALETTE_COLUMNS) % len,
        _ => selected,
    }
}

pub fn run(path: Option<PathBuf>, demo: bool) -> Result<()> {
    let mut app = AppState::load(path, demo)?;

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let _guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        terminal.draw(|f| app.draw(f))?;
        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let quit = match event::read()? {
            Event::Key(key) => {
                if matches!(key.kind, KeyEventKind::Release | KeyEventKind::Repeat) {
                    continue;
                }
                app.handle_key(key, &mut terminal)
            }
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            _ => false,
        };
        if quit {
            break;
        }
    }

    if app.controller.has_unsaved_changes() {
        tracing::warn!("closed with unsaved changes");
    }
    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, DisableMouseCapture, LeaveAlternateScreen);
    }
}

fn demo_graph() -> Result<Graph, EditorError> {
    let mut graph = document::blank("mindtree", Rgb::new(255, 224, 160), Rgb::BLACK);
    let root = graph.root().ok_or(EditorError::NoActiveNode)?;
    if let Some(node) = graph.node_mut(root) {
        node.scale = 1.5;
        node.pos = Point::new(-60.0, -20.0);
    }

    let distance = 140.0;
    let keys = placement::insert_child(&mut graph, root, "Keys\n[i] insert\n[x] delete", distance)?;
    let hints = placement::insert_child(&mut graph, root, "Hints\n[f] then digits", distance)?;
    let edges = placement::insert_child(&mut graph, root, "Edges\n[a] add  [d] remove", distance)?;
    let colours = placement::insert_child(&mut graph, root, "Colours [c] [t]", distance)?;

    let moving = placement::insert_child(&mut graph, keys, "Ctrl+arrows move", distance)?;
    placement::insert_child(&mut graph, keys, "Ctrl+Shift: whole subtree", distance)?;
    let secondary = placement::insert_child(&mut graph, edges, "second parent", distance)?;

    for (id, background) in [
        (keys, Rgb::new(192, 255, 192)),
        (hints, Rgb::new(192, 224, 255)),
        (edges, Rgb::new(255, 192, 203)),
        (colours, Rgb::new(255, 255, 160)),
    ] {
        if let Some(node) = graph.node_mut(id) {
            node.background = background;
        }
        graph.paint_incoming_edges(id, background);
    }
    graph.add_edge(hints, secondary)?;
    graph.set_active(Some(moving))?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn demo_app() -> AppState {
        let mut app = AppState::load(None, true).unwrap();
        app.canvas_area = Rect::new(1, 1, 200, 80);
        app
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16, modifiers: KeyModifiers) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers,
        }
    }

    /// Terminal cell showing the centre of `id`.
    fn cell_of(app: &AppState, id: crate::graph::model::NodeId) -> (u16, u16) {
        let view = app.controller.view();
        let center = app.controller.graph().node(id).unwrap().center();
        let area = app.canvas_area;
        let col = (center.x - view.center.x) * view.zoom / crate::graph::model::CHAR_WIDTH
            + f64::from(area.width) / 2.0;
        let row = (center.y - view.center.y) * view.zoom / crate::graph::model::LINE_HEIGHT
            + f64::from(area.height) / 2.0;
        (area.x + col.floor() as u16, area.y + row.floor() as u16)
    }

    #[test]
    fn demo_map_has_a_secondary_edge_and_an_active_node() {
        let graph = demo_graph().unwrap();
        assert_eq!(graph.len(), 8);
        assert!(graph.all_edges().iter().any(|e| e.secondary));
        assert!(graph.active().is_some());
    }

    #[test]
    fn demo_documents_refuse_to_save() {
        let mut app = demo_app();
        let quit = app.dispatch(Command::Save, &mut NoPicker);
        assert!(!quit);
        assert_eq!(
            app.status_message.as_deref(),
            Some("Demo documents are never saved.")
        );
    }

    #[test]
    fn click_picks_the_node_under_the_pointer_and_drag_moves_it() {
        let mut app = demo_app();
        let root = app.controller.graph().root().unwrap();
        let before = app.controller.graph().node(root).unwrap().pos;
        let (col, row) = cell_of(&app, root);

        app.handle_mouse(mouse(
            MouseEventKind::Down(MouseButton::Left),
            col,
            row,
            KeyModifiers::NONE,
        ));
        assert_eq!(app.controller.graph().active(), Some(root));

        app.handle_mouse(mouse(
            MouseEventKind::Drag(MouseButton::Left),
            col + 2,
            row + 1,
            KeyModifiers::NONE,
        ));
        let after = app.controller.graph().node(root).unwrap().pos;
        assert!((after.x - before.x - 16.0).abs() < 1e-9);
        assert!((after.y - before.y - 16.0).abs() < 1e-9);

        app.handle_mouse(mouse(
            MouseEventKind::Up(MouseButton::Left),
            col + 2,
            row + 1,
            KeyModifiers::NONE,
        ));
        assert!(app.drag_anchor.is_none());
    }

    #[test]
    fn clicking_empty_space_keeps_the_selection() {
        let mut app = demo_app();
        let active = app.controller.graph().active();
        app.handle_mouse(mouse(
            MouseEventKind::Down(MouseButton::Left),
            1,
            80,
            KeyModifiers::NONE,
        ));
        assert_eq!(app.controller.graph().active(), active);
        assert!(app.drag_anchor.is_none());
    }

    #[test]
    fn palette_navigation_wraps() {
        assert_eq!(palette_step(0, KeyCode::Left), PALETTE.len() - 1);
        assert_eq!(palette_step(PALETTE.len() - 1, KeyCode::Right), 0);
        assert_eq!(palette_step(1, KeyCode::Down), 1 + PALETTE_COLUMNS);
        assert_eq!(palette_step(1, KeyCode::Up), 1 + PALETTE_COLUMNS);
        assert_eq!(palette_step(3, KeyCode::Tab), 3);
    }

    #[test]
    fn frame_renders_into_a_test_backend() {
        let mut app = demo_app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        assert_eq!(app.canvas_area, Rect::new(1, 1, 98, 24));
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("mindtree"));
        assert!(text.contains("Demo map"));
    }

    #[test]
    fn escape_key_leaves_hint_mode() {
        let mut app = demo_app();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        app.handle_key(KeyEvent::new(KeyCode::Char('f'), KeyModifiers::NONE), &mut terminal);
        assert!(app.controller.hints().is_engaged());
        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE), &mut terminal);
        assert!(!app.controller.hints().is_engaged());
    }
}
