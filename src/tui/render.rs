use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Context, Line as Segment, Points, Rectangle};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph};

use crate::editor::controller::{Controller, PendingOp, Viewport};
use crate::graph::model::{CHAR_WIDTH, LINE_HEIGHT, NODE_PADDING, Point, Rgb, Size};

/// World-space distance between the dots of a secondary edge at zoom 1.
const DOT_SPACING: f64 = 6.0;
const STATUS_HEIGHT: u16 = 4;

pub const PALETTE_COLUMNS: usize = 8;
pub const PALETTE: [Rgb; 16] = [
    Rgb::new(255, 255, 255),
    Rgb::new(192, 192, 192),
    Rgb::new(128, 128, 128),
    Rgb::new(0, 0, 0),
    Rgb::new(255, 0, 0),
    Rgb::new(255, 128, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(128, 255, 0),
    Rgb::new(0, 160, 0),
    Rgb::new(0, 255, 192),
    Rgb::new(0, 192, 255),
    Rgb::new(0, 0, 255),
    Rgb::new(128, 0, 255),
    Rgb::new(255, 0, 255),
    Rgb::new(128, 64, 0),
    Rgb::new(255, 192, 203),
];

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub pos: Point,
    pub size: Size,
    pub scale: f64,
    pub lines: Vec<String>,
    pub text_color: Rgb,
    pub background: Rgb,
    pub active: bool,
    /// Hint number and whether Enter would pick this node.
    pub hint: Option<(usize, bool)>,
}

#[derive(Debug, Clone)]
pub struct SceneEdge {
    pub from: Point,
    pub to: Point,
    pub color: Rgb,
    pub secondary: bool,
}

/// Everything needed to draw one frame, detached from the controller so a
/// modal dialog can redraw the map while the controller is busy.
#[derive(Debug, Clone)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub view: Viewport,
    pub title: String,
    pub mode_label: String,
    pub active_summary: String,
    pub key_hints: String,
    pub message: Option<String>,
    pub unsaved: bool,
    pub picking: bool,
}

impl Scene {
    pub fn capture(controller: &Controller, key_hints: &str, message: Option<&str>) -> Self {
        let graph = controller.graph();
        let hints = controller.hints();
        let nodes = graph
            .nodes()
            .iter()
            .map(|node| SceneNode {
                pos: node.pos,
                size: node.size(),
                scale: node.scale,
                lines: node.content.split('\n').map(str::to_string).collect(),
                text_color: node.text_color,
                background: node.background,
                active: node.active,
                hint: hints.label_for(node.id).map(|l| (l.index, l.target)),
            })
            .collect();
        let edges = graph
            .all_edges()
            .into_iter()
            .filter_map(|edge| {
                Some(SceneEdge {
                    from: graph.node(edge.source)?.center(),
                    to: graph.node(edge.destination)?.center(),
                    color: edge.color,
                    secondary: edge.secondary,
                })
            })
            .collect();

        let title = match controller.path() {
            Some(path) => path.display().to_string(),
            None if controller.is_read_only() => "demo".to_string(),
            None => "untitled".to_string(),
        };
        let active_summary = match graph.active().and_then(|id| graph.node(id)) {
            Some(node) => {
                let first = node.content.lines().next().unwrap_or("");
                if first.is_empty() {
                    format!("{} (empty)", node.id)
                } else {
                    format!("{} {}", node.id, first)
                }
            }
            None => "none".to_string(),
        };

        Self {
            nodes,
            edges,
            view: controller.view(),
            title,
            mode_label: controller.mode_label(),
            active_summary,
            key_hints: key_hints.to_string(),
            message: message.map(str::to_string),
            unsaved: controller.has_unsaved_changes(),
            picking: matches!(
                controller.pending(),
                PendingOp::AddingEdge | PendingOp::DeletingEdge
            ),
        }
    }
}

fn split(area: Rect) -> (Rect, Rect) {
    let [map, status] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(STATUS_HEIGHT)]).areas(area);
    (map, status)
}

fn map_block(scene: &Scene) -> Block<'static> {
    let mut title = vec![
        Span::styled("mindtree", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(scene.title.clone(), Style::default().fg(Color::Gray)),
    ];
    if scene.unsaved {
        title.push(Span::styled(" [+]", Style::default().fg(Color::Yellow)));
    }
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(if scene.picking {
            Color::Green
        } else {
            Color::DarkGray
        }))
        .title(Line::from(title))
}

/// The part of the screen the map is painted into.
pub fn canvas_area(frame_area: Rect) -> Rect {
    let (map, _) = split(frame_area);
    Block::default().borders(Borders::ALL).inner(map)
}

/// World extents shown by `view` in a canvas of `area`, as
/// `(left, right, top, bottom)`.
fn world_bounds(area: Rect, view: Viewport) -> (f64, f64, f64, f64) {
    let half_w = f64::from(area.width) * CHAR_WIDTH / view.zoom / 2.0;
    let half_h = f64::from(area.height) * LINE_HEIGHT / view.zoom / 2.0;
    (
        view.center.x - half_w,
        view.center.x + half_w,
        view.center.y - half_h,
        view.center.y + half_h,
    )
}

/// World point under the terminal cell at `column`, `row`.
pub fn screen_to_world(area: Rect, view: Viewport, column: u16, row: u16) -> Option<Point> {
    if !area.contains(Position::new(column, row)) {
        return None;
    }
    let dx = f64::from(column - area.x) + 0.5 - f64::from(area.width) / 2.0;
    let dy = f64::from(row - area.y) + 0.5 - f64::from(area.height) / 2.0;
    Some(Point::new(
        view.center.x + dx * CHAR_WIDTH / view.zoom,
        view.center.y + dy * LINE_HEIGHT / view.zoom,
    ))
}

pub fn draw(frame: &mut Frame, scene: &Scene) {
    let (map_area, status_area) = split(frame.area());
    let block = map_block(scene);
    let inner = block.inner(map_area);
    let (left, right, top, bottom) = world_bounds(inner, scene.view);

    // Canvas y grows upward, world y downward.
    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([left, right])
        .y_bounds([-bottom, -top])
        .paint(|ctx| paint(ctx, scene));
    frame.render_widget(canvas, map_area);

    draw_status(frame, status_area, scene);
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

fn dotted(from: Point, to: Point, spacing: f64) -> Vec<(f64, f64)> {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let length = dx.hypot(dy);
    let steps = (length / spacing).floor().max(1.0) as usize;
    (0..=steps)
        .step_by(2)
        .map(|i| {
            let t = i as f64 / steps as f64;
            (from.x + dx * t, -(from.y + dy * t))
        })
        .collect()
}

fn paint(ctx: &mut Context<'_>, scene: &Scene) {
    let zoom = scene.view.zoom;
    for edge in &scene.edges {
        let color = to_color(edge.color);
        if edge.secondary {
            let coords = dotted(edge.from, edge.to, DOT_SPACING / zoom);
            ctx.draw(&Points {
                coords: &coords,
                color,
            });
        } else {
            ctx.draw(&Segment::new(
                edge.from.x,
                -edge.from.y,
                edge.to.x,
                -edge.to.y,
                color,
            ));
        }
    }
    ctx.layer();

    for node in &scene.nodes {
        ctx.draw(&Rectangle {
            x: node.pos.x,
            y: -(node.pos.y + node.size.h),
            width: node.size.w,
            height: node.size.h,
            color: if node.active {
                Color::Red
            } else {
                to_color(node.background)
            },
        });
    }
    ctx.layer();

    for node in &scene.nodes {
        let pad = NODE_PADDING * node.scale;
        let columns = ((node.size.w - 2.0 * pad) * zoom / CHAR_WIDTH).floor() as usize;
        let rows = ((node.size.h - 2.0 * pad) * zoom / LINE_HEIGHT).floor().max(1.0) as usize;
        let style = Style::default()
            .fg(to_color(node.text_color))
            .bg(to_color(node.background));
        if columns > 0 {
            for (i, text) in node.lines.iter().take(rows).enumerate() {
                let y = node.pos.y + pad + (i as f64 + 0.5) * LINE_HEIGHT * node.scale;
                let shown: String = text.chars().take(columns).collect();
                ctx.print(node.pos.x + pad, -y, Line::from(Span::styled(shown, style)));
            }
        }

        if let Some((index, target)) = node.hint {
            let style = if target {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            };
            ctx.print(
                node.pos.x,
                -node.pos.y,
                Line::from(Span::styled(format!("{index}"), style)),
            );
        }
    }
}

fn draw_status(frame: &mut Frame, area: Rect, scene: &Scene) {
    let accent = if scene.picking { Color::Green } else { Color::Cyan };
    let top = Line::from(vec![
        Span::styled(
            format!("[{}]", scene.mode_label.trim_end()),
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            format!("ACTIVE: {}", scene.active_summary),
            Style::default().fg(accent),
        ),
        Span::raw("  "),
        Span::styled(
            format!("zoom {:.2}", scene.view.zoom),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let mut bottom = Vec::new();
    if let Some(message) = &scene.message {
        bottom.push(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        ));
        bottom.push(Span::raw("   "));
    }
    bottom.push(Span::styled(
        scene.key_hints.clone(),
        Style::default().fg(Color::DarkGray),
    ));

    let status = Paragraph::new(vec![top, Line::from(bottom)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .padding(Padding::new(1, 1, 0, 0)),
    );
    frame.render_widget(status, area);
}

/// The colour chooser popup.
pub fn draw_palette(frame: &mut Frame, title: &str, selected: usize, current: Rgb) {
    let area = centered_rect(frame.area(), 60, 40);
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from("")];
    for row in PALETTE.chunks(PALETTE_COLUMNS).enumerate() {
        let (row_idx, colors) = row;
        let mut spans = Vec::new();
        for (col_idx, &rgb) in colors.iter().enumerate() {
            let idx = row_idx * PALETTE_COLUMNS + col_idx;
            let (open, close) = if idx == selected { ("[", "]") } else { (" ", " ") };
            spans.push(Span::styled(open, Style::default().fg(Color::White)));
            spans.push(Span::styled("    ", Style::default().bg(to_color(rgb))));
            spans.push(Span::styled(close, Style::default().fg(Color::White)));
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }
    let chosen = PALETTE.get(selected).copied().unwrap_or(current);
    lines.push(Line::from(vec![
        Span::raw("current "),
        Span::styled("  ", Style::default().bg(to_color(current))),
        Span::raw(format!(" {current}   new ")),
        Span::styled("  ", Style::default().bg(to_color(chosen))),
        Span::raw(format!(" {chosen}")),
    ]));
    lines.push(Line::from(Span::styled(
        "[arrows] choose  [Enter] apply  [Esc] cancel",
        Style::default().fg(Color::DarkGray),
    )));

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan))
            .padding(Padding::new(2, 2, 0, 0))
            .title(Line::from(Span::styled(
                title.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ))),
    );
    frame.render_widget(popup, area);
}

fn centered_rect(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let vertical = Layout::vertical([
        Constraint::Percentage((100 - height_percent) / 2),
        Constraint::Percentage(height_percent),
        Constraint::Percentage((100 - height_percent) / 2),
    ])
    .flex(Flex::Center)
    .split(area);
    Layout::horizontal([
        Constraint::Percentage((100 - width_percent) / 2),
        Constraint::Percentage(width_percent),
        Constraint::Percentage((100 - width_percent) / 2),
    ])
    .flex(Flex::Center)
    .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::config::Config;

    #[test]
    fn screen_centre_maps_to_view_centre() {
        let area = Rect::new(1, 1, 40, 20);
        let view = Viewport {
            center: Point::new(100.0, 50.0),
            zoom: 1.0,
        };
        let p = screen_to_world(area, view, 21, 11).unwrap();
        assert!((p.x - (100.0 + 0.5 * CHAR_WIDTH)).abs() < 1e-9);
        assert!((p.y - (50.0 + 0.5 * LINE_HEIGHT)).abs() < 1e-9);
        assert!(screen_to_world(area, view, 0, 0).is_none());
    }

    #[test]
    fn zooming_in_shrinks_the_visible_world() {
        let area = Rect::new(0, 0, 80, 24);
        let near = Viewport {
            center: Point::default(),
            zoom: 2.0,
        };
        let (left, right, top, bottom) = world_bounds(area, near);
        assert!((right - left - 80.0 * CHAR_WIDTH / 2.0).abs() < 1e-9);
        assert!((bottom - top - 24.0 * LINE_HEIGHT / 2.0).abs() < 1e-9);
    }

    #[test]
    fn dotted_lines_skip_every_other_step() {
        let dots = dotted(Point::new(0.0, 0.0), Point::new(60.0, 0.0), 6.0);
        assert_eq!(dots.len(), 6);
        assert_eq!(dots[1], (12.0, -0.0));
    }

    #[test]
    fn scene_marks_hint_target_and_active_node() {
        let mut c = Controller::new(Config::default());
        let mut picker = NoColor;
        c.dispatch(crate::editor::command::Command::InsertChild, &mut picker);
        c.dispatch(crate::editor::command::Command::Cancel, &mut picker);
        c.dispatch(crate::editor::command::Command::ToggleHint, &mut picker);
        let scene = Scene::capture(&c, "", Some("hello"));
        assert_eq!(scene.nodes.len(), 2);
        assert_eq!(scene.edges.len(), 1);
        assert_eq!(scene.nodes[0].hint, Some((0, true)));
        assert_eq!(scene.nodes[1].hint, Some((1, false)));
        assert!(scene.nodes[1].active);
        assert_eq!(scene.message.as_deref(), Some("hello"));
        assert!(scene.unsaved);
    }

    struct NoColor;

    impl crate::editor::controller::ColorPicker for NoColor {
        fn pick(&mut self, _title: &str, _current: Rgb) -> Option<Rgb> {
            None
        }
    }
}
