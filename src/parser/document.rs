//! Mind-map documents on disk.
//!
//! Nodes are stored in list order and edges refer to their endpoints by
//! position in that list, so hint numbers and edge endpoints agree after a
//! reload.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::name::QName;

use crate::error::EditorError;
use crate::graph::model::{EdgeRecord, Graph, NodeId, Point, Rgb};

const ROOT: &str = "mindmap";

/// Documents only need three levels; anything nested far deeper is refused
/// instead of being tracked.
const MAX_DEPTH: usize = 64;

/// A document holding only a root node, which is active.
pub fn blank(title: &str, background: Rgb, text_color: Rgb) -> Graph {
    let mut graph = Graph::new();
    reset(&mut graph, title, background, text_color);
    graph
}

/// Tear `graph` down and leave a single active root in its place.
pub fn reset(graph: &mut Graph, title: &str, background: Rgb, text_color: Rgb) {
    graph.clear();
    let root = graph.create_node(title);
    if let Some(node) = graph.node_mut(root) {
        node.background = background;
        node.text_color = text_color;
    }
    graph.activate_first();
}

pub fn load(path: &Path) -> Result<Graph, EditorError> {
    let text = fs::read_to_string(path).map_err(|source| EditorError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let graph = deserialize(&text).map_err(|err| EditorError::FileParse {
        path: path.to_path_buf(),
        message: format!("{err:#}"),
    })?;
    tracing::info!(
        path = %path.display(),
        nodes = graph.len(),
        edges = graph.edge_count(),
        "loaded document"
    );
    Ok(graph)
}

pub fn save(graph: &Graph, path: &Path) -> Result<(), EditorError> {
    let write_error = |source: io::Error| EditorError::FileWrite {
        path: path.to_path_buf(),
        source,
    };
    let text =
        serialize(graph).map_err(|err| write_error(io::Error::other(format!("{err:#}"))))?;
    fs::write(path, text).map_err(write_error)?;
    tracing::info!(
        path = %path.display(),
        nodes = graph.len(),
        edges = graph.edge_count(),
        "saved document"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Escape an attribute value. Line breaks and tabs become character
/// references so they survive attribute-value normalisation.
fn push_attr(tag: &mut BytesStart<'_>, key: &str, value: impl ToString) {
    let value = value.to_string();
    let escaped = escape(value.as_str())
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;");
    tag.push_attribute(Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escaped.into_bytes()),
    });
}

pub fn serialize(graph: &Graph) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(ROOT)))?;

    writer.write_event(Event::Start(BytesStart::new("nodes")))?;
    for node in graph.nodes() {
        let mut tag = BytesStart::new("node");
        push_attr(&mut tag, "x", node.pos.x);
        push_attr(&mut tag, "y", node.pos.y);
        push_attr(&mut tag, "content", &node.content);
        push_attr(&mut tag, "scale", node.scale);
        push_attr(&mut tag, "bg_red", node.background.r);
        push_attr(&mut tag, "bg_green", node.background.g);
        push_attr(&mut tag, "bg_blue", node.background.b);
        push_attr(&mut tag, "text_red", node.text_color.r);
        push_attr(&mut tag, "text_green", node.text_color.g);
        push_attr(&mut tag, "text_blue", node.text_color.b);
        writer.write_event(Event::Empty(tag))?;
    }
    writer.write_event(Event::End(BytesEnd::new("nodes")))?;

    let edges = graph.all_edges();
    if edges.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new("edges")))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new("edges")))?;
        for edge in edges {
            // Both ends are live nodes, so the lookups cannot miss.
            let (Some(source), Some(destination)) =
                (graph.index_of(edge.source), graph.index_of(edge.destination))
            else {
                continue;
            };
            let mut tag = BytesStart::new("edge");
            push_attr(&mut tag, "source", source);
            push_attr(&mut tag, "destination", destination);
            push_attr(&mut tag, "red", edge.color.r);
            push_attr(&mut tag, "green", edge.color.g);
            push_attr(&mut tag, "blue", edge.color.b);
            push_attr(&mut tag, "width", edge.width);
            push_attr(&mut tag, "secondary", u8::from(edge.secondary));
            writer.write_event(Event::Empty(tag))?;
        }
        writer.write_event(Event::End(BytesEnd::new("edges")))?;
    }

    writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
    let mut text = String::from_utf8(writer.into_inner())?;
    text.push('\n');
    Ok(text)
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// A `<node>` or `<edge>` element with its unescaped attributes.
#[derive(Debug)]
struct Tag {
    attributes: Vec<(String, String)>,
}

impl Tag {
    fn read(start: &BytesStart<'_>) -> Result<Self> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self { attributes })
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The two groups of a document, in document order. `None` means the
/// group element is absent.
#[derive(Debug, Default)]
struct Groups {
    nodes: Option<Vec<Tag>>,
    edges: Option<Vec<Tag>>,
}

fn line_at(text: &str, position: u64) -> usize {
    let end = usize::try_from(position).map_or(text.len(), |p| p.min(text.len()));
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

fn element_name(start: &BytesStart<'_>) -> Result<String> {
    Ok(std::str::from_utf8(start.name().as_ref())?.to_string())
}

/// Stream the document once, keeping only the open-element path, so
/// nesting depth never turns into call depth.
fn read_groups(text: &str) -> Result<Groups> {
    let mut reader = Reader::from_str(text);
    let mut open: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut groups = Groups::default();

    loop {
        let event = reader.read_event().with_context(|| {
            let line = line_at(text, reader.buffer_position());
            format!("malformed XML at line {line}")
        })?;
        let (start, is_empty) = match event {
            Event::Start(start) => (start, false),
            Event::Empty(start) => (start, true),
            Event::End(_) => {
                open.pop();
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };
        let line = line_at(text, reader.buffer_position());
        let name = element_name(&start).with_context(|| format!("at line {line}"))?;

        match open.len() {
            0 if seen_root => bail!("second root element <{name}> at line {line}"),
            0 => seen_root = true,
            1 if name == "nodes" => {
                groups.nodes.get_or_insert_with(Vec::new);
            }
            1 if name == "edges" => {
                groups.edges.get_or_insert_with(Vec::new);
            }
            2 => {
                let group = match (open[1].as_str(), name.as_str()) {
                    ("nodes", "node") => groups.nodes.as_mut(),
                    ("edges", "edge") => groups.edges.as_mut(),
                    _ => None,
                };
                if let Some(group) = group {
                    let tag = Tag::read(&start).with_context(|| format!("<{name}> at line {line}"))?;
                    group.push(tag);
                }
            }
            _ => {}
        }

        if !is_empty {
            if open.len() >= MAX_DEPTH {
                bail!("elements nested deeper than {MAX_DEPTH} levels at line {line}");
            }
            open.push(name);
        }
    }

    if let Some(name) = open.last() {
        bail!("document ends inside <{name}>");
    }
    if !seen_root {
        bail!("document has no root element");
    }
    Ok(groups)
}

/// Build a graph from document text. The first node comes back active.
pub fn deserialize(text: &str) -> Result<Graph> {
    let groups = read_groups(text)?;
    let nodes = groups.nodes.ok_or_else(|| anyhow!("missing <nodes> group"))?;

    let mut graph = Graph::new();
    let mut ids: Vec<NodeId> = Vec::new();
    for (index, tag) in nodes.iter().enumerate() {
        let id = read_node(&mut graph, tag).with_context(|| format!("node {index}"))?;
        ids.push(id);
    }
    if graph.is_empty() {
        bail!("document has no nodes");
    }

    for (index, tag) in groups.edges.iter().flatten().enumerate() {
        read_edge(&mut graph, &ids, tag).with_context(|| format!("edge {index}"))?;
    }

    graph.activate_first();
    Ok(graph)
}

fn read_node(graph: &mut Graph, element: &Tag) -> Result<NodeId> {
    let content = match (element.attr("content"), element.attr("htmlContent")) {
        (Some(content), _) => content.to_string(),
        (None, Some(html)) => html_to_text(html),
        (None, None) => bail!("missing attribute `content`"),
    };
    let x = number(element, "x")?;
    let y = number(element, "y")?;
    let scale = number(element, "scale")?;
    if scale <= 0.0 {
        bail!("scale must be positive, got {scale}");
    }
    let background = color(element, ["bg_red", "bg_green", "bg_blue"])?;
    let text_color = color(element, ["text_red", "text_green", "text_blue"])?;

    let id = graph.create_node(content);
    if let Some(node) = graph.node_mut(id) {
        node.pos = Point::new(x, y);
        node.scale = scale;
        node.background = background;
        node.text_color = text_color;
    }
    Ok(id)
}

fn read_edge(graph: &mut Graph, ids: &[NodeId], element: &Tag) -> Result<()> {
    let endpoint = |name: &str| -> Result<NodeId> {
        let raw = required(element, name)?;
        let index: usize = raw
            .trim()
            .parse()
            .with_context(|| format!("`{name}` is not a node index: {raw:?}"))?;
        ids.get(index)
            .copied()
            .ok_or_else(|| anyhow!("`{name}` {index} is out of range ({} nodes)", ids.len()))
    };
    let source = endpoint("source")?;
    let destination = endpoint("destination")?;
    let width = number(element, "width")?;
    let secondary = match required(element, "secondary")?.trim() {
        "0" | "false" => false,
        "1" | "true" => true,
        other => bail!("`secondary` must be 0 or 1, got {other:?}"),
    };
    let record = EdgeRecord {
        source,
        destination,
        color: color(element, ["red", "green", "blue"])?,
        width,
        secondary,
    };
    graph.restore_edge(record)?;
    Ok(())
}

fn required<'a>(element: &'a Tag, name: &str) -> Result<&'a str> {
    element
        .attr(name)
        .ok_or_else(|| anyhow!("missing attribute `{name}`"))
}

fn number(element: &Tag, name: &str) -> Result<f64> {
    let raw = required(element, name)?;
    let value: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("`{name}` is not a number: {raw:?}"))?;
    if !value.is_finite() {
        bail!("`{name}` is not finite");
    }
    Ok(value)
}

/// Colour channels may be written as integers or as floats in range.
fn color(element: &Tag, names: [&str; 3]) -> Result<Rgb> {
    let mut channels = [0u8; 3];
    for (slot, name) in channels.iter_mut().zip(names) {
        let value = number(element, name)?;
        if !(0.0..=255.0).contains(&value) {
            bail!("`{name}` must be between 0 and 255, got {value}");
        }
        *slot = value.round() as u8;
    }
    Ok(Rgb::new(channels[0], channels[1], channels[2]))
}

/// Plain text of rich-text node content written by older editors.
///
/// Paragraph ends and line breaks become newlines, other markup is dropped.
fn html_to_text(html: &str) -> String {
    let body = match html.find("<body") {
        Some(start) => {
            let after = &html[start..];
            after.find('>').map_or("", |end| &after[end + 1..])
        }
        None => html,
    };

    let mut out = String::new();
    let mut rest = body;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let Some(close) = rest[open..].find('>') else {
            rest = "";
            break;
        };
        let tag = rest[open + 1..open + close].trim().to_ascii_lowercase();
        if tag.starts_with("br") || tag == "/p" {
            out.push('\n');
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);

    let out = out.replace("&nbsp;", " ");
    let text = match unescape(&out) {
        Ok(text) => text.into_owned(),
        Err(_) => out.clone(),
    };
    text.trim_matches('\n').to_string()
}
