use crate::graph::model::NodeId;
use crate::graph::subtree::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit step in world coordinates (`y` grows downward).
    pub fn delta(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleStep {
    Up,
    Down,
}

impl ScaleStep {
    pub fn factor(self, base: f64) -> f64 {
        match self {
            ScaleStep::Up => base,
            ScaleStep::Down => 1.0 / base,
        }
    }
}

/// Everything the editor can be asked to do. Front-ends translate their
/// input events into these; the scope of bulk operations is decided once,
/// at translation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    InsertChild,
    Delete(Scope),
    EditText,
    RecolorBackground(Scope),
    RecolorText(Scope),
    BeginAddEdge,
    BeginDeleteEdge,
    ToggleHint,
    HintDigit(u8),
    HintBackspace,
    CommitHint,
    Cancel,
    Move(Direction, Scope),
    Scale(ScaleStep, Scope),
    Pan(Direction),
    /// Move by an arbitrary world-space offset, e.g. a mouse drag.
    Drag { dx: f64, dy: f64, scope: Scope },
    Pick(NodeId),
    TextInput(char),
    TextBackspace,
    ZoomView(ScaleStep),
    Save,
    Reload,
    NewDocument,
    Quit,
    Noop,
}
