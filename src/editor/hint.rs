//! Keyboard hint selection.
//!
//! Every node is labelled with its position in the node list; typing digits
//! narrows the labelled set to numbers starting with what was typed. The
//! numbers are recomputed whenever hint mode is engaged and are never
//! stored anywhere else.

use crate::graph::model::{Graph, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HintState {
    #[default]
    Idle,
    ShowingAll,
    Filtering(String),
}

/// A label drawn over a node while hint mode is engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintLabel {
    pub node: NodeId,
    pub index: usize,
    /// Enter would select this node.
    pub target: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintOutcome {
    /// The key had no meaning in the current state.
    Ignored,
    Narrowed,
    Widened,
    /// The typed number identifies exactly one node; hint mode is over.
    Committed(NodeId),
    /// Nothing matches any more; hint mode was cancelled.
    NoMatch,
}

#[derive(Debug, Clone, Default)]
pub struct HintSelector {
    state: HintState,
    order: Vec<NodeId>,
    visible: Vec<usize>,
    target: Option<NodeId>,
}

impl HintSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_engaged(&self) -> bool {
        self.state != HintState::Idle
    }

    pub fn prefix(&self) -> &str {
        match &self.state {
            HintState::Filtering(prefix) => prefix,
            _ => "",
        }
    }

    pub fn labels(&self) -> Vec<HintLabel> {
        self.visible
            .iter()
            .filter_map(|&index| {
                let node = *self.order.get(index)?;
                Some(HintLabel {
                    node,
                    index,
                    target: Some(node) == self.target,
                })
            })
            .collect()
    }

    pub fn label_for(&self, node: NodeId) -> Option<HintLabel> {
        self.labels().into_iter().find(|label| label.node == node)
    }

    /// Switch hint mode on or off. Returns whether it is engaged afterwards.
    pub fn toggle(&mut self, graph: &Graph) -> bool {
        if self.is_engaged() {
            self.cancel();
        } else {
            self.engage(graph);
        }
        self.is_engaged()
    }

    /// Number every node by its list position and label all of them.
    pub fn engage(&mut self, graph: &Graph) {
        self.order = graph.nodes().iter().map(|n| n.id).collect();
        if self.order.is_empty() {
            self.cancel();
            return;
        }
        self.show_all();
    }

    pub fn cancel(&mut self) {
        self.state = HintState::Idle;
        self.order.clear();
        self.visible.clear();
        self.target = None;
    }

    pub fn push_digit(&mut self, digit: u8) -> HintOutcome {
        if !self.is_engaged() || digit > 9 {
            return HintOutcome::Ignored;
        }
        let mut prefix = self.prefix().to_string();
        prefix.push(char::from(b'0' + digit));

        let matches = self.matching(&prefix);
        if matches.is_empty() {
            self.cancel();
            return HintOutcome::NoMatch;
        }
        let exact = self.exact(&prefix);
        if matches.len() == 1
            && let Some(node) = exact
        {
            self.cancel();
            return HintOutcome::Committed(node);
        }
        self.state = HintState::Filtering(prefix);
        self.visible = matches;
        self.target = exact;
        HintOutcome::Narrowed
    }

    pub fn backspace(&mut self) -> HintOutcome {
        let HintState::Filtering(prefix) = &self.state else {
            return HintOutcome::Ignored;
        };
        let mut prefix = prefix.clone();
        prefix.pop();
        if prefix.is_empty() {
            self.show_all();
        } else {
            self.filter(prefix);
        }
        HintOutcome::Widened
    }

    /// Enter: hand back the hint target and leave hint mode. Without a
    /// target nothing happens.
    pub fn commit(&mut self) -> Option<NodeId> {
        if !self.is_engaged() {
            return None;
        }
        let target = self.target?;
        self.cancel();
        Some(target)
    }

    /// Renumber after the graph changed, keeping what was typed. This never
    /// commits; if nothing matches any more hint mode ends.
    pub fn refresh(&mut self, graph: &Graph) {
        if !self.is_engaged() {
            return;
        }
        self.order = graph.nodes().iter().map(|n| n.id).collect();
        match self.state.clone() {
            HintState::Idle => {}
            HintState::ShowingAll => {
                if self.order.is_empty() {
                    self.cancel();
                } else {
                    self.show_all();
                }
            }
            HintState::Filtering(prefix) => {
                if self.matching(&prefix).is_empty() {
                    self.cancel();
                } else {
                    self.filter(prefix);
                }
            }
        }
    }

    /// Drop any reference to a node that no longer exists.
    pub fn forget(&mut self, node: NodeId) {
        if self.target == Some(node) {
            self.target = None;
        }
    }

    fn show_all(&mut self) {
        self.state = HintState::ShowingAll;
        self.visible = (0..self.order.len()).collect();
        self.target = self.order.first().copied();
    }

    fn filter(&mut self, prefix: String) {
        self.visible = self.matching(&prefix);
        self.target = self.exact(&prefix);
        self.state = HintState::Filtering(prefix);
    }

    fn matching(&self, prefix: &str) -> Vec<usize> {
        (0..self.order.len())
            .filter(|index| index.to_string().starts_with(prefix))
            .collect()
    }

    fn exact(&self, prefix: &str) -> Option<NodeId> {
        prefix
            .parse::<usize>()
            .ok()
            .filter(|index| index.to_string() == prefix)
            .and_then(|index| self.order.get(index).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(count: usize) -> (Graph, Vec<NodeId>) {
        let mut g = Graph::new();
        let ids = (0..count).map(|i| g.create_node(format!("{i}"))).collect();
        (g, ids)
    }

    fn visible_indices(hints: &HintSelector) -> Vec<usize> {
        hints.labels().iter().map(|l| l.index).collect()
    }

    #[test]
    fn toggle_labels_every_node_and_targets_the_first() {
        let (g, ids) = graph_with(4);
        let mut hints = HintSelector::new();
        assert!(hints.toggle(&g));
        assert_eq!(&hints.state, &HintState::ShowingAll);
        assert_eq!(visible_indices(&hints), vec![0, 1, 2, 3]);
        assert_eq!(hints.target, Some(ids[0]));
        assert!(!hints.toggle(&g));
        assert!(hints.labels().is_empty());
    }

    #[test]
    fn narrowing_converges_and_auto_commits() {
        let (g, ids) = graph_with(13);
        let mut hints = HintSelector::new();
        hints.engage(&g);

        assert_eq!(hints.push_digit(1), HintOutcome::Narrowed);
        assert_eq!(visible_indices(&hints), vec![1, 10, 11, 12]);
        assert_eq!(&hints.state, &HintState::Filtering("1".to_string()));
        assert_eq!(hints.target, Some(ids[1]));

        assert_eq!(hints.push_digit(0), HintOutcome::Committed(ids[10]));
        assert_eq!(&hints.state, &HintState::Idle);
        assert!(hints.labels().is_empty());
    }

    #[test]
    fn zero_matches_cancel_hint_mode() {
        let (g, _) = graph_with(13);
        let mut hints = HintSelector::new();
        hints.engage(&g);
        assert_eq!(hints.push_digit(1), HintOutcome::Narrowed);
        assert_eq!(hints.push_digit(9), HintOutcome::NoMatch);
        assert!(!hints.is_engaged());
        assert_eq!(hints.target, None);
    }

    #[test]
    fn leading_zero_is_a_string_prefix() {
        let (g, ids) = graph_with(13);
        let mut hints = HintSelector::new();
        hints.engage(&g);
        assert_eq!(hints.push_digit(0), HintOutcome::Committed(ids[0]));
    }

    #[test]
    fn backspace_widens_back_to_showing_all() {
        let (g, ids) = graph_with(13);
        let mut hints = HintSelector::new();
        hints.engage(&g);
        assert_eq!(hints.backspace(), HintOutcome::Ignored);
        hints.push_digit(1);
        assert_eq!(hints.backspace(), HintOutcome::Widened);
        assert_eq!(&hints.state, &HintState::ShowingAll);
        assert_eq!(visible_indices(&hints).len(), 13);
        assert_eq!(hints.target, Some(ids[0]));
    }

    #[test]
    fn enter_commits_the_exact_match() {
        let (g, ids) = graph_with(13);
        let mut hints = HintSelector::new();
        hints.engage(&g);
        hints.push_digit(1);
        assert_eq!(hints.commit(), Some(ids[1]));
        assert!(!hints.is_engaged());
        assert_eq!(hints.commit(), None);
    }

    #[test]
    fn at_most_one_label_is_the_target() {
        let (g, _) = graph_with(30);
        let mut hints = HintSelector::new();
        hints.engage(&g);
        for digit in [2u8] {
            hints.push_digit(digit);
            let targets = hints.labels().iter().filter(|l| l.target).count();
            assert!(targets <= 1);
        }
        assert_eq!(visible_indices(&hints), vec![2, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29]);
    }

    #[test]
    fn digits_are_ignored_when_idle() {
        let mut hints = HintSelector::new();
        assert_eq!(hints.push_digit(3), HintOutcome::Ignored);
        assert_eq!(hints.commit(), None);
    }

    #[test]
    fn refresh_renumbers_without_committing() {
        let (mut g, ids) = graph_with(13);
        let mut hints = HintSelector::new();
        hints.engage(&g);
        hints.push_digit(1);
        g.delete_nodes(&ids[10..]).unwrap();
        hints.forget(ids[10]);
        hints.refresh(&g);
        assert_eq!(&hints.state, &HintState::Filtering("1".to_string()));
        assert_eq!(visible_indices(&hints), vec![1]);
        assert_eq!(hints.target, Some(ids[1]));
    }

    #[test]
    fn refresh_exits_when_nothing_matches() {
        let (mut g, ids) = graph_with(13);
        let mut hints = HintSelector::new();
        hints.engage(&g);
        hints.push_digit(1);
        g.delete_nodes(&ids[1..]).unwrap();
        hints.refresh(&g);
        assert!(!hints.is_engaged());
    }

    #[test]
    fn forget_clears_the_target() {
        let (g, ids) = graph_with(3);
        let mut hints = HintSelector::new();
        hints.engage(&g);
        hints.forget(ids[0]);
        assert_eq!(hints.target, None);
        assert_eq!(hints.commit(), None);
        assert!(hints.is_engaged());
    }
}
