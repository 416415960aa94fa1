//! Explicit emission layout for fused ring systems.
//!
//! A [`Layout`] records, slot by slot, how an interleaved ring system is
//! written: branch depth, where parenthesized branches start, which ring
//! bonds open or close at each slot, atoms that belong to no ring, and the
//! bond marker in front of each slot. The parser records one for every ring
//! system it cannot express as a plain ring, and the layout engine builds or
//! extends one when rings are fused programmatically.

pub mod engine;
pub use engine::*;

use crate::{Bond, Ring};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Atom written at a slot covered by `covering` rings (ring, 1-based
/// position), in ring order: the first substitution any of them makes
/// there, else the base atom of the first.
pub(crate) fn slot_atom<'r>(covering: &[(&'r Ring, usize)]) -> Option<&'r str> {
    covering
        .iter()
        .find_map(|(ring, position)| ring.substitutions().get(position).map(String::as_str))
        .or_else(|| covering.first().map(|(ring, _)| ring.atom()))
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Layout {
    all_positions: Vec<usize>,
    branch_depth: BTreeMap<usize, usize>,
    branch_starts: BTreeSet<usize>,
    ring_order: BTreeMap<usize, Vec<usize>>,
    atom_values: BTreeMap<usize, String>,
    bonds: BTreeMap<usize, Bond>,
}

impl Layout {
    /// Assemble a layout from its parts.
    ///
    /// * `all_positions` - emission order of the global slots.
    /// * `branch_depth` - nesting depth of each slot, 0 on the main path.
    /// * `branch_starts` - slots that open a new `(` group.
    /// * `ring_order` - ring indices (into the fused ring's ring list) whose
    ///   ring bond is written at the slot, in writing order.
    /// * `atom_values` - atom text for slots no ring owns, or overrides.
    /// * `bonds` - marker written in front of the slot.
    pub fn new(
        all_positions: Vec<usize>,
        branch_depth: BTreeMap<usize, usize>,
        branch_starts: BTreeSet<usize>,
        ring_order: BTreeMap<usize, Vec<usize>>,
        atom_values: BTreeMap<usize, String>,
        bonds: BTreeMap<usize, Bond>,
    ) -> Self {
        Layout {
            all_positions,
            branch_depth,
            branch_starts,
            ring_order,
            atom_values,
            bonds,
        }
    }

    pub fn all_positions(&self) -> &[usize] {
        &self.all_positions
    }

    pub fn branch_depth(&self) -> &BTreeMap<usize, usize> {
        &self.branch_depth
    }

    pub fn branch_starts(&self) -> &BTreeSet<usize> {
        &self.branch_starts
    }

    pub fn ring_order(&self) -> &BTreeMap<usize, Vec<usize>> {
        &self.ring_order
    }

    pub fn atom_values(&self) -> &BTreeMap<usize, String> {
        &self.atom_values
    }

    pub fn bonds(&self) -> &BTreeMap<usize, Bond> {
        &self.bonds
    }

    pub fn slot_count(&self) -> usize {
        self.all_positions.len()
    }

    pub(crate) fn with_atom_value(&self, slot: usize, value: Option<String>) -> Self {
        let mut layout = self.clone();
        match value {
            Some(value) => layout.atom_values.insert(slot, value),
            None => layout.atom_values.remove(&slot),
        };
        layout
    }

    /// Check the layout against the rings it describes.
    pub(crate) fn validate(&self, rings: &[Arc<Ring>]) -> Result<(), String> {
        let n = self.slot_count();
        SlotTree::from_layout(self)?;
        for (index, ring) in rings.iter().enumerate() {
            let positions = ring
                .positions()
                .ok_or_else(|| format!("ring {} has no slot positions", ring.number()))?;
            if positions.len() != ring.size() {
                return Err(format!(
                    "ring {} has {} positions for {} atoms",
                    ring.number(),
                    positions.len(),
                    ring.size()
                ));
            }
            if let Some(slot) = positions.iter().find(|&&slot| slot >= n) {
                return Err(format!("ring {} uses slot {slot} of {n}", ring.number()));
            }
            let mut marked: Vec<usize> = self
                .ring_order
                .iter()
                .flat_map(|(slot, order)| {
                    order.iter().filter(|&&r| r == index).map(move |_| *slot)
                })
                .collect();
            marked.sort_unstable();
            let mut ends = vec![positions[0], positions[ring.size() - 1]];
            ends.sort_unstable();
            if marked != ends {
                return Err(format!(
                    "ring {} bonds are written at slots {marked:?}, expected {ends:?}",
                    ring.number()
                ));
            }
        }
        if let Some((slot, order)) = self
            .ring_order
            .iter()
            .find(|(_, order)| order.iter().any(|&r| r >= rings.len()))
        {
            return Err(format!("slot {slot} names unknown rings {order:?}"));
        }
        let stray = self
            .atom_values
            .keys()
            .chain(self.bonds.keys())
            .find(|&&slot| slot >= n);
        if let Some(slot) = stray {
            return Err(format!("slot {slot} is outside the {n} laid-out slots"));
        }
        Ok(())
    }
}

/// One atom of a [`SlotTree`].
#[derive(Debug, Clone, Default)]
pub(crate) struct SlotNode {
    pub parent: Option<usize>,
    /// Written as a parenthesized branch of its parent.
    pub branch: bool,
    pub branches: Vec<usize>,
    pub next: Option<usize>,
    /// Incoming bond marker.
    pub bond: Option<Bond>,
    /// Atom text for atoms owned by no ring.
    pub value: Option<String>,
    /// Ring indices whose ring bond is written here, in order.
    pub marks: Vec<usize>,
}

/// Mutable tree of atoms used while building a layout. Each node is written
/// as its atom, then its branches in parentheses, then its continuation.
#[derive(Debug, Clone)]
pub(crate) struct SlotTree {
    pub nodes: Vec<SlotNode>,
    pub root: usize,
}

/// Emission order of a [`SlotTree`].
#[derive(Debug, Clone)]
pub(crate) struct Linearized {
    pub order: Vec<usize>,
    pub slot_of: Vec<usize>,
    pub depth: Vec<usize>,
}

impl SlotTree {
    /// A tree holding only its root node.
    pub fn new() -> Self {
        SlotTree {
            nodes: vec![SlotNode::default()],
            root: 0,
        }
    }

    pub fn add(&mut self, bond: Option<Bond>) -> usize {
        self.nodes.push(SlotNode {
            bond,
            ..SlotNode::default()
        });
        self.nodes.len() - 1
    }

    pub fn set_next(&mut self, parent: usize, child: usize) {
        self.nodes[parent].next = Some(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[child].branch = false;
    }

    pub fn push_branch(&mut self, parent: usize, child: usize) {
        self.nodes[parent].branches.push(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[child].branch = true;
    }

    /// Continue from `parent`, or branch off it when it already continues.
    pub fn hang(&mut self, parent: usize, child: usize) {
        if self.nodes[parent].next.is_none() {
            self.set_next(parent, child);
        } else {
            self.push_branch(parent, child);
        }
    }

    /// Put `new` where `old` hangs off `parent`, keeping its branch/continuation role.
    pub fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        let branch = self.nodes[old].branch;
        if branch {
            if let Some(slot) = self.nodes[parent].branches.iter_mut().find(|b| **b == old) {
                *slot = new;
            }
        } else {
            self.nodes[parent].next = Some(new);
        }
        self.nodes[new].parent = Some(parent);
        self.nodes[new].branch = branch;
        self.nodes[old].parent = None;
    }

    pub fn is_parent_of(&self, parent: usize, child: usize) -> bool {
        self.nodes[child].parent == Some(parent)
    }

    /// Last atom on the main path.
    pub fn exit(&self) -> usize {
        let mut node = self.root;
        while let Some(next) = self.nodes[node].next {
            node = next;
        }
        node
    }

    pub fn linearize(&self) -> Linearized {
        let n = self.nodes.len();
        let mut order = Vec::with_capacity(n);
        let mut depth = vec![0; n];
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            order.push(node);
            let d = depth[node];
            if let Some(next) = self.nodes[node].next {
                depth[next] = d;
                stack.push(next);
            }
            for &branch in self.nodes[node].branches.iter().rev() {
                depth[branch] = d + 1;
                stack.push(branch);
            }
        }
        let mut slot_of = vec![usize::MAX; n];
        for (slot, &node) in order.iter().enumerate() {
            slot_of[node] = slot;
        }
        Linearized {
            order,
            slot_of,
            depth,
        }
    }

    pub fn to_layout(&self, lin: &Linearized) -> Layout {
        let mut layout = Layout {
            all_positions: (0..lin.order.len()).collect(),
            ..Layout::default()
        };
        for (slot, &node) in lin.order.iter().enumerate() {
            let atom = &self.nodes[node];
            layout.branch_depth.insert(slot, lin.depth[node]);
            if atom.branch {
                layout.branch_starts.insert(slot);
            }
            if !atom.marks.is_empty() {
                layout.ring_order.insert(slot, atom.marks.clone());
            }
            if let Some(value) = &atom.value {
                layout.atom_values.insert(slot, value.clone());
            }
            if node != self.root {
                if let Some(bond) = atom.bond {
                    layout.bonds.insert(slot, bond);
                }
            }
        }
        layout
    }

    /// Rebuild the tree a layout describes. Node ids are the layout's slots.
    pub fn from_layout(layout: &Layout) -> Result<Self, String> {
        let n = layout.all_positions.len();
        if n == 0 {
            return Err("layout has no slots".to_string());
        }
        let mut sorted = layout.all_positions.clone();
        sorted.sort_unstable();
        if sorted.iter().enumerate().any(|(i, &slot)| i != slot) {
            return Err("all_positions is not a permutation of 0..n".to_string());
        }

        let mut tree = SlotTree {
            nodes: vec![SlotNode::default(); n],
            root: layout.all_positions[0],
        };
        // open[d] is the last slot written at depth d.
        let mut open: Vec<usize> = Vec::new();
        for (i, &slot) in layout.all_positions.iter().enumerate() {
            let depth = *layout
                .branch_depth
                .get(&slot)
                .ok_or_else(|| format!("slot {slot} has no branch depth"))?;
            let starts = layout.branch_starts.contains(&slot);
            if i == 0 {
                if depth != 0 || starts {
                    return Err(format!("first slot {slot} must sit on the main path"));
                }
            } else if starts {
                if depth == 0 || depth > open.len() {
                    return Err(format!("branch at slot {slot} has impossible depth {depth}"));
                }
                tree.push_branch(open[depth - 1], slot);
            } else {
                if depth >= open.len() {
                    return Err(format!("slot {slot} goes deeper without opening a branch"));
                }
                let parent = open[depth];
                if tree.nodes[parent].next.is_some() {
                    return Err(format!("slot {parent} continues twice"));
                }
                tree.set_next(parent, slot);
            }
            open.truncate(depth);
            open.push(slot);
        }

        for (&slot, order) in &layout.ring_order {
            let node = tree
                .nodes
                .get_mut(slot)
                .ok_or_else(|| format!("ring bonds at unknown slot {slot}"))?;
            node.marks = order.clone();
        }
        for (&slot, &bond) in &layout.bonds {
            if let Some(node) = tree.nodes.get_mut(slot) {
                node.bond = Some(bond);
            }
        }
        for (&slot, value) in &layout.atom_values {
            if let Some(node) = tree.nodes.get_mut(slot) {
                node.value = Some(value.clone());
            }
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // X(A(B))(C)D
    fn branched() -> SlotTree {
        let mut tree = SlotTree::new();
        let a = tree.add(None);
        let b = tree.add(None);
        let c = tree.add(Some(Bond::Double));
        let d = tree.add(None);
        tree.push_branch(0, a);
        tree.push_branch(a, b);
        tree.push_branch(0, c);
        tree.set_next(0, d);
        tree
    }

    #[test]
    fn test_linearize_order_and_depth() {
        let tree = branched();
        let lin = tree.linearize();
        assert_eq!(lin.order, vec![0, 1, 2, 3, 4]);
        assert_eq!(lin.depth, vec![0, 1, 2, 1, 0]);
        assert_eq!(tree.exit(), 4);
    }

    #[test]
    fn test_layout_round_trip() {
        let tree = branched();
        let layout = tree.to_layout(&tree.linearize());
        assert_eq!(layout.branch_starts().iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(layout.bonds().get(&3), Some(&Bond::Double));
        let rebuilt = SlotTree::from_layout(&layout).unwrap();
        assert_eq!(rebuilt.to_layout(&rebuilt.linearize()), layout);
    }

    #[test]
    fn test_sibling_branches_differ_from_nested() {
        // X(A)(B) and X(AB) have the same depths but different branch starts.
        let mut siblings = SlotTree::new();
        let a = siblings.add(None);
        let b = siblings.add(None);
        siblings.push_branch(0, a);
        siblings.push_branch(0, b);
        let mut nested = SlotTree::new();
        let a = nested.add(None);
        let b = nested.add(None);
        nested.push_branch(0, a);
        nested.set_next(a, b);
        let siblings = siblings.to_layout(&siblings.linearize());
        let nested = nested.to_layout(&nested.linearize());
        assert_eq!(siblings.branch_depth(), nested.branch_depth());
        assert_ne!(siblings.branch_starts(), nested.branch_starts());
    }

    #[test]
    fn test_from_layout_rejects_depth_jumps() {
        let layout = Layout::new(
            vec![0, 1],
            BTreeMap::from([(0, 0), (1, 1)]),
            BTreeSet::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeMap::new(),
        );
        assert!(SlotTree::from_layout(&layout).is_err());
    }

    #[test]
    fn test_replace_child_keeps_branch_role() {
        let mut tree = branched();
        let new = tree.add(None);
        tree.replace_child(0, 3, new);
        assert!(tree.nodes[new].branch);
        assert_eq!(tree.nodes[0].branches, vec![1, new]);
        assert_eq!(tree.nodes[3].parent, None);
    }
}
