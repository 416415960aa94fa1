//! Layout engine: arranges true-size rings into one interleaved traversal.
//!
//! Every ring after the first is placed relative to a global slot of the
//! rings placed so far. Sharing an edge inserts the new atoms between the
//! two shared atoms when one is written right after the other, and hangs
//! them off the later atom otherwise. Sharing a single atom (spiro) always
//! hangs the new atoms off it. Sequential rings follow the exit atom,
//! optionally behind a short linker chain or inside a branch.

use super::SlotTree;
use crate::tree::check_atom;
use crate::{Bond, FusedRing, OperationError, Result, Ring};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::*;

/// How a ring relates to the rings placed before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fusion {
    /// The first ring of the system.
    Base,
    /// Lies within the base ring's traversal.
    Inside,
    /// Shares the base ring's closing edge.
    Endpoint,
    /// Runs past the end of the base ring.
    Extending,
    /// Shares the base ring's opening edge.
    StartSharing,
    /// Fused to a ring other than the base.
    Chained,
    /// Shares exactly one atom.
    Spiro,
}

/// What a newly placed ring shares with the rings already placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Share {
    Edge,
    Atom,
}

/// A ring written after a fused system rather than fused into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialRing {
    pub ring: Ring,
    /// Atoms written between the attachment point and the ring.
    pub linker: Vec<String>,
    /// 0 continues the main path; 1 and deeper place the ring in a branch.
    pub depth: usize,
}

impl SequentialRing {
    pub fn new(ring: Ring) -> Self {
        SequentialRing {
            ring,
            linker: Vec::new(),
            depth: 0,
        }
    }

    pub fn with_linker<I, S>(self, atoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SequentialRing {
            linker: atoms.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn at_depth(self, depth: usize) -> Self {
        SequentialRing { depth, ..self }
    }
}

/// Lowest free ring number, keeping `wanted` when nobody uses it.
pub(crate) fn free_number(used: &BTreeSet<u16>, wanted: u16) -> Result<u16> {
    if !used.contains(&wanted) {
        return Ok(wanted);
    }
    (1..=crate::MAX_RING_NUMBER)
        .find(|n| !used.contains(n))
        .ok_or_else(|| {
            OperationError::InvalidRingNumber {
                op: "renumber",
                number: crate::MAX_RING_NUMBER as usize + 1,
            }
            .into()
        })
}

/// Rings being arranged on a shared slot tree. `members[i]` lists the
/// tree nodes of ring `i` in position order. Marks of the first `written`
/// rings come from a recorded layout and keep their order.
pub(crate) struct Arrangement {
    tree: SlotTree,
    rings: Vec<Ring>,
    members: Vec<Vec<usize>>,
    entry: Option<Bond>,
    written: usize,
}

impl Arrangement {
    fn from_base(base: &Ring) -> Self {
        let mut tree = SlotTree::new();
        let mut members = vec![tree.root];
        for i in 1..base.size() {
            let node = tree.add(base.bonds()[i - 1]);
            tree.set_next(node - 1, node);
            members.push(node);
        }
        tree.nodes[members[0]].marks.push(0);
        tree.nodes[members[base.size() - 1]].marks.push(0);
        Arrangement {
            tree,
            rings: vec![base.without_positions().with_offset(0)],
            members: vec![members],
            entry: base.entry_bond(),
            written: 0,
        }
    }

    /// Start from an existing fused ring, laid out or window-style.
    pub fn from_fused(fused: &FusedRing) -> Result<Self> {
        let rings: Vec<Ring> = fused.rings().iter().map(|r| (**r).clone()).collect();
        match fused.layout() {
            Some(layout) => {
                let tree = SlotTree::from_layout(layout).map_err(|reason| {
                    OperationError::InvalidLayout {
                        op: "FusedRing",
                        reason,
                    }
                })?;
                let mut members = Vec::with_capacity(rings.len());
                for ring in &rings {
                    let positions = ring.positions().ok_or_else(|| OperationError::InvalidLayout {
                        op: "FusedRing",
                        reason: format!("ring {} has no slot positions", ring.number()),
                    })?;
                    members.push(positions.to_vec());
                }
                Ok(Arrangement {
                    tree,
                    written: rings.len(),
                    rings,
                    members,
                    entry: fused.entry_bond(),
                })
            }
            None => Self::from_windows(rings, fused.entry_bond()),
        }
    }

    /// Lay window-style rings out as one chain, writing exactly what the
    /// window serializer writes.
    fn from_windows(rings: Vec<Ring>, entry: Option<Bond>) -> Result<Self> {
        let total = rings.iter().map(|r| r.end() + 1).max().unwrap_or(0);
        let mut tree = SlotTree::new();
        for slot in 1..total {
            let owner = rings
                .iter()
                .find(|r| r.offset() < slot && slot <= r.end())
                .ok_or(OperationError::InvalidOffset {
                    op: "FusedRing",
                    offset: slot,
                })?;
            let node = tree.add(owner.bonds()[slot - owner.offset() - 1]);
            tree.set_next(slot - 1, node);
        }
        for slot in 0..total {
            for (index, ring) in rings.iter().enumerate() {
                if slot == ring.offset() || slot == ring.end() {
                    tree.nodes[slot].marks.push(index);
                }
            }
        }
        let members = rings.iter().map(|r| (r.offset()..=r.end()).collect()).collect();
        Ok(Arrangement {
            tree,
            rings,
            members,
            entry,
            written: 0,
        })
    }

    fn used_numbers(&self) -> BTreeSet<u16> {
        self.rings.iter().map(Ring::number).collect()
    }

    fn edge_use(&self, a: usize, b: usize) -> usize {
        self.members
            .iter()
            .filter(|members| {
                let len = members.len();
                (0..len).any(|i| {
                    let (u, v) = (members[i], members[(i + 1) % len]);
                    (u, v) == (a, b) || (u, v) == (b, a)
                })
            })
            .count()
    }

    /// Pick the ring edge at `x` to fuse onto: the most recently placed
    /// ring first, its forward neighbour before its backward one, skipping
    /// edges two rings already share.
    fn shared_edge(&self, x: usize) -> Option<(usize, usize)> {
        for (host, members) in self.members.iter().enumerate().rev() {
            let Some(k) = members.iter().position(|&n| n == x) else {
                continue;
            };
            let len = members.len();
            for y in [members[(k + 1) % len], members[(k + len - 1) % len]] {
                if self.edge_use(x, y) < 2 {
                    return Some((host, y));
                }
            }
        }
        None
    }

    fn classify_edge(&self, host: usize, x: usize, y: usize) -> Fusion {
        if host != 0 {
            return Fusion::Chained;
        }
        let base = &self.members[0];
        let (first, second, last) = (base[0], base[1], base[base.len() - 1]);
        let is = |a: usize, b: usize| (x, y) == (a, b) || (x, y) == (b, a);
        if is(first, second) {
            Fusion::StartSharing
        } else if is(last, first) {
            Fusion::Endpoint
        } else if self.tree.is_parent_of(x, y) || self.tree.is_parent_of(y, x) {
            Fusion::Inside
        } else {
            Fusion::Extending
        }
    }

    /// New nodes chained off `anchor`, one per bond, each taking its bond as incoming.
    fn hang_chain(&mut self, anchor: usize, bonds: &[Option<Bond>]) -> Vec<usize> {
        let mut nodes = Vec::with_capacity(bonds.len());
        let mut prev = anchor;
        for &bond in bonds {
            let node = self.tree.add(bond);
            if prev == anchor {
                self.tree.hang(anchor, node);
            } else {
                self.tree.set_next(prev, node);
            }
            nodes.push(node);
            prev = node;
        }
        nodes
    }

    /// Place `ring` at global slot `offset` of the current traversal.
    pub fn place(&mut self, ring: Ring, offset: usize, share: Share) -> Result<Fusion> {
        let op = "FusedRing::add_ring";
        let size = ring.size();
        let number = free_number(&self.used_numbers(), ring.number())?;
        let lin = self.tree.linearize();
        let x = *lin
            .order
            .get(offset)
            .ok_or(OperationError::InvalidOffset { op, offset })?;
        let index = self.rings.len();
        let mut bonds = ring.bonds().to_vec();

        let (members, fusion) = match share {
            Share::Atom => {
                let new = self.hang_chain(x, &bonds[..size - 1]);
                self.tree.nodes[x].marks.push(index);
                self.tree.nodes[new[new.len() - 1]].marks.push(index);
                let mut members = vec![x];
                members.extend(new);
                (members, Fusion::Spiro)
            }
            Share::Edge => {
                let (host, y) = self
                    .shared_edge(x)
                    .ok_or(OperationError::InvalidOffset { op, offset })?;
                let fusion = self.classify_edge(host, x, y);
                let adjacent = if self.tree.is_parent_of(x, y) {
                    Some((x, y))
                } else if self.tree.is_parent_of(y, x) {
                    Some((y, x))
                } else {
                    None
                };
                let members = match adjacent {
                    Some((parent, child)) => {
                        // parent - new atoms - child, the old parent-child bond becomes the closure.
                        let old_bond = self.tree.nodes[child].bond;
                        let mut new = Vec::with_capacity(size - 2);
                        for &bond in &bonds[..size - 2] {
                            let node = self.tree.add(bond);
                            match new.last() {
                                Some(&prev) => self.tree.set_next(prev, node),
                                None => self.tree.replace_child(parent, child, node),
                            }
                            new.push(node);
                        }
                        let last = new[new.len() - 1];
                        self.tree.set_next(last, child);
                        self.tree.nodes[child].bond = bonds[size - 2];
                        if old_bond.is_some() {
                            bonds[size - 1] = old_bond;
                        }
                        self.tree.nodes[parent].marks.push(index);
                        self.tree.nodes[child].marks.push(index);
                        let mut members = vec![parent];
                        members.extend(new);
                        members.push(child);
                        members
                    }
                    None => {
                        let (early, late) = if lin.slot_of[x] < lin.slot_of[y] {
                            (x, y)
                        } else {
                            (y, x)
                        };
                        let new = self.hang_chain(late, &bonds[1..size - 1]);
                        self.tree.nodes[early].marks.push(index);
                        self.tree.nodes[new[new.len() - 1]].marks.push(index);
                        let mut members = vec![early, late];
                        members.extend(new);
                        members
                    }
                };
                (members, fusion)
            }
        };

        debug!(
            "Placed ring {number} (size {size}) at slot {offset} as {fusion:?}"
        );
        let ring = ring
            .without_positions()
            .with_number_unchecked(number)
            .with_closure_bond(bonds[size - 1]);
        self.rings.push(ring);
        self.members.push(members);
        Ok(fusion)
    }

    /// Append rings after the exit atom, each at its own branch depth.
    pub fn append_sequential(&mut self, sequence: &[SequentialRing]) -> Result<()> {
        let op = "FusedRing::add_sequential_rings";
        // anchors[d] is the last atom written at depth d.
        let mut anchors = vec![self.tree.exit()];
        for item in sequence {
            let depth = item.depth;
            if depth > anchors.len() {
                return Err(OperationError::InvalidDepth {
                    op,
                    depth,
                    max: anchors.len(),
                }
                .into());
            }
            for atom in &item.linker {
                check_atom(op, atom)?;
            }
            let ring = &item.ring;
            let number = free_number(&self.used_numbers(), ring.number())?;
            let index = self.rings.len();

            let mut chain = Vec::with_capacity(item.linker.len() + ring.size());
            for atom in &item.linker {
                let node = self.tree.add(None);
                self.tree.nodes[node].value = Some(atom.clone());
                chain.push(node);
            }
            let mut members = Vec::with_capacity(ring.size());
            for position in 1..=ring.size() {
                let bond = if position == 1 {
                    ring.entry_bond()
                } else {
                    ring.bonds()[position - 2]
                };
                let node = self.tree.add(bond);
                chain.push(node);
                members.push(node);
            }

            let first = chain[0];
            if depth == anchors.len() {
                self.tree.push_branch(anchors[depth - 1], first);
            } else {
                self.tree.hang(anchors[depth], first);
            }
            for pair in chain.windows(2) {
                self.tree.set_next(pair[0], pair[1]);
            }
            let (opener, closer) = (members[0], members[members.len() - 1]);
            self.tree.nodes[opener].marks.push(index);
            self.tree.nodes[closer].marks.push(index);

            debug!(
                "Appended ring {number} after {} linker atoms at depth {depth}",
                item.linker.len()
            );
            self.rings.push(
                ring.without_positions()
                    .with_number_unchecked(number)
                    .with_entry_bond(None),
            );
            self.members.push(members);
            anchors.truncate(depth);
            anchors.push(closer);
        }
        Ok(())
    }

    /// At every slot holding a placed ring's mark, ring bonds open first
    /// and close in ascending ring number.
    fn order_marks(&mut self, order: &[usize]) {
        let mut opened = vec![false; self.rings.len()];
        for &node in order {
            let marks = &self.tree.nodes[node].marks;
            let placed = marks.iter().any(|&k| k >= self.written);
            let (mut opens, mut closes): (Vec<usize>, Vec<usize>) =
                marks.iter().partition(|&&k| !opened[k]);
            for &k in &opens {
                opened[k] = true;
            }
            if placed {
                closes.sort_by_key(|&k| self.rings[k].number());
                opens.extend(closes);
                self.tree.nodes[node].marks = opens;
            }
        }
    }

    pub fn finish(mut self) -> Result<FusedRing> {
        let lin = self.tree.linearize();
        self.order_marks(&lin.order);
        let layout = self.tree.to_layout(&lin);
        let mut rings = Vec::with_capacity(self.rings.len());
        for (ring, members) in self.rings.iter().zip(&self.members) {
            let positions = members.iter().map(|&node| lin.slot_of[node]).collect();
            rings.push(Arc::new(ring.with_positions(positions)?));
        }
        Ok(FusedRing::from_parts(rings, Some(layout), self.entry))
    }
}

/// Arrange true-size rings into one interleaved system. The ring with the
/// lowest offset is the base; every other ring's offset names the global
/// slot of the first atom it shares with the rings placed before it.
pub fn arrange(rings: Vec<Ring>) -> Result<FusedRing> {
    let mut rings = rings;
    rings.sort_by_key(Ring::offset);
    let mut rings = rings.into_iter();
    let base = rings
        .next()
        .ok_or(OperationError::Empty { op: "FusedRing::arrange" })?;
    if base.offset() != 0 {
        return Err(OperationError::InvalidOffset {
            op: "FusedRing::arrange",
            offset: base.offset(),
        }
        .into());
    }
    let mut arrangement = Arrangement::from_base(&base);
    for ring in rings {
        let offset = ring.offset();
        arrangement.place(ring, offset, Share::Edge)?;
    }
    arrangement.finish()
}

/// Classify every ring of `fused` against the rings before it.
pub fn classify(fused: &FusedRing) -> Vec<(u16, Fusion)> {
    let rings = fused.rings();
    let mut result = Vec::with_capacity(rings.len());
    let Some(base) = rings.first() else {
        return result;
    };
    result.push((base.number(), Fusion::Base));

    if fused.layout().is_none() {
        let mut covered_end = base.end();
        for ring in &rings[1..] {
            let fusion = if ring.offset() == covered_end {
                Fusion::Spiro
            } else if ring.offset() > base.end() {
                Fusion::Chained
            } else if ring.offset() == 0 {
                Fusion::StartSharing
            } else if ring.end() == base.end() {
                Fusion::Endpoint
            } else if ring.end() < base.end() {
                Fusion::Inside
            } else {
                Fusion::Extending
            };
            covered_end = covered_end.max(ring.end());
            result.push((ring.number(), fusion));
        }
        return result;
    }

    fn slots(ring: &Ring) -> BTreeSet<usize> {
        ring.positions().unwrap_or_default().iter().copied().collect()
    }
    let base_slots = slots(base);
    let base_positions = base.positions().unwrap_or_default();
    let (first, last) = match (base_positions.first(), base_positions.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return result,
    };
    let base_max = base_slots.iter().next_back().copied().unwrap_or(0);
    let mut earlier = base_slots.clone();
    for ring in &rings[1..] {
        let own = slots(ring);
        let shared = own.intersection(&earlier).count();
        let fusion = if shared == 1 {
            Fusion::Spiro
        } else if own.is_disjoint(&base_slots) {
            Fusion::Chained
        } else if own.contains(&first) {
            Fusion::StartSharing
        } else if own.contains(&last) {
            Fusion::Endpoint
        } else if own.iter().next_back().copied().unwrap_or(0) > base_max {
            Fusion::Extending
        } else {
            Fusion::Inside
        };
        earlier.extend(own);
        result.push((ring.number(), fusion));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{serialize, Node};

    fn smiles(fused: FusedRing) -> String {
        serialize(&Node::FusedRing(fused)).unwrap()
    }

    fn ring(atom: &str, size: usize, number: u16) -> Ring {
        Ring::new(atom, size).unwrap().with_number(number).unwrap()
    }

    #[test]
    fn test_arrange_naphthalene() {
        let fused = arrange(vec![ring("c", 6, 1), ring("c", 6, 2).with_offset(3)]).unwrap();
        assert_eq!(smiles(fused.clone()), "c1ccc2ccccc2c1");
        assert_eq!(fused.rings()[1].positions(), Some(&[3, 4, 5, 6, 7, 8][..]));
        assert_eq!(fused.rings()[0].positions(), Some(&[0, 1, 2, 3, 8, 9][..]));
        assert_eq!(
            classify(&fused),
            vec![(1, Fusion::Base), (2, Fusion::Inside)]
        );
    }

    #[test]
    fn test_arrange_renumbers_clashes() {
        let fused = arrange(vec![ring("C", 6, 1), ring("C", 5, 1).with_offset(2)]).unwrap();
        assert_eq!(fused.rings()[1].number(), 2);
        assert_eq!(smiles(fused), "C1CC2CCCC2CCC1");
    }

    #[test]
    fn test_arrange_closure_edge_hangs_off() {
        // Fusing on the base ring's closing edge (slot 5 to slot 0).
        let fused = arrange(vec![ring("C", 6, 1), ring("C", 5, 2).with_offset(5)]).unwrap();
        assert_eq!(smiles(fused.clone()), "C12CCCCC1CCC2");
        assert_eq!(classify(&fused)[1].1, Fusion::Endpoint);
    }

    #[test]
    fn test_spiro() {
        let mut arrangement = Arrangement::from_base(&ring("C", 6, 1));
        let fusion = arrangement.place(ring("C", 5, 2), 3, Share::Atom).unwrap();
        assert_eq!(fusion, Fusion::Spiro);
        let fused = arrangement.finish().unwrap();
        assert_eq!(smiles(fused.clone()), "C1CCC2(CCCC2)CC1");
        assert_eq!(classify(&fused)[1].1, Fusion::Spiro);
    }

    #[test]
    fn test_sequential_rings() {
        let base = FusedRing::new(vec![ring("c", 6, 1)]).unwrap();
        let mut arrangement = Arrangement::from_fused(&base).unwrap();
        arrangement
            .append_sequential(&[
                SequentialRing::new(ring("C", 3, 1)).with_linker(["C"]),
                SequentialRing::new(ring("N", 3, 1)).at_depth(1),
            ])
            .unwrap();
        let fused = arrangement.finish().unwrap();
        assert_eq!(smiles(fused), "c1ccccc1CC2CC2(N3NN3)");
    }

    #[test]
    fn test_sequential_depth_must_not_skip() {
        let base = FusedRing::new(vec![ring("c", 6, 1)]).unwrap();
        let mut arrangement = Arrangement::from_fused(&base).unwrap();
        let err = arrangement
            .append_sequential(&[SequentialRing::new(ring("C", 3, 2)).at_depth(2)])
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Operation(OperationError::InvalidDepth { depth: 2, max: 1, .. })
        ));
    }

    #[test]
    fn test_window_conversion_keeps_text() {
        let fused = ring("C", 10, 1).fuse(2, ring("C", 6, 2)).unwrap();
        let window = smiles(fused.clone());
        let laid_out = Arrangement::from_fused(&fused).unwrap().finish().unwrap();
        assert_eq!(smiles(laid_out), window);
        assert_eq!(window, "C1CC2CCCCC2CC1");
    }

    #[test]
    fn test_placed_rings_close_in_number_order() {
        let fused = ring("C", 6, 5).fuse(3, ring("C", 3, 2)).unwrap();
        let laid_out = Arrangement::from_fused(&fused).unwrap().finish().unwrap();
        assert_eq!(smiles(laid_out), "C5CCC2CC25");
    }
}
