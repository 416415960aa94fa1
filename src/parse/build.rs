//! Turns a chain tree and its ring systems into the structural tree.
//!
//! Open chains become [`Linear`] nodes, single rings written straight
//! through become [`Ring`] nodes, and every other ring system becomes a
//! [`FusedRing`] carrying the layout it was written in. A chain that runs
//! into a ring system, or a ring system followed by more atoms, yields a
//! [`Molecule`] of the pieces in writing order.

use super::rings::RingSystem;
use super::smiles::ChainTree;
use crate::layout::SlotTree;
use crate::tree::base_atom;
use crate::{Attachments, Bond, Config, FusedRing, Linear, Molecule, Node, ParseError, Result, Ring};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::*;

pub(crate) struct Builder<'a> {
    pub tree: &'a ChainTree,
    pub systems: &'a [RingSystem],
    pub system_of: &'a [Option<usize>],
    pub config: &'a Config,
}

/// Branch subtrees built so far, keyed by the atom that starts them.
#[derive(Default)]
struct Subtrees {
    built: BTreeMap<usize, Arc<Node>>,
    /// Branch starts (and their depth) the last chain could not attach yet.
    missing: Vec<(usize, usize)>,
}

impl Builder<'_> {
    /// Branches are built before the chain holding them, off an explicit
    /// work stack, so nesting depth costs heap rather than call frames.
    pub fn build(&self) -> Result<Node> {
        let mut subtrees = Subtrees::default();
        let mut work = vec![(0, 0)];
        while let Some(&(start, depth)) = work.last() {
            let node = self.chain(start, depth, &mut subtrees)?;
            if subtrees.missing.is_empty() {
                work.pop();
                subtrees.built.insert(start, Arc::new(node));
            } else {
                trace!("Chain at atom {start} waits on {} branches", subtrees.missing.len());
                work.append(&mut subtrees.missing);
            }
        }
        let root = subtrees.built.remove(&0).ok_or(ParseError::Empty)?;
        Ok(Arc::try_unwrap(root).unwrap_or_else(|root| (*root).clone()))
    }

    /// Every piece from `start` to the end of its branch (or the input).
    /// Incomplete while `subtrees.missing` is non-empty afterwards.
    fn chain(&self, start: usize, depth: usize, subtrees: &mut Subtrees) -> Result<Node> {
        self.config.check_depth(depth, "building the tree")?;
        let mut components = Vec::new();
        let mut cursor = Some(start);
        while let Some(atom) = cursor {
            // Ring systems are always entered at their first atom.
            let (node, next) = match self.system_of[atom] {
                Some(system) => self.system(system, depth, subtrees)?,
                None => self.linear(atom, depth, subtrees)?,
            };
            components.push(node);
            cursor = next;
        }
        if components.len() == 1 {
            return Ok(components.remove(0));
        }
        Ok(Node::Molecule(Molecule::from_arcs(
            components.into_iter().map(Arc::new).collect(),
        )))
    }

    fn attach(
        attachments: &mut Attachments,
        position: usize,
        start: usize,
        depth: usize,
        subtrees: &mut Subtrees,
    ) {
        match subtrees.built.get(&start) {
            Some(subtree) => attachments.entry(position).or_default().push(Arc::clone(subtree)),
            None => subtrees.missing.push((start, depth + 1)),
        }
    }

    fn linear(&self, start: usize, depth: usize, subtrees: &mut Subtrees) -> Result<(Node, Option<usize>)> {
        let atoms = &self.tree.atoms;
        let mut values = Vec::new();
        let mut bonds = Vec::new();
        let mut attachments = Attachments::new();
        let mut atom = start;
        loop {
            values.push(atoms[atom].value.clone());
            for &branch in &atoms[atom].branches {
                Self::attach(&mut attachments, values.len(), branch, depth, subtrees);
            }
            match atoms[atom].next {
                Some(next) if self.system_of[next].is_none() && atoms[next].bond != Some(Bond::Dot) => {
                    bonds.push(atoms[next].bond);
                    atom = next;
                }
                next => {
                    let linear = Linear::from_parts(values, bonds, atoms[start].bond, attachments);
                    return Ok((linear.into(), next));
                }
            }
        }
    }

    fn system(&self, index: usize, depth: usize, subtrees: &mut Subtrees) -> Result<(Node, Option<usize>)> {
        let system = &self.systems[index];
        match self.simple_ring(system, depth, subtrees)? {
            Some(built) => Ok(built),
            None => self.fused_ring(index, system, depth, subtrees),
        }
    }

    /// A lone ring written from its opening atom straight to its closing
    /// atom, with nothing but that ring's digit on either end.
    fn simple_ring(
        &self,
        system: &RingSystem,
        depth: usize,
        subtrees: &mut Subtrees,
    ) -> Result<Option<(Node, Option<usize>)>> {
        let atoms = &self.tree.atoms;
        let &[index] = system.closures.as_slice() else {
            return Ok(None);
        };
        let path = &system.rings[0];
        let (first, last) = (path[0], path[path.len() - 1]);
        let straight = first == system.root()
            && path.windows(2).all(|pair| atoms[pair[0]].next == Some(pair[1]));
        if !straight || atoms[first].marks != [index] || atoms[last].marks != [index] {
            return Ok(None);
        }

        let closure = &self.tree.closures[index];
        let values: Vec<&str> = path.iter().map(|&atom| atoms[atom].value.as_str()).collect();
        let base = base_atom(&values);
        let substitutions = values
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != base)
            .map(|(i, value)| (i + 1, value.to_string()))
            .collect();
        let mut bonds: Vec<Option<Bond>> = path[1..].iter().map(|&atom| atoms[atom].bond).collect();
        bonds.push(closure.bond);
        let mut attachments = Attachments::new();
        for (i, &atom) in path.iter().enumerate() {
            for &branch in &atoms[atom].branches {
                Self::attach(&mut attachments, i + 1, branch, depth, subtrees);
            }
        }
        let ring = Ring::from_parts(
            base,
            closure.number,
            substitutions,
            attachments,
            bonds,
            atoms[first].bond,
            None,
        );
        Ok(Some((ring.into(), atoms[last].next)))
    }

    /// The atoms from `start` to the end of its branch, if they form one
    /// unbranched chain outside every ring system.
    fn plain_tail(&self, start: usize) -> Option<Vec<usize>> {
        let atoms = &self.tree.atoms;
        let mut tail = Vec::new();
        let mut cursor = Some(start);
        while let Some(atom) = cursor {
            if self.system_of[atom].is_some()
                || atoms[atom].bond == Some(Bond::Dot)
                || !atoms[atom].branches.is_empty()
            {
                return None;
            }
            tail.push(atom);
            cursor = atoms[atom].next;
        }
        Some(tail)
    }

    /// Bond between ring neighbours `u` and `v`: the tree bond when one is
    /// the other's parent, else the bond of the closure joining them.
    fn ring_bond(&self, system: &RingSystem, u: usize, v: usize) -> Option<Bond> {
        let atoms = &self.tree.atoms;
        if atoms[u].parent == Some(v) || atoms[v].parent == Some(u) {
            return self.tree.edge_bond(u, v);
        }
        system
            .closures
            .iter()
            .map(|&c| &self.tree.closures[c])
            .find(|c| (c.open, c.close) == (u, v) || (c.open, c.close) == (v, u))
            .and_then(|c| c.bond)
    }

    fn fused_ring(
        &self,
        index: usize,
        system: &RingSystem,
        depth: usize,
        subtrees: &mut Subtrees,
    ) -> Result<(Node, Option<usize>)> {
        let atoms = &self.tree.atoms;
        let member = |atom: usize| self.system_of[atom] == Some(index);
        let ring_of: BTreeMap<usize, usize> = system
            .closures
            .iter()
            .enumerate()
            .map(|(k, &c)| (c, k))
            .collect();

        // Member atoms keep the branch structure they were written with.
        let mut slots = SlotTree::new();
        let mut atom_of = vec![system.root()];
        let mut node_of = BTreeMap::from([(system.root(), slots.root)]);
        let mut stack = vec![system.root()];
        while let Some(atom) = stack.pop() {
            let node = node_of[&atom];
            slots.nodes[node].marks = atoms[atom].marks.iter().map(|c| ring_of[c]).collect();
            for &child in atoms[atom].branches.iter().chain(&atoms[atom].next) {
                if !member(child) {
                    continue;
                }
                let child_node = slots.add(atoms[child].bond);
                if atoms[child].branch {
                    slots.push_branch(node, child_node);
                } else {
                    slots.set_next(node, child_node);
                }
                atom_of.push(child);
                node_of.insert(child, child_node);
                stack.push(child);
            }
        }

        let values: Vec<Vec<&str>> = system
            .rings
            .iter()
            .map(|ring| ring.iter().map(|&atom| atoms[atom].value.as_str()).collect())
            .collect();
        let bases: Vec<String> = values.iter().map(|v| base_atom(v)).collect();

        // Pin every atom the rings alone would write differently.
        for (&atom, &node) in &node_of {
            let covering: Vec<(usize, usize)> = system
                .rings
                .iter()
                .enumerate()
                .filter_map(|(k, ring)| ring.iter().position(|&a| a == atom).map(|i| (k, i)))
                .collect();
            let written = covering
                .iter()
                .find(|&&(k, i)| values[k][i] != bases[k])
                .map(|&(k, i)| values[k][i])
                .or_else(|| covering.first().map(|&(k, _)| bases[k].as_str()));
            let actual = atoms[atom].value.as_str();
            if written != Some(actual) {
                slots.nodes[node].value = Some(actual.to_string());
            }
        }

        // A plain chain ending a branch is written in place as ring-less slots.
        let exit = atom_of[slots.exit()];
        let mut tails = BTreeSet::new();
        for (&atom, &node) in &node_of {
            let Some(tail) = atoms[atom].next.filter(|_| atom != exit).and_then(|c| self.plain_tail(c)) else {
                continue;
            };
            let mut prev = node;
            for &linker in &tail {
                let linker_node = slots.add(atoms[linker].bond);
                slots.nodes[linker_node].value = Some(atoms[linker].value.clone());
                slots.set_next(prev, linker_node);
                prev = linker_node;
            }
            tails.insert(atom);
        }

        // Other outside atoms hang off the first ring through their atom,
        // except what follows the exit, which continues the molecule.
        let mut attachments = vec![Attachments::new(); system.rings.len()];
        for &atom in node_of.keys() {
            let mut outside: Vec<usize> = atoms[atom].branches.iter().copied().filter(|&c| !member(c)).collect();
            if atom != exit && !tails.contains(&atom) {
                outside.extend(atoms[atom].next.filter(|&c| !member(c)));
            }
            let owner = system
                .rings
                .iter()
                .enumerate()
                .find_map(|(k, ring)| ring.iter().position(|&a| a == atom).map(|i| (k, i + 1)));
            if let Some((k, position)) = owner {
                for child in outside {
                    Self::attach(&mut attachments[k], position, child, depth, subtrees);
                }
            }
        }

        let lin = slots.linearize();
        let mut rings = Vec::with_capacity(system.rings.len());
        for (k, (ring, attachments)) in system.rings.iter().zip(attachments).enumerate() {
            let closure = &self.tree.closures[system.closures[k]];
            let mut bonds: Vec<Option<Bond>> = ring
                .windows(2)
                .map(|pair| self.ring_bond(system, pair[0], pair[1]))
                .collect();
            bonds.push(closure.bond);
            let substitutions = values[k]
                .iter()
                .enumerate()
                .filter(|(_, value)| **value != bases[k])
                .map(|(i, value)| (i + 1, value.to_string()))
                .collect();
            let positions = ring.iter().map(|atom| lin.slot_of[node_of[atom]]).collect();
            rings.push(Ring::from_parts(
                bases[k].clone(),
                closure.number,
                substitutions,
                attachments,
                bonds,
                None,
                Some(positions),
            ));
        }

        debug!(
            "Built a fused ring system of {} rings over {} atoms",
            rings.len(),
            node_of.len()
        );
        let fused = FusedRing::with_layout(rings, slots.to_layout(&lin))?
            .with_entry_bond(atoms[system.root()].bond);
        Ok((fused.into(), atoms[exit].next))
    }
}
