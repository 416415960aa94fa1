//! Ring inference: which atoms form each ring, and which rings fuse.
//!
//! Every ring closure is a ring. Closures whose tree paths share an atom
//! belong to one ring system. Inside a system the atoms of a closure's ring
//! are the shortest path between its two ends that uses tree bonds and
//! the closures already assigned, shorter closures first. This gives the
//! two six-membered rings of naphthalene rather than a ten-membered
//! envelope, and independent rings for bridged systems.

use super::smiles::ChainTree;
use crate::{Bond, ParseError, Result};
use petgraph::algo::astar;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeFiltered;
use std::collections::{BTreeMap, BTreeSet};
use tracing::*;

/// Atoms joined by one or more fused ring closures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RingSystem {
    /// Member atoms in writing order; the first is the root.
    pub atoms: Vec<usize>,
    /// Closure indices ordered by their opening atom.
    pub closures: Vec<usize>,
    /// Ring atoms per closure (same order), from the opening to the closing atom.
    pub rings: Vec<Vec<usize>>,
}

impl RingSystem {
    pub fn root(&self) -> usize {
        self.atoms[0]
    }
}

/// All ring systems of a chain tree, ordered by root atom, plus the
/// system each atom belongs to.
pub(crate) fn ring_systems(tree: &ChainTree) -> Result<(Vec<RingSystem>, Vec<Option<usize>>)> {
    let closures = &tree.closures;
    let mut paths = Vec::with_capacity(closures.len());
    for closure in closures {
        let path = tree.tree_path(closure.open, closure.close);
        for pair in path.windows(2) {
            if tree.edge_bond(pair[0], pair[1]) == Some(Bond::Dot) {
                return Err(ParseError::RingAcrossDot {
                    number: closure.number,
                    offset: closure.offset,
                }
                .into());
            }
        }
        if path.len() < 3 {
            return Err(ParseError::RingTooSmall {
                number: closure.number,
                offset: closure.offset,
                size: path.len(),
            }
            .into());
        }
        paths.push(path);
    }

    // Closures sharing any atom fuse into one system.
    let mut groups = UnionFind::<usize>::new(closures.len());
    let mut first_closure: BTreeMap<usize, usize> = BTreeMap::new();
    for (index, path) in paths.iter().enumerate() {
        for &atom in path {
            match first_closure.get(&atom) {
                Some(&other) => {
                    groups.union(index, other);
                }
                None => {
                    first_closure.insert(atom, index);
                }
            }
        }
    }
    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for index in 0..closures.len() {
        members.entry(groups.find(index)).or_default().push(index);
    }

    let mut systems: Vec<RingSystem> = members
        .into_values()
        .map(|group| build_system(tree, &paths, group))
        .collect();
    systems.sort_by_key(RingSystem::root);

    let mut system_of = vec![None; tree.atoms.len()];
    for (index, system) in systems.iter().enumerate() {
        for &atom in &system.atoms {
            system_of[atom] = Some(index);
        }
    }
    debug!(
        "Found {} ring systems from {} ring closures",
        systems.len(),
        closures.len()
    );
    Ok((systems, system_of))
}

fn build_system(tree: &ChainTree, paths: &[Vec<usize>], mut group: Vec<usize>) -> RingSystem {
    group.sort_by_key(|&c| (tree.closures[c].open, tree.closures[c].close));
    let atoms: BTreeSet<usize> = group.iter().flat_map(|&c| paths[c].iter().copied()).collect();

    // Tree bonds carry no weight, closure bonds their closure index.
    let mut graph: UnGraph<usize, Option<usize>> = UnGraph::new_undirected();
    let node_of: BTreeMap<usize, NodeIndex> = atoms
        .iter()
        .map(|&atom| (atom, graph.add_node(atom)))
        .collect();
    for &atom in &atoms {
        if let Some(parent) = tree.atoms[atom].parent {
            if let Some(&parent_node) = node_of.get(&parent) {
                graph.add_edge(parent_node, node_of[&atom], None);
            }
        }
    }
    for &c in &group {
        let closure = &tree.closures[c];
        graph.add_edge(node_of[&closure.open], node_of[&closure.close], Some(c));
    }

    // Any extra atom costs more than every closure bond together.
    let step = graph.edge_count() + 1;
    let mut order = group.clone();
    order.sort_by_key(|&c| (paths[c].len(), tree.closures[c].open));
    let mut assigned: BTreeSet<usize> = BTreeSet::new();
    let mut rings: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &c in &order {
        let closure = &tree.closures[c];
        let usable = EdgeFiltered::from_fn(&graph, |edge| match edge.weight() {
            None => true,
            Some(other) => assigned.contains(other),
        });
        let found = astar(
            &usable,
            node_of[&closure.open],
            |node| node == node_of[&closure.close],
            |edge| if edge.weight().is_some() { step + 1 } else { step },
            |_| 0,
        );
        let ring = match found {
            Some((_, nodes)) => nodes.into_iter().map(|node| graph[node]).collect(),
            None => paths[c].clone(),
        };
        rings.insert(c, ring);
        assigned.insert(c);
    }

    // Every member atom must sit on some ring; fall back to tree paths.
    loop {
        let covered: BTreeSet<usize> = rings.values().flatten().copied().collect();
        let Some(&missing) = atoms.iter().find(|atom| !covered.contains(atom)) else {
            break;
        };
        let Some(&c) = order
            .iter()
            .find(|&&c| paths[c].contains(&missing) && rings[&c] != paths[c])
        else {
            break;
        };
        warn!("Atom {missing} is on no shortest ring; using the tree path of closure {c}");
        rings.insert(c, paths[c].clone());
    }

    RingSystem {
        atoms: atoms.into_iter().collect(),
        rings: group.iter().map(|c| rings[c].clone()).collect(),
        closures: group,
    }
}
