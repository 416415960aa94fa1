use super::{attach_to, check_atom, check_bonds, check_position, Attachments, FusedRing, Molecule, Node};
use crate::{Bond, OperationError, Result, MAX_RING_NUMBER};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A simple ring of `size` atoms, all `atom` except where substituted.
///
/// Positions are 1-based along the ring traversal. Position 1 carries the
/// opening ring-bond digit and position `size` the closing one.
/// `bonds[i]` is the marker written before position `i + 2`; the last entry
/// is the closure bond, written just before the closing digit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    atom: String,
    size: usize,
    number: u16,
    offset: usize,
    substitutions: BTreeMap<usize, String>,
    attachments: Attachments,
    bonds: Vec<Option<Bond>>,
    entry: Option<Bond>,
    positions: Option<Vec<usize>>,
}

impl Ring {
    /// A ring of `size` identical atoms with ring-bond number 1.
    pub fn new(atom: impl Into<String>, size: usize) -> Result<Self> {
        let atom = atom.into();
        check_atom("Ring::new", &atom)?;
        if size < 3 {
            return Err(OperationError::InvalidSize { op: "Ring::new", size }.into());
        }
        Ok(Ring {
            atom,
            size,
            number: 1,
            offset: 0,
            substitutions: BTreeMap::new(),
            attachments: Attachments::new(),
            bonds: vec![None; size],
            entry: None,
            positions: None,
        })
    }

    pub fn with_number(&self, number: u16) -> Result<Self> {
        if number == 0 || number > MAX_RING_NUMBER {
            return Err(OperationError::InvalidRingNumber {
                op: "Ring::with_number",
                number: number as usize,
            }
            .into());
        }
        Ok(Ring {
            number,
            ..self.clone()
        })
    }

    pub fn with_offset(&self, offset: usize) -> Self {
        Ring {
            offset,
            ..self.clone()
        }
    }

    /// Replace all ring bonds; needs exactly `size` entries, the last being the closure bond.
    pub fn with_bonds(&self, bonds: Vec<Option<Bond>>) -> Result<Self> {
        check_bonds("Ring::with_bonds", &bonds, self.size)?;
        Ok(Ring {
            bonds,
            ..self.clone()
        })
    }

    pub fn with_entry_bond(&self, entry: Option<Bond>) -> Self {
        Ring {
            entry,
            ..self.clone()
        }
    }

    /// Global slot of every position, as recorded in a fused-ring layout.
    pub fn with_positions(&self, positions: Vec<usize>) -> Result<Self> {
        if positions.len() != self.size {
            return Err(OperationError::InvalidLayout {
                op: "Ring::with_positions",
                reason: format!(
                    "ring {} has {} atoms but {} positions",
                    self.number,
                    self.size,
                    positions.len()
                ),
            }
            .into());
        }
        Ok(Ring {
            offset: positions[0],
            positions: Some(positions),
            ..self.clone()
        })
    }

    pub fn with_substitutions<I, S>(&self, substitutions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        self.substitute_multiple(substitutions)
    }

    pub fn atom(&self) -> &str {
        &self.atom
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn substitutions(&self) -> &BTreeMap<usize, String> {
        &self.substitutions
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    pub fn bonds(&self) -> &[Option<Bond>] {
        &self.bonds
    }

    pub fn closure_bond(&self) -> Option<Bond> {
        self.bonds[self.size - 1]
    }

    pub fn entry_bond(&self) -> Option<Bond> {
        self.entry
    }

    pub fn positions(&self) -> Option<&[usize]> {
        self.positions.as_deref()
    }

    /// Atom written at `position`: its substitution, else the base atom.
    pub fn atom_at(&self, position: usize) -> Option<&str> {
        if position == 0 || position > self.size {
            return None;
        }
        Some(
            self.substitutions
                .get(&position)
                .map(String::as_str)
                .unwrap_or(&self.atom),
        )
    }

    pub fn attach(&self, position: usize, subtree: impl Into<Node>) -> Result<Self> {
        check_position("Ring::attach", position, self.size)?;
        Ok(Ring {
            attachments: attach_to(&self.attachments, position, [subtree.into()]),
            ..self.clone()
        })
    }

    /// Replace the atom at `position`. Substituting the base atom removes
    /// the override, so `substitute(p, base)` undoes any earlier substitution.
    pub fn substitute(&self, position: usize, atom: impl Into<String>) -> Result<Self> {
        self.substitute_multiple([(position, atom)])
    }

    pub fn substitute_multiple<I, S>(&self, substitutions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, S)>,
        S: Into<String>,
    {
        let mut ring = self.clone();
        for (position, atom) in substitutions {
            let atom = atom.into();
            check_position("Ring::substitute", position, self.size)?;
            check_atom("Ring::substitute", &atom)?;
            if atom == ring.atom {
                ring.substitutions.remove(&position);
            } else {
                ring.substitutions.insert(position, atom);
            }
        }
        Ok(ring)
    }

    /// Fuse `other` onto this ring with window semantics: `other` covers
    /// slots `offset..offset + other.size()` of the combined traversal.
    /// A clashing ring-bond number on `other` is replaced by a free one.
    pub fn fuse(&self, offset: usize, other: Ring) -> Result<FusedRing> {
        FusedRing::new(vec![self.with_offset(0)])?.add_ring(offset, other)
    }

    /// Rings never merge with their neighbour; the result is always a molecule.
    pub fn concat(&self, other: impl Into<Node>) -> Node {
        Node::Molecule(Molecule::from_arcs(vec![
            Arc::new(Node::Ring(self.clone())),
            Arc::new(other.into()),
        ]))
    }

    /// Window end: the last slot this ring covers in a window-style fused ring.
    pub(crate) fn end(&self) -> usize {
        self.offset + self.size - 1
    }

    pub(crate) fn with_number_unchecked(&self, number: u16) -> Self {
        Ring {
            number,
            ..self.clone()
        }
    }

    pub(crate) fn with_closure_bond(&self, bond: Option<Bond>) -> Self {
        let mut ring = self.clone();
        ring.bonds[self.size - 1] = bond;
        ring
    }

    pub(crate) fn without_positions(&self) -> Self {
        Ring {
            positions: None,
            ..self.clone()
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        atom: String,
        number: u16,
        substitutions: BTreeMap<usize, String>,
        attachments: Attachments,
        bonds: Vec<Option<Bond>>,
        entry: Option<Bond>,
        positions: Option<Vec<usize>>,
    ) -> Self {
        let size = bonds.len();
        let offset = positions.as_ref().map_or(0, |p| p[0]);
        Ring {
            atom,
            size,
            number,
            offset,
            substitutions,
            attachments,
            bonds,
            entry,
            positions,
        }
    }
}

/// Most frequent atom in `values`; ties go to the one seen first.
pub(crate) fn base_atom(values: &[&str]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match counts.iter().position(|(atom, _)| atom == value) {
            Some(i) => counts[i].1 += 1,
            None => counts.push((*value, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (atom, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((atom, count));
        }
    }
    best.map(|(atom, _)| atom.to_string()).unwrap_or_default()
}
