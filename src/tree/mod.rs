//! The immutable structural tree: chains, rings, fused ring systems and
//! molecules. Every operation returns a new node; children are shared
//! between versions through `Arc`.

mod fused;
mod linear;
mod molecule;
mod ring;

pub use fused::*;
pub use linear::*;
pub use molecule::*;
pub use ring::*;

use crate::{is_valid_atom, Bond, Config, Error, OperationError, Result};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

/// Subtrees hung off an atom, keyed by 1-based position, in emission order.
pub type Attachments = BTreeMap<usize, Vec<Arc<Node>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Linear(Linear),
    Ring(Ring),
    FusedRing(FusedRing),
    Molecule(Molecule),
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Linear(_) => "Linear",
            Node::Ring(_) => "Ring",
            Node::FusedRing(_) => "FusedRing",
            Node::Molecule(_) => "Molecule",
        }
    }

    /// Bond marker written in front of this node's first atom.
    pub fn entry_bond(&self) -> Option<Bond> {
        match self {
            Node::Linear(linear) => linear.entry_bond(),
            Node::Ring(ring) => ring.entry_bond(),
            Node::FusedRing(fused) => fused.entry_bond(),
            Node::Molecule(molecule) => molecule
                .components()
                .first()
                .and_then(|first| first.entry_bond()),
        }
    }

    pub fn with_entry_bond(&self, entry: Option<Bond>) -> Node {
        match self {
            Node::Linear(linear) => Node::Linear(linear.with_entry_bond(entry)),
            Node::Ring(ring) => Node::Ring(ring.with_entry_bond(entry)),
            Node::FusedRing(fused) => Node::FusedRing(fused.with_entry_bond(entry)),
            Node::Molecule(molecule) => match molecule.components().first() {
                Some(first) => {
                    let first = first.with_entry_bond(entry);
                    Node::Molecule(molecule.with_first(first))
                }
                None => self.clone(),
            },
        }
    }

    pub fn attach(&self, position: usize, subtree: impl Into<Node>) -> Result<Node> {
        match self {
            Node::Linear(linear) => Ok(linear.attach(position, subtree)?.into()),
            Node::Ring(ring) => Ok(ring.attach(position, subtree)?.into()),
            other => Err(OperationError::WrongVariant {
                op: "attach",
                found: other.kind(),
            }
            .into()),
        }
    }

    pub fn substitute(&self, position: usize, atom: impl Into<String>) -> Result<Node> {
        match self {
            Node::Ring(ring) => Ok(ring.substitute(position, atom)?.into()),
            other => Err(OperationError::WrongVariant {
                op: "substitute",
                found: other.kind(),
            }
            .into()),
        }
    }

    pub fn concat(&self, other: impl Into<Node>) -> Node {
        match self {
            Node::Linear(linear) => linear.concat(other),
            Node::Ring(ring) => ring.concat(other),
            Node::FusedRing(fused) => fused.concat(other),
            Node::Molecule(molecule) => Node::Molecule(molecule.concat(other)),
        }
    }

    pub fn as_linear(&self) -> Option<&Linear> {
        match self {
            Node::Linear(linear) => Some(linear),
            _ => None,
        }
    }

    pub fn as_ring(&self) -> Option<&Ring> {
        match self {
            Node::Ring(ring) => Some(ring),
            _ => None,
        }
    }

    pub fn as_fused_ring(&self) -> Option<&FusedRing> {
        match self {
            Node::FusedRing(fused) => Some(fused),
            _ => None,
        }
    }

    pub fn as_molecule(&self) -> Option<&Molecule> {
        match self {
            Node::Molecule(molecule) => Some(molecule),
            _ => None,
        }
    }

    pub fn to_smiles(&self) -> Result<String> {
        crate::serialize(self)
    }

    pub fn to_smiles_with(&self, config: &Config) -> Result<String> {
        crate::serialize_with(self, config)
    }

    /// Structural equality that ignores which ring-bond numbers were chosen.
    /// Fused systems compare by how they are written, so a window-style
    /// system equals the laid-out system parsed back from its text.
    pub fn structurally_eq_up_to_numbering(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Linear(a), Node::Linear(b)) => {
                a.atoms() == b.atoms()
                    && a.bonds() == b.bonds()
                    && a.entry_bond() == b.entry_bond()
                    && attachments_eq(a.attachments(), b.attachments())
            }
            (Node::Ring(a), Node::Ring(b)) => {
                a.atom() == b.atom()
                    && a.offset() == b.offset()
                    && a.substitutions() == b.substitutions()
                    && a.bonds() == b.bonds()
                    && a.entry_bond() == b.entry_bond()
                    && a.positions() == b.positions()
                    && attachments_eq(a.attachments(), b.attachments())
            }
            (Node::FusedRing(a), Node::FusedRing(b)) => match (a.written_shape(), b.written_shape()) {
                (Ok(x), Ok(y)) => x.eq_up_to_numbering(&y),
                _ => a == b,
            },
            (Node::Molecule(a), Node::Molecule(b)) => {
                a.len() == b.len()
                    && a.components()
                        .iter()
                        .zip(b.components())
                        .all(|(x, y)| x.structurally_eq_up_to_numbering(y))
            }
            _ => false,
        }
    }
}

pub(crate) fn attachments_eq(a: &Attachments, b: &Attachments) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|((pa, sa), (pb, sb))| {
            pa == pb
                && sa.len() == sb.len()
                && sa.iter().zip(sb).all(|(x, y)| x.structurally_eq_up_to_numbering(y))
        })
}

impl From<Linear> for Node {
    fn from(linear: Linear) -> Self {
        Node::Linear(linear)
    }
}

impl From<Ring> for Node {
    fn from(ring: Ring) -> Self {
        Node::Ring(ring)
    }
}

impl From<FusedRing> for Node {
    fn from(fused: FusedRing) -> Self {
        Node::FusedRing(fused)
    }
}

impl From<Molecule> for Node {
    fn from(molecule: Molecule) -> Self {
        Node::Molecule(molecule)
    }
}

impl FromStr for Node {
    type Err = Error;

    fn from_str(smiles: &str) -> Result<Self> {
        crate::parse(smiles)
    }
}

pub(crate) fn check_atom(op: &'static str, atom: &str) -> Result<(), OperationError> {
    if is_valid_atom(atom) {
        Ok(())
    } else {
        Err(OperationError::InvalidAtom {
            op,
            atom: atom.to_string(),
        })
    }
}

pub(crate) fn check_position(op: &'static str, position: usize, len: usize) -> Result<(), OperationError> {
    if position == 0 || position > len {
        return Err(OperationError::PositionOutOfRange { op, position, len });
    }
    Ok(())
}

pub(crate) fn check_bonds(
    op: &'static str,
    bonds: &[Option<Bond>],
    expected: usize,
) -> Result<(), OperationError> {
    if bonds.len() != expected {
        return Err(OperationError::BondCount {
            op,
            expected,
            found: bonds.len(),
        });
    }
    if bonds.contains(&Some(Bond::Dot)) {
        return Err(OperationError::DotInsideNode { op });
    }
    Ok(())
}

/// Copy of `attachments` with `subtrees` appended at `position`.
pub(crate) fn attach_to<I>(attachments: &Attachments, position: usize, subtrees: I) -> Attachments
where
    I: IntoIterator<Item = Node>,
{
    let mut attachments = attachments.clone();
    attachments
        .entry(position)
        .or_default()
        .extend(subtrees.into_iter().map(Arc::new));
    attachments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_wrong_variant() {
        let chain: Node = Linear::new(["C", "C"]).unwrap().into();
        let err = chain.substitute(1, "N").unwrap_err();
        assert_eq!(
            err,
            Error::Operation(OperationError::WrongVariant {
                op: "substitute",
                found: "Linear"
            })
        );
        let molecule: Node = Molecule::new(vec![chain.clone()]).unwrap().into();
        assert!(molecule.attach(1, chain.clone()).is_err());
        assert!(chain.attach(1, Linear::new(["O"]).unwrap()).is_ok());
    }

    #[test]
    fn test_equality_up_to_numbering() {
        let a: Node = Ring::new("C", 6).unwrap().into();
        let b: Node = Ring::new("C", 6).unwrap().with_number(7).unwrap().into();
        assert_ne!(a, b);
        assert!(a.structurally_eq_up_to_numbering(&b));
        let c: Node = Ring::new("C", 5).unwrap().into();
        assert!(!a.structurally_eq_up_to_numbering(&c));
    }

    #[test]
    fn test_entry_bond_through_molecule() {
        let tail: Node = Linear::new(["O"]).unwrap().into();
        let molecule: Node = Molecule::new(vec![tail]).unwrap().into();
        let bonded = molecule.with_entry_bond(Some(Bond::Double));
        assert_eq!(bonded.entry_bond(), Some(Bond::Double));
        assert_eq!(molecule.entry_bond(), None);
    }
}
