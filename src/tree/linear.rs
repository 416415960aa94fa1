use super::{attach_to, check_atom, check_bonds, check_position, Attachments, Molecule, Node};
use crate::{Bond, OperationError, Result};
use std::sync::Arc;

/// An open chain of atoms, e.g. `CCO`.
///
/// `bonds[i]` is the marker written between `atoms[i]` and `atoms[i + 1]`.
/// Attachments are keyed by 1-based atom position and emitted in
/// parentheses right after that atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Linear {
    atoms: Vec<String>,
    bonds: Vec<Option<Bond>>,
    entry: Option<Bond>,
    attachments: Attachments,
}

impl Linear {
    pub fn new<I, S>(atoms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let atoms: Vec<String> = atoms.into_iter().map(Into::into).collect();
        if atoms.is_empty() {
            return Err(OperationError::Empty { op: "Linear::new" }.into());
        }
        for atom in &atoms {
            check_atom("Linear::new", atom)?;
        }
        let bonds = vec![None; atoms.len() - 1];
        Ok(Linear {
            atoms,
            bonds,
            entry: None,
            attachments: Attachments::new(),
        })
    }

    /// Replace the inner bond markers; needs exactly `len() - 1` entries.
    pub fn with_bonds(&self, bonds: Vec<Option<Bond>>) -> Result<Self> {
        check_bonds("Linear::with_bonds", &bonds, self.atoms.len() - 1)?;
        Ok(Linear {
            bonds,
            ..self.clone()
        })
    }

    pub fn with_entry_bond(&self, entry: Option<Bond>) -> Self {
        Linear {
            entry,
            ..self.clone()
        }
    }

    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Option<Bond>] {
        &self.bonds
    }

    pub fn entry_bond(&self) -> Option<Bond> {
        self.entry
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Hang `subtree` off the atom at `position`, after any existing attachments there.
    pub fn attach(&self, position: usize, subtree: impl Into<Node>) -> Result<Self> {
        check_position("Linear::attach", position, self.len())?;
        Ok(Linear {
            attachments: attach_to(&self.attachments, position, [subtree.into()]),
            ..self.clone()
        })
    }

    /// Attach several subtrees at once, in order.
    pub fn branch<I>(&self, position: usize, subtrees: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        check_position("Linear::branch", position, self.len())?;
        Ok(Linear {
            attachments: attach_to(
                &self.attachments,
                position,
                subtrees.into_iter().map(Into::into),
            ),
            ..self.clone()
        })
    }

    /// Append another node. Two chains merge into one chain unless the
    /// other starts with a `.`; anything else yields a molecule.
    pub fn concat(&self, other: impl Into<Node>) -> Node {
        match other.into() {
            Node::Linear(other) if other.entry != Some(Bond::Dot) => {
                let offset = self.atoms.len();
                let mut merged = self.clone();
                merged.atoms.extend(other.atoms.iter().cloned());
                merged.bonds.push(other.entry);
                merged.bonds.extend(other.bonds.iter().copied());
                for (position, subtrees) in &other.attachments {
                    merged
                        .attachments
                        .entry(position + offset)
                        .or_default()
                        .extend(subtrees.iter().cloned());
                }
                Node::Linear(merged)
            }
            other => Node::Molecule(Molecule::from_arcs(vec![
                Arc::new(Node::Linear(self.clone())),
                Arc::new(other),
            ])),
        }
    }

    pub(crate) fn from_parts(
        atoms: Vec<String>,
        bonds: Vec<Option<Bond>>,
        entry: Option<Bond>,
        attachments: Attachments,
    ) -> Self {
        Linear {
            atoms,
            bonds,
            entry,
            attachments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_attach_is_pure() {
        let chain = Linear::new(["C", "C", "C"]).unwrap();
        let oxo = Linear::new(["O"]).unwrap().with_entry_bond(Some(Bond::Double));
        let ketone = chain.attach(2, oxo.clone()).unwrap();
        assert!(chain.attachments().is_empty());
        assert_eq!(ketone.attachments()[&2], vec![Arc::new(Node::Linear(oxo))]);
    }

    #[test]
    fn test_attach_order_is_kept() {
        let chain = Linear::new(["C", "C"]).unwrap();
        let a = Linear::new(["N"]).unwrap();
        let b = Linear::new(["O"]).unwrap();
        let both = chain.attach(1, a.clone()).unwrap().attach(1, b.clone()).unwrap();
        let branched = chain.branch(1, [a, b]).unwrap();
        assert_eq!(both, branched);
        assert_eq!(both.attachments()[&1].len(), 2);
    }

    #[test]
    fn test_attach_out_of_range() {
        let chain = Linear::new(["C", "C"]).unwrap();
        let err = chain.attach(3, Linear::new(["O"]).unwrap()).unwrap_err();
        assert_eq!(
            err,
            Error::Operation(OperationError::PositionOutOfRange {
                op: "Linear::attach",
                position: 3,
                len: 2
            })
        );
        assert!(chain.attach(0, Linear::new(["O"]).unwrap()).is_err());
    }

    #[test]
    fn test_invalid_atoms() {
        assert!(Linear::new(["C", "Xx"]).is_err());
        assert!(Linear::new(Vec::<String>::new()).is_err());
        assert!(Linear::new(["[NH4+]"]).is_ok());
    }

    #[test]
    fn test_with_bonds_checks_length() {
        let chain = Linear::new(["C", "C", "C"]).unwrap();
        assert!(chain.with_bonds(vec![Some(Bond::Double)]).is_err());
        assert!(chain
            .with_bonds(vec![Some(Bond::Double), Some(Bond::Dot)])
            .is_err());
        let chain = chain.with_bonds(vec![Some(Bond::Double), None]).unwrap();
        assert_eq!(chain.bonds(), &[Some(Bond::Double), None]);
    }

    #[test]
    fn test_concat_merges_chains() {
        let a = Linear::new(["C", "C"]).unwrap();
        let b = Linear::new(["O"]).unwrap().with_entry_bond(Some(Bond::Single));
        let b = b.attach(1, Linear::new(["N"]).unwrap()).unwrap();
        match a.concat(b) {
            Node::Linear(merged) => {
                assert_eq!(merged.atoms(), &["C", "C", "O"]);
                assert_eq!(merged.bonds(), &[None, Some(Bond::Single)]);
                assert!(merged.attachments().contains_key(&3));
            }
            other => panic!("expected a chain, got {other:?}"),
        }
        let salt = Linear::new(["Cl"]).unwrap().with_entry_bond(Some(Bond::Dot));
        assert!(matches!(a.concat(salt), Node::Molecule(_)));
    }
}
