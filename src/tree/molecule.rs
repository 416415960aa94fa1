use super::Node;
use crate::{OperationError, Result};
use std::sync::Arc;

/// Components written one after another. A component separated by `.`
/// carries `Bond::Dot` as its entry bond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Molecule {
    components: Vec<Arc<Node>>,
}

impl Molecule {
    pub fn new(components: Vec<Node>) -> Result<Self> {
        if components.is_empty() {
            return Err(OperationError::Empty { op: "Molecule::new" }.into());
        }
        Ok(Molecule {
            components: components.into_iter().map(Arc::new).collect(),
        })
    }

    pub(crate) fn from_arcs(components: Vec<Arc<Node>>) -> Self {
        Molecule { components }
    }

    pub fn components(&self) -> &[Arc<Node>] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component at a 0-based index.
    pub fn get_component(&self, index: usize) -> Result<&Node> {
        self.components
            .get(index)
            .map(Arc::as_ref)
            .ok_or_else(|| {
                OperationError::ComponentOutOfRange {
                    op: "Molecule::get_component",
                    index,
                    len: self.components.len(),
                }
                .into()
            })
    }

    pub fn append(&self, node: impl Into<Node>) -> Self {
        let mut components = self.components.clone();
        components.push(Arc::new(node.into()));
        Molecule { components }
    }

    pub fn prepend(&self, node: impl Into<Node>) -> Self {
        let mut components = Vec::with_capacity(self.components.len() + 1);
        components.push(Arc::new(node.into()));
        components.extend(self.components.iter().cloned());
        Molecule { components }
    }

    pub fn replace_component(&self, index: usize, node: impl Into<Node>) -> Result<Self> {
        if index >= self.components.len() {
            return Err(OperationError::ComponentOutOfRange {
                op: "Molecule::replace_component",
                index,
                len: self.components.len(),
            }
            .into());
        }
        let mut components = self.components.clone();
        components[index] = Arc::new(node.into());
        Ok(Molecule { components })
    }

    /// Append `other`; a molecule is spliced in component by component.
    pub fn concat(&self, other: impl Into<Node>) -> Self {
        match other.into() {
            Node::Molecule(other) => {
                let mut components = self.components.clone();
                components.extend(other.components.iter().cloned());
                Molecule { components }
            }
            other => self.append(other),
        }
    }

    pub(crate) fn with_first(&self, first: Node) -> Self {
        let mut components = self.components.clone();
        if let Some(slot) = components.first_mut() {
            *slot = Arc::new(first);
        }
        Molecule { components }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bond, Error, Linear, Ring};

    fn ethyl() -> Node {
        Linear::new(["C", "C"]).unwrap().into()
    }

    #[test]
    fn test_append_prepend_share_children() {
        let molecule = Molecule::new(vec![ethyl()]).unwrap();
        let longer = molecule.append(Ring::new("c", 6).unwrap());
        assert_eq!(molecule.len(), 1);
        assert_eq!(longer.len(), 2);
        assert!(Arc::ptr_eq(&molecule.components()[0], &longer.components()[0]));
        let front = longer.prepend(Linear::new(["N"]).unwrap());
        assert_eq!(front.get_component(0).unwrap().kind(), "Linear");
        assert_eq!(front.get_component(2).unwrap().kind(), "Ring");
    }

    #[test]
    fn test_component_errors() {
        let molecule = Molecule::new(vec![ethyl()]).unwrap();
        assert!(matches!(
            molecule.get_component(3),
            Err(Error::Operation(OperationError::ComponentOutOfRange { index: 3, len: 1, .. }))
        ));
        assert!(molecule.replace_component(1, ethyl()).is_err());
        assert!(Molecule::new(vec![]).is_err());
    }

    #[test]
    fn test_replace_and_concat() {
        let salt = Linear::new(["[Na+]"]).unwrap().with_entry_bond(Some(Bond::Dot));
        let molecule = Molecule::new(vec![ethyl(), salt.into()]).unwrap();
        let replaced = molecule.replace_component(0, Ring::new("C", 3).unwrap()).unwrap();
        assert_eq!(replaced.get_component(0).unwrap().kind(), "Ring");
        let joined = molecule.concat(replaced.clone());
        assert_eq!(joined.len(), 4);
    }
}
