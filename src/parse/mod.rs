//! SMILES parsing.
//!
//! Parsing runs in three passes: the [`tokenizer`] splits the input, the
//! chain pass records atoms, branches and ring-bond digits as written, and
//! ring inference groups ring closures into ring systems before the
//! structural tree is built.

pub mod tokenizer;

mod build;
mod rings;
mod smiles;

use crate::{Config, Node, Result};
use tracing::*;

/// Parse a SMILES string with the default [`Config`].
pub fn parse(smiles: &str) -> Result<Node> {
    parse_with(smiles, &Config::default())
}

/// Parse a SMILES string into its structural tree.
///
/// # Errors
///
/// Fails with a lex or parse error carrying the byte offset of the
/// offending token, or a depth error when branches nest deeper than
/// `config.max_depth`.
pub fn parse_with(smiles: &str, config: &Config) -> Result<Node> {
    let tree = smiles::parse_chain(smiles, config)?;
    let (systems, system_of) = rings::ring_systems(&tree)?;
    let node = build::Builder {
        tree: &tree,
        systems: &systems,
        system_of: &system_of,
        config,
    }
    .build()?;
    debug!(
        "Parsed {smiles} into a {} node ({} atoms, {} ring systems)",
        node.kind(),
        tree.atoms.len(),
        systems.len()
    );
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{serialize, Bond, Error, Linear, ParseError, Ring};

    fn round(smiles: &str) -> String {
        serialize(&parse(smiles).unwrap()).unwrap()
    }

    #[test]
    fn test_parse_benzene() {
        let node = parse("c1ccccc1").unwrap();
        let ring = node.as_ring().expect("a single ring");
        assert_eq!(ring.size(), 6);
        assert_eq!(ring.atom(), "c");
        assert_eq!(ring.number(), 1);
        assert!(ring.substitutions().is_empty());
        assert_eq!(round("c1ccccc1"), "c1ccccc1");
    }

    #[test]
    fn test_parse_branch() {
        let node = parse("CC(=O)C").unwrap();
        let chain = node.as_linear().expect("a chain");
        assert_eq!(chain.atoms(), &["C", "C", "C"]);
        let oxo = chain.attachments()[&2][0].as_linear().expect("a chain");
        assert_eq!(oxo.atoms(), &["O"]);
        assert_eq!(oxo.entry_bond(), Some(Bond::Double));
        assert_eq!(round("CC(=O)C"), "CC(=O)C");
    }

    #[test]
    fn test_parse_naphthalene() {
        let node = parse("c1ccc2ccccc2c1").unwrap();
        let fused = node.as_fused_ring().expect("a fused ring");
        assert_eq!(fused.rings().len(), 2);
        assert!(fused.rings().iter().all(|ring| ring.size() == 6));
        assert_eq!(fused.rings()[0].positions(), Some(&[0, 1, 2, 3, 8, 9][..]));
        assert_eq!(fused.rings()[1].positions(), Some(&[3, 4, 5, 6, 7, 8][..]));
        assert_eq!(round("c1ccc2ccccc2c1"), "c1ccc2ccccc2c1");
    }

    #[test]
    fn test_parse_chain_then_ring() {
        let node = parse("CCCc1ccccc1").unwrap();
        let molecule = node.as_molecule().expect("a molecule");
        assert_eq!(molecule.len(), 2);
        assert_eq!(
            molecule.get_component(0).unwrap(),
            &Node::Linear(Linear::new(["C", "C", "C"]).unwrap())
        );
        assert_eq!(
            molecule.get_component(1).unwrap(),
            &Node::Ring(Ring::new("c", 6).unwrap())
        );
        assert_eq!(round("CCCc1ccccc1"), "CCCc1ccccc1");
    }

    #[test]
    fn test_parse_substituted_ring() {
        let node = parse("c1ccncc1").unwrap();
        let ring = node.as_ring().unwrap();
        assert_eq!(ring.atom(), "c");
        assert_eq!(ring.atom_at(4), Some("n"));
        assert_eq!(round("c1ccncc1"), "c1ccncc1");
    }

    #[test]
    fn test_ring_bonds_are_kept() {
        for smiles in ["C1=CCCCC1", "C1CCCCC=1", "OC(=O)C1CC1"] {
            assert_eq!(round(smiles), smiles);
        }
        // A bond written on the opening digit moves to the closing one.
        assert_eq!(round("C=1CC1"), "C1CC=1");
    }

    #[test]
    fn test_dot_components() {
        let node = parse("CC.[Na+]").unwrap();
        let molecule = node.as_molecule().unwrap();
        assert_eq!(molecule.len(), 2);
        assert_eq!(molecule.components()[1].entry_bond(), Some(Bond::Dot));
        assert_eq!(round("CC.[Na+]"), "CC.[Na+]");
    }

    #[test]
    fn test_ring_inside_branch() {
        for smiles in ["CC(C)C1CCC(CC1)O", "CC(c1ccccc1)C", "C1CCC(CC1)C"] {
            assert_eq!(round(smiles), smiles);
        }
    }

    #[test]
    fn test_parse_errors_reach_the_caller() {
        assert!(matches!(parse(""), Err(Error::Parse(ParseError::Empty))));
        assert!(matches!(parse("C1CC"), Err(Error::Parse(ParseError::UnclosedRing { .. }))));
        assert!(matches!(parse("C1C1"), Err(Error::Parse(ParseError::RingTooSmall { .. }))));
        assert_eq!(parse("C[NH3").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("C{}", "(C".repeat(40) + &")".repeat(40));
        assert!(parse(&deep).is_ok());
        let err = parse_with(&deep, &Config::with_max_depth(8)).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_default_depth_fits_a_small_thread() {
        let depth = crate::DEFAULT_MAX_DEPTH;
        let deep = format!("C{}{}", "(C".repeat(depth), ")".repeat(depth));
        let worker = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || {
                let node = parse(&deep).unwrap();
                assert_eq!(serialize(&node).unwrap(), deep);
            })
            .unwrap();
        worker.join().unwrap();

        let deeper = format!("C{}{}", "(C".repeat(depth + 1), ")".repeat(depth + 1));
        assert_eq!(parse(&deeper).unwrap_err().exit_code(), 5);
    }
}
