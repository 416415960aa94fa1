//! Decompiler: emits Rust source that rebuilds a tree through the builder
//! API of this crate.
//!
//! Every node becomes one `let` binding named after its kind and a counter
//! local to the call (`ring1`, `linear2`, ...). Children are bound before
//! their parents. The last line binds the whole tree to `node`.
//!
//! With metadata the fused-ring layouts are written out literally, so the
//! rebuilt tree serializes exactly like the original. Without it, laid-out
//! systems are rebuilt with [`FusedRing::arrange`] from their true ring
//! sizes, which may write complex systems differently.

use crate::{Attachments, Bond, Config, FusedRing, Layout, Linear, Molecule, Node, Result, Ring};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use tracing::*;

/// Decompile with the default [`Config`].
pub fn decompile(node: &Node, include_metadata: bool) -> Result<String> {
    decompile_with(node, include_metadata, &Config::default())
}

pub fn decompile_with(node: &Node, include_metadata: bool, config: &Config) -> Result<String> {
    let mut decompiler = Decompiler {
        config,
        metadata: include_metadata,
        counter: 0,
        lines: Vec::new(),
    };
    let root = decompiler.node(node, 0)?;
    decompiler.lines.push(format!("let node = Node::from({root});"));
    trace!(
        "Decompiled {} node into {} bindings",
        node.kind(),
        decompiler.counter
    );
    let mut source = decompiler.lines.join("\n");
    source.push('\n');
    Ok(source)
}

fn bond(bond: Option<Bond>) -> String {
    match bond {
        Some(bond) => format!("Some(Bond::{})", bond.variant_name()),
        None => "None".to_string(),
    }
}

fn bond_list(bonds: &[Option<Bond>]) -> String {
    let bonds: Vec<String> = bonds.iter().map(|&b| bond(b)).collect();
    format!("vec![{}]", bonds.join(", "))
}

fn list<T: Debug>(items: impl IntoIterator<Item = T>) -> String {
    let items: Vec<String> = items.into_iter().map(|item| format!("{item:?}")).collect();
    items.join(", ")
}

fn map<K: Debug, V>(map: &BTreeMap<K, V>, value: impl Fn(&V) -> String) -> String {
    if map.is_empty() {
        return "BTreeMap::new()".to_string();
    }
    let entries: Vec<String> = map
        .iter()
        .map(|(key, v)| format!("({key:?}, {})", value(v)))
        .collect();
    format!("BTreeMap::from([{}])", entries.join(", "))
}

fn set(set: &BTreeSet<usize>) -> String {
    if set.is_empty() {
        return "BTreeSet::new()".to_string();
    }
    format!("BTreeSet::from([{}])", list(set))
}

struct Decompiler<'a> {
    config: &'a Config,
    metadata: bool,
    counter: usize,
    lines: Vec<String>,
}

impl Decompiler<'_> {
    fn name(&mut self, kind: &str) -> String {
        self.counter += 1;
        format!("{kind}{}", self.counter)
    }

    /// Bind `node` and return the name of its binding.
    fn node(&mut self, node: &Node, depth: usize) -> Result<String> {
        self.config.check_depth(depth, "decompiling")?;
        match node {
            Node::Linear(linear) => self.linear(linear, depth),
            Node::Ring(ring) => {
                let expr = self.ring(ring, depth)?;
                let name = self.name("ring");
                self.lines.push(format!("let {name} = {expr};"));
                Ok(name)
            }
            Node::FusedRing(fused) => self.fused(fused, depth),
            Node::Molecule(molecule) => self.molecule(molecule, depth),
        }
    }

    /// `.attach(..)` calls for every attachment, children bound first.
    fn attachments(&mut self, attachments: &Attachments, depth: usize) -> Result<String> {
        let mut calls = String::new();
        for (position, subtrees) in attachments {
            for subtree in subtrees {
                let child = self.node(subtree, depth + 1)?;
                calls.push_str(&format!(".attach({position}, {child})?"));
            }
        }
        Ok(calls)
    }

    fn linear(&mut self, linear: &Linear, depth: usize) -> Result<String> {
        let attach = self.attachments(linear.attachments(), depth)?;
        let mut expr = format!("Linear::new([{}])?", list(linear.atoms()));
        if linear.bonds().iter().any(Option::is_some) {
            expr.push_str(&format!(".with_bonds({})?", bond_list(linear.bonds())));
        }
        if linear.entry_bond().is_some() {
            expr.push_str(&format!(".with_entry_bond({})", bond(linear.entry_bond())));
        }
        expr.push_str(&attach);
        let name = self.name("linear");
        self.lines.push(format!("let {name} = {expr};"));
        Ok(name)
    }

    /// Builder expression for a ring; `Ring` values inside a fused ring are
    /// never bound on their own.
    fn ring(&mut self, ring: &Ring, depth: usize) -> Result<String> {
        let attach = self.attachments(ring.attachments(), depth)?;
        let mut expr = format!("Ring::new({:?}, {})?", ring.atom(), ring.size());
        if ring.number() != 1 {
            expr.push_str(&format!(".with_number({})?", ring.number()));
        }
        match ring.positions() {
            Some(positions) if self.metadata => {
                expr.push_str(&format!(".with_positions(vec![{}])?", list(positions)));
            }
            _ if ring.offset() != 0 => expr.push_str(&format!(".with_offset({})", ring.offset())),
            _ => {}
        }
        if !ring.substitutions().is_empty() {
            let substitutions: Vec<String> = ring
                .substitutions()
                .iter()
                .map(|(position, atom)| format!("({position}, {atom:?})"))
                .collect();
            expr.push_str(&format!(".with_substitutions([{}])?", substitutions.join(", ")));
        }
        if ring.bonds().iter().any(Option::is_some) {
            expr.push_str(&format!(".with_bonds({})?", bond_list(ring.bonds())));
        }
        if ring.entry_bond().is_some() {
            expr.push_str(&format!(".with_entry_bond({})", bond(ring.entry_bond())));
        }
        expr.push_str(&attach);
        Ok(expr)
    }

    fn layout(&mut self, layout: &Layout) -> String {
        let name = self.name("layout");
        let args = [
            format!("vec![{}]", list(layout.all_positions())),
            map(layout.branch_depth(), |depth| depth.to_string()),
            set(layout.branch_starts()),
            map(layout.ring_order(), |order| format!("vec![{}]", list(order))),
            map(layout.atom_values(), |value| format!("{value:?}.to_string()")),
            map(layout.bonds(), |b| format!("Bond::{}", b.variant_name())),
        ];
        self.lines.push(format!("let {name} = Layout::new({});", args.join(", ")));
        name
    }

    fn fused(&mut self, fused: &FusedRing, depth: usize) -> Result<String> {
        let mut rings = Vec::with_capacity(fused.rings().len());
        for ring in fused.rings() {
            rings.push(self.ring(ring, depth)?);
        }
        let rings = format!("vec![{}]", rings.join(", "));
        let mut expr = match fused.layout() {
            Some(layout) if self.metadata => {
                let layout = self.layout(layout);
                format!("FusedRing::with_layout({rings}, {layout})?")
            }
            Some(_) => format!("FusedRing::arrange({rings})?"),
            None => format!("FusedRing::new({rings})?"),
        };
        if fused.entry_bond().is_some() {
            expr.push_str(&format!(".with_entry_bond({})", bond(fused.entry_bond())));
        }
        let name = self.name("fused");
        self.lines.push(format!("let {name} = {expr};"));
        Ok(name)
    }

    fn molecule(&mut self, molecule: &Molecule, depth: usize) -> Result<String> {
        let mut components = Vec::with_capacity(molecule.len());
        for component in molecule.components() {
            let child = self.node(component, depth + 1)?;
            components.push(format!("{child}.into()"));
        }
        let name = self.name("molecule");
        self.lines.push(format!(
            "let {name} = Molecule::new(vec![{}])?;",
            components.join(", ")
        ));
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_decompile_ring() {
        let pyridine = Ring::new("c", 6).unwrap().substitute(1, "n").unwrap();
        assert_eq!(
            decompile(&pyridine.into(), true).unwrap(),
            "let ring1 = Ring::new(\"c\", 6)?.with_substitutions([(1, \"n\")])?;\n\
             let node = Node::from(ring1);\n"
        );
    }

    #[test]
    fn test_children_are_bound_first() {
        let source = decompile(&parse("CC(=O)C").unwrap(), true).unwrap();
        assert_eq!(
            source,
            "let linear1 = Linear::new([\"O\"])?.with_entry_bond(Some(Bond::Double));\n\
             let linear2 = Linear::new([\"C\", \"C\", \"C\"])?.attach(2, linear1)?;\n\
             let node = Node::from(linear2);\n"
        );
    }

    #[test]
    fn test_molecule_components() {
        let source = decompile(&parse("CCc1ccccc1.[Na+]").unwrap(), false).unwrap();
        let lines: Vec<&str> = source.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "let ring2 = Ring::new(\"c\", 6)?;");
        assert_eq!(
            lines[2],
            "let linear3 = Linear::new([\"[Na+]\"])?.with_entry_bond(Some(Bond::Dot));"
        );
        assert_eq!(
            lines[3],
            "let molecule4 = Molecule::new(vec![linear1.into(), ring2.into(), linear3.into()])?;"
        );
    }

    #[test]
    fn test_fused_ring_metadata_modes() {
        let naphthalene = parse("c1ccc2ccccc2c1").unwrap();
        let with = decompile(&naphthalene, true).unwrap();
        assert!(with.contains("let layout1 = Layout::new(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9], "));
        assert!(with.contains(".with_positions(vec![3, 4, 5, 6, 7, 8])?"));
        assert!(with.contains("FusedRing::with_layout(vec!["));
        let without = decompile(&naphthalene, false).unwrap();
        assert!(!without.contains("Layout::new"));
        assert!(without.contains(
            "let fused1 = FusedRing::arrange(vec![Ring::new(\"c\", 6)?, \
             Ring::new(\"c\", 6)?.with_number(2)?.with_offset(3)])?;"
        ));
    }

    #[test]
    fn test_depth_limit() {
        let mut node: Node = Linear::new(["C"]).unwrap().into();
        for _ in 0..6 {
            node = Linear::new(["C"]).unwrap().attach(1, node).unwrap().into();
        }
        assert!(decompile_with(&node, true, &Config::with_max_depth(3)).is_err());
        assert!(decompile(&node, true).is_ok());
    }
}
