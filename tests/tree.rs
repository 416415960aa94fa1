use smiles_tree::*;
use std::collections::{BTreeMap, BTreeSet};

fn ring(atom: &str, size: usize) -> Ring {
    Ring::new(atom, size).unwrap()
}

fn chain(atoms: &[&str]) -> Linear {
    Linear::new(atoms.iter().copied()).unwrap()
}

#[test]
fn test_operations_leave_the_original_alone() {
    let benzene = ring("c", 6);
    let pyridine = benzene.substitute(1, "n").unwrap();
    let phenol = benzene.attach(1, chain(&["O"])).unwrap();
    assert!(benzene.substitutions().is_empty());
    assert!(benzene.attachments().is_empty());
    assert_eq!(serialize(&benzene.clone().into()).unwrap(), "c1ccccc1");
    assert_eq!(serialize(&pyridine.into()).unwrap(), "n1ccccc1");
    assert_eq!(serialize(&phenol.into()).unwrap(), "c1(O)ccccc1");
}

#[test]
fn test_attachments_keep_call_order() {
    let node = chain(&["C", "C"])
        .attach(1, chain(&["O"]))
        .unwrap()
        .attach(1, chain(&["N"]))
        .unwrap();
    assert_eq!(serialize(&node.into()).unwrap(), "C(O)(N)C");
}

#[test]
fn test_substituting_the_base_atom_clears_the_position() {
    let pyrrolidine = ring("C", 5).substitute(1, "N").unwrap();
    let back = pyrrolidine.substitute(1, "C").unwrap();
    assert_eq!(back, ring("C", 5));
}

#[test]
fn test_out_of_range_operations() {
    let err = ring("C", 6).substitute(7, "N").unwrap_err();
    assert_eq!(err.exit_code(), 4);
    assert!(ring("C", 6).attach(0, chain(&["O"])).is_err());
    let molecule = Molecule::new(vec![chain(&["C"]).into()]).unwrap();
    assert!(molecule.get_component(1).is_err());
    assert!(Ring::new("C", 2).is_err());
    assert!(ring("C", 5).with_number(0).is_err());
    assert!(ring("C", 5).with_number(1000).is_err());
    assert!(Linear::new(["Xx"]).is_err());
}

#[test]
fn test_built_trees_parse_back_to_the_same_structure() {
    let built: Vec<Node> = vec![
        chain(&["C", "C", "C"])
            .attach(2, chain(&["O"]).with_entry_bond(Some(Bond::Double)))
            .unwrap()
            .into(),
        ring("c", 6).substitute(1, "n").unwrap().into(),
        ring("C", 6).attach(3, chain(&["O"])).unwrap().into(),
        ring("C", 6).attach(3, ring("C", 3)).unwrap().into(),
        Molecule::new(vec![chain(&["C", "C", "C"]).into(), ring("c", 6).into()])
            .unwrap()
            .into(),
        ring("C", 5).with_number(42).unwrap().into(),
        ring("C", 10).fuse(2, ring("C", 6).with_number(2).unwrap()).unwrap().into(),
        FusedRing::arrange(vec![ring("c", 6), ring("c", 6).with_number(2).unwrap().with_offset(3)])
            .unwrap()
            .into(),
        ring("C", 6).fuse(3, ring("C", 3).with_number(2).unwrap()).unwrap().into(),
    ];
    for node in built {
        let smiles = serialize(&node).unwrap();
        let parsed = parse(&smiles).unwrap();
        assert!(
            parsed.structurally_eq_up_to_numbering(&node),
            "{smiles} parsed as {parsed:#?}"
        );
    }
}

#[test]
fn test_fused_systems_survive_a_text_round_trip() {
    let naphthalene =
        FusedRing::arrange(vec![ring("c", 6), ring("c", 6).with_number(2).unwrap().with_offset(3)]).unwrap();
    let window = ring("C", 10).fuse(2, ring("C", 6).with_number(2).unwrap()).unwrap();
    for fused in [naphthalene, window] {
        let smiles = serialize(&fused.into()).unwrap();
        assert_eq!(normalize(&smiles).unwrap(), smiles);
    }
}

#[test]
fn test_sequential_rings_after_a_system() {
    let base = FusedRing::new(vec![ring("c", 6)]).unwrap();
    let extended = base
        .add_sequential_rings(vec![SequentialRing::new(ring("C", 3)).with_linker(["C"])])
        .unwrap();
    let smiles = serialize(&extended.into()).unwrap();
    assert_eq!(smiles, "c1ccccc1CC2CC2");
    assert!(is_valid_round_trip(&smiles));
}

#[test]
fn test_parse_through_from_str() {
    let node: Node = "CC(=O)O".parse().unwrap();
    assert_eq!(node.kind(), "Linear");
    assert!("C1CC".parse::<Node>().is_err());
}

#[test]
fn test_decompiled_source_names_the_root() {
    let node = parse("c1ccc2ccccc2c1").unwrap();
    let source = decompile(&node, true).unwrap();
    assert!(source.contains("FusedRing::with_layout"));
    let last = source.lines().last().unwrap();
    assert!(last.starts_with("let node = Node::from(fused"), "{last}");
    let source = decompile(&node, false).unwrap();
    assert!(source.contains("FusedRing::arrange"));
}

const NAPHTHALENE: &str = "c1ccc2ccccc2c1";

const NAPHTHALENE_WITH_LAYOUT: &str = "\
let layout1 = Layout::new(vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9], \
BTreeMap::from([(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0), (7, 0), (8, 0), (9, 0)]), \
BTreeSet::new(), BTreeMap::from([(0, vec![0]), (3, vec![1]), (8, vec![1]), (9, vec![0])]), \
BTreeMap::new(), BTreeMap::new());
let fused2 = FusedRing::with_layout(vec![Ring::new(\"c\", 6)?.with_positions(vec![0, 1, 2, 3, 8, 9])?, \
Ring::new(\"c\", 6)?.with_number(2)?.with_positions(vec![3, 4, 5, 6, 7, 8])?], layout1)?;
let node = Node::from(fused2);
";

fn naphthalene_with_layout() -> Result<Node> {
    let layout1 = Layout::new(
        vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
        BTreeMap::from([(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0), (7, 0), (8, 0), (9, 0)]),
        BTreeSet::new(),
        BTreeMap::from([(0, vec![0]), (3, vec![1]), (8, vec![1]), (9, vec![0])]),
        BTreeMap::new(),
        BTreeMap::new(),
    );
    let fused2 = FusedRing::with_layout(
        vec![
            Ring::new("c", 6)?.with_positions(vec![0, 1, 2, 3, 8, 9])?,
            Ring::new("c", 6)?.with_number(2)?.with_positions(vec![3, 4, 5, 6, 7, 8])?,
        ],
        layout1,
    )?;
    let node = Node::from(fused2);
    Ok(node)
}

const NAPHTHALENE_ARRANGED: &str = "\
let fused1 = FusedRing::arrange(vec![Ring::new(\"c\", 6)?, Ring::new(\"c\", 6)?.with_number(2)?.with_offset(3)])?;
let node = Node::from(fused1);
";

fn naphthalene_arranged() -> Result<Node> {
    let fused1 = FusedRing::arrange(vec![Ring::new("c", 6)?, Ring::new("c", 6)?.with_number(2)?.with_offset(3)])?;
    let node = Node::from(fused1);
    Ok(node)
}

const ACETONE: &str = "\
let linear1 = Linear::new([\"O\"])?.with_entry_bond(Some(Bond::Double));
let linear2 = Linear::new([\"C\", \"C\", \"C\"])?.attach(2, linear1)?;
let node = Node::from(linear2);
";

fn acetone() -> Result<Node> {
    let linear1 = Linear::new(["O"])?.with_entry_bond(Some(Bond::Double));
    let linear2 = Linear::new(["C", "C", "C"])?.attach(2, linear1)?;
    let node = Node::from(linear2);
    Ok(node)
}

#[test]
fn test_decompiled_source_rebuilds_the_tree() {
    let parsed = parse(NAPHTHALENE).unwrap();
    assert_eq!(decompile(&parsed, true).unwrap(), NAPHTHALENE_WITH_LAYOUT);
    let rebuilt = naphthalene_with_layout().unwrap();
    assert_eq!(rebuilt, parsed);
    assert_eq!(serialize(&rebuilt).unwrap(), NAPHTHALENE);

    assert_eq!(decompile(&parsed, false).unwrap(), NAPHTHALENE_ARRANGED);
    let rebuilt = naphthalene_arranged().unwrap();
    assert!(rebuilt.structurally_eq_up_to_numbering(&parsed));
    assert_eq!(serialize(&rebuilt).unwrap(), NAPHTHALENE);

    let parsed = parse("CC(=O)C").unwrap();
    for metadata in [true, false] {
        assert_eq!(decompile(&parsed, metadata).unwrap(), ACETONE);
    }
    assert_eq!(acetone().unwrap(), parsed);
}

