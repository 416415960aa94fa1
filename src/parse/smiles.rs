//! Token protocol: turns the token stream into a chain tree that records
//! every atom, bond, branch and ring-bond digit exactly as written.

use super::tokenizer::{Spanned, Token, Tokenizer};
use crate::{Bond, Config, ParseError, Result};
use std::collections::BTreeMap;

/// One atom of the chain tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChainAtom {
    pub value: String,
    pub offset: usize,
    pub parent: Option<usize>,
    /// Bond marker written in front of the atom (`.` included).
    pub bond: Option<Bond>,
    /// Opened a parenthesized branch of its parent.
    pub branch: bool,
    pub branches: Vec<usize>,
    pub next: Option<usize>,
    /// Ring closures whose digit follows this atom, in writing order.
    pub marks: Vec<usize>,
}

/// A matched pair of ring-bond digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Closure {
    pub number: u16,
    pub open: usize,
    pub close: usize,
    pub bond: Option<Bond>,
    /// Offset of the opening digit.
    pub offset: usize,
}

/// Atoms in writing order; atom 0 is the root and every parent precedes
/// its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChainTree {
    pub atoms: Vec<ChainAtom>,
    pub closures: Vec<Closure>,
}

const UNRESOLVED: usize = usize::MAX;

/// Parse a SMILES string into its chain tree.
pub(crate) fn parse_chain(smiles: &str, config: &Config) -> Result<ChainTree> {
    let mut atoms: Vec<ChainAtom> = Vec::new();
    let mut closures: Vec<Closure> = Vec::new();
    let mut current: Option<usize> = None;
    let mut pending: Option<(Bond, usize)> = None;
    // (anchor atom, offset of '(')
    let mut branch_stack: Vec<(usize, usize)> = Vec::new();
    let mut branch_open = false;
    // number -> (atom, written bond, offset of digit, index into the atom's marks)
    let mut ring_map: BTreeMap<u16, (usize, Option<Bond>, usize, usize)> = BTreeMap::new();

    for token in Tokenizer::new(smiles) {
        let Spanned { token, offset, .. } = token?;
        match token {
            Token::Atom(value) => {
                let index = atoms.len();
                let bond = pending.take().map(|(bond, _)| bond);
                atoms.push(ChainAtom {
                    value,
                    offset,
                    parent: current,
                    bond,
                    branch: branch_open,
                    branches: Vec::new(),
                    next: None,
                    marks: Vec::new(),
                });
                if let Some(parent) = current {
                    if branch_open {
                        atoms[parent].branches.push(index);
                    } else {
                        atoms[parent].next = Some(index);
                    }
                }
                branch_open = false;
                current = Some(index);
            }
            Token::Bond(bond) => {
                if pending.is_some() {
                    return Err(ParseError::ConsecutiveBonds { offset }.into());
                }
                if current.is_none() {
                    return Err(ParseError::BondWithoutAtom { offset }.into());
                }
                pending = Some((bond, offset));
            }
            Token::Dot => {
                if pending.is_some() {
                    return Err(ParseError::ConsecutiveBonds { offset }.into());
                }
                if current.is_none() {
                    return Err(ParseError::DotWithoutAtom { offset }.into());
                }
                pending = Some((Bond::Dot, offset));
            }
            Token::BranchOpen => {
                if let Some((_, at)) = pending {
                    return Err(ParseError::DanglingBond { offset: at }.into());
                }
                // Start of a branch: remember the atom it hangs off.
                let anchor = match current {
                    Some(atom) if !branch_open => atom,
                    _ => return Err(ParseError::BranchWithoutAtom { offset }.into()),
                };
                config.check_depth(branch_stack.len() + 1, "parsing branches")?;
                branch_stack.push((anchor, offset));
                branch_open = true;
            }
            Token::BranchClose => {
                if let Some((_, at)) = pending {
                    return Err(ParseError::DanglingBond { offset: at }.into());
                }
                if branch_open {
                    return Err(ParseError::EmptyBranch { offset }.into());
                }
                let (anchor, _) = branch_stack
                    .pop()
                    .ok_or(ParseError::UnmatchedBranchClose { offset })?;
                current = Some(anchor);
            }
            Token::RingBond(number) => {
                let atom = match current {
                    Some(atom) if !branch_open => atom,
                    _ => return Err(ParseError::RingWithoutAtom { number, offset }.into()),
                };
                let bond = pending.take().map(|(bond, _)| bond);
                if bond == Some(Bond::Dot) {
                    return Err(ParseError::RingAcrossDot { number, offset }.into());
                }
                match ring_map.remove(&number) {
                    Some((open, open_bond, open_offset, mark)) => {
                        if open == atom {
                            return Err(ParseError::SelfClosingRing { number, offset }.into());
                        }
                        let bond = match (open_bond, bond) {
                            (Some(a), Some(b)) if a != b => {
                                return Err(ParseError::RingBondConflict { number, offset }.into())
                            }
                            (a, b) => b.or(a),
                        };
                        let index = closures.len();
                        closures.push(Closure {
                            number,
                            open,
                            close: atom,
                            bond,
                            offset: open_offset,
                        });
                        atoms[open].marks[mark] = index;
                        atoms[atom].marks.push(index);
                    }
                    None => {
                        let mark = atoms[atom].marks.len();
                        atoms[atom].marks.push(UNRESOLVED);
                        ring_map.insert(number, (atom, bond, offset, mark));
                    }
                }
            }
        }
    }

    if let Some((_, at)) = pending {
        return Err(ParseError::DanglingBond { offset: at }.into());
    }
    if let Some(&(_, at)) = branch_stack.last() {
        return Err(ParseError::UnclosedBranch { offset: at }.into());
    }
    if let Some((&number, &(_, _, at, _))) = ring_map.iter().next() {
        return Err(ParseError::UnclosedRing { number, offset: at }.into());
    }
    if atoms.is_empty() {
        return Err(ParseError::Empty.into());
    }
    Ok(ChainTree { atoms, closures })
}

impl ChainTree {
    /// Atoms on the tree path from `a` to `b`, both included.
    pub fn tree_path(&self, a: usize, b: usize) -> Vec<usize> {
        let (mut up_a, mut up_b) = (vec![a], vec![b]);
        let (mut x, mut y) = (a, b);
        // Parents precede children, so the larger index is never the ancestor.
        while x != y {
            if x > y {
                match self.atoms[x].parent {
                    Some(parent) => x = parent,
                    None => break,
                }
                up_a.push(x);
            } else {
                match self.atoms[y].parent {
                    Some(parent) => y = parent,
                    None => break,
                }
                up_b.push(y);
            }
        }
        // The common ancestor is already the last atom of `up_a`.
        up_b.pop();
        up_a.extend(up_b.into_iter().rev());
        up_a
    }

    /// Bond on the tree edge between neighbours `u` and `v`.
    pub fn edge_bond(&self, u: usize, v: usize) -> Option<Bond> {
        if self.atoms[u].parent == Some(v) {
            self.atoms[u].bond
        } else {
            self.atoms[v].bond
        }
    }
}
