//! SMILES generation from the structural tree.
//!
//! Chains, plain rings and molecules are written directly. Fused ring
//! systems go through [`interleaved`], either slot by slot over their
//! windows or by replaying their explicit layout.

mod interleaved;

use crate::bond::push_bond;
use crate::{format_ring_number, Attachments, Bond, Config, Linear, Node, Result, Ring, SerializeError, MAX_RING_NUMBER};
use std::collections::BTreeSet;
use tracing::*;

/// Serialize a tree to SMILES with the default [`Config`].
pub fn serialize(node: &Node) -> Result<String> {
    serialize_with(node, &Config::default())
}

pub fn serialize_with(node: &Node, config: &Config) -> Result<String> {
    let mut writer = Writer::new(config);
    writer.node(node, false, 0)?;
    trace!("Serialized {} node to {}", node.kind(), writer.out);
    Ok(writer.out)
}

/// Ring-bond numbers currently open in the output. A ring keeps its own
/// number unless that number is still open, then it takes the lowest free one.
#[derive(Debug, Default)]
pub(crate) struct RingNumbers {
    open: BTreeSet<u16>,
}

impl RingNumbers {
    pub fn open(&mut self, preferred: u16) -> Result<u16, SerializeError> {
        let number = if self.open.contains(&preferred) {
            (1..=MAX_RING_NUMBER)
                .find(|n| !self.open.contains(n))
                .ok_or(SerializeError::RingNumbersExhausted)?
        } else {
            preferred
        };
        self.open.insert(number);
        Ok(number)
    }

    pub fn close(&mut self, number: u16) {
        self.open.remove(&number);
    }
}

/// Ring-bond labels written after one atom.
#[derive(Debug, Default)]
pub(crate) struct Labels {
    labels: Vec<(Option<Bond>, u16)>,
}

impl Labels {
    pub fn push(&mut self, bond: Option<Bond>, number: u16) {
        self.labels.push((bond, number));
    }

    /// `%NN` followed by a bare digit would read as `%NNN`; single digits
    /// go first whenever that would happen.
    pub fn write(self, out: &mut String) {
        let mut labels = self.labels;
        let ambiguous = labels.windows(2).any(|pair| {
            (10..=99).contains(&pair[0].1) && pair[1].0.is_none() && (1..=9).contains(&pair[1].1)
        });
        if ambiguous {
            labels.sort_by_key(|(_, number)| !(1..=9).contains(number));
        }
        for (bond, number) in labels {
            push_bond(out, bond);
            out.push_str(&format_ring_number(number));
        }
    }
}

pub(crate) struct Writer<'a> {
    config: &'a Config,
    pub out: String,
    pub numbers: RingNumbers,
}

impl<'a> Writer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Writer {
            config,
            out: String::new(),
            numbers: RingNumbers::default(),
        }
    }

    /// Write `node`; its entry bond only when something precedes it.
    pub fn node(&mut self, node: &Node, with_entry: bool, depth: usize) -> Result<()> {
        self.config.check_depth(depth, "serializing")?;
        match node {
            Node::Linear(linear) => self.linear(linear, with_entry, depth),
            Node::Ring(ring) => self.ring(ring, with_entry, depth),
            Node::FusedRing(fused) => match fused.layout() {
                Some(layout) => self.laid_out(fused, layout, with_entry, depth),
                None => self.windows(fused, with_entry, depth),
            },
            Node::Molecule(molecule) => {
                for (i, component) in molecule.components().iter().enumerate() {
                    self.node(component, with_entry || i > 0, depth + 1)?;
                }
                Ok(())
            }
        }
    }

    pub fn attachments(&mut self, attachments: &Attachments, position: usize, depth: usize) -> Result<()> {
        if let Some(subtrees) = attachments.get(&position) {
            for subtree in subtrees {
                self.out.push('(');
                self.node(subtree, true, depth + 1)?;
                self.out.push(')');
            }
        }
        Ok(())
    }

    fn linear(&mut self, linear: &Linear, with_entry: bool, depth: usize) -> Result<()> {
        if with_entry {
            push_bond(&mut self.out, linear.entry_bond());
        }
        for (i, atom) in linear.atoms().iter().enumerate() {
            if i > 0 {
                push_bond(&mut self.out, linear.bonds()[i - 1]);
            }
            self.out.push_str(atom);
            self.attachments(linear.attachments(), i + 1, depth)?;
        }
        Ok(())
    }

    fn ring(&mut self, ring: &Ring, with_entry: bool, depth: usize) -> Result<()> {
        let size = ring.size();
        if size < 3 {
            return Err(SerializeError::InvalidRingSize {
                number: ring.number(),
                size,
            }
            .into());
        }
        if with_entry {
            push_bond(&mut self.out, ring.entry_bond());
        }
        let number = self.numbers.open(ring.number())?;
        for position in 1..=size {
            if position > 1 {
                push_bond(&mut self.out, ring.bonds()[position - 2]);
            }
            self.out.push_str(ring.atom_at(position).unwrap_or(ring.atom()));
            let mut labels = Labels::default();
            if position == 1 {
                labels.push(None, number);
            }
            if position == size {
                labels.push(ring.closure_bond(), number);
                self.numbers.close(number);
            }
            labels.write(&mut self.out);
            self.attachments(ring.attachments(), position, depth)?;
        }
        Ok(())
    }
}
