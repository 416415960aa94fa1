use super::{attachments_eq, Attachments, Molecule, Node};
use crate::layout::{self, slot_atom, Arrangement, Fusion, SequentialRing, Share};
use crate::{Bond, Layout, OperationError, Result, Ring, MAX_RING_NUMBER};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Rings sharing atoms.
///
/// Without a layout the rings are windows over one traversal: ring `r`
/// covers slots `r.offset()..=r.offset() + r.size() - 1` and each slot is
/// written once. A slot shows the first substitution any covering ring
/// makes there, else the base atom of the first covering ring.
/// With a layout (parsed systems, or systems built by the layout engine)
/// every ring lists its global slots and the layout says how to write them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusedRing {
    rings: Vec<Arc<Ring>>,
    layout: Option<Layout>,
    entry: Option<Bond>,
}

impl FusedRing {
    /// Window-style system. Rings are ordered by offset; the lowest must
    /// be 0 and every ring must start inside the slots covered before it.
    pub fn new(rings: Vec<Ring>) -> Result<Self> {
        let op = "FusedRing::new";
        if rings.is_empty() {
            return Err(OperationError::Empty { op }.into());
        }
        let mut rings: Vec<Ring> = rings.iter().map(Ring::without_positions).collect();
        rings.sort_by_key(Ring::offset);
        let mut covered_end = 0;
        for (i, ring) in rings.iter().enumerate() {
            if (i == 0 && ring.offset() != 0) || (i > 0 && ring.offset() > covered_end) {
                return Err(OperationError::InvalidOffset {
                    op,
                    offset: ring.offset(),
                }
                .into());
            }
            covered_end = covered_end.max(ring.end());
        }
        Ok(FusedRing {
            rings: rings.into_iter().map(Arc::new).collect(),
            layout: None,
            entry: None,
        })
    }

    /// Laid-out system; every ring needs positions matching the layout.
    pub fn with_layout(rings: Vec<Ring>, layout: Layout) -> Result<Self> {
        let rings: Vec<Arc<Ring>> = rings.into_iter().map(Arc::new).collect();
        layout
            .validate(&rings)
            .map_err(|reason| OperationError::InvalidLayout {
                op: "FusedRing::with_layout",
                reason,
            })?;
        Ok(FusedRing {
            rings,
            layout: Some(layout),
            entry: None,
        })
    }

    /// Interleave true-size rings with the layout engine. See [`layout::arrange`].
    pub fn arrange(rings: Vec<Ring>) -> Result<Self> {
        layout::arrange(rings)
    }

    pub(crate) fn from_parts(rings: Vec<Arc<Ring>>, layout: Option<Layout>, entry: Option<Bond>) -> Self {
        FusedRing {
            rings,
            layout,
            entry,
        }
    }

    pub fn with_entry_bond(&self, entry: Option<Bond>) -> Self {
        FusedRing {
            entry,
            ..self.clone()
        }
    }

    pub fn rings(&self) -> &[Arc<Ring>] {
        &self.rings
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn entry_bond(&self) -> Option<Bond> {
        self.entry
    }

    pub fn is_interleaved(&self) -> bool {
        self.layout.is_some()
    }

    /// Number of atoms written for the system.
    pub fn slot_count(&self) -> usize {
        match &self.layout {
            Some(layout) => layout.slot_count(),
            None => self.rings.iter().map(|r| r.end() + 1).max().unwrap_or(0),
        }
    }

    pub fn ring(&self, number: u16) -> Option<&Ring> {
        self.rings
            .iter()
            .find(|r| r.number() == number)
            .map(Arc::as_ref)
    }

    fn ring_index(&self, op: &'static str, number: u16) -> Result<usize> {
        self.rings
            .iter()
            .position(|r| r.number() == number)
            .ok_or_else(|| OperationError::UnknownRing { op, number }.into())
    }

    fn used_numbers(&self) -> BTreeSet<u16> {
        self.rings.iter().map(|r| r.number()).collect()
    }

    /// Fuse another ring. A window-style system takes `ring` as a window
    /// starting at slot `offset`; a laid-out system hands it to the layout
    /// engine, which shares an edge starting at slot `offset`.
    /// A clashing ring number is replaced by the lowest free one.
    pub fn add_ring(&self, offset: usize, ring: Ring) -> Result<Self> {
        if self.layout.is_some() {
            return self.place(offset, ring, Share::Edge);
        }
        let number = layout::free_number(&self.used_numbers(), ring.number())?;
        let mut rings: Vec<Ring> = self.rings.iter().map(|r| (**r).clone()).collect();
        rings.push(ring.with_number_unchecked(number).with_offset(offset));
        Ok(FusedRing {
            entry: self.entry,
            ..FusedRing::new(rings)?
        })
    }

    /// Add a ring sharing only the atom at slot `offset`.
    pub fn add_spiro_ring(&self, offset: usize, ring: Ring) -> Result<Self> {
        self.place(offset, ring, Share::Atom)
    }

    fn place(&self, offset: usize, ring: Ring, share: Share) -> Result<Self> {
        let mut arrangement = Arrangement::from_fused(self)?;
        arrangement.place(ring, offset, share)?;
        arrangement.finish()
    }

    /// Write further rings after the system, each behind an optional
    /// linker chain and at its own branch depth.
    pub fn add_sequential_rings(&self, sequence: Vec<SequentialRing>) -> Result<Self> {
        let mut arrangement = Arrangement::from_fused(self)?;
        arrangement.append_sequential(&sequence)?;
        arrangement.finish()
    }

    pub fn substitute_in_ring(&self, number: u16, position: usize, atom: impl Into<String>) -> Result<Self> {
        let index = self.ring_index("FusedRing::substitute_in_ring", number)?;
        let ring = self.rings[index].substitute(position, atom)?;
        // A laid-out slot may be written from another ring, so the new atom
        // is pinned in the layout; the last substitution of a slot wins.
        let layout = match (&self.layout, ring.positions()) {
            (Some(layout), Some(positions)) => {
                let value = ring.atom_at(position).map(str::to_string);
                Some(layout.with_atom_value(positions[position - 1], value))
            }
            (layout, _) => layout.clone(),
        };
        let mut rings = self.rings.clone();
        rings[index] = Arc::new(ring);
        Ok(FusedRing {
            rings,
            layout,
            entry: self.entry,
        })
    }

    pub fn attach_to_ring(&self, number: u16, position: usize, subtree: impl Into<Node>) -> Result<Self> {
        let index = self.ring_index("FusedRing::attach_to_ring", number)?;
        let mut rings = self.rings.clone();
        rings[index] = Arc::new(self.rings[index].attach(position, subtree)?);
        Ok(FusedRing {
            rings,
            ..self.clone()
        })
    }

    /// Number the rings `start`, `start + 1`, ... in ring order.
    pub fn renumber(&self, start: u16) -> Result<Self> {
        let last = start as usize + self.rings.len().saturating_sub(1);
        if start == 0 || last > MAX_RING_NUMBER as usize {
            return Err(OperationError::InvalidRingNumber {
                op: "FusedRing::renumber",
                number: if start == 0 { 0 } else { last },
            }
            .into());
        }
        let rings = self
            .rings
            .iter()
            .enumerate()
            .map(|(i, r)| Arc::new(r.with_number_unchecked(start + i as u16)))
            .collect();
        Ok(FusedRing {
            rings,
            ..self.clone()
        })
    }

    /// How each ring relates to the rings before it.
    pub fn classify(&self) -> Vec<(u16, Fusion)> {
        layout::classify(self)
    }

    pub fn concat(&self, other: impl Into<Node>) -> Node {
        Node::Molecule(Molecule::from_arcs(vec![
            Arc::new(Node::FusedRing(self.clone())),
            Arc::new(other.into()),
        ]))
    }

    /// The system as written, with ring numbers and ring membership left
    /// out. A window-style system is laid out first.
    pub(crate) fn written_shape(&self) -> Result<WrittenShape> {
        let laid_out = match self.layout {
            Some(_) => self.clone(),
            None => Arrangement::from_fused(self)?.finish()?,
        };
        let layout = laid_out.layout.clone().unwrap_or_default();

        let mut closures = Vec::with_capacity(laid_out.rings.len());
        let mut covering: BTreeMap<usize, Vec<(&Ring, usize)>> = BTreeMap::new();
        for ring in &laid_out.rings {
            let positions = ring.positions().unwrap_or_default();
            if let (Some(&first), Some(&last)) = (positions.first(), positions.last()) {
                closures.push((first, last, ring.closure_bond()));
            }
            for (i, &slot) in positions.iter().enumerate() {
                covering.entry(slot).or_default().push((&**ring, i + 1));
            }
        }
        closures.sort();

        let mut atoms = BTreeMap::new();
        let mut attachments = Attachments::new();
        for &slot in layout.all_positions() {
            let covering = covering.get(&slot).map(Vec::as_slice).unwrap_or_default();
            let atom = layout
                .atom_values()
                .get(&slot)
                .map(String::as_str)
                .or_else(|| slot_atom(covering));
            if let Some(atom) = atom {
                atoms.insert(slot, atom.to_string());
            }
            for (ring, position) in covering {
                if let Some(subtrees) = ring.attachments().get(position) {
                    attachments.entry(slot).or_default().extend(subtrees.iter().cloned());
                }
            }
        }

        Ok(WrittenShape {
            layout: Layout::new(
                layout.all_positions().to_vec(),
                layout.branch_depth().clone(),
                layout.branch_starts().clone(),
                BTreeMap::new(),
                BTreeMap::new(),
                layout.bonds().clone(),
            ),
            atoms,
            closures,
            attachments,
            entry: laid_out.entry,
        })
    }
}

/// Slot tree, atoms, ring-bond slot pairs and attachments of a fused system.
#[derive(Debug)]
pub(crate) struct WrittenShape {
    layout: Layout,
    atoms: BTreeMap<usize, String>,
    closures: Vec<(usize, usize, Option<Bond>)>,
    attachments: Attachments,
    entry: Option<Bond>,
}

impl WrittenShape {
    pub fn eq_up_to_numbering(&self, other: &WrittenShape) -> bool {
        self.layout == other.layout
            && self.atoms == other.atoms
            && self.closures == other.closures
            && self.entry == other.entry
            && attachments_eq(&self.attachments, &other.attachments)
    }
}
