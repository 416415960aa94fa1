use super::{Labels, Writer};
use crate::bond::push_bond;
use crate::layout::slot_atom;
use crate::{FusedRing, Layout, Result, Ring, SerializeError};
use std::collections::BTreeMap;
use std::sync::Arc;

fn check_sizes(rings: &[Arc<Ring>]) -> Result<(), SerializeError> {
    match rings.iter().find(|r| r.size() < 3) {
        Some(ring) => Err(SerializeError::InvalidRingSize {
            number: ring.number(),
            size: ring.size(),
        }),
        None => Ok(()),
    }
}

impl Writer<'_> {
    /// Window-style system: slots are written once, in order.
    pub(super) fn windows(&mut self, fused: &FusedRing, with_entry: bool, depth: usize) -> Result<()> {
        let rings = fused.rings();
        check_sizes(rings)?;
        if with_entry {
            push_bond(&mut self.out, fused.entry_bond());
        }
        let mut numbers = vec![0u16; rings.len()];
        for slot in 0..fused.slot_count() {
            if slot > 0 {
                let owner = rings
                    .iter()
                    .find(|r| r.offset() < slot && slot <= r.end())
                    .ok_or(SerializeError::DisconnectedWindow { slot })?;
                push_bond(&mut self.out, owner.bonds()[slot - owner.offset() - 1]);
            }

            let covering: Vec<(&Ring, usize)> = rings
                .iter()
                .filter(|r| r.offset() <= slot && slot <= r.end())
                .map(|r| (r.as_ref(), slot - r.offset() + 1))
                .collect();
            let atom = slot_atom(&covering).ok_or(SerializeError::MissingAtom { slot })?;
            self.out.push_str(atom);

            // Opens first, then closes in ascending ring number.
            let mut labels = Labels::default();
            for (index, ring) in rings.iter().enumerate() {
                if slot == ring.offset() {
                    numbers[index] = self.numbers.open(ring.number())?;
                    labels.push(None, numbers[index]);
                }
            }
            let mut closing: Vec<usize> = (0..rings.len()).filter(|&i| slot == rings[i].end()).collect();
            closing.sort_by_key(|&i| rings[i].number());
            for index in closing {
                labels.push(rings[index].closure_bond(), numbers[index]);
                self.numbers.close(numbers[index]);
            }
            labels.write(&mut self.out);

            for (ring, position) in covering {
                self.attachments(ring.attachments(), position, depth)?;
            }
        }
        Ok(())
    }

    /// Laid-out system: replay the recorded slot order, branch structure
    /// and ring-bond order.
    pub(super) fn laid_out(
        &mut self,
        fused: &FusedRing,
        layout: &Layout,
        with_entry: bool,
        depth: usize,
    ) -> Result<()> {
        let rings = fused.rings();
        check_sizes(rings)?;
        let bad = |reason: String| SerializeError::BadLayout { reason };

        // Slot -> 1-based position, per ring.
        let mut position_of: Vec<BTreeMap<usize, usize>> = Vec::with_capacity(rings.len());
        for ring in rings {
            let positions = ring
                .positions()
                .ok_or_else(|| bad(format!("ring {} has no slot positions", ring.number())))?;
            position_of.push(
                positions
                    .iter()
                    .enumerate()
                    .map(|(i, &slot)| (slot, i + 1))
                    .collect(),
            );
        }

        let mut numbers: Vec<Option<u16>> = vec![None; rings.len()];
        let mut closed = vec![false; rings.len()];
        let mut prev_depth = 0;
        for (i, &slot) in layout.all_positions().iter().enumerate() {
            let slot_depth = *layout
                .branch_depth()
                .get(&slot)
                .ok_or_else(|| bad(format!("slot {slot} has no branch depth")))?;
            if i == 0 {
                if slot_depth != 0 {
                    return Err(bad(format!("first slot {slot} is at depth {slot_depth}")).into());
                }
                if with_entry {
                    push_bond(&mut self.out, fused.entry_bond());
                }
            } else {
                if layout.branch_starts().contains(&slot) {
                    if slot_depth == 0 || slot_depth > prev_depth + 1 {
                        return Err(bad(format!("branch at slot {slot} jumps to depth {slot_depth}")).into());
                    }
                    for _ in 0..prev_depth + 1 - slot_depth {
                        self.out.push(')');
                    }
                    self.out.push('(');
                } else {
                    if slot_depth > prev_depth {
                        return Err(bad(format!("slot {slot} deepens without a branch")).into());
                    }
                    for _ in 0..prev_depth - slot_depth {
                        self.out.push(')');
                    }
                }
                push_bond(&mut self.out, layout.bonds().get(&slot).copied());
            }

            let covering: Vec<(&Ring, usize)> = rings
                .iter()
                .zip(&position_of)
                .filter_map(|(ring, positions)| positions.get(&slot).map(|&p| (ring.as_ref(), p)))
                .collect();
            let atom = match layout.atom_values().get(&slot) {
                Some(value) => value.as_str(),
                None => slot_atom(&covering).ok_or(SerializeError::MissingAtom { slot })?,
            };
            self.out.push_str(atom);

            let mut labels = Labels::default();
            for &index in layout.ring_order().get(&slot).map(Vec::as_slice).unwrap_or_default() {
                let ring = rings
                    .get(index)
                    .ok_or_else(|| bad(format!("slot {slot} names unknown ring {index}")))?;
                match numbers[index] {
                    None if !closed[index] && position_of[index].get(&slot) == Some(&1) => {
                        let number = self.numbers.open(ring.number())?;
                        numbers[index] = Some(number);
                        labels.push(None, number);
                    }
                    Some(number) => {
                        labels.push(ring.closure_bond(), number);
                        self.numbers.close(number);
                        numbers[index] = None;
                        closed[index] = true;
                    }
                    None => {
                        return Err(SerializeError::UnpairedRing {
                            number: ring.number(),
                        }
                        .into())
                    }
                }
            }
            labels.write(&mut self.out);

            for (ring, position) in covering {
                self.attachments(ring.attachments(), position, depth)?;
            }
            prev_depth = slot_depth;
        }
        for _ in 0..prev_depth {
            self.out.push(')');
        }
        if let Some(ring) = rings.iter().zip(&closed).find(|(_, closed)| !**closed).map(|(r, _)| r) {
            return Err(SerializeError::UnpairedRing {
                number: ring.number(),
            }
            .into());
        }
        Ok(())
    }
}
