use std::fmt::Write;

use ahash::HashMap;

use super::{
    double_bonds::DoubleBonds,
    fatty_acyl::FattyAcyl,
    functional_group::{write_db_positions, write_group_segments, FunctionalGroup, GroupNode},
};
use crate::{ChemicalComposition, Element, LipidError, LipidLevel, Result};

// Public API ==========================================================================================================

/// A ring closed over a span of chain positions, possibly bridged by
/// heteroatoms. Closing the ring removes two hydrogens from the base chain;
/// bridge atoms bring their own valence-completing hydrogens.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Cycle {
    group: FunctionalGroup,
    ring_size: i32,
    start: i32,
    end: i32,
    bridge: Vec<Element>,
}

impl Cycle {
    pub fn new(
        ring_size: i32,
        start: i32,
        end: i32,
        bridge: Vec<Element>,
        double_bonds: DoubleBonds,
    ) -> Result<Self> {
        if ring_size < 3 {
            return Err(LipidError::constraint(format!(
                "a ring needs at least three members, got {ring_size}"
            )));
        }
        if start < 0 || end < start {
            return Err(LipidError::constraint(format!(
                "invalid ring span [{start}, {end}]"
            )));
        }
        for atom in &bridge {
            if !matches!(
                atom,
                Element::C | Element::N | Element::P | Element::As | Element::O | Element::S
            ) {
                return Err(LipidError::unsupported(format!(
                    "ring bridges over {atom} are not modelled"
                )));
            }
        }
        let mut group = FunctionalGroup::new("cy", ChemicalComposition::new());
        group.set_position(start);
        group.set_double_bonds(double_bonds);
        Ok(Self {
            group,
            ring_size,
            start,
            end,
            bridge,
        })
    }

    pub fn name(&self) -> &str {
        self.group.name()
    }

    pub fn position(&self) -> i32 {
        self.group.position()
    }

    pub fn ring_size(&self) -> i32 {
        self.ring_size
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn bridge(&self) -> &[Element] {
        &self.bridge
    }

    pub fn double_bonds(&self) -> &DoubleBonds {
        self.group.double_bonds()
    }

    pub fn groups(&self) -> &HashMap<String, Vec<GroupNode>> {
        self.group.groups()
    }

    pub fn add_group(&mut self, node: GroupNode) {
        self.group.add_group(node);
    }

    pub fn ring_stereo(&self) -> Option<&str> {
        self.group.ring_stereo()
    }

    pub fn set_ring_stereo(&mut self, stereo: Option<String>) {
        self.group.set_ring_stereo(stereo);
    }

    pub fn own_elements(&self) -> ChemicalComposition {
        let mut elements = ChemicalComposition::new();
        elements.add_atoms(Element::H, -2 - 2 * self.group.double_bonds().count());
        for atom in &self.bridge {
            elements.add_atoms(*atom, 1);
            match atom {
                Element::C => elements.add_atoms(Element::H, 2),
                Element::N | Element::P | Element::As => elements.add_atoms(Element::H, 1),
                _ => {}
            }
        }
        let in_chain = self.end - self.start + 1;
        let implicit = (self.ring_size - in_chain - i32::try_from(self.bridge.len()).unwrap_or(0))
            .max(0);
        elements.add_atoms(Element::C, implicit);
        elements.add_atoms(Element::H, 2 * implicit);
        elements
    }

    pub fn total_elements(&self) -> ChemicalComposition {
        let mut elements = self.own_elements();
        for node in self.group.groups().values().flatten() {
            elements.add_scaled(&node.total_elements(), node.count());
        }
        elements
    }

    pub fn shift_positions(&mut self, shift: i32) {
        self.group.shift_positions(shift);
        self.start += shift;
        self.end += shift;
    }

    pub fn add_position(&mut self, inserted: i32) {
        self.group.add_position(inserted);
        if self.start >= inserted {
            self.start += 1;
        }
        if self.end >= inserted {
            self.end += 1;
        }
    }

    pub fn render(&self, level: LipidLevel) -> Result<String> {
        let mut out = String::from("[");
        write!(out, "{}-{}", self.start, self.end).unwrap();
        for atom in &self.bridge {
            out.push_str(atom.symbol());
        }
        write!(out, "cy{}", self.ring_size).unwrap();
        if level == LipidLevel::CompleteStructure {
            if let Some(stereo) = self.group.ring_stereo() {
                write!(out, "[{stereo}]").unwrap();
            }
        }
        let double_bonds = self.group.double_bonds();
        if double_bonds.count() > 0 {
            write!(out, ":{}", double_bonds.count()).unwrap();
            if level >= LipidLevel::StructureDefined {
                write_db_positions(double_bonds, level, &mut out);
            }
        }
        if level >= LipidLevel::StructureDefined {
            write_group_segments(self.group.groups(), level, &mut out)?;
        }
        out.push(']');
        Ok(out)
    }

    pub(crate) fn species_oxygens(&self) -> Result<i32> {
        if !self.bridge.is_empty() {
            return Err(LipidError::unsupported(
                "bridged rings have no species-level summary",
            ));
        }
        let mut oxygens = 0;
        for node in self.group.groups().values().flatten() {
            oxygens += node.species_oxygens()?;
        }
        Ok(oxygens)
    }

    pub(crate) fn double_bonds_mut(&mut self) -> &mut DoubleBonds {
        self.group.double_bonds_mut()
    }

    pub(crate) fn groups_mut(&mut self) -> &mut HashMap<String, Vec<GroupNode>> {
        self.group.groups_mut()
    }
}

// Ring Rearrangement ==================================================================================================

/// Migrates double bonds and substituents between a freshly built ring and
/// its parent chain. The ring's own ledger and children are flushed outward
/// first, the ring span is renumbered by `shift`, and then everything that
/// falls inside the new span is absorbed back. With a shift of zero the two
/// moves cancel exactly.
///
/// Both nodes are under construction here, so the parent is mutated in place
/// and the (re-filled) ring handed back to be attached as a child.
pub fn rearrange(mut cycle: Cycle, parent: &mut FattyAcyl, shift: i32) -> Cycle {
    let outgoing = cycle.double_bonds_mut().drain_all();
    parent.double_bonds_mut().absorb(outgoing);
    let outgoing_groups = std::mem::take(cycle.groups_mut());
    for node in outgoing_groups.into_values().flatten() {
        parent.add_group(node);
    }

    cycle.start += shift;
    cycle.end += shift;
    cycle.group.set_position(cycle.start);

    let incoming = parent
        .double_bonds_mut()
        .drain_range(cycle.start, cycle.end);
    cycle.double_bonds_mut().absorb(incoming);
    let parent_groups = std::mem::take(parent.groups_mut());
    for node in parent_groups.into_values().flatten() {
        let in_span = cycle.start <= node.position() && node.position() <= cycle.end;
        if in_span && !matches!(node, GroupNode::Cycle(_)) {
            cycle.add_group(node);
        } else {
            parent.add_group(node);
        }
    }
    cycle
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::FaBondType;

    fn hydroxyl(position: i32) -> GroupNode {
        let mut group = FunctionalGroup::new("OH", ChemicalComposition::of(&[(Element::O, 1)]));
        group.set_position(position);
        GroupNode::Group(group)
    }

    #[test]
    fn plain_ring_arithmetic() {
        // A ring fully spanned by chain carbons just closes: −2 H
        let cycle = Cycle::new(5, 8, 12, vec![], DoubleBonds::new(0)).unwrap();
        assert_eq!(cycle.own_elements().count(Element::H), -2);
        assert_eq!(cycle.own_elements().count(Element::C), 0);

        // One ring double bond removes two more hydrogens
        let cycle = Cycle::new(5, 8, 12, vec![], DoubleBonds::new(1)).unwrap();
        assert_eq!(cycle.own_elements().count(Element::H), -4);
    }

    #[test]
    fn bridge_and_implicit_members() {
        // Furan-like bridge: the oxygen brings no hydrogen
        let cycle = Cycle::new(5, 8, 11, vec![Element::O], DoubleBonds::new(0)).unwrap();
        let elements = cycle.own_elements();
        assert_eq!(elements.count(Element::O), 1);
        assert_eq!(elements.count(Element::H), -2);

        // A ring bigger than its chain span fills up with CH2 members
        let cycle = Cycle::new(6, 8, 11, vec![], DoubleBonds::new(0)).unwrap();
        let elements = cycle.own_elements();
        assert_eq!(elements.count(Element::C), 2);
        assert_eq!(elements.count(Element::H), 2);
    }

    #[test]
    fn unsupported_bridge_atom() {
        let result = Cycle::new(5, 8, 11, vec![Element::Br], DoubleBonds::new(0));
        assert!(matches!(
            *result.unwrap_err(),
            LipidError::UnsupportedFeature { .. }
        ));
    }

    #[test]
    fn rearrangement_moves_span_contents_into_ring() {
        let positions: BTreeMap<i32, Option<String>> = [(9, None), (14, None)].into_iter().collect();
        let mut parent = FattyAcyl::new(
            "FA1",
            1,
            18,
            DoubleBonds::from_positions(positions),
            FaBondType::Ester,
        )
        .unwrap();
        parent.add_group(hydroxyl(11));
        parent.add_group(hydroxyl(2));

        let cycle = Cycle::new(5, 8, 12, vec![], DoubleBonds::new(0)).unwrap();
        let cycle = rearrange(cycle, &mut parent, 0);

        // Double bond 9 and the hydroxyl at 11 now belong to the ring
        assert_eq!(cycle.double_bonds().count(), 1);
        assert!(cycle.double_bonds().positions().contains_key(&9));
        assert_eq!(cycle.groups()["OH"].len(), 1);
        assert_eq!(parent.double_bonds().count(), 1);
        assert!(parent.double_bonds().positions().contains_key(&14));
        assert_eq!(parent.groups()["OH"].len(), 1);
        assert_eq!(parent.groups()["OH"][0].position(), 2);
    }

    #[test]
    fn rearrangement_with_zero_shift_is_involutive() {
        let positions: BTreeMap<i32, Option<String>> = [(9, None)].into_iter().collect();
        let mut parent = FattyAcyl::new(
            "FA1",
            1,
            18,
            DoubleBonds::from_positions(positions),
            FaBondType::Ester,
        )
        .unwrap();
        parent.add_group(hydroxyl(11));

        let cycle = Cycle::new(5, 8, 12, vec![], DoubleBonds::new(0)).unwrap();
        let cycle = rearrange(cycle, &mut parent, 0);
        let parent_snapshot = parent.clone();
        let cycle_snapshot = cycle.clone();

        // Flushing back out and re-absorbing reproduces the exact state
        let cycle = rearrange(cycle, &mut parent, 0);
        assert_eq!(cycle, cycle_snapshot);
        assert_eq!(parent, parent_snapshot);
    }

    #[test]
    fn shifted_span_follows_insertions() {
        let mut parent =
            FattyAcyl::new("FA1", 1, 18, DoubleBonds::new(0), FaBondType::Ester).unwrap();
        parent.add_group(hydroxyl(10));

        let cycle = Cycle::new(5, 6, 10, vec![], DoubleBonds::new(0)).unwrap();
        // Shift the ring forward by two before absorbing
        let cycle = rearrange(cycle, &mut parent, 2);
        assert_eq!((cycle.start(), cycle.end()), (8, 12));
        assert_eq!(cycle.groups()["OH"].len(), 1);
        assert!(parent.groups().is_empty());
    }

    #[test]
    fn ring_rendering() {
        let positions: BTreeMap<i32, Option<String>> = [(9, None)].into_iter().collect();
        let cycle = Cycle::new(5, 8, 12, vec![], DoubleBonds::from_positions(positions)).unwrap();
        assert_eq!(
            cycle.render(LipidLevel::StructureDefined).unwrap(),
            "[8-12cy5:1(9)]"
        );

        let furan = Cycle::new(5, 8, 11, vec![Element::O], DoubleBonds::new(0)).unwrap();
        assert_eq!(
            furan.render(LipidLevel::StructureDefined).unwrap(),
            "[8-11Ocy5]"
        );

        let mut chiral = Cycle::new(5, 8, 12, vec![], DoubleBonds::new(0)).unwrap();
        chiral.set_ring_stereo(Some("R".to_owned()));
        assert_eq!(
            chiral.render(LipidLevel::FullStructure).unwrap(),
            "[8-12cy5]"
        );
        assert_eq!(
            chiral.render(LipidLevel::CompleteStructure).unwrap(),
            "[8-12cy5[R]]"
        );
    }

    #[test]
    fn renumbering_tracks_ring_bounds() {
        let mut cycle = Cycle::new(5, 8, 12, vec![], DoubleBonds::new(0)).unwrap();
        let before = cycle.total_elements();
        cycle.add_position(9);
        assert_eq!((cycle.start(), cycle.end()), (8, 13));
        cycle.shift_positions(3);
        assert_eq!((cycle.start(), cycle.end()), (11, 16));
        assert_eq!(cycle.total_elements(), before);
    }
}
