use std::fmt::Write;

use ahash::HashMap;
use itertools::Itertools;

use super::{cycle::Cycle, double_bonds::DoubleBonds, fatty_acyl::FattyAcyl};
use crate::{ChemicalComposition, Element, LipidError, LipidLevel, Result};

// Public API ==========================================================================================================

/// One substituent in the recursive composition tree: a named group at a
/// chain position, with a multiplicity, its own elemental contribution, and
/// arbitrarily nested child groups keyed by group name.
///
/// Nodes are value types — cloning deep-copies the whole subtree, which is
/// what lets the shared template registry hand out copies that callers are
/// free to reposition and mutate.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FunctionalGroup {
    name: String,
    position: i32,
    count: i32,
    stereochemistry: Option<String>,
    ring_stereo: Option<String>,
    double_bonds: DoubleBonds,
    is_atomic: bool,
    elements: ChemicalComposition,
    functional_groups: HashMap<String, Vec<GroupNode>>,
}

/// A child of a [`FunctionalGroup`] — composition is recursive and
/// heterogeneous, so a substituent can itself be a whole acyl chain or a
/// ring.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum GroupNode {
    Group(FunctionalGroup),
    Acyl(FattyAcyl),
    Cycle(Cycle),
}

impl FunctionalGroup {
    pub fn new(name: impl Into<String>, elements: ChemicalComposition) -> Self {
        Self {
            name: name.into(),
            position: -1,
            count: 1,
            stereochemistry: None,
            ring_stereo: None,
            double_bonds: DoubleBonds::default(),
            is_atomic: false,
            elements,
            functional_groups: HashMap::default(),
        }
    }

    /// A bare atom substitution (`O`, `Br`, …) — only its name formatting
    /// differs from a regular group.
    pub fn new_atomic(name: impl Into<String>, elements: ChemicalComposition) -> Self {
        Self {
            is_atomic: true,
            ..Self::new(name, elements)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn count(&self) -> i32 {
        self.count
    }

    pub fn is_atomic(&self) -> bool {
        self.is_atomic
    }

    pub fn stereochemistry(&self) -> Option<&str> {
        self.stereochemistry.as_deref()
    }

    pub fn ring_stereo(&self) -> Option<&str> {
        self.ring_stereo.as_deref()
    }

    pub fn double_bonds(&self) -> &DoubleBonds {
        &self.double_bonds
    }

    pub fn elements(&self) -> &ChemicalComposition {
        &self.elements
    }

    pub fn set_position(&mut self, position: i32) {
        self.position = position;
    }

    pub fn set_count(&mut self, count: i32) {
        self.count = count;
    }

    pub fn set_stereochemistry(&mut self, stereochemistry: Option<String>) {
        self.stereochemistry = stereochemistry;
    }

    pub fn set_ring_stereo(&mut self, ring_stereo: Option<String>) {
        self.ring_stereo = ring_stereo;
    }

    pub fn set_double_bonds(&mut self, double_bonds: DoubleBonds) {
        self.double_bonds = double_bonds;
    }

    pub fn add_group(&mut self, node: GroupNode) {
        self.functional_groups
            .entry(node.name().to_owned())
            .or_default()
            .push(node);
    }

    pub fn groups(&self) -> &HashMap<String, Vec<GroupNode>> {
        &self.functional_groups
    }

    pub(crate) fn groups_mut(&mut self) -> &mut HashMap<String, Vec<GroupNode>> {
        &mut self.functional_groups
    }

    pub(crate) fn double_bonds_mut(&mut self) -> &mut DoubleBonds {
        &mut self.double_bonds
    }

    /// Bottom-up element aggregation over the subtree rooted here — the
    /// single source of truth for formulas. Each child contributes its own
    /// aggregate, scaled by its multiplicity.
    pub fn total_elements(&self) -> ChemicalComposition {
        let mut elements = self.elements.clone();
        for node in self.functional_groups.values().flatten() {
            elements.add_scaled(&node.total_elements(), node.count());
        }
        elements
    }

    /// Renumbers this subtree by a constant offset. Unplaced nodes
    /// (position −1) stay unplaced.
    pub fn shift_positions(&mut self, shift: i32) {
        if self.position >= 0 {
            self.position += shift;
        }
        self.double_bonds.shift_positions(shift);
        for node in self.functional_groups.values_mut().flatten() {
            node.shift_positions(shift);
        }
    }

    /// Insertion renumbering: every position at or above `inserted` moves up
    /// by one, recursively.
    pub fn add_position(&mut self, inserted: i32) {
        if self.position >= inserted {
            self.position += 1;
        }
        self.double_bonds.add_position(inserted);
        for node in self.functional_groups.values_mut().flatten() {
            node.add_position(inserted);
        }
    }

    pub fn render(&self, level: LipidLevel) -> String {
        let mut rendered = if level >= LipidLevel::FullStructure && self.position >= 0 {
            let numeric_name = self.name.chars().next().is_some_and(|c| c.is_ascii_digit());
            if numeric_name {
                format!("{}({})", self.position, self.name)
            } else {
                format!("{}{}", self.position, self.name)
            }
        } else if self.count > 1 {
            if self.is_atomic {
                format!("{}{}", self.name, self.count)
            } else {
                format!("({}){}", self.name, self.count)
            }
        } else {
            self.name.clone()
        };
        if level == LipidLevel::CompleteStructure {
            if let Some(stereo) = &self.stereochemistry {
                write!(rendered, "[{stereo}]").unwrap();
            }
        }
        rendered
    }

    /// Oxygen count this subtree contributes to a species-level summary.
    /// Groups carrying anything beyond oxygen/hydrogen cannot collapse into
    /// the `;O<n>` notation.
    pub(crate) fn species_oxygens(&self) -> Result<i32> {
        for element in Element::ALL {
            if element != Element::O && element != Element::H && self.elements.count(element) != 0
            {
                return Err(LipidError::unsupported(format!(
                    "functional group {:?} has no species-level summary",
                    self.name
                )));
            }
        }
        let mut oxygens = self.elements.count(Element::O);
        for node in self.functional_groups.values().flatten() {
            oxygens += node.species_oxygens()?;
        }
        Ok(self.count * oxygens)
    }
}

impl GroupNode {
    pub fn name(&self) -> &str {
        match self {
            Self::Group(group) => group.name(),
            Self::Acyl(acyl) => acyl.name(),
            Self::Cycle(cycle) => cycle.name(),
        }
    }

    pub fn position(&self) -> i32 {
        match self {
            Self::Group(group) => group.position(),
            Self::Acyl(acyl) => acyl.position(),
            Self::Cycle(cycle) => cycle.position(),
        }
    }

    pub fn count(&self) -> i32 {
        match self {
            Self::Group(group) => group.count(),
            Self::Acyl(_) | Self::Cycle(_) => 1,
        }
    }

    pub fn is_atomic(&self) -> bool {
        match self {
            Self::Group(group) => group.is_atomic(),
            Self::Acyl(_) | Self::Cycle(_) => false,
        }
    }

    pub fn total_elements(&self) -> ChemicalComposition {
        match self {
            Self::Group(group) => group.total_elements(),
            Self::Acyl(acyl) => acyl.total_elements(),
            Self::Cycle(cycle) => cycle.total_elements(),
        }
    }

    pub fn shift_positions(&mut self, shift: i32) {
        match self {
            Self::Group(group) => group.shift_positions(shift),
            Self::Acyl(acyl) => acyl.shift_positions(shift),
            Self::Cycle(cycle) => cycle.shift_positions(shift),
        }
    }

    pub fn add_position(&mut self, inserted: i32) {
        match self {
            Self::Group(group) => group.add_position(inserted),
            Self::Acyl(acyl) => acyl.add_position(inserted),
            Self::Cycle(cycle) => cycle.add_position(inserted),
        }
    }

    pub fn render(&self, level: LipidLevel) -> Result<String> {
        match self {
            Self::Group(group) => Ok(group.render(level)),
            Self::Acyl(acyl) => {
                let chain = acyl.chain_string(level)?;
                Ok(if level >= LipidLevel::FullStructure {
                    format!("{}({chain})", acyl.position())
                } else {
                    chain
                })
            }
            Self::Cycle(cycle) => cycle.render(level),
        }
    }

    pub(crate) fn species_oxygens(&self) -> Result<i32> {
        match self {
            Self::Group(group) => group.species_oxygens(),
            Self::Acyl(acyl) => Err(LipidError::unsupported(format!(
                "esterified chain {:?} has no species-level summary",
                acyl.name()
            ))),
            Self::Cycle(cycle) => cycle.species_oxygens(),
        }
    }
}

// Shared Rendering Helpers ============================================================================================

pub(crate) fn write_db_positions(ledger: &DoubleBonds, level: LipidLevel, out: &mut String) {
    if ledger.positions().is_empty() {
        return;
    }
    let inner = ledger
        .positions()
        .iter()
        .map(|(position, stereo)| match stereo {
            Some(descriptor) if level >= LipidLevel::FullStructure => {
                format!("{position}{descriptor}")
            }
            _ => position.to_string(),
        })
        .join(",");
    write!(out, "({inner})").unwrap();
}

pub(crate) fn write_group_segments(
    groups: &HashMap<String, Vec<GroupNode>>,
    level: LipidLevel,
    out: &mut String,
) -> Result<()> {
    let by_name = groups
        .iter()
        .sorted_by(|(a, _), (b, _)| a.to_lowercase().cmp(&b.to_lowercase()));
    for (name, nodes) in by_name {
        let spelled_out = nodes
            .iter()
            .any(|node| matches!(node, GroupNode::Cycle(_)))
            || (level >= LipidLevel::FullStructure
                && nodes.iter().all(|node| node.position() >= 0));
        let segment = if spelled_out {
            nodes
                .iter()
                .sorted_by_key(|node| node.position())
                .map(|node| node.render(level))
                .collect::<Result<Vec<_>>>()?
                .join(",")
        } else {
            let total: i32 = nodes.iter().map(GroupNode::count).sum();
            if total > 1 {
                if nodes.iter().all(GroupNode::is_atomic) {
                    format!("{name}{total}")
                } else {
                    format!("({name}){total}")
                }
            } else {
                name.clone()
            }
        };
        write!(out, ";{segment}").unwrap();
    }
    Ok(())
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Element;

    fn hydroxyl() -> FunctionalGroup {
        FunctionalGroup::new("OH", ChemicalComposition::of(&[(Element::O, 1)]))
    }

    #[test]
    fn aggregation_scales_by_multiplicity() {
        let mut methyl =
            FunctionalGroup::new("Me", ChemicalComposition::of(&[(Element::C, 1), (Element::H, 2)]));
        methyl.set_count(2);
        let mut parent = hydroxyl();
        parent.add_group(GroupNode::Group(methyl));
        assert_eq!(parent.total_elements().sum_formula(), "C2H4O");
    }

    #[test]
    fn nested_aggregation() {
        let mut inner = hydroxyl();
        inner.set_count(3);
        let mut outer =
            FunctionalGroup::new("Et", ChemicalComposition::of(&[(Element::C, 2), (Element::H, 4)]));
        outer.add_group(GroupNode::Group(inner));
        assert_eq!(outer.total_elements().sum_formula(), "C2H4O3");
    }

    #[test]
    fn renumbering_never_changes_elements() {
        let mut group = hydroxyl();
        group.set_position(3);
        let mut child = hydroxyl();
        child.set_position(5);
        group.add_group(GroupNode::Group(child));
        let before = group.total_elements();

        group.shift_positions(4);
        group.add_position(2);
        assert_eq!(group.position(), 8);
        assert_eq!(group.total_elements(), before);
    }

    #[test]
    fn unplaced_nodes_ignore_shifts() {
        let mut group = hydroxyl();
        group.shift_positions(5);
        assert_eq!(group.position(), -1);
    }

    #[test]
    fn rendering_by_level() {
        let mut group = hydroxyl();
        group.set_count(2);
        assert_eq!(group.render(LipidLevel::StructureDefined), "(OH)2");

        let mut atomic = FunctionalGroup::new_atomic("O", ChemicalComposition::of(&[(Element::O, 1)]));
        atomic.set_count(2);
        assert_eq!(atomic.render(LipidLevel::StructureDefined), "O2");

        let mut placed = hydroxyl();
        placed.set_position(3);
        placed.set_stereochemistry(Some("R".to_owned()));
        assert_eq!(placed.render(LipidLevel::FullStructure), "3OH");
        assert_eq!(placed.render(LipidLevel::CompleteStructure), "3OH[R]");
    }

    #[test]
    fn species_summary_is_oxygen_only() {
        let mut group = hydroxyl();
        group.set_count(2);
        assert_eq!(group.species_oxygens().unwrap(), 2);

        let bromo =
            FunctionalGroup::new_atomic("Br", ChemicalComposition::of(&[(Element::Br, 1), (Element::H, -1)]));
        assert!(matches!(
            *bromo.species_oxygens().unwrap_err(),
            LipidError::UnsupportedFeature { .. }
        ));
    }
}
