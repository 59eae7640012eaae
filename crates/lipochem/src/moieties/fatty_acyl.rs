use std::fmt::Write;

use ahash::HashMap;

use super::{
    double_bonds::DoubleBonds,
    functional_group::{write_db_positions, write_group_segments, FunctionalGroup, GroupNode},
};
use crate::{ChemicalComposition, Element, LipidError, LipidLevel, Result};

// Public API ==========================================================================================================

/// How a chain attaches to its backbone. The bond type drives both the
/// hydrogen/oxygen arithmetic and the `O-`/`P-` name prefix.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum FaBondType {
    Ester,
    EtherPlasmanyl,
    EtherPlasmenyl,
    EtherUnspecified,
    Amine,
    LcbRegular,
    LcbException,
}

impl FaBondType {
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::EtherPlasmanyl | Self::EtherUnspecified => "O-",
            Self::EtherPlasmenyl => "P-",
            _ => "",
        }
    }

    pub const fn is_ether(self) -> bool {
        matches!(
            self,
            Self::EtherPlasmanyl | Self::EtherPlasmenyl | Self::EtherUnspecified
        )
    }

    pub const fn is_lcb(self) -> bool {
        matches!(self, Self::LcbRegular | Self::LcbException)
    }
}

/// A fatty-acyl or long-chain-base substituent: a functional-group node
/// specialized with a carbon count and a bond type.
///
/// Long-chain-base identity is carried by the bond type alone — the public
/// children map never holds bookkeeping placeholders.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FattyAcyl {
    group: FunctionalGroup,
    num_carbon: i32,
    bond_type: FaBondType,
}

impl FattyAcyl {
    pub fn new(
        name: impl Into<String>,
        position: i32,
        num_carbon: i32,
        double_bonds: DoubleBonds,
        bond_type: FaBondType,
    ) -> Result<Self> {
        if num_carbon != 0 && num_carbon < 2 {
            return Err(LipidError::constraint(format!(
                "a chain must span zero or at least two carbons, got {num_carbon}"
            )));
        }
        if position < 0 {
            return Err(LipidError::constraint(format!(
                "chain positions start at zero, got {position}"
            )));
        }
        if double_bonds.count() < 0 {
            return Err(LipidError::constraint(format!(
                "negative double bond count {}",
                double_bonds.count()
            )));
        }
        let mut group = FunctionalGroup::new(name, ChemicalComposition::new());
        group.set_position(position);
        group.set_double_bonds(double_bonds);
        Ok(Self {
            group,
            num_carbon,
            bond_type,
        })
    }

    pub fn name(&self) -> &str {
        self.group.name()
    }

    pub fn position(&self) -> i32 {
        self.group.position()
    }

    pub fn num_carbon(&self) -> i32 {
        self.num_carbon
    }

    pub fn bond_type(&self) -> FaBondType {
        self.bond_type
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

    pub(crate) fn groups_mut(&mut self) -> &mut HashMap<String, Vec<GroupNode>> {
        self.group.groups_mut()
    }

    pub(crate) fn double_bonds_mut(&mut self) -> &mut DoubleBonds {
        self.group.double_bonds_mut()
    }

    /// Double bonds entering the element arithmetic. Plasmenyl ethers carry
    /// one vinyl-ether double bond on top of the displayed ledger count.
    fn effective_double_bonds(&self) -> i32 {
        let vinyl = i32::from(self.bond_type == FaBondType::EtherPlasmenyl);
        self.group.double_bonds().count() + vinyl
    }

    /// The chain's own contribution, before any substituents.
    pub fn own_elements(&self) -> ChemicalComposition {
        let n = self.num_carbon;
        let d = self.effective_double_bonds();
        let mut elements = ChemicalComposition::new();
        if n == 0 && self.group.double_bonds().count() == 0 {
            // An unoccupied position keeps the hydrogen of its free hydroxyl
            elements.add_atoms(Element::H, 1);
            return elements;
        }
        elements.add_atoms(Element::C, n);
        match self.bond_type {
            FaBondType::Ester => {
                elements.add_atoms(Element::H, 2 * n - 1 - 2 * d);
                elements.add_atoms(Element::O, 1);
            }
            FaBondType::EtherPlasmenyl => {
                elements.add_atoms(Element::H, 2 * n - 1 - 2 * d + 2);
            }
            FaBondType::EtherPlasmanyl | FaBondType::EtherUnspecified => {
                elements.add_atoms(Element::H, 2 * (n + 1) - 1 - 2 * d);
            }
            FaBondType::Amine => {
                elements.add_atoms(Element::H, 2 * n + 1 - 2 * d);
            }
            FaBondType::LcbRegular | FaBondType::LcbException => {
                elements.add_atoms(Element::H, 2 * (n - d) + 1);
                elements.add_atoms(Element::N, 1);
            }
        }
        elements
    }

    pub fn total_elements(&self) -> ChemicalComposition {
        let mut elements = self.own_elements();
        for node in self.group.groups().values().flatten() {
            elements.add_scaled(&node.total_elements(), node.count());
        }
        // A regular long-chain base donates its 1-position oxygen to the
        // headgroup, so one hydroxyl oxygen is not the chain's to keep.
        if self.bond_type == FaBondType::LcbRegular
            && (self.group.groups().contains_key("OH") || self.group.groups().contains_key("O"))
        {
            elements.add_atoms(Element::O, -1);
        }
        elements
    }

    pub fn shift_positions(&mut self, shift: i32) {
        self.group.double_bonds_mut().shift_positions(shift);
        for node in self.group.groups_mut().values_mut().flatten() {
            node.shift_positions(shift);
        }
    }

    pub fn add_position(&mut self, inserted: i32) {
        self.group.double_bonds_mut().add_position(inserted);
        for node in self.group.groups_mut().values_mut().flatten() {
            node.add_position(inserted);
        }
    }

    /// The chain's own text at the requested level: `<prefix><C>:<DB>`, plus
    /// double-bond positions and per-group detail once the level defines
    /// structure, or the collapsed `;O<n>` summary below that.
    pub fn chain_string(&self, level: LipidLevel) -> Result<String> {
        let mut out = String::from(self.bond_type.prefix());
        write!(out, "{}:{}", self.num_carbon, self.group.double_bonds().count()).unwrap();
        if level >= LipidLevel::StructureDefined {
            write_db_positions(self.group.double_bonds(), level, &mut out);
            write_group_segments(self.group.groups(), level, &mut out)?;
        } else {
            let oxygens = self.species_oxygens()?;
            if oxygens == 1 {
                out.push_str(";O");
            } else if oxygens > 1 {
                write!(out, ";O{oxygens}").unwrap();
            }
        }
        Ok(out)
    }

    pub(crate) fn species_oxygens(&self) -> Result<i32> {
        let mut oxygens = 0;
        for node in self.group.groups().values().flatten() {
            oxygens += node.species_oxygens()?;
        }
        Ok(oxygens)
    }
}

// Module Tests ========================================================================================================
