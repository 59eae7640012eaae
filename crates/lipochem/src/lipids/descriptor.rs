use std::collections::BTreeMap;

use crate::{
    moieties::group_database::GroupDatabase, DoubleBonds, FaBondType, FattyAcyl, GroupNode,
    LipidError, LipidLevel, Result,
};

// Public API ==========================================================================================================

/// A functional-group token extracted by a dialect handler: which group,
/// how many, and (when the name encodes it) where and with what
/// configuration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct GroupSpec {
    pub name: String,
    pub position: Option<i32>,
    pub count: i32,
    pub stereochemistry: Option<String>,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: None,
            count: 1,
            stereochemistry: None,
        }
    }

    #[must_use]
    pub fn at(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn times(mut self, count: i32) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn stereo(mut self, descriptor: &str) -> Self {
        self.stereochemistry = Some(descriptor.to_owned());
        self
    }
}

/// Everything a dialect handler extracts about one chain. The core never
/// sees raw text — only these descriptors.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ChainDescriptor {
    pub carbons: i32,
    pub double_bonds: i32,
    pub positions: Option<BTreeMap<i32, Option<String>>>,
    pub groups: Vec<GroupSpec>,
    pub bond_type: FaBondType,
    pub sn_position: Option<i32>,
}

impl ChainDescriptor {
    pub fn new(carbons: i32, double_bonds: i32) -> Self {
        Self {
            carbons,
            double_bonds,
            positions: None,
            groups: Vec::new(),
            bond_type: FaBondType::Ester,
            sn_position: None,
        }
    }

    #[must_use]
    pub fn with_positions(mut self, positions: BTreeMap<i32, Option<String>>) -> Self {
        self.positions = Some(positions);
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: GroupSpec) -> Self {
        self.groups.push(group);
        self
    }

    #[must_use]
    pub fn with_bond_type(mut self, bond_type: FaBondType) -> Self {
        self.bond_type = bond_type;
        self
    }

    #[must_use]
    pub fn at_sn(mut self, sn_position: i32) -> Self {
        self.sn_position = Some(sn_position);
        self
    }
}

/// The shape of the chain information available for one lipid.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ChainInput {
    /// Headgroup only — class-level knowledge.
    None,
    /// One merged descriptor carrying carbon/double-bond totals.
    Aggregate(ChainDescriptor),
    /// Per-chain descriptors, with or without a known sn order.
    Chains {
        descriptors: Vec<ChainDescriptor>,
        sn_known: bool,
    },
}

// Descriptor Classification ===========================================================================================

/// Picks the most specific level the supplied chain detail supports.
pub(crate) fn classify(descriptors: &[ChainDescriptor], sn_known: bool) -> LipidLevel {
    let positions_complete = descriptors.iter().all(|d| {
        d.double_bonds == 0
            || d.positions
                .as_ref()
                .is_some_and(|p| p.len() == usize::try_from(d.double_bonds).unwrap_or(0))
    });
    let groups_placed = descriptors
        .iter()
        .all(|d| d.groups.iter().all(|g| g.position.is_some()));
    if positions_complete && groups_placed {
        let stereo_complete = descriptors.iter().all(|d| {
            d.positions
                .iter()
                .flatten()
                .all(|(_, stereo)| stereo.is_some())
                && d.groups.iter().all(|g| g.stereochemistry.is_some())
        });
        return if stereo_complete {
            LipidLevel::CompleteStructure
        } else {
            LipidLevel::FullStructure
        };
    }
    let any_detail = descriptors.iter().any(|d| {
        d.positions.is_some() || d.groups.iter().any(|g| g.position.is_some())
    });
    if any_detail {
        LipidLevel::StructureDefined
    } else if sn_known {
        LipidLevel::SnPosition
    } else {
        LipidLevel::MolecularSpecies
    }
}

// Node Construction ===================================================================================================

pub(crate) fn build_chain(
    descriptor: &ChainDescriptor,
    name: &str,
    position: i32,
    bond_type: FaBondType,
) -> Result<FattyAcyl> {
    let ledger = DoubleBonds::checked(descriptor.double_bonds, descriptor.positions.clone())?;
    let mut chain = FattyAcyl::new(name, position, descriptor.carbons, ledger, bond_type)?;
    for spec in &descriptor.groups {
        let mut group = GroupDatabase::global().lookup(&spec.name).ok_or_else(|| {
            LipidError::unsupported(format!("unknown functional group {:?}", spec.name))
        })?;
        if let Some(group_position) = spec.position {
            group.set_position(group_position);
        }
        group.set_count(spec.count);
        group.set_stereochemistry(spec.stereochemistry.clone());
        chain.add_group(GroupNode::Group(group));
    }
    Ok(chain)
}

/// Oxygen total of an aggregate descriptor's groups, for the species
/// summary. Groups outside the registry, or without an oxygen-only
/// footprint, cannot be carried at species granularity.
pub(crate) fn aggregate_oxygens(descriptor: &ChainDescriptor) -> Result<i32> {
    let mut oxygens = 0;
    for spec in &descriptor.groups {
        let mut group = GroupDatabase::global().lookup(&spec.name).ok_or_else(|| {
            LipidError::unsupported(format!("unknown functional group {:?}", spec.name))
        })?;
        group.set_count(spec.count);
        oxygens += group.species_oxygens()?;
    }
    Ok(oxygens)
}

// Module Tests ========================================================================================================
