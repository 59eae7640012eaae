use ahash::HashSet;
use itertools::Itertools;

use super::{
    descriptor::{self, ChainDescriptor, ChainInput},
    level::LipidLevel,
    species_info::LipidSpeciesInfo,
};
use crate::{
    ChemicalComposition, DoubleBonds, FaBondType, FattyAcyl, Headgroup, LipidCategory, LipidError,
    Massive, MonoisotopicMass, Result,
};

// Public API ==========================================================================================================

/// One lipid at whatever structural specificity its construction data
/// supports. The intrinsic level is a plain tag; a single renderer
/// dispatches on the requested level and refuses anything more specific
/// than the tag.
#[derive(Clone, Debug)]
pub struct Lipid {
    headgroup: Headgroup,
    chains: Vec<FattyAcyl>,
    info: LipidSpeciesInfo,
    level: LipidLevel,
}

impl Lipid {
    /// Builds a lipid from handler-extracted chain descriptors, classifying
    /// it at the most specific level the descriptors support and padding
    /// missing chain slots with zero-carbon placeholders.
    pub fn new(headgroup: Headgroup, input: ChainInput) -> Result<Self> {
        match input {
            ChainInput::None => Ok(Self {
                info: LipidSpeciesInfo::default(),
                chains: Vec::new(),
                level: LipidLevel::Class,
                headgroup,
            }),
            ChainInput::Aggregate(descriptor) => {
                Self::from_aggregate(headgroup, &descriptor)
            }
            ChainInput::Chains {
                descriptors,
                sn_known,
            } => Self::from_descriptors(headgroup, descriptors, sn_known),
        }
    }

    /// Assembles a lipid from chains a handler has already built. The chain
    /// list is taken as-is apart from placeholder padding; chain names must
    /// be unique within the lipid.
    pub fn from_parts(
        headgroup: Headgroup,
        mut chains: Vec<FattyAcyl>,
        level: LipidLevel,
    ) -> Result<Self> {
        let expected = headgroup.expected_chains();
        if chains.len() > expected && expected > 0 {
            return Err(LipidError::constraint(format!(
                "{} chains supplied but {} expects at most {expected}",
                chains.len(),
                headgroup.name(),
            )));
        }
        let mut next = chains.len();
        while chains.len() < expected {
            next += 1;
            chains.push(FattyAcyl::new(
                format!("FA{next}"),
                i32::try_from(next).unwrap_or(i32::MAX),
                0,
                DoubleBonds::new(0),
                FaBondType::Ester,
            )?);
        }
        let mut names = HashSet::default();
        for chain in &chains {
            if !names.insert(chain.name().to_owned()) {
                return Err(LipidError::constraint(format!(
                    "duplicate chain name {:?}",
                    chain.name()
                )));
            }
        }
        let info = LipidSpeciesInfo::from_chains(&chains, expected);
        Ok(Self {
            headgroup,
            chains,
            info,
            level,
        })
    }

    fn from_aggregate(headgroup: Headgroup, descriptor: &ChainDescriptor) -> Result<Self> {
        if descriptor.carbons < 0 || descriptor.double_bonds < 0 {
            return Err(LipidError::constraint(format!(
                "negative chain totals {}:{}",
                descriptor.carbons, descriptor.double_bonds
            )));
        }
        let oxygens = descriptor::aggregate_oxygens(descriptor)?;
        let info = LipidSpeciesInfo::from_totals(
            descriptor.carbons,
            descriptor.double_bonds,
            oxygens,
            descriptor.bond_type,
            &headgroup,
        );
        Ok(Self {
            headgroup,
            chains: Vec::new(),
            info,
            level: LipidLevel::Species,
        })
    }

    fn from_descriptors(
        headgroup: Headgroup,
        mut descriptors: Vec<ChainDescriptor>,
        sn_known: bool,
    ) -> Result<Self> {
        let level = descriptor::classify(&descriptors, sn_known);
        if !descriptors.is_empty() && descriptors.iter().all(|d| d.sn_position.is_some()) {
            descriptors.sort_by_key(|d| d.sn_position);
        }
        let sphingoid = headgroup.category() == LipidCategory::Sphingolipids;
        let mut chains = Vec::with_capacity(descriptors.len());
        for (index, chain_descriptor) in descriptors.iter().enumerate() {
            let backbone = sphingoid && index == 0;
            let bond_type = if backbone && !chain_descriptor.bond_type.is_lcb() {
                if headgroup.sp_exception() {
                    FaBondType::LcbException
                } else {
                    FaBondType::LcbRegular
                }
            } else {
                chain_descriptor.bond_type
            };
            let name = if backbone {
                "LCB".to_owned()
            } else if sphingoid {
                format!("FA{index}")
            } else {
                format!("FA{}", index + 1)
            };
            let position = chain_descriptor
                .sn_position
                .unwrap_or_else(|| i32::try_from(index + 1).unwrap_or(i32::MAX));
            chains.push(descriptor::build_chain(
                chain_descriptor,
                &name,
                position,
                bond_type,
            )?);
        }
        Self::from_parts(headgroup, chains, level)
    }

    pub fn headgroup(&self) -> &Headgroup {
        &self.headgroup
    }

    pub fn chains(&self) -> &[FattyAcyl] {
        &self.chains
    }

    pub fn info(&self) -> &LipidSpeciesInfo {
        &self.info
    }

    /// The most specific level this lipid's construction data supports.
    pub fn level(&self) -> LipidLevel {
        self.level
    }

    /// Renders the canonical name at the requested level, which must not be
    /// more specific than the lipid's own.
    pub fn lipid_string(&self, level: LipidLevel) -> Result<String> {
        if level > self.level {
            return Err(LipidError::constraint(format!(
                "cannot render a {} lipid at the more specific {} level",
                self.level, level
            )));
        }
        match level {
            LipidLevel::Category | LipidLevel::Class => Ok(self.headgroup.render(level)),
            LipidLevel::Species => {
                let summary = self.species_summary()?.render();
                Ok(if summary.is_empty() {
                    self.headgroup.render(level)
                } else {
                    format!("{} {summary}", self.headgroup.render(level))
                })
            }
            LipidLevel::MolecularSpecies => {
                // Backbone-versus-acyl order still matters for sphingolipids,
                // so they keep the positional separator even here
                let separator =
                    if self.headgroup.category() == LipidCategory::Sphingolipids {
                        "/"
                    } else {
                        "_"
                    };
                let rendered = self
                    .chains
                    .iter()
                    .filter(|chain| {
                        chain.num_carbon() > 0 || chain.double_bonds().count() > 0
                    })
                    .map(|chain| chain.chain_string(level))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.join_chains(level, &rendered.join(separator)))
            }
            _ => {
                let rendered = self
                    .chains
                    .iter()
                    .map(|chain| chain.chain_string(level))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.join_chains(level, &rendered.join("/")))
            }
        }
    }

    fn join_chains(&self, level: LipidLevel, chains: &str) -> String {
        let headgroup = self.headgroup.render(level);
        if chains.is_empty() {
            return headgroup;
        }
        if self.headgroup.category() == LipidCategory::Sterols {
            format!("{headgroup}/{chains}")
        } else {
            format!("{headgroup} {chains}")
        }
    }

    fn species_summary(&self) -> Result<LipidSpeciesInfo> {
        let mut info = self.info.clone();
        if !self.chains.is_empty() {
            info.oxygens = self
                .chains
                .iter()
                .map(FattyAcyl::species_oxygens)
                .fold_ok(0, |total, oxygens| total + oxygens)?;
        }
        Ok(info)
    }

    /// The lipid's elemental composition: headgroup plus every chain, or
    /// headgroup plus the folded totals when only a species summary exists.
    pub fn elements(&self) -> Result<ChemicalComposition> {
        if self.level <= LipidLevel::Class {
            return Err(LipidError::constraint(format!(
                "a {} lipid has no elemental composition",
                self.level
            )));
        }
        let mut elements = self.headgroup.elements();
        if self.chains.is_empty() {
            elements.add(&self.info.elements());
        } else {
            for chain in &self.chains {
                elements.add(&chain.total_elements());
            }
        }
        Ok(elements)
    }

    pub fn sum_formula(&self) -> Result<String> {
        Ok(self.elements()?.sum_formula())
    }

    pub fn mass(&self) -> Result<MonoisotopicMass> {
        Ok(self.elements()?.monoisotopic_mass())
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::GroupSpec;

    fn positions(entries: &[(i32, Option<&str>)]) -> BTreeMap<i32, Option<String>> {
        entries
            .iter()
            .map(|&(p, s)| (p, s.map(str::to_owned)))
            .collect()
    }

    fn ceramide() -> Lipid {
        let headgroup = Headgroup::new("Cer", Vec::new()).unwrap();
        let backbone = ChainDescriptor::new(18, 1)
            .with_positions(positions(&[(8, None)]))
            .with_group(GroupSpec::new("OH").times(2));
        let acyl = ChainDescriptor::new(24, 0);
        Lipid::new(
            headgroup,
            ChainInput::Chains {
                descriptors: vec![backbone, acyl],
                sn_known: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn ceramide_at_every_level() {
        let lipid = ceramide();
        assert_eq!(lipid.level(), LipidLevel::StructureDefined);
        assert_eq!(
            lipid.lipid_string(LipidLevel::StructureDefined).unwrap(),
            "Cer 18:1(8);(OH)2/24:0"
        );
        assert_eq!(
            lipid.lipid_string(LipidLevel::SnPosition).unwrap(),
            "Cer 18:1;O2/24:0"
        );
        assert_eq!(
            lipid.lipid_string(LipidLevel::MolecularSpecies).unwrap(),
            "Cer 18:1;O2/24:0"
        );
        assert_eq!(
            lipid.lipid_string(LipidLevel::Species).unwrap(),
            "Cer 42:1;O2"
        );
        assert_eq!(lipid.lipid_string(LipidLevel::Class).unwrap(), "Cer");
        assert_eq!(lipid.lipid_string(LipidLevel::Category).unwrap(), "SP");
        assert_eq!(lipid.sum_formula().unwrap(), "C42H83NO3");
        assert_eq!(lipid.mass().unwrap(), dec!(649.6372957765).into());
    }

    #[test]
    fn rendering_above_the_intrinsic_level_fails() {
        let lipid = ceramide();
        for level in [LipidLevel::FullStructure, LipidLevel::CompleteStructure] {
            assert!(matches!(
                *lipid.lipid_string(level).unwrap_err(),
                LipidError::ConstraintViolation { .. }
            ));
        }
    }

    #[test]
    fn species_totals_match_the_structure() {
        let headgroup = Headgroup::new("Cer", Vec::new()).unwrap();
        let aggregate = ChainDescriptor::new(42, 1).with_group(GroupSpec::new("O").times(2));
        let species = Lipid::new(headgroup, ChainInput::Aggregate(aggregate)).unwrap();
        assert_eq!(species.level(), LipidLevel::Species);
        assert_eq!(
            species.lipid_string(LipidLevel::Species).unwrap(),
            "Cer 42:1;O2"
        );
        assert_eq!(species.sum_formula().unwrap(), "C42H83NO3");
        assert!(species.lipid_string(LipidLevel::MolecularSpecies).is_err());
    }

    #[test]
    fn descriptor_round_trip_is_idempotent() {
        let first = ceramide();
        let second = ceramide();
        let levels = [
            LipidLevel::Category,
            LipidLevel::Class,
            LipidLevel::Species,
            LipidLevel::MolecularSpecies,
            LipidLevel::SnPosition,
            LipidLevel::StructureDefined,
        ];
        for level in levels {
            assert_eq!(
                first.lipid_string(level).unwrap(),
                second.lipid_string(level).unwrap()
            );
        }
    }

    #[test]
    fn diacyl_phospholipid() {
        let headgroup = Headgroup::new("PC", Vec::new()).unwrap();
        let lipid = Lipid::new(
            headgroup,
            ChainInput::Chains {
                descriptors: vec![ChainDescriptor::new(16, 0), ChainDescriptor::new(16, 0)],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(
            lipid.lipid_string(LipidLevel::SnPosition).unwrap(),
            "PC 16:0/16:0"
        );
        assert_eq!(
            lipid.lipid_string(LipidLevel::MolecularSpecies).unwrap(),
            "PC 16:0_16:0"
        );
        assert_eq!(lipid.lipid_string(LipidLevel::Species).unwrap(), "PC 32:0");
        assert_eq!(lipid.sum_formula().unwrap(), "C40H80NO8P");
    }

    #[test]
    fn missing_chains_are_padded_with_placeholders() {
        let headgroup = Headgroup::new("PC", Vec::new()).unwrap();
        let lipid = Lipid::new(
            headgroup,
            ChainInput::Chains {
                descriptors: vec![ChainDescriptor::new(16, 0)],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(
            lipid.lipid_string(LipidLevel::SnPosition).unwrap(),
            "PC 16:0/0:0"
        );
        // Empty chains drop out of the unordered join
        assert_eq!(
            lipid.lipid_string(LipidLevel::MolecularSpecies).unwrap(),
            "PC 16:0"
        );
        // The placeholder keeps the hydrogen of the free hydroxyl
        assert_eq!(lipid.sum_formula().unwrap(), "C24H50NO7P");
    }

    #[test]
    fn explicit_sn_positions_order_the_chains() {
        let headgroup = Headgroup::new("PC", Vec::new()).unwrap();
        let lipid = Lipid::new(
            headgroup,
            ChainInput::Chains {
                descriptors: vec![
                    ChainDescriptor::new(18, 1).at_sn(2),
                    ChainDescriptor::new(16, 0).at_sn(1),
                ],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(
            lipid.lipid_string(LipidLevel::SnPosition).unwrap(),
            "PC 16:0/18:1"
        );
    }

    #[test]
    fn ether_chains() {
        let headgroup = Headgroup::new("PC", Vec::new()).unwrap();
        let plasmanyl = Lipid::new(
            headgroup.clone(),
            ChainInput::Chains {
                descriptors: vec![
                    ChainDescriptor::new(16, 0).with_bond_type(FaBondType::EtherPlasmanyl),
                    ChainDescriptor::new(16, 0),
                ],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(
            plasmanyl.lipid_string(LipidLevel::SnPosition).unwrap(),
            "PC O-16:0/16:0"
        );
        assert_eq!(
            plasmanyl.lipid_string(LipidLevel::Species).unwrap(),
            "PC O-32:0"
        );
        assert_eq!(plasmanyl.sum_formula().unwrap(), "C40H82NO7P");

        let plasmenyl = Lipid::new(
            headgroup,
            ChainInput::Chains {
                descriptors: vec![
                    ChainDescriptor::new(16, 0).with_bond_type(FaBondType::EtherPlasmenyl),
                    ChainDescriptor::new(16, 0),
                ],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(
            plasmenyl.lipid_string(LipidLevel::SnPosition).unwrap(),
            "PC P-16:0/16:0"
        );
        assert_eq!(plasmenyl.sum_formula().unwrap(), "C40H80NO7P");
    }

    #[test]
    fn sphingomyelin_backbone_oxygen() {
        let headgroup = Headgroup::new("SM", Vec::new()).unwrap();
        let lipid = Lipid::new(
            headgroup,
            ChainInput::Chains {
                descriptors: vec![
                    ChainDescriptor::new(18, 1).with_group(GroupSpec::new("OH").times(2)),
                    ChainDescriptor::new(16, 0),
                ],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(
            lipid.lipid_string(LipidLevel::SnPosition).unwrap(),
            "SM 18:1;O2/16:0"
        );
        assert_eq!(
            lipid.lipid_string(LipidLevel::Species).unwrap(),
            "SM 34:1;O2"
        );
        assert_eq!(lipid.sum_formula().unwrap(), "C39H79N2O6P");
        assert_eq!(lipid.chains()[0].bond_type(), FaBondType::LcbRegular);
    }

    #[test]
    fn glycosphingolipid() {
        let headgroup = Headgroup::new("HexCer", Vec::new()).unwrap();
        let lipid = Lipid::new(
            headgroup,
            ChainInput::Chains {
                descriptors: vec![
                    ChainDescriptor::new(18, 1).with_group(GroupSpec::new("OH").times(2)),
                    ChainDescriptor::new(16, 0),
                ],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(lipid.sum_formula().unwrap(), "C40H77NO8");
    }

    #[test]
    fn full_structure_with_stereo() {
        let headgroup = Headgroup::new("Cer", Vec::new()).unwrap();
        let backbone = ChainDescriptor::new(18, 1)
            .with_positions(positions(&[(8, Some("E"))]))
            .with_group(GroupSpec::new("OH").at(1))
            .with_group(GroupSpec::new("OH").at(3));
        let acyl = ChainDescriptor::new(24, 0);
        let lipid = Lipid::new(
            headgroup,
            ChainInput::Chains {
                descriptors: vec![backbone, acyl],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(lipid.level(), LipidLevel::FullStructure);
        assert_eq!(
            lipid.lipid_string(LipidLevel::FullStructure).unwrap(),
            "Cer 18:1(8E);1OH,3OH/24:0"
        );
        assert_eq!(
            lipid.lipid_string(LipidLevel::StructureDefined).unwrap(),
            "Cer 18:1(8);(OH)2/24:0"
        );
        assert_eq!(lipid.sum_formula().unwrap(), "C42H83NO3");
    }

    #[test]
    fn triacylglycerol_and_sterols() {
        let tg = Lipid::new(
            Headgroup::new("TG", Vec::new()).unwrap(),
            ChainInput::Chains {
                descriptors: vec![
                    ChainDescriptor::new(16, 0),
                    ChainDescriptor::new(16, 0),
                    ChainDescriptor::new(16, 0),
                ],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(
            tg.lipid_string(LipidLevel::SnPosition).unwrap(),
            "TG 16:0/16:0/16:0"
        );
        assert_eq!(tg.sum_formula().unwrap(), "C51H98O6");

        let se = Lipid::new(
            Headgroup::new("SE 27:1", Vec::new()).unwrap(),
            ChainInput::Chains {
                descriptors: vec![ChainDescriptor::new(16, 0)],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(
            se.lipid_string(LipidLevel::SnPosition).unwrap(),
            "SE 27:1/16:0"
        );
        assert_eq!(se.sum_formula().unwrap(), "C43H76O2");

        let chol = Lipid::new(
            Headgroup::new("Chol", Vec::new()).unwrap(),
            ChainInput::Chains {
                descriptors: vec![],
                sn_known: true,
            },
        )
        .unwrap();
        assert_eq!(chol.lipid_string(LipidLevel::Species).unwrap(), "Chol");
        assert_eq!(chol.sum_formula().unwrap(), "C27H46O");
    }

    #[test]
    fn class_level_lipids_have_no_formula() {
        let lipid = Lipid::new(
            Headgroup::new("PC", Vec::new()).unwrap(),
            ChainInput::None,
        )
        .unwrap();
        assert_eq!(lipid.level(), LipidLevel::Class);
        assert_eq!(lipid.lipid_string(LipidLevel::Class).unwrap(), "PC");
        assert!(lipid.elements().is_err());
        assert!(lipid.lipid_string(LipidLevel::Species).is_err());
    }

    #[test]
    fn too_many_chains_is_a_constraint_violation() {
        let result = Lipid::new(
            Headgroup::new("LPC", Vec::new()).unwrap(),
            ChainInput::Chains {
                descriptors: vec![ChainDescriptor::new(16, 0), ChainDescriptor::new(18, 1)],
                sn_known: true,
            },
        );
        assert!(matches!(
            *result.unwrap_err(),
            LipidError::ConstraintViolation { .. }
        ));
    }

    #[test]
    fn duplicate_chain_names_are_rejected() {
        let chains = vec![
            FattyAcyl::new("FA1", 1, 16, DoubleBonds::new(0), FaBondType::Ester).unwrap(),
            FattyAcyl::new("FA1", 2, 18, DoubleBonds::new(0), FaBondType::Ester).unwrap(),
        ];
        let result = Lipid::from_parts(
            Headgroup::new("PC", Vec::new()).unwrap(),
            chains,
            LipidLevel::MolecularSpecies,
        );
        assert!(matches!(
            *result.unwrap_err(),
            LipidError::ConstraintViolation { .. }
        ));
    }

    #[test]
    fn renumbering_chains_never_changes_the_formula() {
        let mut lipid = ceramide();
        let before = lipid.elements().unwrap();
        for chain in &mut lipid.chains {
            chain.add_position(2);
            chain.shift_positions(1);
        }
        assert_eq!(lipid.elements().unwrap(), before);
    }
}
