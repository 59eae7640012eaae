use std::fmt::Write;

use crate::{ChemicalComposition, Element, FaBondType, FattyAcyl, Headgroup, LipidCategory};

/// The merged chain summary a species-level name carries: one carbon and
/// double-bond total folded over every chain, plus the bookkeeping needed to
/// reproduce the lipid's elements from those totals alone.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LipidSpeciesInfo {
    pub(crate) num_carbon: i32,
    pub(crate) double_bonds: i32,
    pub(crate) num_ethers: i32,
    pub(crate) extended_bond_type: FaBondType,
    pub(crate) num_specified: i32,
    pub(crate) total_chains: i32,
    pub(crate) lcb: Option<FaBondType>,
    pub(crate) oxygens: i32,
}

impl Default for LipidSpeciesInfo {
    fn default() -> Self {
        Self {
            num_carbon: 0,
            double_bonds: 0,
            num_ethers: 0,
            extended_bond_type: FaBondType::Ester,
            num_specified: 0,
            total_chains: 0,
            lcb: None,
            oxygens: 0,
        }
    }
}

impl LipidSpeciesInfo {
    /// Folds every chain's contribution into one aggregate. The oxygen
    /// summary is left at zero here — it is filled in at rendering time,
    /// where a group without a species summary can still be reported.
    pub(crate) fn from_chains(chains: &[FattyAcyl], total_chains: usize) -> Self {
        let mut info = Self {
            total_chains: i32::try_from(total_chains).unwrap_or(0),
            ..Self::default()
        };
        for chain in chains {
            if chain.num_carbon() == 0 && chain.double_bonds().count() == 0 {
                continue;
            }
            info.num_specified += 1;
            info.num_carbon += chain.num_carbon();
            info.double_bonds += chain.double_bonds().count();
            if chain.bond_type().is_ether() {
                info.num_ethers += 1;
                if info.extended_bond_type != FaBondType::EtherPlasmenyl {
                    info.extended_bond_type = chain.bond_type();
                }
            }
            if chain.bond_type().is_lcb() {
                info.lcb = Some(chain.bond_type());
            }
        }
        info
    }

    /// Builds the aggregate straight from species-level totals; every slot
    /// the class expects is assumed to be spanned by the totals.
    pub(crate) fn from_totals(
        num_carbon: i32,
        double_bonds: i32,
        oxygens: i32,
        bond_type: FaBondType,
        headgroup: &Headgroup,
    ) -> Self {
        let expected = i32::try_from(headgroup.expected_chains()).unwrap_or(0);
        let lcb = (headgroup.category() == LipidCategory::Sphingolipids).then(|| {
            if headgroup.sp_exception() {
                FaBondType::LcbException
            } else {
                FaBondType::LcbRegular
            }
        });
        Self {
            num_carbon,
            double_bonds,
            num_ethers: i32::from(bond_type.is_ether()),
            extended_bond_type: if bond_type.is_ether() {
                bond_type
            } else {
                FaBondType::Ester
            },
            num_specified: expected,
            total_chains: expected,
            lcb,
            oxygens,
        }
    }

    pub fn num_carbon(&self) -> i32 {
        self.num_carbon
    }

    pub fn double_bonds(&self) -> i32 {
        self.double_bonds
    }

    pub fn num_ethers(&self) -> i32 {
        self.num_ethers
    }

    pub fn render(&self) -> String {
        if self.num_carbon == 0 {
            return String::new();
        }
        let mut out = String::new();
        if self.num_ethers > 0 {
            out.push_str(self.extended_bond_type.prefix());
        }
        write!(out, "{}:{}", self.num_carbon, self.double_bonds).unwrap();
        if self.oxygens == 1 {
            out.push_str(";O");
        } else if self.oxygens > 1 {
            write!(out, ";O{}", self.oxygens).unwrap();
        }
        out
    }

    /// Elements implied by the totals. Each specified slot starts from the
    /// saturated-backbone baseline and is corrected for how it attaches;
    /// unoccupied slots keep the hydrogen of their free hydroxyl.
    pub(crate) fn elements(&self) -> ChemicalComposition {
        let mut elements = ChemicalComposition::new();
        if self.num_carbon == 0 {
            elements.add_atoms(Element::H, self.total_chains - self.num_specified);
            return elements;
        }
        elements.add_atoms(Element::C, self.num_carbon);
        elements.add_atoms(Element::H, 2 * self.num_carbon - 2 * self.double_bonds);
        let mut esters = self.num_specified;
        if let Some(lcb) = self.lcb {
            esters -= 1;
            elements.add_atoms(Element::H, 1);
            elements.add_atoms(Element::N, 1);
            if lcb == FaBondType::LcbRegular && self.oxygens > 0 {
                elements.add_atoms(Element::O, -1);
            }
        }
        esters -= self.num_ethers;
        match self.extended_bond_type {
            FaBondType::EtherPlasmanyl | FaBondType::EtherUnspecified => {
                elements.add_atoms(Element::H, self.num_ethers);
            }
            FaBondType::EtherPlasmenyl => elements.add_atoms(Element::H, -self.num_ethers),
            _ => {}
        }
        elements.add_atoms(Element::H, -esters);
        elements.add_atoms(Element::O, esters);
        elements.add_atoms(Element::H, self.total_chains - self.num_specified);
        elements.add_atoms(Element::O, self.oxygens);
        elements
    }
}
