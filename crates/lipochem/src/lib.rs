//! Normalization of shorthand lipid names into a single structural model,
//! with canonical re-rendering at every level of structural specificity and
//! exact sum-formula / monoisotopic-mass derivation.

pub mod atoms;
pub mod errors;
pub mod lipids;
pub mod moieties;

use derive_more::{Add, Display, From, Into, Sub};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub use atoms::{composition::ChemicalComposition, element::Element};
pub use errors::{LipidError, Result};
pub use lipids::{
    adduct::{Adduct, LipidAdduct},
    class_database::{ClassDatabase, LipidClass},
    descriptor::{ChainDescriptor, ChainInput, GroupSpec},
    level::LipidLevel,
    lipid::Lipid,
    species_info::LipidSpeciesInfo,
};
pub use moieties::{
    cycle::{rearrange, Cycle},
    double_bonds::DoubleBonds,
    fatty_acyl::{FaBondType, FattyAcyl},
    functional_group::{FunctionalGroup, GroupNode},
    group_database::GroupDatabase,
    headgroup::{Headgroup, HeadgroupDecorator, LipidCategory},
};

/// Rest mass of a single electron, in daltons.
pub const ELECTRON_REST_MASS: Decimal = dec!(0.00054857990946);

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display, Add, Sub, From,
    Into,
)]
pub struct MonoisotopicMass(Decimal);

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display, Add, Sub, From,
    Into,
)]
pub struct Charge(i64);

impl Charge {
    pub(crate) const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub(crate) const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

// =====================================================================================================================

pub trait Massive {
    fn monoisotopic_mass(&self) -> MonoisotopicMass;
}

pub trait Charged {
    fn charge(&self) -> Charge;
}

/// Mass-per-charge, corrected for the rest mass of the electrons gained or
/// lost during ionization. A charge of zero yields the uncorrected mass.
pub trait Mz: Massive + Charged {
    fn monoisotopic_mz(&self) -> MonoisotopicMass {
        let charge = self.charge();
        if charge.is_zero() {
            return self.monoisotopic_mass();
        }
        let corrected = Decimal::from(self.monoisotopic_mass())
            - Decimal::from(charge.0) * ELECTRON_REST_MASS;
        MonoisotopicMass(corrected / Decimal::from(charge.abs().0))
    }
}

// Blanket impls

macro_rules! massive_ref_impls {
    ($($ref_type:ty),+ $(,)?) => {
        $(
            impl<T: Massive> Massive for $ref_type {
                fn monoisotopic_mass(&self) -> MonoisotopicMass {
                    (**self).monoisotopic_mass()
                }
            }
        )+
    };
}

massive_ref_impls!(&T, &mut T, Box<T>);

macro_rules! charged_ref_impls {
    ($($ref_type:ty),+ $(,)?) => {
        $(
            impl<T: Charged> Charged for $ref_type {
                fn charge(&self) -> Charge {
                    (**self).charge()
                }
            }
        )+
    };
}

charged_ref_impls!(&T, &mut T, Box<T>);

impl<T: Massive + Charged> Mz for T {}
