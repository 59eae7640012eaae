use std::fmt::{self, Display, Formatter};

use rust_decimal_macros::dec;

use crate::{Massive, MonoisotopicMass};

/// Number of distinct elements (and heavy isotopes) the model knows about.
pub(crate) const NUM_ELEMENTS: usize = 19;

/// The closed set of atoms lipid chemistry reaches for, plus the heavy
/// isotopes used for labelling experiments.
///
/// Declaration order is the canonical serialization order of sum formulas:
/// C and H first, the remaining elements alphabetically, then the heavy
/// isotopes.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Element {
    C,
    H,
    As,
    Br,
    Cl,
    F,
    I,
    N,
    O,
    P,
    S,
    C13,
    H2,
    N15,
    O17,
    O18,
    P32,
    S33,
    S34,
}

impl Element {
    pub const ALL: [Self; NUM_ELEMENTS] = [
        Self::C,
        Self::H,
        Self::As,
        Self::Br,
        Self::Cl,
        Self::F,
        Self::I,
        Self::N,
        Self::O,
        Self::P,
        Self::S,
        Self::C13,
        Self::H2,
        Self::N15,
        Self::O17,
        Self::O18,
        Self::P32,
        Self::S33,
        Self::S34,
    ];

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::H => "H",
            Self::As => "As",
            Self::Br => "Br",
            Self::Cl => "Cl",
            Self::F => "F",
            Self::I => "I",
            Self::N => "N",
            Self::O => "O",
            Self::P => "P",
            Self::S => "S",
            Self::C13 => "[13C]",
            Self::H2 => "[2H]",
            Self::N15 => "[15N]",
            Self::O17 => "[17O]",
            Self::O18 => "[18O]",
            Self::P32 => "[32P]",
            Self::S33 => "[33S]",
            Self::S34 => "[34S]",
        }
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Massive for Element {
    fn monoisotopic_mass(&self) -> MonoisotopicMass {
        match self {
            Self::C => dec!(12),
            Self::H => dec!(1.007825035),
            Self::As => dec!(74.9215965),
            Self::Br => dec!(78.9183376),
            Self::Cl => dec!(34.968852682),
            Self::F => dec!(18.998403163),
            Self::I => dec!(126.904473),
            Self::N => dec!(14.0030740052),
            Self::O => dec!(15.9949146221),
            Self::P => dec!(30.97376151),
            Self::S => dec!(31.97207069),
            Self::C13 => dec!(13.0033548378),
            Self::H2 => dec!(2.014101779),
            Self::N15 => dec!(15.0001088984),
            Self::O17 => dec!(16.9991315),
            Self::O18 => dec!(17.9991604),
            Self::P32 => dec!(31.97390727),
            Self::S33 => dec!(32.97145876),
            Self::S34 => dec!(33.96786690),
        }
        .into()
    }
}
