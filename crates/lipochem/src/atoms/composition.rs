use std::{
    fmt::{self, Display, Formatter, Write},
    str::FromStr,
};

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::many1,
    sequence::pair,
    Finish, IResult,
};
use rust_decimal::Decimal;

use super::element::{Element, NUM_ELEMENTS};
use crate::{Charge, LipidError, Massive, MonoisotopicMass, Result, ELECTRON_REST_MASS};

// Public API ==========================================================================================================

/// A signed multiset of elements. Counts can dip below zero while two
/// formulas are being diffed, but any "complete" composition handed to
/// [`sum_formula`](Self::sum_formula) or a mass computation is expected to
/// be non-negative throughout.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ChemicalComposition {
    counts: [i32; NUM_ELEMENTS],
}

impl ChemicalComposition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(entries: &[(Element, i32)]) -> Self {
        let mut composition = Self::default();
        for &(element, count) in entries {
            composition.add_atoms(element, count);
        }
        composition
    }

    pub fn count(&self, element: Element) -> i32 {
        self.counts[element.index()]
    }

    pub fn add_atoms(&mut self, element: Element, count: i32) {
        self.counts[element.index()] += count;
    }

    pub fn add(&mut self, other: &Self) {
        self.add_scaled(other, 1);
    }

    pub fn add_scaled(&mut self, other: &Self, multiplier: i32) {
        for element in Element::ALL {
            self.counts[element.index()] += multiplier * other.counts[element.index()];
        }
    }

    /// Pointwise difference `self − other`.
    pub fn subtract(&self, other: &Self) -> Self {
        let mut difference = self.clone();
        difference.add_scaled(other, -1);
        difference
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&count| count == 0)
    }

    pub fn is_complete(&self) -> bool {
        self.counts.iter().all(|&count| count >= 0)
    }

    /// Concatenates the non-zero counts in canonical element order; a count
    /// of one is printed without a trailing digit.
    pub fn sum_formula(&self) -> String {
        let mut formula = String::new();
        for element in Element::ALL {
            match self.count(element) {
                0 => {}
                1 => formula.push_str(element.symbol()),
                count => write!(formula, "{element}{count}").unwrap(),
            }
        }
        formula
    }

    /// Human-readable difference against a reference formula, for
    /// cross-check diagnostics. Renders `self − other`; when that diff has
    /// no surplus entry the flipped diff is rendered with a leading `-`, so
    /// two formulas that really differ never produce an empty report.
    pub fn diff_string(&self, other: &Self) -> String {
        let difference = self.subtract(other);
        if difference.is_empty() {
            return String::new();
        }
        if difference.counts.iter().any(|&count| count > 0) {
            difference.sum_formula()
        } else {
            format!("-{}", other.subtract(self).sum_formula())
        }
    }

    /// Mass per charge, with the rest mass of the ionizing electrons
    /// removed. A charge of zero yields the plain monoisotopic mass.
    pub fn charged_mass(&self, charge: Charge) -> MonoisotopicMass {
        if charge.is_zero() {
            return self.monoisotopic_mass();
        }
        let corrected = Decimal::from(self.monoisotopic_mass())
            - Decimal::from(i64::from(charge)) * ELECTRON_REST_MASS;
        MonoisotopicMass::from(corrected / Decimal::from(i64::from(charge.abs())))
    }
}

impl Default for ChemicalComposition {
    fn default() -> Self {
        Self {
            counts: [0; NUM_ELEMENTS],
        }
    }
}

impl Massive for ChemicalComposition {
    fn monoisotopic_mass(&self) -> MonoisotopicMass {
        let mass: Decimal = Element::ALL
            .iter()
            .map(|&element| {
                Decimal::from(self.count(element))
                    * Decimal::from(element.monoisotopic_mass())
            })
            .sum();
        MonoisotopicMass::from(mass)
    }
}

impl Display for ChemicalComposition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sum_formula())
    }
}

// Formula-String Parsing ==============================================================================================

fn element_symbol(input: &str) -> IResult<&str, Element> {
    alt((
        value(Element::C13, tag("[13C]")),
        value(Element::H2, tag("[2H]")),
        value(Element::N15, tag("[15N]")),
        value(Element::O17, tag("[17O]")),
        value(Element::O18, tag("[18O]")),
        value(Element::P32, tag("[32P]")),
        value(Element::S33, tag("[33S]")),
        value(Element::S34, tag("[34S]")),
        value(Element::As, tag("As")),
        value(Element::Br, tag("Br")),
        value(Element::Cl, tag("Cl")),
        value(Element::C, tag("C")),
        value(Element::H, tag("H")),
        value(Element::F, tag("F")),
        value(Element::I, tag("I")),
        value(Element::N, tag("N")),
        value(Element::O, tag("O")),
        value(Element::P, tag("P")),
        value(Element::S, tag("S")),
    ))(input)
}

fn signed_count(input: &str) -> IResult<&str, i32> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse)(input)
}

fn element_count(input: &str) -> IResult<&str, (Element, i32)> {
    pair(element_symbol, map(opt(signed_count), |c| c.unwrap_or(1)))(input)
}

fn composition(input: &str) -> IResult<&str, ChemicalComposition> {
    map(many1(element_count), |entries| {
        let mut composition = ChemicalComposition::default();
        for (element, count) in entries {
            composition.add_atoms(element, count);
        }
        composition
    })(input)
}

impl FromStr for ChemicalComposition {
    type Err = Box<LipidError>;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        all_consuming(composition)(s)
            .finish()
            .map(|(_, composition)| composition)
            .map_err(|_| LipidError::constraint(format!("malformed chemical composition {s:?}")))
    }
}

// Module Tests ========================================================================================================
