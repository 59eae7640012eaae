use std::fmt::{self, Display, Formatter, Write};

use super::{level::LipidLevel, lipid::Lipid};
use crate::{
    Charge, Charged, ChemicalComposition, LipidError, Massive, MonoisotopicMass, Result,
};

// Known Adduct Table ==================================================================================================

/// Token → element deltas (as a parseable formula) and expected signed
/// charge.
const KNOWN_ADDUCTS: [(&str, &str, i32); 11] = [
    ("+H", "H", 1),
    ("+2H", "H2", 2),
    ("+3H", "H3", 3),
    ("-H", "H-1", -1),
    ("-2H", "H-2", -2),
    ("-3H", "H-3", -3),
    ("+H-H2O", "H-1O-1", 1),
    ("+NH4", "NH4", 1),
    ("+Cl", "Cl", -1),
    ("+HCOO", "CHO2", -1),
    ("+CH3COO", "C2H3O2", -1),
];

// Public API ==========================================================================================================

/// An ionization fragment: the adduct token, an optional extra formula
/// fragment rendered inside the brackets, and the signed charge it carries.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Adduct {
    sum_formula: String,
    token: String,
    charge: i32,
    charge_sign: i32,
    elements: ChemicalComposition,
}

impl Adduct {
    /// Validates the token and charge against the fixed adduct table. The
    /// charge sign must be −1, 0, or +1; a sign of zero makes a neutral
    /// `[M]` adduct regardless of token.
    pub fn new(
        sum_formula: impl Into<String>,
        token: impl Into<String>,
        charge: i32,
        charge_sign: i32,
    ) -> Result<Self> {
        if !(-1..=1).contains(&charge_sign) {
            return Err(LipidError::constraint(format!(
                "adduct charge sign must be -1, 0, or +1, got {charge_sign}"
            )));
        }
        let token = token.into();
        if charge_sign == 0 {
            return Ok(Self {
                sum_formula: sum_formula.into(),
                token,
                charge: 0,
                charge_sign: 0,
                elements: ChemicalComposition::new(),
            });
        }
        let (_, deltas, expected) = KNOWN_ADDUCTS
            .iter()
            .find(|(known, _, _)| *known == token)
            .ok_or_else(|| LipidError::constraint(format!("unknown adduct token {token:?}")))?;
        if charge * charge_sign != *expected {
            return Err(LipidError::constraint(format!(
                "adduct {token} carries charge {expected:+}, got {:+}",
                charge * charge_sign
            )));
        }
        let elements = deltas
            .parse()
            .expect("the built-in adduct table must parse");
        Ok(Self {
            sum_formula: sum_formula.into(),
            token,
            charge,
            charge_sign,
            elements,
        })
    }

    /// Looks a token up with its table-given charge.
    pub fn from_token(token: &str) -> Result<Self> {
        let (_, _, expected) = KNOWN_ADDUCTS
            .iter()
            .find(|(known, _, _)| *known == token)
            .ok_or_else(|| LipidError::constraint(format!("unknown adduct token {token:?}")))?;
        Self::new("", token, expected.abs(), expected.signum())
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn elements(&self) -> &ChemicalComposition {
        &self.elements
    }
}

impl Massive for Adduct {
    /// The mass shift this adduct applies to a lipid.
    fn monoisotopic_mass(&self) -> MonoisotopicMass {
        self.elements.monoisotopic_mass()
    }
}

impl Charged for Adduct {
    fn charge(&self) -> Charge {
        Charge::from(i64::from(self.charge) * i64::from(self.charge_sign))
    }
}

impl Display for Adduct {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.charge_sign == 0 {
            return write!(f, "[M]");
        }
        let sign = if self.charge_sign < 0 { '-' } else { '+' };
        write!(
            f,
            "[M{}{}]{}{sign}",
            self.sum_formula, self.token, self.charge
        )
    }
}

/// A lipid combined with an ionization adduct — the detected-ion view with
/// its combined formula, mass, and adduct-qualified name.
#[derive(Clone, Debug, Default)]
pub struct LipidAdduct {
    pub lipid: Option<Lipid>,
    pub adduct: Option<Adduct>,
}

impl LipidAdduct {
    pub fn new(lipid: Option<Lipid>, adduct: Option<Adduct>) -> Self {
        Self { lipid, adduct }
    }

    /// The canonical name with the adduct suffix. Category- and class-level
    /// names carry no ion information, so the suffix is suppressed there.
    pub fn lipid_string(&self, level: LipidLevel) -> Result<String> {
        const HEADGROUP_ONLY: u16 = LipidLevel::Category.bit() | LipidLevel::Class.bit();
        let Some(lipid) = &self.lipid else {
            return Ok(String::new());
        };
        let mut out = lipid.lipid_string(level)?;
        if !level.is_in(HEADGROUP_ONLY) {
            if let Some(adduct) = &self.adduct {
                write!(out, "{adduct}").unwrap();
            }
        }
        Ok(out)
    }

    /// Combined lipid + adduct composition. The result must be a complete
    /// formula — an adduct cannot strip atoms the lipid does not have.
    pub fn elements(&self) -> Result<ChemicalComposition> {
        let mut elements = match &self.lipid {
            Some(lipid) => lipid.elements()?,
            None => ChemicalComposition::new(),
        };
        if let Some(adduct) = &self.adduct {
            elements.add(adduct.elements());
        }
        if !elements.is_complete() {
            return Err(LipidError::constraint(format!(
                "combined formula {:?} has negative element counts",
                elements.sum_formula()
            )));
        }
        Ok(elements)
    }

    pub fn sum_formula(&self) -> Result<String> {
        Ok(self.elements()?.sum_formula())
    }

    /// Monoisotopic mass of the combined (neutral-atom) formula.
    pub fn mass(&self) -> Result<MonoisotopicMass> {
        Ok(self.elements()?.monoisotopic_mass())
    }

    /// Mass per charge under the adduct's signed charge, electron-corrected.
    pub fn charged_mass(&self) -> Result<MonoisotopicMass> {
        let charge = self
            .adduct
            .as_ref()
            .map_or_else(|| Charge::from(0), Charged::charge);
        Ok(self.elements()?.charged_mass(charge))
    }
}

// Module Tests ========================================================================================================
