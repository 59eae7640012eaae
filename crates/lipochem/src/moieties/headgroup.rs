use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use itertools::Itertools;

use super::functional_group::FunctionalGroup;
use crate::{
    lipids::class_database::ClassDatabase, ChemicalComposition, Element, LipidError, LipidLevel,
    Result,
};

// Public API ==========================================================================================================

/// The broad lipid categories of the classification hierarchy.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LipidCategory {
    Undefined,
    FattyAcyls,
    Glycerolipids,
    Glycerophospholipids,
    Sphingolipids,
    Sterols,
    Polyketides,
    Saccharolipids,
}

impl Display for LipidCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Undefined => "UNDEFINED",
            Self::FattyAcyls => "FA",
            Self::Glycerolipids => "GL",
            Self::Glycerophospholipids => "GP",
            Self::Sphingolipids => "SP",
            Self::Sterols => "ST",
            Self::Polyketides => "PK",
            Self::Saccharolipids => "SL",
        })
    }
}

impl FromStr for LipidCategory {
    type Err = Box<LipidError>;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "FA" => Self::FattyAcyls,
            "GL" => Self::Glycerolipids,
            "GP" => Self::Glycerophospholipids,
            "SP" => Self::Sphingolipids,
            "ST" => Self::Sterols,
            "PK" => Self::Polyketides,
            "SL" => Self::Saccharolipids,
            _ => {
                return Err(LipidError::constraint(format!(
                    "unknown lipid category {s:?}"
                )))
            }
        })
    }
}

/// A headgroup modifier (e.g. an extra sugar or N-modification) that renders
/// before or after the class name depending on its kind, and can stay
/// invisible below a given specificity level.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct HeadgroupDecorator {
    group: FunctionalGroup,
    suffix: bool,
    lowest_visible_level: Option<LipidLevel>,
}

impl HeadgroupDecorator {
    pub fn new(group: FunctionalGroup, suffix: bool, lowest_visible_level: Option<LipidLevel>) -> Self {
        Self {
            group,
            suffix,
            lowest_visible_level,
        }
    }

    pub fn group(&self) -> &FunctionalGroup {
        &self.group
    }

    pub fn is_suffix(&self) -> bool {
        self.suffix
    }

    fn visible_at(&self, level: LipidLevel) -> bool {
        self.lowest_visible_level
            .map_or(true, |lowest| level >= lowest)
    }
}

/// The class-defining backbone fragment of a lipid, resolved against the
/// packaged class table.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Headgroup {
    name: String,
    category: LipidCategory,
    base_elements: ChemicalComposition,
    expected_chains: usize,
    use_raw_name: bool,
    decorators: Vec<HeadgroupDecorator>,
    sp_exception: bool,
}

impl Headgroup {
    pub fn new(name: &str, decorators: Vec<HeadgroupDecorator>) -> Result<Self> {
        let class = ClassDatabase::global()
            .lookup(name)
            .ok_or_else(|| LipidError::constraint(format!("unknown lipid class {name:?}")))?;
        // The single-oxygen exception only applies to an undecorated headgroup
        let sp_exception = class.sp_exception && decorators.is_empty();
        Ok(Self {
            name: class.name.clone(),
            category: class.category,
            base_elements: class.elements.clone(),
            expected_chains: class.chains,
            use_raw_name: false,
            decorators,
            sp_exception,
        })
    }

    /// A headgroup kept verbatim, for names outside the class table. Only
    /// class-level rendering is meaningful for these.
    pub fn raw(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: LipidCategory::Undefined,
            base_elements: ChemicalComposition::new(),
            expected_chains: 0,
            use_raw_name: true,
            decorators: Vec::new(),
            sp_exception: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> LipidCategory {
        self.category
    }

    pub fn expected_chains(&self) -> usize {
        self.expected_chains
    }

    pub fn use_raw_name(&self) -> bool {
        self.use_raw_name
    }

    pub fn decorators(&self) -> &[HeadgroupDecorator] {
        &self.decorators
    }

    pub fn sp_exception(&self) -> bool {
        self.sp_exception
    }

    pub fn elements(&self) -> ChemicalComposition {
        let mut elements = self.base_elements.clone();
        for decorator in &self.decorators {
            elements.add_scaled(&decorator.group().total_elements(), decorator.group().count());
        }
        if self.sp_exception {
            elements.add_atoms(Element::O, -1);
        }
        elements
    }

    pub fn render(&self, level: LipidLevel) -> String {
        if level == LipidLevel::Category {
            return self.category.to_string();
        }
        if level == LipidLevel::Class {
            return self.name.clone();
        }
        let (suffixes, prefixes): (Vec<_>, Vec<_>) = self
            .decorators
            .iter()
            .filter(|decorator| decorator.visible_at(level))
            .partition(|decorator| decorator.is_suffix());
        let prefix: String = prefixes
            .iter()
            .map(|decorator| decorator.group().render(level))
            .sorted()
            .map(|rendered| {
                if level >= LipidLevel::StructureDefined {
                    format!("{rendered}-")
                } else {
                    rendered
                }
            })
            .collect();
        let suffix: String = suffixes
            .iter()
            .map(|decorator| decorator.group().render(level))
            .collect();
        let attachment = if self.category == LipidCategory::Sphingolipids
            && !self.sp_exception
            && level >= LipidLevel::FullStructure
        {
            "(1)"
        } else {
            ""
        };
        format!("{prefix}{}{attachment}{suffix}", self.name)
    }
}

// Module Tests ========================================================================================================
