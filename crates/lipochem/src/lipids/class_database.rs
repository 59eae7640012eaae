use ahash::HashMap;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::{ChemicalComposition, LipidCategory, LipidError, Result};

/// One row of lipid-class metadata: the class-defining backbone fragment,
/// how many chains it expects, and its base elemental contribution.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct LipidClass {
    pub name: String,
    pub category: LipidCategory,
    pub description: String,
    pub chains: usize,
    pub elements: ChemicalComposition,
    pub sp_exception: bool,
    pub synonyms: Vec<String>,
}

/// Read-only lookup service over the packaged class table, keyed by the
/// canonical class name and every synonym.
#[derive(Clone, Debug)]
pub struct ClassDatabase {
    classes: Vec<LipidClass>,
    by_name: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct ClassRow {
    name: String,
    category: String,
    description: String,
    chains: usize,
    composition: String,
    sp_exception: bool,
    synonyms: String,
}

impl ClassDatabase {
    pub fn from_csv(file_name: &str, csv_text: &str) -> Result<Self> {
        let mut classes = Vec::new();
        let mut by_name = HashMap::default();
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        for row in reader.deserialize() {
            let ClassRow {
                name,
                category,
                description,
                chains,
                composition,
                sp_exception,
                synonyms,
            } = row.map_err(|e| LipidError::registry_load(file_name, e))?;
            let category: LipidCategory = category
                .parse()
                .map_err(|e: Box<LipidError>| LipidError::registry_load(file_name, e))?;
            let elements: ChemicalComposition = composition
                .parse()
                .map_err(|e: Box<LipidError>| LipidError::registry_load(file_name, e))?;
            let synonyms: Vec<String> = synonyms
                .split(';')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
            let index = classes.len();
            by_name.insert(name.clone(), index);
            for synonym in &synonyms {
                by_name.insert(synonym.clone(), index);
            }
            classes.push(LipidClass {
                name,
                category,
                description,
                chains,
                elements,
                sp_exception,
                synonyms,
            });
        }
        Ok(Self { classes, by_name })
    }

    /// Resolves a class by its canonical name or any registered synonym.
    pub fn lookup(&self, name: &str) -> Option<&LipidClass> {
        self.by_name.get(name).map(|&index| &self.classes[index])
    }

    pub fn global() -> &'static Self {
        static DATABASE: Lazy<ClassDatabase> = Lazy::new(|| {
            ClassDatabase::from_csv(
                "lipid-classes.csv",
                include_str!("../../data/lipid-classes.csv"),
            )
            .expect("the packaged lipid-class table must load")
        });
        &DATABASE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packaged_table_loads() {
        let db = ClassDatabase::global();
        let pc = db.lookup("PC").unwrap();
        assert_eq!(pc.category, LipidCategory::Glycerophospholipids);
        assert_eq!(pc.chains, 2);
        assert_eq!(pc.elements.sum_formula(), "C8H18NO6P");
        assert!(!pc.sp_exception);
    }

    #[test]
    fn synonyms_resolve_to_the_same_class() {
        let db = ClassDatabase::global();
        assert_eq!(db.lookup("GPCho").unwrap().name, "PC");
        assert_eq!(db.lookup("CE").unwrap().name, "SE 27:1");
        assert!(db.lookup("XYZ").is_none());
    }

    #[test]
    fn sphingolipid_exception_flags() {
        let db = ClassDatabase::global();
        assert!(db.lookup("Cer").unwrap().sp_exception);
        assert!(db.lookup("SPB").unwrap().sp_exception);
        assert!(!db.lookup("SM").unwrap().sp_exception);
    }

    #[test]
    fn corrupt_table_is_a_load_failure() {
        let result = ClassDatabase::from_csv("broken.csv", "name,category\nPC,GP");
        assert!(matches!(
            *result.unwrap_err(),
            LipidError::RegistryLoad { .. }
        ));
    }
}
