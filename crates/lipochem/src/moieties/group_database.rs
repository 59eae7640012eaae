use ahash::HashMap;
use once_cell::sync::Lazy;
use serde::Deserialize;

use super::{double_bonds::DoubleBonds, functional_group::FunctionalGroup};
use crate::{ChemicalComposition, LipidError, Result};

/// The read-only registry of known functional-group templates, loaded once
/// from the packaged table. Lookups hand out fresh clones, so no caller can
/// ever mutate the shared templates.
#[derive(Clone, Debug)]
pub struct GroupDatabase {
    templates: HashMap<String, FunctionalGroup>,
}

#[derive(Debug, Deserialize)]
struct GroupRow {
    name: String,
    atomic: bool,
    composition: String,
    double_bonds: i32,
}

impl GroupDatabase {
    pub fn from_csv(file_name: &str, csv_text: &str) -> Result<Self> {
        let mut templates = HashMap::default();
        let mut reader = csv::Reader::from_reader(csv_text.as_bytes());
        for row in reader.deserialize() {
            let GroupRow {
                name,
                atomic,
                composition,
                double_bonds,
            } = row.map_err(|e| LipidError::registry_load(file_name, e))?;
            let elements: ChemicalComposition = composition
                .parse()
                .map_err(|e: Box<LipidError>| LipidError::registry_load(file_name, e))?;
            let mut template = if atomic {
                FunctionalGroup::new_atomic(&name, elements)
            } else {
                FunctionalGroup::new(&name, elements)
            };
            if double_bonds > 0 {
                template.set_double_bonds(DoubleBonds::new(double_bonds));
            }
            templates.insert(name, template);
        }
        Ok(Self { templates })
    }

    /// A fresh, caller-owned copy of a known template, ready to be
    /// positioned and counted.
    pub fn lookup(&self, name: &str) -> Option<FunctionalGroup> {
        self.templates.get(name).cloned()
    }

    pub fn global() -> &'static Self {
        static DATABASE: Lazy<GroupDatabase> = Lazy::new(|| {
            GroupDatabase::from_csv(
                "functional-groups.csv",
                include_str!("../../data/functional-groups.csv"),
            )
            .expect("the packaged functional-group table must load")
        });
        &DATABASE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Element;

    #[test]
    fn packaged_table_loads() {
        let db = GroupDatabase::global();
        let hydroxyl = db.lookup("OH").unwrap();
        assert_eq!(hydroxyl.elements().count(Element::O), 1);
        assert!(!hydroxyl.is_atomic());
        assert_eq!(hydroxyl.position(), -1);

        let oxygen = db.lookup("O").unwrap();
        assert!(oxygen.is_atomic());

        assert!(db.lookup("not-a-group").is_none());
    }

    #[test]
    fn lookups_are_copy_on_read() {
        let db = GroupDatabase::global();
        let mut first = db.lookup("OH").unwrap();
        first.set_position(3);
        first.set_count(7);
        let second = db.lookup("OH").unwrap();
        assert_eq!(second.position(), -1);
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn corrupt_table_is_a_load_failure() {
        let result = GroupDatabase::from_csv("broken.csv", "name,atomic\nOH,true");
        assert!(matches!(
            *result.unwrap_err(),
            LipidError::RegistryLoad { .. }
        ));
    }
}
