pub mod adduct;
pub mod class_database;
pub mod descriptor;
pub mod level;
pub mod lipid;
pub mod species_info;
