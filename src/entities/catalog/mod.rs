pub mod assembly;
pub mod assembly_component;
pub mod part;
