//! Procgen Modules
//!
//! Generator implementations for the procgen engine. Every type submits a
//! `GeneratorRegistration` through `inventory`, so
//! `ModuleRegistry::with_builtins()` knows them as soon as this crate is
//! linked.
//!
//! # Categories
//!
//! - **Source**: place single objects (`object`)
//! - **Distribution**: spread copies around parents (`scatter`, `stack`)
//! - **Modifier**: rework upstream entries (`jitter`)
//! - **Combine**: join several upstream modules (`merge`)

mod common;

pub mod combine;
pub mod demo;
pub mod distribution;
pub mod modifier;
pub mod source;

// Re-export all generators for convenience
pub use combine::*;
pub use demo::{demo_procedure, initial_procedure, DEMO_SEED};
pub use distribution::*;
pub use modifier::*;
pub use source::*;

#[cfg(test)]
mod tests {
    use procgen_engine::{ModuleCategory, ModuleRegistry};

    #[test]
    fn test_inventory_collects_all_builtins() {
        let registry = ModuleRegistry::with_builtins();
        assert_eq!(registry.all_metadata().len(), 5, "Expected 5 built-in generators");
        assert_eq!(registry.module_types(), vec!["jitter", "merge", "object", "scatter", "stack"]);

        let by_category = registry.metadata_by_category();
        assert_eq!(by_category.get(&ModuleCategory::Distribution).map(Vec::len), Some(2));
    }

    #[test]
    fn test_registry_creates_defaults() {
        let registry = ModuleRegistry::with_builtins();
        for type_name in registry.module_types() {
            let generator = registry.create(type_name).unwrap();
            assert_eq!(generator.type_name(), type_name);
        }
    }
}
