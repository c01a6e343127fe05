//! Fluent builder for procedures
//!
//! Provides a compact API for constructing procedures programmatically,
//! with links addressed by module name instead of index.

use std::collections::HashMap;

use crate::module::{Generator, Module};
use crate::procedure::Procedure;
use crate::resources::{Resource, ResourceStore};
use crate::validation::{validate_graph, ValidationError};

/// A link by module names, resolved in `build`
struct PendingLink {
    from: String,
    from_port: usize,
    to: String,
    to_port: usize,
}

/// Fluent builder for constructing procedures
///
/// # Example
///
/// ```ignore
/// let procedure = ProcedureBuilder::new()
///     .seed(42)
///     .module("ground", ObjectGenerator::new("plane"))
///     .main_entry()
///     .module("trees", ScatterGenerator::new("tree", 12))
///     .link("ground", 0, "trees", 0)
///     .build();
/// ```
pub struct ProcedureBuilder {
    modules: Vec<Module>,
    links: Vec<PendingLink>,
    main_entry: Option<usize>,
    seed: i64,
    view_level: i32,
    rendering_level: i32,
    resources: ResourceStore,
}

impl ProcedureBuilder {
    /// Create a new procedure builder
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            links: Vec::new(),
            main_entry: None,
            seed: 0,
            view_level: 0,
            rendering_level: 0,
            resources: ResourceStore::new(),
        }
    }

    /// Add a module
    pub fn module(mut self, name: impl Into<String>, generator: impl Generator + 'static) -> Self {
        self.modules.push(Module::new(name, Box::new(generator)));
        self
    }

    /// Add a module from an already boxed generator
    pub fn boxed_module(mut self, name: impl Into<String>, generator: Box<dyn Generator>) -> Self {
        self.modules.push(Module::new(name, generator));
        self
    }

    /// Flag the most recently added module as main entry
    ///
    /// Must be called immediately after `module`.
    pub fn main_entry(mut self) -> Self {
        self.main_entry = self.modules.len().checked_sub(1);
        self
    }

    /// Link two modules by name
    pub fn link(mut self, from: impl Into<String>, from_port: usize, to: impl Into<String>, to_port: usize) -> Self {
        self.links.push(PendingLink {
            from: from.into(),
            from_port,
            to: to.into(),
            to_port,
        });
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    pub fn view_level(mut self, level: i32) -> Self {
        self.view_level = level;
        self
    }

    pub fn rendering_level(mut self, level: i32) -> Self {
        self.rendering_level = level;
        self
    }

    /// Add a resource to the procedure's store
    pub fn resource(mut self, resource: Resource) -> Self {
        self.resources.insert(resource);
        self
    }

    /// Build the procedure without validation
    ///
    /// Links naming unknown modules are logged and skipped. Without an
    /// explicit main entry, the usual repair picks the last module.
    pub fn build(self) -> Procedure {
        let mut procedure = Procedure::with_resources(self.resources);
        procedure.set_seed(self.seed);
        procedure.set_view_level(self.view_level);
        procedure.set_rendering_level(self.rendering_level);

        let mut by_name: HashMap<String, usize> = HashMap::new();
        for module in self.modules {
            let name = module.name().to_string();
            let index = procedure.add_module(module);
            by_name.entry(name).or_insert(index);
        }

        for link in &self.links {
            match (by_name.get(&link.from), by_name.get(&link.to)) {
                (Some(&from), Some(&to)) => {
                    procedure.set_link(from, link.from_port, to, link.to_port);
                }
                _ => log::warn!("Skipping link {} -> {}: unknown module", link.from, link.to),
            }
        }

        if let Some(main) = self.main_entry {
            procedure.set_main_entry(main);
        }
        procedure
    }

    /// Build and reject graphs with structural problems
    pub fn build_validated(self) -> Result<Procedure, Vec<ValidationError>> {
        let procedure = self.build();
        let errors = validate_graph(procedure.graph(), None);
        if errors.is_empty() {
            Ok(procedure)
        } else {
            Err(errors)
        }
    }
}

impl Default for ProcedureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixedGenerator;
    use crate::types::PortRef;

    #[test]
    fn test_builder_basic() {
        let procedure = ProcedureBuilder::new()
            .seed(42)
            .view_level(2)
            .module("a", FixedGenerator::new(0, 1, 1))
            .main_entry()
            .module("b", FixedGenerator::new(1, 1, 1))
            .link("a", 0, "b", 0)
            .resource(Resource::geometry("cube", vec![]))
            .build();

        assert_eq!(procedure.seed(), 42);
        assert_eq!(procedure.view_level(), 2);
        assert_eq!(procedure.graph().len(), 2);
        assert_eq!(procedure.graph().main_entry(), Some(0));
        assert_eq!(procedure.graph().module(1).unwrap().link_in(0), Some(PortRef::new(0, 0)));
        assert!(procedure.resources().contains("cube"));
    }

    #[test]
    fn test_unknown_link_names_are_skipped() {
        let procedure = ProcedureBuilder::new()
            .module("a", FixedGenerator::new(0, 1, 1))
            .link("a", 0, "nowhere", 0)
            .build();
        assert!(!procedure.graph().module(0).unwrap().has_links());
    }

    #[test]
    fn test_build_validated_rejects_cycles() {
        let result = ProcedureBuilder::new()
            .module("a", FixedGenerator::new(1, 1, 1))
            .main_entry()
            .module("b", FixedGenerator::new(1, 1, 1))
            .link("a", 0, "b", 0)
            .link("b", 0, "a", 0)
            .build_validated();
        let errors = result.unwrap_err();
        assert!(errors.contains(&ValidationError::CycleDetected));
    }
}
