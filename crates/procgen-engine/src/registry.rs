//! Generator type registry for polymorphic module reconstruction
//!
//! Saved procedures name each module's generator by its type string. The
//! registry maps that string back to metadata and to the constructors that
//! build a default generator or decode one from its parameter block.
//!
//! # Usage
//!
//! ```ignore
//! use procgen_engine::ModuleRegistry;
//!
//! // every generator submitted with inventory::submit!
//! let registry = ModuleRegistry::with_builtins();
//!
//! // or by hand, e.g. in tests
//! let mut registry = ModuleRegistry::new();
//! registry.register(MyGenerator::descriptor(), MyGenerator::create, MyGenerator::decode);
//! ```

use std::collections::HashMap;

use crate::codec::ByteReader;
use crate::descriptor::ModuleMetadata;
use crate::error::{ProcEngineError, Result};
use crate::module::Generator;
use crate::types::ModuleCategory;

/// Builds a generator with default parameters
pub type CreateFn = fn() -> Box<dyn Generator>;

/// Reads a generator's parameter block
pub type DecodeFn = fn(&mut ByteReader<'_>) -> Result<Box<dyn Generator>>;

/// Link-time registration of a generator type
///
/// Generator crates submit one of these per type with
/// `inventory::submit!`; [`ModuleRegistry::with_builtins`] collects them.
pub struct GeneratorRegistration {
    pub descriptor: fn() -> ModuleMetadata,
    pub create: CreateFn,
    pub decode: DecodeFn,
}

inventory::collect!(GeneratorRegistration);

/// A registration entry combining metadata with constructors
struct RegistryEntry {
    metadata: ModuleMetadata,
    create: CreateFn,
    decode: DecodeFn,
}

/// Registry of generator types with their metadata and constructors
///
/// # Composability
///
/// Registries can be composed by merging:
/// ```ignore
/// let mut registry = ModuleRegistry::with_builtins();
/// registry.merge(plugin_registry); // Add plugin generators
/// ```
pub struct ModuleRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry holding every generator submitted via `inventory`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for registration in inventory::iter::<GeneratorRegistration> {
            registry.register((registration.descriptor)(), registration.create, registration.decode);
        }
        log::debug!("Collected {} generator types", registry.entries.len());
        registry
    }

    /// Register a generator type
    ///
    /// A later registration with the same type name replaces the earlier one.
    pub fn register(&mut self, metadata: ModuleMetadata, create: CreateFn, decode: DecodeFn) {
        self.entries.insert(
            metadata.type_name.clone(),
            RegistryEntry {
                metadata,
                create,
                decode,
            },
        );
    }

    /// Build a generator with default parameters
    pub fn create(&self, type_name: &str) -> Option<Box<dyn Generator>> {
        self.entries.get(type_name).map(|e| (e.create)())
    }

    /// Decode a generator's parameter block
    pub fn decode(&self, type_name: &str, reader: &mut ByteReader<'_>) -> Result<Box<dyn Generator>> {
        let entry = self
            .entries
            .get(type_name)
            .ok_or_else(|| ProcEngineError::UnknownModuleType(type_name.to_string()))?;
        (entry.decode)(reader)
    }

    /// Get metadata for a generator type
    pub fn get_metadata(&self, type_name: &str) -> Option<&ModuleMetadata> {
        self.entries.get(type_name).map(|e| &e.metadata)
    }

    /// Get all registered metadata
    pub fn all_metadata(&self) -> Vec<&ModuleMetadata> {
        self.entries.values().map(|e| &e.metadata).collect()
    }

    /// Get metadata grouped by category
    pub fn metadata_by_category(&self) -> HashMap<ModuleCategory, Vec<&ModuleMetadata>> {
        let mut grouped: HashMap<ModuleCategory, Vec<&ModuleMetadata>> = HashMap::new();
        for entry in self.entries.values() {
            grouped.entry(entry.metadata.category).or_default().push(&entry.metadata);
        }
        grouped
    }

    /// Check if a generator type is registered
    pub fn has_module_type(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// List all registered type names, sorted
    pub fn module_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` if they share the same type name.
    pub fn merge(&mut self, other: ModuleRegistry) {
        self.entries.extend(other.entries);
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("types", &self.module_types())
            .finish()
    }
}
