//! Module descriptor trait and metadata types
//!
//! A generator type describes its ports, category and label through
//! `ModuleDescriptor`, so the implementation is the single source of truth
//! for both behaviour and the metadata hosts show in their palettes.

use serde::{Deserialize, Serialize};

use crate::types::{ModuleCategory, PortDataType};

/// Trait for generator types that can describe their metadata
///
/// # Example
///
/// ```ignore
/// impl ModuleDescriptor for ScatterGenerator {
///     fn descriptor() -> ModuleMetadata {
///         ModuleMetadata {
///             type_name: "scatter".to_string(),
///             category: ModuleCategory::Distribution,
///             label: "Scatter".to_string(),
///             description: "Scatters copies around each parent".to_string(),
///             inputs: vec![PortMetadata::new("parent", "Parent", PortDataType::Objects)],
///             outputs: vec![PortMetadata::new("instances", "Instances", PortDataType::Objects)],
///         }
///     }
/// }
/// ```
pub trait ModuleDescriptor {
    /// Get the static metadata for this generator type
    fn descriptor() -> ModuleMetadata
    where
        Self: Sized;
}

/// Complete metadata for a generator type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleMetadata {
    /// Registry key, also written into saved procedures (e.g., "scatter")
    pub type_name: String,
    /// Category for UI grouping
    pub category: ModuleCategory,
    /// Human-readable label
    pub label: String,
    /// Description of what the generator does
    pub description: String,
    /// Input port definitions
    pub inputs: Vec<PortMetadata>,
    /// Output port definitions
    pub outputs: Vec<PortMetadata>,
}

/// Metadata for a port (input or output)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMetadata {
    /// Port identifier
    pub id: String,
    /// Human-readable label
    pub label: String,
    /// Data type
    pub data_type: PortDataType,
}

impl PortMetadata {
    /// Create a new port metadata
    pub fn new(id: impl Into<String>, label: impl Into<String>, data_type: PortDataType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data_type,
        }
    }
}
