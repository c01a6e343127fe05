//! Core types for module graphs
//!
//! Modules are addressed by their position in the owning list, so a
//! `PortRef` is only meaningful for the graph it was taken from and is
//! renumbered whenever a module before it is removed.

use serde::{Deserialize, Serialize};

/// One endpoint of a link: a module index and a port on that module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRef {
    pub module: usize,
    pub port: usize,
}

impl PortRef {
    pub fn new(module: usize, port: usize) -> Self {
        Self { module, port }
    }
}

impl std::fmt::Display for PortRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.module, self.port)
    }
}

/// Data carried by a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDataType {
    /// Accepts any collection
    Any,
    /// Decorated object collection
    Objects,
}

impl PortDataType {
    /// Check if this type can connect to another type
    pub fn is_compatible_with(&self, other: &PortDataType) -> bool {
        if matches!(self, PortDataType::Any) || matches!(other, PortDataType::Any) {
            return true;
        }
        self == other
    }
}

/// Category of a module type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleCategory {
    /// Emits new geometry
    Source,
    /// Places or repeats what it receives
    Distribution,
    /// Perturbs what it receives
    Modifier,
    /// Combines several inputs
    Combine,
}

/// Layout hint for the graph editor; the engine only stores it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Horizontal => 0,
            Self::Vertical => 1,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Horizontal),
            1 => Some(Self::Vertical),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_data_type_compatibility() {
        assert!(PortDataType::Any.is_compatible_with(&PortDataType::Objects));
        assert!(PortDataType::Objects.is_compatible_with(&PortDataType::Any));
        assert!(PortDataType::Objects.is_compatible_with(&PortDataType::Objects));
    }

    #[test]
    fn test_port_ref_ordering_and_display() {
        let a = PortRef::new(1, 0);
        let b = PortRef::new(1, 2);
        assert!(a < b);
        assert_eq!(b.to_string(), "1:2");
    }

    #[test]
    fn test_orientation_tag() {
        assert_eq!(Orientation::from_u8(Orientation::Vertical.to_u8()), Some(Orientation::Vertical));
        assert_eq!(Orientation::from_u8(7), None);
    }
}
