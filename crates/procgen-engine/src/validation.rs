//! Graph validation for module graphs
//!
//! Checks that the two link representations agree, that the graph has a
//! single main entry, and detects cycles.

use std::collections::{HashMap, VecDeque};

use crate::graph::ModuleGraph;
use crate::registry::ModuleRegistry;
use crate::types::PortRef;

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Cycle detected in the graph
    CycleDetected,
    /// A link endpoint names a module or port that does not exist
    DanglingLink { from: PortRef, to: PortRef },
    /// An output lists a target whose input does not point back
    MissingBackLink { from: PortRef, to: PortRef },
    /// An input names a source whose fan-out does not list it
    MissingForwardLink { from: PortRef, to: PortRef },
    /// An input appears more than once across all fan-out lists
    FanIn { input: PortRef, sources: usize },
    /// No module is flagged as main entry
    MissingMainEntry,
    /// More than one module is flagged as main entry
    MultipleMainEntries { count: usize },
    /// A module's generator type is not in the registry
    UnknownModuleType { module: usize, type_name: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleDetected => write!(f, "Cycle detected in graph"),
            Self::DanglingLink { from, to } => {
                write!(f, "Link {} -> {} references a missing module or port", from, to)
            }
            Self::MissingBackLink { from, to } => {
                write!(f, "Link {} -> {} is not recorded on the input side", from, to)
            }
            Self::MissingForwardLink { from, to } => {
                write!(f, "Link {} -> {} is not recorded on the output side", from, to)
            }
            Self::FanIn { input, sources } => {
                write!(f, "Input {} is fed by {} links", input, sources)
            }
            Self::MissingMainEntry => write!(f, "Graph has no main entry"),
            Self::MultipleMainEntries { count } => {
                write!(f, "Graph has {} main entries", count)
            }
            Self::UnknownModuleType { module, type_name } => {
                write!(f, "Unknown module type '{}' for module {}", type_name, module)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a module graph
///
/// Returns all validation errors found (not just the first).
/// Pass a registry to also check generator types.
pub fn validate_graph(graph: &ModuleGraph, registry: Option<&ModuleRegistry>) -> Vec<ValidationError> {
    let mut errors = validate_links(graph);

    validate_main_entry(graph, &mut errors);
    detect_cycles(graph, &mut errors);

    if let Some(reg) = registry {
        validate_module_types(graph, reg, &mut errors);
    }

    errors
}

/// Check only that both link representations agree
///
/// This is the invariant every graph edit must keep, and what a decoded
/// graph has to satisfy before it is accepted.
pub fn validate_links(graph: &ModuleGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut feeds: HashMap<PortRef, usize> = HashMap::new();

    for (index, module) in graph.iter().enumerate() {
        for port in 0..module.num_outputs() {
            let from = PortRef::new(index, port);
            for &to in module.links_out(port) {
                let Some(target) = graph.module(to.module).filter(|m| to.port < m.num_inputs()) else {
                    errors.push(ValidationError::DanglingLink { from, to });
                    continue;
                };
                *feeds.entry(to).or_insert(0) += 1;
                if target.link_in(to.port) != Some(from) {
                    errors.push(ValidationError::MissingBackLink { from, to });
                }
            }
        }

        for port in 0..module.num_inputs() {
            let to = PortRef::new(index, port);
            let Some(from) = module.link_in(port) else {
                continue;
            };
            let Some(source) = graph.module(from.module).filter(|m| from.port < m.num_outputs()) else {
                errors.push(ValidationError::DanglingLink { from, to });
                continue;
            };
            if !source.links_out(from.port).contains(&to) {
                errors.push(ValidationError::MissingForwardLink { from, to });
            }
        }
    }

    let mut fan_in: Vec<(PortRef, usize)> = feeds.into_iter().filter(|&(_, n)| n > 1).collect();
    fan_in.sort();
    for (input, sources) in fan_in {
        errors.push(ValidationError::FanIn { input, sources });
    }

    errors
}

fn validate_main_entry(graph: &ModuleGraph, errors: &mut Vec<ValidationError>) {
    match graph.main_entry_count() {
        0 if !graph.is_empty() => errors.push(ValidationError::MissingMainEntry),
        0 | 1 => {}
        count => errors.push(ValidationError::MultipleMainEntries { count }),
    }
}

/// Detect cycles using Kahn's algorithm (topological sort)
fn detect_cycles(graph: &ModuleGraph, errors: &mut Vec<ValidationError>) {
    let n = graph.len();
    let mut in_degree = vec![0usize; n];
    for module in graph.iter() {
        for port in 0..module.num_outputs() {
            for target in module.links_out(port) {
                if target.module < n {
                    in_degree[target.module] += 1;
                }
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();

    let mut visited = 0;
    while let Some(index) = queue.pop_front() {
        visited += 1;
        let Some(module) = graph.module(index) else {
            continue;
        };
        for port in 0..module.num_outputs() {
            for target in module.links_out(port) {
                if let Some(deg) = in_degree.get_mut(target.module) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(target.module);
                    }
                }
            }
        }
    }

    if visited < n {
        errors.push(ValidationError::CycleDetected);
    }
}

/// Check that all modules have known types in the registry
fn validate_module_types(graph: &ModuleGraph, registry: &ModuleRegistry, errors: &mut Vec<ValidationError>) {
    for (module, m) in graph.iter().enumerate() {
        if !registry.has_module_type(m.type_name()) {
            errors.push(ValidationError::UnknownModuleType {
                module,
                type_name: m.type_name().to_string(),
            });
        }
    }
}
