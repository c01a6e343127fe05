//! Read-only upstream index built once per evaluation pass
//!
//! Generators sometimes need to look at what feeds their inputs, or how many
//! siblings share the output they hang from. The resolver answers those
//! questions from a snapshot of the link tables, and hands each module a
//! sub-seed that stays fixed for the whole pass.

use crate::module::Module;
use crate::rng::ProcRng;
use crate::types::PortRef;

/// Precomputed per-input link facts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InputLink {
    source: PortRef,
    sibling_index: usize,
    sibling_count: usize,
}

/// Upstream lookup table and module-local seeds
#[derive(Debug, Clone, Default)]
pub struct BackLinkResolver {
    inputs: Vec<Vec<Option<InputLink>>>,
    seeds: Vec<i64>,
}

impl BackLinkResolver {
    /// Index `modules` and derive one seed per module, in index order
    pub fn build(modules: &[Module], seed: i64) -> Self {
        let mut rng = ProcRng::new(seed);
        let seeds = modules.iter().map(|_| rng.next_derived_seed()).collect();

        let inputs = modules
            .iter()
            .enumerate()
            .map(|(index, module)| {
                (0..module.num_inputs())
                    .map(|port| Self::resolve_input(modules, index, port, module.link_in(port)))
                    .collect()
            })
            .collect();

        Self { inputs, seeds }
    }

    fn resolve_input(
        modules: &[Module],
        index: usize,
        port: usize,
        source: Option<PortRef>,
    ) -> Option<InputLink> {
        let source = source?;
        let Some(feeder) = modules.get(source.module) else {
            log::warn!("Input {}:{} names missing module {}", index, port, source.module);
            return None;
        };
        let fan_out = feeder.links_out(source.port);
        let this = PortRef::new(index, port);
        let Some(sibling_index) = fan_out.iter().position(|&t| t == this) else {
            log::warn!("Input {}:{} is not listed by its source {}", index, port, source);
            return None;
        };
        Some(InputLink {
            source,
            sibling_index,
            sibling_count: fan_out.len(),
        })
    }

    /// Number of modules indexed
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    fn link(&self, module: usize, port: usize) -> Option<&InputLink> {
        self.inputs.get(module)?.get(port)?.as_ref()
    }

    /// Output feeding `module`'s input `port`
    pub fn source_of(&self, module: usize, port: usize) -> Option<PortRef> {
        self.link(module, port).map(|l| l.source)
    }

    /// Sub-seed of `module` for this pass; 0 for an unknown index
    pub fn seed_for(&self, module: usize) -> i64 {
        self.seeds.get(module).copied().unwrap_or(0)
    }

    /// How many links leave the output feeding `module`'s input `port`
    pub fn sibling_count(&self, module: usize, port: usize) -> usize {
        self.link(module, port).map_or(0, |l| l.sibling_count)
    }

    /// Ordinal of this input in its source's fan-out
    pub fn sibling_index(&self, module: usize, port: usize) -> Option<usize> {
        self.link(module, port).map(|l| l.sibling_index)
    }

    /// Number of inputs of `module` that have a source
    pub fn connected_inputs(&self, module: usize) -> usize {
        self.inputs.get(module).map_or(0, |ports| ports.iter().filter(|p| p.is_some()).count())
    }
}
