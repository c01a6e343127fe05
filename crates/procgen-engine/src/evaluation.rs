//! Evaluation pass: turns (modules, seed) into a decorated collection
//!
//! A pass walks downstream from a root module. Each visited module first
//! produces its own contribution; then, output by output and link by link in
//! fan-out order, every linked module is expanded the same way and its
//! subtree is merged below the parent at the port's level offset.
//!
//! A module's own contribution only depends on what feeds its inputs, so it
//! is computed at most once per pass and shared between every place the
//! module appears in the expanded tree. Upstream values are pulled on demand
//! through the back-link resolver.
//!
//! Every pass builds its own resolver and memo, so passes never share
//! mutable state.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::backlink::BackLinkResolver;
use crate::collection::DecoratedCollection;
use crate::error::{ProcEngineError, Result};
use crate::module::Module;
use crate::resources::ResourceStore;
use crate::rng::ProcRng;

/// Default nesting limit for a pass
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Where a partial evaluation stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// Include the module but nothing linked below it
    After(usize),
    /// Leave out the module and every module downstream of it
    Before(usize),
}

/// One evaluation request
pub struct EvaluationPass<'a> {
    modules: &'a [Module],
    resources: &'a ResourceStore,
    resolver: BackLinkResolver,
    stop: Option<Stop>,
    /// Modules left out by `Stop::Before`: the stop module and its downstream
    excluded: HashSet<usize>,
    max_depth: usize,
    view_level: i32,
    rendering_level: i32,
    contributions: RefCell<HashMap<usize, Rc<DecoratedCollection>>>,
    /// Modules whose own contribution is being computed
    pulling: RefCell<Vec<usize>>,
}

impl<'a> EvaluationPass<'a> {
    pub fn new(modules: &'a [Module], seed: i64, resources: &'a ResourceStore) -> Self {
        Self {
            modules,
            resources,
            resolver: BackLinkResolver::build(modules, seed),
            stop: None,
            excluded: HashSet::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            view_level: 0,
            rendering_level: 0,
            contributions: RefCell::new(HashMap::new()),
            pulling: RefCell::new(Vec::new()),
        }
    }

    pub fn with_stop(mut self, stop: Option<Stop>) -> Self {
        self.excluded = match stop {
            Some(Stop::Before(module)) => downstream_of(self.modules, module),
            _ => HashSet::new(),
        };
        self.stop = stop;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Thresholds of the collection the pass returns
    pub fn with_levels(mut self, view_level: i32, rendering_level: i32) -> Self {
        self.view_level = view_level;
        self.rendering_level = rendering_level;
        self
    }

    pub fn resolver(&self) -> &BackLinkResolver {
        &self.resolver
    }

    /// Expand the tree rooted at `root`
    pub fn run(&self, root: usize) -> Result<DecoratedCollection> {
        if root >= self.modules.len() {
            return Err(ProcEngineError::failed(format!(
                "root module {} out of range ({} modules)",
                root,
                self.modules.len()
            )));
        }
        if self.excluded.contains(&root) {
            return Ok(DecoratedCollection::with_levels(self.view_level, self.rendering_level));
        }
        let mut path = Vec::new();
        let out = self.expand(root, &mut path)?;
        log::debug!(
            "Evaluated from '{}': {} entries, {} modules computed",
            self.modules[root].name(),
            out.len(),
            self.contributions.borrow().len()
        );
        Ok(out)
    }

    fn expand(&self, index: usize, path: &mut Vec<usize>) -> Result<DecoratedCollection> {
        if path.contains(&index) {
            return Err(ProcEngineError::CycleDetected { module: index });
        }
        if path.len() >= self.max_depth {
            return Err(ProcEngineError::failed(format!(
                "nesting deeper than {} modules at module {}",
                self.max_depth, index
            )));
        }
        let module = &self.modules[index];

        let mut out = DecoratedCollection::with_levels(self.view_level, self.rendering_level);
        out.merge_all(&*self.contribution(index)?, 0);
        if self.stop == Some(Stop::After(index)) {
            return Ok(out);
        }

        path.push(index);
        for port in 0..module.num_outputs() {
            let offset = module.generator().child_level_offset(port);
            for target in module.links_out(port) {
                if target.module >= self.modules.len() {
                    log::warn!("'{}' links to missing module {}", module.name(), target.module);
                    continue;
                }
                if self.excluded.contains(&target.module) {
                    continue;
                }
                let child = self.expand(target.module, path)?;
                out.merge_all(&child, offset);
            }
        }
        path.pop();
        Ok(out)
    }

    /// Own contribution of `index`, computed once per pass
    fn contribution(&self, index: usize) -> Result<Rc<DecoratedCollection>> {
        if let Some(done) = self.contributions.borrow().get(&index) {
            return Ok(Rc::clone(done));
        }
        {
            let mut pulling = self.pulling.borrow_mut();
            if pulling.contains(&index) {
                return Err(ProcEngineError::CycleDetected { module: index });
            }
            if pulling.len() >= self.max_depth {
                return Err(ProcEngineError::failed(format!(
                    "upstream chain deeper than {} modules at module {}",
                    self.max_depth, index
                )));
            }
            pulling.push(index);
        }

        let module = &self.modules[index];
        let ctx = GenerationContext { pass: self, module: index };
        let result = module.generator().evaluate(&ctx);
        self.pulling.borrow_mut().pop();

        let own = Rc::new(result?);
        log::trace!("'{}' contributed {} entries", module.name(), own.len());
        self.contributions.borrow_mut().insert(index, Rc::clone(&own));
        Ok(own)
    }
}

/// `start` plus every module reachable from it over output links
fn downstream_of(modules: &[Module], start: usize) -> HashSet<usize> {
    let mut seen = HashSet::new();
    let mut stack = vec![start];
    while let Some(index) = stack.pop() {
        if !seen.insert(index) {
            continue;
        }
        let Some(module) = modules.get(index) else {
            continue;
        };
        for port in 0..module.num_outputs() {
            stack.extend(module.links_out(port).iter().map(|t| t.module));
        }
    }
    seen
}

/// What a generator sees while producing its own entries
pub struct GenerationContext<'p> {
    pass: &'p EvaluationPass<'p>,
    module: usize,
}

impl<'p> GenerationContext<'p> {
    pub fn module_index(&self) -> usize {
        self.module
    }

    pub fn module_name(&self) -> &str {
        self.pass.modules[self.module].name()
    }

    /// Module-local seed for this pass
    pub fn seed(&self) -> i64 {
        self.pass.resolver.seed_for(self.module)
    }

    /// Fresh generator seeded with [`seed`](Self::seed)
    pub fn rng(&self) -> ProcRng {
        ProcRng::new(self.seed())
    }

    pub fn resolver(&self) -> &BackLinkResolver {
        &self.pass.resolver
    }

    pub fn resources(&self) -> &ResourceStore {
        self.pass.resources
    }

    /// Sibling ordinal of the link feeding `port`
    pub fn sibling_index(&self, port: usize) -> Option<usize> {
        self.pass.resolver.sibling_index(self.module, port)
    }

    pub fn sibling_count(&self, port: usize) -> usize {
        self.pass.resolver.sibling_count(self.module, port)
    }

    /// Own contribution of the module feeding `port`, or `None` if unlinked
    pub fn input(&self, port: usize) -> Result<Option<Rc<DecoratedCollection>>> {
        let Some(source) = self.pass.resolver.source_of(self.module, port) else {
            return Ok(None);
        };
        if source.module >= self.pass.modules.len() || self.pass.excluded.contains(&source.module) {
            return Ok(None);
        }
        self.pass.contribution(source.module).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ModuleGraph;
    use crate::test_support::FixedGenerator;

    fn add(graph: &mut ModuleGraph, name: &str, inputs: usize, outputs: usize, count: usize) -> usize {
        graph.add_module(Module::new(name, Box::new(FixedGenerator::new(inputs, outputs, count))))
    }

    fn levels(c: &DecoratedCollection) -> Vec<i32> {
        c.iter().map(|e| e.decoration_level).collect()
    }

    #[test]
    fn test_chain_entry_count_is_sum() {
        let mut graph = ModuleGraph::new();
        add(&mut graph, "a", 0, 1, 2);
        add(&mut graph, "b", 1, 1, 3);
        add(&mut graph, "c", 1, 0, 1);
        graph.set_link(0, 0, 1, 0);
        graph.set_link(1, 0, 2, 0);

        let store = ResourceStore::new();
        let out = EvaluationPass::new(graph.modules(), 42, &store).run(0).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(levels(&out), vec![0, 0, 1, 1, 1, 2]);
        // c saw the three entries of b
        assert_eq!(out.entry(5).unwrap().size_y, 3.0);
    }

    #[test]
    fn test_fan_out_order() {
        let mut graph = ModuleGraph::new();
        add(&mut graph, "root", 0, 1, 1);
        add(&mut graph, "x", 1, 0, 1);
        add(&mut graph, "y", 1, 0, 1);
        graph.set_link(0, 0, 2, 0);
        graph.set_link(0, 0, 1, 0);

        let store = ResourceStore::new();
        let out = EvaluationPass::new(graph.modules(), 1, &store).run(0).unwrap();
        let names: Vec<&str> = out.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["root.0", "y.0", "x.0"]);
    }

    #[test]
    fn test_same_seed_same_output() {
        let mut graph = ModuleGraph::new();
        add(&mut graph, "a", 0, 1, 4);
        add(&mut graph, "b", 1, 0, 4);
        graph.set_link(0, 0, 1, 0);

        let store = ResourceStore::new();
        let first = EvaluationPass::new(graph.modules(), 7, &store).run(0).unwrap();
        let second = EvaluationPass::new(graph.modules(), 7, &store).run(0).unwrap();
        let other = EvaluationPass::new(graph.modules(), 8, &store).run(0).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(levels(&first), levels(&other));
    }

    #[test]
    fn test_input_pulls_unvisited_upstream() {
        // root -> sink.0 while side -> sink.1; side is never visited from root
        let mut graph = ModuleGraph::new();
        add(&mut graph, "root", 0, 1, 1);
        add(&mut graph, "side", 0, 1, 5);
        add(&mut graph, "sink", 2, 0, 1);
        graph.set_link(0, 0, 2, 0);
        graph.set_link(1, 0, 2, 1);

        let store = ResourceStore::new();
        let out = EvaluationPass::new(graph.modules(), 3, &store).run(0).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.entry(1).unwrap().size_y, 6.0);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = ModuleGraph::new();
        add(&mut graph, "a", 1, 1, 1);
        add(&mut graph, "b", 1, 1, 1);
        graph.set_link(0, 0, 1, 0);
        graph.set_link(1, 0, 0, 0);

        let store = ResourceStore::new();
        let err = EvaluationPass::new(graph.modules(), 3, &store).run(0).unwrap_err();
        assert!(matches!(err, ProcEngineError::CycleDetected { .. }));
    }

    #[test]
    fn test_max_depth() {
        let mut graph = ModuleGraph::new();
        add(&mut graph, "m0", 0, 1, 1);
        for i in 1..6 {
            add(&mut graph, &format!("m{}", i), 1, 1, 1);
            graph.set_link(i - 1, 0, i, 0);
        }

        let store = ResourceStore::new();
        let err = EvaluationPass::new(graph.modules(), 3, &store)
            .with_max_depth(3)
            .run(0)
            .unwrap_err();
        assert!(matches!(err, ProcEngineError::EvaluationFailed(_)));
    }

    #[test]
    fn test_partial_stops() {
        let mut graph = ModuleGraph::new();
        add(&mut graph, "a", 0, 1, 1);
        add(&mut graph, "b", 1, 1, 1);
        add(&mut graph, "c", 1, 0, 1);
        graph.set_link(0, 0, 1, 0);
        graph.set_link(1, 0, 2, 0);

        let store = ResourceStore::new();
        let after = EvaluationPass::new(graph.modules(), 3, &store)
            .with_stop(Some(Stop::After(1)))
            .run(0)
            .unwrap();
        assert_eq!(after.len(), 2);

        let before = EvaluationPass::new(graph.modules(), 3, &store)
            .with_stop(Some(Stop::Before(1)))
            .run(0)
            .unwrap();
        assert_eq!(before.len(), 1);

        let nothing = EvaluationPass::new(graph.modules(), 3, &store)
            .with_stop(Some(Stop::Before(0)))
            .run(0)
            .unwrap();
        assert!(nothing.is_empty());
    }

    #[test]
    fn test_stop_before_excludes_side_fed_downstream() {
        // root -> sink.0, root -> keep.0, side -> sink.1
        let mut graph = ModuleGraph::new();
        add(&mut graph, "root", 0, 1, 1);
        add(&mut graph, "side", 0, 1, 5);
        add(&mut graph, "sink", 2, 0, 1);
        add(&mut graph, "keep", 1, 0, 1);
        graph.set_link(0, 0, 2, 0);
        graph.set_link(1, 0, 2, 1);
        graph.set_link(0, 0, 3, 0);

        let store = ResourceStore::new();
        let names = |c: &DecoratedCollection| c.iter().map(|e| e.name.clone()).collect::<Vec<_>>();

        let full = EvaluationPass::new(graph.modules(), 3, &store).run(0).unwrap();
        assert_eq!(names(&full), vec!["root.0", "sink.0", "keep.0"]);
        assert_eq!(full.entry(1).unwrap().size_y, 6.0);

        let cut = EvaluationPass::new(graph.modules(), 3, &store)
            .with_stop(Some(Stop::Before(1)))
            .run(0)
            .unwrap();
        assert_eq!(names(&cut), vec!["root.0", "keep.0"]);
    }

    #[test]
    fn test_stopped_source_reads_as_unlinked() {
        let mut graph = ModuleGraph::new();
        add(&mut graph, "root", 0, 1, 1);
        add(&mut graph, "side", 0, 1, 5);
        add(&mut graph, "sink", 2, 0, 1);
        graph.set_link(0, 0, 2, 0);
        graph.set_link(1, 0, 2, 1);

        let store = ResourceStore::new();
        let pass = EvaluationPass::new(graph.modules(), 3, &store).with_stop(Some(Stop::Before(1)));
        let ctx = GenerationContext { pass: &pass, module: 2 };
        assert!(ctx.input(1).unwrap().is_none());
        assert_eq!(ctx.input(0).unwrap().map(|c| c.len()), Some(1));
    }

    #[test]
    fn test_result_uses_pass_levels() {
        let mut graph = ModuleGraph::new();
        add(&mut graph, "a", 0, 1, 1);
        add(&mut graph, "b", 1, 0, 2);
        graph.set_link(0, 0, 1, 0);

        let store = ResourceStore::new();
        let out = EvaluationPass::new(graph.modules(), 3, &store)
            .with_levels(1, 0)
            .run(0)
            .unwrap();
        assert_eq!(out.view_indices(), &[0]);
        assert_eq!(out.render_indices().len(), 3);
    }
}
