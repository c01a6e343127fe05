//! Ordered module list and link bookkeeping
//!
//! Every link is stored twice: in the fan-out list of the source output and
//! in the single-source slot of the target input. All mutations here update
//! both sides together. Out-of-range module or port indices are logged and
//! ignored, since edits arrive one at a time from interactive editing and a
//! stale index must never take the session down.

use crate::module::{Generator, Module};
use crate::types::PortRef;

/// Ordered collection of modules
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
}

impl ModuleGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_modules(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, index: usize) -> Option<&Module> {
        self.modules.get(index)
    }

    pub(crate) fn module_mut(&mut self, index: usize) -> Option<&mut Module> {
        self.modules.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Module> {
        self.modules.iter()
    }

    /// Index of the first module flagged as main entry
    pub fn main_entry(&self) -> Option<usize> {
        self.modules.iter().position(Module::is_main_entry)
    }

    /// Number of modules flagged as main entry
    pub fn main_entry_count(&self) -> usize {
        self.modules.iter().filter(|m| m.is_main_entry()).count()
    }

    /// Flag `index` as the only main entry
    pub fn set_main_entry(&mut self, index: usize) -> bool {
        if index >= self.modules.len() {
            log::warn!("set_main_entry: module {} out of range ({} modules)", index, self.modules.len());
            return false;
        }
        for (i, module) in self.modules.iter_mut().enumerate() {
            module.set_main_entry(i == index);
        }
        true
    }

    /// Append a module and return its index
    ///
    /// The module arrives unlinked; a main-entry flag it carries makes it
    /// the only main entry.
    pub fn add_module(&mut self, mut module: Module) -> usize {
        module.clear_links();
        let index = self.modules.len();
        let main = module.is_main_entry();
        self.modules.push(module);
        if main {
            self.set_main_entry(index);
        }
        index
    }

    /// Remove a module, dropping its links and renumbering the rest
    pub fn remove_module(&mut self, index: usize) -> Option<Module> {
        if index >= self.modules.len() {
            log::warn!("remove_module: module {} out of range ({} modules)", index, self.modules.len());
            return None;
        }
        let removed = self.modules.remove(index);
        let table: Vec<i64> = (0..=self.modules.len())
            .map(|old| match old.cmp(&index) {
                std::cmp::Ordering::Less => old as i64,
                std::cmp::Ordering::Equal => -1,
                std::cmp::Ordering::Greater => old as i64 - 1,
            })
            .collect();
        for module in &mut self.modules {
            module.apply_index_translation(&table);
        }
        Some(removed)
    }

    fn check_output(&self, module: usize, port: usize, op: &str) -> bool {
        match self.modules.get(module) {
            None => {
                log::warn!("{}: module {} out of range ({} modules)", op, module, self.modules.len());
                false
            }
            Some(m) if port >= m.num_outputs() => {
                log::warn!("{}: output {} out of range on '{}' ({} outputs)", op, port, m.name(), m.num_outputs());
                false
            }
            Some(_) => true,
        }
    }

    fn check_input(&self, module: usize, port: usize, op: &str) -> bool {
        match self.modules.get(module) {
            None => {
                log::warn!("{}: module {} out of range ({} modules)", op, module, self.modules.len());
                false
            }
            Some(m) if port >= m.num_inputs() => {
                log::warn!("{}: input {} out of range on '{}' ({} inputs)", op, port, m.name(), m.num_inputs());
                false
            }
            Some(_) => true,
        }
    }

    /// Link `from:from_port` to `to:to_port`
    ///
    /// An existing source on the target input is unlinked first; the new
    /// target is appended to the source's fan-out.
    pub fn set_link(&mut self, from: usize, from_port: usize, to: usize, to_port: usize) -> bool {
        if !self.check_output(from, from_port, "set_link") || !self.check_input(to, to_port, "set_link") {
            return false;
        }
        if from == to {
            log::warn!("set_link: refusing self-link on module {}", from);
            return false;
        }

        self.delete_input_link(to, to_port);

        let target = PortRef::new(to, to_port);
        if let Some(fan_out) = self.modules[from].output_mut(from_port) {
            fan_out.push(target);
        }
        if let Some(slot) = self.modules[to].input_slot_mut(to_port) {
            *slot = Some(PortRef::new(from, from_port));
        }
        true
    }

    /// Remove the `ordinal`-th link of `from:from_port`
    pub fn delete_link(&mut self, from: usize, from_port: usize, ordinal: usize) -> Option<PortRef> {
        if !self.check_output(from, from_port, "delete_link") {
            return None;
        }
        let fan_out = self.modules[from].output_mut(from_port)?;
        if ordinal >= fan_out.len() {
            log::warn!(
                "delete_link: ordinal {} out of range on {}:{} ({} links)",
                ordinal,
                from,
                from_port,
                fan_out.len()
            );
            return None;
        }
        let target = fan_out.remove(ordinal);
        if let Some(slot) = self.modules.get_mut(target.module).and_then(|m| m.input_slot_mut(target.port)) {
            if *slot == Some(PortRef::new(from, from_port)) {
                *slot = None;
            }
        }
        Some(target)
    }

    /// Remove whatever link feeds `to:to_port`
    pub fn delete_input_link(&mut self, to: usize, to_port: usize) -> Option<PortRef> {
        if !self.check_input(to, to_port, "delete_input_link") {
            return None;
        }
        let source = self.modules[to].input_slot_mut(to_port)?.take()?;
        let target = PortRef::new(to, to_port);
        if let Some(fan_out) = self.modules.get_mut(source.module).and_then(|m| m.output_mut(source.port)) {
            fan_out.retain(|&t| t != target);
        }
        Some(source)
    }

    /// Structural copy of one module, appended unlinked
    pub fn duplicate_module(&mut self, index: usize) -> Option<usize> {
        let Some(module) = self.modules.get(index) else {
            log::warn!("duplicate_module: module {} out of range ({} modules)", index, self.modules.len());
            return None;
        };
        let mut copy = module.duplicate();
        copy.set_main_entry(false);
        Some(self.add_module(copy))
    }

    /// Copy a subset of modules for pasting
    ///
    /// Links between selected modules are kept and renumbered to positions
    /// within the returned list; links leaving the selection are dropped.
    /// Out-of-range and repeated indices are skipped.
    pub fn copy_subset(&self, indices: &[usize]) -> Vec<Module> {
        let mut table = vec![-1i64; self.modules.len()];
        let mut copies = Vec::new();
        for &index in indices {
            if index >= self.modules.len() {
                log::warn!("copy_subset: module {} out of range ({} modules)", index, self.modules.len());
                continue;
            }
            if table[index] >= 0 {
                continue;
            }
            table[index] = copies.len() as i64;
            let mut copy = self.modules[index].duplicate();
            copy.set_main_entry(false);
            copies.push(copy);
        }
        for copy in &mut copies {
            copy.apply_index_translation(&table);
        }
        copies
    }

    /// Append modules produced by [`copy_subset`](Self::copy_subset)
    ///
    /// Their internal links are offset to the new positions. Returns the
    /// index of the first appended module.
    pub fn append_modules(&mut self, modules: Vec<Module>) -> usize {
        let offset = self.modules.len();
        let table: Vec<i64> = (0..modules.len()).map(|i| (offset + i) as i64).collect();
        for mut module in modules {
            module.apply_index_translation(&table);
            module.set_main_entry(false);
            self.modules.push(module);
        }
        offset
    }

    /// Replace a module's generator (parameter edit)
    ///
    /// Links on ports the new generator does not have are removed from both
    /// sides before the tables are resized.
    pub fn replace_generator(&mut self, index: usize, generator: Box<dyn Generator>) -> bool {
        let Some(module) = self.modules.get(index) else {
            log::warn!("replace_generator: module {} out of range ({} modules)", index, self.modules.len());
            return false;
        };
        let old_inputs = module.num_inputs();
        let old_outputs = module.num_outputs();
        for port in generator.num_inputs()..old_inputs {
            self.delete_input_link(index, port);
        }
        for port in generator.num_outputs()..old_outputs {
            while self.delete_link(index, port, 0).is_some() {}
        }
        if let Some(module) = self.modules.get_mut(index) {
            module.replace_generator(generator);
        }
        true
    }

    /// Deep copy preserving links and the main-entry flag
    pub fn duplicate(&self) -> ModuleGraph {
        ModuleGraph {
            modules: self.modules.iter().map(Module::duplicate).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixedGenerator;
    use crate::validation::validate_links;

    fn module(name: &str, inputs: usize, outputs: usize) -> Module {
        Module::new(name, Box::new(FixedGenerator::new(inputs, outputs, 1)))
    }

    fn chain(n: usize) -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        for i in 0..n {
            graph.add_module(module(&format!("m{}", i), 1, 1));
        }
        for i in 1..n {
            assert!(graph.set_link(i - 1, 0, i, 0));
        }
        graph
    }

    #[test]
    fn test_set_link_records_both_sides() {
        let graph = chain(2);
        assert_eq!(graph.module(0).unwrap().links_out(0), &[PortRef::new(1, 0)]);
        assert_eq!(graph.module(1).unwrap().link_in(0), Some(PortRef::new(0, 0)));
        assert!(validate_links(&graph).is_empty());
    }

    #[test]
    fn test_set_link_overwrites_existing_source() {
        let mut graph = chain(3);
        // 2 is fed by 1; relink it from 0
        assert!(graph.set_link(0, 0, 2, 0));
        assert_eq!(graph.module(2).unwrap().link_in(0), Some(PortRef::new(0, 0)));
        assert!(graph.module(1).unwrap().links_out(0).is_empty());
        assert_eq!(graph.module(0).unwrap().links_out(0), &[PortRef::new(1, 0), PortRef::new(2, 0)]);
        assert!(validate_links(&graph).is_empty());
    }

    #[test]
    fn test_invalid_indices_are_noops() {
        let mut graph = chain(2);
        assert!(!graph.set_link(0, 3, 1, 0));
        assert!(!graph.set_link(0, 0, 9, 0));
        assert!(!graph.set_link(1, 0, 1, 0));
        assert!(graph.delete_link(0, 0, 4).is_none());
        assert!(graph.remove_module(10).is_none());
        assert!(!graph.set_main_entry(5));
        assert_eq!(graph.module(0).unwrap().links_out(0).len(), 1);
    }

    #[test]
    fn test_delete_link_clears_input() {
        let mut graph = chain(2);
        assert_eq!(graph.delete_link(0, 0, 0), Some(PortRef::new(1, 0)));
        assert_eq!(graph.module(1).unwrap().link_in(0), None);
        assert!(graph.module(0).unwrap().links_out(0).is_empty());
    }

    #[test]
    fn test_remove_module_renumbers_links() {
        let mut graph = ModuleGraph::new();
        graph.add_module(module("a", 1, 1));
        graph.add_module(module("b", 1, 1));
        graph.add_module(module("c", 1, 1));
        graph.add_module(module("d", 1, 1));
        graph.set_link(0, 0, 1, 0);
        graph.set_link(1, 0, 2, 0);
        graph.set_link(0, 0, 3, 0);

        let removed = graph.remove_module(1).unwrap();
        assert_eq!(removed.name(), "b");

        // a -> d survives as 0 -> 2; c lost its source
        assert_eq!(graph.module(0).unwrap().links_out(0), &[PortRef::new(2, 0)]);
        assert_eq!(graph.module(1).unwrap().link_in(0), None);
        assert_eq!(graph.module(2).unwrap().link_in(0), Some(PortRef::new(0, 0)));
        assert!(validate_links(&graph).is_empty());
    }

    #[test]
    fn test_link_cardinality_after_mixed_edits() {
        let mut graph = ModuleGraph::new();
        for i in 0..5 {
            graph.add_module(module(&format!("m{}", i), 2, 2));
        }
        let edits: [(usize, usize, usize, usize); 8] = [
            (0, 0, 1, 0),
            (0, 1, 1, 0),
            (2, 0, 1, 1),
            (3, 1, 4, 0),
            (4, 0, 2, 1),
            (1, 0, 3, 0),
            (0, 0, 3, 0),
            (2, 1, 4, 1),
        ];
        for (f, fp, t, tp) in edits {
            graph.set_link(f, fp, t, tp);
        }
        graph.delete_link(0, 1, 0);
        graph.remove_module(2);
        graph.set_link(0, 0, 2, 1);
        graph.remove_module(0);

        assert!(validate_links(&graph).is_empty());
        for module in graph.iter() {
            for port in 0..module.num_outputs() {
                for target in module.links_out(port) {
                    assert!(target.module < graph.len());
                }
            }
        }
    }

    #[test]
    fn test_add_module_with_main_flag_is_exclusive() {
        let mut graph = ModuleGraph::new();
        let mut a = module("a", 0, 1);
        a.set_main_entry(true);
        graph.add_module(a);
        let mut b = module("b", 0, 1);
        b.set_main_entry(true);
        graph.add_module(b);
        assert_eq!(graph.main_entry(), Some(1));
        assert_eq!(graph.main_entry_count(), 1);
    }

    #[test]
    fn test_copy_subset_and_append() {
        let mut graph = chain(4);
        let copies = graph.copy_subset(&[1, 2]);
        assert_eq!(copies.len(), 2);
        // 1 -> 2 kept as 0 -> 1, 0 -> 1 and 2 -> 3 dropped
        assert_eq!(copies[0].link_in(0), None);
        assert_eq!(copies[0].links_out(0), &[PortRef::new(1, 0)]);
        assert!(copies[1].links_out(0).is_empty());

        let first = graph.append_modules(copies);
        assert_eq!(first, 4);
        assert_eq!(graph.module(4).unwrap().links_out(0), &[PortRef::new(5, 0)]);
        assert_eq!(graph.module(5).unwrap().link_in(0), Some(PortRef::new(4, 0)));
        assert!(validate_links(&graph).is_empty());
    }

    #[test]
    fn test_replace_generator_unlinks_vanished_ports() {
        let mut graph = ModuleGraph::new();
        graph.add_module(module("src", 0, 2));
        graph.add_module(module("dst", 2, 1));
        graph.set_link(0, 1, 1, 1);
        graph.set_link(0, 0, 1, 0);

        assert!(graph.replace_generator(0, Box::new(FixedGenerator::new(0, 1, 1))));
        assert_eq!(graph.module(0).unwrap().num_outputs(), 1);
        assert_eq!(graph.module(1).unwrap().link_in(1), None);
        assert_eq!(graph.module(1).unwrap().link_in(0), Some(PortRef::new(0, 0)));
        assert!(validate_links(&graph).is_empty());
    }

    #[test]
    fn test_duplicate_module_is_unlinked() {
        let mut graph = chain(2);
        let copy = graph.duplicate_module(0).unwrap();
        assert_eq!(copy, 2);
        assert!(!graph.module(2).unwrap().has_links());
        assert!(graph.duplicate_module(9).is_none());
    }
}
