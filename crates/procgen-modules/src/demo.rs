//! Ready-made procedures
//!
//! `demo_procedure` is the showcase graph written by `procgen demo`;
//! `initial_procedure` is what a host starts from when it hands over a set
//! of existing objects.

use procgen_engine::{
    Distribution, Module, Procedure, ProcedureBuilder, Resource, ResourceKind, ResourceStore,
};

use crate::{JitterGenerator, MergeGenerator, ObjectGenerator, ScatterGenerator, StackGenerator};

/// Seed of the demo procedure
pub const DEMO_SEED: i64 = 42;

/// A small yard exercising every generator type
///
/// `ground` is the main entry. Trees are scattered over it and shaken by a
/// jitter module, two crate stacks stand side by side on it, and a merge
/// module gathers the shaken trees together with a rock pile that no main
/// path reaches.
pub fn demo_procedure() -> Procedure {
    ProcedureBuilder::new()
        .seed(DEMO_SEED)
        .resource(Resource::geometry("ground", b"plane 40x40".to_vec()))
        .resource(Resource::geometry("tree", b"cone r1 h4".to_vec()))
        .resource(Resource::geometry("rock", b"sphere r0.5".to_vec()))
        .resource(Resource::geometry("crate", b"box 1x1x1".to_vec()))
        .module("ground", ObjectGenerator::new("ground").with_size(40.0))
        .main_entry()
        .module("trees", ScatterGenerator::new("tree", 12).with_radius(18.0))
        .module("wind", JitterGenerator::new(0.3, 0.1))
        .module("crates-a", StackGenerator::new("crate", 3).with_twist(0.2))
        .module("crates-b", StackGenerator::new("crate", 2).with_twist(0.2))
        .module(
            "rocks",
            ScatterGenerator::new("rock", 6)
                .with_radius(4.0)
                .with_distribution(Distribution::Gaussian),
        )
        .module("yard", MergeGenerator::new(2))
        .link("ground", 0, "trees", 0)
        .link("trees", 0, "wind", 0)
        .link("ground", 0, "crates-a", 0)
        .link("ground", 0, "crates-b", 0)
        .link("wind", 0, "yard", 0)
        .link("rocks", 0, "yard", 1)
        .build()
}

/// One `object` module per geometry resource
///
/// The first geometry becomes the main entry and every other object hangs
/// from its output, so the whole set shows up in the first evaluation.
pub fn initial_procedure(resources: ResourceStore) -> Procedure {
    let names: Vec<String> = resources
        .names_of_kind(ResourceKind::Geometry)
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut procedure = Procedure::with_resources(resources);
    for name in &names {
        procedure.add_module(Module::new(name.clone(), Box::new(ObjectGenerator::new(name.clone()))));
    }
    if !names.is_empty() {
        procedure.set_main_entry(0);
        for target in 1..names.len() {
            procedure.set_link(0, 0, target, 0);
        }
    }

    log::info!("Initial procedure with {} objects", names.len());
    procedure
}
