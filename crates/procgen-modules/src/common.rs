//! Helpers shared by the generator implementations

use procgen_engine::{GenerationContext, Placement, ResourceHandle, Result};

/// Placements of the entries arriving on input 0
///
/// An unlinked (or empty) input yields a single placement at the origin, so
/// a generator used as a root still produces its entries once.
pub(crate) fn parent_placements(ctx: &GenerationContext<'_>) -> Result<Vec<Placement>> {
    let parents = match ctx.input(0)? {
        Some(input) if !input.is_empty() => input.iter().map(|e| e.placement).collect(),
        _ => vec![Placement::default()],
    };
    Ok(parents)
}

/// Resolve a geometry name against the procedure's resources
pub(crate) fn lookup_geometry(ctx: &GenerationContext<'_>, name: &str) -> Option<ResourceHandle> {
    if name.is_empty() {
        return None;
    }
    let handle = ctx.resources().get(name);
    if handle.is_none() {
        log::warn!("'{}': no resource named '{}'", ctx.module_name(), name);
    }
    handle
}
