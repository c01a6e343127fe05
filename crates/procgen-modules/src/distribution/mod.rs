//! Distribution generators: spread copies around their parents

use procgen_engine::{ProcEngineError, Result};

pub mod scatter;
pub mod stack;

pub use scatter::ScatterGenerator;
pub use stack::StackGenerator;

/// Most copies a distribution generator places per parent entry
pub const MAX_COPIES: u32 = 10_000;

/// Check a copy count read from a saved procedure
pub(crate) fn checked_count(generator: &str, count: u32) -> Result<u32> {
    if count > MAX_COPIES {
        return Err(ProcEngineError::decode(format!(
            "{} asks for {} copies (at most {})",
            generator, count, MAX_COPIES
        )));
    }
    Ok(count)
}
