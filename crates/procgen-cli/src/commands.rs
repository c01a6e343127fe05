//! Command implementations
//!
//! Each command returns the text meant for stdout; `main` does the printing.

use std::fmt::Write as _;
use std::path::Path;

use procgen_engine::{EngineConfig, ModuleRegistry, Procedure};
use serde_json::json;

use crate::cli::{CliError, EvalOptions};

/// Write the showcase procedure to `out`
pub fn demo(out: &Path) -> Result<String, CliError> {
    let procedure = procgen_modules::demo_procedure();
    procedure.save(out)?;
    Ok(format!(
        "wrote demo procedure ({} modules) to {}",
        procedure.graph().len(),
        out.display()
    ))
}

/// Evaluate a saved procedure and render its flat export as JSON
pub fn eval(file: &Path, options: &EvalOptions) -> Result<String, CliError> {
    let registry = ModuleRegistry::with_builtins();
    let mut procedure = Procedure::load(file, &registry)?;

    if let Some(path) = &options.config {
        let config = EngineConfig::load(path)?;
        procedure.apply_config(&config);
    }
    if let Some(seed) = options.seed {
        procedure.set_seed(seed);
    }
    if let Some(level) = options.view_level {
        procedure.set_view_level(level);
    }
    if let Some(level) = options.rendering_level {
        procedure.set_rendering_level(level);
    }

    let seed = procedure.seed();
    let object = procedure.object()?;
    log::info!("Evaluated {} entries from {}", object.len(), file.display());

    let report = json!({
        "seed": seed,
        "viewLevel": object.view_level(),
        "renderingLevel": object.rendering_level(),
        "viewIndices": object.view_indices(),
        "renderIndices": object.render_indices(),
        "entries": object.to_flat_export(),
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Summarise a saved procedure
pub fn info(file: &Path) -> Result<String, CliError> {
    let registry = ModuleRegistry::with_builtins();
    let mut procedure = Procedure::load(file, &registry)?;

    let mut text = String::new();
    // fmt::Write into a String cannot fail
    let _ = writeln!(text, "seed: {}", procedure.seed());
    let _ = writeln!(
        text,
        "levels: view {} / render {}",
        procedure.view_level(),
        procedure.rendering_level()
    );
    let _ = writeln!(text, "geometry: {}", procedure.geometry_names().join(", "));
    let _ = writeln!(text, "modules: {}", procedure.graph().len());
    let main = procedure.graph().main_entry();
    for (i, module) in procedure.graph().iter().enumerate() {
        let marker = if Some(i) == main { " (main)" } else { "" };
        let _ = writeln!(text, "  [{}] {} <{}>{}", i, module.name(), module.type_name(), marker);
    }

    let object = procedure.object()?;
    let _ = writeln!(text, "entries: {}", object.len());
    for (level, count) in object.entry_count_by_level() {
        let _ = writeln!(text, "  level {}: {}", level, count);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_then_info_and_eval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.proc");

        demo(&path).unwrap();
        let summary = info(&path).unwrap();
        assert!(summary.contains("[0] ground <object> (main)"));
        assert!(summary.contains("entries: 52"));

        let options = EvalOptions {
            seed: Some(7),
            view_level: Some(2),
            ..EvalOptions::default()
        };
        let report: serde_json::Value = serde_json::from_str(&eval(&path, &options).unwrap()).unwrap();
        assert_eq!(report["seed"], 7);
        assert_eq!(report["viewLevel"], 2);
        assert_eq!(report["entries"].as_array().map(Vec::len), Some(52));
        // ground alone is below level 2, plus the trees group and both crate stacks at level 1
        assert_eq!(report["viewIndices"].as_array().map(Vec::len), Some(1 + 1 + 3 + 2));
    }

    #[test]
    fn test_config_overrides_levels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.proc");
        let config_path = dir.path().join("engine.json");
        demo(&path).unwrap();
        std::fs::write(&config_path, r#"{"renderingLevel": 1}"#).unwrap();

        let options = EvalOptions {
            config: Some(config_path),
            ..EvalOptions::default()
        };
        let report: serde_json::Value = serde_json::from_str(&eval(&path, &options).unwrap()).unwrap();
        assert_eq!(report["renderIndices"], json!([0]));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(info(&dir.path().join("nope.proc")), Err(CliError::Engine(_))));
    }
}
