use std::fs;
use std::path::{Path, PathBuf};

use strata_ast::surface::SurfaceProgram;
use strata_ast::Program;

/// Directory holding the surface-form demo programs
pub fn demos_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos")
}

/// Every demo program, sorted by file name
pub fn discover_demos() -> Vec<PathBuf> {
    let mut demos: Vec<PathBuf> = fs::read_dir(demos_dir())
        .expect("Failed to read demos directory")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    demos.sort();
    demos
}

/// Load a demo's text by name, without the extension
pub fn load_demo(name: &str) -> String {
    let path = demos_dir().join(format!("{}.json", name));
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load demo {}: {}", name, e))
}

/// Lower a demo into a fresh program
pub fn lower_demo(name: &str) -> Program {
    SurfaceProgram::from_json(&load_demo(name))
        .expect("demo is not a surface program")
        .lower()
        .expect("demo does not lower")
}
