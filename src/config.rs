use serde::{Deserialize, Serialize};

/// Knobs of one compile pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
    /// Finite-difference step of the generic bump, in surface units.
    pub bump_sample_distance: f32,
    /// Nesting limit of the recursive code generator.
    pub max_compile_depth: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            bump_sample_distance: 0.001,
            max_compile_depth: 256,
        }
    }
}
