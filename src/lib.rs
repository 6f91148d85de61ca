//! Compiles texture expression graphs into flat stack-machine programs.
//!
//! A [`TextureTable`] holds texture nodes that reference their children by
//! index. [`compile_textures`] turns it into a [`Program`]: one linear
//! instruction list with a `(start, len, stack_depth)` span for every node
//! under every [`EvalKind`], plus the worst-case stack depth over all spans.
//! [`vm::Interpreter`] runs those spans without recursion and
//! [`eval::Evaluator`] is the recursive reference they must agree with.

pub mod color;
pub mod compiler;
pub mod config;
pub mod dsl;
pub mod error;
pub mod eval;
pub mod graph;
pub mod hitpoint;
pub mod texture;
pub mod vm;

pub use compiler::{compile_textures, CompiledSpan, EvalKind, EvalOp, Instruction, Program};
pub use config::CompilerConfig;
pub use error::{CompileError, ExecError};
pub use hitpoint::HitPoint;
pub use texture::{TexId, TextureKind, TextureTable};
