//! Texture Expression Compiler.
//!
//! Turns a [`TextureTable`] into a flat [`Program`]: for every node and every
//! [`EvalKind`] a self-contained span of instructions that a stack machine
//! runs front to back, plus the stack depth that span needs.
//!
//! Shared children are not deduplicated. A child referenced from two parents
//! is re-emitted inside each parent's span, so every span is independent of
//! every other one and program size grows with the number of reference
//! paths rather than the number of nodes.

pub mod bump;
pub mod program;
pub mod rules;

use log::{debug, trace};

use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::texture::{check_capacity, TexId, TextureTable};

pub use program::{CompiledSpan, EvalKind, EvalOp, Instruction, Program};
use rules::{eval_rule, EvalRule};

/// Slots the triplanar step-1 instruction saves: UV, weights, local point.
pub const TRIPLANAR_SAVED_SLOTS: usize = 2 + 3 + 3;
/// Slots the distortion setup instruction saves: position and UV.
pub const DISTORT_SAVED_SLOTS: usize = 3 + 2;

/// Compile every node of `table` under every evaluation kind.
///
/// Fails without producing anything on the first invalid node.
pub fn compile_textures(table: &TextureTable, config: &CompilerConfig) -> Result<Program, CompileError> {
    let mut compiler = Compiler::new(table, config);
    let mut spans = Vec::with_capacity(table.len());
    let mut max_stack_depth = 0;

    for (id, node) in table.iter() {
        check_capacity(id, &node.kind)?;

        let mut node_spans = [CompiledSpan::default(); 3];
        for kind in EvalKind::ALL {
            let start = compiler.instructions.len();
            let stack_depth = compiler.compile_node(id, kind, 0)?;
            let span = CompiledSpan {
                start,
                len: compiler.instructions.len() - start,
                stack_depth,
            };
            trace!(
                "{:?} {:?} ({}): {} instructions at {}, depth {}",
                id,
                kind,
                node.name,
                span.len,
                span.start,
                span.stack_depth
            );
            max_stack_depth = max_stack_depth.max(stack_depth);
            node_spans[kind.index()] = span;
        }
        spans.push(node_spans);
    }

    debug!(
        "compiled {} textures into {} instructions, max stack depth {}",
        table.len(),
        compiler.instructions.len(),
        max_stack_depth
    );

    Ok(Program {
        instructions: compiler.instructions,
        spans,
        max_stack_depth,
        bump_sample_distance: config.bump_sample_distance,
    })
}

/// State of one compile pass.
pub(crate) struct Compiler<'a> {
    table: &'a TextureTable,
    max_depth: usize,
    instructions: Vec<Instruction>,
}

impl<'a> Compiler<'a> {
    fn new(table: &'a TextureTable, config: &CompilerConfig) -> Self {
        Self {
            table,
            max_depth: config.max_compile_depth,
            instructions: Vec::new(),
        }
    }

    fn emit(&mut self, node: TexId, op: EvalOp) {
        self.instructions.push(Instruction { node, op });
    }

    /// Append the program of `id` under `eval`; returns its peak stack depth.
    fn compile_node(&mut self, id: TexId, eval: EvalKind, level: usize) -> Result<usize, CompileError> {
        if level > self.max_depth {
            return Err(CompileError::DepthLimit {
                node: id,
                eval,
                limit: self.max_depth,
            });
        }
        let table = self.table;
        let node = table.node(id);

        match eval_rule(&node.kind, eval) {
            EvalRule::Leaf => {
                self.emit(id, eval.into());
                Ok(eval.width())
            }
            EvalRule::Combinator(children) => {
                let mut depth = 0;
                for child in children {
                    depth += self.compile_node(node.child(child.slot), child.resolve(eval), level + 1)?;
                }
                self.emit(id, eval.into());
                // a wide result over narrow children still needs room for itself
                Ok(depth.max(eval.width()))
            }
            EvalRule::GenericBump => self.compile_generic_bump(id, level),
            EvalRule::Triplanar(_) => {
                let mut depth = TRIPLANAR_SAVED_SLOTS;
                let steps = [EvalOp::TriplanarStep1, EvalOp::TriplanarStep2, EvalOp::TriplanarStep3];
                for (slot, step) in steps.into_iter().enumerate() {
                    self.emit(id, step);
                    depth += self.compile_node(node.child(slot), EvalKind::Spectrum, level + 1)?;
                }
                self.emit(id, eval.into());
                Ok(depth.max(eval.width()))
            }
            EvalRule::Distort { .. } => {
                let mut depth = self.compile_node(node.child(1), EvalKind::Spectrum, level + 1)?;
                self.emit(id, EvalOp::DistortSetup);
                depth += DISTORT_SAVED_SLOTS;
                depth += self.compile_node(node.child(0), eval, level + 1)?;
                self.emit(id, eval.into());
                Ok(depth)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureKind;
    use glam::Vec3;

    fn table_with_divide() -> (TextureTable, TexId) {
        let mut table = TextureTable::new();
        let a = table.push("a", TextureKind::ConstFloat { value: 1.0 }, vec![]).unwrap();
        let b = table.push("b", TextureKind::ConstFloat { value: 2.0 }, vec![]).unwrap();
        let d = table.push("d", TextureKind::Divide, vec![a, b]).unwrap();
        (table, d)
    }

    #[test]
    fn combinator_emits_children_then_self() {
        let (table, d) = table_with_divide();
        let program = compile_textures(&table, &CompilerConfig::default()).unwrap();
        let ops: Vec<_> = program
            .span_instructions(d, EvalKind::Float).unwrap()
            .iter()
            .map(|i| (i.node.0, i.op))
            .collect();
        assert_eq!(ops, vec![(0, EvalOp::Float), (1, EvalOp::Float), (2, EvalOp::Float)]);
        assert_eq!(program.span(d, EvalKind::Float).unwrap().stack_depth, 2);
    }

    #[test]
    fn spectrum_over_scalar_child_reserves_own_width() {
        let mut table = TextureTable::new();
        let a = table.push("a", TextureKind::ConstFloat { value: 0.5 }, vec![]).unwrap();
        let band = table
            .push(
                "band",
                TextureKind::Band {
                    offsets: vec![0.0, 1.0],
                    values: vec![Vec3::ZERO, Vec3::ONE],
                },
                vec![a],
            )
            .unwrap();
        let program = compile_textures(&table, &CompilerConfig::default()).unwrap();
        assert_eq!(program.span(band, EvalKind::Spectrum).unwrap().stack_depth, 3);
        assert_eq!(program.span(band, EvalKind::Float).unwrap().stack_depth, 1);
    }

    #[test]
    fn depth_guard_trips() {
        let mut table = TextureTable::new();
        let mut last = table.push("c", TextureKind::ConstFloat { value: 1.0 }, vec![]).unwrap();
        for i in 0..8 {
            last = table.push(format!("abs{i}"), TextureKind::Abs, vec![last]).unwrap();
        }
        let config = CompilerConfig {
            max_compile_depth: 4,
            ..CompilerConfig::default()
        };
        let err = compile_textures(&table, &config).unwrap_err();
        assert!(matches!(err, CompileError::DepthLimit { limit: 4, .. }), "{err}");
    }

    #[test]
    fn empty_table_compiles_to_empty_program() {
        let program = compile_textures(&TextureTable::new(), &CompilerConfig::default()).unwrap();
        assert!(program.instructions().is_empty());
        assert_eq!(program.node_count(), 0);
        assert_eq!(program.max_stack_depth(), 0);
    }
}
