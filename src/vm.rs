//! Stack-machine interpreter for compiled texture programs.
//!
//! A CPU rendition of the Execution Engine contract: no recursion, one
//! fixed-size value stack per evaluation, instructions run front to back.
//! It exists to check compiled programs against [`crate::eval`] and to pin
//! the stack accounting, and it doubles as the layout reference for
//! uploading a program to a device (`Gpu*` records).

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::color::luminance;
use crate::compiler::bump::{finite_difference_normal, offset_u, offset_v};
use crate::compiler::rules::{eval_rule, EvalRule};
use crate::compiler::{EvalKind, EvalOp, Instruction, Program};
use crate::error::ExecError;
use crate::eval::{combine, Operands, Value};
use crate::hitpoint::HitPoint;
use crate::texture::kernels;
use crate::texture::{TexId, TextureTable};

/// Upper bound on the child values one combining instruction pops.
pub const MAX_OPERANDS: usize = 12;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuInstruction {
    pub node: u32,
    pub op: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuSpan {
    pub start: u32,
    pub len: u32,
    pub stack_depth: u32,
    pub _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuProgramHeader {
    pub instruction_count: u32,
    pub node_count: u32,
    pub max_stack_depth: u32,
    pub bump_sample_distance: f32,
}

impl From<Instruction> for GpuInstruction {
    fn from(ins: Instruction) -> Self {
        Self {
            node: ins.node.0,
            op: ins.op.code(),
        }
    }
}

impl GpuProgramHeader {
    pub fn for_program(program: &Program) -> Self {
        Self {
            instruction_count: program.instructions().len() as u32,
            node_count: program.node_count() as u32,
            max_stack_depth: program.max_stack_depth() as u32,
            bump_sample_distance: program.bump_sample_distance(),
        }
    }
}

pub fn gpu_instructions(program: &Program) -> Vec<GpuInstruction> {
    program.instructions().iter().map(|&ins| ins.into()).collect()
}

/// Address table, three entries per node in [`EvalKind::ALL`] order.
pub fn gpu_spans(program: &Program) -> Vec<GpuSpan> {
    program
        .spans()
        .map(|span| GpuSpan {
            start: span.start as u32,
            len: span.len as u32,
            stack_depth: span.stack_depth as u32,
            _pad: 0,
        })
        .collect()
}

pub fn as_bytes<T: Pod>(v: &T) -> &[u8] {
    bytemuck::bytes_of(v)
}

pub fn as_bytes_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Fixed-capacity value stack of one evaluation context.
#[derive(Clone, Debug)]
pub struct ValueStack {
    values: Vec<f32>,
    capacity: usize,
    high_water: usize,
}

impl ValueStack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            capacity,
            high_water: 0,
        }
    }

    /// Stack sized to the program's worst case.
    pub fn for_program(program: &Program) -> Self {
        Self::with_capacity(program.max_stack_depth())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most slots occupied at once since the last [`clear`](Self::clear).
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.high_water = 0;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    fn push(&mut self, at: usize, values: &[f32]) -> Result<(), ExecError> {
        let len = self.values.len() + values.len();
        if len > self.capacity {
            return Err(ExecError::StackOverflow {
                at,
                capacity: self.capacity,
            });
        }
        self.values.extend_from_slice(values);
        self.high_water = self.high_water.max(len);
        Ok(())
    }

    fn push_value(&mut self, at: usize, value: Value) -> Result<(), ExecError> {
        match value {
            Value::Float(v) => self.push(at, &[v]),
            Value::Vector(v) => self.push(at, &v.to_array()),
        }
    }

    fn top_start(&self, at: usize, n: usize) -> Result<usize, ExecError> {
        self.values
            .len()
            .checked_sub(n)
            .ok_or(ExecError::StackUnderflow { at })
    }

    fn pop<const N: usize>(&mut self, at: usize) -> Result<[f32; N], ExecError> {
        let start = self.top_start(at, N)?;
        let mut out = [0.0; N];
        out.copy_from_slice(&self.values[start..]);
        self.values.truncate(start);
        Ok(out)
    }

    fn pop_into<'b>(
        &mut self,
        at: usize,
        n: usize,
        buf: &'b mut [f32; MAX_OPERANDS],
    ) -> Result<&'b [f32], ExecError> {
        let start = self.top_start(at, n)?;
        buf[..n].copy_from_slice(&self.values[start..]);
        self.values.truncate(start);
        Ok(&buf[..n])
    }

    /// `N` values lying below the top `skip` values, left in place.
    fn peek<const N: usize>(&self, at: usize, skip: usize) -> Result<[f32; N], ExecError> {
        let start = self.top_start(at, skip + N)?;
        let mut out = [0.0; N];
        out.copy_from_slice(&self.values[start..start + N]);
        Ok(out)
    }
}

/// Runs spans of one program against one table. Holds no mutable state,
/// so a single interpreter can serve any number of threads, each with its
/// own [`HitPoint`] and [`ValueStack`].
#[derive(Clone, Copy, Debug)]
pub struct Interpreter<'a> {
    program: &'a Program,
    table: &'a TextureTable,
}

impl<'a> Interpreter<'a> {
    /// `table` must be the table `program` was compiled from.
    pub fn new(program: &'a Program, table: &'a TextureTable) -> Self {
        Self { program, table }
    }

    pub fn evaluate_float(&self, node: TexId, hp: &mut HitPoint, stack: &mut ValueStack) -> Result<f32, ExecError> {
        let [v]: [f32; 1] = self.run(node, EvalKind::Float, hp, stack)?;
        Ok(v)
    }

    pub fn evaluate_spectrum(&self, node: TexId, hp: &mut HitPoint, stack: &mut ValueStack) -> Result<Vec3, ExecError> {
        self.run(node, EvalKind::Spectrum, hp, stack).map(Vec3::from_array)
    }

    pub fn evaluate_bump(&self, node: TexId, hp: &mut HitPoint, stack: &mut ValueStack) -> Result<Vec3, ExecError> {
        self.run(node, EvalKind::Bump, hp, stack).map(Vec3::from_array)
    }

    fn run<const N: usize>(
        &self,
        node: TexId,
        kind: EvalKind,
        hp: &mut HitPoint,
        stack: &mut ValueStack,
    ) -> Result<[f32; N], ExecError> {
        stack.clear();
        self.execute_span(node, kind, hp, stack)?;
        let end = self.program.span(node, kind).map_or(0, |span| span.range().end);
        stack.pop(end)
    }

    /// Run the span of `(node, kind)`, leaving its result on top of `stack`.
    ///
    /// `hp` is mutated while the span runs and is bit-identical to its entry
    /// state once this returns `Ok`.
    pub fn execute_span(
        &self,
        node: TexId,
        kind: EvalKind,
        hp: &mut HitPoint,
        stack: &mut ValueStack,
    ) -> Result<(), ExecError> {
        let count = self.program.node_count();
        if node.index() >= count || count != self.table.len() {
            return Err(ExecError::NodeOutOfRange { node, count });
        }
        let Some(span) = self.program.span(node, kind) else {
            return Err(ExecError::NodeOutOfRange { node, count });
        };
        let total = self.program.instructions().len();
        if span.start + span.len > total {
            return Err(ExecError::SpanOutOfRange {
                start: span.start,
                len: span.len,
                total,
            });
        }

        let base = stack.len();
        for at in span.range() {
            self.step(at, self.program.instructions()[at], hp, stack)?;
        }

        let found = stack.len().saturating_sub(base);
        if stack.len() < base || found != kind.width() {
            return Err(ExecError::ResultWidth {
                node,
                eval: kind,
                expected: kind.width(),
                found,
            });
        }
        Ok(())
    }

    fn step(&self, at: usize, ins: Instruction, hp: &mut HitPoint, stack: &mut ValueStack) -> Result<(), ExecError> {
        let node = self.table.node(ins.node);
        let invalid = ExecError::InvalidOp {
            at,
            node: ins.node,
            op: ins.op,
        };
        let sample_distance = self.program.bump_sample_distance();

        match ins.op {
            EvalOp::Float => self.evaluate_step(at, ins.node, EvalKind::Float, hp, stack),
            EvalOp::Spectrum => self.evaluate_step(at, ins.node, EvalKind::Spectrum, hp, stack),
            EvalOp::Bump => self.evaluate_step(at, ins.node, EvalKind::Bump, hp, stack),

            EvalOp::BumpOffsetU => {
                stack.push(at, &hp.save_context())?;
                offset_u(hp, sample_distance);
                Ok(())
            }
            EvalOp::BumpOffsetV => {
                // saved context sits under the U sample
                let saved: [f32; 8] = stack.peek(at, 1)?;
                hp.restore_context(&saved);
                offset_v(hp, sample_distance);
                Ok(())
            }

            EvalOp::TriplanarStep1 => {
                let EvalRule::Triplanar(mapping) = eval_rule(&node.kind, EvalKind::Spectrum) else {
                    return Err(invalid);
                };
                let weights = kernels::triplanar_weights(hp.shade_n);
                let local = mapping.map(hp);
                stack.push(at, &hp.uv.to_array())?;
                stack.push(at, &weights.to_array())?;
                stack.push(at, &local.to_array())?;
                hp.uv = kernels::triplanar_uv(local, 0);
                Ok(())
            }
            EvalOp::TriplanarStep2 | EvalOp::TriplanarStep3 => {
                if !matches!(eval_rule(&node.kind, EvalKind::Spectrum), EvalRule::Triplanar(_)) {
                    return Err(invalid);
                }
                // local point sits under the colors looked up so far
                let (skip, axis) = match ins.op {
                    EvalOp::TriplanarStep2 => (3, 1),
                    _ => (6, 2),
                };
                let local: [f32; 3] = stack.peek(at, skip)?;
                hp.uv = kernels::triplanar_uv(Vec3::from_array(local), axis);
                Ok(())
            }

            EvalOp::DistortSetup => {
                let EvalRule::Distort { strength } = eval_rule(&node.kind, EvalKind::Float) else {
                    return Err(invalid);
                };
                let offset: [f32; 3] = stack.peek(at, 0)?;
                stack.push(at, &hp.save_position_uv())?;
                kernels::distort(hp, Vec3::from_array(offset), strength);
                Ok(())
            }
        }
    }

    /// The node's own instruction under `eval`: pop operands, push result.
    fn evaluate_step(
        &self,
        at: usize,
        id: TexId,
        eval: EvalKind,
        hp: &mut HitPoint,
        stack: &mut ValueStack,
    ) -> Result<(), ExecError> {
        let node = self.table.node(id);
        let invalid = ExecError::InvalidOp {
            at,
            node: id,
            op: eval.into(),
        };
        let mut buf = [0.0; MAX_OPERANDS];

        let value = match eval_rule(&node.kind, eval) {
            EvalRule::Leaf => combine(self.table, node, eval, hp, &mut Operands::new(&[])),
            EvalRule::Combinator(children) => {
                let n = children.iter().map(|c| c.resolve(eval).width()).sum();
                let args = stack.pop_into(at, n, &mut buf)?;
                combine(self.table, node, eval, hp, &mut Operands::new(args))
            }
            EvalRule::GenericBump => {
                // third scalar sample, computed in place of its own instruction
                self.evaluate_step(at, id, EvalKind::Float, hp, stack)?;
                let [f_v]: [f32; 1] = stack.pop(at)?;
                let [f0, saved @ .., f_u]: [f32; 10] = stack.pop(at)?;
                hp.restore_context(&saved);
                let n = finite_difference_normal(hp, self.program.bump_sample_distance(), f0, f_u, f_v);
                Some(Value::Vector(n))
            }
            EvalRule::Triplanar(_) => {
                let colors: [f32; 9] = stack.pop(at)?;
                let [u, v, wx, wy, wz, ..]: [f32; 8] = stack.pop(at)?;
                hp.uv = Vec2::new(u, v);
                let c = kernels::triplanar_blend(
                    Vec3::new(wx, wy, wz),
                    Vec3::from_slice(&colors[0..3]),
                    Vec3::from_slice(&colors[3..6]),
                    Vec3::from_slice(&colors[6..9]),
                );
                Some(match eval {
                    EvalKind::Float => Value::Float(luminance(c)),
                    _ => Value::Vector(c),
                })
            }
            EvalRule::Distort { .. } => {
                let width = eval.width();
                let mut result = [0.0; 3];
                result[..width].copy_from_slice(stack.pop_into(at, width, &mut buf)?);
                let saved: [f32; 5] = stack.pop(at)?;
                let offset: [f32; 3] = stack.pop(at)?;
                hp.restore_position_uv(&saved);

                let mut args = [0.0; 6];
                args[..3].copy_from_slice(&offset);
                args[3..3 + width].copy_from_slice(&result[..width]);
                combine(self.table, node, eval, hp, &mut Operands::new(&args[..3 + width]))
            }
        };

        stack.push_value(at, value.ok_or(invalid)?)
    }
}
