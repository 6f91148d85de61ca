mod common;

use common::{color, constant, every_kind_table, push};
use glam::Vec3;
use texture_expr_compiler::{
    compile_textures, CompileError, CompilerConfig, EvalKind, EvalOp, Instruction, Program, TexId, TextureKind,
    TextureTable,
};

fn compile(table: &TextureTable) -> Program {
    compile_textures(table, &CompilerConfig::default()).expect("compile")
}

fn ops(program: &Program, node: TexId, kind: EvalKind) -> Vec<(u32, EvalOp)> {
    program
        .span_instructions(node, kind).unwrap()
        .iter()
        .map(|i| (i.node.0, i.op))
        .collect()
}

#[test]
fn constant_leaf_is_one_instruction() {
    let mut table = TextureTable::new();
    let c = constant(&mut table, "c", 0.25);
    let program = compile(&table);

    let span = program.span(c, EvalKind::Float).unwrap();
    assert_eq!(span.len, 1);
    assert_eq!(span.stack_depth, 1);
    assert_eq!(
        program.span_instructions(c, EvalKind::Float).unwrap(),
        &[Instruction {
            node: c,
            op: EvalOp::Float
        }]
    );

    // same node, independent programs per kind
    assert_eq!(program.span(c, EvalKind::Spectrum).unwrap().stack_depth, 3);
    assert_eq!(ops(&program, c, EvalKind::Bump), vec![(0, EvalOp::Bump)]);
}

#[test]
fn binary_combinator_emits_children_then_self() {
    let mut table = TextureTable::new();
    let a = constant(&mut table, "a", 1.0);
    let b = constant(&mut table, "b", 4.0);
    let d = push(&mut table, "d", TextureKind::Divide, &[a, b]);
    let program = compile(&table);

    let span = program.span(d, EvalKind::Float).unwrap();
    assert_eq!(span.len, 3);
    assert_eq!(span.stack_depth, 2);
    assert_eq!(
        ops(&program, d, EvalKind::Float),
        vec![(0, EvalOp::Float), (1, EvalOp::Float), (2, EvalOp::Float)]
    );
}

#[test]
fn generic_bump_triples_the_scalar_program() {
    let mut table = TextureTable::new();
    let a = constant(&mut table, "a", 1.0);
    let b = constant(&mut table, "b", 4.0);
    let d = push(&mut table, "d", TextureKind::Divide, &[a, b]);
    let program = compile(&table);

    let float = program.span(d, EvalKind::Float).unwrap();
    let bump = program.span(d, EvalKind::Bump).unwrap();
    assert_eq!(bump.len, 3 * float.len + 2);
    assert_eq!(bump.stack_depth, 3 * float.stack_depth + 8);

    use EvalOp::*;
    assert_eq!(
        ops(&program, d, EvalKind::Bump),
        vec![
            (0, Float),
            (1, Float),
            (2, Float),
            (2, BumpOffsetU),
            (0, Float),
            (1, Float),
            (2, Float),
            (2, BumpOffsetV),
            (0, Float),
            (1, Float),
            (2, Bump),
        ]
    );
}

#[test]
fn generic_bump_of_a_leaf() {
    let mut table = TextureTable::new();
    let alpha = push(&mut table, "alpha", TextureKind::HitPointAlpha, &[]);
    let program = compile(&table);

    use EvalOp::*;
    assert_eq!(
        ops(&program, alpha, EvalKind::Bump),
        vec![(0, Float), (0, BumpOffsetU), (0, Float), (0, BumpOffsetV), (0, Bump)]
    );
    assert_eq!(program.span(alpha, EvalKind::Bump).unwrap().stack_depth, 11);
}

#[test]
fn triplanar_interleaves_steps_and_children() {
    let mut table = TextureTable::new();
    let r = color(&mut table, "r", Vec3::X);
    let g = color(&mut table, "g", Vec3::Y);
    let b = color(&mut table, "b", Vec3::Z);
    let tri = push(
        &mut table,
        "tri",
        TextureKind::Triplanar {
            mapping: Default::default(),
        },
        &[r, g, b],
    );
    let program = compile(&table);

    use EvalOp::*;
    assert_eq!(
        ops(&program, tri, EvalKind::Spectrum),
        vec![
            (3, TriplanarStep1),
            (0, Spectrum),
            (3, TriplanarStep2),
            (1, Spectrum),
            (3, TriplanarStep3),
            (2, Spectrum),
            (3, Spectrum),
        ]
    );
    assert_eq!(program.span(tri, EvalKind::Spectrum).unwrap().stack_depth, 8 + 3 * 3);

    // children stay SPECTRUM under a FLOAT parent
    let float_ops = ops(&program, tri, EvalKind::Float);
    assert_eq!(float_ops[1], (0, Spectrum));
    assert_eq!(float_ops.last(), Some(&(3, Float)));

    // no closed-form bump: finite differences over the FLOAT program
    let float_len = program.span(tri, EvalKind::Float).unwrap().len;
    assert_eq!(program.span(tri, EvalKind::Bump).unwrap().len, 3 * float_len + 2);
}

#[test]
fn distortion_wraps_the_displaced_child() {
    let mut table = TextureTable::new();
    let offset = color(&mut table, "offset", Vec3::new(0.1, 0.2, 0.0));
    let uv = push(
        &mut table,
        "uv",
        TextureKind::Uv {
            mapping: Default::default(),
        },
        &[],
    );
    let d = push(&mut table, "d", TextureKind::Distort { strength: 1.0 }, &[uv, offset]);
    let program = compile(&table);

    use EvalOp::*;
    assert_eq!(
        ops(&program, d, EvalKind::Float),
        vec![(0, Spectrum), (2, DistortSetup), (1, Float), (2, Float)]
    );
    assert_eq!(program.span(d, EvalKind::Float).unwrap().stack_depth, 3 + 5 + 1);

    // the displaced child keeps the requested kind, including BUMP
    let bump = ops(&program, d, EvalKind::Bump);
    assert_eq!(bump[..2], [(0, Spectrum), (2, DistortSetup)]);
    assert!(bump[2..bump.len() - 1].iter().any(|&(n, op)| n == 1 && op == BumpOffsetU));
    assert_eq!(bump.last(), Some(&(2, Bump)));
}

#[test]
fn weighting_children_compile_as_float() {
    let mut table = TextureTable::new();
    let amount = constant(&mut table, "amount", 0.3);
    let x = color(&mut table, "x", Vec3::X);
    let y = color(&mut table, "y", Vec3::Y);
    let mix = push(&mut table, "mix", TextureKind::Mix, &[amount, x, y]);
    let program = compile(&table);

    use EvalOp::*;
    assert_eq!(
        ops(&program, mix, EvalKind::Spectrum),
        vec![(0, Float), (1, Spectrum), (2, Spectrum), (3, Spectrum)]
    );
    assert_eq!(program.span(mix, EvalKind::Spectrum).unwrap().stack_depth, 7);

    // analytic bump: three BUMP children, then three FLOAT children
    assert_eq!(
        ops(&program, mix, EvalKind::Bump),
        vec![
            (1, Bump),
            (2, Bump),
            (0, Bump),
            (1, Float),
            (2, Float),
            (0, Float),
            (3, Bump),
        ]
    );
}

#[test]
fn shared_children_are_re_emitted_per_use() {
    let mut table = TextureTable::new();
    let a = constant(&mut table, "a", 2.0);
    let abs = push(&mut table, "abs", TextureKind::Abs, &[a]);
    let sq = push(&mut table, "sq", TextureKind::Scale, &[abs, abs]);
    let program = compile(&table);

    let child = program.span(abs, EvalKind::Float).unwrap();
    let parent = program.span(sq, EvalKind::Float).unwrap();
    assert_eq!(parent.len, 2 * child.len + 1);
    assert_eq!(parent.stack_depth, 2 * child.stack_depth);
}

#[test]
fn removing_an_unreferenced_node_only_drops_its_spans() {
    let mut table = every_kind_table();
    let before = compile(&table);

    let victim = table.find("div").expect("div");
    let dropped: usize = EvalKind::ALL.iter().map(|&k| before.span(victim, k).unwrap().len).sum();
    table.remove(victim).expect("div is unreferenced");
    let after = compile(&table);

    assert_eq!(after.instructions().len(), before.instructions().len() - dropped);
    assert_eq!(after.node_count(), before.node_count() - 1);

    let remap = |id: TexId| if id.0 > victim.0 { TexId(id.0 - 1) } else { id };
    for old in (0..before.node_count() as u32).map(TexId).filter(|&id| id != victim) {
        for kind in EvalKind::ALL {
            let expected: Vec<Instruction> = before
                .span_instructions(old, kind).unwrap()
                .iter()
                .map(|i| Instruction {
                    node: remap(i.node),
                    op: i.op,
                })
                .collect();
            assert_eq!(after.span_instructions(remap(old), kind).unwrap(), expected.as_slice());
            assert_eq!(
                after.span(remap(old), kind).unwrap().stack_depth,
                before.span(old, kind).unwrap().stack_depth
            );
        }
    }
}

#[test]
fn compiling_twice_is_deterministic() {
    let table = every_kind_table();
    assert_eq!(compile(&table), compile(&table));
}

#[test]
fn program_covers_every_span() {
    let table = every_kind_table();
    let program = compile(&table);

    let mut end = 0;
    let mut deepest = 0;
    for id in table.ids() {
        for kind in EvalKind::ALL {
            let span = program.span(id, kind).unwrap();
            // spans are laid out back to back, node by node
            assert_eq!(span.start, end);
            end += span.len;
            assert!(span.stack_depth >= kind.width());
            deepest = deepest.max(span.stack_depth);
        }
    }
    assert_eq!(end, program.instructions().len());
    assert_eq!(program.max_stack_depth(), deepest);
}

#[test]
fn replace_is_validated_like_push() {
    let mut table = TextureTable::new();
    let a = constant(&mut table, "a", 0.5);
    let band = push(
        &mut table,
        "band",
        TextureKind::Band {
            offsets: vec![0.0],
            values: vec![Vec3::ONE],
        },
        &[a],
    );
    let err = table
        .replace(
            band,
            TextureKind::Band {
                offsets: vec![0.0; 17],
                values: vec![Vec3::ONE; 17],
            },
            vec![a],
        )
        .unwrap_err();
    assert!(matches!(err, CompileError::CapacityExceeded { limit: 16, found: 17, .. }));

    table
        .replace(band, TextureKind::ConstFloat { value: 1.0 }, vec![])
        .expect("leaf replacement");
    assert_eq!(compile(&table).span(band, EvalKind::Float).unwrap().len, 1);
}
