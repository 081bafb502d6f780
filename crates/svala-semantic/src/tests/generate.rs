use svala_diag::DiagnosticCode;
use svala_source::Span;

use crate::{ConstInt, Diagnostic, SymbolId, SymbolKind};

use super::{compile_one, scope_of, top_instance};

fn generate_blocks(comp: &mut crate::Compilation, inst: SymbolId) -> Vec<SymbolId> {
    let scope = scope_of(comp, inst);
    // Force realization of the deferred generate members.
    let _ = comp.lookup_direct(scope, "__realize__");
    comp.scope_members(inst)
        .into_iter()
        .filter(|&m| {
            matches!(
                comp.symbol(m).kind,
                SymbolKind::GenerateBlock { .. } | SymbolKind::GenerateBlockArray
            )
        })
        .collect()
}

#[test]
fn false_condition_without_else_keeps_an_uninstantiated_block() {
    let mut comp = compile_one(|b| {
        let y = b.variable("y", None);
        let missing = b.ident("missing");
        let assign = b.cont_assign("y", missing);
        let block = b.gen_block(Some("g"), vec![assign]);
        let zero = b.lit(0);
        let gen = b.if_generate(zero, block, None);
        let module_m = b.module("M", vec![], vec![y, gen]);
        vec![module_m]
    });

    comp.root();
    let m = top_instance(&mut comp, "M");
    let blocks = generate_blocks(&mut comp, m);
    assert_eq!(blocks.len(), 1);
    assert!(matches!(
        comp.symbol(blocks[0]).kind,
        SymbolKind::GenerateBlock {
            is_instantiated: false
        }
    ));
}

#[test]
fn uninstantiated_generate_contents_never_diagnose() {
    let mut comp = compile_one(|b| {
        let y = b.variable("y", None);
        let missing = b.ident("missing");
        let assign = b.cont_assign("y", missing);
        let block = b.gen_block(Some("g"), vec![assign]);
        let zero = b.lit(0);
        let gen = b.if_generate(zero, block, None);
        let module_m = b.module("M", vec![], vec![y, gen]);
        vec![module_m]
    });

    assert!(comp.parse_diagnostics().is_empty());
    let all = comp.all_diagnostics().to_vec();
    assert!(
        all.is_empty(),
        "erroneous statement under a false guard stays silent: {all:?}"
    );
}

#[test]
fn forcing_inside_uninstantiated_block_is_suppressed() {
    let mut comp = compile_one(|b| {
        let y = b.variable("y", None);
        let missing = b.ident("missing");
        let assign = b.cont_assign("y", missing);
        let block = b.gen_block(Some("g"), vec![assign]);
        let zero = b.lit(0);
        let gen = b.if_generate(zero, block, None);
        let module_m = b.module("M", vec![], vec![y, gen]);
        vec![module_m]
    });

    comp.root();
    let m = top_instance(&mut comp, "M");
    let blocks = generate_blocks(&mut comp, m);
    let members = comp.scope_members(blocks[0]);
    let assign = members
        .into_iter()
        .find(|&s| matches!(comp.symbol(s).kind, SymbolKind::ContinuousAssign { .. }))
        .expect("block contains the assign");

    // Forcing the binding emits through add_diag, where the suppression
    // filter drops it.
    comp.continuous_assign_expr(assign);
    assert_eq!(comp.num_errors(), 0);
    assert!(comp.semantic_diagnostics().is_empty());
}

#[test]
fn direct_diag_against_suppressed_symbol_is_dropped() {
    let mut comp = compile_one(|b| {
        let block = b.gen_block(Some("g"), vec![]);
        let zero = b.lit(0);
        let gen = b.if_generate(zero, block, None);
        let module_m = b.module("M", vec![], vec![gen]);
        vec![module_m]
    });

    comp.root();
    let m = top_instance(&mut comp, "M");
    let blocks = generate_blocks(&mut comp, m);

    let span = Span::at(svala_source::FileId(0), 999, 1);
    let diag = Diagnostic::error(
        DiagnosticCode::UNDECLARED_IDENTIFIER,
        span,
        blocks[0],
        "synthetic",
    );
    let stored = comp.add_diag(diag.clone());
    assert_eq!(stored.message, "synthetic", "caller still sees a reference");
    assert_eq!(comp.num_errors(), 0, "suppressed diagnostics are not counted");
}

#[test]
fn true_condition_elaborates_and_diagnoses() {
    let mut comp = compile_one(|b| {
        let y = b.variable("y", None);
        let missing = b.ident("missing");
        let assign = b.cont_assign("y", missing);
        let block = b.gen_block(Some("g"), vec![assign]);
        let one = b.lit(1);
        let gen = b.if_generate(one, block, None);
        let module_m = b.module("M", vec![], vec![y, gen]);
        vec![module_m]
    });

    let diags = comp.all_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, DiagnosticCode::UNDECLARED_IDENTIFIER);
}

#[test]
fn false_condition_with_else_takes_the_else_branch() {
    let mut comp = compile_one(|b| {
        let y = b.variable("y", None);
        let y_ref = b.lit(1);
        let good_assign = b.cont_assign("y", y_ref);
        let else_block = b.gen_block(Some("e"), vec![good_assign]);
        let missing = b.ident("missing");
        let bad_assign = b.cont_assign("y", missing);
        let then_block = b.gen_block(Some("t"), vec![bad_assign]);
        let zero = b.lit(0);
        let gen = b.if_generate(zero, then_block, Some(else_block));
        let module_m = b.module("M", vec![], vec![y, gen]);
        vec![module_m]
    });

    comp.root();
    let m = top_instance(&mut comp, "M");
    let blocks = generate_blocks(&mut comp, m);
    assert_eq!(blocks.len(), 1);
    assert_eq!(comp.symbol(blocks[0]).name, "e");
    assert!(matches!(
        comp.symbol(blocks[0]).kind,
        SymbolKind::GenerateBlock {
            is_instantiated: true
        }
    ));
    assert!(comp.semantic_diagnostics().is_empty());
}

#[test]
fn non_constant_condition_diagnoses_and_inserts_nothing() {
    let mut comp = compile_one(|b| {
        let y = b.variable("y", None);
        let block = b.gen_block(Some("g"), vec![]);
        let y_ref = b.ident("y");
        let gen = b.if_generate(y_ref, block, None);
        let module_m = b.module("M", vec![], vec![y, gen]);
        vec![module_m]
    });

    comp.root();
    let m = top_instance(&mut comp, "M");
    let blocks = generate_blocks(&mut comp, m);
    assert!(blocks.is_empty());
    assert!(comp
        .semantic_diagnostics()
        .iter()
        .any(|d| d.code == DiagnosticCode::GEN_COND_NOT_CONST));
}

#[test]
fn loop_generate_builds_an_indexed_array() {
    let mut comp = compile_one(|b| {
        let lo = b.lit(0);
        let hi = b.lit(2);
        let i_ref = b.ident("i");
        let p = b.param("p", Some(i_ref));
        let block = b.gen_block(Some("ring"), vec![p]);
        let gen = b.loop_generate("i", lo, hi, block);
        let module_m = b.module("M", vec![], vec![gen]);
        vec![module_m]
    });

    comp.root();
    let m = top_instance(&mut comp, "M");
    let blocks = generate_blocks(&mut comp, m);
    assert_eq!(blocks.len(), 1);
    let array = blocks[0];
    assert!(matches!(
        comp.symbol(array).kind,
        SymbolKind::GenerateBlockArray
    ));
    assert_eq!(comp.symbol(array).name, "ring");

    let entries = comp.scope_members(array);
    let names: Vec<_> = entries
        .iter()
        .map(|&e| comp.symbol(e).name.to_string())
        .collect();
    assert_eq!(names, ["0", "1", "2"]);

    // Each iteration sees its genvar as a constant.
    for (n, &entry) in entries.iter().enumerate() {
        let entry_scope = scope_of(&comp, entry);
        let genvar = comp.lookup_direct(entry_scope, "i").expect("genvar bound");
        assert_eq!(comp.parameter_value(genvar), ConstInt::Known(n as i64));
        let p = comp.lookup_direct(entry_scope, "p").expect("param exists");
        assert_eq!(comp.parameter_value(p), ConstInt::Known(n as i64));
    }
    assert!(comp.semantic_diagnostics().is_empty());
}

#[test]
fn non_constant_loop_bounds_diagnose_with_an_empty_array() {
    let mut comp = compile_one(|b| {
        let y = b.variable("y", None);
        let lo = b.lit(0);
        let hi = b.ident("y");
        let block = b.gen_block(None, vec![]);
        let gen = b.loop_generate("i", lo, hi, block);
        let module_m = b.module("M", vec![], vec![y, gen]);
        vec![module_m]
    });

    comp.root();
    let m = top_instance(&mut comp, "M");
    let blocks = generate_blocks(&mut comp, m);
    assert_eq!(blocks.len(), 1);
    assert!(comp.scope_members(blocks[0]).is_empty());
    assert!(comp
        .semantic_diagnostics()
        .iter()
        .any(|d| d.code == DiagnosticCode::GENVAR_NOT_CONST));
}
