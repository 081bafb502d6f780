use svala_diag::{Diagnostic as ParseDiag, DiagnosticCode};

use crate::{Compilation, CompilationOptions, SymbolKind};

use super::{compile_one, TreeBuilder};

fn instance_error_setup(comp: &mut Compilation) -> Vec<crate::Diagnostic> {
    comp.root();
    comp.semantic_diagnostics().to_vec()
}

#[test]
fn error_in_every_instance_is_emitted_uncoalesced() {
    // M's internal error fires in all three instances, so specific
    // instantiation info adds nothing.
    let mut comp = compile_one(|b| {
        let y = b.variable("y", None);
        let missing = b.ident("missing");
        let assign = b.cont_assign("y", missing);
        let module_m = b.module("M", vec![], vec![y, assign]);
        let inst = b.hier_inst("M", &["i1", "i2", "i3"]);
        let module_t = b.module("T", vec![], vec![inst]);
        b.add_global_instantiation("M");
        vec![module_m, module_t]
    });

    let diags = instance_error_setup(&mut comp);
    assert_eq!(diags.len(), 1, "three occurrences coalesce: {diags:?}");
    assert_eq!(diags[0].code, DiagnosticCode::UNDECLARED_IDENTIFIER);
    assert_eq!(diags[0].coalesce_count, None);
}

#[test]
fn error_in_subset_of_instances_carries_a_count() {
    // i4 overrides P=0, so its erroneous generate branch never
    // instantiates; three of four instances carry the error.
    let mut comp = compile_one(|b| {
        let one = b.lit(1);
        let p = b.param("P", Some(one));
        let y = b.variable("y", None);
        let missing = b.ident("missing");
        let assign = b.cont_assign("y", missing);
        let block = b.gen_block(Some("g"), vec![assign]);
        let p_ref = b.ident("P");
        let gen = b.if_generate(p_ref, block, None);
        let module_m = b.module("M", vec![p], vec![y, gen]);

        let inst3 = b.hier_inst("M", &["i1", "i2", "i3"]);
        let zero = b.lit(0);
        let p_override = b.param_override("P", zero);
        let inst1 = b.hier_inst_with_params("M", &["i4"], vec![p_override]);
        let module_t = b.module("T", vec![], vec![inst3, inst1]);
        b.add_global_instantiation("M");
        vec![module_m, module_t]
    });

    let diags = instance_error_setup(&mut comp);
    assert_eq!(diags.len(), 1, "occurrences coalesce: {diags:?}");
    assert_eq!(diags[0].coalesce_count, Some(3));
    let origin = diags[0].origin.expect("coalesced diag names an instance");
    assert!(
        matches!(comp.symbol(origin).kind, SymbolKind::ModuleInstance { .. }),
        "coalesced diagnostic points at an instance"
    );
}

#[test]
fn definition_site_diagnostic_trumps_instances() {
    // The bad default binds once in the definition and once per
    // instance; the definition occurrence wins, unannotated.
    let mut comp = compile_one(|b| {
        let missing = b.ident("missing");
        let p = b.param("P", Some(missing));
        let module_m = b.module("M", vec![p], vec![]);
        let inst = b.hier_inst("M", &["i1", "i2"]);
        let module_t = b.module("T", vec![], vec![inst]);
        b.add_global_instantiation("M");
        vec![module_m, module_t]
    });

    let diags = instance_error_setup(&mut comp);
    assert_eq!(diags.len(), 1, "occurrences coalesce: {diags:?}");
    assert_eq!(diags[0].coalesce_count, None);
    let origin = diags[0].origin.expect("diag carries its origin");
    let effective = comp.instance_or_def(Some(origin)).expect("has ancestry");
    assert!(
        matches!(comp.symbol(effective).kind, SymbolKind::Definition { .. }),
        "definition-site occurrence is preferred"
    );
}

#[test]
fn semantic_diagnostics_are_cached() {
    let mut comp = compile_one(|b| {
        let missing = b.ident("missing");
        let y = b.variable("y", None);
        let assign = b.cont_assign("y", missing);
        let module_m = b.module("M", vec![], vec![y, assign]);
        vec![module_m]
    });

    let first = comp.semantic_diagnostics().to_vec();
    let second = comp.semantic_diagnostics().to_vec();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[test]
fn parse_diagnostics_grow_as_a_prefix() {
    let sm = svala_source::SourceManager::new();
    let mut comp = Compilation::default();

    let mut b1 = TreeBuilder::new(&sm);
    let m = b1.module("M", vec![], vec![]);
    let span1 = b1.span();
    b1.add_parse_diag(ParseDiag::error(
        DiagnosticCode::PARSE_ERROR,
        span1,
        "expected `;`",
    ));
    comp.add_syntax_tree(b1.finish(vec![m], &sm)).expect("tree 1");
    let first = comp.parse_diagnostics().to_vec();
    assert_eq!(first.len(), 1);

    let mut b2 = TreeBuilder::new(&sm);
    let n = b2.module("N", vec![], vec![]);
    let span2 = b2.span();
    b2.add_parse_diag(ParseDiag::error(
        DiagnosticCode::PARSE_ERROR,
        span2,
        "expected identifier",
    ));
    comp.add_syntax_tree(b2.finish(vec![n], &sm)).expect("tree 2");
    let second = comp.parse_diagnostics().to_vec();
    assert_eq!(second.len(), 2);
    assert_eq!(&second[..first.len()], first.as_slice());
}

#[test]
fn all_diagnostics_concatenate_parse_and_semantic() {
    let sm = svala_source::SourceManager::new();
    let mut comp = Compilation::default();

    let mut b = TreeBuilder::new(&sm);
    let missing = b.ident("missing");
    let y = b.variable("y", None);
    let assign = b.cont_assign("y", missing);
    let module_m = b.module("M", vec![], vec![y, assign]);
    let span = b.span();
    b.add_parse_diag(ParseDiag::error(
        DiagnosticCode::PARSE_ERROR,
        span,
        "stray token",
    ));
    comp.add_syntax_tree(b.finish(vec![module_m], &sm))
        .expect("tree accepted");

    let all = comp.all_diagnostics().to_vec();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|d| d.code == DiagnosticCode::PARSE_ERROR));
    assert!(all
        .iter()
        .any(|d| d.code == DiagnosticCode::UNDECLARED_IDENTIFIER));
    // Sorted by location within the shared file.
    assert!(all[0].span.range.start() <= all[1].span.range.start());
}

#[test]
fn coalescing_keys_on_code_and_location() {
    // Two distinct undeclared names in one module produce two groups.
    let mut comp = compile_one(|b| {
        let y = b.variable("y", None);
        let first = b.ident("first_missing");
        let a1 = b.cont_assign("y", first);
        let second = b.ident("second_missing");
        let a2 = b.cont_assign("y", second);
        let module_m = b.module("M", vec![], vec![y, a1, a2]);
        vec![module_m]
    });

    let diags = instance_error_setup(&mut comp);
    assert_eq!(diags.len(), 2);
    assert_ne!(diags[0].span, diags[1].span);
}

#[test]
fn error_limit_stops_exploration() {
    let sm = svala_source::SourceManager::new();
    let mut b = TreeBuilder::new(&sm);
    let mut members = Vec::new();
    for name in ["A", "B", "C", "D"] {
        let y = b.variable("y", None);
        let missing = b.ident(&format!("missing_in_{name}")[..]);
        let assign = b.cont_assign("y", missing);
        members.push(b.module(name, vec![], vec![y, assign]));
    }
    let tree = b.finish(members, &sm);

    let mut comp = Compilation::new(CompilationOptions { error_limit: 1 });
    comp.add_syntax_tree(tree).expect("tree accepted");
    let diags = comp.semantic_diagnostics();
    assert!(
        diags.len() < 4,
        "exploration stops once the limit is crossed: {diags:?}"
    );
    assert!(!diags.is_empty());
}

#[test]
fn unlimited_error_limit_reports_everything() {
    let sm = svala_source::SourceManager::new();
    let mut b = TreeBuilder::new(&sm);
    let mut members = Vec::new();
    for name in ["A", "B", "C", "D"] {
        let y = b.variable("y", None);
        let missing = b.ident(&format!("missing_in_{name}")[..]);
        let assign = b.cont_assign("y", missing);
        members.push(b.module(name, vec![], vec![y, assign]));
    }
    let tree = b.finish(members, &sm);

    let mut comp = Compilation::new(CompilationOptions { error_limit: 0 });
    comp.add_syntax_tree(tree).expect("tree accepted");
    assert_eq!(comp.semantic_diagnostics().len(), 4);
}
