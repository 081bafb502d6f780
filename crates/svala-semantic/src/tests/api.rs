use smol_str::SmolStr;
use svala_syntax::{BuiltinTypeKind, DeclMetadata, DriveKeyword, NameSyntax, NetTypeToken};

use crate::{
    AttrTarget, Compilation, ConstInt, IntegralFlags, ScalarKind, SymbolKind, TypeKind,
    UnconnectedDrive,
};

use super::{compile_one, only_unit, scope_of, TreeBuilder};

#[test]
fn vector_types_are_interned() {
    let mut comp = Compilation::default();
    let flags = ScalarKind::Logic.flags();
    let a = comp.vector_type(8, flags);
    let b = comp.vector_type(8, flags);
    let c = comp.vector_type(9, flags);
    assert_eq!(a, b, "same width and flags intern to one type");
    assert_ne!(a, c);

    match &comp.type_data(a).kind {
        TypeKind::PackedArray { width, .. } => assert_eq!(*width, 8),
        other => panic!("expected packed array, got {other:?}"),
    }
}

#[test]
fn vector_interning_keys_on_flags_too() {
    let mut comp = Compilation::default();
    let logic = comp.vector_type(8, ScalarKind::Logic.flags());
    let bit = comp.vector_type(8, ScalarKind::Bit.flags());
    assert_ne!(logic, bit);
}

#[test]
fn scalar_table_resolves_by_flag_bits() {
    let comp = Compilation::default();
    let logic = comp.scalar_type(ScalarKind::Logic.flags());
    assert_eq!(comp.type_data(logic).name, "logic");

    let signed_logic = comp.scalar_type(ScalarKind::Logic.flags() | IntegralFlags::SIGNED);
    match comp.type_data(signed_logic).kind {
        TypeKind::Scalar { signed, .. } => assert!(signed),
        _ => panic!("expected scalar"),
    }
}

#[test]
fn unsigned_int_type_is_a_32_bit_two_state_vector() {
    let mut comp = Compilation::default();
    let ty = comp.unsigned_int_type();
    match &comp.type_data(ty).kind {
        TypeKind::PackedArray { width, flags, .. } => {
            assert_eq!(*width, 32);
            assert!(!flags.contains(IntegralFlags::FOUR_STATE));
            assert!(!flags.contains(IntegralFlags::SIGNED));
        }
        other => panic!("expected packed array, got {other:?}"),
    }
}

#[test]
fn unknown_syntax_kind_maps_to_error_type() {
    let comp = Compilation::default();
    let ty = comp.type_for_syntax(BuiltinTypeKind::Unknown);
    assert_eq!(ty, comp.error_type());
    let int = comp.type_for_syntax(BuiltinTypeKind::Int);
    assert_eq!(comp.type_data(int).name, "int");
}

#[test]
fn net_types_resolve_by_token() {
    let comp = Compilation::default();
    let wire = comp.net_type(NetTypeToken::Wire);
    assert_eq!(comp.net_type_data(wire).name, "wire");
    assert_eq!(wire, comp.wire_net_type());
    let supply = comp.net_type(NetTypeToken::Supply0);
    assert_eq!(comp.net_type_data(supply).name, "supply0");
}

#[test]
fn declaration_metadata_round_trips() {
    let sm = svala_source::SourceManager::new();
    let mut b = TreeBuilder::new(&sm);
    let module_m = b.module("M", vec![], vec![]);
    b.set_metadata(
        module_m,
        DeclMetadata {
            default_net_type: NetTypeToken::UWire,
            unconnected_drive: Some(DriveKeyword::Pull1),
            time_scale: None,
        },
    );
    let tree = b.finish(vec![module_m], &sm);
    let decl = tree.node_ref(module_m);

    let mut comp = Compilation::default();
    comp.add_syntax_tree(tree).expect("tree accepted");

    let net = comp.default_net_type(decl);
    assert_eq!(comp.net_type_data(net).name, "uwire");
    assert_eq!(comp.unconnected_drive(decl), UnconnectedDrive::Pull1);
    assert_eq!(comp.directive_time_scale(decl), None);

    // The definition record captured the same metadata.
    let def = comp.definition_at_root("M").expect("definition recorded");
    assert_eq!(
        comp.net_type_data(comp.definition_data(def).default_net_type).name,
        "uwire"
    );
    assert_eq!(
        comp.definition_data(def).unconnected_drive,
        UnconnectedDrive::Pull1
    );
}

#[test]
fn metadata_defaults_when_no_directive_was_seen() {
    let mut comp = compile_one(|b| {
        let m = b.module("M", vec![], vec![]);
        vec![m]
    });
    let def = comp.definition_at_root("M").expect("definition recorded");
    let syntax = comp.definition_data(def).syntax;
    let net = comp.default_net_type(syntax);
    assert_eq!(comp.net_type_data(net).name, "<error>");
    assert_eq!(comp.unconnected_drive(syntax), UnconnectedDrive::None);
}

#[test]
fn parse_name_accepts_identifiers_and_scoped_names() {
    let mut comp = Compilation::default();
    assert_eq!(
        comp.parse_name("top_mod"),
        Ok(NameSyntax::Identifier(SmolStr::new("top_mod")))
    );
    assert_eq!(
        comp.parse_name("pkg::item"),
        Ok(NameSyntax::Scoped {
            package: SmolStr::new("pkg"),
            member: SmolStr::new("item"),
        })
    );
}

#[test]
fn parse_name_aggregates_errors() {
    let mut comp = Compilation::default();
    let err = comp.parse_name("1abc").expect_err("bad name");
    assert!(err.0.contains("svala.parse"), "aggregated: {}", err.0);
    let err = comp.parse_name("").expect_err("empty name");
    assert!(err.0.contains("expected identifier"));
}

#[test]
fn script_scope_lives_under_root() {
    let mut comp = Compilation::default();
    let unit = comp.create_script_scope();
    assert!(matches!(
        comp.symbol(unit).kind,
        SymbolKind::CompilationUnit
    ));
    assert_eq!(comp.symbol(unit).parent, Some(comp.root_symbol()));
}

#[test]
fn attributes_attach_by_identity() {
    let mut comp = compile_one(|b| {
        let one = b.lit(1);
        let x = b.param("x", Some(one));
        let y = b.param("y", None);
        let pkg = b.package("p", vec![x, y]);
        vec![pkg]
    });

    let pkg = comp.package("p").expect("package registered");
    let x = super::find_member(&mut comp, pkg, "x");
    let y = super::find_member(&mut comp, pkg, "y");
    let pkg_scope = scope_of(&comp, pkg);

    let span = comp.symbol(x).span;
    let attr = comp.create_attribute(SmolStr::new("keep"), span, None, pkg_scope);
    comp.set_symbol_attributes(x, vec![attr]);

    assert_eq!(comp.attributes_for(AttrTarget::Symbol(x)).len(), 1);
    assert!(
        comp.attributes_for(AttrTarget::Symbol(y)).is_empty(),
        "attributes attach to one symbol, not to equal-looking ones"
    );
    assert_eq!(comp.attribute_value(attr), ConstInt::Known(1));
}

#[test]
fn attribute_values_evaluate_in_their_scope() {
    let sm = svala_source::SourceManager::new();
    let mut b = TreeBuilder::new(&sm);
    let three = b.lit(3);
    let x = b.param("x", Some(three));
    let pkg = b.package("p", vec![x]);
    // Spare expression node used as the attribute value.
    let attr_expr = b.ident("x");
    let tree = b.finish(vec![pkg], &sm);
    let attr_ref = tree.node_ref(attr_expr);

    let mut comp = Compilation::default();
    comp.add_syntax_tree(tree).expect("tree accepted");

    let pkg_sym = comp.package("p").expect("package registered");
    let x_sym = super::find_member(&mut comp, pkg_sym, "x");
    let pkg_scope = scope_of(&comp, pkg_sym);
    let span = comp.symbol(x_sym).span;
    let attr = comp.create_attribute(SmolStr::new("weight"), span, Some(attr_ref), pkg_scope);
    comp.set_symbol_attributes(x_sym, vec![attr]);
    assert_eq!(comp.attribute_value(attr), ConstInt::Known(3));
}

#[test]
fn definitions_climb_lexical_scopes() {
    let mut comp = compile_one(|b| {
        let inner_inst = b.hier_inst("Inner", &["u"]);
        let inner = b.module("Inner", vec![], vec![]);
        let outer = b.module("Outer", vec![], vec![inner, inner_inst]);
        b.add_global_instantiation("Inner");
        vec![outer]
    });

    comp.root();
    let outer = super::top_instance(&mut comp, "Outer");
    let outer_scope = scope_of(&comp, outer);
    let _ = comp.lookup_direct(outer_scope, "__realize__");

    // Inner is registered under Outer's instance scope and found from it.
    assert!(comp.definition("Inner", outer_scope).is_some());
    assert!(
        comp.definition_at_root("Inner").is_none(),
        "nested definitions are not hoisted to root"
    );
    let diags = comp.semantic_diagnostics().to_vec();
    assert!(diags.is_empty(), "nested instantiation works: {diags:?}");
}

#[test]
fn unknown_instantiation_target_diagnoses() {
    let mut comp = compile_one(|b| {
        let inst = b.hier_inst("Ghost", &["u1"]);
        let m = b.module("M", vec![], vec![inst]);
        vec![m]
    });

    let diags = comp.semantic_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, svala_diag::DiagnosticCode::UNKNOWN_MODULE);
}

#[test]
fn unit_members_land_in_the_unit_scope() {
    let mut comp = compile_one(|b| {
        let v = b.variable("v", None);
        vec![v]
    });
    let unit = only_unit(&comp);
    let v = super::find_member(&mut comp, unit, "v");
    assert!(matches!(comp.symbol(v).kind, SymbolKind::Variable { .. }));
    assert_eq!(comp.symbol(v).parent, Some(unit));
}
