//! Registration of built-in system subroutines and per-type methods.
//!
//! The compilation constructor calls [`register_all`]; hosts can install
//! more through `add_system_subroutine` / `add_system_method`.

use crate::compilation::{Compilation, SystemSubroutine};
use crate::types::TypeTag;

pub(crate) fn register_all(comp: &mut Compilation) {
    register_math_funcs(comp);
    register_query_funcs(comp);
    register_conversion_funcs(comp);
    register_misc_system_funcs(comp);
    register_nonconst_funcs(comp);
    register_system_tasks(comp);
    register_enum_methods(comp);
    register_string_methods(comp);
}

fn register_math_funcs(comp: &mut Compilation) {
    for name in ["$clog2", "$ln", "$log10", "$exp", "$sqrt", "$pow"] {
        comp.add_system_subroutine(SystemSubroutine::function(name));
    }
}

fn register_query_funcs(comp: &mut Compilation) {
    for name in ["$bits", "$left", "$right", "$low", "$high", "$size", "$increment"] {
        comp.add_system_subroutine(SystemSubroutine::function(name));
    }
}

fn register_conversion_funcs(comp: &mut Compilation) {
    for name in ["$signed", "$unsigned", "$itor", "$rtoi", "$realtobits", "$bitstoreal"] {
        comp.add_system_subroutine(SystemSubroutine::function(name));
    }
}

fn register_misc_system_funcs(comp: &mut Compilation) {
    for name in ["$isunknown", "$onehot", "$onehot0", "$countones", "$sformatf"] {
        comp.add_system_subroutine(SystemSubroutine::function(name));
    }
}

fn register_nonconst_funcs(comp: &mut Compilation) {
    for name in ["$time", "$stime", "$realtime", "$random", "$urandom"] {
        comp.add_system_subroutine(SystemSubroutine::function(name));
    }
}

fn register_system_tasks(comp: &mut Compilation) {
    for name in [
        "$display", "$write", "$error", "$warning", "$info", "$fatal", "$finish", "$stop",
    ] {
        comp.add_system_subroutine(SystemSubroutine::task(name));
    }
}

fn register_enum_methods(comp: &mut Compilation) {
    for name in ["first", "last", "next", "prev", "num", "name"] {
        comp.add_system_method(TypeTag::Enum, SystemSubroutine::function(name));
    }
}

fn register_string_methods(comp: &mut Compilation) {
    for name in ["len", "toupper", "tolower", "putc", "getc"] {
        comp.add_system_method(TypeTag::String, SystemSubroutine::function(name));
    }
}
