use core::fmt;

/// Identity code for a diagnostic, composed of a namespace and a number.
///
/// Namespace strings use dotted hierarchy (e.g. `"svala.semantic"`).
/// Numbers are unique within a namespace. Coalescing keys on this code
/// together with the source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiagnosticCode {
    pub namespace: &'static str,
    pub number: u32,
}

impl DiagnosticCode {
    pub const PARSE_ERROR: Self = Self {
        namespace: "svala.parse",
        number: 1,
    };
    pub const UNDECLARED_IDENTIFIER: Self = Self {
        namespace: "svala.semantic",
        number: 1,
    };
    pub const AMBIGUOUS_WILDCARD_IMPORT: Self = Self {
        namespace: "svala.semantic",
        number: 2,
    };
    pub const PACKAGE_NOT_FOUND: Self = Self {
        namespace: "svala.semantic",
        number: 3,
    };
    pub const MEMBER_NOT_FOUND: Self = Self {
        namespace: "svala.semantic",
        number: 4,
    };
    pub const UNKNOWN_SYSTEM_NAME: Self = Self {
        namespace: "svala.semantic",
        number: 5,
    };
    pub const UNDECLARED_TYPE: Self = Self {
        namespace: "svala.type",
        number: 1,
    };
    pub const NOT_A_TYPE: Self = Self {
        namespace: "svala.type",
        number: 2,
    };
    pub const UNKNOWN_MODULE: Self = Self {
        namespace: "svala.elab",
        number: 1,
    };
    pub const GEN_COND_NOT_CONST: Self = Self {
        namespace: "svala.elab",
        number: 2,
    };
    pub const GENVAR_NOT_CONST: Self = Self {
        namespace: "svala.elab",
        number: 3,
    };

    /// Format as `"namespace[number]"`, e.g. `"svala.semantic[1]"`.
    pub fn as_str(&self) -> String {
        format!("{}[{}]", self.namespace, self.number)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.namespace, self.number)
    }
}
