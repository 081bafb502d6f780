use smol_str::SmolStr;
use svala_diag::{Diagnostic, DiagnosticCode};
use svala_source::{SourceBuffer, Span};

/// A parsed name: simple, package-scoped, or hierarchical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameSyntax {
    Identifier(SmolStr),
    /// `pkg::member`
    Scoped { package: SmolStr, member: SmolStr },
    /// `a.b.c`
    Hierarchical(Vec<SmolStr>),
}

/// Result of [`parse_name`]: the name (if one could be recovered) plus any
/// diagnostics produced along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub name: Option<NameSyntax>,
    pub diagnostics: Vec<Diagnostic>,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Parse a name out of an assigned source buffer.
///
/// Accepts a simple identifier, a single `pkg::member` scope, or a dotted
/// hierarchical name. Anything else produces parse diagnostics against the
/// buffer; the caller decides how to surface them.
pub fn parse_name(buffer: &SourceBuffer) -> ParsedName {
    let text = &*buffer.text;
    let mut diagnostics = Vec::new();
    let mut segments: Vec<SmolStr> = Vec::new();
    let mut scoped = false;

    let mut pos = 0usize;
    let bytes = text.as_bytes();
    let len = bytes.len();

    let mut expect_segment = true;
    while pos < len {
        let c = text[pos..].chars().next().unwrap_or('\0');
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if expect_segment {
            if !is_ident_start(c) {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::PARSE_ERROR,
                    Span::at(buffer.file, pos as u32, c.len_utf8() as u32),
                    format!("expected identifier, found `{c}`"),
                ));
                return ParsedName {
                    name: None,
                    diagnostics,
                };
            }
            let start = pos;
            while pos < len {
                let c = text[pos..].chars().next().unwrap_or('\0');
                if !is_ident_continue(c) {
                    break;
                }
                pos += c.len_utf8();
            }
            segments.push(SmolStr::new(&text[start..pos]));
            expect_segment = false;
        } else if text[pos..].starts_with("::") {
            if scoped || segments.len() != 1 {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::PARSE_ERROR,
                    Span::at(buffer.file, pos as u32, 2),
                    "`::` may only follow a single package name",
                ));
                return ParsedName {
                    name: None,
                    diagnostics,
                };
            }
            scoped = true;
            pos += 2;
            expect_segment = true;
        } else if c == '.' {
            if scoped {
                diagnostics.push(Diagnostic::error(
                    DiagnosticCode::PARSE_ERROR,
                    Span::at(buffer.file, pos as u32, 1),
                    "cannot mix `::` and `.` in a name",
                ));
                return ParsedName {
                    name: None,
                    diagnostics,
                };
            }
            pos += 1;
            expect_segment = true;
        } else {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::PARSE_ERROR,
                Span::at(buffer.file, pos as u32, c.len_utf8() as u32),
                format!("unexpected character `{c}` in name"),
            ));
            return ParsedName {
                name: None,
                diagnostics,
            };
        }
    }

    if expect_segment {
        diagnostics.push(Diagnostic::error(
            DiagnosticCode::PARSE_ERROR,
            Span::at(buffer.file, len as u32, 0),
            "expected identifier",
        ));
        return ParsedName {
            name: None,
            diagnostics,
        };
    }

    let name = if scoped {
        let member = segments.pop().expect("scoped name has two segments");
        let package = segments.pop().expect("scoped name has two segments");
        NameSyntax::Scoped { package, member }
    } else if segments.len() == 1 {
        NameSyntax::Identifier(segments.pop().expect("one segment"))
    } else {
        NameSyntax::Hierarchical(segments)
    };

    ParsedName {
        name: Some(name),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svala_source::SourceManager;

    fn parse(text: &str) -> ParsedName {
        let sm = SourceManager::new();
        parse_name(&sm.assign_text(text))
    }

    #[test]
    fn simple_identifier() {
        let result = parse("top_mod");
        assert!(result.diagnostics.is_empty());
        assert_eq!(
            result.name,
            Some(NameSyntax::Identifier(SmolStr::new("top_mod")))
        );
    }

    #[test]
    fn scoped_name() {
        let result = parse("pkg::item");
        assert!(result.diagnostics.is_empty());
        assert_eq!(
            result.name,
            Some(NameSyntax::Scoped {
                package: SmolStr::new("pkg"),
                member: SmolStr::new("item"),
            })
        );
    }

    #[test]
    fn hierarchical_name() {
        let result = parse("top.u1.leaf");
        assert!(result.diagnostics.is_empty());
        match result.name {
            Some(NameSyntax::Hierarchical(segments)) => {
                assert_eq!(segments.len(), 3);
                assert_eq!(segments[0], "top");
                assert_eq!(segments[2], "leaf");
            }
            other => panic!("expected hierarchical name, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        let result = parse("   ");
        assert!(result.name.is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].is_error());
    }

    #[test]
    fn leading_digit_is_an_error() {
        let result = parse("1abc");
        assert!(result.name.is_none());
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn mixed_separators_rejected() {
        let result = parse("pkg::a.b");
        assert!(result.name.is_none());
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.message.contains("cannot mix")));
    }

    #[test]
    fn trailing_separator_rejected() {
        let result = parse("a.");
        assert!(result.name.is_none());
    }
}
