//! Static discovery of `//export`-marked functions in Go sources.
//!
//! TinyGo exports a function from the module when its declaration is
//! immediately preceded by a `//export <name>` comment. The scanner tokenizes
//! the source (keeping comments), collects markers and top-level function
//! declarations, then pairs them: a marker belongs to a declaration only when
//! the names agree and the declaration starts on the very next line.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CompilerError, CompilerResult};

const MARKER_PREFIX: &str = "//export ";

/// A `//export <name>` comment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMarker {
    pub name: String,
    /// Full comment text, including the leading `//`.
    pub text: String,
    /// 1-based line of the comment.
    pub line: usize,
}

/// Signature summary of a top-level function or method declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    /// 1-based line of the `func` keyword.
    pub line: usize,
    pub is_method: bool,
    pub param_count: usize,
    pub result_count: usize,
}

/// A declaration paired with the marker that exports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFunction {
    pub name: String,
    pub decl: FunctionDecl,
    pub marker: ExportMarker,
}

/// Find every exported function in `source`.
///
/// The order of the result is unspecified. Sources without markers yield an
/// empty vector.
pub fn parse_exports(source: &str) -> CompilerResult<Vec<ExportedFunction>> {
    let lexed = lex(source)?;
    let markers = lexed.comments.iter().filter_map(|c| marker(&c.text, c.line));
    let decls = function_decls(&lexed.tokens)?;

    let by_position: HashMap<(&str, usize), &FunctionDecl> = decls
        .iter()
        .map(|d| ((d.name.as_str(), d.line), d))
        .collect();

    Ok(markers
        .filter_map(|m| {
            let found = by_position.get(&(m.name.as_str(), m.line + 1)).copied();
            found.map(|decl| ExportedFunction {
                name: m.name.clone(),
                decl: decl.clone(),
                marker: m,
            })
        })
        .collect())
}

fn marker(text: &str, line: usize) -> Option<ExportMarker> {
    let name = text.strip_prefix(MARKER_PREFIX)?.trim_end();
    is_identifier(name).then(|| ExportMarker {
        name: name.to_string(),
        text: text.to_string(),
        line,
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => chars.all(|c| c == '_' || c.is_alphanumeric()),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Ident(String),
    Literal,
    Punct(char),
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    line: usize,
}

impl Token {
    fn is(&self, c: char) -> bool {
        self.kind == Kind::Punct(c)
    }

    fn ident(&self) -> Option<&str> {
        match &self.kind {
            Kind::Ident(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Comment {
    text: String,
    line: usize,
}

#[derive(Debug, Default)]
struct Lexed {
    tokens: Vec<Token>,
    comments: Vec<Comment>,
}

fn parse_error(line: usize, message: impl Into<String>) -> CompilerError {
    CompilerError::Parse {
        line,
        message: message.into(),
    }
}

fn lex(source: &str) -> CompilerResult<Lexed> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = Lexed::default();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                let start = i;
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                out.comments.push(Comment {
                    text: text.trim_end_matches('\r').to_string(),
                    line,
                });
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let start_line = line;
                i += 2;
                loop {
                    match chars.get(i) {
                        None => return Err(parse_error(start_line, "unterminated block comment")),
                        Some('*') if chars.get(i + 1) == Some(&'/') => {
                            i += 2;
                            break;
                        }
                        Some('\n') => line += 1,
                        Some(_) => {}
                    }
                    i += 1;
                }
            }
            '"' | '\'' => {
                let quote = c;
                i += 1;
                loop {
                    match chars.get(i) {
                        None | Some('\n') => {
                            return Err(parse_error(line, "unterminated literal"));
                        }
                        Some('\\') => {
                            if chars.get(i + 1) == Some(&'\n') {
                                line += 1;
                            }
                            i += 2;
                        }
                        Some(&q) if q == quote => {
                            i += 1;
                            break;
                        }
                        Some(_) => i += 1,
                    }
                }
                out.tokens.push(Token {
                    kind: Kind::Literal,
                    line,
                });
            }
            '`' => {
                let start_line = line;
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(parse_error(start_line, "unterminated raw string")),
                        Some('`') => {
                            i += 1;
                            break;
                        }
                        Some('\n') => line += 1,
                        Some(_) => {}
                    }
                    i += 1;
                }
                out.tokens.push(Token {
                    kind: Kind::Literal,
                    line: start_line,
                });
            }
            c if c == '_' || c.is_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i] == '_' || chars[i].is_alphanumeric()) {
                    i += 1;
                }
                out.tokens.push(Token {
                    kind: Kind::Ident(chars[start..i].iter().collect()),
                    line,
                });
            }
            c if c.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '.' || chars[i] == '_') {
                    i += 1;
                }
                out.tokens.push(Token {
                    kind: Kind::Literal,
                    line,
                });
            }
            c => {
                out.tokens.push(Token {
                    kind: Kind::Punct(c),
                    line,
                });
                i += 1;
            }
        }
    }

    Ok(out)
}

fn closing(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        _ => None,
    }
}

/// Index one past the delimiter closing the group opened at `open`.
fn skip_group(tokens: &[Token], open: usize) -> CompilerResult<usize> {
    let mut stack = Vec::new();
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        if let Kind::Punct(c) = tok.kind {
            if let Some(close) = closing(c) {
                stack.push(close);
            } else if matches!(c, ')' | ']' | '}') {
                if stack.pop() != Some(c) {
                    return Err(parse_error(tok.line, format!("unexpected '{c}'")));
                }
                if stack.is_empty() {
                    return Ok(i + 1);
                }
            }
        }
    }
    let line = tokens.get(open).map(|t| t.line).unwrap_or(0);
    Err(parse_error(line, "unclosed delimiter"))
}

/// Number of comma-separated entries in the group spanning `open..end`.
fn count_entries(tokens: &[Token], open: usize, end: usize) -> usize {
    let inner = &tokens[open + 1..end - 1];
    if inner.is_empty() {
        return 0;
    }
    let mut depth = 0usize;
    let mut commas = 0;
    for tok in inner {
        match tok.kind {
            Kind::Punct('(' | '[' | '{') => depth += 1,
            Kind::Punct(')' | ']' | '}') => depth = depth.saturating_sub(1),
            Kind::Punct(',') if depth == 0 => commas += 1,
            _ => {}
        }
    }
    let trailing = inner.last().map(|t| t.is(',')).unwrap_or(false);
    commas + 1 - usize::from(trailing)
}

/// True when the `func` at `i` starts a declaration rather than a function
/// literal or a function type.
fn starts_declaration(tokens: &[Token], i: usize) -> bool {
    let Some(prev) = i.checked_sub(1).map(|p| &tokens[p]) else {
        return true;
    };
    match prev.kind {
        Kind::Punct(';') => true,
        Kind::Punct(c) if "=,(:+-*/&|!<>[{".contains(c) => false,
        _ => prev.line < tokens[i].line,
    }
}

fn function_decls(tokens: &[Token]) -> CompilerResult<Vec<FunctionDecl>> {
    let mut decls = Vec::new();
    let mut stack: Vec<char> = Vec::new();

    for (i, tok) in tokens.iter().enumerate() {
        match tok.kind {
            Kind::Punct(c) if closing(c).is_some() => stack.push(c),
            Kind::Punct(c @ (')' | ']' | '}')) => {
                let open = stack.pop();
                if open.and_then(closing) != Some(c) {
                    return Err(parse_error(tok.line, format!("unexpected '{c}'")));
                }
            }
            Kind::Ident(ref word) if word == "func" && stack.is_empty() && starts_declaration(tokens, i) => {
                if let Some(decl) = function_header(tokens, i)? {
                    decls.push(decl);
                }
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        let line = tokens.last().map(|t| t.line).unwrap_or(0);
        return Err(parse_error(line, format!("unclosed '{open}'")));
    }
    Ok(decls)
}

fn function_header(tokens: &[Token], func: usize) -> CompilerResult<Option<FunctionDecl>> {
    let mut pos = func + 1;
    let mut is_method = false;

    if tokens.get(pos).map(|t| t.is('(')).unwrap_or(false) {
        pos = skip_group(tokens, pos)?;
        is_method = true;
    }

    let Some(name) = tokens.get(pos).and_then(Token::ident) else {
        return Ok(None);
    };
    pos += 1;

    // Type parameters.
    if tokens.get(pos).map(|t| t.is('[')).unwrap_or(false) {
        pos = skip_group(tokens, pos)?;
    }

    if !tokens.get(pos).map(|t| t.is('(')).unwrap_or(false) {
        return Ok(None);
    }
    let params_end = skip_group(tokens, pos)?;
    let param_count = count_entries(tokens, pos, params_end);

    let close_line = tokens[params_end - 1].line;
    let result_count = match tokens.get(params_end) {
        Some(next) if next.line != close_line || next.is('{') || next.is(';') => 0,
        Some(next) if next.is('(') => {
            let results_end = skip_group(tokens, params_end)?;
            count_entries(tokens, params_end, results_end)
        }
        Some(_) => 1,
        None => 0,
    };

    Ok(Some(FunctionDecl {
        name: name.to_string(),
        line: tokens[func].line,
        is_method,
        param_count,
        result_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn find<'a>(exports: &'a [ExportedFunction], name: &str) -> &'a ExportedFunction {
        exports
            .iter()
            .find(|e| e.name == name)
            .unwrap_or_else(|| panic!("{name} not exported"))
    }

    #[test]
    fn finds_all_exported_functions() {
        let src = "package main\n\
                   \n\
                   //export add\n\
                   func add(a, b int) int {\n\
                   \treturn a + b\n\
                   }\n\
                   \n\
                   //export sub\n\
                   func sub(a, b int) int {\n\
                   \treturn a - b\n\
                   }\n\
                   \n\
                   //export mul\n\
                   func mul(a, b int) int {\n\
                   \treturn a * b\n\
                   }\n\
                   \n\
                   func main() {}\n";
        let exports = parse_exports(src).unwrap();
        assert_eq!(exports.len(), 3);
        for export in &exports {
            assert_eq!(export.marker.text, format!("//export {}", export.name));
            assert_eq!(export.decl.name, export.name);
            assert_eq!(export.decl.line, export.marker.line + 1);
        }
    }

    #[test]
    fn extracts_parameter_and_result_counts() {
        let src = "package main\n\
                   //export add\n\
                   func add(a, b int) int { return a + b }\n\
                   //export stringify\n\
                   func stringify(a int, b float64) (string, error) { return \"\", nil }\n\
                   //export tick\n\
                   func tick() {}\n\
                   //export apply\n\
                   func apply(f func(x, y int) int, v ...int) (out []int) { return nil }\n";
        let exports = parse_exports(src).unwrap();
        assert_eq!(exports.len(), 4);

        let add = &find(&exports, "add").decl;
        assert_eq!((add.param_count, add.result_count), (2, 1));
        let stringify = &find(&exports, "stringify").decl;
        assert_eq!((stringify.param_count, stringify.result_count), (2, 2));
        let tick = &find(&exports, "tick").decl;
        assert_eq!((tick.param_count, tick.result_count), (0, 0));
        let apply = &find(&exports, "apply").decl;
        assert_eq!((apply.param_count, apply.result_count), (2, 1));
    }

    #[test]
    fn blank_line_breaks_association() {
        let src = "package main\n\n//export add\n\nfunc add(a, b int) int { return a + b }\n";
        assert!(parse_exports(src).unwrap().is_empty());
    }

    #[test]
    fn marker_name_must_match_declaration() {
        let src = "package main\n//export plus\nfunc add(a, b int) int { return a + b }\n";
        assert!(parse_exports(src).unwrap().is_empty());
    }

    #[test]
    fn no_markers_is_empty_not_error() {
        assert!(parse_exports("package main\n\nfunc main() {}\n").unwrap().is_empty());
    }

    #[test]
    fn markers_inside_literals_are_ignored() {
        let src = "package main\n\
                   var s = `\n\
                   //export fake\n\
                   `\n\
                   func fake() {}\n\
                   var t = \"//export other\"\n\
                   func other() {}\n";
        assert!(parse_exports(src).unwrap().is_empty());
    }

    #[test]
    fn function_literals_and_types_are_not_declarations() {
        let src = "package main\n\
                   //export handler\n\
                   var handler = func(a int) int { return a }\n\
                   type cb func(a, b int) int\n\
                   //export real\n\
                   func real() (func() int) { return nil }\n";
        let exports = parse_exports(src).unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].name, "real");
        assert_eq!(exports[0].decl.result_count, 1);
    }

    #[test]
    fn methods_and_generics_are_declarations() {
        let src = "package main\n\
                   type T struct{ n int }\n\
                   //export get\n\
                   func (t *T) get() int { return t.n }\n\
                   //export first\n\
                   func first[E any](xs []E) E { return xs[0] }\n";
        let exports = parse_exports(src).unwrap();
        assert_eq!(exports.len(), 2);
        assert!(find(&exports, "get").decl.is_method);
        assert_eq!(find(&exports, "first").decl.param_count, 1);
    }

    #[test]
    fn bodiless_declarations_have_no_results_on_next_line() {
        let src = "package main\n//export host\nfunc host(x int)\n\nfunc main() {}\n";
        let exports = parse_exports(src).unwrap();
        assert_eq!(exports[0].decl.result_count, 0);
    }

    #[test]
    fn malformed_source_is_a_parse_error() {
        assert!(matches!(
            parse_exports("package main\nfunc main() {\n"),
            Err(CompilerError::Parse { .. })
        ));
        assert!(matches!(
            parse_exports("package main\nvar s = \"open\n"),
            Err(CompilerError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            parse_exports("package main\n/* never closed"),
            Err(CompilerError::Parse { .. })
        ));
    }

    #[test]
    fn escaped_newline_in_literal_keeps_line_numbers() {
        let src = "package main\nvar s = \"a\\\nb\"\n//export add\nfunc add() {}\n";
        let exports = parse_exports(src).unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].marker.line, 4);
        assert_eq!(exports[0].decl.line, 5);
    }

    #[test]
    fn marker_requires_exact_form() {
        let src = "package main\n//export  add\nfunc add() {}\n//exportsub\nfunc sub() {}\n";
        assert!(parse_exports(src).unwrap().is_empty());
    }

    fn ident() -> impl Strategy<Value = String> {
        "[a-z][a-zA-Z0-9_]{0,8}".prop_filter("keyword", |s| {
            !matches!(s.as_str(), "func" | "var" | "type" | "go" | "if" | "for" | "map")
        })
    }

    proptest! {
        #[test]
        fn adjacent_markers_are_all_found(names in prop::collection::btree_set(ident(), 0..8)) {
            let mut src = String::from("package main\n\n");
            for name in &names {
                src.push_str(&format!("//export {name}\nfunc {name}(a, b int) int {{\n\treturn a\n}}\n\n"));
            }
            let exports = parse_exports(&src).unwrap();
            prop_assert_eq!(exports.len(), names.len());
            for e in &exports {
                prop_assert!(names.contains(&e.name));
                prop_assert_eq!(&e.marker.name, &e.name);
            }
        }

        #[test]
        fn separated_markers_are_never_found(names in prop::collection::btree_set(ident(), 1..8)) {
            let mut src = String::from("package main\n\n");
            for name in &names {
                src.push_str(&format!("//export {name}\n\nfunc {name}() {{}}\n"));
            }
            prop_assert!(parse_exports(&src).unwrap().is_empty());
        }
    }
}
