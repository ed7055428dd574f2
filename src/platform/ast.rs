//! Structural search over parsed player JavaScript.
//!
//! The player bundle renames everything on every deploy, so functions are
//! located by shape and by substring fingerprints rather than by name. Two
//! primitives are exposed: [`find_function`] walks the top-level statement
//! list (descending into IIFE bodies and blocks) looking for
//! `<ident> = function (...) {...}` assignments, and [`find_variable`] looks
//! inside IIFE declaration lists for initializers of the form
//! `<ident> = "...".<call>(...)`.
//!
//! Offsets are 1-based: the `includes`/`regexp` probes are tested against
//! the source window shifted one byte right of the node (`[idx0..idx1]`),
//! with a required match index greater than zero, while the returned source
//! is the exact node text (`[idx0-1..idx1-1]`) — a standalone assignment
//! without the trailing semicolon, which is what the evaluator needs to
//! re-declare it.

use crate::error::YtError;
use regex::Regex;
use swc_common::{sync::Lrc, FileName, SourceMap, Span};
use swc_ecma_ast::{
    Callee, Decl, EsVersion, Expr, Lit, ModuleItem, Pat, PatOrExpr, Program, Stmt, VarDeclarator,
};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax};

/// Search criteria for [`find_function`]. Any populated field can match.
#[derive(Debug, Clone, Default)]
pub struct FindFunctionArgs {
    /// Exact identifier name.
    pub name: Option<String>,
    /// Substring probe against the (shifted) function source.
    pub includes: Option<String>,
    /// Regular expression against the (shifted) function source.
    pub regexp: Option<String>,
}

/// A located named function literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundFunction {
    /// 1-based start offset of the assignment expression.
    pub start: usize,
    /// 1-based end offset (one past the last byte, 1-based).
    pub end: usize,
    /// Identifier the function literal is assigned to.
    pub name: String,
    /// Exact source text of the assignment, `name=function(...){...}`.
    pub source: String,
}

/// Search criteria for [`find_variable`], matched against the string
/// literal the initializer call hangs off.
#[derive(Debug, Clone, Default)]
pub struct FindVariableArgs {
    pub includes: Option<String>,
    pub regexp: Option<String>,
}

/// A located variable initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct FoundVariable {
    pub name: String,
    /// Exact source text of the declarator, `name="...".call(...)`.
    pub source: String,
}

/// Parse `source` and return its top-level statements plus the file's base
/// offset in the source map.
fn parse_statements(source: &str) -> Result<(Vec<Stmt>, u32), YtError> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(FileName::Anon, source.to_string());
    let base = fm.start_pos.0;

    let lexer = Lexer::new(
        Syntax::Es(Default::default()),
        EsVersion::Es2022,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let program = parser
        .parse_program()
        .map_err(|e| YtError::Extraction(format!("error parsing JavaScript: {}", e.into_kind().msg())))?;

    let stmts = match program {
        Program::Script(script) => script.body,
        Program::Module(module) => module
            .body
            .into_iter()
            .filter_map(|item| match item {
                ModuleItem::Stmt(stmt) => Some(stmt),
                ModuleItem::ModuleDecl(_) => None,
            })
            .collect(),
    };

    Ok((stmts, base))
}

/// Convert a span to 1-based (start, end) offsets within the source.
fn span_indices(span: Span, base: u32) -> (usize, usize) {
    (
        (span.lo.0 - base) as usize + 1,
        (span.hi.0 - base) as usize + 1,
    )
}

/// The probe window: the node's source shifted one byte right.
fn shifted_window(source: &str, idx0: usize, idx1: usize) -> String {
    let bytes = source.as_bytes();
    let lo = idx0.min(bytes.len());
    let hi = idx1.min(bytes.len());
    String::from_utf8_lossy(&bytes[lo..hi]).into_owned()
}

/// The exact node text.
fn node_text(source: &str, idx0: usize, idx1: usize) -> String {
    let bytes = source.as_bytes();
    let lo = (idx0 - 1).min(bytes.len());
    let hi = (idx1 - 1).min(bytes.len());
    String::from_utf8_lossy(&bytes[lo..hi]).into_owned()
}

fn unwrap_parens(expr: &Expr) -> &Expr {
    let mut current = expr;
    while let Expr::Paren(paren) = current {
        current = &paren.expr;
    }
    current
}

fn assign_target_ident(assign: &swc_ecma_ast::AssignExpr) -> Option<String> {
    match &assign.left {
        PatOrExpr::Pat(pat) => match pat.as_ref() {
            Pat::Ident(binding) => Some(binding.id.sym.to_string()),
            Pat::Expr(expr) => match unwrap_parens(expr) {
                Expr::Ident(ident) => Some(ident.sym.to_string()),
                _ => None,
            },
            _ => None,
        },
        PatOrExpr::Expr(expr) => match unwrap_parens(expr) {
            Expr::Ident(ident) => Some(ident.sym.to_string()),
            _ => None,
        },
    }
}

/// Locate a named function literal by name, substring or regex.
///
/// Statements are visited in source order; the first candidate that
/// satisfies any populated criterion wins. Returns `Ok(None)` when nothing
/// matches — the caller decides whether that is fatal.
pub fn find_function(
    source: &str,
    args: &FindFunctionArgs,
) -> Result<Option<FoundFunction>, YtError> {
    let regexp = args.regexp.as_deref().map(Regex::new).transpose()?;
    let (stmts, base) = parse_statements(source)?;

    let mut stack: Vec<&Stmt> = stmts.iter().rev().collect();

    while let Some(current) = stack.pop() {
        match current {
            Stmt::Expr(expr_stmt) => match unwrap_parens(&expr_stmt.expr) {
                Expr::Assign(assign) => {
                    let Some(name) = assign_target_ident(assign) else {
                        continue;
                    };
                    if !matches!(unwrap_parens(&assign.right), Expr::Fn(_)) {
                        continue;
                    }

                    let (idx0, idx1) = span_indices(assign.span, base);
                    let window = shifted_window(source, idx0, idx1);

                    let name_hit = args.name.as_deref() == Some(name.as_str());
                    let includes_hit = args
                        .includes
                        .as_deref()
                        .and_then(|probe| window.find(probe))
                        .is_some_and(|index| index > 0);
                    let regexp_hit = regexp
                        .as_ref()
                        .is_some_and(|regex| regex.is_match(&window));

                    if name_hit || includes_hit || regexp_hit {
                        return Ok(Some(FoundFunction {
                            start: idx0,
                            end: idx1,
                            name,
                            source: node_text(source, idx0, idx1),
                        }));
                    }
                }
                Expr::Call(call) => {
                    if let Callee::Expr(callee) = &call.callee {
                        if let Expr::Fn(fn_expr) = unwrap_parens(callee) {
                            if let Some(body) = &fn_expr.function.body {
                                stack.extend(body.stmts.iter().rev());
                            }
                        }
                    }
                }
                _ => {}
            },
            Stmt::Block(block) => {
                stack.extend(block.stmts.iter().rev());
            }
            _ => {}
        }
    }

    Ok(None)
}

/// Check one declarator against the find_variable criteria.
fn variable_candidate(
    declarator: &VarDeclarator,
    args: &FindVariableArgs,
    regexp: Option<&Regex>,
    source: &str,
    base: u32,
) -> Option<FoundVariable> {
    let Pat::Ident(binding) = &declarator.name else {
        return None;
    };
    let init = declarator.init.as_deref()?;

    // Initializer shape: a call whose callee is `<string literal>.<member>`.
    let Expr::Call(call) = unwrap_parens(init) else {
        return None;
    };
    let Callee::Expr(callee) = &call.callee else {
        return None;
    };
    let Expr::Member(member) = unwrap_parens(callee) else {
        return None;
    };
    let Expr::Lit(Lit::Str(literal)) = unwrap_parens(&member.obj) else {
        return None;
    };

    let value: &str = &literal.value;
    let includes_hit = args
        .includes
        .as_deref()
        .is_some_and(|probe| value.contains(probe));
    let regexp_hit = regexp.is_some_and(|regex| regex.is_match(value));

    if !(includes_hit || regexp_hit) {
        return None;
    }

    let (idx0, idx1) = span_indices(declarator.span, base);
    Some(FoundVariable {
        name: binding.id.sym.to_string(),
        source: node_text(source, idx0, idx1),
    })
}

/// Locate a variable initializer whose right-hand side is a call hanging
/// off a string literal matching the criteria.
pub fn find_variable(
    source: &str,
    args: &FindVariableArgs,
) -> Result<Option<FoundVariable>, YtError> {
    let regexp = args.regexp.as_deref().map(Regex::new).transpose()?;
    let (stmts, base) = parse_statements(source)?;

    let mut stack: Vec<&Stmt> = stmts.iter().rev().collect();

    while let Some(current) = stack.pop() {
        match current {
            Stmt::Expr(expr_stmt) => {
                if let Expr::Call(call) = unwrap_parens(&expr_stmt.expr) {
                    if let Callee::Expr(callee) = &call.callee {
                        if let Expr::Fn(fn_expr) = unwrap_parens(callee) {
                            if let Some(body) = &fn_expr.function.body {
                                stack.extend(body.stmts.iter().rev());
                            }
                        }
                    }
                }
            }
            Stmt::Block(block) => {
                stack.extend(block.stmts.iter().rev());
            }
            Stmt::Decl(Decl::Var(var_decl)) => {
                for declarator in &var_decl.decls {
                    if let Some(found) =
                        variable_candidate(declarator, args, regexp.as_ref(), source, base)
                    {
                        return Ok(Some(found));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(None)
}
