//! Second pass of a field move: every call of a method that gained the injected parameter is
//! given a `new Target()` argument.
//!
//! Calls are matched by name and argument count only. Receivers are not resolved, so a call of
//! an unrelated method with the same name and arity is updated too.

use std::path::Path;

use codart_syntax::{
    parse_java, ArgumentList, AstNode, FieldAccessExpression, JavaParseResult, MethodCallExpression,
    NameExpression, NewExpression, SyntaxKind, SyntaxNode,
};

use crate::model::TokenSpan;
use crate::move_field::{insert_import, MoveFieldError, MoveFieldParams, UpdatedMethod};
use crate::rewrite::{RewriteBuffer, RewriteError};
use crate::symbols::build_model;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Method,
    Constructor,
}

/// A method call or instance creation with an argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallSite {
    pub(crate) kind: CallKind,
    /// Method name, or the simple name of the instantiated type.
    pub(crate) name: String,
    pub(crate) args: Vec<TokenSpan>,
    pub(crate) r_paren: usize,
}

impl CallSite {
    fn resolves_to(&self, method: &UpdatedMethod) -> bool {
        let kind_matches = match self.kind {
            CallKind::Method => !method.is_constructor,
            CallKind::Constructor => method.is_constructor,
        };
        kind_matches && method.name == self.name && method.accepts(self.args.len())
    }
}

pub(crate) fn collect_call_sites(parse: &JavaParseResult) -> Vec<CallSite> {
    parse
        .syntax()
        .descendants()
        .filter_map(|node| match node.kind() {
            SyntaxKind::MethodCallExpression => method_call(parse, &node),
            SyntaxKind::NewExpression => instance_creation(parse, &node),
            _ => None,
        })
        .collect()
}

fn method_call(parse: &JavaParseResult, node: &SyntaxNode) -> Option<CallSite> {
    let call = MethodCallExpression::cast(node.clone())?;
    let callee = call.callee()?;
    let name = match callee.kind() {
        SyntaxKind::NameExpression => NameExpression::cast(callee)?.segments().last()?,
        SyntaxKind::FieldAccessExpression => FieldAccessExpression::cast(callee)?.name_token()?,
        // `this(..)` and `super(..)`
        _ => return None,
    };
    call_site(parse, CallKind::Method, name.text().to_string(), call.argument_list()?)
}

fn instance_creation(parse: &JavaParseResult, node: &SyntaxNode) -> Option<CallSite> {
    let new = NewExpression::cast(node.clone())?;
    let name = new.ty()?.simple_name()?;
    call_site(parse, CallKind::Constructor, name, new.argument_list()?)
}

fn call_site(
    parse: &JavaParseResult,
    kind: CallKind,
    name: String,
    list: ArgumentList,
) -> Option<CallSite> {
    let args = list
        .arguments()
        .map(|arg| parse.node_token_span(&arg).map(TokenSpan::from))
        .collect::<Option<Vec<_>>>()?;
    let r_paren = parse.token_index(&list.r_paren_token()?)?;
    Some(CallSite {
        kind,
        name,
        args,
        r_paren,
    })
}

/// Rewrite the call sites in `text` that resolve to one of `updated`. Returns `None` when
/// nothing changed.
pub(crate) fn propagate_call_sites(
    path: &Path,
    text: &str,
    updated: &[UpdatedMethod],
    params: &MoveFieldParams,
) -> Result<Option<String>, MoveFieldError> {
    if updated.is_empty() {
        return Ok(None);
    }
    let parse = parse_java(text);
    let mut buffer = RewriteBuffer::new(text, &parse.tokens);
    let argument = format!("new {}()", params.target_class);

    let mut rewritten = 0usize;
    let result = collect_call_sites(&parse)
        .iter()
        .filter_map(|site| Some((site, updated.iter().find(|m| site.resolves_to(m))?)))
        .try_for_each(|(site, method)| {
            rewritten += 1;
            insert_argument(&mut buffer, site, method, &argument)
        })
        .and_then(|()| {
            if !buffer.is_modified() || params.target_package.is_empty() {
                return Ok(());
            }
            let model = build_model(text, &parse);
            if model.sees(&params.target_package, &params.target_class) {
                return Ok(());
            }
            let import = format!("import {};", params.target_qualified_name());
            insert_import(&mut buffer, &model.anchors, &import)
        });
    result.map_err(|source| MoveFieldError::Rewrite {
        file: path.to_path_buf(),
        source,
    })?;

    if !buffer.is_modified() {
        return Ok(None);
    }
    tracing::debug!(
        target: "codart.refactor",
        path = %path.display(),
        call_sites = rewritten,
        "added target arguments"
    );
    Ok(Some(buffer.render()))
}

fn insert_argument(
    buffer: &mut RewriteBuffer<'_>,
    site: &CallSite,
    method: &UpdatedMethod,
    argument: &str,
) -> Result<(), RewriteError> {
    if method.is_varargs {
        // The injected parameter sits right before the varargs one.
        let position = method.arity.saturating_sub(1);
        if let Some(arg) = site.args.get(position) {
            return buffer.insert_before(arg.start, format!("{argument}, "));
        }
    }
    if site.args.is_empty() {
        buffer.insert_before(site.r_paren, argument)
    } else {
        buffer.insert_before(site.r_paren, format!(", {argument}"))
    }
}
