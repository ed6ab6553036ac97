//! Moving a field from one class to another across a project.
//!
//! The move runs in two passes over every participating file:
//!
//! 1. The source class loses the field and its accessors, the target class gains the field plus
//!    a getter and setter, and every usage of the field through a source instance is redirected
//!    to a `Target $$target` parameter injected into the enclosing method.
//! 2. Every call of a method that gained that parameter is given a fresh `new Target()` argument
//!    (see [`crate::call_sites`]).
//!
//! All files are parsed and checked before anything is rewritten, so a failed precondition leaves
//! the project untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use codart_syntax::{parse_java, JavaParseResult, SyntaxKind, Token};
use thiserror::Error;

use crate::call_sites::propagate_call_sites;
use crate::model::{
    simple_type_name, BodyItem, Class, ClassBodyLocation, ExpressionName, Field, FileModel,
    ImportAnchors, Method, MethodInvocation, TokenSpan,
};
use crate::precondition::{FileRole, Participation, PreconditionChecker};
use crate::project::{is_class_file, order_files};
use crate::rewrite::{RewriteBuffer, RewriteError};
use crate::symbols::build_model;

const DEFAULT_INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveFieldParams {
    pub source_package: String,
    pub source_class: String,
    pub field_name: String,
    pub target_package: String,
    pub target_class: String,
}

impl MoveFieldParams {
    pub fn new(
        source_package: impl Into<String>,
        source_class: impl Into<String>,
        field_name: impl Into<String>,
        target_package: impl Into<String>,
        target_class: impl Into<String>,
    ) -> Self {
        Self {
            source_package: source_package.into(),
            source_class: source_class.into(),
            field_name: field_name.into(),
            target_package: target_package.into(),
            target_class: target_class.into(),
        }
    }

    pub fn source_qualified_name(&self) -> String {
        qualified_name(&self.source_package, &self.source_class)
    }

    pub fn target_qualified_name(&self) -> String {
        qualified_name(&self.target_package, &self.target_class)
    }

    /// Name of the target-typed parameter injected into methods that use the field.
    pub fn injected_param_name(&self) -> String {
        format!("$${}", self.target_class.to_lowercase())
    }

    pub fn is_accessor_name(&self, name: &str) -> bool {
        accessor_names(&self.field_name).iter().any(|a| a == name)
    }
}

fn qualified_name(package: &str, class: &str) -> String {
    if package.is_empty() {
        class.to_string()
    } else {
        format!("{package}.{class}")
    }
}

/// Accessor method names recognized for `field`: `get`, `set`, `is` and `has` followed by the
/// capitalized field name.
pub fn accessor_names(field: &str) -> [String; 4] {
    let capitalized = capitalize(field);
    ["get", "set", "is", "has"].map(|prefix| format!("{prefix}{capitalized}"))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum MoveFieldError {
    #[error("no source file found for class '{class}'")]
    ClassFileNotFound { class: String },
    #[error("field '{field}' not found in class '{class}'")]
    FieldNotFound { class: String, field: String },
    #[error("target class '{class}' does not exist")]
    TargetDoesNotExist { class: String },
    #[error("class '{class}' already declares a field named '{field}'")]
    DuplicateField { class: String, field: String },
    #[error("class '{class}' declares constructors but none without parameters")]
    TargetNoEmptyConstructor { class: String },
    #[error("unsupported construct in {role} file {}: {reason}", .file.display())]
    UnsupportedConstruct {
        file: PathBuf,
        role: FileRole,
        reason: String,
    },
    #[error("failed to rewrite {}: {source}", .file.display())]
    Rewrite {
        file: PathBuf,
        #[source]
        source: RewriteError,
    },
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] codart_config::ConfigError),
}

/// The declaration carried from the source class into the target class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedField {
    pub name: String,
    pub ty: String,
    pub modifiers: Vec<String>,
    pub declarator_text: String,
}

impl From<&Field> for MovedField {
    fn from(field: &Field) -> Self {
        Self {
            name: field.name.clone(),
            ty: field.ty.clone(),
            modifiers: field.modifiers.clone(),
            declarator_text: field.declarator_text.clone(),
        }
    }
}

impl MovedField {
    /// The field declaration as emitted into the target. Fields without an access modifier
    /// become `private`.
    pub fn declaration(&self) -> String {
        let mut modifiers = self.modifiers.clone();
        let has_access = modifiers
            .iter()
            .any(|m| matches!(m.as_str(), "public" | "protected" | "private"));
        if !has_access {
            let after_annotations = modifiers.iter().take_while(|m| m.starts_with('@')).count();
            modifiers.insert(after_annotations, "private".to_string());
        }
        format!("{} {} {};", modifiers.join(" "), self.ty, self.declarator_text)
    }

    pub fn getter(&self) -> String {
        format!(
            "public {ty} get{cap}() {{ return this.{name}; }}",
            ty = self.ty,
            cap = capitalize(&self.name),
            name = self.name,
        )
    }

    pub fn setter(&self) -> String {
        format!(
            "public void set{cap}({ty} {name}) {{ this.{name} = {name}; }}",
            ty = self.ty,
            cap = capitalize(&self.name),
            name = self.name,
        )
    }
}

/// A method or constructor whose parameter list gained the injected target parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedMethod {
    pub file: PathBuf,
    pub class: String,
    pub name: String,
    /// Signature key before the parameter was injected.
    pub key: String,
    /// Parameter count before the parameter was injected.
    pub arity: usize,
    pub is_constructor: bool,
    pub is_varargs: bool,
}

impl UpdatedMethod {
    /// Whether a call passing `args` arguments can resolve to this method.
    pub(crate) fn accepts(&self, args: usize) -> bool {
        if self.is_varargs {
            args + 1 >= self.arity
        } else {
            args == self.arity
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveFieldOutcome {
    /// New contents of every file that changed.
    pub files: BTreeMap<PathBuf, String>,
    pub skipped: Vec<SkippedFile>,
    pub updated_methods: Vec<UpdatedMethod>,
    pub moved: MovedField,
}

struct ParsedFile<'a> {
    path: &'a Path,
    text: &'a str,
    parse: JavaParseResult,
    model: FileModel,
}

impl<'a> ParsedFile<'a> {
    fn new(path: &'a Path, text: &'a str) -> Self {
        let parse = parse_java(text);
        let model = build_model(text, &parse);
        Self {
            path,
            text,
            parse,
            model,
        }
    }
}

/// Move a field between classes of an in-memory project (`path -> contents`).
///
/// Nothing is written; the outcome carries the new contents of changed files.
pub fn move_field(
    files: &BTreeMap<PathBuf, String>,
    params: &MoveFieldParams,
) -> Result<MoveFieldOutcome, MoveFieldError> {
    for class in [&params.source_class, &params.target_class] {
        if !files.keys().any(|path| is_class_file(path, class)) {
            let qualified = if class == &params.source_class {
                params.source_qualified_name()
            } else {
                params.target_qualified_name()
            };
            return Err(MoveFieldError::ClassFileNotFound { class: qualified });
        }
    }

    let order = order_files(
        files.keys().cloned(),
        &params.source_class,
        &params.target_class,
    );
    let parsed: Vec<ParsedFile<'_>> = order
        .iter()
        .filter_map(|path| Some(ParsedFile::new(path, files.get(path)?)))
        .collect();

    let source = role_file(&parsed, &params.source_class, &params.source_package, None)
        .ok_or_else(|| MoveFieldError::ClassFileNotFound {
            class: params.source_qualified_name(),
        })?;
    let target = role_file(
        &parsed,
        &params.target_class,
        &params.target_package,
        Some(source),
    )
    .ok_or_else(|| MoveFieldError::TargetDoesNotExist {
        class: params.target_qualified_name(),
    })?;
    let role = |idx: usize| match idx {
        _ if idx == source => FileRole::Source,
        _ if idx == target => FileRole::Target,
        _ => FileRole::Other,
    };

    let checker = PreconditionChecker::new(params);
    let mut skipped = Vec::new();
    let mut participating = Vec::with_capacity(parsed.len());
    for (idx, file) in parsed.iter().enumerate() {
        match checker.participation(file.path, &file.model, role(idx))? {
            Participation::Participate => participating.push(idx),
            Participation::Skip { reason } => {
                tracing::warn!(
                    target: "codart.refactor",
                    path = %file.path.display(),
                    %reason,
                    "skipping file with unsupported constructs"
                );
                skipped.push(SkippedFile {
                    path: file.path.to_path_buf(),
                    reason,
                });
            }
        }
    }
    checker.check_source(&parsed[source].model)?;
    checker.check_target(&parsed[target].model)?;

    let field_candidates: BTreeSet<String> = participating
        .iter()
        .flat_map(|&idx| parsed[idx].model.package.classes.values())
        .flat_map(|class| class.fields.values())
        .filter(|f| simple_type_name(&f.ty) == Some(params.source_class.as_str()))
        .map(|f| f.name.clone())
        .collect();

    let pass = FieldPass {
        params,
        field_candidates: &field_candidates,
        param_name: params.injected_param_name(),
    };

    let mut rewritten: BTreeMap<usize, String> = BTreeMap::new();
    let mut updated_methods = Vec::new();
    let mut record = |idx: usize, edit: FileEdit| {
        if let Some(text) = edit.text {
            rewritten.insert(idx, text);
        }
        updated_methods.extend(edit.updated);
    };

    let (source_edit, moved) = pass.rewrite_source(&parsed[source])?;
    record(source, source_edit);
    record(target, pass.rewrite_target(&parsed[target], &moved)?);
    for &idx in participating
        .iter()
        .filter(|&&idx| idx != source && idx != target)
    {
        record(idx, pass.rewrite(&parsed[idx], FileRole::Other, None)?);
    }

    let mut outputs = BTreeMap::new();
    for &idx in &participating {
        let file = &parsed[idx];
        let first_pass = rewritten.get(&idx);
        let current = first_pass.map(String::as_str).unwrap_or(file.text);
        match propagate_call_sites(file.path, current, &updated_methods, params)? {
            Some(text) => {
                outputs.insert(file.path.to_path_buf(), text);
            }
            None => {
                if let Some(text) = first_pass {
                    outputs.insert(file.path.to_path_buf(), text.clone());
                }
            }
        }
    }

    tracing::info!(
        target: "codart.refactor",
        field = %params.field_name,
        from = %params.source_qualified_name(),
        to = %params.target_qualified_name(),
        changed = outputs.len(),
        skipped = skipped.len(),
        updated_methods = updated_methods.len(),
        "moved field"
    );

    Ok(MoveFieldOutcome {
        files: outputs,
        skipped,
        updated_methods,
        moved,
    })
}

/// The file named `<class>.java` declaring `package`, excluding `exclude`.
fn role_file(
    parsed: &[ParsedFile<'_>],
    class: &str,
    package: &str,
    exclude: Option<usize>,
) -> Option<usize> {
    parsed
        .iter()
        .enumerate()
        .find(|(idx, file)| {
            Some(*idx) != exclude
                && is_class_file(file.path, class)
                && file.model.package.name == package
        })
        .map(|(idx, _)| idx)
}

struct FileEdit {
    text: Option<String>,
    updated: Vec<UpdatedMethod>,
}

/// First-pass state shared by every file.
struct FieldPass<'a> {
    params: &'a MoveFieldParams,
    /// Names of fields anywhere in the project whose type is the source class.
    field_candidates: &'a BTreeSet<String>,
    param_name: String,
}

impl FieldPass<'_> {
    fn rewrite_source(&self, file: &ParsedFile<'_>) -> Result<(FileEdit, MovedField), MoveFieldError> {
        let field = PreconditionChecker::new(self.params).check_source(&file.model)?;
        let moved = MovedField::from(field);
        let edit = self.rewrite(file, FileRole::Source, Some(field))?;
        Ok((edit, moved))
    }

    fn rewrite_target(
        &self,
        file: &ParsedFile<'_>,
        moved: &MovedField,
    ) -> Result<FileEdit, MoveFieldError> {
        self.plan_file(file, |buffer| {
            if let Some(class) = file.model.class(&self.params.target_class) {
                insert_field(buffer, class, moved)?;
            }
            Ok(())
        }, FileRole::Target)
    }

    fn rewrite(
        &self,
        file: &ParsedFile<'_>,
        role: FileRole,
        field: Option<&Field>,
    ) -> Result<FileEdit, MoveFieldError> {
        self.plan_file(file, |buffer| {
            if let Some(field) = field {
                delete_field(buffer, field)?;
            }
            Ok(())
        }, role)
    }

    fn plan_file(
        &self,
        file: &ParsedFile<'_>,
        role_edits: impl FnOnce(&mut RewriteBuffer<'_>) -> Result<(), RewriteError>,
        role: FileRole,
    ) -> Result<FileEdit, MoveFieldError> {
        let mut buffer = RewriteBuffer::new(file.text, &file.parse.tokens);
        let mut updated = Vec::new();
        role_edits(&mut buffer)
            .and_then(|()| self.plan_usages(file, role, &mut buffer, &mut updated))
            .map_err(|source| MoveFieldError::Rewrite {
                file: file.path.to_path_buf(),
                source,
            })?;

        tracing::debug!(
            target: "codart.refactor",
            path = %file.path.display(),
            %role,
            edits = buffer.ops().len(),
            updated_methods = updated.len(),
            "planned first pass"
        );
        Ok(FileEdit {
            text: buffer.is_modified().then(|| buffer.render()),
            updated,
        })
    }

    fn plan_usages(
        &self,
        file: &ParsedFile<'_>,
        role: FileRole,
        buffer: &mut RewriteBuffer<'_>,
        updated: &mut Vec<UpdatedMethod>,
    ) -> Result<(), RewriteError> {
        let params = self.params;
        let model = &file.model;

        let mut removed_accessors = BTreeSet::new();
        if role == FileRole::Source {
            if let Some(class) = model.class(&params.source_class) {
                for method in class
                    .methods
                    .values()
                    .filter(|m| !m.is_constructor && params.is_accessor_name(&m.name))
                {
                    let span = method.location.declaration;
                    let start = leading_trivia_start(buffer, span.start);
                    buffer.delete(start, span.end)?;
                    removed_accessors.insert(method.key());
                }
            }
        }

        let imports_source = model.imports.iter().any(|i| {
            i.imports_package(&params.source_package)
                || i.imports_class(&params.source_package, &params.source_class)
        });
        let in_source_package = model.package.name == params.source_package;
        if !imports_source && !in_source_package {
            return Ok(());
        }

        for class in model.top_level_classes() {
            let in_source = in_source_package && class.name == params.source_class;
            for method in class.methods.values() {
                if in_source && removed_accessors.contains(&method.key()) {
                    continue;
                }
                self.redirect_method(file, class, method, in_source, buffer, updated)?;
            }
        }

        let needs_import = role != FileRole::Target
            && !params.target_package.is_empty()
            && !model.sees(&params.target_package, &params.target_class)
            && (imports_source || !updated.is_empty());
        if needs_import {
            let import = format!("import {};", params.target_qualified_name());
            insert_import(buffer, &model.anchors, &import)?;
        }
        Ok(())
    }

    fn redirect_method(
        &self,
        file: &ParsedFile<'_>,
        class: &Class,
        method: &Method,
        in_source: bool,
        buffer: &mut RewriteBuffer<'_>,
        updated: &mut Vec<UpdatedMethod>,
    ) -> Result<(), RewriteError> {
        let params = self.params;
        let source_class = params.source_class.as_str();

        let receivers = SourceReceivers {
            source_class,
            in_source,
            method,
            fields: self.field_candidates,
        };

        let mut redirects: Vec<Redirect> = Vec::new();
        for item in &method.body {
            let redirect = match item {
                BodyItem::Local(_) | BodyItem::AnonymousClass(_) => None,
                BodyItem::Name(name) => self.redirect_name(name, &receivers),
                BodyItem::Invocation(call) => self.redirect_call(call, &receivers),
            };
            if let Some(redirect) = redirect {
                if !redirects.iter().any(|r| r.overlaps(&redirect)) {
                    redirects.push(redirect);
                }
            }
        }
        if redirects.is_empty() || method.location.r_paren.is_none() {
            return Ok(());
        }

        let already_injected = method.parameters.iter().any(|(ty, name)| {
            name == &self.param_name && simple_type_name(ty) == Some(params.target_class.as_str())
        });
        if !already_injected {
            self.inject_param(buffer, method)?;
            updated.push(UpdatedMethod {
                file: file.path.to_path_buf(),
                class: class.name.clone(),
                name: method.name.clone(),
                key: method.key(),
                arity: method.parameters.len(),
                is_constructor: method.is_constructor,
                is_varargs: method.is_varargs,
            });
        }

        for redirect in redirects {
            match redirect {
                Redirect::Replace(span) => {
                    buffer.replace(span.start, span.end, self.param_name.clone())?
                }
                Redirect::Qualify(index) => {
                    buffer.insert_before(index, format!("{}.", self.param_name))?
                }
            }
        }
        Ok(())
    }

    fn redirect_name(&self, name: &ExpressionName, receivers: &SourceReceivers<'_>) -> Option<Redirect> {
        let field = self.params.field_name.as_str();
        if let Some(span) = name.receiver {
            let (last, qualifier) = name.segments.split_last()?;
            return (last == field
                && receivers.matches(qualifier, name.creator.as_deref(), span.start))
            .then_some(Redirect::Replace(span));
        }

        let first = name.segments.first()?;
        let first_token = *name.segment_tokens.first()?;
        if name.segments.get(1).is_some_and(|s| s == field)
            && receivers.matches(&name.segments[..1], None, first_token)
        {
            return Some(Redirect::Replace(TokenSpan::new(first_token, first_token)));
        }
        (receivers.in_source
            && first == field
            && receivers.method.binding_at(field, first_token).is_none())
        .then_some(Redirect::Qualify(first_token))
    }

    fn redirect_call(&self, call: &MethodInvocation, receivers: &SourceReceivers<'_>) -> Option<Redirect> {
        if !self.params.is_accessor_name(call.name()) {
            return None;
        }
        match call.receiver {
            Some(span) => receivers
                .matches(call.receiver_chain(), call.creator.as_deref(), span.start)
                .then_some(Redirect::Replace(span)),
            None => receivers.in_source.then_some(Redirect::Qualify(call.name_token)),
        }
    }

    fn inject_param(&self, buffer: &mut RewriteBuffer<'_>, method: &Method) -> Result<(), RewriteError> {
        let param = format!("{} {}", self.params.target_class, self.param_name);
        match (method.location.varargs_start, method.location.r_paren) {
            // Varargs must stay last.
            (Some(start), _) => buffer.insert_before(start, format!("{param}, ")),
            (None, Some(r_paren)) if method.parameters.is_empty() => {
                buffer.insert_before(r_paren, param)
            }
            (None, Some(r_paren)) => buffer.insert_before(r_paren, format!(", {param}")),
            (None, None) => Ok(()),
        }
    }
}

/// Decides whether a receiver denotes an instance of the source class.
struct SourceReceivers<'a> {
    source_class: &'a str,
    in_source: bool,
    /// The method being rewritten, for the variables visible at each use.
    method: &'a Method,
    fields: &'a BTreeSet<String>,
}

impl SourceReceivers<'_> {
    /// `at` is the first token of the receiver.
    fn matches(&self, qualifier: &[String], creator: Option<&str>, at: usize) -> bool {
        if creator.is_some() {
            return qualifier.is_empty() && creator == Some(self.source_class);
        }
        let this_is_enclosing = !self.method.in_anonymous_class(at);
        match qualifier {
            [this] if this == "this" => self.in_source && this_is_enclosing,
            [name] => match self.method.binding_at(name, at) {
                Some(ty) => simple_type_name(ty) == Some(self.source_class),
                None => self.fields.contains(name),
            },
            [this, name] if this == "this" => this_is_enclosing && self.fields.contains(name),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Redirect {
    /// Replace the receiver tokens with the injected parameter.
    Replace(TokenSpan),
    /// Prefix an unqualified use with the injected parameter.
    Qualify(usize),
}

impl Redirect {
    fn span(self) -> TokenSpan {
        match self {
            Redirect::Replace(span) => span,
            Redirect::Qualify(index) => TokenSpan::new(index, index),
        }
    }

    fn overlaps(&self, other: &Redirect) -> bool {
        let (a, b) = (self.span(), other.span());
        a.start <= b.end && b.start <= a.end
    }
}

/// Remove the moved declarator, or the whole declaration when it declares nothing else.
pub(crate) fn delete_field(
    buffer: &mut RewriteBuffer<'_>,
    field: &Field,
) -> Result<(), RewriteError> {
    let tokens = buffer.tokens();
    let loc = &field.location;
    if loc.declarator_count <= 1 {
        let start = leading_trivia_start(buffer, loc.declaration.start);
        return buffer.delete(start, loc.declaration.end);
    }

    if loc.declarator_index + 1 < loc.declarator_count {
        // `a, ` in `int a, b;`
        let mut end = next_significant(tokens, loc.declarator.end).unwrap_or(loc.declarator.end);
        while tokens
            .get(end + 1)
            .is_some_and(|t| t.kind == SyntaxKind::Whitespace)
        {
            end += 1;
        }
        buffer.delete(loc.declarator.start, end)
    } else {
        // `, b` in `int a, b;`
        let start = prev_significant(tokens, loc.declarator.start).unwrap_or(loc.declarator.start);
        buffer.delete(start, loc.declarator.end)
    }
}

fn insert_field(
    buffer: &mut RewriteBuffer<'_>,
    class: &Class,
    moved: &MovedField,
) -> Result<(), RewriteError> {
    let Some(body) = &class.body else {
        return Ok(());
    };
    prepend_member(buffer, body, &moved.declaration())?;
    append_members(buffer, body, &[moved.getter(), moved.setter()])
}

/// Insert `member` on its own line right after the opening brace of `body`.
pub(crate) fn prepend_member(
    buffer: &mut RewriteBuffer<'_>,
    body: &ClassBodyLocation,
    member: &str,
) -> Result<(), RewriteError> {
    let indent = body.member_indent.as_deref().unwrap_or(DEFAULT_INDENT);
    buffer.insert_after(body.l_brace, format!("\n{indent}{member}"))
}

/// Insert `members` one per line after the last member of `body`.
pub(crate) fn append_members(
    buffer: &mut RewriteBuffer<'_>,
    body: &ClassBodyLocation,
    members: &[String],
) -> Result<(), RewriteError> {
    let indent = body.member_indent.as_deref().unwrap_or(DEFAULT_INDENT);
    let tokens = buffer.tokens();
    let last = prev_significant(tokens, body.r_brace).unwrap_or(body.l_brace);
    let closing_on_own_line = body
        .r_brace
        .checked_sub(1)
        .is_some_and(|prev| is_line_break(buffer, prev));
    let mut text: String = members
        .iter()
        .map(|member| format!("\n{indent}{member}"))
        .collect();
    if !closing_on_own_line {
        text.push('\n');
    }
    buffer.insert_after(last, text)
}

/// True when `body` has nothing between its braces.
pub(crate) fn is_empty_body(buffer: &RewriteBuffer<'_>, body: &ClassBodyLocation) -> bool {
    prev_significant(buffer.tokens(), body.r_brace) == Some(body.l_brace)
}

/// Insert an import line after the existing imports, the package declaration, or before the
/// first type, in that order of preference.
pub(crate) fn insert_import(
    buffer: &mut RewriteBuffer<'_>,
    anchors: &ImportAnchors,
    import: &str,
) -> Result<(), RewriteError> {
    if let Some(end) = anchors.last_import_end {
        buffer.insert_after(end, format!("\n{import}"))
    } else if let Some(end) = anchors.package_end {
        buffer.insert_after(end, format!("\n\n{import}"))
    } else if let Some(start) = anchors.first_type_start {
        buffer.insert_before(start, format!("{import}\n\n"))
    } else {
        Ok(())
    }
}

/// Start of a deletion that also removes the whitespace and own-line comments preceding
/// `start`. Trailing comments of the previous line are kept.
pub(crate) fn leading_trivia_start(buffer: &RewriteBuffer<'_>, start: usize) -> usize {
    let tokens = buffer.tokens();
    let mut new_start = start;
    while new_start > 0 {
        let prev = new_start - 1;
        match tokens[prev].kind {
            SyntaxKind::Whitespace => new_start = prev,
            kind if kind.is_trivia() => {
                let own_line = prev == 0 || is_line_break(buffer, prev - 1);
                if !own_line {
                    break;
                }
                new_start = prev;
            }
            _ => break,
        }
    }
    new_start
}

fn is_line_break(buffer: &RewriteBuffer<'_>, index: usize) -> bool {
    buffer.tokens()[index].kind == SyntaxKind::Whitespace
        && buffer.token_text(index).is_some_and(|t| t.contains('\n'))
}

fn prev_significant(tokens: &[Token], index: usize) -> Option<usize> {
    (0..index).rev().find(|&i| !tokens[i].kind.is_trivia())
}

fn next_significant(tokens: &[Token], index: usize) -> Option<usize> {
    (index + 1..tokens.len()).find(|&i| !tokens[i].kind.is_trivia())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn project(files: &[(&str, &str)]) -> BTreeMap<PathBuf, String> {
        files
            .iter()
            .map(|(path, text)| (PathBuf::from(path), text.to_string()))
            .collect()
    }

    fn params() -> MoveFieldParams {
        MoveFieldParams::new("source", "Source", "a", "target", "Target")
    }

    const TARGET: &str = "package target;\n\npublic class Target {\n    public Target() {}\n}\n";

    #[test]
    fn accessor_names_capitalize_the_full_field_name() {
        assert_eq!(
            accessor_names("name"),
            [
                "getName".to_string(),
                "setName".to_string(),
                "isName".to_string(),
                "hasName".to_string()
            ]
        );
        let params = MoveFieldParams::new("p", "S", "name", "q", "T");
        assert!(params.is_accessor_name("hasName"));
        assert!(!params.is_accessor_name("getNameValue"));
        assert!(!params.is_accessor_name("getname"));
    }

    #[test]
    fn moved_field_templates() {
        let moved = MovedField {
            name: "count".to_string(),
            ty: "int".to_string(),
            modifiers: vec!["@Deprecated".to_string(), "static".to_string()],
            declarator_text: "count = 1".to_string(),
        };
        assert_eq!(moved.declaration(), "@Deprecated private static int count = 1;");
        assert_eq!(moved.getter(), "public int getCount() { return this.count; }");
        assert_eq!(
            moved.setter(),
            "public void setCount(int count) { this.count = count; }"
        );

        let public = MovedField {
            modifiers: vec!["public".to_string()],
            ..moved
        };
        assert_eq!(public.declaration(), "public int count = 1;");
    }

    #[test]
    fn moves_field_and_redirects_this_access() {
        let files = project(&[
            (
                "source/Source.java",
                "package source;\n\npublic class Source {\n    int a;\n\n    public void useA() {\n        System.out.println(this.a);\n    }\n\n    public void run() {\n        useA();\n    }\n}\n",
            ),
            ("target/Target.java", TARGET),
        ]);
        let outcome = move_field(&files, &params()).unwrap();

        assert_eq!(
            outcome.files[Path::new("source/Source.java")],
            "package source;\n\nimport target.Target;\n\npublic class Source {\n\n    public void useA(Target $$target) {\n        System.out.println($$target.a);\n    }\n\n    public void run() {\n        useA(new Target());\n    }\n}\n"
        );
        assert_eq!(
            outcome.files[Path::new("target/Target.java")],
            "package target;\n\npublic class Target {\n    private int a;\n    public Target() {}\n    public int getA() { return this.a; }\n    public void setA(int a) { this.a = a; }\n}\n"
        );
        assert_eq!(outcome.updated_methods.len(), 1);
        assert_eq!(outcome.updated_methods[0].key, "useA()");
    }

    #[test]
    fn removes_source_accessors_and_qualifies_unqualified_uses() {
        let files = project(&[
            (
                "source/Source.java",
                "package source;\n\nimport java.util.List;\n\npublic class Source {\n    private int a, b;\n\n    public int getA() {\n        return a;\n    }\n\n    public void setA(int a) {\n        this.a = a;\n    }\n\n    int twice(int x) {\n        return a * x + getA();\n    }\n}\n",
            ),
            ("target/Target.java", TARGET),
        ]);
        let outcome = move_field(&files, &params()).unwrap();
        assert_eq!(
            outcome.files[Path::new("source/Source.java")],
            "package source;\n\nimport java.util.List;\nimport target.Target;\n\npublic class Source {\n    private int b;\n\n    int twice(int x, Target $$target) {\n        return $$target.a * x + $$target.getA();\n    }\n}\n"
        );
        assert_eq!(
            outcome.moved.declaration(),
            "private int a;",
            "declarator text carries no trailing comma"
        );
    }

    #[test]
    fn variables_named_like_the_field_shadow_it_only_in_their_scope() {
        let source = r#"package source;

import java.util.List;

public class Source {
    int a;

    int lambda(List<Integer> xs) {
        xs.forEach(a -> System.out.println(a));
        xs.forEach((Integer a) -> { System.out.println(a); });
        return 0;
    }

    int caught() {
        try {
            return 1;
        } catch (RuntimeException a) {
            return a.hashCode();
        }
    }

    Listener anonymous() {
        return new Listener() {
            public void on(int a) {
                System.out.println(a);
            }
        };
    }

    int scoped(List<Integer> xs) {
        xs.forEach(a -> System.out.println(a));
        int b = a;
        {
            int a = 2;
            b += a;
        }
        return a + b;
    }
}
"#;
        let files = project(&[("source/Source.java", source), ("target/Target.java", TARGET)]);
        let outcome = move_field(&files, &params()).unwrap();

        let expected = source
            .replace("import java.util.List;\n", "import java.util.List;\nimport target.Target;\n")
            .replace("\n    int a;\n", "\n")
            .replace("int scoped(List<Integer> xs)", "int scoped(List<Integer> xs, Target $$target)")
            .replace("int b = a;", "int b = $$target.a;")
            .replace("return a + b;", "return $$target.a + b;");
        assert_eq!(outcome.files[Path::new("source/Source.java")], expected);
        let keys: Vec<_> = outcome
            .updated_methods
            .iter()
            .map(|m| m.key.as_str())
            .collect();
        assert_eq!(keys, vec!["scoped(List<Integer>)"]);
    }

    #[test]
    fn redirects_usages_in_other_files() {
        let files = project(&[
            (
                "source/Source.java",
                "package source;\n\npublic class Source {\n    public int a;\n}\n",
            ),
            ("target/Target.java", TARGET),
            (
                "client/Client.java",
                "package client;\n\nimport source.Source;\n\npublic class Client {\n    Source held;\n\n    Client(Source s) {\n        s.a = 1;\n    }\n\n    int read(int a) {\n        Source local = new Source();\n        return local.a + held.getA() + new Source().a + a;\n    }\n\n    void go() {\n        new Client(held);\n        int r = read(2);\n        this.read(3);\n    }\n}\n",
            ),
        ]);
        let outcome = move_field(&files, &params()).unwrap();
        assert_eq!(
            outcome.files[Path::new("client/Client.java")],
            "package client;\n\nimport source.Source;\nimport target.Target;\n\npublic class Client {\n    Source held;\n\n    Client(Source s, Target $$target) {\n        $$target.a = 1;\n    }\n\n    int read(int a, Target $$target) {\n        Source local = new Source();\n        return $$target.a + $$target.getA() + $$target.a + a;\n    }\n\n    void go() {\n        new Client(held, new Target());\n        int r = read(2, new Target());\n        this.read(3, new Target());\n    }\n}\n"
        );
        let keys: Vec<_> = outcome
            .updated_methods
            .iter()
            .map(|m| m.key.as_str())
            .collect();
        assert_eq!(keys, vec!["Client(Source)", "read(int)"]);
    }

    #[test]
    fn files_without_source_access_are_left_alone() {
        let files = project(&[
            (
                "source/Source.java",
                "package source;\n\npublic class Source {\n    int a;\n}\n",
            ),
            ("target/Target.java", TARGET),
            (
                "other/Other.java",
                "package other;\n\npublic class Other {\n    int a;\n    int f(Other o) { return o.a; }\n}\n",
            ),
        ]);
        let outcome = move_field(&files, &params()).unwrap();
        assert!(!outcome.files.contains_key(Path::new("other/Other.java")));
        assert_eq!(outcome.files.len(), 2);
    }

    #[test]
    fn unsupported_non_role_files_are_skipped() {
        let files = project(&[
            (
                "source/Source.java",
                "package source;\n\npublic class Source {\n    int a;\n}\n",
            ),
            ("target/Target.java", TARGET),
            (
                "source/Outer.java",
                "package source;\n\npublic class Outer {\n    class Inner {}\n    void f(Source s) { s.a = 1; }\n}\n",
            ),
        ]);
        let outcome = move_field(&files, &params()).unwrap();
        assert_eq!(
            outcome.skipped,
            vec![SkippedFile {
                path: PathBuf::from("source/Outer.java"),
                reason: "nested type declaration".to_string(),
            }]
        );
        assert!(!outcome.files.contains_key(Path::new("source/Outer.java")));
    }

    #[test]
    fn precondition_failures() {
        let source = ("source/Source.java", "package source;\npublic class Source { int a; }\n");

        let err = move_field(&project(&[source]), &params()).unwrap_err();
        assert!(matches!(err, MoveFieldError::ClassFileNotFound { ref class } if class == "target.Target"), "{err}");

        let err = move_field(
            &project(&[source, ("target/Target.java", "package target;\npublic class Target { Target(int x) {} }\n")]),
            &params(),
        )
        .unwrap_err();
        assert!(matches!(err, MoveFieldError::TargetNoEmptyConstructor { .. }), "{err}");

        let err = move_field(
            &project(&[source, ("target/Target.java", "package target;\npublic class Target { long a; }\n")]),
            &params(),
        )
        .unwrap_err();
        assert!(matches!(err, MoveFieldError::DuplicateField { .. }), "{err}");

        let err = move_field(
            &project(&[source, ("target/Target.java", "package elsewhere;\npublic class Target {}\n")]),
            &params(),
        )
        .unwrap_err();
        assert!(matches!(err, MoveFieldError::TargetDoesNotExist { .. }), "{err}");

        let err = move_field(
            &project(&[
                ("source/Source.java", "package source;\npublic class Source { int b; }\n"),
                ("target/Target.java", TARGET),
            ]),
            &params(),
        )
        .unwrap_err();
        assert!(matches!(err, MoveFieldError::FieldNotFound { .. }), "{err}");

        let err = move_field(
            &project(&[
                ("source/Source.java", "package source;\npublic class Source { int a; interface I {} }\n"),
                ("target/Target.java", TARGET),
            ]),
            &params(),
        )
        .unwrap_err();
        assert!(
            matches!(err, MoveFieldError::UnsupportedConstruct { role: FileRole::Source, .. }),
            "{err}"
        );
    }

    #[test]
    fn varargs_methods_take_the_parameter_before_the_varargs() {
        let files = project(&[
            (
                "source/Source.java",
                "package source;\n\npublic class Source {\n    int a;\n\n    int sum(int... xs) { return a + xs.length; }\n\n    int go() { return sum(1, 2) + sum(); }\n}\n",
            ),
            ("target/Target.java", TARGET),
        ]);
        let outcome = move_field(&files, &params()).unwrap();
        let text = &outcome.files[Path::new("source/Source.java")];
        assert!(
            text.contains("int sum(Target $$target, int... xs) { return $$target.a + xs.length; }"),
            "{text}"
        );
        assert!(
            text.contains("return sum(new Target(), 1, 2) + sum(new Target());"),
            "{text}"
        );
    }
}
