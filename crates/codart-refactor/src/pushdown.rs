//! Push a field or a method down from a class into its direct subclasses.
//!
//! The index decides whether the move is legal: every subclass must be a listed target, and every
//! reader, writer or caller of the member must live inside one of them. The member is then cut
//! from the parent and pasted into each subclass, together with the parent's imports the subclass
//! lacks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use codart_syntax::parse_java;

use crate::index::{Entity, EntityKind, RefKind, SemanticIndex};
use crate::model::{ClassBodyLocation, Field, Import, Method};
use crate::move_field::{
    append_members, delete_field, insert_import, is_empty_body, leading_trivia_start,
    prepend_member,
};
use crate::rewrite::{RewriteBuffer, RewriteError};
use crate::single_file::{
    declaring_source, is_within, lookup_one, IndexRefactorError, SingleFileEdit,
};
use crate::symbols::build_model;

/// Move `field` of `package.class` into each subclass named in `subclasses`.
///
/// Only the moved declarator leaves the parent: `int a, b;` keeps `b`. Each subclass receives the
/// declaration with its original modifiers as its first member.
pub fn push_down_field(
    index: &(impl SemanticIndex + ?Sized),
    files: &BTreeMap<PathBuf, String>,
    package: &str,
    class: &str,
    field: &str,
    subclasses: &[&str],
) -> Result<Vec<SingleFileEdit>, IndexRefactorError> {
    let parent = lookup_one(index, &qualified(package, class), EntityKind::Class)?;
    let member = lookup_one(
        index,
        &format!("{}.{field}", parent.long_name),
        EntityKind::Variable,
    )?;
    let children = listed_subclasses(index, &parent, subclasses)?;
    check_users(index, &member, &[RefKind::UseBy, RefKind::SetBy], &children)?;

    let (path, text) = declaring_source(index, files, &parent)?;
    let model = build_model(text, &parse_java(text));
    let decl = model
        .class(class)
        .and_then(|c| c.fields.get(field))
        .ok_or_else(|| IndexRefactorError::DeclarationNotFound {
            file: path.to_path_buf(),
            name: member.long_name.clone(),
        })?;

    let pasted = field_declaration(decl);
    plan(
        index,
        files,
        path,
        &model.imports,
        &children,
        Moved::Field(decl, &pasted),
    )
}

/// Move the method `method` of `package.class` into each subclass named in `subclasses`.
///
/// When the parent overloads the name, the first declaration in the file moves. Each subclass
/// receives the declaration text unchanged as its last member.
pub fn push_down_method(
    index: &(impl SemanticIndex + ?Sized),
    files: &BTreeMap<PathBuf, String>,
    package: &str,
    class: &str,
    method: &str,
    subclasses: &[&str],
) -> Result<Vec<SingleFileEdit>, IndexRefactorError> {
    let parent = lookup_one(index, &qualified(package, class), EntityKind::Class)?;
    let member = lookup_one(
        index,
        &format!("{}.{method}", parent.long_name),
        EntityKind::Method,
    )?;
    let children = listed_subclasses(index, &parent, subclasses)?;
    check_users(index, &member, &[RefKind::CallBy], &children)?;

    let (path, text) = declaring_source(index, files, &parent)?;
    let parse = parse_java(text);
    let model = build_model(text, &parse);
    let decl = model
        .class(class)
        .and_then(|c| {
            c.methods
                .values()
                .filter(|m| m.name == method && !m.is_constructor)
                .min_by_key(|m| m.location.declaration.start)
        })
        .ok_or_else(|| IndexRefactorError::DeclarationNotFound {
            file: path.to_path_buf(),
            name: member.long_name.clone(),
        })?;

    let span = decl.location.declaration;
    let pasted = match (parse.tokens.get(span.start), parse.tokens.get(span.end)) {
        (Some(first), Some(last)) => {
            text[first.range.start as usize..last.range.end as usize].to_string()
        }
        _ => {
            return Err(IndexRefactorError::DeclarationNotFound {
                file: path.to_path_buf(),
                name: member.long_name,
            })
        }
    };
    plan(
        index,
        files,
        path,
        &model.imports,
        &children,
        Moved::Method(decl, &pasted),
    )
}

/// The member being pushed down, with the text pasted into each subclass.
#[derive(Clone, Copy)]
enum Moved<'a> {
    Field(&'a Field, &'a str),
    Method(&'a Method, &'a str),
}

impl Moved<'_> {
    fn cut(&self, buffer: &mut RewriteBuffer<'_>) -> Result<(), RewriteError> {
        match self {
            Moved::Field(field, _) => delete_field(buffer, field),
            Moved::Method(method, _) => {
                let span = method.location.declaration;
                let start = leading_trivia_start(buffer, span.start);
                buffer.delete(start, span.end)
            }
        }
    }

    fn paste(
        &self,
        buffer: &mut RewriteBuffer<'_>,
        body: &ClassBodyLocation,
    ) -> Result<(), RewriteError> {
        match self {
            Moved::Field(_, text) if !is_empty_body(buffer, body) => {
                prepend_member(buffer, body, text)
            }
            Moved::Field(_, text) | Moved::Method(_, text) => {
                append_members(buffer, body, &[text.to_string()])
            }
        }
    }
}

fn qualified(package: &str, class: &str) -> String {
    if package.is_empty() {
        class.to_string()
    } else {
        format!("{package}.{class}")
    }
}

/// Direct subclasses of `parent`, all of which must be named in `targets`.
fn listed_subclasses(
    index: &(impl SemanticIndex + ?Sized),
    parent: &Entity,
    targets: &[&str],
) -> Result<Vec<Entity>, IndexRefactorError> {
    let mut children = Vec::new();
    for reference in index.references(parent, &[RefKind::ExtendBy]) {
        let Some(child) = index.entity(reference.entity) else {
            continue;
        };
        if !targets.contains(&child.simple_name.as_str()) {
            return Err(IndexRefactorError::UnlistedSubclass {
                class: parent.long_name.clone(),
                subclass: child.long_name,
            });
        }
        children.push(child);
    }
    if children.is_empty() {
        return Err(IndexRefactorError::NoSubclasses {
            class: parent.long_name.clone(),
        });
    }
    Ok(children)
}

fn check_users(
    index: &(impl SemanticIndex + ?Sized),
    member: &Entity,
    kinds: &[RefKind],
    children: &[Entity],
) -> Result<(), IndexRefactorError> {
    for reference in index.references(member, kinds) {
        let user = index
            .entity(reference.entity)
            .map(|e| e.long_name)
            .unwrap_or_default();
        if !children.iter().any(|child| is_within(&user, &child.long_name)) {
            return Err(IndexRefactorError::UsedOutsideSubclasses {
                member: member.long_name.clone(),
                user,
            });
        }
    }
    Ok(())
}

fn field_declaration(field: &Field) -> String {
    let mut parts = field.modifiers.clone();
    parts.push(field.ty.clone());
    format!("{} {};", parts.join(" "), field.declarator_text)
}

fn import_line(import: &Import) -> String {
    format!(
        "import {}{}{};",
        if import.is_static { "static " } else { "" },
        import.path,
        if import.is_wildcard { ".*" } else { "" }
    )
}

/// Cut `moved` from the parent file and paste it into every child, one buffer per touched file.
fn plan(
    index: &(impl SemanticIndex + ?Sized),
    files: &BTreeMap<PathBuf, String>,
    parent_path: &Path,
    parent_imports: &[Import],
    children: &[Entity],
    moved: Moved<'_>,
) -> Result<Vec<SingleFileEdit>, IndexRefactorError> {
    let mut by_file: BTreeMap<&Path, (&str, Vec<&Entity>)> = BTreeMap::new();
    for child in children {
        let (path, text) = declaring_source(index, files, child)?;
        by_file.entry(path).or_insert((text, Vec::new())).1.push(child);
    }
    if let Some((path, text)) = files.get_key_value(parent_path) {
        by_file.entry(path.as_path()).or_insert((text.as_str(), Vec::new()));
    }

    let mut edits = Vec::new();
    for (path, (text, targets)) in by_file {
        let rewrite_err = |source| IndexRefactorError::Rewrite {
            file: path.to_path_buf(),
            source,
        };
        let parse = parse_java(text);
        let model = build_model(text, &parse);
        let mut buffer = RewriteBuffer::new(text, &parse.tokens);

        if path == parent_path {
            moved.cut(&mut buffer).map_err(rewrite_err)?;
        }
        for child in &targets {
            let body = model
                .class(&child.simple_name)
                .and_then(|c| c.body.as_ref())
                .ok_or_else(|| IndexRefactorError::DeclarationNotFound {
                    file: path.to_path_buf(),
                    name: child.long_name.clone(),
                })?;
            moved.paste(&mut buffer, body).map_err(rewrite_err)?;
        }
        if path != parent_path {
            for import in parent_imports {
                if !model.imports.contains(import) {
                    insert_import(&mut buffer, &model.anchors, &import_line(import))
                        .map_err(rewrite_err)?;
                }
            }
        }

        tracing::info!(
            target: "codart.refactor",
            path = %path.display(),
            subclasses = targets.len(),
            "pushed member down"
        );
        edits.push(SingleFileEdit {
            path: path.to_path_buf(),
            text: buffer.render(),
        });
    }
    Ok(edits)
}
