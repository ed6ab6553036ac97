//! Small refactorings that edit one declaration in one file, checked against a
//! [`SemanticIndex`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use codart_syntax::{
    parse_java, AstNode, ClassDeclaration, FieldDeclaration, JavaParseResult, MethodDeclaration,
    Modifiers, SyntaxKind, SyntaxNode,
};
use thiserror::Error;

use crate::index::{Entity, EntityKind, RefKind, SemanticIndex};
use crate::rewrite::{RewriteBuffer, RewriteError};

#[derive(Debug, Error)]
pub enum IndexRefactorError {
    #[error("no {kind:?} entity named '{name}' in the index")]
    EntityNotFound { name: String, kind: EntityKind },
    #[error("field '{field}' is not public")]
    NotPublic { field: String },
    #[error("field '{field}' is used outside '{class}' by '{user}'")]
    UsedOutsideClass {
        field: String,
        class: String,
        user: String,
    },
    #[error("no source file for '{name}' in the project")]
    FileNotIndexed { name: String },
    #[error("declaration of '{name}' not found in {}", .file.display())]
    DeclarationNotFound { file: PathBuf, name: String },
    #[error("'{class}' has no subclasses to push members into")]
    NoSubclasses { class: String },
    #[error("subclass '{subclass}' of '{class}' is not among the push-down targets")]
    UnlistedSubclass { class: String, subclass: String },
    #[error("'{member}' is used outside the target subclasses by '{user}'")]
    UsedOutsideSubclasses { member: String, user: String },
    #[error("failed to rewrite {}: {source}", .file.display())]
    Rewrite {
        file: PathBuf,
        #[source]
        source: RewriteError,
    },
}

/// New contents for a file a refactoring touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleFileEdit {
    pub path: PathBuf,
    pub text: String,
}

/// Turn a public field into a private one when nothing outside its class reads or writes it.
///
/// Returns `Ok(None)` when the declaration has no `public` keyword to replace.
pub fn decrease_field_visibility(
    index: &(impl SemanticIndex + ?Sized),
    files: &BTreeMap<PathBuf, String>,
    package: &str,
    class: &str,
    field: &str,
) -> Result<Option<SingleFileEdit>, IndexRefactorError> {
    let class_name = if package.is_empty() {
        class.to_string()
    } else {
        format!("{package}.{class}")
    };
    let long_name = format!("{class_name}.{field}");
    let entity = lookup_one(index, &long_name, EntityKind::Variable)?;
    if entity.simple_name != field {
        return Err(IndexRefactorError::EntityNotFound {
            name: long_name,
            kind: EntityKind::Variable,
        });
    }
    if !entity.is_public() {
        return Err(IndexRefactorError::NotPublic { field: long_name });
    }

    for reference in index.references(&entity, &[RefKind::UseBy, RefKind::SetBy]) {
        let user = index
            .entity(reference.entity)
            .map(|e| e.long_name)
            .unwrap_or_default();
        if !is_within(&user, &class_name) {
            return Err(IndexRefactorError::UsedOutsideClass {
                field: long_name,
                class: class_name,
                user,
            });
        }
    }

    let (path, text) = declaring_source(index, files, &entity)?;
    let parse = parse_java(text);
    let modifiers = field_modifiers(&parse, path, class, field)?;
    edit_modifier(path, text, &parse, modifiers, SyntaxKind::PublicKw, Some("private"))
}

/// Drop `static` from a field declaration. `class` is the dotted class name.
pub fn make_field_non_static(
    index: &(impl SemanticIndex + ?Sized),
    files: &BTreeMap<PathBuf, String>,
    class: &str,
    field: &str,
) -> Result<Option<SingleFileEdit>, IndexRefactorError> {
    let entity = lookup_one(index, class, EntityKind::Class)?;
    let (path, text) = declaring_source(index, files, &entity)?;
    let parse = parse_java(text);
    let modifiers = field_modifiers(&parse, path, &entity.simple_name, field)?;
    edit_modifier(path, text, &parse, modifiers, SyntaxKind::StaticKw, None)
}

/// Drop `final` from a class declaration. `class` is the dotted class name.
pub fn make_class_non_final(
    index: &(impl SemanticIndex + ?Sized),
    files: &BTreeMap<PathBuf, String>,
    class: &str,
) -> Result<Option<SingleFileEdit>, IndexRefactorError> {
    let entity = lookup_one(index, class, EntityKind::Class)?;
    let (path, text) = declaring_source(index, files, &entity)?;
    let parse = parse_java(text);
    let decl = find_class(&parse.syntax(), &entity.simple_name).ok_or_else(|| {
        IndexRefactorError::DeclarationNotFound {
            file: path.to_path_buf(),
            name: entity.long_name.clone(),
        }
    })?;
    edit_modifier(path, text, &parse, decl.modifiers(), SyntaxKind::FinalKw, None)
}

/// Add `static` to the first method named `method` in `class` (a dotted class name).
///
/// `static` goes after the access modifier, before the first other modifier, or before the type
/// parameters and return type when there are no keyword modifiers. Returns `Ok(None)` when the
/// method is already static.
pub fn make_method_static(
    index: &(impl SemanticIndex + ?Sized),
    files: &BTreeMap<PathBuf, String>,
    class: &str,
    method: &str,
) -> Result<Option<SingleFileEdit>, IndexRefactorError> {
    let entity = lookup_one(index, class, EntityKind::Class)?;
    let (path, text) = declaring_source(index, files, &entity)?;
    let parse = parse_java(text);
    let decl = find_class(&parse.syntax(), &entity.simple_name)
        .and_then(|c| c.body())
        .and_then(|body| {
            body.methods()
                .find(|m| m.name_token().is_some_and(|t| t.text() == method))
        })
        .ok_or_else(|| IndexRefactorError::DeclarationNotFound {
            file: path.to_path_buf(),
            name: format!("{}.{method}", entity.long_name),
        })?;

    let modifiers = decl.modifiers();
    if modifiers.as_ref().is_some_and(|m| m.has(SyntaxKind::StaticKw)) {
        tracing::debug!(
            target: "codart.refactor",
            path = %path.display(),
            method,
            "method already static; nothing to do"
        );
        return Ok(None);
    }
    let keywords: Vec<_> = modifiers.iter().flat_map(|m| m.keywords()).collect();
    let access = keywords.iter().find(|t| {
        matches!(
            t.kind(),
            SyntaxKind::PublicKw | SyntaxKind::ProtectedKw | SyntaxKind::PrivateKw
        )
    });

    let mut buffer = RewriteBuffer::new(text, &parse.tokens);
    let result = match (access, keywords.first()) {
        (Some(access), _) => match parse.token_index(access) {
            Some(at) => buffer.insert_after(at, " static"),
            None => return Ok(None),
        },
        (None, Some(first)) => match parse.token_index(first) {
            Some(at) => buffer.insert_before(at, "static "),
            None => return Ok(None),
        },
        (None, None) => match declaration_head(&parse, &decl) {
            Some(at) => buffer.insert_before(at, "static "),
            None => return Ok(None),
        },
    };
    result.map_err(|source| IndexRefactorError::Rewrite {
        file: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        target: "codart.refactor",
        path = %path.display(),
        method,
        "made method static"
    );
    Ok(Some(SingleFileEdit {
        path: path.to_path_buf(),
        text: buffer.render(),
    }))
}

/// First token of a method declaration after its modifiers and annotations.
fn declaration_head(parse: &JavaParseResult, decl: &MethodDeclaration) -> Option<usize> {
    decl.syntax()
        .children_with_tokens()
        .filter(|el| el.kind() != SyntaxKind::Modifiers && !el.kind().is_trivia())
        .find_map(|el| match el.as_node() {
            Some(node) => parse.node_token_span(node).map(|(start, _)| start),
            None => el.as_token().and_then(|token| parse.token_index(token)),
        })
}

pub(crate) fn lookup_one(
    index: &(impl SemanticIndex + ?Sized),
    name: &str,
    kind: EntityKind,
) -> Result<Entity, IndexRefactorError> {
    index
        .lookup(name, kind)
        .into_iter()
        .next()
        .ok_or_else(|| IndexRefactorError::EntityNotFound {
            name: name.to_string(),
            kind,
        })
}

pub(crate) fn declaring_source<'f>(
    index: &(impl SemanticIndex + ?Sized),
    files: &'f BTreeMap<PathBuf, String>,
    entity: &Entity,
) -> Result<(&'f Path, &'f str), IndexRefactorError> {
    index
        .declaring_file(entity)
        .and_then(|path| files.get_key_value(&path))
        .map(|(path, text)| (path.as_path(), text.as_str()))
        .ok_or_else(|| IndexRefactorError::FileNotIndexed {
            name: entity.long_name.clone(),
        })
}

/// `user` is `class` itself or one of its members.
pub(crate) fn is_within(user: &str, class: &str) -> bool {
    user.strip_prefix(class)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

fn find_class(root: &SyntaxNode, name: &str) -> Option<ClassDeclaration> {
    root.descendants()
        .filter_map(ClassDeclaration::cast)
        .find(|c| c.name_token().is_some_and(|t| t.text() == name))
}

fn field_modifiers(
    parse: &JavaParseResult,
    path: &Path,
    class: &str,
    field: &str,
) -> Result<Option<Modifiers>, IndexRefactorError> {
    find_class(&parse.syntax(), class)
        .and_then(|decl| decl.body())
        .and_then(|body| {
            body.fields().find(|f: &FieldDeclaration| {
                f.declarators()
                    .any(|d| d.name_token().is_some_and(|t| t.text() == field))
            })
        })
        .map(|decl| decl.modifiers())
        .ok_or_else(|| IndexRefactorError::DeclarationNotFound {
            file: path.to_path_buf(),
            name: format!("{class}.{field}"),
        })
}

/// Replace the `kind` modifier with `replacement`, or delete it along with the whitespace after
/// it.
fn edit_modifier(
    path: &Path,
    text: &str,
    parse: &JavaParseResult,
    modifiers: Option<Modifiers>,
    kind: SyntaxKind,
    replacement: Option<&str>,
) -> Result<Option<SingleFileEdit>, IndexRefactorError> {
    let Some(token) = modifiers.and_then(|m| m.keywords().find(|t| t.kind() == kind)) else {
        tracing::debug!(
            target: "codart.refactor",
            path = %path.display(),
            modifier = ?kind,
            "modifier not present; nothing to do"
        );
        return Ok(None);
    };

    let Some(index) = parse.token_index(&token) else {
        return Ok(None);
    };

    let mut buffer = RewriteBuffer::new(text, &parse.tokens);
    let result = match replacement {
        Some(replacement) => buffer.replace(index, index, replacement),
        None => {
            let end = match parse.tokens.get(index + 1) {
                Some(next) if next.kind == SyntaxKind::Whitespace => index + 1,
                _ => index,
            };
            buffer.delete(index, end)
        }
    };
    result.map_err(|source| IndexRefactorError::Rewrite {
        file: path.to_path_buf(),
        source,
    })?;

    tracing::info!(
        target: "codart.refactor",
        path = %path.display(),
        modifier = ?kind,
        replacement = replacement.unwrap_or(""),
        "edited modifier"
    );
    Ok(Some(SingleFileEdit {
        path: path.to_path_buf(),
        text: buffer.render(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InMemoryIndex;
    use pretty_assertions::assert_eq;

    const PATH: &str = "src/p/A.java";
    const SOURCE: &str = "package p;\n\npublic final class A {\n    @Deprecated public static int count, other;\n\n    void bump() { count++; }\n}\n";

    fn files() -> BTreeMap<PathBuf, String> {
        BTreeMap::from([(PathBuf::from(PATH), SOURCE.to_string())])
    }

    /// Index of `p.A` whose `count` field is written by `user`.
    fn sample_index(user: &str) -> InMemoryIndex {
        let mut builder = InMemoryIndex::builder();
        let file = builder.file(PATH);
        let class = builder.entity(EntityKind::Class, "p.A", Some(file), &["public", "final"]);
        let field = builder.entity(
            EntityKind::Variable,
            "p.A.count",
            Some(class),
            &["public", "static"],
        );
        let private = builder.entity(EntityKind::Variable, "p.A.hidden", Some(class), &["private"]);
        let method = builder.entity(EntityKind::Method, user, Some(class), &[]);
        builder
            .reference(field, RefKind::SetBy, method, PATH)
            .reference(private, RefKind::UseBy, method, PATH);
        builder.build()
    }

    #[test]
    fn decreases_visibility_of_a_field_used_only_inside_its_class() {
        let index = sample_index("p.A.bump");
        let edit = decrease_field_visibility(&index, &files(), "p", "A", "count")
            .unwrap()
            .unwrap();
        assert_eq!(edit.path, PathBuf::from(PATH));
        assert_eq!(
            edit.text,
            SOURCE.replace("@Deprecated public static", "@Deprecated private static")
        );
    }

    #[test]
    fn visibility_checks() {
        let outside = sample_index("p.AB.bump");
        let err = decrease_field_visibility(&outside, &files(), "p", "A", "count").unwrap_err();
        assert!(
            matches!(err, IndexRefactorError::UsedOutsideClass { ref user, .. } if user == "p.AB.bump"),
            "{err}"
        );

        let index = sample_index("p.A.bump");
        let err = decrease_field_visibility(&index, &files(), "p", "A", "hidden").unwrap_err();
        assert!(matches!(err, IndexRefactorError::NotPublic { .. }), "{err}");

        let err = decrease_field_visibility(&index, &files(), "p", "A", "missing").unwrap_err();
        assert!(matches!(err, IndexRefactorError::EntityNotFound { .. }), "{err}");

        let err = decrease_field_visibility(&index, &BTreeMap::new(), "p", "A", "count")
            .unwrap_err();
        assert!(matches!(err, IndexRefactorError::FileNotIndexed { .. }), "{err}");
    }

    #[test]
    fn removes_static_from_a_field() {
        let index = sample_index("p.A.bump");
        let edit = make_field_non_static(&index, &files(), "p.A", "other")
            .unwrap()
            .unwrap();
        assert_eq!(
            edit.text,
            SOURCE.replace("public static int", "public int")
        );

        let unchanged = BTreeMap::from([(PathBuf::from(PATH), edit.text)]);
        assert_eq!(
            make_field_non_static(&index, &unchanged, "p.A", "count").unwrap(),
            None
        );

        let err = make_field_non_static(&index, &files(), "p.A", "nope").unwrap_err();
        assert!(matches!(err, IndexRefactorError::DeclarationNotFound { .. }), "{err}");
    }

    #[test]
    fn removes_final_from_a_class() {
        let index = sample_index("p.A.bump");
        let edit = make_class_non_final(&index, &files(), "p.A")
            .unwrap()
            .unwrap();
        assert_eq!(edit.text, SOURCE.replace("public final class", "public class"));

        let err = make_class_non_final(&index, &files(), "p.Missing").unwrap_err();
        assert!(matches!(err, IndexRefactorError::EntityNotFound { .. }), "{err}");
    }

    #[test]
    fn adds_static_to_a_method() {
        const METHODS: &str = "package p;\n\npublic class B {\n    public int one() { return 1; }\n    @Override String two() { return \"\"; }\n    <T> T three(T t) { return t; }\n    final void four() {}\n    void five() {}\n    static void six() {}\n}\n";
        let mut builder = InMemoryIndex::builder();
        let file = builder.file("src/p/B.java");
        builder.entity(EntityKind::Class, "p.B", Some(file), &["public"]);
        let index = builder.build();
        let files = BTreeMap::from([(PathBuf::from("src/p/B.java"), METHODS.to_string())]);

        let cases = [
            ("one", "public int one()", "public static int one()"),
            ("two", "@Override String two()", "@Override static String two()"),
            ("three", "<T> T three(", "static <T> T three("),
            ("four", "final void four()", "static final void four()"),
            ("five", "    void five()", "    static void five()"),
        ];
        for (method, before, after) in cases {
            let edit = make_method_static(&index, &files, "p.B", method)
                .unwrap()
                .unwrap();
            assert_eq!(edit.path, PathBuf::from("src/p/B.java"));
            assert_eq!(edit.text, METHODS.replace(before, after), "{method}");
        }

        assert_eq!(make_method_static(&index, &files, "p.B", "six").unwrap(), None);
        let err = make_method_static(&index, &files, "p.B", "seven").unwrap_err();
        assert!(matches!(err, IndexRefactorError::DeclarationNotFound { .. }), "{err}");
    }

    #[test]
    fn member_prefix_matching() {
        assert!(is_within("p.A", "p.A"));
        assert!(is_within("p.A.run", "p.A"));
        assert!(!is_within("p.AB.run", "p.A"));
    }
}
