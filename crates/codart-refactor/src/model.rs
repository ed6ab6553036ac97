//! Per-file symbol model.
//!
//! Everything here is plain data. Parse-tree locations are recorded as indices into the file's
//! token sequence so edits can be planned without holding on to the tree.

use std::collections::BTreeMap;

/// Inclusive range of token indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }
}

impl From<(usize, usize)> for TokenSpan {
    fn from((start, end): (usize, usize)) -> Self {
        Self::new(start, end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    /// Empty for the default package.
    pub name: String,
    pub classes: BTreeMap<String, Class>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub name: String,
    pub package: String,
    pub fields: BTreeMap<String, Field>,
    /// Methods and constructors keyed by [`Method::key`].
    pub methods: BTreeMap<String, Method>,
    pub is_public: bool,
    pub is_nested: bool,
    pub is_interface: bool,
    pub body: Option<ClassBodyLocation>,
}

impl Class {
    pub fn constructors(&self) -> impl Iterator<Item = &Method> {
        self.methods.values().filter(|m| m.is_constructor)
    }

    /// True when the class can be instantiated with `new C()`.
    pub fn has_no_arg_constructor(&self) -> bool {
        let mut ctors = self.constructors().peekable();
        ctors.peek().is_none() || ctors.any(|c| c.parameters.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassBodyLocation {
    pub l_brace: usize,
    pub r_brace: usize,
    /// Indentation of the first member, if the body has one on its own line.
    pub member_indent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// Declared type as written, e.g. `List<String>`.
    pub ty: String,
    pub modifiers: Vec<String>,
    /// Simple name of the declaring class.
    pub class: String,
    /// Declarator source text, including any initializer (`a = 1`).
    pub declarator_text: String,
    pub location: FieldLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLocation {
    /// The whole field declaration statement.
    pub declaration: TokenSpan,
    pub declarator: TokenSpan,
    /// Index of this declarator among its siblings.
    pub declarator_index: usize,
    pub declarator_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub class: String,
    /// For constructors this is the class name.
    pub return_type: String,
    pub parameters: Vec<(String, String)>,
    pub is_constructor: bool,
    pub is_varargs: bool,
    pub body: Vec<BodyItem>,
    pub location: MethodLocation,
}

impl Method {
    /// Signature key, `name(T1,T2)`.
    pub fn key(&self) -> String {
        method_key(&self.name, self.parameters.iter().map(|(ty, _)| ty.as_str()))
    }

    /// Declared type of the innermost variable named `name` visible at token `at`: a local,
    /// lambda, catch or pattern variable, a member of an enclosing anonymous class, or a
    /// parameter.
    pub fn binding_at(&self, name: &str, at: usize) -> Option<&str> {
        self.body
            .iter()
            .filter_map(|item| match item {
                BodyItem::Local(local) if local.name == name && local.scope.contains(at) => {
                    Some(local)
                }
                _ => None,
            })
            .max_by_key(|local| local.scope.start)
            .map(|local| local.ty.as_str())
            .or_else(|| {
                self.parameters
                    .iter()
                    .find(|(_, param)| param == name)
                    .map(|(ty, _)| ty.as_str())
            })
    }

    /// Whether token `at` sits in the body of an anonymous class, where `this` is not the
    /// enclosing instance.
    pub fn in_anonymous_class(&self, at: usize) -> bool {
        self.body
            .iter()
            .any(|item| matches!(item, BodyItem::AnonymousClass(body) if body.contains(at)))
    }
}

pub(crate) fn method_key<'a>(name: &str, param_types: impl Iterator<Item = &'a str>) -> String {
    let params: Vec<String> = param_types
        .map(|ty| ty.chars().filter(|c| !c.is_whitespace()).collect())
        .collect();
    format!("{name}({})", params.join(","))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodLocation {
    pub declaration: TokenSpan,
    /// `)` closing the formal parameter list.
    pub r_paren: Option<usize>,
    /// First token of a trailing varargs parameter.
    pub varargs_start: Option<usize>,
}

/// Something found while walking a method body, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyItem {
    Local(LocalVariable),
    Name(ExpressionName),
    Invocation(MethodInvocation),
    /// Braces and body of `new T() { .. }`.
    AnonymousClass(TokenSpan),
}

/// A variable declared inside a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub name: String,
    /// Declared type as written; empty for inferred lambda parameters.
    pub ty: String,
    /// Tokens where the name is in scope.
    pub scope: TokenSpan,
}

/// A name or field access used as an expression: `a`, `a.b.c`, `this.a`, `new T().a`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionName {
    /// Dot-separated identifiers; `this` appears as a segment when it is the receiver.
    pub segments: Vec<String>,
    /// Simple type name when the receiver is an instance creation (`new T().a`).
    pub creator: Option<String>,
    /// Token index of each entry in `segments`.
    pub segment_tokens: Vec<usize>,
    /// For `recv.name` forms, the tokens making up `recv`.
    pub receiver: Option<TokenSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInvocation {
    /// Identifier chain ending with the method name: `x.getA()` is `["x", "getA"]`.
    pub chain: Vec<String>,
    pub creator: Option<String>,
    pub receiver: Option<TokenSpan>,
    pub name_token: usize,
}

impl MethodInvocation {
    pub fn name(&self) -> &str {
        self.chain.last().map(String::as_str).unwrap_or_default()
    }

    pub fn receiver_chain(&self) -> &[String] {
        self.chain.split_last().map(|(_, init)| init).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Imported name without a trailing `.*`.
    pub path: String,
    pub is_static: bool,
    pub is_wildcard: bool,
}

impl Import {
    pub fn imports_package(&self, package: &str) -> bool {
        !self.is_static && self.is_wildcard && self.path == package
    }

    pub fn imports_class(&self, package: &str, class: &str) -> bool {
        if self.is_static || self.is_wildcard {
            return false;
        }
        match self.path.rsplit_once('.') {
            Some((pkg, name)) => pkg == package && name == class,
            None => package.is_empty() && self.path == class,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileModel {
    pub package: Package,
    pub imports: Vec<Import>,
    /// First top-level public class.
    pub current_class: Option<String>,
    pub public_class_count: usize,
    pub has_nested_types: bool,
    pub has_interfaces: bool,
    pub parse_error_count: usize,
    pub anchors: ImportAnchors,
}

impl FileModel {
    pub fn class(&self, name: &str) -> Option<&Class> {
        self.package.classes.get(name)
    }

    /// Top-level classes, excluding nested ones and interfaces.
    pub fn top_level_classes(&self) -> impl Iterator<Item = &Class> {
        self.package
            .classes
            .values()
            .filter(|c| !c.is_nested && !c.is_interface)
    }

    pub fn declares(&self, package: &str, class: &str) -> bool {
        self.package.name == package
            && self
                .class(class)
                .is_some_and(|c| !c.is_nested && !c.is_interface)
    }

    /// Whether `package.class` is visible by simple name without a new import.
    pub fn sees(&self, package: &str, class: &str) -> bool {
        self.package.name == package
            || self
                .imports
                .iter()
                .any(|i| i.imports_package(package) || i.imports_class(package, class))
    }

    /// Why the file cannot take part in a refactoring, if anything.
    pub fn unsupported_reason(&self) -> Option<String> {
        if self.parse_error_count > 0 {
            return Some(format!("{} parse error(s)", self.parse_error_count));
        }
        if self.has_nested_types {
            return Some("nested type declaration".to_string());
        }
        if self.has_interfaces {
            return Some("interface declaration".to_string());
        }
        if self.public_class_count > 1 {
            return Some(format!(
                "{} public top-level classes",
                self.public_class_count
            ));
        }
        None
    }
}

/// Where new import declarations can go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportAnchors {
    /// Last token of the last import declaration.
    pub last_import_end: Option<usize>,
    /// Last token of the package declaration.
    pub package_end: Option<usize>,
    /// First token of the first top-level type declaration.
    pub first_type_start: Option<usize>,
}

/// Simple name of a declared type when it is a plain (possibly qualified or parameterized) class
/// type. Arrays yield `None`.
///
/// ```
/// use codart_refactor::simple_type_name;
///
/// assert_eq!(simple_type_name("java.util.List<String>"), Some("List"));
/// assert_eq!(simple_type_name("Source"), Some("Source"));
/// assert_eq!(simple_type_name("Source[]"), None);
/// ```
pub fn simple_type_name(ty: &str) -> Option<&str> {
    let ty = ty.trim();
    let base = ty.split('<').next().unwrap_or(ty).trim();
    let after_generics = ty.rsplit('>').next().unwrap_or_default();
    if base.contains('[') || (ty.contains('<') && after_generics.contains('[')) {
        return None;
    }
    let name = base.rsplit('.').next().unwrap_or(base).trim();
    (!name.is_empty()).then_some(name)
}
