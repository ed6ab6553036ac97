//! Builds a [`FileModel`] from one parsed compilation unit.

use codart_syntax::{
    support, AstNode, CatchClause, ClassBody, ClassDeclaration, CompilationUnit,
    ConstructorDeclaration, FieldAccessExpression, FieldDeclaration, InstanceofExpression,
    InterfaceDeclaration, JavaParseResult, LambdaExpression, LocalVariableDeclarationStatement,
    MethodCallExpression, MethodDeclaration, Modifiers, NameExpression, NewExpression,
    ParameterList, Resource, SyntaxKind, SyntaxNode, SyntaxToken,
};

use crate::model::{
    BodyItem, Class, ClassBodyLocation, ExpressionName, Field, FieldLocation, FileModel, Import,
    ImportAnchors, LocalVariable, Method, MethodInvocation, MethodLocation, Package, TokenSpan,
};

/// Walk the tree of `parse` once and produce its symbol model. `text` is the parsed source.
pub fn build_model(text: &str, parse: &JavaParseResult) -> FileModel {
    let root = parse.syntax();
    let mut model = FileModel {
        parse_error_count: parse.errors.len(),
        ..FileModel::default()
    };
    let Some(unit) = CompilationUnit::cast(root) else {
        return model;
    };

    let package_name = unit
        .package()
        .and_then(|p| p.name())
        .map(|n| n.text())
        .unwrap_or_default();
    model.package = Package {
        name: package_name.clone(),
        classes: Default::default(),
    };

    model.imports = unit
        .imports()
        .filter_map(|import| {
            let name = import.name()?.text();
            let is_wildcard = import.is_wildcard();
            let path = match name.strip_suffix(".*") {
                Some(prefix) if is_wildcard => prefix.to_string(),
                _ => name,
            };
            Some(Import {
                path,
                is_static: import.is_static(),
                is_wildcard,
            })
        })
        .collect();

    model.anchors = ImportAnchors {
        last_import_end: unit
            .imports()
            .last()
            .and_then(|i| parse.node_token_span(i.syntax()))
            .map(|(_, end)| end),
        package_end: unit
            .package()
            .and_then(|p| parse.node_token_span(p.syntax()))
            .map(|(_, end)| end),
        first_type_start: unit
            .type_declarations()
            .next()
            .and_then(|decl| parse.node_token_span(&decl))
            .map(|(start, _)| start),
    };

    let builder = ModelBuilder {
        text,
        parse,
        package: &package_name,
    };

    for decl in unit.type_declarations() {
        if decl
            .descendants()
            .skip(1)
            .any(|n| codart_syntax::is_type_declaration(n.kind()))
        {
            model.has_nested_types = true;
        }

        if let Some(interface) = InterfaceDeclaration::cast(decl.clone()) {
            model.has_interfaces = true;
            if let Some(class) = builder.interface(&interface) {
                model.package.classes.entry(class.name.clone()).or_insert(class);
            }
            continue;
        }

        let Some(class_decl) = ClassDeclaration::cast(decl.clone()) else {
            continue;
        };
        let Some(class) = builder.class(&class_decl, false) else {
            continue;
        };
        if class.is_public {
            model.public_class_count += 1;
            if model.current_class.is_none() {
                model.current_class = Some(class.name.clone());
            }
        }
        model.package.classes.insert(class.name.clone(), class);

        for nested in decl.descendants().skip(1) {
            if nested.kind() == SyntaxKind::InterfaceDeclaration {
                model.has_interfaces = true;
            }
            if let Some(nested) = ClassDeclaration::cast(nested) {
                if let Some(class) = builder.class(&nested, true) {
                    model.package.classes.entry(class.name.clone()).or_insert(class);
                }
            }
        }
    }

    tracing::trace!(
        target: "codart.refactor",
        package = %model.package.name,
        classes = model.package.classes.len(),
        "built file model"
    );
    model
}

struct ModelBuilder<'a> {
    text: &'a str,
    parse: &'a JavaParseResult,
    package: &'a str,
}

impl ModelBuilder<'_> {
    fn index(&self, token: &SyntaxToken) -> Option<usize> {
        self.parse.token_index(token)
    }

    fn span(&self, node: &SyntaxNode) -> Option<TokenSpan> {
        self.parse.node_token_span(node).map(TokenSpan::from)
    }

    fn interface(&self, decl: &InterfaceDeclaration) -> Option<Class> {
        Some(Class {
            name: decl.name_token()?.text().to_string(),
            package: self.package.to_string(),
            fields: Default::default(),
            methods: Default::default(),
            is_public: decl
                .modifiers()
                .is_some_and(|m| m.has(SyntaxKind::PublicKw)),
            is_nested: false,
            is_interface: true,
            body: None,
        })
    }

    fn class(&self, decl: &ClassDeclaration, is_nested: bool) -> Option<Class> {
        let name = decl.name_token()?.text().to_string();
        let mut class = Class {
            name: name.clone(),
            package: self.package.to_string(),
            fields: Default::default(),
            methods: Default::default(),
            is_public: decl
                .modifiers()
                .is_some_and(|m| m.has(SyntaxKind::PublicKw)),
            is_nested,
            is_interface: false,
            body: None,
        };
        let Some(body) = decl.body() else {
            return Some(class);
        };
        class.body = self.body_location(&body);

        for field in body.fields() {
            for f in self.fields(&field, &name) {
                class.fields.entry(f.name.clone()).or_insert(f);
            }
        }
        for method in body.methods() {
            if let Some(m) = self.method(&method, &name) {
                class.methods.insert(m.key(), m);
            }
        }
        for ctor in body.constructors() {
            if let Some(m) = self.constructor(&ctor, &name) {
                class.methods.insert(m.key(), m);
            }
        }
        Some(class)
    }

    fn body_location(&self, body: &ClassBody) -> Option<ClassBodyLocation> {
        let l_brace = self.index(&body.l_brace_token()?)?;
        let r_brace = self.index(&body.r_brace_token()?)?;
        let member_indent = body
            .members()
            .next()
            .and_then(|member| self.span(&member))
            .and_then(|span| span.start.checked_sub(1))
            .and_then(|prev| self.parse.tokens.get(prev))
            .filter(|tok| tok.kind == SyntaxKind::Whitespace)
            .and_then(|tok| {
                let ws = tok.text(self.text);
                ws.rfind('\n').map(|nl| ws[nl + 1..].to_string())
            });
        Some(ClassBodyLocation {
            l_brace,
            r_brace,
            member_indent,
        })
    }

    fn fields(&self, decl: &FieldDeclaration, class: &str) -> Vec<Field> {
        let Some(declaration) = self.span(decl.syntax()) else {
            return Vec::new();
        };
        let ty = decl
            .ty()
            .map(|t| t.syntax().text().to_string().trim().to_string())
            .unwrap_or_default();
        let modifiers = decl.modifiers().map(modifier_texts).unwrap_or_default();
        let declarators: Vec<_> = decl.declarators().collect();
        let declarator_count = declarators.len();

        declarators
            .iter()
            .enumerate()
            .filter_map(|(declarator_index, declarator)| {
                Some(Field {
                    name: declarator.name_token()?.text().to_string(),
                    ty: ty.clone(),
                    modifiers: modifiers.clone(),
                    class: class.to_string(),
                    declarator_text: declarator.syntax().text().to_string().trim().to_string(),
                    location: FieldLocation {
                        declaration,
                        declarator: self.span(declarator.syntax())?,
                        declarator_index,
                        declarator_count,
                    },
                })
            })
            .collect()
    }

    fn method(&self, decl: &MethodDeclaration, class: &str) -> Option<Method> {
        let return_type = match decl.return_type() {
            Some(ty) => ty.text(),
            None => "void".to_string(),
        };
        self.callable(
            decl.syntax(),
            decl.name_token()?,
            decl.parameter_list(),
            decl.body().map(|b| b.syntax().clone()),
            class,
            return_type,
            false,
        )
    }

    fn constructor(&self, decl: &ConstructorDeclaration, class: &str) -> Option<Method> {
        self.callable(
            decl.syntax(),
            decl.name_token()?,
            decl.parameter_list(),
            decl.body().map(|b| b.syntax().clone()),
            class,
            class.to_string(),
            true,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn callable(
        &self,
        node: &SyntaxNode,
        name: SyntaxToken,
        params: Option<ParameterList>,
        body: Option<SyntaxNode>,
        class: &str,
        return_type: String,
        is_constructor: bool,
    ) -> Option<Method> {
        let mut parameters = Vec::new();
        let mut is_varargs = false;
        let mut varargs_start = None;
        if let Some(list) = &params {
            for param in list.parameters() {
                let (Some(ty), Some(param_name)) = (param.ty(), param.name_token()) else {
                    continue;
                };
                let mut ty = ty.text();
                if param.is_varargs() {
                    is_varargs = true;
                    varargs_start = self.span(param.syntax()).map(|span| span.start);
                    ty.push_str("...");
                }
                parameters.push((ty, param_name.text().to_string()));
            }
        }

        Some(Method {
            name: name.text().to_string(),
            class: class.to_string(),
            return_type,
            parameters,
            is_constructor,
            is_varargs,
            body: body.map(|b| self.body_items(&b)).unwrap_or_default(),
            location: MethodLocation {
                declaration: self.span(node)?,
                r_paren: params
                    .and_then(|p| p.r_paren_token())
                    .and_then(|t| self.index(&t)),
                varargs_start,
            },
        })
    }

    fn body_items(&self, body: &SyntaxNode) -> Vec<BodyItem> {
        let mut items = Vec::new();
        for node in body.descendants() {
            match node.kind() {
                SyntaxKind::LocalVariableDeclarationStatement => {
                    let (Some(stmt), Some(scope)) = (
                        LocalVariableDeclarationStatement::cast(node.clone()),
                        self.local_scope(&node, body),
                    ) else {
                        continue;
                    };
                    let ty = stmt.ty().map(|t| t.text()).unwrap_or_default();
                    for declarator in stmt.declarators() {
                        push_local(&mut items, declarator.name_token(), &ty, scope);
                    }
                }
                SyntaxKind::Resource => {
                    let (Some(resource), Some(scope)) =
                        (Resource::cast(node.clone()), self.local_scope(&node, body))
                    else {
                        continue;
                    };
                    let ty = resource.ty().map(|t| t.text()).unwrap_or_default();
                    let name = resource.declarator().and_then(|d| d.name_token());
                    push_local(&mut items, name, &ty, scope);
                }
                SyntaxKind::InstanceofExpression => {
                    let (Some(pattern), Some(scope)) = (
                        InstanceofExpression::cast(node.clone()),
                        self.local_scope(&node, body),
                    ) else {
                        continue;
                    };
                    let ty = pattern.ty().map(|t| t.text()).unwrap_or_default();
                    push_local(&mut items, pattern.binding_token(), &ty, scope);
                }
                SyntaxKind::CatchClause => {
                    let (Some(catch), Some(scope)) =
                        (CatchClause::cast(node.clone()), self.span(&node))
                    else {
                        continue;
                    };
                    // A multi-catch variable is only known by its common supertype.
                    let types: Vec<_> = catch.types().collect();
                    let ty = match types.as_slice() {
                        [ty] => ty.text(),
                        _ => String::new(),
                    };
                    push_local(&mut items, catch.name_token(), &ty, scope);
                }
                SyntaxKind::LambdaExpression => {
                    let (Some(params), Some(scope)) = (
                        LambdaExpression::cast(node.clone()).and_then(|l| l.parameters()),
                        self.span(&node),
                    ) else {
                        continue;
                    };
                    for (ty, name) in params.bindings() {
                        push_local(&mut items, Some(name), &ty, scope);
                    }
                }
                // Members of anonymous classes.
                SyntaxKind::ClassBody => {
                    if let Some(scope) = self.span(&node) {
                        items.push(BodyItem::AnonymousClass(scope));
                    }
                }
                SyntaxKind::FieldDeclaration => {
                    let (Some(decl), Some(scope)) = (
                        FieldDeclaration::cast(node.clone()),
                        node.parent().and_then(|body| self.span(&body)),
                    ) else {
                        continue;
                    };
                    let ty = decl.ty().map(|t| t.text()).unwrap_or_default();
                    for declarator in decl.declarators() {
                        push_local(&mut items, declarator.name_token(), &ty, scope);
                    }
                }
                SyntaxKind::MethodDeclaration => {
                    let (Some(params), Some(scope)) = (
                        MethodDeclaration::cast(node.clone()).and_then(|m| m.parameter_list()),
                        self.span(&node),
                    ) else {
                        continue;
                    };
                    for param in params.parameters() {
                        let ty = param.ty().map(|t| t.text()).unwrap_or_default();
                        push_local(&mut items, param.name_token(), &ty, scope);
                    }
                }
                SyntaxKind::NameExpression if !is_callee(&node) => {
                    if let Some(name) = self.name_expression(&node) {
                        items.push(BodyItem::Name(name));
                    }
                }
                SyntaxKind::FieldAccessExpression if !is_callee(&node) => {
                    if let Some(name) = self.field_access(&node) {
                        items.push(BodyItem::Name(name));
                    }
                }
                SyntaxKind::MethodCallExpression => {
                    if let Some(call) = self.invocation(&node) {
                        items.push(BodyItem::Invocation(call));
                    }
                }
                _ => {}
            }
        }
        items
    }

    /// From `decl` to the end of the block, `for` or `try` statement that encloses it.
    fn local_scope(&self, decl: &SyntaxNode, body: &SyntaxNode) -> Option<TokenSpan> {
        let start = self.span(decl)?.start;
        let enclosing = decl
            .ancestors()
            .skip(1)
            .find(|n| {
                matches!(
                    n.kind(),
                    SyntaxKind::Block
                        | SyntaxKind::SwitchBlock
                        | SyntaxKind::ForStatement
                        | SyntaxKind::TryStatement
                        | SyntaxKind::LambdaExpression
                )
            })
            .unwrap_or_else(|| body.clone());
        let end = self.span(&enclosing)?.end;
        Some(TokenSpan::new(start, end))
    }

    fn name_expression(&self, node: &SyntaxNode) -> Option<ExpressionName> {
        let expr = NameExpression::cast(node.clone())?;
        let mut segments = Vec::new();
        let mut segment_tokens = Vec::new();
        for token in expr.segments() {
            segment_tokens.push(self.index(&token)?);
            segments.push(token.text().to_string());
        }
        (!segments.is_empty()).then_some(ExpressionName {
            segments,
            creator: None,
            segment_tokens,
            receiver: None,
        })
    }

    fn field_access(&self, node: &SyntaxNode) -> Option<ExpressionName> {
        let access = FieldAccessExpression::cast(node.clone())?;
        let receiver = access.receiver()?;
        let name = access.name_token()?;
        let mut qualifier = self.qualifier(&receiver)?;
        qualifier.segments.push(name.text().to_string());
        qualifier.tokens.push(self.index(&name)?);
        Some(ExpressionName {
            segments: qualifier.segments,
            creator: qualifier.creator,
            segment_tokens: qualifier.tokens,
            receiver: Some(self.span(&receiver)?),
        })
    }

    fn invocation(&self, node: &SyntaxNode) -> Option<MethodInvocation> {
        let call = MethodCallExpression::cast(node.clone())?;
        let callee = call.callee()?;
        match callee.kind() {
            SyntaxKind::NameExpression => {
                let name = self.name_expression(&callee)?;
                let receiver = match name.segment_tokens.as_slice() {
                    [first, .., before_last, _] => Some(TokenSpan::new(*first, *before_last)),
                    [first, _] => Some(TokenSpan::new(*first, *first)),
                    _ => None,
                };
                Some(MethodInvocation {
                    name_token: *name.segment_tokens.last()?,
                    chain: name.segments,
                    creator: None,
                    receiver,
                })
            }
            SyntaxKind::FieldAccessExpression => {
                let access = FieldAccessExpression::cast(callee)?;
                let receiver = access.receiver()?;
                let name = access.name_token()?;
                let mut qualifier = self.qualifier(&receiver)?;
                qualifier.segments.push(name.text().to_string());
                Some(MethodInvocation {
                    chain: qualifier.segments,
                    creator: qualifier.creator,
                    receiver: Some(self.span(&receiver)?),
                    name_token: self.index(&name)?,
                })
            }
            // Explicit constructor invocations and anything more complex.
            _ => None,
        }
    }

    /// Flatten a receiver made of names, unqualified `this`, field accesses and `new T(..)`.
    fn qualifier(&self, node: &SyntaxNode) -> Option<Qualifier> {
        match node.kind() {
            SyntaxKind::NameExpression => {
                let name = self.name_expression(node)?;
                Some(Qualifier {
                    segments: name.segments,
                    tokens: name.segment_tokens,
                    creator: None,
                })
            }
            SyntaxKind::ThisExpression => {
                let this = support::token(node, SyntaxKind::ThisKw)?;
                if support::token(node, SyntaxKind::Dot).is_some() {
                    return None;
                }
                Some(Qualifier {
                    segments: vec!["this".to_string()],
                    tokens: vec![self.index(&this)?],
                    creator: None,
                })
            }
            SyntaxKind::FieldAccessExpression => {
                let access = FieldAccessExpression::cast(node.clone())?;
                let mut qualifier = self.qualifier(&access.receiver()?)?;
                let name = access.name_token()?;
                qualifier.segments.push(name.text().to_string());
                qualifier.tokens.push(self.index(&name)?);
                Some(qualifier)
            }
            SyntaxKind::NewExpression => {
                let new = NewExpression::cast(node.clone())?;
                Some(Qualifier {
                    segments: Vec::new(),
                    tokens: Vec::new(),
                    creator: Some(new.ty()?.simple_name()?),
                })
            }
            _ => None,
        }
    }
}

struct Qualifier {
    segments: Vec<String>,
    tokens: Vec<usize>,
    creator: Option<String>,
}

fn push_local(items: &mut Vec<BodyItem>, name: Option<SyntaxToken>, ty: &str, scope: TokenSpan) {
    if let Some(name) = name {
        items.push(BodyItem::Local(LocalVariable {
            name: name.text().to_string(),
            ty: ty.to_string(),
            scope,
        }));
    }
}

/// True for the callee position of a method call (`foo` in `foo()`, `x.foo` in `x.foo()`).
fn is_callee(node: &SyntaxNode) -> bool {
    node.parent()
        .and_then(MethodCallExpression::cast)
        .and_then(|call| call.callee())
        .is_some_and(|callee| &callee == node)
}

fn modifier_texts(modifiers: Modifiers) -> Vec<String> {
    modifiers
        .syntax()
        .children_with_tokens()
        .filter_map(|el| {
            if let Some(node) = el.as_node() {
                return Some(node.text().to_string().trim().to_string());
            }
            let tok = el.into_token()?;
            (!tok.kind().is_trivia()).then(|| tok.text().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use codart_syntax::parse_java;
    use pretty_assertions::assert_eq;

    fn model(text: &str) -> FileModel {
        build_model(text, &parse_java(text))
    }

    const SOURCE: &str = r#"package source;

import target.*;
import java.util.List;

public class Source {
    private int a = 1, b;
    @Deprecated protected static List<String> names;

    public Source() {}

    public int getA() { return a; }

    void useA(Source other, int... rest) {
        Source local = new Source();
        int x = other.a + this.a + local.b;
        new Source().getA();
        System.out.println(this.getA());
        helper().a = 3;
    }
}

class Helper {
    Source src;
}
"#;

    #[test]
    fn package_imports_and_classes() {
        let model = model(SOURCE);
        assert_eq!(model.package.name, "source");
        assert_eq!(model.current_class.as_deref(), Some("Source"));
        assert_eq!(model.public_class_count, 1);
        assert_eq!(model.unsupported_reason(), None);
        assert!(model.imports[0].imports_package("target"));
        assert!(model.imports[1].imports_class("java.util", "List"));
        assert_eq!(
            model.package.classes.keys().collect::<Vec<_>>(),
            vec!["Helper", "Source"]
        );
        assert_eq!(model.class("Helper").unwrap().fields["src"].ty, "Source");
    }

    #[test]
    fn fields_keep_types_modifiers_and_declarators() {
        let model = model(SOURCE);
        let source = model.class("Source").unwrap();

        let a = &source.fields["a"];
        assert_eq!(a.ty, "int");
        assert_eq!(a.modifiers, vec!["private".to_string()]);
        assert_eq!(a.declarator_text, "a = 1");
        assert_eq!(a.location.declarator_index, 0);
        assert_eq!(a.location.declarator_count, 2);
        assert_eq!(source.fields["b"].location.declarator_index, 1);

        let names = &source.fields["names"];
        assert_eq!(names.ty, "List<String>");
        assert_eq!(
            names.modifiers,
            vec![
                "@Deprecated".to_string(),
                "protected".to_string(),
                "static".to_string()
            ]
        );
    }

    #[test]
    fn methods_and_constructors_are_keyed_by_signature() {
        let model = model(SOURCE);
        let source = model.class("Source").unwrap();
        assert_eq!(
            source.methods.keys().collect::<Vec<_>>(),
            vec!["Source()", "getA()", "useA(Source,int...)"]
        );
        assert!(source.methods["Source()"].is_constructor);
        assert!(source.has_no_arg_constructor());
        let use_a = &source.methods["useA(Source,int...)"];
        assert!(use_a.is_varargs);
        assert_eq!(use_a.return_type, "void");
        assert!(use_a.location.r_paren.is_some());
    }

    #[test]
    fn body_items_capture_locals_names_and_calls() {
        let model = model(SOURCE);
        let use_a = &model.class("Source").unwrap().methods["useA(Source,int...)"];

        let locals: Vec<_> = use_a
            .body
            .iter()
            .filter_map(|item| match item {
                BodyItem::Local(l) => Some((l.name.as_str(), l.ty.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(locals, vec![("local", "Source"), ("x", "int")]);

        let names: Vec<_> = use_a
            .body
            .iter()
            .filter_map(|item| match item {
                BodyItem::Name(n) => Some(n.segments.join(".")),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"other.a".to_string()), "{names:?}");
        assert!(names.contains(&"this.a".to_string()), "{names:?}");
        assert!(names.contains(&"local.b".to_string()), "{names:?}");
        assert!(names.contains(&"System.out".to_string()), "{names:?}");
        // Receivers that are not names, `this` or `new T()` are not recorded.
        assert!(!names.iter().any(|n| n.ends_with(".a") && n.starts_with("helper")));

        let calls: Vec<_> = use_a
            .body
            .iter()
            .filter_map(|item| match item {
                BodyItem::Invocation(c) => Some((c.chain.join("."), c.creator.clone())),
                _ => None,
            })
            .collect();
        assert!(calls.contains(&("getA".to_string(), Some("Source".to_string()))));
        assert!(calls.contains(&("this.getA".to_string(), None)));
        assert!(calls.contains(&("System.out.println".to_string(), None)));
        assert!(calls.contains(&("helper".to_string(), None)));
    }

    #[test]
    fn body_variables_carry_their_scope() {
        let text = "class S { void m(int p) { int x = 1; { int y = x; } f(q -> q); try {} catch (E e) {} if (o instanceof String s) {} new L() { int z; void on(int w) {} }; } }";
        let parse = parse_java(text);
        let model = build_model(text, &parse);
        let m = &model.class("S").unwrap().methods["m(int)"];

        let locals: Vec<_> = m
            .body
            .iter()
            .filter_map(|item| match item {
                BodyItem::Local(l) => Some((l.name.as_str(), l.ty.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            locals,
            vec![
                ("x", "int"),
                ("y", "int"),
                ("q", ""),
                ("e", "E"),
                ("s", "String"),
                ("z", "int"),
                ("w", "int"),
            ]
        );

        let index_of = |needle: &str, nth: usize| {
            parse
                .tokens
                .iter()
                .enumerate()
                .filter(|(_, t)| t.text(text) == needle)
                .nth(nth)
                .map(|(i, _)| i)
                .unwrap()
        };
        assert_eq!(m.binding_at("x", index_of("x", 1)), Some("int"));
        assert_eq!(m.binding_at("y", index_of("f", 0)), None);
        assert_eq!(m.binding_at("q", index_of("q", 1)), Some(""));
        assert_eq!(m.binding_at("q", index_of("try", 0)), None);
        assert_eq!(m.binding_at("e", index_of("if", 0)), None);
        assert_eq!(m.binding_at("p", index_of("try", 0)), Some("int"));
        assert!(m.in_anonymous_class(index_of("z", 0)));
        assert!(!m.in_anonymous_class(index_of("try", 0)));
    }

    #[test]
    fn nested_types_interfaces_and_multiple_public_classes() {
        let nested = model("public class A { class B {} }");
        assert!(nested.has_nested_types);
        assert!(nested.class("B").unwrap().is_nested);
        assert_eq!(
            nested.unsupported_reason().as_deref(),
            Some("nested type declaration")
        );

        let interface = model("public interface I { void m(); }");
        assert!(interface.has_interfaces);
        assert!(interface.class("I").unwrap().is_interface);

        let multi = model("public class A {} public class B {}");
        assert_eq!(multi.public_class_count, 2);
        assert_eq!(multi.current_class.as_deref(), Some("A"));
        assert!(multi.unsupported_reason().is_some());
    }

    #[test]
    fn body_location_records_member_indent() {
        let model = model("class T {\n\tint x;\n}\nclass U {}\n");
        let t = model.class("T").unwrap().body.clone().unwrap();
        assert_eq!(t.member_indent.as_deref(), Some("\t"));
        assert!(t.l_brace < t.r_brace);
        assert_eq!(model.class("U").unwrap().body.clone().unwrap().member_indent, None);
    }
}
