use crate::parser::{SyntaxNode, SyntaxToken};
use crate::syntax_kind::SyntaxKind;

pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(syntax: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;
}

pub mod support {
    use crate::ast::AstNode;
    use crate::parser::{SyntaxNode, SyntaxToken};
    use crate::syntax_kind::SyntaxKind;

    pub fn child<N: AstNode>(node: &SyntaxNode) -> Option<N> {
        node.children().find_map(N::cast)
    }

    pub fn children<'a, N: AstNode + 'a>(node: &'a SyntaxNode) -> impl Iterator<Item = N> + 'a {
        node.children().filter_map(N::cast)
    }

    pub fn token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
        node.children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|tok| tok.kind() == kind)
    }

    pub fn last_token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
        node.children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|tok| tok.kind() == kind)
            .last()
    }

    /// Returns an identifier-like token among the node's direct children.
    ///
    /// Contextual keywords (`record`, `var`, ...) are lexed as keywords but can be names, so the
    /// last identifier-like token wins.
    pub fn ident_token(node: &SyntaxNode) -> Option<SyntaxToken> {
        ident_tokens(node).last()
    }

    pub fn ident_tokens(node: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> + '_ {
        node.children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|tok| tok.kind().is_identifier_like())
    }

    /// Source text of `node` with all trivia dropped.
    pub fn text_without_trivia(node: &SyntaxNode) -> String {
        node.descendants_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|tok| !tok.kind().is_trivia())
            .map(|tok| tok.text().to_string())
            .collect()
    }
}

macro_rules! ast_node {
    ($($name:ident),* $(,)?) => {$(
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            syntax: SyntaxNode,
        }

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$name
            }

            fn cast(syntax: SyntaxNode) -> Option<Self> {
                Self::can_cast(syntax.kind()).then_some(Self { syntax })
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.syntax
            }
        }
    )*};
}

ast_node!(
    CompilationUnit,
    PackageDeclaration,
    ImportDeclaration,
    Name,
    Modifiers,
    ClassDeclaration,
    InterfaceDeclaration,
    ClassBody,
    FieldDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    ParameterList,
    Parameter,
    Block,
    LocalVariableDeclarationStatement,
    VariableDeclaratorList,
    VariableDeclarator,
    Type,
    ArgumentList,
    NameExpression,
    ThisExpression,
    FieldAccessExpression,
    MethodCallExpression,
    NewExpression,
    LambdaExpression,
    LambdaParameters,
    CatchClause,
    Resource,
    InstanceofExpression,
);

pub fn is_type_declaration(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::ClassDeclaration
            | SyntaxKind::InterfaceDeclaration
            | SyntaxKind::EnumDeclaration
            | SyntaxKind::RecordDeclaration
    )
}

impl CompilationUnit {
    pub fn package(&self) -> Option<PackageDeclaration> {
        support::child(&self.syntax)
    }

    pub fn imports(&self) -> impl Iterator<Item = ImportDeclaration> + '_ {
        support::children(&self.syntax)
    }

    /// Raw syntax nodes of the top-level type declarations, of any kind.
    pub fn type_declarations(&self) -> impl Iterator<Item = SyntaxNode> + '_ {
        self.syntax()
            .children()
            .filter(|n| is_type_declaration(n.kind()))
    }
}

impl PackageDeclaration {
    pub fn name(&self) -> Option<Name> {
        support::child(&self.syntax)
    }
}

impl ImportDeclaration {
    pub fn name(&self) -> Option<Name> {
        support::child(&self.syntax)
    }

    pub fn is_static(&self) -> bool {
        support::token(self.syntax(), SyntaxKind::StaticKw).is_some()
    }

    pub fn is_wildcard(&self) -> bool {
        self.name()
            .and_then(|name| support::token(name.syntax(), SyntaxKind::Star))
            .is_some()
    }
}

impl Name {
    pub fn text(&self) -> String {
        support::text_without_trivia(self.syntax())
    }
}

impl Modifiers {
    /// Modifier keywords and annotations, in source order, as non-trivia tokens.
    pub fn keywords(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        self.syntax()
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| !t.kind().is_trivia())
    }

    pub fn has(&self, kind: SyntaxKind) -> bool {
        support::token(self.syntax(), kind).is_some()
    }
}

impl ClassDeclaration {
    pub fn modifiers(&self) -> Option<Modifiers> {
        support::child(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }

    pub fn body(&self) -> Option<ClassBody> {
        support::child(&self.syntax)
    }
}

impl InterfaceDeclaration {
    pub fn modifiers(&self) -> Option<Modifiers> {
        support::child(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }
}

impl ClassBody {
    pub fn l_brace_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::LBrace)
    }

    pub fn r_brace_token(&self) -> Option<SyntaxToken> {
        support::last_token(&self.syntax, SyntaxKind::RBrace)
    }

    pub fn members(&self) -> impl Iterator<Item = SyntaxNode> + '_ {
        self.syntax.children()
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldDeclaration> + '_ {
        support::children(&self.syntax)
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodDeclaration> + '_ {
        support::children(&self.syntax)
    }

    pub fn constructors(&self) -> impl Iterator<Item = ConstructorDeclaration> + '_ {
        support::children(&self.syntax)
    }
}

impl FieldDeclaration {
    pub fn modifiers(&self) -> Option<Modifiers> {
        support::child(&self.syntax)
    }

    pub fn ty(&self) -> Option<Type> {
        support::child(&self.syntax)
    }

    pub fn declarator_list(&self) -> Option<VariableDeclaratorList> {
        support::child(&self.syntax)
    }

    pub fn declarators(&self) -> impl Iterator<Item = VariableDeclarator> + '_ {
        self.declarator_list()
            .into_iter()
            .flat_map(|list| list.declarators().collect::<Vec<_>>())
    }
}

impl MethodDeclaration {
    pub fn modifiers(&self) -> Option<Modifiers> {
        support::child(&self.syntax)
    }

    pub fn is_void(&self) -> bool {
        support::token(&self.syntax, SyntaxKind::VoidKw).is_some()
    }

    pub fn return_type(&self) -> Option<Type> {
        if self.is_void() {
            return None;
        }
        support::child(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }

    pub fn parameter_list(&self) -> Option<ParameterList> {
        support::child(&self.syntax)
    }

    pub fn body(&self) -> Option<Block> {
        support::child(&self.syntax)
    }
}

impl ConstructorDeclaration {
    pub fn modifiers(&self) -> Option<Modifiers> {
        support::child(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }

    pub fn parameter_list(&self) -> Option<ParameterList> {
        support::child(&self.syntax)
    }

    pub fn body(&self) -> Option<Block> {
        support::child(&self.syntax)
    }
}

impl ParameterList {
    pub fn parameters(&self) -> impl Iterator<Item = Parameter> + '_ {
        support::children(&self.syntax)
    }

    pub fn l_paren_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::LParen)
    }

    pub fn r_paren_token(&self) -> Option<SyntaxToken> {
        support::last_token(&self.syntax, SyntaxKind::RParen)
    }
}

impl Parameter {
    pub fn ty(&self) -> Option<Type> {
        support::child(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }

    pub fn is_varargs(&self) -> bool {
        support::token(&self.syntax, SyntaxKind::Ellipsis).is_some()
    }
}

impl Block {
    pub fn l_brace_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::LBrace)
    }

    pub fn r_brace_token(&self) -> Option<SyntaxToken> {
        support::last_token(&self.syntax, SyntaxKind::RBrace)
    }
}

impl LocalVariableDeclarationStatement {
    pub fn ty(&self) -> Option<Type> {
        support::child(&self.syntax)
    }

    pub fn declarators(&self) -> impl Iterator<Item = VariableDeclarator> + '_ {
        support::child::<VariableDeclaratorList>(&self.syntax)
            .into_iter()
            .flat_map(|list| list.declarators().collect::<Vec<_>>())
    }
}

impl VariableDeclaratorList {
    pub fn declarators(&self) -> impl Iterator<Item = VariableDeclarator> + '_ {
        support::children(&self.syntax)
    }
}

impl VariableDeclarator {
    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_tokens(&self.syntax).next()
    }
}

impl Type {
    /// The type as written, without trivia (`java.util.List<String>[]`).
    pub fn text(&self) -> String {
        support::text_without_trivia(self.syntax())
    }

    /// Last segment of a named type without type arguments or dims, or the primitive keyword.
    pub fn simple_name(&self) -> Option<String> {
        let inner = self.syntax.children().find(|n| {
            matches!(n.kind(), SyntaxKind::NamedType | SyntaxKind::PrimitiveType)
        })?;
        let tok = match inner.kind() {
            SyntaxKind::NamedType => support::ident_token(&inner)?,
            _ => inner
                .children_with_tokens()
                .filter_map(|it| it.into_token())
                .find(|t| !t.kind().is_trivia())?,
        };
        Some(tok.text().to_string())
    }
}

impl ArgumentList {
    pub fn l_paren_token(&self) -> Option<SyntaxToken> {
        support::token(&self.syntax, SyntaxKind::LParen)
    }

    pub fn r_paren_token(&self) -> Option<SyntaxToken> {
        support::last_token(&self.syntax, SyntaxKind::RParen)
    }

    pub fn arguments(&self) -> impl Iterator<Item = SyntaxNode> + '_ {
        self.syntax.children()
    }
}

impl NameExpression {
    pub fn segments(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        support::ident_tokens(&self.syntax)
    }
}

impl ThisExpression {
    /// `Outer.this` rather than plain `this`.
    pub fn is_qualified(&self) -> bool {
        support::token(&self.syntax, SyntaxKind::Dot).is_some()
    }
}

impl FieldAccessExpression {
    pub fn receiver(&self) -> Option<SyntaxNode> {
        self.syntax.first_child()
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }
}

impl MethodCallExpression {
    /// The expression before the argument list: a `NameExpression` for `foo(..)`, a
    /// `FieldAccessExpression` for `recv.foo(..)`, or `this`/`super` for explicit constructor
    /// calls.
    pub fn callee(&self) -> Option<SyntaxNode> {
        self.syntax
            .children()
            .find(|n| n.kind() != SyntaxKind::ArgumentList)
    }

    pub fn argument_list(&self) -> Option<ArgumentList> {
        support::child(&self.syntax)
    }
}

impl NewExpression {
    pub fn ty(&self) -> Option<Type> {
        support::child(&self.syntax)
    }

    pub fn argument_list(&self) -> Option<ArgumentList> {
        support::child(&self.syntax)
    }

    pub fn class_body(&self) -> Option<ClassBody> {
        support::child(&self.syntax)
    }
}

impl LambdaExpression {
    pub fn parameters(&self) -> Option<LambdaParameters> {
        support::child(&self.syntax)
    }
}

impl LambdaParameters {
    /// Declared parameters as `(type, name)`. The type is empty for inferred parameters.
    pub fn bindings(&self) -> Vec<(String, SyntaxToken)> {
        let mut bindings = Vec::new();
        let mut current: Vec<SyntaxToken> = Vec::new();
        let mut depth = 0usize;
        let tokens = self
            .syntax
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|tok| !tok.kind().is_trivia());
        for tok in tokens {
            match tok.kind() {
                SyntaxKind::LParen | SyntaxKind::RParen => {}
                SyntaxKind::Comma if depth == 0 => {
                    bindings.extend(lambda_binding(std::mem::take(&mut current)));
                }
                kind => {
                    depth = match kind {
                        SyntaxKind::Less => depth + 1,
                        SyntaxKind::Greater => depth.saturating_sub(1),
                        SyntaxKind::RightShift => depth.saturating_sub(2),
                        SyntaxKind::UnsignedRightShift => depth.saturating_sub(3),
                        _ => depth,
                    };
                    current.push(tok);
                }
            }
        }
        bindings.extend(lambda_binding(current));
        bindings
    }
}

/// `final @A List<T> name` becomes `("List<T>", name)`.
fn lambda_binding(tokens: Vec<SyntaxToken>) -> Option<(String, SyntaxToken)> {
    let (name, rest) = tokens.split_last()?;
    if !name.kind().is_identifier_like() {
        return None;
    }
    let mut ty = String::new();
    let mut after_at = false;
    for tok in rest {
        match tok.kind() {
            SyntaxKind::At => after_at = true,
            _ if after_at => after_at = false,
            SyntaxKind::FinalKw => {}
            _ => ty.push_str(tok.text()),
        }
    }
    Some((ty, name.clone()))
}

impl CatchClause {
    /// Caught types; several for a multi-catch.
    pub fn types(&self) -> impl Iterator<Item = Type> + '_ {
        support::children(&self.syntax)
    }

    pub fn name_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }
}

impl Resource {
    /// `None` when the resource is an existing variable rather than a declaration.
    pub fn ty(&self) -> Option<Type> {
        support::child(&self.syntax)
    }

    pub fn declarator(&self) -> Option<VariableDeclarator> {
        support::child(&self.syntax)
    }
}

impl InstanceofExpression {
    pub fn ty(&self) -> Option<Type> {
        support::child(&self.syntax)
    }

    /// The pattern variable in `x instanceof Foo f`.
    pub fn binding_token(&self) -> Option<SyntaxToken> {
        support::ident_token(&self.syntax)
    }
}
