use std::collections::VecDeque;

use rowan::{GreenNode, GreenNodeBuilder};
#[cfg(test)]
use rowan::NodeOrToken;

use crate::lexer::{lex_with_errors, Token};
use crate::syntax_kind::{JavaLanguage, SyntaxKind};
use crate::{ParseError, TextRange};

pub type SyntaxNode = rowan::SyntaxNode<JavaLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<JavaLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<JavaLanguage>;

/// Result of parsing one compilation unit.
///
/// `tokens` is the exact token sequence that ended up in the tree, in source order. It differs
/// from the raw lexer output only where a shift operator was split into `>` tokens to close
/// nested type arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaParseResult {
    pub green: GreenNode,
    pub errors: Vec<ParseError>,
    pub tokens: Vec<Token>,
}

impl JavaParseResult {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    /// Index of `token` in [`JavaParseResult::tokens`].
    pub fn token_index(&self, token: &SyntaxToken) -> Option<usize> {
        let start = u32::from(token.text_range().start());
        let idx = self
            .tokens
            .binary_search_by_key(&start, |t| t.range.start)
            .ok()?;
        (self.tokens[idx].kind == token.kind()).then_some(idx)
    }

    /// Inclusive token index span of `node`, ignoring leading and trailing trivia.
    pub fn node_token_span(&self, node: &SyntaxNode) -> Option<(usize, usize)> {
        let mut significant = node
            .descendants_with_tokens()
            .filter_map(|el| el.into_token())
            .filter(|t| !t.kind().is_trivia());
        let first = significant.next()?;
        let last = significant.last().unwrap_or_else(|| first.clone());
        Some((self.token_index(&first)?, self.token_index(&last)?))
    }
}

pub fn parse_java(input: &str) -> JavaParseResult {
    Parser::new(input).parse()
}

struct Parser<'a> {
    input: &'a str,
    tokens: VecDeque<Token>,
    emitted: Vec<Token>,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let (tokens, lex_errors) = lex_with_errors(input);
        let errors = lex_errors
            .into_iter()
            .map(|err| ParseError {
                message: err.message,
                range: err.range,
            })
            .collect();
        Self {
            input,
            emitted: Vec::with_capacity(tokens.len()),
            tokens: VecDeque::from(tokens),
            builder: GreenNodeBuilder::new(),
            errors,
        }
    }

    fn parse(mut self) -> JavaParseResult {
        self.builder.start_node(SyntaxKind::CompilationUnit.into());
        self.eat_trivia();

        if self.at(SyntaxKind::PackageKw) {
            self.parse_package_decl();
        }

        while self.at(SyntaxKind::ImportKw) {
            self.parse_import_decl();
        }

        while !self.at(SyntaxKind::Eof) {
            if self.at_type_decl_start() {
                self.parse_type_declaration();
            } else {
                self.recover_top_level();
            }
        }

        self.eat_trivia();
        self.builder.finish_node();

        JavaParseResult {
            green: self.builder.finish(),
            errors: self.errors,
            tokens: self.emitted,
        }
    }

    fn parse_package_decl(&mut self) {
        self.builder
            .start_node(SyntaxKind::PackageDeclaration.into());
        self.expect(SyntaxKind::PackageKw, "expected `package`");
        self.parse_name();
        self.expect(SyntaxKind::Semicolon, "expected `;` after package declaration");
        self.builder.finish_node();
    }

    fn parse_import_decl(&mut self) {
        self.builder
            .start_node(SyntaxKind::ImportDeclaration.into());
        self.expect(SyntaxKind::ImportKw, "expected `import`");
        if self.at(SyntaxKind::StaticKw) {
            self.bump();
        }
        self.parse_name();
        self.expect(SyntaxKind::Semicolon, "expected `;` after import declaration");
        self.builder.finish_node();
    }

    fn parse_type_declaration(&mut self) {
        let checkpoint = self.builder.checkpoint();
        self.parse_modifiers();
        self.parse_type_declaration_inner(checkpoint);
    }

    fn parse_type_declaration_inner(&mut self, checkpoint: rowan::Checkpoint) {
        match self.current() {
            SyntaxKind::ClassKw => self.parse_class_decl(checkpoint, SyntaxKind::ClassDeclaration),
            // Annotation types are interfaces as far as the tree is concerned.
            SyntaxKind::InterfaceKw | SyntaxKind::At => {
                self.parse_class_decl(checkpoint, SyntaxKind::InterfaceDeclaration)
            }
            SyntaxKind::EnumKw => self.parse_enum_decl(checkpoint),
            SyntaxKind::RecordKw => self.parse_record_decl(checkpoint),
            SyntaxKind::Semicolon => self.bump(),
            _ => {
                self.builder.start_node_at(checkpoint, SyntaxKind::Error.into());
                self.error_here("expected type declaration");
                self.recover_to(TOP_LEVEL_RECOVERY);
                self.builder.finish_node();
            }
        }
    }

    /// `class`, `interface` or `@interface` declarations after their modifiers.
    fn parse_class_decl(&mut self, checkpoint: rowan::Checkpoint, decl_kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, decl_kind.into());
        if self.at(SyntaxKind::At) {
            self.bump();
        }
        self.bump();
        self.expect_ident_like("expected name");
        if self.at(SyntaxKind::Less) {
            self.parse_type_parameters();
        }
        while matches!(
            self.current(),
            SyntaxKind::ExtendsKw | SyntaxKind::ImplementsKw | SyntaxKind::PermitsKw
        ) {
            self.parse_type_clause();
        }
        self.parse_class_body();
        self.builder.finish_node();
    }

    /// A keyword followed by a comma-separated type list: `extends`, `implements`, `permits` or
    /// `throws`.
    fn parse_type_clause(&mut self) {
        self.builder.start_node(SyntaxKind::TypeClause.into());
        self.bump();
        self.parse_type();
        while self.at(SyntaxKind::Comma) {
            self.bump();
            self.parse_type();
        }
        self.builder.finish_node();
    }

    fn parse_enum_decl(&mut self, checkpoint: rowan::Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::EnumDeclaration.into());
        self.expect(SyntaxKind::EnumKw, "expected `enum`");
        self.expect_ident_like("expected enum name");
        if self.at(SyntaxKind::ImplementsKw) {
            self.parse_type_clause();
        }

        self.builder.start_node(SyntaxKind::EnumBody.into());
        self.expect(SyntaxKind::LBrace, "expected `{` for enum body");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            if self.at_ident_like() || self.at(SyntaxKind::At) {
                self.builder.start_node(SyntaxKind::EnumConstant.into());
                self.parse_modifiers();
                self.expect_ident_like("expected enum constant name");
                if self.at(SyntaxKind::LParen) {
                    self.parse_argument_list();
                }
                if self.at(SyntaxKind::LBrace) {
                    self.parse_class_body();
                }
                self.builder.finish_node();
                if self.at(SyntaxKind::Comma) {
                    self.bump();
                    continue;
                }
                if self.at(SyntaxKind::Semicolon) {
                    break;
                }
            } else {
                break;
            }
        }
        if self.at(SyntaxKind::Semicolon) {
            self.bump();
            while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
                let before = self.tokens.len();
                self.parse_class_member();
                self.ensure_progress(before);
            }
        }
        self.expect(SyntaxKind::RBrace, "expected `}` to close enum body");
        self.builder.finish_node(); // EnumBody
        self.builder.finish_node(); // EnumDeclaration
    }

    fn parse_record_decl(&mut self, checkpoint: rowan::Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::RecordDeclaration.into());
        self.expect(SyntaxKind::RecordKw, "expected `record`");
        self.expect_ident_like("expected record name");
        if self.at(SyntaxKind::Less) {
            self.parse_type_parameters();
        }
        if self.at(SyntaxKind::LParen) {
            self.parse_parameter_list();
        } else {
            self.error_here("expected record header");
        }
        if self.at(SyntaxKind::ImplementsKw) {
            self.parse_type_clause();
        }
        self.parse_class_body();
        self.builder.finish_node();
    }

    fn parse_class_body(&mut self) {
        self.builder.start_node(SyntaxKind::ClassBody.into());
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            let before = self.tokens.len();
            self.parse_class_member();
            self.ensure_progress(before);
        }
        self.expect(SyntaxKind::RBrace, "expected `}`");
        self.builder.finish_node();
    }

    fn parse_class_member(&mut self) {
        let checkpoint = self.builder.checkpoint();
        self.parse_modifiers();

        if self.at(SyntaxKind::LBrace) {
            self.builder
                .start_node_at(checkpoint, SyntaxKind::InitializerBlock.into());
            self.parse_block();
            self.builder.finish_node();
            return;
        }

        if self.at(SyntaxKind::Semicolon) {
            self.bump();
            return;
        }

        // Nested types.
        if matches!(
            self.current(),
            SyntaxKind::ClassKw | SyntaxKind::InterfaceKw | SyntaxKind::EnumKw
        ) || (self.at(SyntaxKind::RecordKw)
            && self.nth(1).is_some_and(|k| k.is_identifier_like()))
            || (self.at(SyntaxKind::At) && self.nth(1) == Some(SyntaxKind::InterfaceKw))
        {
            self.parse_type_declaration_inner(checkpoint);
            return;
        }

        // Generic methods and constructors: `<T> T foo()`, `<T> Foo(T t)`.
        if self.at(SyntaxKind::Less) {
            self.parse_type_parameters();
        }

        // Constructor: Ident '('
        if self.at_ident_like() && self.nth(1) == Some(SyntaxKind::LParen) {
            self.builder
                .start_node_at(checkpoint, SyntaxKind::ConstructorDeclaration.into());
            self.bump(); // name
            self.parse_parameter_list();
            self.parse_throws_opt();
            self.parse_block();
            self.builder.finish_node();
            return;
        }

        // Compact record constructor: Ident '{'
        if self.at_ident_like() && self.nth(1) == Some(SyntaxKind::LBrace) {
            self.builder
                .start_node_at(checkpoint, SyntaxKind::ConstructorDeclaration.into());
            self.bump();
            self.parse_block();
            self.builder.finish_node();
            return;
        }

        if self.at(SyntaxKind::VoidKw) {
            self.builder
                .start_node_at(checkpoint, SyntaxKind::MethodDeclaration.into());
            self.bump();
            self.expect_ident_like("expected method name");
            self.parse_method_rest();
            self.builder.finish_node();
            return;
        }

        if self.at_type_start() {
            self.parse_type();
            if !self.at_ident_like() {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::Error.into());
                self.error_here("expected member name");
                self.recover_to_class_member_boundary();
                self.builder.finish_node();
                return;
            }

            if self.nth(1) == Some(SyntaxKind::LParen) {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::MethodDeclaration.into());
                self.bump(); // name
                self.parse_method_rest();
                self.builder.finish_node();
            } else {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::FieldDeclaration.into());
                self.parse_variable_declarator_list();
                self.expect(SyntaxKind::Semicolon, "expected `;` after field declaration");
                self.builder.finish_node();
            }
            return;
        }

        self.builder.start_node_at(checkpoint, SyntaxKind::Error.into());
        self.error_here("unexpected token in class body");
        self.recover_to_class_member_boundary();
        self.builder.finish_node();
    }

    /// Everything after a method name: parameters, dims, throws, default value, body.
    fn parse_method_rest(&mut self) {
        self.parse_parameter_list();
        self.eat_dims();
        self.parse_throws_opt();
        if self.at(SyntaxKind::DefaultKw) {
            self.bump();
            self.parse_expression(0);
        }
        if self.at(SyntaxKind::LBrace) {
            self.parse_block();
        } else {
            self.expect(SyntaxKind::Semicolon, "expected `;` or method body");
        }
    }

    fn parse_throws_opt(&mut self) {
        if self.at(SyntaxKind::ThrowsKw) {
            self.parse_type_clause();
        }
    }

    fn parse_type_parameters(&mut self) {
        self.builder.start_node(SyntaxKind::TypeParameters.into());
        self.expect(SyntaxKind::Less, "expected `<`");
        while !self.at_closing_angle() && !self.at(SyntaxKind::Eof) {
            self.builder.start_node(SyntaxKind::TypeParameter.into());
            while self.at(SyntaxKind::At) {
                self.parse_annotation();
            }
            self.expect_ident_like("expected type parameter name");
            if self.at(SyntaxKind::ExtendsKw) {
                self.bump();
                self.parse_type();
                while self.at(SyntaxKind::Amp) {
                    self.bump();
                    self.parse_type();
                }
            }
            self.builder.finish_node();
            if self.at(SyntaxKind::Comma) {
                self.bump();
                continue;
            }
            break;
        }
        self.expect_gt();
        self.builder.finish_node();
    }

    fn parse_modifiers(&mut self) {
        self.builder.start_node(SyntaxKind::Modifiers.into());
        loop {
            self.eat_trivia();
            if self.at(SyntaxKind::At) {
                // `@interface` is an annotation *type* declaration, not an annotation modifier.
                if self.nth(1) == Some(SyntaxKind::InterfaceKw) {
                    break;
                }
                self.parse_annotation();
                continue;
            }
            let kind = self.current();
            // `sealed` doubles as an identifier; only a modifier when more declaration follows.
            if kind == SyntaxKind::SealedKw
                && !self.nth(1).is_some_and(|k| k.is_modifier_keyword() || matches!(k, SyntaxKind::ClassKw | SyntaxKind::InterfaceKw))
            {
                break;
            }
            if kind.is_modifier_keyword() {
                // `default` in a switch is not a modifier; only consume it before a declaration.
                if kind == SyntaxKind::DefaultKw
                    && matches!(self.nth(1), Some(SyntaxKind::Colon | SyntaxKind::Arrow))
                {
                    break;
                }
                self.bump();
            } else {
                break;
            }
        }
        self.builder.finish_node();
    }

    fn parse_annotation(&mut self) {
        self.builder.start_node(SyntaxKind::Annotation.into());
        self.expect(SyntaxKind::At, "expected `@`");
        self.parse_name();
        if self.at(SyntaxKind::LParen) {
            self.parse_argument_list();
        }
        self.builder.finish_node();
    }

    fn parse_name(&mut self) {
        self.builder.start_node(SyntaxKind::Name.into());
        self.expect_ident_like("expected name");
        while self.at(SyntaxKind::Dot)
            && self
                .nth(1)
                .is_some_and(|k| k.is_identifier_like() || k == SyntaxKind::Star)
        {
            self.bump(); // .
            if self.at(SyntaxKind::Star) {
                self.bump();
                break;
            }
            self.expect_ident_like("expected name segment");
        }
        self.builder.finish_node();
    }

    fn parse_parameter_list(&mut self) {
        self.builder.start_node(SyntaxKind::ParameterList.into());
        self.expect(SyntaxKind::LParen, "expected `(`");
        while !self.at(SyntaxKind::RParen) && !self.at(SyntaxKind::Eof) {
            self.builder.start_node(SyntaxKind::Parameter.into());
            self.parse_modifiers();
            if self.at_type_start() {
                self.parse_type();
            } else {
                self.error_here("expected parameter type");
            }
            if self.at(SyntaxKind::Ellipsis) {
                self.bump();
            }
            if self.at(SyntaxKind::ThisKw) {
                // Receiver parameter.
                self.bump();
            } else {
                self.expect_ident_like("expected parameter name");
            }
            self.eat_dims();
            self.builder.finish_node();

            if self.at(SyntaxKind::Comma) {
                self.bump();
                continue;
            }
            if !self.at(SyntaxKind::RParen) {
                self.error_here("expected `,` or `)` in parameter list");
                self.recover_to(&[SyntaxKind::RParen, SyntaxKind::LBrace, SyntaxKind::Semicolon]);
            }
            break;
        }
        self.expect(SyntaxKind::RParen, "expected `)`");
        self.builder.finish_node();
    }

    fn parse_argument_list(&mut self) {
        self.builder.start_node(SyntaxKind::ArgumentList.into());
        self.expect(SyntaxKind::LParen, "expected `(`");
        while !self.at(SyntaxKind::RParen) && !self.at(SyntaxKind::Eof) {
            self.parse_expression(0);
            if self.at(SyntaxKind::Comma) {
                self.bump();
                continue;
            }
            break;
        }
        self.expect(SyntaxKind::RParen, "expected `)`");
        self.builder.finish_node();
    }

    fn parse_block(&mut self) {
        self.builder.start_node(SyntaxKind::Block.into());
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            let before = self.tokens.len();
            self.parse_statement();
            self.ensure_progress(before);
        }
        self.expect(SyntaxKind::RBrace, "expected `}`");
        self.builder.finish_node();
    }

    /// One statement. Declarations and the statements that scope them (`for`, `try`, switch
    /// blocks) get their own kinds; everything else is a plain `Statement` node.
    fn parse_statement(&mut self) {
        self.eat_trivia();
        let checkpoint = self.builder.checkpoint();
        let labelled = self.at_ident_like() && self.nth(1) == Some(SyntaxKind::Colon);
        match self.current() {
            SyntaxKind::LBrace => self.parse_block(),
            SyntaxKind::ForKw => self.parse_for_statement(checkpoint),
            SyntaxKind::TryKw => self.parse_try_statement(checkpoint),
            SyntaxKind::YieldKw if !self.at_yield_statement() => {
                self.parse_expression_statement(checkpoint)
            }
            kind if labelled || is_statement_keyword(kind) => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::Statement.into());
                self.parse_keyword_statement();
                self.builder.finish_node();
            }
            _ if self.at_local_type_decl_start() => {
                self.builder.start_node_at(
                    checkpoint,
                    SyntaxKind::LocalTypeDeclarationStatement.into(),
                );
                self.parse_type_declaration();
                self.builder.finish_node();
            }
            _ if self.at_local_var_decl_start() => {
                self.builder.start_node_at(
                    checkpoint,
                    SyntaxKind::LocalVariableDeclarationStatement.into(),
                );
                self.parse_local_variable_head();
                self.expect(SyntaxKind::Semicolon, "expected `;` after local variable declaration");
                self.builder.finish_node();
            }
            _ => self.parse_expression_statement(checkpoint),
        }
    }

    fn parse_expression_statement(&mut self, checkpoint: rowan::Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::Statement.into());
        self.parse_expression(0);
        self.expect(SyntaxKind::Semicolon, "expected `;` after expression");
        self.builder.finish_node();
    }

    /// A labelled statement, or one led by a keyword from [`is_statement_keyword`].
    fn parse_keyword_statement(&mut self) {
        if self.at_ident_like() && self.nth(1) == Some(SyntaxKind::Colon) {
            self.bump(); // label
            self.bump(); // `:`
            self.parse_statement();
            return;
        }
        let keyword = self.current();
        self.bump();
        match keyword {
            SyntaxKind::IfKw => {
                self.parse_condition();
                self.parse_statement();
                if self.at(SyntaxKind::ElseKw) {
                    self.bump();
                    self.parse_statement();
                }
            }
            SyntaxKind::WhileKw => {
                self.parse_condition();
                self.parse_statement();
            }
            SyntaxKind::DoKw => {
                self.parse_statement();
                self.expect(SyntaxKind::WhileKw, "expected `while` after `do` body");
                self.parse_condition();
                self.expect(SyntaxKind::Semicolon, "expected `;` after do-while");
            }
            SyntaxKind::SynchronizedKw => {
                self.parse_condition();
                self.parse_block();
            }
            SyntaxKind::SwitchKw => self.parse_switch_rest(),
            SyntaxKind::BreakKw | SyntaxKind::ContinueKw => {
                if self.at_ident_like() {
                    self.bump();
                }
                self.expect(SyntaxKind::Semicolon, "expected `;`");
            }
            SyntaxKind::AssertKw => {
                self.parse_expression(0);
                if self.at(SyntaxKind::Colon) {
                    self.bump();
                    self.parse_expression(0);
                }
                self.expect(SyntaxKind::Semicolon, "expected `;` after assert");
            }
            SyntaxKind::ReturnKw | SyntaxKind::ThrowKw | SyntaxKind::YieldKw => {
                if !(keyword == SyntaxKind::ReturnKw && self.at(SyntaxKind::Semicolon)) {
                    self.parse_expression(0);
                }
                self.expect(SyntaxKind::Semicolon, "expected `;`");
            }
            // Empty statement: the `;` is already consumed.
            _ => {}
        }
    }

    /// `( expr )` after `if`, `while` and `synchronized`.
    fn parse_condition(&mut self) {
        self.expect(SyntaxKind::LParen, "expected `(`");
        self.parse_expression(0);
        self.expect(SyntaxKind::RParen, "expected `)`");
    }

    /// Modifiers, type and declarators of a local variable, without the `;`.
    fn parse_local_variable_head(&mut self) {
        self.parse_modifiers();
        self.parse_type();
        self.parse_variable_declarator_list();
    }

    /// `(expr) { ... }` after `switch`, shared by the statement and expression forms.
    fn parse_switch_rest(&mut self) {
        self.parse_condition();

        self.builder.start_node(SyntaxKind::SwitchBlock.into());
        self.expect(SyntaxKind::LBrace, "expected `{` after switch");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            self.eat_trivia();
            if self.at(SyntaxKind::CaseKw) || self.at(SyntaxKind::DefaultKw) {
                let is_arrow = self.parse_switch_label();
                if is_arrow {
                    self.eat_trivia();
                    if self.at(SyntaxKind::LBrace) {
                        self.parse_block();
                    } else if self.at(SyntaxKind::ThrowKw) {
                        self.parse_statement();
                    } else {
                        let checkpoint = self.builder.checkpoint();
                        self.parse_expression_statement(checkpoint);
                    }
                }
            } else {
                let before = self.tokens.len();
                self.parse_statement();
                self.ensure_progress(before);
            }
        }
        self.expect(SyntaxKind::RBrace, "expected `}` after switch block");
        self.builder.finish_node(); // SwitchBlock
    }

    fn parse_switch_label(&mut self) -> bool {
        self.builder.start_node(SyntaxKind::SwitchLabel.into());
        let is_case = self.at(SyntaxKind::CaseKw);
        self.bump(); // case/default
        if is_case {
            if !self.at(SyntaxKind::Colon) && !self.at(SyntaxKind::Arrow) {
                self.parse_case_label_element();
                while self.at(SyntaxKind::Comma) {
                    self.bump();
                    self.parse_case_label_element();
                }
                if self.at(SyntaxKind::WhenKw) {
                    self.bump();
                    self.parse_expression(0);
                }
            } else {
                self.error_here("expected case label expression");
            }
        }

        let is_arrow = if self.at(SyntaxKind::Arrow) {
            self.bump();
            true
        } else {
            self.expect(
                SyntaxKind::Colon,
                "expected `:` or `->` after switch label",
            );
            false
        };

        self.builder.finish_node();
        is_arrow
    }

    fn parse_case_label_element(&mut self) {
        // Arrow is a case separator here, not a lambda.
        self.parse_expression(1);
        // Type pattern binding: `case String s ->`.
        if self.at_ident_like() && !self.at(SyntaxKind::WhenKw) {
            self.bump();
        }
    }

    fn parse_try_statement(&mut self, checkpoint: rowan::Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::TryStatement.into());
        self.expect(SyntaxKind::TryKw, "expected `try`");
        if self.at(SyntaxKind::LParen) {
            self.parse_resources();
        }
        self.parse_block();
        while self.at(SyntaxKind::CatchKw) {
            self.builder.start_node(SyntaxKind::CatchClause.into());
            self.bump();
            self.expect(SyntaxKind::LParen, "expected `(` after catch");
            // Multi-catch: `catch (A | B e)`.
            if self.at(SyntaxKind::FinalKw) || self.at(SyntaxKind::At) {
                self.parse_modifiers();
            }
            if self.at_type_start() {
                self.parse_type();
                while self.at(SyntaxKind::Pipe) {
                    self.bump();
                    self.parse_type();
                }
            }
            self.expect_ident_like("expected catch parameter name");
            self.expect(SyntaxKind::RParen, "expected `)` after catch parameter");
            self.parse_block();
            self.builder.finish_node();
        }
        if self.at(SyntaxKind::FinallyKw) {
            self.bump();
            self.parse_block();
        }
        self.builder.finish_node();
    }

    /// `(res; res)` of a try-with-resources; each resource is a node of its own.
    fn parse_resources(&mut self) {
        self.expect(SyntaxKind::LParen, "expected `(` after try");
        while !self.at(SyntaxKind::RParen) && !self.at(SyntaxKind::Eof) {
            self.builder.start_node(SyntaxKind::Resource.into());
            if self.at_local_var_decl_start() {
                self.parse_modifiers();
                self.parse_type();
                self.parse_variable_declarator();
            } else {
                self.parse_expression(0);
            }
            self.builder.finish_node(); // Resource

            if self.at(SyntaxKind::Semicolon) {
                self.bump();
                continue;
            }
            break;
        }
        self.expect(SyntaxKind::RParen, "expected `)` after resources");
    }

    /// `for (init; cond; update) body` and `for (T x : expr) body`.
    fn parse_for_statement(&mut self, checkpoint: rowan::Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::ForStatement.into());
        self.bump();
        self.expect(SyntaxKind::LParen, "expected `(` after for");
        self.parse_for_header();
        self.expect(SyntaxKind::RParen, "expected `)` after for header");
        self.parse_statement();
        self.builder.finish_node();
    }

    fn parse_for_header(&mut self) {
        if self.at_local_var_decl_start() {
            self.builder.start_node(
                SyntaxKind::LocalVariableDeclarationStatement.into(),
            );
            self.parse_local_variable_head();
            self.builder.finish_node();

            if self.at(SyntaxKind::Colon) {
                // Enhanced for: `for (T x : expr)`.
                self.bump();
                self.parse_expression(0);
                return;
            }

            self.expect(SyntaxKind::Semicolon, "expected `;` in for header");
            if !self.at(SyntaxKind::Semicolon) {
                self.parse_expression(0);
            }
            self.expect(SyntaxKind::Semicolon, "expected `;` in for header");
            self.parse_expression_list_until(SyntaxKind::RParen);
            return;
        }

        self.parse_expression_list_until(SyntaxKind::Semicolon);
        self.expect(SyntaxKind::Semicolon, "expected `;` in for header");
        if !self.at(SyntaxKind::Semicolon) {
            self.parse_expression(0);
        }
        self.expect(SyntaxKind::Semicolon, "expected `;` in for header");
        self.parse_expression_list_until(SyntaxKind::RParen);
    }

    fn parse_expression_list_until(&mut self, end: SyntaxKind) {
        if self.at(end) {
            return;
        }
        self.parse_expression(0);
        while self.at(SyntaxKind::Comma) {
            self.bump();
            self.parse_expression(0);
        }
    }

    fn parse_variable_declarator_list(&mut self) {
        self.builder
            .start_node(SyntaxKind::VariableDeclaratorList.into());
        self.parse_variable_declarator();
        while self.at(SyntaxKind::Comma) {
            self.bump();
            self.parse_variable_declarator();
        }
        self.builder.finish_node();
    }

    fn parse_variable_declarator(&mut self) {
        self.builder
            .start_node(SyntaxKind::VariableDeclarator.into());
        self.expect_ident_like("expected variable name");
        self.eat_dims();
        if self.at(SyntaxKind::Eq) {
            self.bump();
            if self.at(SyntaxKind::Semicolon) || self.at(SyntaxKind::Comma) {
                self.error_here("expected initializer expression");
            } else if self.at(SyntaxKind::LBrace) {
                self.parse_array_initializer();
            } else {
                self.parse_expression(0);
            }
        }
        self.builder.finish_node();
    }

    fn parse_array_initializer(&mut self) {
        self.builder.start_node(SyntaxKind::ArrayInitializer.into());
        self.expect(SyntaxKind::LBrace, "expected `{`");
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            if self.at(SyntaxKind::LBrace) {
                self.parse_array_initializer();
            } else {
                self.parse_expression(0);
            }
            if self.at(SyntaxKind::Comma) {
                self.bump();
                continue;
            }
            break;
        }
        self.expect(SyntaxKind::RBrace, "expected `}` to close array initializer");
        self.builder.finish_node();
    }

    fn eat_dims(&mut self) {
        while self.at(SyntaxKind::LBracket) && self.nth(1) == Some(SyntaxKind::RBracket) {
            self.bump();
            self.bump();
        }
    }

    fn parse_type(&mut self) {
        self.builder.start_node(SyntaxKind::Type.into());
        self.eat_trivia();
        while self.at(SyntaxKind::At) {
            self.parse_annotation();
        }
        if self.at_primitive_type() {
            self.builder.start_node(SyntaxKind::PrimitiveType.into());
            self.bump();
            self.builder.finish_node();
        } else {
            self.builder.start_node(SyntaxKind::NamedType.into());
            self.expect_ident_like("expected type name");
            if self.at(SyntaxKind::Less) {
                self.parse_type_arguments();
            }
            while self.at(SyntaxKind::Dot) && self.nth(1).is_some_and(|k| k.is_identifier_like()) {
                self.bump();
                self.expect_ident_like("expected type name segment");
                if self.at(SyntaxKind::Less) {
                    self.parse_type_arguments();
                }
            }
            self.builder.finish_node();
        }
        self.eat_dims();
        self.builder.finish_node();
    }

    fn parse_type_arguments(&mut self) {
        self.builder.start_node(SyntaxKind::TypeArguments.into());
        self.expect(SyntaxKind::Less, "expected `<`");
        while !self.at_closing_angle() && !self.at(SyntaxKind::Eof) {
            self.builder.start_node(SyntaxKind::TypeArgument.into());
            if self.at(SyntaxKind::Question) {
                self.builder.start_node(SyntaxKind::WildcardType.into());
                self.bump();
                if self.at(SyntaxKind::ExtendsKw) || self.at(SyntaxKind::SuperKw) {
                    self.bump();
                    self.parse_type();
                }
                self.builder.finish_node();
            } else {
                self.parse_type();
            }
            self.builder.finish_node();
            if self.at(SyntaxKind::Comma) {
                self.bump();
                continue;
            }
            break;
        }
        self.expect_gt();
        self.builder.finish_node();
    }

    fn at_closing_angle(&mut self) -> bool {
        matches!(
            self.current(),
            SyntaxKind::Greater
                | SyntaxKind::RightShift
                | SyntaxKind::UnsignedRightShift
                | SyntaxKind::GreaterEq
                | SyntaxKind::RightShiftEq
                | SyntaxKind::UnsignedRightShiftEq
        )
    }

    fn expect_gt(&mut self) {
        self.eat_trivia();
        match self.current() {
            SyntaxKind::Greater => {
                self.bump();
            }
            SyntaxKind::RightShift | SyntaxKind::UnsignedRightShift => {
                self.split_shift_as_greater();
                self.bump();
            }
            _ => {
                self.error_here("expected `>`");
            }
        }
    }

    /// Splits a `>>`/`>>>` token at the front of the queue into single `>` tokens.
    fn split_shift_as_greater(&mut self) {
        let Some(tok) = self.tokens.pop_front() else {
            return;
        };
        let width = match tok.kind {
            SyntaxKind::RightShift => 2,
            SyntaxKind::UnsignedRightShift => 3,
            _ => {
                self.tokens.push_front(tok);
                return;
            }
        };
        for offset in (0..width).rev() {
            let start = tok.range.start + offset;
            self.tokens.push_front(Token {
                kind: SyntaxKind::Greater,
                range: TextRange {
                    start,
                    end: start + 1,
                },
            });
        }
    }

    fn parse_expression(&mut self, min_bp: u8) {
        self.eat_trivia();
        let checkpoint = self.builder.checkpoint();

        // Prefix / primary.
        match self.current() {
            SyntaxKind::IntLiteral
            | SyntaxKind::LongLiteral
            | SyntaxKind::FloatLiteral
            | SyntaxKind::DoubleLiteral
            | SyntaxKind::CharLiteral
            | SyntaxKind::StringLiteral
            | SyntaxKind::TextBlock
            | SyntaxKind::TrueKw
            | SyntaxKind::FalseKw
            | SyntaxKind::NullKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::LiteralExpression.into());
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::ThisKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::ThisExpression.into());
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::SuperKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::SuperExpression.into());
                self.bump();
                self.builder.finish_node();
            }
            SyntaxKind::NewKw => {
                self.bump();
                self.parse_creation_rest(checkpoint);
            }
            SyntaxKind::SwitchKw => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::SwitchExpression.into());
                self.bump();
                self.parse_switch_rest();
                self.builder.finish_node();
            }
            SyntaxKind::LBrace => self.parse_array_initializer(),
            SyntaxKind::Plus
            | SyntaxKind::Minus
            | SyntaxKind::Bang
            | SyntaxKind::Tilde
            | SyntaxKind::PlusPlus
            | SyntaxKind::MinusMinus => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::UnaryExpression.into());
                self.bump();
                self.parse_expression(100);
                self.builder.finish_node();
            }
            kind if is_primitive_type(kind) || kind == SyntaxKind::VoidKw => {
                // `int.class`, `int[].class`, `int[]::new`.
                self.builder.start_node_at(checkpoint, SyntaxKind::Type.into());
                self.builder.start_node(SyntaxKind::PrimitiveType.into());
                self.bump();
                self.builder.finish_node();
                self.eat_dims();
                self.builder.finish_node();
            }
            kind if kind.is_identifier_like() => {
                if self.nth(1) == Some(SyntaxKind::Arrow) && min_bp == 0 {
                    self.parse_lambda_expression(checkpoint);
                } else {
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::NameExpression.into());
                    self.bump();
                    while self.at(SyntaxKind::Dot)
                        && self.nth(1).is_some_and(|k| k.is_identifier_like())
                        && self.nth(2) != Some(SyntaxKind::LParen)
                    {
                        self.bump();
                        self.bump();
                    }
                    self.builder.finish_node();
                }
            }
            SyntaxKind::LParen => {
                if self.is_lambda_paren() {
                    self.parse_lambda_expression(checkpoint);
                } else if self.is_cast_expression() {
                    // Casts are prefix operators whose operator is a parenthesized type.
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::UnaryExpression.into());
                    self.bump();
                    self.parse_type();
                    while self.at(SyntaxKind::Amp) {
                        self.bump();
                        self.parse_type();
                    }
                    self.expect(SyntaxKind::RParen, "expected `)` in cast");
                    self.parse_expression(100);
                    self.builder.finish_node();
                } else {
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::ParenthesizedExpression.into());
                    self.bump();
                    self.parse_expression(0);
                    self.expect(SyntaxKind::RParen, "expected `)`");
                    self.builder.finish_node();
                }
            }
            _ => {
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::Error.into());
                self.error_here("expected expression");
                // Consume one token to ensure progress, but never a closing delimiter.
                if !matches!(
                    self.current(),
                    SyntaxKind::Eof
                        | SyntaxKind::RBrace
                        | SyntaxKind::RParen
                        | SyntaxKind::Semicolon
                ) {
                    self.bump_any();
                }
                self.builder.finish_node();
            }
        }

        loop {
            self.eat_trivia();
            let op = self.current();

            // Postfix: call, member access, array access, method reference, `++`/`--`.
            match op {
                SyntaxKind::LParen => {
                    if min_bp > 120 {
                        break;
                    }
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::MethodCallExpression.into());
                    self.parse_argument_list();
                    self.builder.finish_node();
                    continue;
                }
                SyntaxKind::Dot => {
                    if min_bp > 120 {
                        break;
                    }
                    match self.nth(1) {
                        Some(k) if k.is_identifier_like() => {
                            self.builder
                                .start_node_at(checkpoint, SyntaxKind::FieldAccessExpression.into());
                            self.bump();
                            self.bump();
                            self.builder.finish_node();
                        }
                        Some(SyntaxKind::Less) => {
                            // Explicit type arguments: `recv.<T>method(...)`.
                            self.builder
                                .start_node_at(checkpoint, SyntaxKind::FieldAccessExpression.into());
                            self.bump();
                            self.parse_type_arguments();
                            self.expect_ident_like("expected method name");
                            self.builder.finish_node();
                        }
                        Some(SyntaxKind::ClassKw) => {
                            self.builder
                                .start_node_at(checkpoint, SyntaxKind::LiteralExpression.into());
                            self.bump();
                            self.bump();
                            self.builder.finish_node();
                        }
                        Some(SyntaxKind::ThisKw) => {
                            self.builder
                                .start_node_at(checkpoint, SyntaxKind::ThisExpression.into());
                            self.bump();
                            self.bump();
                            self.builder.finish_node();
                        }
                        Some(SyntaxKind::SuperKw) => {
                            self.builder
                                .start_node_at(checkpoint, SyntaxKind::SuperExpression.into());
                            self.bump();
                            self.bump();
                            self.builder.finish_node();
                        }
                        Some(SyntaxKind::NewKw) => {
                            // Qualified inner class creation: `outer.new Inner()`.
                            self.bump();
                            self.bump();
                            self.parse_creation_rest(checkpoint);
                        }
                        _ => break,
                    }
                    continue;
                }
                SyntaxKind::LBracket => {
                    if min_bp > 120 {
                        break;
                    }
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::ArrayAccessExpression.into());
                    self.bump();
                    if !self.at(SyntaxKind::RBracket) {
                        self.parse_expression(0);
                    }
                    self.expect(SyntaxKind::RBracket, "expected `]`");
                    self.builder.finish_node();
                    continue;
                }
                SyntaxKind::DoubleColon => {
                    if min_bp > 120 {
                        break;
                    }
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::MethodReferenceExpression.into());
                    self.bump();
                    if self.at(SyntaxKind::NewKw) {
                        self.bump();
                    } else {
                        self.expect_ident_like("expected method name after `::`");
                    }
                    self.builder.finish_node();
                    continue;
                }
                SyntaxKind::PlusPlus | SyntaxKind::MinusMinus => {
                    if min_bp > 110 {
                        break;
                    }
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::UnaryExpression.into());
                    self.bump();
                    self.builder.finish_node();
                    continue;
                }
                SyntaxKind::InstanceofKw => {
                    let (l_bp, _) = (50, 51);
                    if l_bp < min_bp {
                        break;
                    }
                    self.builder
                        .start_node_at(checkpoint, SyntaxKind::InstanceofExpression.into());
                    self.bump();
                    if self.at(SyntaxKind::FinalKw) {
                        self.bump();
                    }
                    self.parse_type();
                    // Pattern binding: `x instanceof Foo f`.
                    if self.at_ident_like() {
                        self.bump();
                    }
                    self.builder.finish_node();
                    continue;
                }
                _ => {}
            }

            if let Some((l_bp, r_bp)) = infix_binding_power(op) {
                if l_bp < min_bp {
                    break;
                }
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::BinaryExpression.into());
                self.bump();
                self.parse_expression(r_bp);
                self.builder.finish_node();
                continue;
            }

            // Conditional.
            if op == SyntaxKind::Question {
                let (l_bp, r_bp) = (2, 1);
                if l_bp < min_bp {
                    break;
                }
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::BinaryExpression.into());
                self.bump(); // ?
                self.parse_expression(0);
                self.expect(SyntaxKind::Colon, "expected `:` in conditional expression");
                self.parse_expression(r_bp);
                self.builder.finish_node();
                continue;
            }

            break;
        }
    }

    /// Everything after `new`: class instance creation or array creation.
    fn parse_creation_rest(&mut self, checkpoint: rowan::Checkpoint) {
        self.parse_type();
        if self.at(SyntaxKind::LBracket) || self.at(SyntaxKind::LBrace) {
            self.builder
                .start_node_at(checkpoint, SyntaxKind::ArrayCreationExpression.into());
            while self.at(SyntaxKind::LBracket) {
                self.bump();
                if !self.at(SyntaxKind::RBracket) {
                    self.parse_expression(0);
                }
                self.expect(SyntaxKind::RBracket, "expected `]`");
            }
            if self.at(SyntaxKind::LBrace) {
                self.parse_array_initializer();
            }
            self.builder.finish_node();
            return;
        }

        self.builder
            .start_node_at(checkpoint, SyntaxKind::NewExpression.into());
        if self.at(SyntaxKind::LParen) {
            self.parse_argument_list();
        } else {
            self.error_here("expected `(` after type in `new` expression");
        }
        if self.at(SyntaxKind::LBrace) {
            self.parse_class_body();
        }
        self.builder.finish_node();
    }

    fn parse_lambda_expression(&mut self, checkpoint: rowan::Checkpoint) {
        self.builder
            .start_node_at(checkpoint, SyntaxKind::LambdaExpression.into());
        self.builder.start_node(SyntaxKind::LambdaParameters.into());
        if self.at(SyntaxKind::LParen) {
            self.bump();
            let mut depth = 0usize;
            while !self.at(SyntaxKind::Eof) {
                match self.current() {
                    SyntaxKind::RParen if depth == 0 => break,
                    SyntaxKind::LParen => depth += 1,
                    SyntaxKind::RParen => depth -= 1,
                    _ => {}
                }
                self.bump();
            }
            self.expect(SyntaxKind::RParen, "expected `)` in lambda parameters");
        } else {
            self.expect_ident_like("expected lambda parameter");
        }
        self.builder.finish_node();
        self.expect(SyntaxKind::Arrow, "expected `->` in lambda");
        if self.at(SyntaxKind::LBrace) {
            self.parse_block();
        } else {
            self.parse_expression(0);
        }
        self.builder.finish_node();
    }

    fn is_lambda_paren(&mut self) -> bool {
        if !self.at(SyntaxKind::LParen) {
            return false;
        }
        let start = skip_trivia(&self.tokens, 0);
        let close = skip_balanced_parens(&self.tokens, start);
        let next = skip_trivia(&self.tokens, close);
        self.tokens.get(next).map(|t| t.kind) == Some(SyntaxKind::Arrow)
    }

    fn is_cast_expression(&mut self) -> bool {
        // `(Type) expr`: the parenthesized tokens must look like a type and be followed by
        // something that can start an operand. Reference-type casts never precede `+`/`-`.
        if !self.at(SyntaxKind::LParen) {
            return false;
        }
        let mut i = skip_trivia(&self.tokens, 0) + 1;
        let mut inner = Vec::new();
        loop {
            i = skip_trivia(&self.tokens, i);
            let Some(tok) = self.tokens.get(i) else {
                return false;
            };
            match tok.kind {
                SyntaxKind::RParen => break,
                kind if kind.is_identifier_like() || is_primitive_type(kind) => {}
                SyntaxKind::Dot
                | SyntaxKind::Less
                | SyntaxKind::Greater
                | SyntaxKind::RightShift
                | SyntaxKind::UnsignedRightShift
                | SyntaxKind::Question
                | SyntaxKind::ExtendsKw
                | SyntaxKind::SuperKw
                | SyntaxKind::LBracket
                | SyntaxKind::RBracket
                | SyntaxKind::Comma
                | SyntaxKind::Amp
                | SyntaxKind::At => {}
                _ => return false,
            }
            inner.push(tok.kind);
            i += 1;
        }
        let Some(&first) = inner.first() else {
            return false;
        };
        if !(first.is_identifier_like() || is_primitive_type(first) || first == SyntaxKind::At) {
            return false;
        }
        if inner.last() == Some(&SyntaxKind::Dot) {
            return false;
        }
        let next = skip_trivia(&self.tokens, i + 1);
        let Some(next_kind) = self.tokens.get(next).map(|t| t.kind) else {
            return false;
        };
        if inner.len() == 1 && is_primitive_type(first) {
            return can_start_expression(next_kind);
        }
        can_start_expression(next_kind)
            && !matches!(
                next_kind,
                SyntaxKind::Plus | SyntaxKind::Minus | SyntaxKind::PlusPlus | SyntaxKind::MinusMinus
            )
    }

    fn at_yield_statement(&mut self) -> bool {
        !matches!(
            self.nth(1),
            None | Some(
                SyntaxKind::Eq
                    | SyntaxKind::Dot
                    | SyntaxKind::LBracket
                    | SyntaxKind::Semicolon
                    | SyntaxKind::PlusEq
                    | SyntaxKind::MinusEq
                    | SyntaxKind::Arrow
            )
        )
    }

    fn at_local_type_decl_start(&mut self) -> bool {
        let mut n = 0;
        loop {
            match self.nth(n) {
                Some(SyntaxKind::FinalKw | SyntaxKind::AbstractKw | SyntaxKind::StaticKw | SyntaxKind::StrictfpKw) => {
                    n += 1;
                }
                Some(SyntaxKind::ClassKw | SyntaxKind::InterfaceKw | SyntaxKind::EnumKw) => {
                    return true;
                }
                Some(SyntaxKind::RecordKw) => {
                    return self.nth(n + 1).is_some_and(|k| k.is_identifier_like())
                        && matches!(self.nth(n + 2), Some(SyntaxKind::LParen | SyntaxKind::Less));
                }
                _ => return false,
            }
        }
    }

    fn at_local_var_decl_start(&mut self) -> bool {
        let mut i = skip_trivia(&self.tokens, 0);

        // Local variable modifiers: `final` + annotations.
        loop {
            match self.tokens.get(i).map(|t| t.kind) {
                Some(SyntaxKind::FinalKw) => {
                    i = skip_trivia(&self.tokens, i + 1);
                }
                Some(SyntaxKind::At) => {
                    i = skip_trivia(&self.tokens, i + 1);
                    if self.tokens.get(i).is_some_and(|t| t.kind.is_identifier_like()) {
                        i = skip_qualified_name(&self.tokens, i + 1);
                    }
                    i = skip_trivia(&self.tokens, i);
                    if self.tokens.get(i).map(|t| t.kind) == Some(SyntaxKind::LParen) {
                        i = skip_balanced_parens(&self.tokens, i);
                    }
                    i = skip_trivia(&self.tokens, i);
                }
                _ => break,
            }
        }

        // Parse a probable type, then require an identifier-like declarator name.
        let Some(first) = self.tokens.get(i).map(|t| t.kind) else {
            return false;
        };

        if first == SyntaxKind::VarKw {
            let j = skip_trivia(&self.tokens, i + 1);
            return self.tokens.get(j).is_some_and(|t| t.kind.is_identifier_like());
        }

        if is_primitive_type(first) {
            i += 1;
        } else if first.is_identifier_like() {
            i = skip_qualified_name(&self.tokens, i + 1);
            i = skip_trivia(&self.tokens, i);
            if self.tokens.get(i).map(|t| t.kind) == Some(SyntaxKind::Less) {
                i = skip_type_arguments(&self.tokens, i);
                // `Outer<T>.Inner`
                i = skip_qualified_name(&self.tokens, i);
            }
        } else {
            return false;
        }

        // Array dims: `[]`*
        loop {
            let j = skip_trivia(&self.tokens, i);
            if self.tokens.get(j).map(|t| t.kind) != Some(SyntaxKind::LBracket) {
                i = j;
                break;
            }
            let after_l = skip_trivia(&self.tokens, j + 1);
            if self.tokens.get(after_l).map(|t| t.kind) != Some(SyntaxKind::RBracket) {
                i = j;
                break;
            }
            i = after_l + 1;
        }

        i = skip_trivia(&self.tokens, i);
        self.tokens.get(i).is_some_and(|t| t.kind.is_identifier_like())
    }

    fn recover_top_level(&mut self) {
        self.builder.start_node(SyntaxKind::Error.into());
        self.error_here("unexpected token at top level");
        // Always make progress.
        self.bump_any();
        self.recover_to(TOP_LEVEL_RECOVERY);
        self.builder.finish_node();
    }

    fn recover_to_class_member_boundary(&mut self) {
        self.recover_to(&[
            SyntaxKind::Semicolon,
            SyntaxKind::RBrace,
            SyntaxKind::ClassKw,
            SyntaxKind::InterfaceKw,
            SyntaxKind::EnumKw,
            SyntaxKind::PublicKw,
            SyntaxKind::PrivateKw,
            SyntaxKind::ProtectedKw,
            SyntaxKind::StaticKw,
            SyntaxKind::FinalKw,
            SyntaxKind::AbstractKw,
            SyntaxKind::At,
        ]);
        // If we stopped at `;`, consume it to avoid loops.
        if self.at(SyntaxKind::Semicolon) {
            self.bump();
        }
    }

    /// Wraps one token in an error node when a list element consumed nothing.
    fn ensure_progress(&mut self, before: usize) {
        if self.tokens.len() != before || self.at(SyntaxKind::Eof) || self.at(SyntaxKind::RBrace) {
            return;
        }
        self.builder.start_node(SyntaxKind::Error.into());
        self.bump();
        self.builder.finish_node();
    }

    fn recover_to(&mut self, recovery: &[SyntaxKind]) {
        while !self.at(SyntaxKind::Eof) {
            if recovery.contains(&self.current()) {
                break;
            }
            self.bump_any();
        }
    }

    fn at_type_decl_start(&mut self) -> bool {
        let kind = self.current();
        kind.is_modifier_keyword()
            || matches!(
                kind,
                SyntaxKind::ClassKw
                    | SyntaxKind::InterfaceKw
                    | SyntaxKind::EnumKw
                    | SyntaxKind::RecordKw
                    | SyntaxKind::At
                    | SyntaxKind::Semicolon
            )
    }

    fn at_type_start(&mut self) -> bool {
        self.at_primitive_type() || self.at_ident_like() || self.at(SyntaxKind::At)
    }

    fn at_primitive_type(&mut self) -> bool {
        is_primitive_type(self.current())
    }

    fn current(&mut self) -> SyntaxKind {
        self.eat_trivia();
        self.tokens.front().map_or(SyntaxKind::Eof, |t| t.kind)
    }

    fn nth(&mut self, n: usize) -> Option<SyntaxKind> {
        self.tokens
            .iter()
            .filter(|tok| !tok.kind.is_trivia())
            .nth(n)
            .map(|tok| tok.kind)
    }

    fn at(&mut self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    fn at_ident_like(&mut self) -> bool {
        self.current().is_identifier_like()
    }

    fn eat_trivia(&mut self) {
        while self.tokens.front().is_some_and(|t| t.kind.is_trivia()) {
            self.bump_any();
        }
    }

    fn bump(&mut self) {
        self.eat_trivia();
        self.bump_any();
    }

    fn bump_any(&mut self) {
        if let Some(tok) = self.tokens.pop_front() {
            let text = tok.text(self.input);
            self.builder.token(tok.kind.into(), text);
            self.emitted.push(tok);
        }
    }

    fn expect(&mut self, kind: SyntaxKind, message: &str) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            self.error_here(message);
            false
        }
    }

    fn expect_ident_like(&mut self, message: &str) {
        if self.at_ident_like() {
            self.bump();
        } else {
            self.error_here(message);
        }
    }

    fn error_here(&mut self, message: &str) {
        let range = self.current_range();
        self.errors.push(ParseError {
            message: message.to_string(),
            range,
        });
    }

    fn current_range(&mut self) -> TextRange {
        self.eat_trivia();
        self.tokens.front().map(|t| t.range).unwrap_or_else(|| {
            let end = self.input.len() as u32;
            TextRange { start: end, end }
        })
    }
}

const TOP_LEVEL_RECOVERY: &[SyntaxKind] = &[
    SyntaxKind::PackageKw,
    SyntaxKind::ImportKw,
    SyntaxKind::ClassKw,
    SyntaxKind::InterfaceKw,
    SyntaxKind::EnumKw,
    SyntaxKind::PublicKw,
    SyntaxKind::Eof,
];

fn skip_trivia(tokens: &VecDeque<Token>, mut idx: usize) -> usize {
    while tokens.get(idx).is_some_and(|t| t.kind.is_trivia()) {
        idx += 1;
    }
    idx
}

/// Skips `(.ident)*` starting right after an identifier.
fn skip_qualified_name(tokens: &VecDeque<Token>, mut idx: usize) -> usize {
    loop {
        let dot = skip_trivia(tokens, idx);
        if tokens.get(dot).map(|t| t.kind) != Some(SyntaxKind::Dot) {
            return idx;
        }
        let seg = skip_trivia(tokens, dot + 1);
        if !tokens.get(seg).is_some_and(|t| t.kind.is_identifier_like()) {
            return idx;
        }
        idx = seg + 1;
    }
}

fn skip_balanced_parens(tokens: &VecDeque<Token>, mut idx: usize) -> usize {
    // Assumes `tokens[idx]` is `(`.
    let mut depth = 0usize;
    while let Some(tok) = tokens.get(idx) {
        match tok.kind {
            SyntaxKind::LParen => {
                depth += 1;
            }
            SyntaxKind::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    idx += 1;
                    break;
                }
            }
            _ => {}
        }
        idx += 1;
    }
    idx
}

fn skip_type_arguments(tokens: &VecDeque<Token>, mut idx: usize) -> usize {
    // Assumes `tokens[idx]` is `<`.
    let mut depth: i32 = 0;
    while let Some(tok) = tokens.get(idx) {
        match tok.kind {
            SyntaxKind::Less => depth += 1,
            SyntaxKind::Greater => depth -= 1,
            SyntaxKind::RightShift => depth -= 2,
            SyntaxKind::UnsignedRightShift => depth -= 3,
            kind if kind.is_trivia()
                || kind.is_identifier_like()
                || is_primitive_type(kind)
                || matches!(
                    kind,
                    SyntaxKind::Dot
                        | SyntaxKind::Comma
                        | SyntaxKind::Question
                        | SyntaxKind::ExtendsKw
                        | SyntaxKind::SuperKw
                        | SyntaxKind::LBracket
                        | SyntaxKind::RBracket
                        | SyntaxKind::Amp
                ) => {}
            _ => break,
        }
        idx += 1;
        if depth <= 0 {
            break;
        }
    }
    idx
}

fn is_primitive_type(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::BooleanKw
            | SyntaxKind::ByteKw
            | SyntaxKind::ShortKw
            | SyntaxKind::IntKw
            | SyntaxKind::LongKw
            | SyntaxKind::CharKw
            | SyntaxKind::FloatKw
            | SyntaxKind::DoubleKw
    )
}

fn can_start_expression(kind: SyntaxKind) -> bool {
    kind.is_identifier_like()
        || matches!(
            kind,
            SyntaxKind::ThisKw
                | SyntaxKind::SuperKw
                | SyntaxKind::NewKw
                | SyntaxKind::SwitchKw
                | SyntaxKind::LParen
                | SyntaxKind::IntLiteral
                | SyntaxKind::LongLiteral
                | SyntaxKind::FloatLiteral
                | SyntaxKind::DoubleLiteral
                | SyntaxKind::CharLiteral
                | SyntaxKind::StringLiteral
                | SyntaxKind::TextBlock
                | SyntaxKind::TrueKw
                | SyntaxKind::FalseKw
                | SyntaxKind::NullKw
                | SyntaxKind::Plus
                | SyntaxKind::Minus
                | SyntaxKind::Bang
                | SyntaxKind::Tilde
                | SyntaxKind::PlusPlus
                | SyntaxKind::MinusMinus
        )
}

/// Keywords (and the empty statement's `;`) that start a plain `Statement`.
fn is_statement_keyword(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::IfKw
            | SyntaxKind::WhileKw
            | SyntaxKind::DoKw
            | SyntaxKind::SynchronizedKw
            | SyntaxKind::SwitchKw
            | SyntaxKind::BreakKw
            | SyntaxKind::ContinueKw
            | SyntaxKind::AssertKw
            | SyntaxKind::ReturnKw
            | SyntaxKind::ThrowKw
            | SyntaxKind::YieldKw
            | SyntaxKind::Semicolon
    )
}

/// `(left, right)` binding power of a binary or assignment operator; larger binds tighter.
fn infix_binding_power(op: SyntaxKind) -> Option<(u8, u8)> {
    let power = match op {
        SyntaxKind::Star | SyntaxKind::Slash | SyntaxKind::Percent => (70, 71),
        SyntaxKind::Plus | SyntaxKind::Minus => (60, 61),
        SyntaxKind::LeftShift | SyntaxKind::RightShift | SyntaxKind::UnsignedRightShift => (55, 56),
        SyntaxKind::Less | SyntaxKind::LessEq | SyntaxKind::Greater | SyntaxKind::GreaterEq => {
            (50, 51)
        }
        SyntaxKind::EqEq | SyntaxKind::BangEq => (45, 46),
        SyntaxKind::Amp => (40, 41),
        SyntaxKind::Caret => (39, 40),
        SyntaxKind::Pipe => (38, 39),
        SyntaxKind::AmpAmp => (30, 31),
        SyntaxKind::PipePipe => (20, 21),
        // Assignments associate to the right.
        SyntaxKind::Eq
        | SyntaxKind::PlusEq
        | SyntaxKind::MinusEq
        | SyntaxKind::StarEq
        | SyntaxKind::SlashEq
        | SyntaxKind::PercentEq
        | SyntaxKind::AmpEq
        | SyntaxKind::PipeEq
        | SyntaxKind::CaretEq
        | SyntaxKind::LeftShiftEq
        | SyntaxKind::RightShiftEq
        | SyntaxKind::UnsignedRightShiftEq => (1, 0),
        _ => return None,
    };
    Some(power)
}

#[cfg(test)]
pub(crate) fn debug_dump(node: &SyntaxNode) -> String {
    fn go(node: &SyntaxNode, indent: usize, out: &mut String) {
        use std::fmt::Write;
        let _ = writeln!(out, "{:indent$}{:?}", "", node.kind(), indent = indent);
        for child in node.children_with_tokens() {
            match child {
                NodeOrToken::Node(n) => go(&n, indent + 2, out),
                NodeOrToken::Token(t) if t.kind().is_trivia() => {}
                NodeOrToken::Token(t) => {
                    let _ = writeln!(
                        out,
                        "{:indent$}{:?} {:?}",
                        "",
                        t.kind(),
                        t.text(),
                        indent = indent + 2
                    );
                }
            }
        }
    }

    let mut out = String::new();
    go(node, 0, &mut out);
    out
}
