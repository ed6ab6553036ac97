use crate::syntax_kind::SyntaxKind;
use crate::TextRange;

/// A lexed token. Ranges are byte offsets into the lexed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

impl Token {
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.range.start as usize..self.range.end as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub range: TextRange,
}

/// Java lexer producing a lossless token stream.
///
/// Every byte of the input ends up in exactly one token; characters the lexer does not
/// understand become [`SyntaxKind::Error`] tokens.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    errors: Vec<LexError>,
}

// Longest operators first so a linear scan finds the maximal munch.
const OPERATORS: &[(&str, SyntaxKind)] = &[
    (">>>=", SyntaxKind::UnsignedRightShiftEq),
    ("<<=", SyntaxKind::LeftShiftEq),
    (">>=", SyntaxKind::RightShiftEq),
    (">>>", SyntaxKind::UnsignedRightShift),
    ("...", SyntaxKind::Ellipsis),
    ("->", SyntaxKind::Arrow),
    ("::", SyntaxKind::DoubleColon),
    ("++", SyntaxKind::PlusPlus),
    ("--", SyntaxKind::MinusMinus),
    ("&&", SyntaxKind::AmpAmp),
    ("||", SyntaxKind::PipePipe),
    ("==", SyntaxKind::EqEq),
    ("!=", SyntaxKind::BangEq),
    ("<=", SyntaxKind::LessEq),
    (">=", SyntaxKind::GreaterEq),
    ("+=", SyntaxKind::PlusEq),
    ("-=", SyntaxKind::MinusEq),
    ("*=", SyntaxKind::StarEq),
    ("/=", SyntaxKind::SlashEq),
    ("%=", SyntaxKind::PercentEq),
    ("&=", SyntaxKind::AmpEq),
    ("|=", SyntaxKind::PipeEq),
    ("^=", SyntaxKind::CaretEq),
    ("<<", SyntaxKind::LeftShift),
    (">>", SyntaxKind::RightShift),
    ("(", SyntaxKind::LParen),
    (")", SyntaxKind::RParen),
    ("{", SyntaxKind::LBrace),
    ("}", SyntaxKind::RBrace),
    ("[", SyntaxKind::LBracket),
    ("]", SyntaxKind::RBracket),
    (";", SyntaxKind::Semicolon),
    (",", SyntaxKind::Comma),
    (".", SyntaxKind::Dot),
    ("@", SyntaxKind::At),
    ("?", SyntaxKind::Question),
    (":", SyntaxKind::Colon),
    ("+", SyntaxKind::Plus),
    ("-", SyntaxKind::Minus),
    ("*", SyntaxKind::Star),
    ("/", SyntaxKind::Slash),
    ("%", SyntaxKind::Percent),
    ("~", SyntaxKind::Tilde),
    ("!", SyntaxKind::Bang),
    ("=", SyntaxKind::Eq),
    ("<", SyntaxKind::Less),
    (">", SyntaxKind::Greater),
    ("&", SyntaxKind::Amp),
    ("|", SyntaxKind::Pipe),
    ("^", SyntaxKind::Caret),
];

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<LexError> {
        self.errors
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth_char(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn bump_while(&mut self, mut pred: impl FnMut(char) -> bool) {
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn error(&mut self, start: usize, message: &str) {
        self.errors.push(LexError {
            message: message.to_string(),
            range: TextRange::new(start, self.pos),
        });
    }

    fn next_kind(&mut self) -> SyntaxKind {
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return SyntaxKind::Eof;
        };

        if c.is_whitespace() {
            self.bump_while(char::is_whitespace);
            return SyntaxKind::Whitespace;
        }

        let rest = self.rest();
        if rest.starts_with("//") {
            self.bump_while(|c| c != '\n' && c != '\r');
            return SyntaxKind::LineComment;
        }
        if rest.starts_with("/*") {
            let kind = if rest.starts_with("/**") && !rest.starts_with("/**/") {
                SyntaxKind::DocComment
            } else {
                SyntaxKind::BlockComment
            };
            match rest[2..].find("*/") {
                Some(end) => self.pos += 2 + end + 2,
                None => {
                    self.pos = self.input.len();
                    self.error(start, "unterminated block comment");
                }
            }
            return kind;
        }

        if is_ident_start(c) {
            self.bump_while(is_ident_continue);
            let text = &self.input[start..self.pos];
            return SyntaxKind::from_keyword(text).unwrap_or(SyntaxKind::Identifier);
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_nth_char(1).is_some_and(|n| n.is_ascii_digit())) {
            return self.lex_number();
        }

        if c == '\'' {
            self.lex_quoted('\'');
            return SyntaxKind::CharLiteral;
        }

        if c == '"' {
            if rest.starts_with("\"\"\"") {
                self.lex_text_block();
                return SyntaxKind::TextBlock;
            }
            self.lex_quoted('"');
            return SyntaxKind::StringLiteral;
        }

        for (op, kind) in OPERATORS {
            if rest.starts_with(op) {
                self.pos += op.len();
                return *kind;
            }
        }

        self.bump_char();
        self.error(start, "unexpected character");
        SyntaxKind::Error
    }

    fn lex_number(&mut self) -> SyntaxKind {
        let rest = self.rest();
        let mut is_floating = false;

        if rest.starts_with("0x") || rest.starts_with("0X") {
            self.pos += 2;
            self.bump_while(|c| c.is_ascii_hexdigit() || c == '_');
            if self.peek_char() == Some('.') {
                self.pos += 1;
                self.bump_while(|c| c.is_ascii_hexdigit() || c == '_');
                is_floating = true;
            }
            if matches!(self.peek_char(), Some('p' | 'P')) {
                self.lex_exponent();
                is_floating = true;
            }
        } else if rest.starts_with("0b") || rest.starts_with("0B") {
            self.pos += 2;
            self.bump_while(|c| c == '0' || c == '1' || c == '_');
        } else {
            self.bump_while(|c| c.is_ascii_digit() || c == '_');
            if self.peek_char() == Some('.')
                && !self.peek_nth_char(1).is_some_and(|n| is_ident_start(n) && !matches!(n, 'e' | 'E' | 'f' | 'F' | 'd' | 'D'))
                && self.peek_nth_char(1) != Some('.')
            {
                self.pos += 1;
                self.bump_while(|c| c.is_ascii_digit() || c == '_');
                is_floating = true;
            }
            if matches!(self.peek_char(), Some('e' | 'E')) {
                self.lex_exponent();
                is_floating = true;
            }
        }

        match self.peek_char() {
            Some('l' | 'L') => {
                self.pos += 1;
                SyntaxKind::LongLiteral
            }
            Some('f' | 'F') => {
                self.pos += 1;
                SyntaxKind::FloatLiteral
            }
            Some('d' | 'D') => {
                self.pos += 1;
                SyntaxKind::DoubleLiteral
            }
            _ if is_floating => SyntaxKind::DoubleLiteral,
            _ => SyntaxKind::IntLiteral,
        }
    }

    fn lex_exponent(&mut self) {
        // Caller checked for the exponent marker.
        self.pos += 1;
        if matches!(self.peek_char(), Some('+' | '-')) {
            self.pos += 1;
        }
        self.bump_while(|c| c.is_ascii_digit() || c == '_');
    }

    fn lex_quoted(&mut self, quote: char) {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek_char() {
                None | Some('\n') | Some('\r') => {
                    self.error(start, "unterminated literal");
                    return;
                }
                Some('\\') => {
                    self.pos += 1;
                    self.bump_char();
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return;
                }
                Some(_) => {
                    self.bump_char();
                }
            }
        }
    }

    fn lex_text_block(&mut self) {
        let start = self.pos;
        self.pos += 3;
        loop {
            if self.rest().starts_with("\"\"\"") {
                self.pos += 3;
                return;
            }
            match self.bump_char() {
                None => {
                    self.error(start, "unterminated text block");
                    return;
                }
                Some('\\') => {
                    self.bump_char();
                }
                Some(_) => {}
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let start = self.pos;
        let kind = self.next_kind();
        if kind == SyntaxKind::Eof {
            return None;
        }
        Some(Token {
            kind,
            range: TextRange::new(start, self.pos),
        })
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || unicode_ident::is_xid_start(c)
}

fn is_ident_continue(c: char) -> bool {
    c == '$' || unicode_ident::is_xid_continue(c)
}

pub fn lex(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}

pub fn lex_with_errors(input: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer::new(input);
    let tokens: Vec<Token> = lexer.by_ref().collect();
    (tokens, lexer.into_errors())
}
