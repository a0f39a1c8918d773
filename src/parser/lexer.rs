use crate::error::ParseError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    /// Identifiers and keywords; the parser tells them apart.
    Word(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Dot,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    PlusAssign,
    MinusAssign,
    PlusPlus,
    MinusMinus,
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AndAnd,
    OrOr,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Number(n) => return write!(f, "{n}"),
            TokenKind::Str(s) => return write!(f, "\"{s}\""),
            TokenKind::Word(w) => return write!(f, "{w}"),
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Bang => "!",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::EqEq => "==",
            TokenKind::EqEqEq => "===",
            TokenKind::BangEq => "!=",
            TokenKind::BangEqEq => "!==",
            TokenKind::Less => "<",
            TokenKind::LessEq => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEq => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

pub struct Lexer<'s> {
    chars: std::iter::Peekable<std::str::Chars<'s>>,
    line: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let line = self.line;
            let Some(c) = self.chars.next() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    line,
                });
                return Ok(tokens);
            };

            let kind = match c {
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                ':' => TokenKind::Colon,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '%' => TokenKind::Percent,
                '.' if self.peek_is(|c| c.is_ascii_digit()) => self.number(c),
                '.' => TokenKind::Dot,
                '+' if self.eat('+') => TokenKind::PlusPlus,
                '+' if self.eat('=') => TokenKind::PlusAssign,
                '+' => TokenKind::Plus,
                '-' if self.eat('-') => TokenKind::MinusMinus,
                '-' if self.eat('=') => TokenKind::MinusAssign,
                '-' => TokenKind::Minus,
                '=' if self.eat('=') => {
                    if self.eat('=') {
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                }
                '=' => TokenKind::Assign,
                '!' if self.eat('=') => {
                    if self.eat('=') {
                        TokenKind::BangEqEq
                    } else {
                        TokenKind::BangEq
                    }
                }
                '!' => TokenKind::Bang,
                '<' if self.eat('=') => TokenKind::LessEq,
                '<' => TokenKind::Less,
                '>' if self.eat('=') => TokenKind::GreaterEq,
                '>' => TokenKind::Greater,
                '&' if self.eat('&') => TokenKind::AndAnd,
                '|' if self.eat('|') => TokenKind::OrOr,
                '"' | '\'' => self.string(c)?,
                c if c.is_ascii_digit() => self.number(c),
                c if c.is_alphabetic() || c == '_' || c == '$' => self.word(c),
                found => return Err(ParseError::UnexpectedCharacter { found, line }),
            };
            tokens.push(Token { kind, line });
        }
    }

    fn peek_is(&mut self, predicate: impl Fn(char) -> bool) -> bool {
        self.chars.peek().is_some_and(|&c| predicate(c))
    }

    fn eat(&mut self, expected: char) -> bool {
        self.chars.next_if_eq(&expected).is_some()
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        while let Some(&c) = self.chars.peek() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.chars.next();
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '/' => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some('/') => {
                            while self.chars.next_if(|&c| c != '\n').is_some() {}
                        }
                        Some('*') => self.block_comment()?,
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
        Ok(())
    }

    fn block_comment(&mut self) -> Result<(), ParseError> {
        let start = self.line;
        self.chars.next();
        self.chars.next();
        while let Some(c) = self.chars.next() {
            match c {
                '\n' => self.line += 1,
                '*' if self.eat('/') => return Ok(()),
                _ => {}
            }
        }
        Err(ParseError::UnterminatedComment { line: start })
    }

    fn number(&mut self, first: char) -> TokenKind {
        let mut text = String::from(first);
        while let Some(c) = self.chars.next_if(|c| c.is_ascii_digit() || *c == '.') {
            text.push(c);
        }
        if let Some(e) = self.chars.next_if(|c| *c == 'e' || *c == 'E') {
            text.push(e);
            if let Some(sign) = self.chars.next_if(|c| *c == '+' || *c == '-') {
                text.push(sign);
            }
            while let Some(c) = self.chars.next_if(char::is_ascii_digit) {
                text.push(c);
            }
        }
        TokenKind::Number(text.parse().unwrap_or(f64::NAN))
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, ParseError> {
        let line = self.line;
        let mut text = String::new();
        loop {
            match self.chars.next() {
                None | Some('\n') => return Err(ParseError::UnterminatedString { line }),
                Some(c) if c == quote => return Ok(TokenKind::Str(text)),
                Some('\\') => match self.chars.next() {
                    Some('n') => text.push('\n'),
                    Some('r') => text.push('\r'),
                    Some('t') => text.push('\t'),
                    Some('0') => text.push('\0'),
                    Some('u') => {
                        let code: String = (0..4).filter_map(|_| self.chars.next()).collect();
                        let decoded = u32::from_str_radix(&code, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .unwrap_or(char::REPLACEMENT_CHARACTER);
                        text.push(decoded);
                    }
                    Some('\n') => self.line += 1,
                    Some(other) => text.push(other),
                    None => return Err(ParseError::UnterminatedString { line }),
                },
                Some(c) => text.push(c),
            }
        }
    }

    fn word(&mut self, first: char) -> TokenKind {
        let mut text = String::from(first);
        while let Some(c) = self
            .chars
            .next_if(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
        {
            text.push(c);
        }
        TokenKind::Word(text)
    }
}
