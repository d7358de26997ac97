//! Streaming lexer: source text → [`Token`]s.
//!
//! A [`Scanner`] is a `FusedIterator` over `Result<Token, LoxError>`.  Every
//! call to `next` first skips trivia (whitespace, newlines, `//` comments),
//! then recognises exactly one lexeme.  When the input runs out it yields a
//! single `EOF` token and is finished for good.
//!
//! | Lexeme class        | Rule                                                     |
//! |---------------------|----------------------------------------------------------|
//! | punctuation         | `( ) { } , . - + ; * /`                                  |
//! | operators           | `!` `=` `<` `>`, each optionally followed by `=` (longest match wins) |
//! | string              | `"` … `"`, may span lines, no escapes                    |
//! | number              | `digits ( "." digits )?`, always `f64`                   |
//! | identifier/keyword  | `[A-Za-z_][A-Za-z0-9_]*`, keywords via [`KEYWORDS`]     |
//!
//! Errors are yielded in place of the offending lexeme and scanning resumes
//! right after it; [`Scanner::scan_tokens`] routes them into a
//! [`Diagnostics`] collector so one pass reports every lexical problem.
//!
//! ```rust
//! use lox_treewalk::error::Diagnostics;
//! use lox_treewalk::scanner::Scanner;
//!
//! let mut diagnostics = Diagnostics::new();
//! let tokens = Scanner::new("print 123; // example").scan_tokens(&mut diagnostics);
//!
//! assert_eq!(tokens.len(), 4);
//! assert!(!diagnostics.has_errors());
//! ```

use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info, trace};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

/// Reserved words, resolved with a compile‑time perfect hash.
pub static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and"    => TokenType::AND,
    "class"  => TokenType::CLASS,
    "else"   => TokenType::ELSE,
    "false"  => TokenType::FALSE,
    "fun"    => TokenType::FUN,
    "for"    => TokenType::FOR,
    "if"     => TokenType::IF,
    "nil"    => TokenType::NIL,
    "or"     => TokenType::OR,
    "print"  => TokenType::PRINT,
    "return" => TokenType::RETURN,
    "super"  => TokenType::SUPER,
    "this"   => TokenType::THIS,
    "true"   => TokenType::TRUE,
    "var"    => TokenType::VAR,
    "while"  => TokenType::WHILE,
};

pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    /// Byte offset where the lexeme being scanned begins.
    start: usize,
    /// Byte offset of the next unread byte.
    pos: usize,
    line: usize,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        info!("Scanner created over {} bytes", source.len());

        Self {
            source,
            bytes: source.as_bytes(),
            start: 0,
            pos: 0,
            line: 1,
            finished: false,
        }
    }

    /// Scan the whole unit.  Errors go to `diagnostics`; the returned vector
    /// always ends with exactly one `EOF` token.
    pub fn scan_tokens(self, diagnostics: &mut Diagnostics) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();

        for result in self {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => diagnostics.report(e),
            }
        }

        info!("Scanned {} tokens", tokens.len());

        tokens
    }

    // ───────────────────────────── cursor ───────────────────────────────────

    #[inline(always)]
    fn byte_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    /// Current byte, or `0` past the end.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.byte_at(0)
    }

    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b = self.peek();
        self.pos += 1;
        b
    }

    #[inline(always)]
    fn eat(&mut self, expected: u8) -> bool {
        let hit = self.pos < self.bytes.len() && self.peek() == expected;
        if hit {
            self.pos += 1;
        }
        hit
    }

    /// Lexeme boundaries always fall on ASCII bytes, so the slice is valid UTF‑8.
    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.pos]
    }

    // ───────────────────────────── trivia ───────────────────────────────────

    /// Skips whitespace and line comments, counting newlines.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                b' ' | b'\r' | b'\t' => self.pos += 1,

                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }

                b'/' if self.byte_at(1) == b'/' => {
                    // Stop at the newline; the next round counts it.
                    self.pos = match memchr(b'\n', &self.bytes[self.pos..]) {
                        Some(offset) => self.pos + offset,
                        None => self.bytes.len(),
                    };
                }

                _ => return,
            }
        }
    }

    // ───────────────────────────── lexemes ──────────────────────────────────

    /// Recognises the lexeme starting at `self.start`.
    fn scan_token(&mut self) -> Result<TokenType> {
        let kind = match self.bump() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,
            b'/' => TokenType::SLASH,

            b'!' => self.with_equal(TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.with_equal(TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.with_equal(TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.with_equal(TokenType::GREATER_EQUAL, TokenType::GREATER),

            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => return Err(self.unexpected()),
        };

        Ok(kind)
    }

    #[inline(always)]
    fn with_equal(&mut self, double: TokenType, single: TokenType) -> TokenType {
        if self.eat(b'=') {
            double
        } else {
            single
        }
    }

    /// The opening quote is already consumed.  Newlines inside the literal
    /// advance the line counter, so the token carries its closing line.
    fn string(&mut self) -> Result<TokenType> {
        let body_start = self.pos;

        let Some(len) = memchr(b'"', &self.bytes[body_start..]) else {
            self.line += self.bytes[body_start..].iter().filter(|&&b| b == b'\n').count();
            self.pos = self.bytes.len();

            return Err(LoxError::lex(self.line, "Unterminated string."));
        };

        let body: &str = &self.source[body_start..body_start + len];
        self.line += body.bytes().filter(|&b| b == b'\n').count();
        self.pos = body_start + len + 1;

        Ok(TokenType::STRING(body.to_owned()))
    }

    fn number(&mut self) -> TokenType {
        self.digits();

        // A trailing '.' without digits belongs to the next token.
        if self.peek() == b'.' && self.byte_at(1).is_ascii_digit() {
            self.pos += 1;
            self.digits();
        }

        // Digits with at most one interior '.': the parse cannot fail.
        TokenType::NUMBER(self.lexeme().parse::<f64>().unwrap_or(0.0))
    }

    fn digits(&mut self) {
        while self.peek().is_ascii_digit() {
            self.pos += 1;
        }
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.pos += 1;
        }

        KEYWORDS
            .get(self.lexeme())
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }

    /// Reports the character at `self.start` and steps over all of its
    /// bytes, so a multi‑byte character yields a single error.
    fn unexpected(&mut self) -> LoxError {
        let c: char = self.source[self.start..]
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);

        self.pos = self.start + c.len_utf8();

        debug!("Unexpected character {:?} on line {}", c, self.line);

        LoxError::lex(self.line, format!("Unexpected character: {}", c))
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.skip_trivia();

        if self.pos >= self.bytes.len() {
            self.finished = true;
            debug!("Emitting EOF on line {}", self.line);

            return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
        }

        self.start = self.pos;

        let token = self.scan_token().map(|kind| {
            trace!("Scanned {} on line {}", kind.name(), self.line);
            Token::new(kind, self.lexeme(), self.line)
        });

        Some(token)
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
