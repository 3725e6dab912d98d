// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Query Lexer (Tokenizer)
//!
//! Converts query text into tokens. Lexical errors are returned as
//! [`TokenType::Error`] tokens so the parser can report them with a position.

use super::token::{
    is_attribute_scope, is_attribute_terminator, is_keyword, is_operator, is_operator_char,
    is_punctuator, Position, Token, TokenType,
};

/// Query lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Byte offset of every character, plus the input length
    offsets: Vec<usize>,
    /// Current position in input (points to current char)
    position: usize,
    /// Current reading position in input (after current char)
    read_position: usize,
    /// Current character under examination
    ch: char,
    /// Current position tracking
    pos: Position,
    /// The previous token was a scope; the next `.` starts an attribute
    after_scope: bool,
    /// Last error encountered
    last_error: Option<String>,
}

/// Saved lexer state for lookahead
#[derive(Clone, Copy)]
struct LexerState {
    position: usize,
    read_position: usize,
    ch: char,
    pos: Position,
    after_scope: bool,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let mut offsets: Vec<usize> = input.char_indices().map(|(i, _)| i).collect();
        offsets.push(input.len());
        let mut lexer = Self {
            input: input.chars().collect(),
            offsets,
            position: 0,
            read_position: 0,
            ch: '\0',
            pos: Position::new(0, 1, 1),
            after_scope: false,
            last_error: None,
        };
        lexer.read_char();
        lexer
    }

    /// Read the next character
    fn read_char(&mut self) {
        if self.ch == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else if self.ch != '\0' {
            self.pos.column += 1;
        }

        if self.read_position >= self.input.len() {
            self.ch = '\0';
            self.position = self.input.len();
        } else {
            self.ch = self.input[self.read_position];
            self.position = self.read_position;
        }
        self.read_position = self.position + 1;

        self.pos.offset = self.offsets[self.position];
    }

    /// Peek at the next character without advancing
    fn peek_char(&self) -> char {
        self.peek_char_n(1)
    }

    /// Peek at a character N positions ahead without advancing
    fn peek_char_n(&self, n: usize) -> char {
        let pos = self.read_position + n - 1;
        if pos >= self.input.len() {
            '\0'
        } else {
            self.input[pos]
        }
    }

    /// Check whether the input at the current character starts with `s`
    fn looking_at(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.input.get(self.position + i) == Some(&c))
    }

    fn save(&self) -> LexerState {
        LexerState {
            position: self.position,
            read_position: self.read_position,
            ch: self.ch,
            pos: self.pos,
            after_scope: self.after_scope,
        }
    }

    fn restore(&mut self, state: LexerState) {
        self.position = state.position;
        self.read_position = state.read_position;
        self.ch = state.ch;
        self.pos = state.pos;
        self.after_scope = state.after_scope;
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let pos = self.pos;
        let after_scope = std::mem::take(&mut self.after_scope);

        let token = match self.ch {
            '\0' => Token::eof(pos),

            // Attribute name
            '.' if after_scope || !self.peek_char().is_ascii_digit() => {
                let literal = self.read_attribute();
                Token::new(TokenType::Attribute, literal, pos)
            }

            // Number, float or duration literal
            c if c.is_ascii_digit() || c == '.' => self.read_number(pos),

            // String literal with escapes
            '"' => {
                let literal = self.read_string_literal();
                Token::new(TokenType::String, literal, pos)
            }

            // Raw string literal
            '`' => {
                let literal = self.read_raw_string();
                Token::new(TokenType::String, literal, pos)
            }

            c if is_punctuator(c) => {
                self.read_char();
                Token::new(TokenType::Punctuator, c.to_string(), pos)
            }

            c if is_operator_char(c) => {
                let literal = self.read_operator();
                if is_operator(&literal) {
                    Token::new(TokenType::Operator, literal, pos)
                } else {
                    Token::error(format!("unknown operator '{}'", literal), literal, pos)
                }
            }

            // Identifier, keyword or scope
            c if c.is_alphabetic() || c == '_' => {
                let word = self.read_identifier();
                if is_attribute_scope(&word) && self.ch == '.' {
                    let mut scope = word;
                    if scope == "parent" {
                        for inner in ["span", "resource"] {
                            if self.looking_at(&format!(".{}.", inner)) {
                                for _ in 0..=inner.len() {
                                    self.read_char();
                                }
                                scope = format!("parent.{}", inner);
                                break;
                            }
                        }
                    }
                    self.after_scope = true;
                    Token::new(TokenType::Scope, scope, pos)
                } else if is_keyword(&word) {
                    Token::new(TokenType::Keyword, word, pos)
                } else {
                    Token::new(TokenType::Identifier, word, pos)
                }
            }

            // Unrecognized character
            c => {
                self.read_char();
                Token::error(
                    format!("unrecognized character: {:?}", c),
                    c.to_string(),
                    pos,
                )
            }
        };

        match self.last_error.take() {
            Some(message) => Token::error(message, token.literal, pos),
            None => token,
        }
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while self.ch.is_whitespace() {
            if self.ch == '\r' && self.peek_char() == '\n' {
                // Skip \r in \r\n sequences
                self.read_char();
            }
            self.read_char();
        }
    }

    /// Read an identifier
    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        result.push(self.ch);
        self.read_char();

        while self.ch.is_alphanumeric() || self.ch == '_' {
            result.push(self.ch);
            self.read_char();
        }

        result
    }

    /// Read an attribute name starting at the leading `.`
    ///
    /// Unquoted parts run until whitespace or an operator character; quoted
    /// parts (`"..."`) may contain anything and accept `\"` and `\\`.
    fn read_attribute(&mut self) -> String {
        let mut name = String::new();
        self.read_char(); // consume '.'

        if self.ch != '"' && is_attribute_terminator(self.ch) {
            self.last_error = Some("expected attribute name after '.'".to_string());
            return name;
        }

        loop {
            if self.ch == '"' {
                self.read_char(); // consume opening quote
                loop {
                    match self.ch {
                        '\0' => {
                            self.last_error = Some("unterminated quoted attribute".to_string());
                            return name;
                        }
                        '"' => {
                            self.read_char();
                            break;
                        }
                        '\\' => {
                            let escaped = self.peek_char();
                            if escaped != '"' && escaped != '\\' {
                                self.last_error = Some(format!(
                                    "invalid escape sequence '\\{}' in attribute",
                                    escaped
                                ));
                                return name;
                            }
                            name.push(escaped);
                            self.read_char();
                            self.read_char();
                        }
                        c => {
                            name.push(c);
                            self.read_char();
                        }
                    }
                }
            } else if !is_attribute_terminator(self.ch) {
                name.push(self.ch);
                self.read_char();
            } else {
                break;
            }
        }

        name
    }

    /// Read an integer, float or duration literal
    fn read_number(&mut self, pos: Position) -> Token {
        let mut result = String::new();
        let mut is_float = false;

        while self.ch.is_ascii_digit() {
            result.push(self.ch);
            self.read_char();
        }

        // Fraction; `1.` is a float but `1.foo` is not
        if self.ch == '.'
            && !self.peek_char().is_alphabetic()
            && self.peek_char() != '"'
            && self.peek_char() != '.'
        {
            is_float = true;
            result.push(self.ch);
            self.read_char();
            while self.ch.is_ascii_digit() {
                result.push(self.ch);
                self.read_char();
            }
        }

        // Duration suffix, two-character units first
        let unit_len = match (self.ch, self.peek_char()) {
            ('n' | 'u' | 'µ' | 'm', 's') => 2,
            ('s' | 'm' | 'h', _) => 1,
            _ => 0,
        };
        if unit_len > 0 {
            let after = self.peek_char_n(unit_len);
            if !(after.is_alphanumeric() || after == '_') {
                for _ in 0..unit_len {
                    result.push(self.ch);
                    self.read_char();
                }
                return Token::new(TokenType::Duration, result, pos);
            }
        }

        if self.ch.is_alphabetic() || self.ch == '_' {
            while self.ch.is_alphanumeric() || self.ch == '_' {
                result.push(self.ch);
                self.read_char();
            }
            return Token::error(format!("invalid number '{}'", result), result, pos);
        }

        if is_float {
            Token::new(TokenType::Float, result, pos)
        } else {
            Token::new(TokenType::Integer, result, pos)
        }
    }

    /// Read a double-quoted string literal, resolving escapes
    fn read_string_literal(&mut self) -> String {
        let mut result = String::new();
        self.read_char(); // consume opening quote

        loop {
            match self.ch {
                '\0' => {
                    self.last_error = Some("unterminated string literal".to_string());
                    break;
                }
                '"' => {
                    self.read_char();
                    break;
                }
                '\\' => {
                    self.read_char();
                    let resolved = match self.ch {
                        '"' => '"',
                        '\\' => '\\',
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '\0' => {
                            self.last_error = Some("unterminated string literal".to_string());
                            break;
                        }
                        other => {
                            self.last_error =
                                Some(format!("invalid escape sequence '\\{}'", other));
                            other
                        }
                    };
                    result.push(resolved);
                    self.read_char();
                }
                c => {
                    result.push(c);
                    self.read_char();
                }
            }
        }

        result
    }

    /// Read a backtick string; no escapes
    fn read_raw_string(&mut self) -> String {
        let mut result = String::new();
        self.read_char(); // consume opening backtick

        while self.ch != '`' && self.ch != '\0' {
            result.push(self.ch);
            self.read_char();
        }

        if self.ch == '`' {
            self.read_char();
        } else {
            self.last_error = Some("unterminated string literal".to_string());
        }

        result
    }

    /// Read an operator, longest match first
    fn read_operator(&mut self) -> String {
        let mut result = String::new();
        let first_char = self.ch;
        result.push(first_char);
        self.read_char();

        // Check for multi-character operators
        if self.ch != '\0' {
            let two_chars: String = [first_char, self.ch].iter().collect();
            if is_operator(&two_chars) {
                result.push(self.ch);
                self.read_char();

                // Check for three-character operators
                if self.ch != '\0' {
                    let three_chars = format!("{}{}", two_chars, self.ch);
                    if is_operator(&three_chars) {
                        result.push(self.ch);
                        self.read_char();
                    }
                }
            }
        }

        result
    }

    /// Get the last error encountered
    pub fn get_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Peek at the next token without advancing
    pub fn peek_token(&mut self) -> Token {
        let saved = self.save();
        let token = self.next_token();
        self.restore(saved);
        token
    }

    /// Peek at the next n tokens without advancing
    pub fn peek_tokens(&mut self, n: usize) -> Vec<Token> {
        if n == 0 {
            return Vec::new();
        }

        let saved = self.save();

        let mut tokens = Vec::with_capacity(n);
        for _ in 0..n {
            let token = self.next_token();
            let stop = token.is_eof() || token.is_error();
            tokens.push(token);
            if stop {
                break;
            }
        }

        self.restore(saved);
        tokens
    }
}
