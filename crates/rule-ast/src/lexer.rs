//! 词法分析
//!
//! 把规则文本切分为携带行列位置的记号流。列号按字符计数，1 起始。

use crate::ast::Position;
use crate::parser::ParseError;
use std::iter::Peekable;
use std::str::Chars;

/// 记号种类
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Int(i64),
    Str(String),
    True,
    False,
    In,
    Not,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    OrOr,
    AndAnd,
    Bang,
    EqEq,
    NotEq,
    Matches,
    NotMatches,
    Lt,
    Le,
    Gt,
    Ge,
    Amp,
    Pipe,
    Caret,
    Minus,
}

/// 携带位置的记号
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lexed {
    pub(crate) token: Token,
    pub(crate) pos: Position,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn err(&self, pos: Position, message: impl Into<String>) -> ParseError {
        ParseError {
            pos,
            message: message.into(),
        }
    }

    fn lex_ident(&mut self, pos: Position, first: char) -> Lexed {
        let mut name = String::new();
        name.push(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let token = match name.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "in" => Token::In,
            "not" => Token::Not,
            _ => Token::Ident(name),
        };
        Lexed { token, pos }
    }

    fn lex_int(&mut self, pos: Position, first: char) -> Result<Lexed, ParseError> {
        let mut digits = String::new();
        digits.push(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let value: i64 = digits
            .parse()
            .map_err(|_| self.err(pos, format!("整数字面量超出范围: {}", digits)))?;
        Ok(Lexed {
            token: Token::Int(value),
            pos,
        })
    }

    fn lex_string(&mut self, pos: Position) -> Result<Lexed, ParseError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err(pos, "字符串字面量未闭合")),
                Some('"') => break,
                Some('\\') => {
                    let esc_pos = self.pos();
                    match self.bump() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(c) => {
                            return Err(self.err(esc_pos, format!("未知的转义字符: \\{}", c)));
                        }
                        None => return Err(self.err(pos, "字符串字面量未闭合")),
                    }
                }
                Some(c) => value.push(c),
            }
        }
        Ok(Lexed {
            token: Token::Str(value),
            pos,
        })
    }

    fn next_token(&mut self) -> Result<Option<Lexed>, ParseError> {
        // 跳过空白
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }

        let pos = self.pos();
        let c = match self.bump() {
            None => return Ok(None),
            Some(c) => c,
        };

        let lexed = match c {
            '(' => Lexed { token: Token::LParen, pos },
            ')' => Lexed { token: Token::RParen, pos },
            '[' => Lexed { token: Token::LBracket, pos },
            ']' => Lexed { token: Token::RBracket, pos },
            ',' => Lexed { token: Token::Comma, pos },
            '^' => Lexed { token: Token::Caret, pos },
            '-' => Lexed { token: Token::Minus, pos },
            '"' => self.lex_string(pos)?,
            '|' => {
                if self.chars.peek() == Some(&'|') {
                    self.bump();
                    Lexed { token: Token::OrOr, pos }
                } else {
                    Lexed { token: Token::Pipe, pos }
                }
            }
            '&' => {
                if self.chars.peek() == Some(&'&') {
                    self.bump();
                    Lexed { token: Token::AndAnd, pos }
                } else {
                    Lexed { token: Token::Amp, pos }
                }
            }
            '=' => match self.chars.peek() {
                Some('=') => {
                    self.bump();
                    Lexed { token: Token::EqEq, pos }
                }
                Some('~') => {
                    self.bump();
                    Lexed { token: Token::Matches, pos }
                }
                _ => return Err(self.err(pos, "意外的字符: =")),
            },
            '!' => match self.chars.peek() {
                Some('=') => {
                    self.bump();
                    Lexed { token: Token::NotEq, pos }
                }
                Some('~') => {
                    self.bump();
                    Lexed { token: Token::NotMatches, pos }
                }
                _ => Lexed { token: Token::Bang, pos },
            },
            '<' => {
                if self.chars.peek() == Some(&'=') {
                    self.bump();
                    Lexed { token: Token::Le, pos }
                } else {
                    Lexed { token: Token::Lt, pos }
                }
            }
            '>' => {
                if self.chars.peek() == Some(&'=') {
                    self.bump();
                    Lexed { token: Token::Ge, pos }
                } else {
                    Lexed { token: Token::Gt, pos }
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_ident(pos, c),
            c if c.is_ascii_digit() => self.lex_int(pos, c)?,
            c => return Err(self.err(pos, format!("意外的字符: {}", c))),
        };

        Ok(Some(lexed))
    }
}

/// 对整段输入做词法分析
pub(crate) fn tokenize(input: &str) -> Result<Vec<Lexed>, ParseError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(t) = lexer.next_token()? {
        tokens.push(t);
    }
    Ok(tokens)
}
