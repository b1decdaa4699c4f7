//! 语法分析
//!
//! 递归下降解析器。优先级从松到紧：
//! `||` < `&&` < 比较（`==` `!=` `=~` `!~` `<` `<=` `>` `>=` `in` `not in`）
//! < `|` < `^` < `&` < 一元（`!` `-` `^`）。
//! 位运算整体比比较结合更紧（与源语言文法一致：`a != b & c` 解析为 `a != (b & c)`），
//! 括号只影响分组，不改变节点类型。

use crate::ast::{BinaryOp, Expr, Macro, Position, Rule, UnaryOp};
use crate::lexer::{Lexed, Token, tokenize};
use thiserror::Error;

/// 语法 / 词法错误，携带出错位置
#[derive(Debug, Clone, PartialEq, Error)]
#[error("语法错误 ({pos}): {message}")]
pub struct ParseError {
    pub pos: Position,
    pub message: String,
}

/// 解析规则文本
pub fn parse_rule(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(tokenize(input)?);
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(Rule { expr })
}

/// 解析宏定义文本；宏体是数组字面量或布尔子表达式
pub fn parse_macro(input: &str) -> Result<Macro, ParseError> {
    let mut parser = Parser::new(tokenize(input)?);
    let expr = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(Macro { expr })
}

struct Parser {
    tokens: Vec<Lexed>,
    index: usize,
}

impl Parser {
    fn new(tokens: Vec<Lexed>) -> Self {
        Self { tokens, index: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|t| &t.token)
    }

    fn peek_pos(&self) -> Position {
        match self.tokens.get(self.index) {
            Some(t) => t.pos,
            // 输入末尾：落在最后一个记号之后
            None => self
                .tokens
                .last()
                .map(|t| t.pos)
                .unwrap_or_else(|| Position::new(1, 1)),
        }
    }

    fn advance(&mut self) -> Option<Lexed> {
        let t = self.tokens.get(self.index).cloned();
        if t.is_some() {
            self.index += 1;
        }
        t
    }

    /// 消费当前记号并返回其位置；仅在 peek 命中后调用
    fn bump_pos(&mut self) -> Position {
        let pos = self.peek_pos();
        self.index += 1;
        pos
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            pos: self.peek_pos(),
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<Position, ParseError> {
        match self.tokens.get(self.index) {
            Some(t) if t.token == expected => {
                let pos = t.pos;
                self.index += 1;
                Ok(pos)
            }
            _ => Err(self.err(format!("缺少 {}", what))),
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if self.index < self.tokens.len() {
            return Err(self.err("表达式之后存在多余内容"));
        }
        Ok(())
    }

    fn binary(op: BinaryOp, pos: Position, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            pos,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            let pos = self.bump_pos();
            let rhs = self.parse_and()?;
            lhs = Self::binary(BinaryOp::Or, pos, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_comparison()?;
        while self.peek() == Some(&Token::AndAnd) {
            let pos = self.bump_pos();
            let rhs = self.parse_comparison()?;
            lhs = Self::binary(BinaryOp::And, pos, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bit_or()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                Some(Token::Matches) => BinaryOp::Matches,
                Some(Token::NotMatches) => BinaryOp::NotMatches,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::In) => {
                    let pos = self.bump_pos();
                    let rhs = self.parse_unary()?;
                    lhs = Self::binary(BinaryOp::In, pos, lhs, rhs);
                    continue;
                }
                Some(Token::Not) => {
                    let pos = self.bump_pos();
                    self.expect(Token::In, "`not` 之后的 `in`")?;
                    let rhs = self.parse_unary()?;
                    lhs = Self::binary(BinaryOp::NotIn, pos, lhs, rhs);
                    continue;
                }
                _ => break,
            };
            let pos = self.bump_pos();
            let rhs = self.parse_bit_or()?;
            lhs = Self::binary(op, pos, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_or(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bit_xor()?;
        while self.peek() == Some(&Token::Pipe) {
            let pos = self.bump_pos();
            let rhs = self.parse_bit_xor()?;
            lhs = Self::binary(BinaryOp::BitOr, pos, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_xor(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_bit_and()?;
        while self.peek() == Some(&Token::Caret) {
            let pos = self.bump_pos();
            let rhs = self.parse_bit_and()?;
            lhs = Self::binary(BinaryOp::BitXor, pos, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_and(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        while self.peek() == Some(&Token::Amp) {
            let pos = self.bump_pos();
            let rhs = self.parse_unary()?;
            lhs = Self::binary(BinaryOp::BitAnd, pos, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Minus,
            Some(Token::Caret) => UnaryOp::BitNot,
            _ => return self.parse_primary(),
        };
        let pos = self.bump_pos();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            pos,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let lexed = match self.tokens.get(self.index) {
            Some(t) => t.clone(),
            None => return Err(self.err("表达式不完整")),
        };
        self.index += 1;
        let pos = lexed.pos;

        match lexed.token {
            Token::True => Ok(Expr::BoolLiteral { value: true, pos }),
            Token::False => Ok(Expr::BoolLiteral { value: false, pos }),
            Token::Int(value) => Ok(Expr::IntLiteral { value, pos }),
            Token::Str(value) => Ok(Expr::StringLiteral { value, pos }),
            Token::Ident(name) => Ok(Expr::Ident { name, pos }),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "右括号 `)`")?;
                // 括号只分组，直接返回内层表达式
                Ok(inner)
            }
            Token::LBracket => {
                let mut elements = Vec::new();
                if self.peek() != Some(&Token::RBracket) {
                    loop {
                        elements.push(self.parse_unary()?);
                        if self.peek() == Some(&Token::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RBracket, "右括号 `]`")?;
                Ok(Expr::Array { elements, pos })
            }
            t => Err(ParseError {
                pos,
                message: format!("意外的记号: {:?}", t),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(input: &str) -> Expr {
        parse_rule(input).unwrap().expr
    }

    #[test]
    fn test_bitwise_binds_tighter_than_equality() {
        // `1 == 1 & 1` 解析为 `1 == (1 & 1)`
        let expr = rule("1 == 1 & 1");
        match expr {
            Expr::Binary { op: BinaryOp::Eq, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::BitAnd, .. }));
            }
            other => panic!("意外的语法树: {:?}", other),
        }
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = rule("true || false && true");
        match expr {
            Expr::Binary { op: BinaryOp::Or, rhs, .. } => {
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::And, .. }));
            }
            other => panic!("意外的语法树: {:?}", other),
        }
    }

    #[test]
    fn test_comparison_over_bitwise_chain() {
        // `open.flags & mask > 0` 解析为 `(open.flags & mask) > 0`
        let expr = rule("open.flags & 7 > 0");
        match expr {
            Expr::Binary { op: BinaryOp::Gt, lhs, .. } => {
                assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::BitAnd, .. }));
            }
            other => panic!("意外的语法树: {:?}", other),
        }
    }

    #[test]
    fn test_not_in() {
        let expr = rule(r#"process.name not in [ "a", "b" ]"#);
        match expr {
            Expr::Binary { op: BinaryOp::NotIn, rhs, .. } => match *rhs {
                Expr::Array { ref elements, .. } => assert_eq!(elements.len(), 2),
                ref other => panic!("意外的右操作数: {:?}", other),
            },
            other => panic!("意外的语法树: {:?}", other),
        }
    }

    #[test]
    fn test_unary_nesting() {
        // 双重取负
        let expr = rule("--3 == 3");
        match expr {
            Expr::Binary { op: BinaryOp::Eq, lhs, .. } => match *lhs {
                Expr::Unary { op: UnaryOp::Minus, ref operand, .. } => {
                    assert!(matches!(**operand, Expr::Unary { op: UnaryOp::Minus, .. }));
                }
                ref other => panic!("意外的左操作数: {:?}", other),
            },
            other => panic!("意外的语法树: {:?}", other),
        }
    }

    #[test]
    fn test_unary_vs_binary_caret() {
        // 表达式开头的 `^` 是按位取反，中缀 `^` 是异或
        assert!(matches!(
            rule("^0 == -1"),
            Expr::Binary { op: BinaryOp::Eq, .. }
        ));
        assert!(matches!(
            rule("3 ^ 3 == 0"),
            Expr::Binary { op: BinaryOp::Eq, .. }
        ));
    }

    #[test]
    fn test_parenthesis_grouping_only() {
        assert_eq!(rule("(true)"), rule("true"));
    }

    #[test]
    fn test_operand_positions_survive() {
        let expr = rule(r#"open.filename == 3"#);
        match expr {
            Expr::Binary { lhs, rhs, pos, .. } => {
                assert_eq!(lhs.pos(), Position::new(1, 1));
                assert_eq!(pos, Position::new(1, 15));
                assert_eq!(rhs.pos(), Position::new(1, 18));
            }
            other => panic!("意外的语法树: {:?}", other),
        }
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let err = parse_rule("true true").unwrap_err();
        assert_eq!(err.pos, Position::new(1, 6));
    }

    #[test]
    fn test_incomplete_expression() {
        assert!(parse_rule("process.uid ==").is_err());
        assert!(parse_rule("(true").is_err());
        assert!(parse_rule("a not 3").is_err());
    }

    #[test]
    fn test_parse_macro_array() {
        let m = parse_macro(r#"[ "/etc/shadow", "/etc/passwd" ]"#).unwrap();
        assert!(matches!(m.expr, Expr::Array { .. }));
    }

    #[test]
    fn test_parse_macro_expression() {
        let m = parse_macro(r#"open.filename in [ "/etc/shadow" ]"#).unwrap();
        assert!(matches!(m.expr, Expr::Binary { op: BinaryOp::In, .. }));
    }
}
