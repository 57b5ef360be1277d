//! Stable identities for classes, fields and methods of a [`crate::classfile::ClassPool`].
//!
//! Every entity the class pool owns is identified by a [`Token`]. Tokens are assigned once,
//! when a class is added to the pool, and never change afterwards; the fact store keys its
//! side tables by them.

use std::fmt;
use std::hash::{Hash, Hasher};

use strum::{Display, FromRepr};

/// The kind of entity a [`Token`] refers to, stored in its high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum TokenKind {
    /// A program or library class
    Class = 0x02,
    /// A field declared by a class
    Field = 0x04,
    /// A method declared by a class
    Method = 0x06,
}

/// A token identifying one entity of the resolved program.
///
/// Tokens consist of a 32-bit value where:
/// - The high byte (bits 24-31) indicates the [`TokenKind`]
/// - The low 24 bits (bits 0-23) indicate the row, assigned in insertion order
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a class token for the given row
    #[must_use]
    pub fn class(row: u32) -> Self {
        Self::with_kind(TokenKind::Class, row)
    }

    /// Creates a field token for the given row
    #[must_use]
    pub fn field(row: u32) -> Self {
        Self::with_kind(TokenKind::Field, row)
    }

    /// Creates a method token for the given row
    #[must_use]
    pub fn method(row: u32) -> Self {
        Self::with_kind(TokenKind::Method, row)
    }

    fn with_kind(kind: TokenKind, row: u32) -> Self {
        Token(((kind as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the kind byte from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the entity kind, if the high byte holds a known one
    #[must_use]
    pub fn kind(&self) -> Option<TokenKind> {
        TokenKind::from_repr(self.table())
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if this token identifies a class
    #[must_use]
    pub fn is_class(&self) -> bool {
        self.kind() == Some(TokenKind::Class)
    }

    /// Returns true if this token identifies a field or a method
    #[must_use]
    pub fn is_member(&self) -> bool {
        matches!(self.kind(), Some(TokenKind::Field | TokenKind::Method))
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_token_constructors() {
        let class = Token::class(1);
        assert_eq!(class.value(), 0x02000001);
        assert_eq!(class.kind(), Some(TokenKind::Class));
        assert!(class.is_class());
        assert!(!class.is_member());

        let field = Token::field(5);
        assert_eq!(field.value(), 0x04000005);
        assert_eq!(field.kind(), Some(TokenKind::Field));
        assert!(field.is_member());

        let method = Token::method(0x00FFFFFF);
        assert_eq!(method.value(), 0x06FFFFFF);
        assert_eq!(method.kind(), Some(TokenKind::Method));
        assert!(method.is_member());
    }

    #[test]
    fn test_token_row_is_truncated() {
        let token = Token::method(0x01000002);
        assert_eq!(token.table(), 0x06);
        assert_eq!(token.row(), 2);
    }

    #[test]
    fn test_token_unknown_kind() {
        let token = Token(0x0A000001);
        assert_eq!(token.kind(), None);
        assert!(!token.is_class());
        assert!(!token.is_member());
    }

    #[test]
    fn test_token_is_null() {
        assert!(Token(0).is_null());
        assert!(!Token::class(1).is_null());
    }

    #[test]
    fn test_token_from_conversion() {
        let value = 0x06000001u32;
        let token: Token = value.into();
        assert_eq!(token.value(), value);

        let back_to_u32: u32 = token.into();
        assert_eq!(back_to_u32, value);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(format!("{}", Token::method(1)), "0x06000001");
        assert_eq!(format!("{}", Token(0)), "0x00000000");
    }

    #[test]
    fn test_token_debug() {
        let debug_str = format!("{:?}", Token::method(1));
        assert!(debug_str.contains("Token(0x06000001"));
        assert!(debug_str.contains("table: 0x06"));
        assert!(debug_str.contains("row: 1"));
    }

    #[test]
    fn test_token_ordering() {
        assert!(Token::class(1) < Token::class(2));
        assert!(Token::class(9) < Token::field(1));
        assert!(Token::field(9) < Token::method(1));
    }

    #[test]
    fn test_token_hash() {
        let mut map = HashMap::new();
        map.insert(Token::method(1), "first");
        map.insert(Token::method(2), "second");

        assert_eq!(map.get(&Token::method(1)), Some(&"first"));
        assert_eq!(map.get(&Token::method(2)), Some(&"second"));
        assert_eq!(map.get(&Token::field(1)), None);
    }

    #[test]
    fn test_token_kind_display() {
        assert_eq!(TokenKind::Class.to_string(), "Class");
        assert_eq!(TokenKind::Method.to_string(), "Method");
    }
}
