use std::fmt;
use std::hash::{Hash, Hasher};

/// A handle referencing a class, method or field definition of a [`crate::program::Program`].
///
/// Tokens consist of a 32-bit value where:
/// - The high byte (bits 24-31) indicates the definition table (class, method or field)
/// - The low 24 bits (bits 0-23) indicate the 1-based row within that table
///
/// Tokens are totally ordered. Sorting by token orders by table first and definition order
/// second, which is the canonical item order used for every deterministic output of the
/// analysis.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    /// Table id of class definitions
    pub const CLASS_TABLE: u8 = 0x02;
    /// Table id of field definitions
    pub const FIELD_TABLE: u8 = 0x04;
    /// Table id of method definitions
    pub const METHOD_TABLE: u8 = 0x06;

    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token from a table id and a 1-based row
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// Creates the token of the class at the given 0-based index
    #[must_use]
    pub fn class(index: usize) -> Self {
        Self::from_parts(Self::CLASS_TABLE, index as u32 + 1)
    }

    /// Creates the token of the method at the given 0-based index
    #[must_use]
    pub fn method(index: usize) -> Self {
        Self::from_parts(Self::METHOD_TABLE, index as u32 + 1)
    }

    /// Creates the token of the field at the given 0-based index
    #[must_use]
    pub fn field(index: usize) -> Self {
        Self::from_parts(Self::FIELD_TABLE, index as u32 + 1)
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table type from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns the 0-based index into the definition table, `None` for a null row
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        (self.row() as usize).checked_sub(1)
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if this token references a class definition
    #[must_use]
    pub fn is_class(&self) -> bool {
        self.table() == Self::CLASS_TABLE
    }

    /// Returns true if this token references a method definition
    #[must_use]
    pub fn is_method(&self) -> bool {
        self.table() == Self::METHOD_TABLE
    }

    /// Returns true if this token references a field definition
    #[must_use]
    pub fn is_field(&self) -> bool {
        self.table() == Self::FIELD_TABLE
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

    #[test]
    fn test_token_parts() {
        let token = Token::method(0);
        assert_eq!(token.value(), 0x06000001);
        assert_eq!(token.table(), Token::METHOD_TABLE);
        assert_eq!(token.row(), 1);
        assert_eq!(token.index(), Some(0));
        assert!(token.is_method());
        assert!(!token.is_class());
    }

    #[test]
    fn test_token_kinds() {
        assert!(Token::class(4).is_class());
        assert!(Token::field(4).is_field());
        assert_eq!(Token::class(4).row(), 5);
    }

    #[test]
    fn test_token_is_null() {
        assert!(Token(0).is_null());
        assert_eq!(Token(0).index(), None);
        assert!(!Token::class(0).is_null());
    }

    #[test]
    fn test_token_display() {
        assert_eq!(format!("{}", Token::method(0)), "0x06000001");
        let debug_str = format!("{:?}", Token::method(0));
        assert!(debug_str.contains("table: 0x06"));
        assert!(debug_str.contains("row: 1"));
    }

    #[test]
    fn test_token_ordering() {
        // classes sort before fields, fields before methods
        assert!(Token::class(100) < Token::field(0));
        assert!(Token::field(100) < Token::method(0));
        assert!(Token::method(0) < Token::method(1));
    }
}
