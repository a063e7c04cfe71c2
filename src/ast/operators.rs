use std::fmt;

/// Binary operators.
///
/// There is no precedence between them: the parser groups strictly left to
/// right, except that [`BinOp::And`] and [`BinOp::Or`] take the rest of the
/// current group as their right operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Comparison
    /// Deep equality (`==`)
    Equal,
    /// Deep inequality (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Arithmetic
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,

    // Logical
    /// Logical AND (`&&` or `AND`)
    And,
    /// Logical OR (`||` or `OR`)
    Or,

    // String and collection predicates
    /// `CONTAINS`
    Contains,
    /// `CONTAINS_ANY`
    ContainsAny,
    /// `CONTAINS_ALL`
    ContainsAll,
    /// `STARTSWITH`
    StartsWith,
    /// `ENDSWITH`
    EndsWith,
    /// Membership in a list (`IN`)
    In,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Equal => "==",
            BinOp::NotEqual => "!=",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessEqual => "<=",
            BinOp::GreaterEqual => ">=",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Contains => "CONTAINS",
            BinOp::ContainsAny => "CONTAINS_ANY",
            BinOp::ContainsAll => "CONTAINS_ALL",
            BinOp::StartsWith => "STARTSWITH",
            BinOp::EndsWith => "ENDSWITH",
            BinOp::In => "IN",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
