use std::{fmt, sync::Arc};

use crate::{ast::BinOp, coerce::Coercion};

/// A compiled expression.
///
/// Expressions form a tree: every node owns its children. Once built, an
/// expression is immutable and can be evaluated from many threads at once
/// with [`Expression::calculate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    // Literals
    /// Numeric literal
    ///
    /// # Example
    /// ```text
    /// 42
    /// ```
    Float(f64),

    /// String literal, with escapes resolved
    ///
    /// # Example
    /// ```text
    /// "hello"
    /// ```
    String(String),

    /// Boolean literal
    Boolean(bool),

    /// Null literal
    Null,

    /// Field selector, split into path segments
    ///
    /// # Examples
    /// ```text
    /// .name                  // ["name"]
    /// .properties.employees  // ["properties", "employees"]
    /// ```
    Selector(Vec<String>),

    /// Binary operation (arithmetic, comparison, logical, string, membership)
    BinaryOp {
        op: BinOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    /// Logical negation
    ///
    /// # Example
    /// ```text
    /// !(.f1 != .f2)
    /// ```
    Not(Box<Expression>),

    /// Exclusive range test
    ///
    /// # Example
    /// ```text
    /// .age BETWEEN 18 AND 65
    /// ```
    Between {
        value: Box<Expression>,
        lower: Box<Expression>,
        upper: Box<Expression>,
    },

    /// Array literal
    ///
    /// # Example
    /// ```text
    /// ["a", .b, 3]
    /// ```
    Array(Vec<Expression>),

    /// Inner expression whose result is passed through a coercion
    ///
    /// # Example
    /// ```text
    /// COERCE .dt _datetime_
    /// ```
    Coerce {
        inner: Box<Expression>,
        coercion: CoercionRef,
        const_eligible: bool,
    },
}

impl Expression {
    pub fn binary(op: BinOp, left: Expression, right: Expression) -> Self {
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Wraps `inner` so that its result goes through `coercion`.
    pub fn coerce(inner: Expression, coercion: Arc<dyn Coercion>, const_eligible: bool) -> Self {
        Expression::Coerce {
            inner: Box::new(inner),
            coercion: CoercionRef(coercion),
            const_eligible,
        }
    }

    /// Whether the value of this expression does not depend on the document.
    ///
    /// Coerce nodes report the flag their installer returned.
    pub fn is_const_eligible(&self) -> bool {
        match self {
            Expression::Float(_)
            | Expression::String(_)
            | Expression::Boolean(_)
            | Expression::Null => true,
            Expression::Selector(_) => false,
            Expression::BinaryOp { left, right, .. } => {
                left.is_const_eligible() && right.is_const_eligible()
            }
            Expression::Not(inner) => inner.is_const_eligible(),
            Expression::Between {
                value,
                lower,
                upper,
            } => value.is_const_eligible() && lower.is_const_eligible() && upper.is_const_eligible(),
            Expression::Array(items) => items.iter().all(Expression::is_const_eligible),
            Expression::Coerce { const_eligible, .. } => *const_eligible,
        }
    }
}

/// Shared handle to a coercion captured at parse time.
///
/// Two handles compare equal when their coercions report the same name.
#[derive(Clone)]
pub struct CoercionRef(pub Arc<dyn Coercion>);

impl CoercionRef {
    pub fn name(&self) -> &str {
        self.0.name()
    }
}

impl fmt::Debug for CoercionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Coercion").field(&self.name()).finish()
    }
}

impl PartialEq for CoercionRef {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}
