//! Constant payloads
//!
//! A constant is a (type, payload) pair; the type lives on the value node
//! and the payload here. Two constants are equal when both parts match,
//! regardless of arena identity.

use std::fmt;

/// The literal payload of a constant value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Integer(i64),
    String(String),
    Tuple(Vec<ConstantValue>),
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Integer(value) => write!(f, "{}", value),
            ConstantValue::String(value) => write!(f, "\"{}\"", value.escape_default()),
            ConstantValue::Tuple(elems) => {
                write!(f, "(")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ConstantValue::Integer(42).to_string(), "42");
        assert_eq!(
            ConstantValue::String("hi\n".to_string()).to_string(),
            "\"hi\\n\""
        );
        assert_eq!(
            ConstantValue::Tuple(vec![
                ConstantValue::Integer(1),
                ConstantValue::Integer(2),
            ])
            .to_string(),
            "(1, 2)"
        );
    }
}
