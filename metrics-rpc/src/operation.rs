use std::fmt;

use serde::{Deserialize, Serialize};

/// Arithmetic operation kind.
///
/// On the wire the kind is a single byte. Codes this build does not know
/// decode to [`OperationKind::Unknown`] rather than failing the whole frame,
/// so the call still reaches the service and is rejected there.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum OperationKind {
    Sum,
    Subtract,
    Unknown(u8),
}

impl OperationKind {
    const SUM: u8 = 0;
    const SUBTRACT: u8 = 1;
}

impl From<u8> for OperationKind {
    fn from(code: u8) -> Self {
        match code {
            Self::SUM => OperationKind::Sum,
            Self::SUBTRACT => OperationKind::Subtract,
            other => OperationKind::Unknown(other),
        }
    }
}

impl From<OperationKind> for u8 {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Sum => OperationKind::SUM,
            OperationKind::Subtract => OperationKind::SUBTRACT,
            OperationKind::Unknown(code) => code,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Sum => f.write_str("SUM"),
            OperationKind::Subtract => f.write_str("SUBTRACT"),
            OperationKind::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

/// Immutable arithmetic request: a kind and two operands.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    kind: OperationKind,
    operand1: f64,
    operand2: f64,
}

impl Operation {
    pub fn new(kind: OperationKind, operand1: f64, operand2: f64) -> Self {
        Self {
            kind,
            operand1,
            operand2,
        }
    }

    pub fn sum(operand1: f64, operand2: f64) -> Self {
        Self::new(OperationKind::Sum, operand1, operand2)
    }

    pub fn subtract(operand1: f64, operand2: f64) -> Self {
        Self::new(OperationKind::Subtract, operand1, operand2)
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn operand1(&self) -> f64 {
        self.operand1
    }

    pub fn operand2(&self) -> f64 {
        self.operand2
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.kind, self.operand1, self.operand2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(u8::from(OperationKind::Sum), 0);
        assert_eq!(u8::from(OperationKind::Subtract), 1);
        assert_eq!(OperationKind::from(0), OperationKind::Sum);
        assert_eq!(OperationKind::from(1), OperationKind::Subtract);
        assert_eq!(OperationKind::from(42), OperationKind::Unknown(42));
    }

    #[test]
    fn displays_kind_and_operands() {
        assert_eq!(Operation::sum(10.0, 5.0).to_string(), "SUM(10, 5)");
        assert_eq!(Operation::subtract(1.5, 4.0).to_string(), "SUBTRACT(1.5, 4)");
        assert_eq!(
            Operation::new(OperationKind::Unknown(7), 1.0, 2.0).to_string(),
            "UNKNOWN(7)(1, 2)"
        );
    }
}
