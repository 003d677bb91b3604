use crate::{
    error::ComputeError,
    operation::{Operation, OperationKind},
};

/// Evaluates an arithmetic operation.
pub fn compute(op: &Operation) -> Result<f64, ComputeError> {
    match op.kind() {
        OperationKind::Sum => Ok(op.operand1() + op.operand2()),
        OperationKind::Subtract => Ok(op.operand1() - op.operand2()),
        kind @ OperationKind::Unknown(_) => Err(ComputeError::UnsupportedOperation {
            kind: kind.to_string(),
        }),
    }
}
