//! Binary calculator: input validation, operation dispatch and the
//! post-success history hook.
//!
//! A request carries three untrusted text fields. [`compute`] turns them into
//! a [`CalculationResult`] without touching anything else; [`evaluate`] does
//! the same and then appends a [`CalculationRecord`] to the history store when
//! the caller is signed in and the calculation succeeded.

use crate::history::{CalculationRecord, HistoryStore};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default text for an operand that was not submitted at all.
pub const DEFAULT_OPERAND: &str = "0";

/// The four supported operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationTag {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl OperationTag {
    pub const ALL: [OperationTag; 4] = [
        OperationTag::Add,
        OperationTag::Subtract,
        OperationTag::Multiply,
        OperationTag::Divide,
    ];

    /// Resolves a form value. Matching is exact: `"Add"` is not `"add"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "add" => Some(OperationTag::Add),
            "subtract" => Some(OperationTag::Subtract),
            "multiply" => Some(OperationTag::Multiply),
            "divide" => Some(OperationTag::Divide),
            _ => None,
        }
    }

    /// Form value, also the name stored in history records.
    pub fn name(&self) -> &'static str {
        match self {
            OperationTag::Add => "add",
            OperationTag::Subtract => "subtract",
            OperationTag::Multiply => "multiply",
            OperationTag::Divide => "divide",
        }
    }

    /// Display symbol. Purely cosmetic.
    pub fn symbol(&self) -> &'static str {
        match self {
            OperationTag::Add => "+",
            OperationTag::Subtract => "-",
            OperationTag::Multiply => "*",
            OperationTag::Divide => "÷",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationTag::Add => "Addition",
            OperationTag::Subtract => "Subtraction",
            OperationTag::Multiply => "Multiplication",
            OperationTag::Divide => "Division",
        }
    }

    /// Applies the operation.
    ///
    /// Division by an exact zero is reported as [`ErrorKind::DivisionByZero`]
    /// before any floating-point division happens. A result that is not finite
    /// (overflow past `f64::MAX`) becomes [`ErrorKind::ComputationError`].
    pub fn apply(&self, lhs: f64, rhs: f64) -> Result<f64, ErrorKind> {
        let value = match self {
            OperationTag::Add => lhs + rhs,
            OperationTag::Subtract => lhs - rhs,
            OperationTag::Multiply => lhs * rhs,
            OperationTag::Divide => {
                if rhs == 0.0 {
                    return Err(ErrorKind::DivisionByZero);
                }
                lhs / rhs
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ErrorKind::ComputationError(
                "result is not a finite number".to_string(),
            ))
        }
    }
}

impl fmt::Display for OperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a calculation failed. `Display` is the message shown on the form.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("Invalid input: Please enter valid numbers")]
    InvalidInput,

    #[error("Invalid operation selected")]
    InvalidOperation,

    #[error("Division by zero is not allowed")]
    DivisionByZero,

    #[error("Calculation error: {0}")]
    ComputationError(String),
}

/// The signed-in user a successful calculation is recorded against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserReference(pub String);

impl UserReference {
    pub fn new(username: impl Into<String>) -> Self {
        UserReference(username.into())
    }

    pub fn username(&self) -> &str {
        &self.0
    }
}

/// Raw calculator form. Field names match the HTML form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalculationRequest {
    pub number_one: Option<String>,
    pub number_two: Option<String>,
    pub operation: Option<String>,
}

impl CalculationRequest {
    pub fn new(number_one: &str, number_two: &str, operation: &str) -> Self {
        CalculationRequest {
            number_one: Some(number_one.to_string()),
            number_two: Some(number_two.to_string()),
            operation: Some(operation.to_string()),
        }
    }

    fn raw_operand_one(&self) -> &str {
        self.number_one.as_deref().unwrap_or(DEFAULT_OPERAND)
    }

    fn raw_operand_two(&self) -> &str {
        self.number_two.as_deref().unwrap_or(DEFAULT_OPERAND)
    }

    fn raw_operation(&self) -> &str {
        self.operation.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalculationResult {
    Success {
        operand1: f64,
        operand2: f64,
        operation: OperationTag,
        value: f64,
    },
    /// Echoed fields hold what the form should show again: the raw text for
    /// `InvalidInput`, the parsed numbers otherwise.
    Failure {
        kind: ErrorKind,
        echoed_operand1: String,
        echoed_operand2: String,
        echoed_operation: String,
    },
}

impl CalculationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CalculationResult::Success { .. })
    }

    pub fn error_kind(&self) -> Option<&ErrorKind> {
        match self {
            CalculationResult::Failure { kind, .. } => Some(kind),
            CalculationResult::Success { .. } => None,
        }
    }

    /// Payload handed to the calculator template.
    pub fn view(&self) -> CalculatorView {
        match self {
            CalculationResult::Success {
                operation, value, ..
            } => CalculatorView::Success {
                result: format_number(*value),
                operation_symbol: operation.symbol(),
            },
            CalculationResult::Failure {
                kind,
                echoed_operand1,
                echoed_operand2,
                echoed_operation,
            } => CalculatorView::Failure {
                error: kind.to_string(),
                number_one: echoed_operand1.clone(),
                number_two: echoed_operand2.clone(),
                operation: echoed_operation.clone(),
            },
        }
    }

    fn failure(kind: ErrorKind, operand1: String, operand2: String, operation: &str) -> Self {
        CalculationResult::Failure {
            kind,
            echoed_operand1: operand1,
            echoed_operand2: operand2,
            echoed_operation: operation.to_string(),
        }
    }
}

/// What the rendering layer sees. Success clears the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CalculatorView {
    Success {
        result: String,
        operation_symbol: &'static str,
    },
    Failure {
        error: String,
        number_one: String,
        number_two: String,
        operation: String,
    },
}

/// Parses an operand. Surrounding whitespace is ignored; `inf`, `nan` and
/// literals that overflow `f64` are rejected.
pub fn parse_operand(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Shortest text that reads back as `value`, switching to exponent notation
/// outside `1e-5..1e16` so extreme magnitudes stay short.
pub fn format_number(value: f64) -> String {
    let magnitude = value.abs();
    if value != 0.0 && value.is_finite() && !(1e-5..1e16).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

/// Validates and computes without side effects.
pub fn compute(request: &CalculationRequest) -> CalculationResult {
    let raw_one = request.raw_operand_one();
    let raw_two = request.raw_operand_two();
    let raw_operation = request.raw_operation();

    let (operand1, operand2) = match (parse_operand(raw_one), parse_operand(raw_two)) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return CalculationResult::failure(
                ErrorKind::InvalidInput,
                raw_one.to_string(),
                raw_two.to_string(),
                raw_operation,
            );
        }
    };

    let Some(operation) = OperationTag::from_name(raw_operation) else {
        return CalculationResult::failure(
            ErrorKind::InvalidOperation,
            format_number(operand1),
            format_number(operand2),
            raw_operation,
        );
    };

    match operation.apply(operand1, operand2) {
        Ok(value) => CalculationResult::Success {
            operand1,
            operand2,
            operation,
            value,
        },
        Err(kind) => CalculationResult::failure(
            kind,
            format_number(operand1),
            format_number(operand2),
            operation.name(),
        ),
    }
}

/// Computes the request and, for a signed-in user, records a success in the
/// history store. A store failure is logged and does not change the result.
pub fn evaluate(
    request: &CalculationRequest,
    user: Option<&UserReference>,
    store: &dyn HistoryStore,
) -> CalculationResult {
    let result = compute(request);

    match (&result, user) {
        (
            CalculationResult::Success {
                operand1,
                operand2,
                operation,
                value,
            },
            Some(user),
        ) => {
            let record = CalculationRecord::new(user, *operand1, *operand2, *operation, *value);
            if let Err(e) = store.append(record) {
                warn!(
                    "failed to record calculation for {}: {}",
                    user.username(),
                    e
                );
            }
            debug!(
                "{} {} {} = {} (recorded for {})",
                operand1,
                operation.symbol(),
                operand2,
                value,
                user.username()
            );
        }
        (CalculationResult::Success { value, .. }, None) => {
            debug!("anonymous calculation = {}", value);
        }
        (CalculationResult::Failure { kind, .. }, _) => {
            debug!("calculation rejected: {:?}", kind);
        }
    }

    result
}
