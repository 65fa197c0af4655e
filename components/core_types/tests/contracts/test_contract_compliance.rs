//! Contract compliance tests for core_types
//!
//! These tests pin the public shape other components rely on.

use core_types::{AggregateError, ErrorKind, RuntimeError};

#[cfg(test)]
mod runtime_error_contract_tests {
    use super::*;

    #[test]
    fn test_runtime_error_has_kind_field() {
        let error = RuntimeError::custom("x");
        let _: &ErrorKind = &error.kind;
    }

    #[test]
    fn test_runtime_error_has_message_field() {
        let error = RuntimeError::custom("x");
        let _: &String = &error.message;
    }

    #[test]
    fn test_runtime_error_is_clone() {
        let error = RuntimeError::custom("x");
        let copy = error.clone();
        assert_eq!(error, copy);
    }

    #[test]
    fn test_runtime_error_struct_literal() {
        let error = RuntimeError {
            kind: ErrorKind::TypeError,
            message: "literal".to_string(),
        };
        assert_eq!(error, RuntimeError::type_error("literal"));
    }
}

#[cfg(test)]
mod aggregate_error_contract_tests {
    use super::*;

    #[test]
    fn test_aggregate_error_has_errors_field() {
        let error = AggregateError::new(vec![RuntimeError::custom("x")]);
        let _: &Vec<RuntimeError> = &error.errors;
    }

    #[test]
    fn test_aggregate_error_is_std_error() {
        let error = AggregateError::new(vec![RuntimeError::custom("x")]);
        let _: &dyn std::error::Error = &error;
    }
}
