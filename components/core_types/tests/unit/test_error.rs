//! Unit tests for RuntimeError, ErrorKind and AggregateError

use core_types::{AggregateError, ErrorKind, RuntimeError, RuntimeResult};

#[cfg(test)]
mod error_kind_tests {
    use super::*;

    #[test]
    fn test_error_kind_type_error() {
        let kind = ErrorKind::TypeError;
        assert!(matches!(kind, ErrorKind::TypeError));
        assert_eq!(kind.to_string(), "TypeError");
    }

    #[test]
    fn test_error_kind_range_error() {
        assert_eq!(ErrorKind::RangeError.to_string(), "RangeError");
    }

    #[test]
    fn test_error_kind_internal_error() {
        assert_eq!(ErrorKind::InternalError.to_string(), "InternalError");
    }

    #[test]
    fn test_error_kind_is_copy() {
        let kind1 = ErrorKind::Timeout;
        let kind2 = kind1;
        assert_eq!(kind1, kind2);
    }
}

#[cfg(test)]
mod runtime_error_tests {
    use super::*;

    #[test]
    fn test_constructors_set_kind() {
        assert_eq!(RuntimeError::type_error("x").kind, ErrorKind::TypeError);
        assert_eq!(RuntimeError::range_error("x").kind, ErrorKind::RangeError);
        assert_eq!(RuntimeError::timeout("x").kind, ErrorKind::Timeout);
        assert_eq!(RuntimeError::custom("x").kind, ErrorKind::Custom);
        assert_eq!(RuntimeError::internal("x").kind, ErrorKind::InternalError);
    }

    #[test]
    fn test_message_accepts_owned_string() {
        let error = RuntimeError::custom(format!("job {} failed", 3));
        assert_eq!(error.message, "job 3 failed");
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let error = RuntimeError::timeout("fetch took too long");
        assert_eq!(error.to_string(), "TimeoutError: fetch took too long");
    }

    #[test]
    fn test_equality_compares_kind_and_message() {
        assert_eq!(RuntimeError::custom("a"), RuntimeError::custom("a"));
        assert_ne!(RuntimeError::custom("a"), RuntimeError::type_error("a"));
    }

    #[test]
    fn test_is_std_error() {
        let error: Box<dyn std::error::Error> = Box::new(RuntimeError::internal("boom"));
        assert_eq!(error.to_string(), "InternalError: boom");
    }

    #[test]
    fn test_runtime_result_propagates() {
        fn inner() -> RuntimeResult<i32> {
            Err(RuntimeError::range_error("too big"))
        }
        fn outer() -> RuntimeResult<i32> {
            let v = inner()?;
            Ok(v + 1)
        }
        assert_eq!(outer(), Err(RuntimeError::range_error("too big")));
    }
}

#[cfg(test)]
mod aggregate_error_tests {
    use super::*;

    #[test]
    fn test_preserves_order() {
        let error = AggregateError::new(vec![
            RuntimeError::custom("first"),
            RuntimeError::custom("second"),
        ]);
        assert_eq!(error.errors[0].message, "first");
        assert_eq!(error.errors[1].message, "second");
    }

    #[test]
    fn test_display_counts_reasons() {
        let error = AggregateError::new(vec![1, 2, 3]);
        assert_eq!(error.to_string(), "all 3 promises were rejected");
        assert_eq!(error.len(), 3);
        assert!(!error.is_empty());
    }
}

#[cfg(test)]
mod serde_tests {
    use super::*;

    #[test]
    fn test_runtime_error_serializes_kind_and_message() {
        let json = serde_json::to_string(&RuntimeError::custom("e")).unwrap();
        assert_eq!(json, r#"{"kind":"Custom","message":"e"}"#);
    }

    #[test]
    fn test_runtime_error_deserializes() {
        let error: RuntimeError =
            serde_json::from_str(r#"{"kind":"Timeout","message":"slow"}"#).unwrap();
        assert_eq!(error, RuntimeError::timeout("slow"));
    }
}
