//! Common test utilities for conversion testing.
//!
//! This module provides assertion macros, fixture loading and document
//! builders shared by every integration test.

use openapi_convert::{ErrorKind, SchemaError};

pub mod builders;
pub mod fixtures;

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `(path, kind)` of every error, sorted for order independent comparison.
pub fn failures(error: &SchemaError) -> Vec<(String, ErrorKind)> {
    let mut pairs: Vec<(String, ErrorKind)> = error
        .errors()
        .iter()
        .map(|error| (error.path.to_string(), error.kind))
        .collect();
    pairs.sort();
    pairs
}

/// Assert that a conversion failed with an error of `kind` at `path`.
#[macro_export]
macro_rules! assert_conversion_error {
    ($result:expr, $path:expr, $kind:expr) => {
        match $result {
            Err(error) => assert!(
                error
                    .errors()
                    .iter()
                    .any(|e| e.path.to_string() == $path && e.kind == $kind),
                "Expected {:?} at '{}', got:\n{}",
                $kind,
                $path,
                error
            ),
            Ok(converted) => panic!(
                "Expected {:?} at '{}', but conversion produced {:?}",
                $kind, $path, converted.value
            ),
        }
    };
}

/// Assert that a conversion failed with exactly one error.
#[macro_export]
macro_rules! assert_single_error {
    ($result:expr, $path:expr, $kind:expr) => {
        match $result {
            Err(error) => {
                assert_eq!(error.len(), 1, "Expected a single error, got:\n{}", error);
                let found = &error.errors()[0];
                assert_eq!((found.path.to_string(), found.kind), ($path.to_string(), $kind));
            }
            Ok(converted) => panic!(
                "Expected {:?} at '{}', but conversion produced {:?}",
                $kind, $path, converted.value
            ),
        }
    };
}

/// Assert that a conversion succeeded and rendered to `expected`.
#[macro_export]
macro_rules! assert_converted {
    ($result:expr, $expected:expr) => {
        match $result {
            Ok(converted) => {
                pretty_assertions::assert_eq!(converted.value.to_json(), $expected)
            }
            Err(error) => panic!("Expected conversion to succeed, got:\n{}", error),
        }
    };
}

/// Assert that an error message contains a substring.
#[macro_export]
macro_rules! assert_error_message_contains {
    ($result:expr, $substring:expr) => {
        match $result {
            Err(err) => assert!(
                err.to_string().contains($substring),
                "Error message '{}' does not contain '{}'",
                err.to_string(),
                $substring
            ),
            Ok(_) => panic!(
                "Expected error containing '{}', but conversion passed",
                $substring
            ),
        }
    };
}
