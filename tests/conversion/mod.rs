//! Conversion tests module.
//!
//! Each module covers one family of schema features, compiled from
//! documents through the public API.

pub mod combinators;
pub mod documents;
pub mod objects;
pub mod properties;
pub mod references;

// Re-export commonly used test utilities
pub use crate::common::{
    builders::{DocumentBuilder, pointer},
    failures,
    fixtures::{fixture_compiler, fixture_uri, load_fixture, samples},
    init_logging,
};

// Re-export assertion macros
pub use crate::{
    assert_conversion_error, assert_converted, assert_error_message_contains, assert_single_error,
};
