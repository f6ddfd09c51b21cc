//! Shared test utilities for the subsetting workspace.
//!
//! - Time axis and data cube generators
//! - CMIP5-style fixtures: areas, grids, request dates, attributes
//! - Temporary output directories and listing of written chunks
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod outputs;

pub use fixtures::*;
pub use generators::*;
pub use outputs::*;

/// Assert that two numbers differ by at most `epsilon`.
///
/// Both sides are widened to `f64`, so `f32` cube values can be compared
/// with expected `f64` values.
///
/// ```
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(273.15f32, 273.15, 1e-4);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
