//! Assertions for step validation.
//!
//! A failed assertion is reported as [`HarnessError::AssertionFailed`], the
//! test-failure signal the scenario runner distinguishes from harness errors.

use std::fmt::Debug;

use crate::result::{HarnessError, HarnessResult};

/// Result of an assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Human-readable message
    pub message: String,
}

impl AssertionResult {
    /// Create a passing assertion result
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
        }
    }

    /// Create a failing assertion result
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }

    /// Turn a failure into [`HarnessError::AssertionFailed`]
    pub fn into_result(self) -> HarnessResult<()> {
        if self.passed {
            Ok(())
        } else {
            Err(HarnessError::assertion(self.message))
        }
    }
}

/// Fail unless `condition` holds
pub fn assert_true(condition: bool, message: &str) -> HarnessResult<()> {
    let result = if condition {
        AssertionResult::pass()
    } else {
        AssertionResult::fail(message)
    };
    result.into_result()
}

/// Fail if `condition` holds
pub fn assert_false(condition: bool, message: &str) -> HarnessResult<()> {
    assert_true(!condition, message)
}

/// Unwrap `value`, failing with `message` when it is absent
pub fn assert_not_null<T>(value: Option<T>, message: &str) -> HarnessResult<T> {
    value.ok_or_else(|| HarnessError::assertion(message))
}

/// Fail unless `expected == actual`
pub fn assert_equals<T: PartialEq + Debug>(expected: &T, actual: &T) -> HarnessResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(HarnessError::assertion(format!(
            "expected {expected:?}, got {actual:?}"
        )))
    }
}

/// Unconditional failure
pub fn fail<T>(message: impl Into<String>) -> HarnessResult<T> {
    Err(HarnessError::assertion(message))
}
