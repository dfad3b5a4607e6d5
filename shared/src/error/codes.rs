//! Unified error codes for the pricing engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Rule configuration errors
//! - 2xxx: Resolution errors
//! - 3xxx: Coupon errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so they serialize compactly
/// and stay stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Required field is missing
    RequiredField = 5,

    // ==================== 1xxx: Rule configuration ====================
    /// Scope entries missing for the chosen apply_on
    ScopeEntriesMissing = 1001,
    /// Party value missing for the chosen applicable_for
    ApplicableForValueMissing = 1002,
    /// Threshold bounds inverted (min > max)
    InvalidThreshold = 1003,
    /// Validity window inverted (valid_from > valid_upto)
    InvalidValidity = 1004,
    /// Recursive free item rule without recurse_for
    RecurseForMissing = 1005,
    /// Discount percentage outside 0..=100
    InvalidDiscountPercentage = 1006,

    // ==================== 2xxx: Resolution ====================
    /// More than one rule remains after disambiguation
    PricingRuleConflict = 2001,
    /// Product discount rule without a resolvable free item
    FreeItemNotSet = 2002,
    /// Hierarchy value unknown to the catalog
    InvalidGroup = 2003,

    // ==================== 3xxx: Coupon ====================
    /// Coupon code not found
    CouponNotFound = 3001,
    /// Coupon validity has not started
    CouponNotStarted = 3002,
    /// Coupon validity has ended
    CouponExpired = 3003,
    /// Coupon usage limit reached
    CouponExhausted = 3004,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Storage error
    StorageError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::RequiredField => "Required field is missing",

            ErrorCode::ScopeEntriesMissing => "Pricing rule has no scope entries",
            ErrorCode::ApplicableForValueMissing => "Applicable for value is missing",
            ErrorCode::InvalidThreshold => "Minimum threshold exceeds maximum",
            ErrorCode::InvalidValidity => "Valid from date is after valid upto date",
            ErrorCode::RecurseForMissing => "Recursive rule requires recurse for",
            ErrorCode::InvalidDiscountPercentage => "Discount percentage must be within 0 and 100",

            ErrorCode::PricingRuleConflict => "Multiple pricing rules exist with same criteria",
            ErrorCode::FreeItemNotSet => "Free item not set in the pricing rule",
            ErrorCode::InvalidGroup => "Invalid group",

            ErrorCode::CouponNotFound => "Coupon code not found",
            ErrorCode::CouponNotStarted => "Coupon code is not valid yet",
            ErrorCode::CouponExpired => "Coupon code has expired",
            ErrorCode::CouponExhausted => "Coupon code usage limit reached",

            ErrorCode::InternalError => "Internal error",
            ErrorCode::StorageError => "Storage error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::RequiredField),

            1001 => Ok(ErrorCode::ScopeEntriesMissing),
            1002 => Ok(ErrorCode::ApplicableForValueMissing),
            1003 => Ok(ErrorCode::InvalidThreshold),
            1004 => Ok(ErrorCode::InvalidValidity),
            1005 => Ok(ErrorCode::RecurseForMissing),
            1006 => Ok(ErrorCode::InvalidDiscountPercentage),

            2001 => Ok(ErrorCode::PricingRuleConflict),
            2002 => Ok(ErrorCode::FreeItemNotSet),
            2003 => Ok(ErrorCode::InvalidGroup),

            3001 => Ok(ErrorCode::CouponNotFound),
            3002 => Ok(ErrorCode::CouponNotStarted),
            3003 => Ok(ErrorCode::CouponExpired),
            3004 => Ok(ErrorCode::CouponExhausted),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::StorageError),
            9003 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
