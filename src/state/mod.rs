//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `ErrorType`: failure taxonomy plus the retryability classifier
//! - `ThrottleState`: adaptive inter-request spacing shared by all workers
//! - `DiscoveryOutcome` / `SourceMethod`: how a company's URLs were found

mod error_type;
mod strategy;
mod throttle_state;

// Re-export main types
pub use error_type::{
    classify, is_retryable, is_retryable_status, Classification, ErrorType, FailureCategory,
    RETRYABLE_STATUS_CODES,
};
pub use strategy::{DiscoveryOutcome, SourceMethod};
pub use throttle_state::{adaptive_delay_for, ThrottleState};
