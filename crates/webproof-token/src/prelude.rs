//! Prelude module - commonly used types for convenient import.
//!
//! Use `use webproof_token::prelude::*;` to import all essential types.

// Errors
pub use crate::{TokenError, TokenResult};

// Token data and operations
pub use crate::{SignatureConfig, SignatureData, UnixSeconds, issue, verify};

// URL patterns
pub use crate::{PatternKind, classify, is_url_allowed};

// Constants
pub use crate::{DEFAULT_EXPIRY_HOURS, MAX_EXPIRY_HOURS};
