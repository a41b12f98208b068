//! IAM Policy Documents
//!
//! Value model for IAM policy documents as they appear in CloudFormation
//! templates, with the two polymorphic wire shapes AWS accepts:
//! - `Statement` may be a single object or an array of objects
//! - `Principal` may be the bare string `"*"` or a structured object
//!
//! Decoding always normalizes to the canonical in-memory form (a statement
//! list, a structured principal). Encoding picks the wire shape from the value.

pub mod document;
pub mod error;
pub mod principal;
pub mod statement;

mod string_list;

pub use document::PolicyDocument;
pub use error::IamError;
pub use principal::Principal;
pub use statement::Statement;

/// Policy language version used by every AWS-managed document.
pub const POLICY_VERSION: &str = "2012-10-17";
