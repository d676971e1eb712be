//! DACL role assertions.
//!
//! An [`AdRoleAssertion`] bundles the rights a principal must hold on a directory object.
//! [`DaclAssertor`] checks it against the object's DACL, taking group membership,
//! the Everyone principal and explicit denials into account.
#![forbid(unsafe_code)]

pub mod assertion;
pub mod assertor;
pub mod error;
pub mod password;
pub mod roles;
pub mod source;

pub use assertion::{AceAssertion, AdRoleAssertion};
pub use assertor::DaclAssertor;
pub use error::DaclError;
pub use source::DirectorySearch;

/// Result type for DACL operations.
pub type Result<T> = std::result::Result<T, DaclError>;
