//! MS-DTYP security data types for `ntsd-rs`.
//!
//! Wire codecs for SIDs, ACEs, ACLs and self-relative security descriptors, along with
//! the small byte utilities and GUID type they are built on.
#![forbid(unsafe_code)]

pub mod binrw_util;
pub mod bytes;
pub mod error;
pub mod guid;
pub mod security;

pub use binrw_util::WireFormat;
pub use error::DtypError;
pub use guid::Guid;
pub use security::*;

pub use ntsd_dtyp_derive::mbitfield;

/// Result type for MS-DTYP operations.
pub type Result<T> = std::result::Result<T, DtypError>;
