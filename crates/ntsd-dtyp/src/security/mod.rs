//! MS-DTYP 2.4: security structures.

pub mod ace;
pub mod acl;
pub mod security_descriptor;
pub mod security_information;
pub mod sid;

pub use ace::*;
pub use acl::*;
pub use security_descriptor::*;
pub use security_information::*;
pub use sid::*;
