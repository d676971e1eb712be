#![doc = include_str!("../../../README.md")]
#![forbid(unsafe_code)]

pub use ntsd_dacl as dacl;
pub use ntsd_dacl::{
    AceAssertion, AdRoleAssertion, DaclAssertor, DaclError, DirectorySearch, password, roles,
    source,
};
pub use ntsd_dtyp::*;

/// Decodes a self-relative security descriptor and logs its SDDL form.
pub fn parse_security_descriptor(data: &[u8]) -> Result<SecurityDescriptor> {
    let sd = SecurityDescriptor::from_wire(data)?;
    log::debug!("Parsed {} byte security descriptor: {sd}", data.len());
    Ok(sd)
}
