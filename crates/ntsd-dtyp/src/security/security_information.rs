//! MS-DTYP 2.4.7: SECURITY_INFORMATION

use modular_bitfield::prelude::*;

/// Selects the parts of a security descriptor to query or set.
#[ntsd_dtyp_derive::mbitfield]
pub struct SecurityInformation {
    pub owner: bool,
    pub group: bool,
    pub dacl: bool,
    pub sacl: bool,

    pub label: bool,
    pub attribute: bool,
    pub scope: bool,
    pub process_trust_label: bool,

    #[skip]
    __: B8,

    pub backup: bool,
    #[skip]
    __: B15,
}

impl SecurityInformation {
    /// Owner, group, DACL and SACL.
    pub fn all() -> Self {
        Self::new()
            .with_owner(true)
            .with_group(true)
            .with_dacl(true)
            .with_sacl(true)
    }

    pub fn bits(&self) -> u32 {
        u32::from_le_bytes(self.into_bytes())
    }
}
