//! The "user cannot change password" setting, stored as object ACEs on the user's DACL.

use log::debug;
use ntsd_dtyp::{ACE, AccessMask, AceType, Guid, SID, SecurityDescriptor};

use crate::{DaclError, Result};

/// Schema GUID of the `User-Change-Password` extended right.
pub const USER_CHANGE_PASSWORD_GUID: Guid = Guid::from_fields(
    0xab721a53,
    0x1e2f,
    0x11d0,
    [0x98, 0x19, 0x00, 0xaa, 0x00, 0x40, 0x52, 0x9b],
);

fn trustees() -> [SID; 2] {
    [SID::everyone(), SID::self_sid()]
}

fn is_change_password_ace(ace: &ACE) -> bool {
    matches!(
        ace.ace_type(),
        AceType::AccessAllowedObject | AceType::AccessDeniedObject
    ) && ace.object_type() == Some(USER_CHANGE_PASSWORD_GUID)
}

/// Whether Everyone or Self is denied the change-password right.
pub fn is_user_cannot_change_password(sd: &SecurityDescriptor) -> bool {
    let Some(dacl) = &sd.dacl else {
        return false;
    };
    let trustees = trustees();
    dacl.ace.iter().any(|ace| {
        ace.ace_type() == AceType::AccessDeniedObject
            && is_change_password_ace(ace)
            && trustees.contains(ace.sid())
    })
}

/// Denies (`cannot`) or allows the change-password right to Everyone and Self.
///
/// The first existing ACE for each trustee has its type flipped, missing ones are added.
/// Either way the ACE goes through [`ACL::insert_ace`](ntsd_dtyp::ACL::insert_ace),
/// keeping the canonical order.
pub fn set_user_cannot_change_password(sd: &mut SecurityDescriptor, cannot: bool) -> Result<()> {
    let dacl = sd.dacl.as_mut().ok_or(DaclError::MissingDacl)?;
    let ace_type = if cannot {
        AceType::AccessDeniedObject
    } else {
        AceType::AccessAllowedObject
    };

    for trustee in trustees() {
        let existing = dacl
            .ace
            .iter()
            .position(|ace| is_change_password_ace(ace) && ace.sid() == &trustee);
        let ace = match existing {
            Some(i) => {
                let ace = dacl.ace.remove(i);
                debug!("Setting change-password ACE for {trustee} to {ace_type:?}");
                ace.to_builder().ace_type(ace_type).build()?
            }
            None => {
                debug!("Adding {ace_type:?} change-password ACE for {trustee}");
                ACE::builder(ace_type, trustee)
                    .access_mask(AccessMask::from(AccessMask::CONTROL_ACCESS))
                    .object_type(Some(USER_CHANGE_PASSWORD_GUID))
                    .build()?
            }
        };
        dacl.insert_ace(ace);
    }
    Ok(())
}
