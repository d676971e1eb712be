//! Predefined role assertions.

use ntsd_dtyp::{AccessMask, AceFlag, Guid, SID};

use crate::{AceAssertion, AdRoleAssertion};

/// Schema GUID of `CN=Computer,CN=Schema,CN=Configuration` objects.
pub const COMPUTER_SCHEMA_ID_GUID: Guid = Guid::from_fields(
    0xbf967a86,
    0x0de6,
    0x11d0,
    [0xa2, 0x85, 0x00, 0xaa, 0x00, 0x30, 0x49, 0xe2],
);

/// Schema GUID of the `User-Force-Change-Password` extended right ("reset password").
pub const RESET_PASSWORD_CR_GUID: Guid = Guid::from_fields(
    0x00299570,
    0x246d,
    0x11d0,
    [0xa7, 0x68, 0x00, 0xaa, 0x00, 0x6e, 0x05, 0x29],
);

/// The rights needed to join computers to, and remove them from, a container and its
/// children, including resetting computer passwords.
pub fn domain_join_assertions() -> Vec<AceAssertion> {
    let inheritable = |right: u32| {
        AceAssertion::new(AccessMask::from(right)).with_required_flag(AceFlag::ContainerInherit)
    };
    vec![
        // create computer
        inheritable(AccessMask::CREATE_CHILD)
            .with_object_type(COMPUTER_SCHEMA_ID_GUID)
            .with_excluded_flag(AceFlag::InheritOnly),
        // delete computer
        inheritable(AccessMask::DELETE_CHILD)
            .with_object_type(COMPUTER_SCHEMA_ID_GUID)
            .with_excluded_flag(AceFlag::InheritOnly),
        inheritable(AccessMask::LIST_CHILDREN).with_excluded_flag(AceFlag::InheritOnly),
        inheritable(AccessMask::READ_PROPERTY).with_excluded_flag(AceFlag::InheritOnly),
        inheritable(AccessMask::WRITE_PROPERTY),
        inheritable(AccessMask::READ_CONTROL).with_excluded_flag(AceFlag::InheritOnly),
        // reset password
        inheritable(AccessMask::CONTROL_ACCESS)
            .with_object_type(RESET_PASSWORD_CR_GUID)
            .with_inherited_object_type(COMPUTER_SCHEMA_ID_GUID),
    ]
}

/// Domain join role for `principal`.
///
/// `token_groups` are searched when the principal is a user and does not meet all the
/// criteria itself.
pub fn domain_join(principal: SID, is_group: bool, token_groups: Option<Vec<SID>>) -> AdRoleAssertion {
    AdRoleAssertion::new(
        domain_join_assertions(),
        Some(principal),
        is_group,
        token_groups,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_join_assertions() {
        let assertions = domain_join_assertions();
        assert_eq!(assertions.len(), 7);
        let rights: Vec<u32> = assertions.iter().map(|a| a.right().bits()).collect();
        assert_eq!(
            rights,
            vec![0x1, 0x2, 0x4, 0x10, 0x20, 0x20000, 0x100]
        );
        assert!(
            assertions
                .iter()
                .all(|a| a.required_flag() == Some(AceFlag::ContainerInherit))
        );
        assert_eq!(assertions[4].excluded_flag(), None);
        assert_eq!(assertions[6].excluded_flag(), None);
        assert_eq!(assertions[6].object_flags().unwrap().bits(), 0x3);
        assert_eq!(
            RESET_PASSWORD_CR_GUID.to_string(),
            "00299570-246d-11d0-a768-00aa006e0529"
        );
        assert_eq!(
            COMPUTER_SCHEMA_ID_GUID.to_string(),
            "bf967a86-0de6-11d0-a285-00aa003049e2"
        );
    }
}
