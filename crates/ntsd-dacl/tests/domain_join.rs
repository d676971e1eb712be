use ntsd_dacl::{
    AdRoleAssertion, DaclAssertor, DaclError,
    roles::{self, COMPUTER_SCHEMA_ID_GUID, RESET_PASSWORD_CR_GUID},
};
use ntsd_dtyp::{
    ACE, ACL, AccessMask, AceFlag, AceFlags, AceType, AclRevision, SID, SecurityDescriptor,
    SecurityDescriptorControl, WireFormat,
};

const DOMAIN: &str = "S-1-5-21-1835709989-2027683138-697581538";

fn domain_sid(rid: u32) -> SID {
    format!("{DOMAIN}-{rid}").parse().unwrap()
}

fn user() -> SID {
    domain_sid(1139)
}

fn join_group() -> SID {
    domain_sid(1440)
}

fn token_groups() -> Option<Vec<SID>> {
    Some(vec![domain_sid(513), domain_sid(1107), join_group()])
}

fn ci() -> AceFlags {
    AceFlags::new().with_container_inherit(true)
}

fn ci_io() -> AceFlags {
    ci().with_inherit_only(true)
}

fn object_ace(trustee: SID, flags: AceFlags, rights: u32) -> ntsd_dtyp::AceBuilder {
    ACE::builder(AceType::AccessAllowedObject, trustee)
        .flags(flags)
        .access_mask(AccessMask::from(rights))
}

/// A container DACL as delegated by the "join computers" wizard: the user may only
/// create computers, the group holds every right needed to join and remove them.
fn container_dacl() -> ACL {
    ACL::new(
        AclRevision::DS,
        vec![
            object_ace(user(), ci(), AccessMask::CREATE_CHILD)
                .object_type(Some(COMPUTER_SCHEMA_ID_GUID))
                .build()
                .unwrap(),
            object_ace(
                join_group(),
                ci(),
                AccessMask::CREATE_CHILD | AccessMask::DELETE_CHILD,
            )
            .object_type(Some(COMPUTER_SCHEMA_ID_GUID))
            .build()
            .unwrap(),
            ACE::builder(AceType::AccessAllowed, join_group())
                .flags(ci())
                .access_mask(AccessMask::from(
                    AccessMask::LIST_CHILDREN | AccessMask::READ_PROPERTY | AccessMask::READ_CONTROL,
                ))
                .build()
                .unwrap(),
            object_ace(join_group(), ci_io(), AccessMask::WRITE_PROPERTY)
                .inherited_object_type(Some(COMPUTER_SCHEMA_ID_GUID))
                .build()
                .unwrap(),
            object_ace(join_group(), ci_io(), AccessMask::CONTROL_ACCESS)
                .object_type(Some(RESET_PASSWORD_CR_GUID))
                .inherited_object_type(Some(COMPUTER_SCHEMA_ID_GUID))
                .build()
                .unwrap(),
            ACE::builder(AceType::AccessAllowed, SID::everyone())
                .access_mask(AccessMask::from(AccessMask::READ_PROPERTY))
                .build()
                .unwrap(),
        ],
    )
}

fn container_sd_bytes(dacl: ACL) -> Vec<u8> {
    let mut sd = SecurityDescriptor::new(
        SecurityDescriptorControl::new()
            .with_self_relative(true)
            .with_dacl_present(true),
    );
    sd.owner_sid = Some(domain_sid(512));
    sd.group_sid = Some(domain_sid(512));
    sd.dacl = Some(dacl);
    sd.to_wire().unwrap()
}

fn role() -> AdRoleAssertion {
    roles::domain_join(user(), false, token_groups())
}

#[test]
fn test_domain_join_negative() {
    let mut assertor = DaclAssertor::new(container_dacl(), false);
    assert!(!assertor.do_assert(&role()).unwrap());

    let unsatisfied = assertor.unsatisfied_assertions();
    assert_eq!(unsatisfied.len(), 6);
    // Only "create computer" is granted to the user directly.
    assert!(
        unsatisfied
            .iter()
            .all(|a| a.right().bits() != AccessMask::CREATE_CHILD)
    );
}

#[test]
fn test_domain_join_positive() {
    let mut assertor = DaclAssertor::new(container_dacl(), true);
    assert!(assertor.do_assert(&role()).unwrap());
    assert!(assertor.unsatisfied_assertions().is_empty());
}

#[test]
fn test_domain_join_group_principal() {
    let group_role = roles::domain_join(join_group(), true, None);
    let mut assertor = DaclAssertor::new(container_dacl(), true);
    assert!(assertor.do_assert(&group_role).unwrap());
}

#[test]
fn test_domain_join_without_token_groups() {
    let no_groups = roles::domain_join(user(), false, None);
    let mut assertor = DaclAssertor::new(container_dacl(), true);
    assert!(!assertor.do_assert(&no_groups).unwrap());
    assert_eq!(assertor.unsatisfied_assertions().len(), 6);
}

#[test]
fn test_domain_join_denial() {
    let mut dacl = container_dacl();
    dacl.insert_ace(
        ACE::builder(AceType::AccessDeniedObject, user())
            .access_mask(AccessMask::from(AccessMask::CREATE_CHILD))
            .object_type(Some(COMPUTER_SCHEMA_ID_GUID))
            .build()
            .unwrap(),
    );

    let mut assertor = DaclAssertor::new(dacl, true);
    assert!(!assertor.do_assert(&role()).unwrap());
    let unsatisfied = assertor.unsatisfied_assertions();
    assert_eq!(unsatisfied.len(), 1);
    assert_eq!(unsatisfied[0].right().bits(), AccessMask::CREATE_CHILD);
    assert_eq!(unsatisfied[0].object_type(), Some(COMPUTER_SCHEMA_ID_GUID));
}

#[test]
fn test_domain_join_inherited_denial_ignored() {
    let mut dacl = container_dacl();
    dacl.insert_ace(
        ACE::builder(AceType::AccessDeniedObject, user())
            .flag(AceFlag::Inherited)
            .access_mask(AccessMask::from(AccessMask::CREATE_CHILD))
            .object_type(Some(COMPUTER_SCHEMA_ID_GUID))
            .build()
            .unwrap(),
    );

    let mut assertor = DaclAssertor::new(dacl, true);
    assert!(assertor.do_assert(&role()).unwrap());
}

#[test]
fn test_domain_join_through_directory_search() {
    let sd = container_sd_bytes(container_dacl());
    let search = move |filter: &str| -> ntsd_dacl::Result<Vec<Vec<u8>>> {
        assert_eq!(filter, "(distinguishedName=OU=Computers,DC=example,DC=com)");
        Ok(vec![sd.clone()])
    };
    let mut assertor = DaclAssertor::with_search(
        "(distinguishedName=OU=Computers,DC=example,DC=com)",
        true,
        Box::new(search),
    );
    assert!(assertor.dacl().is_none());
    assert!(assertor.do_assert(&role()).unwrap());
    assert_eq!(assertor.dacl(), Some(&container_dacl()));
}

#[test]
fn test_directory_search_errors_propagate() {
    let nothing = |_: &str| -> ntsd_dacl::Result<Vec<Vec<u8>>> { Ok(vec![]) };
    let mut assertor = DaclAssertor::with_search("(cn=missing)", true, Box::new(nothing));
    assert!(matches!(
        assertor.do_assert(&role()),
        Err(DaclError::NotFound(_))
    ));

    let failing = |_: &str| -> ntsd_dacl::Result<Vec<Vec<u8>>> {
        Err(DaclError::Fetch("connection reset".into()))
    };
    let mut assertor = DaclAssertor::with_search("(cn=x)", true, Box::new(failing));
    assert!(matches!(
        assertor.do_assert(&role()),
        Err(DaclError::Fetch(_))
    ));
}

#[test]
fn test_descriptor_without_dacl_is_false() {
    let mut sd = SecurityDescriptor::new(SecurityDescriptorControl::new().with_self_relative(true));
    sd.owner_sid = Some(domain_sid(512));
    let bytes = sd.to_wire().unwrap();
    let search = move |_: &str| -> ntsd_dacl::Result<Vec<Vec<u8>>> { Ok(vec![bytes.clone()]) };

    let mut assertor = DaclAssertor::with_search("(cn=x)", true, Box::new(search));
    assert!(!assertor.do_assert(&role()).unwrap());
    assert_eq!(assertor.unsatisfied_assertions().len(), 7);
}
