//! MS-DTYP 2.4.5: ACL

use std::fmt;

use binrw::{
    Endian,
    io::{Read, Seek, SeekFrom, Write},
    prelude::*,
};

use log::{trace, warn};

use crate::binrw_util::{ensure_available, format_error};

use super::{ACE, AceType};

/// Access control list - [MS-DTYP 2.4.5](<https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-dtyp/20233ed8-a6c6-4097-aafa-dd545ed24428>)
///
/// `AclSize` and `AceCount` are computed from [`ACL::ace`] when writing.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct ACL {
    pub acl_revision: AclRevision,
    pub ace: Vec<ACE>,
}

impl ACL {
    const HEADER_SIZE: u64 = 8;

    pub fn new(acl_revision: AclRevision, ace: Vec<ACE>) -> Self {
        Self { acl_revision, ace }
    }

    /// Wire size: the 8-byte header followed by every ACE.
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE as usize + self.ace.iter().map(ACE::size).sum::<usize>()
    }

    /// Orders the ACEs in the ACL according to the standard order.
    ///
    /// Note that since we do not have sufficient information about the inheritance,
    /// we only apply order which is independent of inheritance.
    ///
    /// The following steps describe the preferred order:
    /// 1. ✅ All explicit ACEs are placed in a group before any inherited ACEs.
    /// 2. ✅ Within the group of explicit ACEs, access-denied ACEs are placed before access-allowed ACEs.
    /// 3. ❌ Inherited ACEs are placed in the order in which they are inherited. ACEs inherited from the child object's parent come first, then ACEs inherited from the grandparent, and so on up the tree of objects.
    /// 4. ❌ For each level of inherited ACEs, access-denied ACEs are placed before access-allowed ACEs.
    ///
    /// See more information on [Order of ACEs in a DACL - MSDN](<https://learn.microsoft.com/en-us/windows/win32/secauthz/order-of-aces-in-a-dacl>)
    pub fn order_aces(&mut self) {
        self.ace.sort_by(Self::sort_aces_by);
    }

    /// Whether ACE ordering rules apply to this ACL.
    ///
    /// See [`order_aces`][ACL::order_aces] for the ordering rules.
    pub fn is_ace_sorted(&self) -> bool {
        self.ace
            .is_sorted_by(|a, b| Self::sort_aces_by(a, b).is_le())
    }

    /// Sorting function for ACEs.
    ///
    /// See [`order_aces`][ACL::order_aces] for the ordering rules.
    fn sort_aces_by(a: &ACE, b: &ACE) -> std::cmp::Ordering {
        let a_inherited = a.ace_flags().inherited();
        let b_inherited = b.ace_flags().inherited();
        if a_inherited != b_inherited {
            return a_inherited.cmp(&b_inherited); // (1)
        }
        if a_inherited {
            return std::cmp::Ordering::Equal; // keep original order for inherited ACEs (3)
        }
        let a_allowed = a.ace_type().is_access_allowed();
        let b_allowed = b.ace_type().is_access_allowed();
        a_allowed.cmp(&b_allowed) // (2) on explicit ACEs, access-denied first <=> access-allowed last
    }

    /// Insert an ACE into the ACL, maintaining the correct order.
    /// See [`order_aces`][ACL::order_aces] for the ordering rules.
    pub fn insert_ace(&mut self, ace: ACE) {
        self.ace.push(ace);
        self.order_aces();
    }
}

impl BinRead for ACL {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let endian = Endian::Little;
        let start = reader.stream_position()?;

        let acl_revision = AclRevision::from(u8::read_options(reader, endian, ())?);
        let _sbz1 = u8::read_options(reader, endian, ())?;
        let acl_size = u16::read_options(reader, endian, ())? as u64;
        let ace_count = u16::read_options(reader, endian, ())?;
        let _sbz2 = u16::read_options(reader, endian, ())?;

        if acl_size < Self::HEADER_SIZE || acl_size % 4 != 0 {
            return Err(format_error(
                start,
                "ACL",
                format_args!("invalid declared size {acl_size}"),
            ));
        }
        ensure_available(reader, start, acl_size, "ACL")?;
        if let AclRevision::Unexpected(raw) = acl_revision {
            warn!("ACL at {start} has unexpected revision {raw:#04x}");
        }

        let end = start + acl_size;
        let mut ace = Vec::with_capacity(ace_count as usize);
        for i in 0..ace_count {
            if reader.stream_position()? >= end {
                return Err(format_error(
                    start,
                    "ACL",
                    format_args!("declared size {acl_size} holds only {i} of {ace_count} ACEs"),
                ));
            }
            let entry = ACE::read_options(reader, endian, ())?;
            if !acl_revision.permits(entry.ace_type()) {
                trace!("{acl_revision:?} ACL holds {:?} ACE", entry.ace_type());
            }
            ace.push(entry);
        }
        if reader.stream_position()? > end {
            return Err(format_error(
                start,
                "ACL",
                format_args!("ACEs overrun declared size {acl_size}"),
            ));
        }
        reader.seek(SeekFrom::Start(end))?;

        Ok(ACL { acl_revision, ace })
    }
}

impl BinWrite for ACL {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        let endian = Endian::Little;
        let pos = writer.stream_position()?;
        let acl_size = u16::try_from(self.size()).map_err(|_| {
            format_error(pos, "ACL", format_args!("size {} exceeds 65535", self.size()))
        })?;
        let ace_count = u16::try_from(self.ace.len()).map_err(|_| {
            format_error(pos, "ACL", format_args!("{} ACEs exceed 65535", self.ace.len()))
        })?;

        u8::from(self.acl_revision).write_options(writer, endian, ())?;
        0u8.write_options(writer, endian, ())?;
        acl_size.write_options(writer, endian, ())?;
        ace_count.write_options(writer, endian, ())?;
        0u16.write_options(writer, endian, ())?;
        self.ace.write_options(writer, endian, ())
    }
}

impl fmt::Display for ACL {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ace in &self.ace {
            write!(f, "{ace}")?;
        }
        Ok(())
    }
}

/// ACL revision byte.
///
/// Values other than 2 and 4 decode to [`AclRevision::Unexpected`] instead of failing.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum AclRevision {
    /// Windows NT 4.0
    Nt4,
    /// Active directory
    DS,
    Unexpected(u8),
}

impl AclRevision {
    /// Whether ACEs of `ace_type` may appear in an ACL of this revision.
    pub fn permits(&self, ace_type: AceType) -> bool {
        let nt4 = matches!(
            ace_type,
            AceType::AccessAllowed
                | AceType::AccessDenied
                | AceType::SystemAudit
                | AceType::SystemAlarm
                | AceType::SystemMandatoryLabel
        );
        match self {
            AclRevision::Nt4 => nt4,
            AclRevision::DS => {
                nt4 || matches!(
                    ace_type,
                    AceType::AccessAllowedObject
                        | AceType::AccessDeniedObject
                        | AceType::SystemAuditObject
                        | AceType::SystemAlarmObject
                )
            }
            AclRevision::Unexpected(_) => false,
        }
    }
}

impl From<u8> for AclRevision {
    fn from(value: u8) -> Self {
        match value {
            2 => AclRevision::Nt4,
            4 => AclRevision::DS,
            other => AclRevision::Unexpected(other),
        }
    }
}

impl From<AclRevision> for u8 {
    fn from(value: AclRevision) -> Self {
        match value {
            AclRevision::Nt4 => 2,
            AclRevision::DS => 4,
            AclRevision::Unexpected(raw) => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        DtypError, WireFormat,
        security::{AccessMask, AceFlag, SID},
    };
    use ntsd_tests::*;

    use super::*;

    fn fake_ace(ace_type: AceType, inherited: bool) -> ACE {
        let builder = ACE::builder(ace_type, SID::everyone());
        let builder = if inherited {
            builder.flag(AceFlag::Inherited)
        } else {
            builder
        };
        builder.build().unwrap()
    }

    #[test]
    fn test_sort_acls() {
        let explicit_deny_first = fake_ace(AceType::AccessDenied, false);
        let explicit_allow_second = fake_ace(AceType::AccessAllowed, false);
        // Let's make sure inherited remain untouched (in allow/deny difference)
        let inherited_last_1 = fake_ace(AceType::AccessAllowed, true);
        let inherited_last_2 = fake_ace(AceType::AccessDenied, true);
        let dacl = ACL {
            acl_revision: AclRevision::Nt4,
            ace: vec![
                inherited_last_1.clone(),      // should go third - before inherited_last_2
                explicit_allow_second.clone(), // should go second
                explicit_deny_first.clone(),   // should go first
                inherited_last_2.clone(), // should stay in place - inherited_last_1 before inherited_last_2
            ],
        };

        assert!(!dacl.is_ace_sorted());

        let mut new_dacl = dacl.clone();
        new_dacl.order_aces();

        assert!(new_dacl.is_ace_sorted());

        assert_eq!(
            new_dacl,
            ACL {
                acl_revision: AclRevision::Nt4,
                ace: vec![
                    explicit_deny_first,
                    explicit_allow_second,
                    inherited_last_1,
                    inherited_last_2,
                ]
            }
        );
    }

    #[test]
    fn test_insert_ace_keeps_order() {
        let mut dacl = ACL::new(
            AclRevision::DS,
            vec![
                fake_ace(AceType::AccessAllowed, false),
                fake_ace(AceType::AccessAllowed, true),
            ],
        );
        dacl.insert_ace(fake_ace(AceType::AccessDeniedObject, false));
        assert!(dacl.is_ace_sorted());
        assert_eq!(dacl.ace[0].ace_type(), AceType::AccessDeniedObject);
    }

    test_binrw! {
        ACL => everyone_read: ACL::new(
            AclRevision::Nt4,
            vec![ACE::builder(AceType::AccessAllowed, SID::everyone())
                .access_mask(AccessMask::from(AccessMask::READ_PROPERTY))
                .build()
                .unwrap()],
        ) => "02001c00010000000000140010000000010100000000000100000000"
    }

    test_binrw! {
        ACL => empty: ACL::new(AclRevision::DS, vec![]) => "0400080000000000"
    }

    #[test]
    fn test_acl_unexpected_revision_tolerated() {
        let acl = ACL::from_wire(&hex_to_u8_array! {"0700080000000000"}).unwrap();
        assert_eq!(acl.acl_revision, AclRevision::Unexpected(7));
        assert_eq!(acl.to_wire().unwrap(), hex_to_u8_array! {"0700080000000000"});
    }

    #[test]
    fn test_acl_skips_declared_slack() {
        let acl = ACL::from_wire(&hex_to_u8_array! {"04000c000000000000000000"}).unwrap();
        assert!(acl.ace.is_empty());
        assert_eq!(acl.size(), 8);
    }

    #[test]
    fn test_acl_rejects_bad_sizes() {
        // Declared size beyond the input
        assert!(matches!(
            ACL::from_wire(&hex_to_u8_array! {"0400100000000000"}),
            Err(DtypError::Format { offset: 0, .. })
        ));
        // One ACE declared, none fits
        assert!(matches!(
            ACL::from_wire(&hex_to_u8_array! {"0400080001000000"}),
            Err(DtypError::Format { offset: 0, .. })
        ));
        // Declared size too short for the ACE it holds
        assert!(matches!(
            ACL::from_wire(&hex_to_u8_array! {
                "02000c00010000000000140010000000010100000000000100000000"
            }),
            Err(DtypError::Format { offset: 0, .. })
        ));
    }

    #[test]
    fn test_revision_permits() {
        assert!(AclRevision::Nt4.permits(AceType::AccessDenied));
        assert!(!AclRevision::Nt4.permits(AceType::AccessAllowedObject));
        assert!(AclRevision::DS.permits(AceType::AccessAllowedObject));
        assert!(!AclRevision::Unexpected(3).permits(AceType::AccessAllowed));
    }
}
