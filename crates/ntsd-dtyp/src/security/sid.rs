//! MS-DTYP 2.4.2: SID

use std::{fmt, str::FromStr};

use binrw::prelude::*;

use crate::{DtypError, Result, bytes};

/// Security identifier - [MS-DTYP 2.4.2.2](<https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-dtyp/f992ad60-0fe4-4b87-9fed-beb478836861>)
///
/// Immutable once built. Use [`SID::builder`] or [`FromStr`] to construct one.
#[binrw::binrw]
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
#[brw(little)]
pub struct SID {
    #[bw(calc = Self::REVISION)]
    #[br(temp)]
    #[br(assert(revision == Self::REVISION, "SID: unsupported revision {}", revision))]
    revision: u8,
    #[bw(try_calc = sub_authority.len().try_into())]
    #[br(temp)]
    #[br(assert(
        sub_authority_count as usize <= Self::MAX_SUB_AUTHORITIES,
        "SID: sub-authority count {} exceeds {}",
        sub_authority_count,
        Self::MAX_SUB_AUTHORITIES
    ))]
    sub_authority_count: u8,
    /// Big-endian on the wire.
    identifier_authority: [u8; 6],
    #[br(count = sub_authority_count)]
    sub_authority: Vec<u32>,
}

impl SID {
    pub const REVISION: u8 = 1;
    pub const MAX_SUB_AUTHORITIES: usize = 15;

    const PREFIX: &'static str = "S-1-";

    pub const S_EVERYONE: &'static str = "S-1-1-0";
    pub const S_SELF: &'static str = "S-1-5-10";
    pub const S_LOCAL_SYSTEM: &'static str = "S-1-5-18";
    pub const S_ADMINISTRATORS: &'static str = "S-1-5-32-544";

    /// Starts building a SID with the given 48-bit identifier authority.
    pub fn builder(identifier_authority: u64) -> SidBuilder {
        SidBuilder {
            identifier_authority,
            sub_authority: Vec::new(),
        }
    }

    pub fn everyone() -> SID {
        SID {
            identifier_authority: [0, 0, 0, 0, 0, 1],
            sub_authority: vec![0],
        }
    }

    /// `S-1-5-10`, the principal the object itself stands for.
    pub fn self_sid() -> SID {
        SID {
            identifier_authority: [0, 0, 0, 0, 0, 5],
            sub_authority: vec![10],
        }
    }

    pub fn revision(&self) -> u8 {
        Self::REVISION
    }

    pub fn sub_authority_count(&self) -> u8 {
        self.sub_authority.len() as u8
    }

    pub fn identifier_authority(&self) -> &[u8; 6] {
        &self.identifier_authority
    }

    /// The identifier authority as an integer.
    pub fn authority_value(&self) -> u64 {
        self.identifier_authority
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }

    pub fn sub_authorities(&self) -> &[u32] {
        &self.sub_authority
    }

    /// Wire size of this SID: 8 bytes of header and authority, 4 per sub-authority.
    pub fn size(&self) -> usize {
        8 + 4 * self.sub_authority.len()
    }

    /// The escaped binary form, for use as an `objectSid` LDAP filter value.
    pub fn to_ldap_filter_value(&self) -> String {
        let mut wire = Vec::with_capacity(self.size());
        wire.push(Self::REVISION);
        wire.push(self.sub_authority_count());
        wire.extend_from_slice(&self.identifier_authority);
        for sa in &self.sub_authority {
            wire.extend_from_slice(&sa.to_le_bytes());
        }
        bytes::to_escaped_hex(&wire)
    }

    /// An LDAP filter matching the object this SID identifies.
    pub fn ldap_filter(&self) -> String {
        format!("(objectSid={})", self.to_ldap_filter_value())
    }
}

/// Builder for [`SID`].
#[derive(Debug, Clone)]
pub struct SidBuilder {
    identifier_authority: u64,
    sub_authority: Vec<u32>,
}

impl SidBuilder {
    pub fn sub_authority(mut self, value: u32) -> Self {
        self.sub_authority.push(value);
        self
    }

    pub fn build(self) -> Result<SID> {
        if self.identifier_authority >> 48 != 0 {
            return Err(DtypError::InvalidAuthority(self.identifier_authority));
        }
        if self.sub_authority.len() > SID::MAX_SUB_AUTHORITIES {
            return Err(DtypError::TooManySubAuthorities(self.sub_authority.len()));
        }
        let mut identifier_authority = [0u8; 6];
        identifier_authority.copy_from_slice(&self.identifier_authority.to_be_bytes()[2..]);
        Ok(SID {
            identifier_authority,
            sub_authority: self.sub_authority,
        })
    }
}

impl FromStr for SID {
    type Err = DtypError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DtypError::InvalidSidString(s.to_string());
        let rest = s.strip_prefix(Self::PREFIX).ok_or_else(invalid)?;
        let mut parts = rest.split('-');

        // MS-DTYP 2.4.2.1: decimal below 2^32, hex (0x + 12 digits) otherwise.
        let authority = match parts.next() {
            Some(hex) if hex.starts_with("0x") || hex.starts_with("0X") => {
                u64::from_str_radix(&hex[2..], 16).map_err(|_| invalid())?
            }
            Some(dec) => dec.parse::<u32>().map_err(|_| invalid())? as u64,
            None => return Err(invalid()),
        };

        let mut builder = SID::builder(authority);
        for part in parts {
            builder = builder.sub_authority(part.parse().map_err(|_| invalid())?);
        }
        builder.build().map_err(|e| match e {
            DtypError::InvalidAuthority(_) => invalid(),
            other => other,
        })
    }
}

impl fmt::Display for SID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Self::PREFIX)?;
        let authority = self.authority_value();
        if authority >> 32 == 0 {
            write!(f, "{authority}")?;
        } else {
            write!(f, "0x{authority:012X}")?;
        }
        for sub_authority in &self.sub_authority {
            write!(f, "-{sub_authority}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WireFormat;
    use ntsd_tests::*;

    const USER_SID: &str = "S-1-5-21-1835709989-2027683138-697581538-1139";

    fn user_sid() -> SID {
        SID::builder(5)
            .sub_authority(21)
            .sub_authority(1835709989)
            .sub_authority(2027683138)
            .sub_authority(697581538)
            .sub_authority(1139)
            .build()
            .unwrap()
    }

    test_binrw! {
        SID => domain_user: user_sid() => "01050000000000051500000025b66a6d42fddb78e23f942973040000"
    }

    test_binrw! {
        SID => everyone: SID::everyone() => "010100000000000100000000"
    }

    #[test]
    fn test_sid_to_from_string() {
        let sid: SID = USER_SID.parse().unwrap();
        assert_eq!(sid, user_sid());
        assert_eq!(sid.revision(), 1);
        assert_eq!(sid.authority_value(), 5);
        assert_eq!(
            sid.sub_authorities(),
            &[21, 1835709989, 2027683138, 697581538, 1139]
        );
        assert_eq!(sid.to_string(), USER_SID);
        assert_eq!(sid.size(), 28);
        assert_eq!(SID::S_EVERYONE.parse::<SID>().unwrap(), SID::everyone());
        assert_eq!(SID::S_SELF.parse::<SID>().unwrap(), SID::self_sid());
    }

    #[test]
    fn test_sid_without_sub_authorities() {
        let sid = SID::builder(5).build().unwrap();
        assert_eq!(sid.to_string(), "S-1-5");
        assert_eq!("S-1-5".parse::<SID>().unwrap(), sid);
        assert_eq!(sid.to_wire().unwrap(), vec![1, 0, 0, 0, 0, 0, 0, 5]);
    }

    #[test]
    fn test_sid_hex_authority() {
        let sid = SID::builder(0x0000_1234_5678_9abc)
            .sub_authority(7)
            .build()
            .unwrap();
        assert_eq!(sid.to_string(), "S-1-0x123456789ABC-7");
        assert_eq!("S-1-0x123456789ABC-7".parse::<SID>().unwrap(), sid);
    }

    #[test]
    fn test_sid_invalid_strings() {
        for s in ["", "S-1", "S-2-5-21", "S-1-x-21", "S-1-5-21-", "S-1-0x1000000000000-1"] {
            assert!(
                matches!(s.parse::<SID>(), Err(DtypError::InvalidSidString(_))),
                "{s:?} should not parse"
            );
        }
        let too_long = format!("S-1-5{}", "-1".repeat(16));
        assert!(matches!(
            too_long.parse::<SID>(),
            Err(DtypError::TooManySubAuthorities(16))
        ));
    }

    #[test]
    fn test_sid_rejects_bad_wire() {
        // Revision 2
        assert!(matches!(
            SID::from_wire(&hex_to_u8_array! {"020100000000000100000000"}),
            Err(DtypError::Format { .. })
        ));
        // 16 sub-authorities
        let mut wire = vec![1u8, 16, 0, 0, 0, 0, 0, 5];
        wire.extend(std::iter::repeat_n(0u8, 64));
        assert!(matches!(
            SID::from_wire(&wire),
            Err(DtypError::Format { .. })
        ));
        // Truncated sub-authorities
        assert!(matches!(
            SID::from_wire(&hex_to_u8_array! {"0102000000000005150000"}),
            Err(DtypError::Format { .. })
        ));
    }

    #[test]
    fn test_sid_ldap_filter() {
        assert_eq!(
            SID::everyone().ldap_filter(),
            "(objectSid=\\01\\01\\00\\00\\00\\00\\00\\01\\00\\00\\00\\00)"
        );
    }
}
