//! MS-DTYP 2.4.4: ACE

use std::fmt;

use binrw::{
    Endian,
    io::{Read, Seek, Write},
    prelude::*,
};
use modular_bitfield::prelude::*;

use log::trace;

use crate::{
    DtypError, Guid, Result,
    binrw_util::{ensure_available, format_error, read_exact_vec},
};

use super::SID;

/// Access control entry - [MS-DTYP 2.4.4.1](<https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-dtyp/628ebb1d-c509-4ea0-a10f-77ef97ca4586>)
///
/// A common header, an access mask, the object payload of object-specific types,
/// the trustee SID and any trailing application data.
/// The declared size is never stored: it is computed from the contents when writing.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct ACE {
    ace_type: AceType,
    ace_flags: AceFlags,
    access_mask: AccessMask,
    object: Option<ObjectAceData>,
    sid: SID,
    application_data: Vec<u8>,
}

impl ACE {
    const HEADER_SIZE: usize = 4;
    const MIN_SIZE: usize = Self::HEADER_SIZE + 4 + 8;

    pub fn builder(ace_type: AceType, sid: SID) -> AceBuilder {
        AceBuilder {
            ace_type,
            ace_flags: AceFlags::new(),
            access_mask: AccessMask::new(),
            object_flags: AceObjectFlags::new(),
            object_type: None,
            inherited_object_type: None,
            sid,
            application_data: Vec::new(),
        }
    }

    /// A builder pre-filled with this ACE's contents.
    pub fn to_builder(&self) -> AceBuilder {
        AceBuilder {
            ace_type: self.ace_type,
            ace_flags: self.ace_flags,
            access_mask: self.access_mask,
            object_flags: self.object.map(|o| o.flags).unwrap_or_else(AceObjectFlags::new),
            object_type: self.object_type(),
            inherited_object_type: self.inherited_object_type(),
            sid: self.sid.clone(),
            application_data: self.application_data.clone(),
        }
    }

    pub fn ace_type(&self) -> AceType {
        self.ace_type
    }

    pub fn ace_flags(&self) -> AceFlags {
        self.ace_flags
    }

    pub fn access_mask(&self) -> AccessMask {
        self.access_mask
    }

    /// The object payload. Always present for object-specific ACE types, never for others.
    pub fn object(&self) -> Option<&ObjectAceData> {
        self.object.as_ref()
    }

    pub fn object_flags(&self) -> Option<AceObjectFlags> {
        self.object.map(|o| o.flags)
    }

    pub fn object_type(&self) -> Option<Guid> {
        self.object.and_then(|o| o.object_type)
    }

    pub fn inherited_object_type(&self) -> Option<Guid> {
        self.object.and_then(|o| o.inherited_object_type)
    }

    pub fn sid(&self) -> &SID {
        &self.sid
    }

    pub fn application_data(&self) -> &[u8] {
        &self.application_data
    }

    /// Wire size of this ACE.
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE
            + 4
            + self.object.map_or(0, |o| o.size())
            + self.sid.size()
            + self.application_data.len()
    }
}

impl BinRead for ACE {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let endian = Endian::Little;
        let start = reader.stream_position()?;

        let ace_type = AceType::from(u8::read_options(reader, endian, ())?);
        if let AceType::Unexpected(raw) = ace_type {
            trace!("ACE at {start} has unknown type {raw:#04x}");
        }
        let ace_flags = AceFlags::read_options(reader, endian, ())?;
        let ace_size = u16::read_options(reader, endian, ())?;
        if ace_size % 4 != 0 || (ace_size as usize) < Self::MIN_SIZE {
            return Err(format_error(
                start,
                "ACE",
                format_args!("invalid declared size {ace_size}"),
            ));
        }
        ensure_available(reader, start, ace_size as u64, "ACE")?;

        let access_mask = AccessMask::read_options(reader, endian, ())?;
        let object = if ace_type.is_object() {
            Some(ObjectAceData::read_options(reader, endian, ())?)
        } else {
            None
        };
        let sid = SID::read_options(reader, endian, ())?;

        let consumed = reader.stream_position()? - start;
        let Some(remaining) = (ace_size as u64).checked_sub(consumed) else {
            return Err(format_error(
                start,
                "ACE",
                format_args!("contents ({consumed} bytes) overrun declared size {ace_size}"),
            ));
        };
        let application_data = read_exact_vec(reader, remaining, start, "ACE")?;

        Ok(ACE {
            ace_type,
            ace_flags,
            access_mask,
            object,
            sid,
            application_data,
        })
    }
}

impl BinWrite for ACE {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        let endian = Endian::Little;
        let pos = writer.stream_position()?;
        let ace_size = u16::try_from(self.size())
            .map_err(|_| format_error(pos, "ACE", format_args!("size {} exceeds 65535", self.size())))?;

        u8::from(self.ace_type).write_options(writer, endian, ())?;
        self.ace_flags.write_options(writer, endian, ())?;
        ace_size.write_options(writer, endian, ())?;
        self.access_mask.write_options(writer, endian, ())?;
        if let Some(object) = &self.object {
            object.write_options(writer, endian, ())?;
        }
        self.sid.write_options(writer, endian, ())?;
        writer.write_all(&self.application_data)?;
        Ok(())
    }
}

/// Builder for [`ACE`].
///
/// Object flags' "present" bits follow the GUIDs given, other object flag bits are kept.
#[derive(Debug, Clone)]
pub struct AceBuilder {
    ace_type: AceType,
    ace_flags: AceFlags,
    access_mask: AccessMask,
    object_flags: AceObjectFlags,
    object_type: Option<Guid>,
    inherited_object_type: Option<Guid>,
    sid: SID,
    application_data: Vec<u8>,
}

impl AceBuilder {
    pub fn ace_type(mut self, ace_type: AceType) -> Self {
        self.ace_type = ace_type;
        self
    }

    pub fn flags(mut self, flags: AceFlags) -> Self {
        self.ace_flags = flags;
        self
    }

    pub fn flag(mut self, flag: AceFlag) -> Self {
        self.ace_flags = self.ace_flags.with_flag(flag);
        self
    }

    pub fn access_mask(mut self, mask: AccessMask) -> Self {
        self.access_mask = mask;
        self
    }

    pub fn object_type(mut self, guid: Option<Guid>) -> Self {
        self.object_type = guid;
        self
    }

    pub fn inherited_object_type(mut self, guid: Option<Guid>) -> Self {
        self.inherited_object_type = guid;
        self
    }

    pub fn sid(mut self, sid: SID) -> Self {
        self.sid = sid;
        self
    }

    pub fn application_data(mut self, data: Vec<u8>) -> Self {
        self.application_data = data;
        self
    }

    pub fn build(self) -> Result<ACE> {
        if self.application_data.len() % 4 != 0 {
            return Err(DtypError::InvalidApplicationData(self.application_data.len()));
        }
        let object = if self.ace_type.is_object() {
            Some(ObjectAceData {
                flags: self
                    .object_flags
                    .with_object_type_present(self.object_type.is_some())
                    .with_inherited_object_type_present(self.inherited_object_type.is_some()),
                object_type: self.object_type,
                inherited_object_type: self.inherited_object_type,
            })
        } else if self.object_type.is_some() || self.inherited_object_type.is_some() {
            return Err(DtypError::NotAnObjectAce(self.ace_type));
        } else {
            None
        };
        Ok(ACE {
            ace_type: self.ace_type,
            ace_flags: self.ace_flags,
            access_mask: self.access_mask,
            object,
            sid: self.sid,
            application_data: self.application_data,
        })
    }
}

/// The object-specific part of object ACEs (MS-DTYP 2.4.4.3).
#[binrw::binrw]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[brw(little)]
pub struct ObjectAceData {
    #[bw(assert(object_type.is_some() == flags.object_type_present()))]
    #[bw(assert(inherited_object_type.is_some() == flags.inherited_object_type_present()))]
    pub flags: AceObjectFlags,
    #[br(if(flags.object_type_present()))]
    pub object_type: Option<Guid>,
    #[br(if(flags.inherited_object_type_present()))]
    pub inherited_object_type: Option<Guid>,
}

impl ObjectAceData {
    pub fn size(&self) -> usize {
        4 + 16 * (self.object_type.is_some() as usize + self.inherited_object_type.is_some() as usize)
    }
}

#[ntsd_dtyp_derive::mbitfield]
pub struct AceObjectFlags {
    pub object_type_present: bool,
    pub inherited_object_type_present: bool,
    #[skip]
    __: B30,
}

impl AceObjectFlags {
    pub fn bits(&self) -> u32 {
        u32::from_le_bytes(self.into_bytes())
    }

    /// Whether every bit of `other` is set here.
    pub fn contains(&self, other: AceObjectFlags) -> bool {
        self.bits() & other.bits() == other.bits()
    }
}

/// ACE type tags (MS-DTYP 2.4.4.1).
///
/// Tags outside the known set decode to [`AceType::Unexpected`], keeping the raw value.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum AceType {
    AccessAllowed,
    AccessDenied,
    SystemAudit,
    SystemAlarm,
    AccessAllowedCompound,
    AccessAllowedObject,
    AccessDeniedObject,
    SystemAuditObject,
    SystemAlarmObject,
    AccessAllowedCallback,
    AccessDeniedCallback,
    AccessAllowedCallbackObject,
    AccessDeniedCallbackObject,
    SystemAuditCallback,
    SystemAlarmCallback,
    SystemAuditCallbackObject,
    SystemAlarmCallbackObject,
    SystemMandatoryLabel,
    SystemResourceAttribute,
    SystemScopedPolicyId,
    Unexpected(u8),
}

impl AceType {
    pub fn is_access_allowed(&self) -> bool {
        matches!(
            self,
            AceType::AccessAllowed
                | AceType::AccessAllowedCompound
                | AceType::AccessAllowedObject
                | AceType::AccessAllowedCallback
                | AceType::AccessAllowedCallbackObject
        )
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            AceType::AccessDenied
                | AceType::AccessDeniedObject
                | AceType::AccessDeniedCallback
                | AceType::AccessDeniedCallbackObject
        )
    }

    /// Whether this type carries an [`ObjectAceData`] after the access mask.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            AceType::AccessAllowedObject
                | AceType::AccessDeniedObject
                | AceType::SystemAuditObject
                | AceType::SystemAlarmObject
                | AceType::AccessAllowedCallbackObject
                | AceType::AccessDeniedCallbackObject
                | AceType::SystemAuditCallbackObject
                | AceType::SystemAlarmCallbackObject
        )
    }

    /// SDDL abbreviation, when one is defined.
    pub fn sddl_code(&self) -> Option<&'static str> {
        Some(match self {
            AceType::AccessAllowed => "A",
            AceType::AccessDenied => "D",
            AceType::SystemAudit => "AU",
            AceType::SystemAlarm => "AL",
            AceType::AccessAllowedObject => "OA",
            AceType::AccessDeniedObject => "OD",
            AceType::SystemAuditObject => "OU",
            AceType::SystemAlarmObject => "OL",
            AceType::AccessAllowedCallback => "XA",
            AceType::AccessDeniedCallback => "XD",
            AceType::AccessAllowedCallbackObject => "ZA",
            AceType::SystemAuditCallback => "XU",
            AceType::SystemMandatoryLabel => "ML",
            AceType::SystemResourceAttribute => "RA",
            AceType::SystemScopedPolicyId => "SP",
            _ => return None,
        })
    }
}

impl From<u8> for AceType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => AceType::AccessAllowed,
            0x01 => AceType::AccessDenied,
            0x02 => AceType::SystemAudit,
            0x03 => AceType::SystemAlarm,
            0x04 => AceType::AccessAllowedCompound,
            0x05 => AceType::AccessAllowedObject,
            0x06 => AceType::AccessDeniedObject,
            0x07 => AceType::SystemAuditObject,
            0x08 => AceType::SystemAlarmObject,
            0x09 => AceType::AccessAllowedCallback,
            0x0A => AceType::AccessDeniedCallback,
            0x0B => AceType::AccessAllowedCallbackObject,
            0x0C => AceType::AccessDeniedCallbackObject,
            0x0D => AceType::SystemAuditCallback,
            0x0E => AceType::SystemAlarmCallback,
            0x0F => AceType::SystemAuditCallbackObject,
            0x10 => AceType::SystemAlarmCallbackObject,
            0x11 => AceType::SystemMandatoryLabel,
            0x12 => AceType::SystemResourceAttribute,
            0x13 => AceType::SystemScopedPolicyId,
            other => AceType::Unexpected(other),
        }
    }
}

impl From<AceType> for u8 {
    fn from(value: AceType) -> Self {
        match value {
            AceType::AccessAllowed => 0x00,
            AceType::AccessDenied => 0x01,
            AceType::SystemAudit => 0x02,
            AceType::SystemAlarm => 0x03,
            AceType::AccessAllowedCompound => 0x04,
            AceType::AccessAllowedObject => 0x05,
            AceType::AccessDeniedObject => 0x06,
            AceType::SystemAuditObject => 0x07,
            AceType::SystemAlarmObject => 0x08,
            AceType::AccessAllowedCallback => 0x09,
            AceType::AccessDeniedCallback => 0x0A,
            AceType::AccessAllowedCallbackObject => 0x0B,
            AceType::AccessDeniedCallbackObject => 0x0C,
            AceType::SystemAuditCallback => 0x0D,
            AceType::SystemAlarmCallback => 0x0E,
            AceType::SystemAuditCallbackObject => 0x0F,
            AceType::SystemAlarmCallbackObject => 0x10,
            AceType::SystemMandatoryLabel => 0x11,
            AceType::SystemResourceAttribute => 0x12,
            AceType::SystemScopedPolicyId => 0x13,
            AceType::Unexpected(raw) => raw,
        }
    }
}

#[ntsd_dtyp_derive::mbitfield]
pub struct AceFlags {
    pub object_inherit: bool,
    pub container_inherit: bool,
    pub no_propagate_inherit: bool,
    pub inherit_only: bool,

    pub inherited: bool,
    #[skip]
    __: bool,
    pub successful_access: bool,
    pub failed_access: bool,
}

impl AceFlags {
    pub fn bits(&self) -> u8 {
        self.into_bytes()[0]
    }

    /// No known flag is set. Reserved bits are ignored.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn contains(&self, flag: AceFlag) -> bool {
        self.bits() & flag.bit() != 0
    }

    pub fn with_flag(self, flag: AceFlag) -> Self {
        Self::from_bytes([self.bits() | flag.bit()])
    }

    /// The known flags that are set, in bit order.
    pub fn iter(&self) -> impl Iterator<Item = AceFlag> + '_ {
        AceFlag::ALL.into_iter().filter(|f| self.contains(*f))
    }
}

/// A single ACE flag, as used by assertions.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum AceFlag {
    ObjectInherit,
    ContainerInherit,
    NoPropagateInherit,
    InheritOnly,
    Inherited,
    SuccessfulAccess,
    FailedAccess,
}

impl AceFlag {
    pub const ALL: [AceFlag; 7] = [
        AceFlag::ObjectInherit,
        AceFlag::ContainerInherit,
        AceFlag::NoPropagateInherit,
        AceFlag::InheritOnly,
        AceFlag::Inherited,
        AceFlag::SuccessfulAccess,
        AceFlag::FailedAccess,
    ];

    pub fn bit(&self) -> u8 {
        match self {
            AceFlag::ObjectInherit => 0x01,
            AceFlag::ContainerInherit => 0x02,
            AceFlag::NoPropagateInherit => 0x04,
            AceFlag::InheritOnly => 0x08,
            AceFlag::Inherited => 0x10,
            AceFlag::SuccessfulAccess => 0x40,
            AceFlag::FailedAccess => 0x80,
        }
    }

    pub fn sddl_code(&self) -> &'static str {
        match self {
            AceFlag::ObjectInherit => "OI",
            AceFlag::ContainerInherit => "CI",
            AceFlag::NoPropagateInherit => "NP",
            AceFlag::InheritOnly => "IO",
            AceFlag::Inherited => "ID",
            AceFlag::SuccessfulAccess => "SA",
            AceFlag::FailedAccess => "FA",
        }
    }
}

/// Directory service access rights (MS-ADTS 5.1.3.2) and the standard/generic rights.
///
/// Unnamed bits are stored too, see [`AccessMask::others`].
#[ntsd_dtyp_derive::mbitfield]
pub struct AccessMask {
    pub create_child: bool,
    pub delete_child: bool,
    pub list_children: bool,
    pub self_write: bool,

    pub read_property: bool,
    pub write_property: bool,
    pub delete_tree: bool,
    pub list_object: bool,

    pub control_access: bool,
    #[skip]
    __: B7,

    pub delete: bool,
    pub read_control: bool,
    pub write_dacl: bool,
    pub write_owner: bool,

    pub synchronize: bool,
    #[skip]
    __: B3,

    pub access_system_security: bool,
    pub maximum_allowed: bool,
    #[skip]
    __: B2,

    pub generic_all: bool,
    pub generic_execute: bool,
    pub generic_write: bool,
    pub generic_read: bool,
}

impl AccessMask {
    pub const CREATE_CHILD: u32 = 0x0000_0001;
    pub const DELETE_CHILD: u32 = 0x0000_0002;
    pub const LIST_CHILDREN: u32 = 0x0000_0004;
    pub const SELF_WRITE: u32 = 0x0000_0008;
    pub const READ_PROPERTY: u32 = 0x0000_0010;
    pub const WRITE_PROPERTY: u32 = 0x0000_0020;
    pub const DELETE_TREE: u32 = 0x0000_0040;
    pub const LIST_OBJECT: u32 = 0x0000_0080;
    pub const CONTROL_ACCESS: u32 = 0x0000_0100;
    pub const DELETE: u32 = 0x0001_0000;
    pub const READ_CONTROL: u32 = 0x0002_0000;
    pub const WRITE_DACL: u32 = 0x0004_0000;
    pub const WRITE_OWNER: u32 = 0x0008_0000;
    pub const SYNCHRONIZE: u32 = 0x0010_0000;
    pub const ACCESS_SYSTEM_SECURITY: u32 = 0x0100_0000;
    pub const MAXIMUM_ALLOWED: u32 = 0x0200_0000;
    pub const GENERIC_ALL: u32 = 0x1000_0000;
    pub const GENERIC_EXECUTE: u32 = 0x2000_0000;
    pub const GENERIC_WRITE: u32 = 0x4000_0000;
    pub const GENERIC_READ: u32 = 0x8000_0000;

    const SDDL_CODES: [(u32, &'static str); 20] = [
        (Self::CREATE_CHILD, "CC"),
        (Self::DELETE_CHILD, "DC"),
        (Self::LIST_CHILDREN, "LC"),
        (Self::SELF_WRITE, "SW"),
        (Self::READ_PROPERTY, "RP"),
        (Self::WRITE_PROPERTY, "WP"),
        (Self::DELETE_TREE, "DT"),
        (Self::LIST_OBJECT, "LO"),
        (Self::CONTROL_ACCESS, "CR"),
        (Self::DELETE, "SD"),
        (Self::READ_CONTROL, "RC"),
        (Self::WRITE_DACL, "WD"),
        (Self::WRITE_OWNER, "WO"),
        (Self::SYNCHRONIZE, "SY"),
        (Self::ACCESS_SYSTEM_SECURITY, "AS"),
        (Self::MAXIMUM_ALLOWED, "MA"),
        (Self::GENERIC_ALL, "GA"),
        (Self::GENERIC_EXECUTE, "GX"),
        (Self::GENERIC_WRITE, "GW"),
        (Self::GENERIC_READ, "GR"),
    ];

    const KNOWN: u32 = {
        let mut known = 0;
        let mut i = 0;
        while i < Self::SDDL_CODES.len() {
            known |= Self::SDDL_CODES[i].0;
            i += 1;
        }
        known
    };

    pub fn bits(&self) -> u32 {
        u32::from_le_bytes(self.into_bytes())
    }

    pub fn from_bits(bits: u32) -> Self {
        Self::from_bytes(bits.to_le_bytes())
    }

    /// Set bits that have no named right.
    pub fn others(&self) -> u32 {
        self.bits() & !Self::KNOWN
    }

    /// Whether every right in `other` is granted here.
    pub fn contains(&self, other: AccessMask) -> bool {
        self.bits() & other.bits() == other.bits()
    }
}

impl From<u32> for AccessMask {
    fn from(value: u32) -> Self {
        Self::from_bits(value)
    }
}

impl fmt::Display for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = self.bits();
        for (bit, code) in Self::SDDL_CODES {
            if bits & bit != 0 {
                f.write_str(code)?;
            }
        }
        if self.others() != 0 {
            write!(f, "[{:#x}]", self.others())?;
        }
        Ok(())
    }
}

impl fmt::Display for ACE {
    /// SDDL ACE string: `(type;flags;rights;object;inherited-object;sid)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ace_type.sddl_code() {
            Some(code) => write!(f, "({code};")?,
            None => write!(f, "({:#04x};", u8::from(self.ace_type))?,
        }
        for flag in self.ace_flags.iter() {
            f.write_str(flag.sddl_code())?;
        }
        write!(f, ";{};", self.access_mask)?;
        if let Some(guid) = self.object_type() {
            write!(f, "{guid}")?;
        }
        f.write_str(";")?;
        if let Some(guid) = self.inherited_object_type() {
            write!(f, "{guid}")?;
        }
        write!(f, ";{})", self.sid)
    }
}
