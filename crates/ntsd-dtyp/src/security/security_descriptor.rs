//! MS-DTYP 2.4.6: Security Descriptor

use std::fmt;

use binrw::{
    Endian,
    io::{Read, Seek, SeekFrom, Write},
    prelude::*,
};

use log::debug;

use crate::{binrw_util::format_error, bytes};

use super::{ACL, SID};

/// Security Descriptor - [MS-DTYP 2.4.6](<https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-dtyp/7d4dac05-9cef-4563-a058-f108abecce1d>)
///
/// Self-relative form. On read, the owner and group are taken only when their
/// "defaulted" bit is clear, the SACL and DACL only when their "present" bit is set.
/// On write, the parts present are laid out after the header in the order
/// owner, group, SACL, DACL.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SecurityDescriptor {
    pub control: SecurityDescriptorControl,
    pub owner_sid: Option<SID>,
    pub group_sid: Option<SID>,
    pub sacl: Option<ACL>,
    pub dacl: Option<ACL>,
}

impl SecurityDescriptor {
    pub const REVISION: u8 = 1;
    const HEADER_SIZE: u32 = 20;

    // Bit indices into `control_flags()`, most significant bit first.
    const OWNER_DEFAULTED_BIT: usize = 15;
    const GROUP_DEFAULTED_BIT: usize = 14;
    const DACL_PRESENT_BIT: usize = 13;
    const SACL_PRESENT_BIT: usize = 11;

    pub fn new(control: SecurityDescriptorControl) -> Self {
        Self {
            control,
            owner_sid: None,
            group_sid: None,
            sacl: None,
            dacl: None,
        }
    }

    /// The control field as it appears on the wire, high byte first.
    pub fn control_flags(&self) -> [u8; 2] {
        let [lo, hi] = self.control.into_bytes();
        [hi, lo]
    }

    /// Wire size of this descriptor.
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE as usize
            + self.owner_sid.as_ref().map_or(0, SID::size)
            + self.group_sid.as_ref().map_or(0, SID::size)
            + self.sacl.as_ref().map_or(0, ACL::size)
            + self.dacl.as_ref().map_or(0, ACL::size)
    }

    /// Reads `T` at `offset` bytes from `start`, leaving the reader after it.
    fn read_part<R: Read + Seek, T: for<'a> BinRead<Args<'a> = ()>>(
        reader: &mut R,
        start: u64,
        offset: u32,
        part: &str,
    ) -> BinResult<T> {
        if offset % 4 != 0 || offset < Self::HEADER_SIZE {
            return Err(format_error(
                start,
                "SecurityDescriptor",
                format_args!("{part} offset {offset} is not a valid word offset past the header"),
            ));
        }
        reader.seek(SeekFrom::Start(start + offset as u64))?;
        T::read_options(reader, Endian::Little, ())
    }
}

impl BinRead for SecurityDescriptor {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let endian = Endian::Little;
        let start = reader.stream_position()?;

        let revision = u8::read_options(reader, endian, ())?;
        if revision != Self::REVISION {
            return Err(format_error(
                start,
                "SecurityDescriptor",
                format_args!("unsupported revision {revision}"),
            ));
        }
        let _sbz1 = u8::read_options(reader, endian, ())?;
        let control = SecurityDescriptorControl::read_options(reader, endian, ())?;
        let offset_owner = u32::read_options(reader, endian, ())?;
        let offset_group = u32::read_options(reader, endian, ())?;
        let offset_sacl = u32::read_options(reader, endian, ())?;
        let offset_dacl = u32::read_options(reader, endian, ())?;

        let mut sd = SecurityDescriptor::new(control);
        let bits = bytes::get_bits(&sd.control_flags()).map_err(|e| binrw::Error::Custom {
            pos: start + 2,
            err: Box::new(e),
        })?;
        let mut end = start + Self::HEADER_SIZE as u64;

        if !bits[Self::OWNER_DEFAULTED_BIT] && offset_owner != 0 {
            sd.owner_sid = Some(Self::read_part(reader, start, offset_owner, "owner")?);
            end = end.max(reader.stream_position()?);
        }
        if !bits[Self::GROUP_DEFAULTED_BIT] && offset_group != 0 {
            sd.group_sid = Some(Self::read_part(reader, start, offset_group, "group")?);
            end = end.max(reader.stream_position()?);
        }
        if bits[Self::SACL_PRESENT_BIT] && offset_sacl != 0 {
            sd.sacl = Some(Self::read_part(reader, start, offset_sacl, "SACL")?);
            end = end.max(reader.stream_position()?);
        }
        if bits[Self::DACL_PRESENT_BIT] != (offset_dacl != 0) {
            debug!(
                "DACL present bit is {} but DACL offset is {offset_dacl}",
                bits[Self::DACL_PRESENT_BIT]
            );
        }
        if bits[Self::DACL_PRESENT_BIT] && offset_dacl != 0 {
            sd.dacl = Some(Self::read_part(reader, start, offset_dacl, "DACL")?);
            end = end.max(reader.stream_position()?);
        }
        reader.seek(SeekFrom::Start(end))?;

        Ok(sd)
    }
}

impl BinWrite for SecurityDescriptor {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        _endian: Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        let endian = Endian::Little;
        let pos = writer.stream_position()?;

        // A part the control word hides would be dropped on read.
        let hidden = [
            ("owner", self.owner_sid.is_some() && self.control.owner_defaulted()),
            ("group", self.group_sid.is_some() && self.control.group_defaulted()),
            ("SACL", self.sacl.is_some() && !self.control.sacl_present()),
            ("DACL", self.dacl.is_some() && !self.control.dacl_present()),
        ];
        if let Some((part, _)) = hidden.iter().find(|(_, hidden)| *hidden) {
            let control = u16::from_le_bytes(self.control.into_bytes());
            return Err(format_error(
                pos,
                "SecurityDescriptor",
                format_args!("{part} is set but hidden by control {control:#06x}"),
            ));
        }

        let mut next = Self::HEADER_SIZE as usize;
        let mut place = |size: Option<usize>| -> BinResult<u32> {
            let Some(size) = size else {
                return Ok(0);
            };
            let offset = u32::try_from(next).map_err(|_| {
                format_error(pos, "SecurityDescriptor", "part offset exceeds 32 bits")
            })?;
            next += size;
            Ok(offset)
        };
        let offset_owner = place(self.owner_sid.as_ref().map(SID::size))?;
        let offset_group = place(self.group_sid.as_ref().map(SID::size))?;
        let offset_sacl = place(self.sacl.as_ref().map(ACL::size))?;
        let offset_dacl = place(self.dacl.as_ref().map(ACL::size))?;

        Self::REVISION.write_options(writer, endian, ())?;
        0u8.write_options(writer, endian, ())?;
        self.control.write_options(writer, endian, ())?;
        for offset in [offset_owner, offset_group, offset_sacl, offset_dacl] {
            offset.write_options(writer, endian, ())?;
        }
        self.owner_sid.write_options(writer, endian, ())?;
        self.group_sid.write_options(writer, endian, ())?;
        self.sacl.write_options(writer, endian, ())?;
        self.dacl.write_options(writer, endian, ())?;
        Ok(())
    }
}

impl fmt::Display for SecurityDescriptor {
    /// SDDL-like rendering: `O:<sid>G:<sid>D:<aces>S:<aces>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = &self.owner_sid {
            write!(f, "O:{owner}")?;
        }
        if let Some(group) = &self.group_sid {
            write!(f, "G:{group}")?;
        }
        if let Some(dacl) = &self.dacl {
            let protected = if self.control.dacl_protected() { "P" } else { "" };
            write!(f, "D:{protected}{dacl}")?;
        }
        if let Some(sacl) = &self.sacl {
            let protected = if self.control.sacl_protected() { "P" } else { "" };
            write!(f, "S:{protected}{sacl}")?;
        }
        Ok(())
    }
}

#[ntsd_dtyp_derive::mbitfield]
pub struct SecurityDescriptorControl {
    pub owner_defaulted: bool,
    pub group_defaulted: bool,
    pub dacl_present: bool,
    pub dacl_defaulted: bool,

    pub sacl_present: bool,
    pub sacl_defaulted: bool,
    pub dacl_trusted: bool,
    pub server_security: bool,

    pub dacl_computed: bool,
    pub sacl_computed: bool,
    pub dacl_auto_inherited: bool,
    pub sacl_auto_inherited: bool,

    pub dacl_protected: bool,
    pub sacl_protected: bool,
    pub rm_control_valid: bool,
    pub self_relative: bool,
}
