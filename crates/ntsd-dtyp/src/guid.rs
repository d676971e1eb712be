//! MS-DTYP 2.3.4: GUID

use std::{fmt, str::FromStr};

use binrw::prelude::*;

use crate::DtypError;

/// A GUID, in the MS-DTYP packet representation.
///
/// The first three fields are little-endian on the wire, the last 8 bytes are raw.
#[binrw::binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[brw(little)]
pub struct Guid(u32, u16, u16, [u8; 8]);

impl Guid {
    pub const ZERO: Guid = Guid(0, 0, 0, [0; 8]);

    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Guid(data1, data2, data3, data4)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.3;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.0, self.1, self.2, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

impl FromStr for Guid {
    type Err = DtypError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DtypError::InvalidGuidString(s.to_string());
        let parts: Vec<&str> = s.split('-').collect();
        let lengths: Vec<usize> = parts.iter().map(|p| p.len()).collect();
        if lengths != [8, 4, 4, 4, 12] || !s.chars().all(|c| c == '-' || c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let data1 = u32::from_str_radix(parts[0], 16).map_err(|_| invalid())?;
        let data2 = u16::from_str_radix(parts[1], 16).map_err(|_| invalid())?;
        let data3 = u16::from_str_radix(parts[2], 16).map_err(|_| invalid())?;
        let mut data4 = [0u8; 8];
        hex::decode_to_slice(format!("{}{}", parts[3], parts[4]), &mut data4)
            .map_err(|_| invalid())?;
        Ok(Guid(data1, data2, data3, data4))
    }
}
