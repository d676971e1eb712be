//! The directory search collaborator that supplies security descriptors.

use log::debug;
use ntsd_dtyp::{SecurityDescriptor, SecurityInformation, WireFormat, bytes};

use crate::{DaclError, Result};

/// The attribute holding an object's security descriptor.
pub const NT_SECURITY_DESCRIPTOR_ATTRIBUTE: &str = "nTSecurityDescriptor";

/// LDAP_SERVER_SD_FLAGS_OID: selects the parts of `nTSecurityDescriptor` returned.
pub const SD_FLAGS_CONTROL_OID: &str = "1.2.840.113556.1.4.801";

/// Searches a directory for the security descriptors of the objects matching a filter.
///
/// Implementations request [`NT_SECURITY_DESCRIPTOR_ATTRIBUTE`] with the
/// [`SD_FLAGS_CONTROL_OID`] control set to [`sd_flags_control_value`], and return the raw
/// attribute value of every matching entry.
pub trait DirectorySearch {
    fn search_security_descriptors(&self, filter: &str) -> Result<Vec<Vec<u8>>>;
}

impl<F> DirectorySearch for F
where
    F: Fn(&str) -> Result<Vec<Vec<u8>>>,
{
    fn search_security_descriptors(&self, filter: &str) -> Result<Vec<Vec<u8>>> {
        self(filter)
    }
}

/// BER value of the SD flags control: `SEQUENCE { INTEGER flags }`.
pub fn sd_flags_control_value(info: SecurityInformation) -> Vec<u8> {
    let be = info.bits().to_be_bytes();
    let mut integer = bytes::left_trim(&be).to_vec();
    if integer.first().is_none_or(|b| b & 0x80 != 0) {
        integer.insert(0, 0);
    }
    let mut value = vec![0x30, integer.len() as u8 + 2, 0x02, integer.len() as u8];
    value.extend(integer);
    value
}

/// Fetches and decodes the single security descriptor matching `filter`.
pub fn fetch_security_descriptor(
    search: &dyn DirectorySearch,
    filter: &str,
) -> Result<SecurityDescriptor> {
    let mut results = search.search_security_descriptors(filter)?;
    debug!("Search {filter:?} returned {} entries", results.len());
    match results.len() {
        0 => Err(DaclError::NotFound(filter.to_string())),
        1 => {
            let raw = results.remove(0);
            Ok(SecurityDescriptor::from_wire(&raw)?)
        }
        _ => Err(DaclError::TooManyResults(filter.to_string())),
    }
}
