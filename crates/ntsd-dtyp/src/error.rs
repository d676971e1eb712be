use thiserror::Error;

/// Errors raised while decoding, encoding or building MS-DTYP structures.
#[derive(Debug, Error)]
pub enum DtypError {
    /// Malformed or truncated binary input.
    ///
    /// `message` starts with the name of the structure being decoded.
    #[error("Malformed input at offset {offset}: {message}")]
    Format { offset: u64, message: String },

    #[error("Binary codec error: {0}")]
    BinRW(binrw::Error),

    #[error("Invalid SID string: {0:?}")]
    InvalidSidString(String),

    #[error("Invalid GUID string: {0:?}")]
    InvalidGuidString(String),

    #[error("A SID holds at most 15 sub-authorities, got {0}")]
    TooManySubAuthorities(usize),

    #[error("SID identifier authority {0:#x} does not fit in 48 bits")]
    InvalidAuthority(u64),

    #[error("ACE application data must be a multiple of 4 bytes, got {0}")]
    InvalidApplicationData(usize),

    #[error("ACE type {0:?} does not carry object data")]
    NotAnObjectAce(crate::security::AceType),

    #[error("Cannot expand {0} bytes into bits, at most 4 are supported")]
    TooManyBytes(usize),
}

impl From<binrw::Error> for DtypError {
    fn from(value: binrw::Error) -> Self {
        match root_cause(value) {
            binrw::Error::AssertFail { pos, message } => DtypError::Format {
                offset: pos,
                message,
            },
            other => DtypError::BinRW(other),
        }
    }
}

/// Strips the field context `binrw` derives wrap around errors.
pub(crate) fn root_cause(error: binrw::Error) -> binrw::Error {
    match error {
        binrw::Error::Backtrace(bt) => root_cause(*bt.error),
        other => other,
    }
}
