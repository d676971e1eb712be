//! Testing helpers for the `ntsd` crates.
//!
//! Wire tests are written as `Type => name: value => "hex"`, which expands to a `#[test]`
//! that reads the hex bytes and compares the result to `value` (`test_binrw_read!`),
//! one that writes `value` and compares the output to the hex bytes (`test_binrw_write!`),
//! or both (`test_binrw!`).

#[doc(hidden)]
pub use pastey;

#[doc(hidden)]
pub use binrw;

/// Decodes a hex string into a `Vec<u8>`, ignoring any whitespace inside it.
///
/// Panics on invalid input, so it must only be used in tests.
#[macro_export]
macro_rules! hex_to_u8_array {
    ($hex:expr) => {{
        let hex_str: String = ($hex).chars().filter(|c| !c.is_whitespace()).collect();
        $crate::decode_hex(&hex_str)
    }};
}

#[doc(hidden)]
pub fn decode_hex(hex_str: &str) -> Vec<u8> {
    match hex::decode(hex_str) {
        Ok(bytes) => bytes,
        Err(e) => panic!("invalid hex test data {hex_str:?}: {e}"),
    }
}

/// Generates a read test: parses the hex bytes as `$type` and compares to `$value`.
///
/// The whole input must be consumed.
#[macro_export]
macro_rules! test_binrw_read {
    (
        $type:ty => $name:ident: $value:expr => $hex:expr
    ) => {
        $crate::pastey::paste! {
            #[test]
            fn [<test_ $name:snake _read>]() {
                use $crate::binrw::{io::Cursor, prelude::*};
                let bytes = $crate::hex_to_u8_array! { $hex };
                let mut cursor = Cursor::new(&bytes);
                let parsed: $type = cursor.read_le().unwrap();
                assert_eq!(parsed, $value);
                assert_eq!(cursor.position() as usize, bytes.len());
            }
        }
    };
}

/// Generates a write test: writes `$value` and compares the output to the hex bytes.
#[macro_export]
macro_rules! test_binrw_write {
    (
        $type:ty => $name:ident: $value:expr => $hex:expr
    ) => {
        $crate::pastey::paste! {
            #[test]
            fn [<test_ $name:snake _write>]() {
                use $crate::binrw::{io::Cursor, prelude::*};
                let value: $type = $value;
                let mut cursor = Cursor::new(Vec::new());
                value.write_le(&mut cursor).unwrap();
                assert_eq!(cursor.into_inner(), $crate::hex_to_u8_array! { $hex });
            }
        }
    };
}

/// Generates both read and write tests for the same value and bytes.
#[macro_export]
macro_rules! test_binrw {
    (
        $($v:tt)+
    ) => {
        $crate::test_binrw_read! {
            $($v)+
        }
        $crate::test_binrw_write! {
            $($v)+
        }
    };
}
