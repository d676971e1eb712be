//! Utility macros for building MS-DTYP structures.
//!
//! Those are re-exported by `ntsd-dtyp`, and should be used through it.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Fields, ItemStruct, parse_macro_input};

/// Proc-macro for declaring a flags word as a list of named bits.
///
/// Expands a struct of `bool` (and `#[skip]`-ed `Bn`) fields into a
/// [`modular_bitfield`](https://docs.rs/modular-bitfield) struct, that reads and writes
/// itself with `binrw` as the raw little-endian bytes.
///
/// The total number of bits must be a multiple of 8.
/// Skipped bits are still stored, so unknown bits survive a read-write cycle.
///
/// Valid usage is `#[mbitfield]` before a struct definition, with `binrw::prelude::*` and
/// `modular_bitfield::prelude::*` in scope.
#[proc_macro_attribute]
pub fn mbitfield(_attr: TokenStream, input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);

    if !matches!(item.fields, Fields::Named(_)) {
        return syn::Error::new_spanned(&item.fields, "Expected named fields for mbitfield")
            .to_compile_error()
            .into();
    }

    TokenStream::from(quote! {
        #[::modular_bitfield::bitfield]
        #[derive(::binrw::BinWrite, ::binrw::BinRead, Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[bw(map = |&x| Self::into_bytes(x))]
        #[br(map = Self::from_bytes)]
        #item
    })
}
