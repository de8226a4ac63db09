//! Procedural macros for the HDMI-CEC HAL conformance harness.
//!
//! This crate provides the `#[cec_test]` attribute macro for registering
//! conformance cases with the harness's case registry.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Expr, ExprLit, ItemFn, Lit, Meta};

/// Mark a function as a conformance case.
///
/// The function must take `&mut CaseContext` and return `CaseResult`; it is
/// registered with the case registry under its own name and picked up by the
/// runner binary.
///
/// # Attributes
///
/// - `#[cec_test]` - Case applying to any DUT
/// - `#[cec_test(device_type = "sink")]` - Sink-only case
/// - `#[cec_test(device_type = "source")]` - Source-only case
///
/// # Example
///
/// ```ignore
/// use cec_hal_conformance_macros::cec_test;
///
/// #[cec_test(device_type = "sink")]
/// fn receive_commands(cx: &mut CaseContext) -> CaseResult {
///     // drive the DUT, record steps...
///     cx.finish()
/// }
/// ```
#[proc_macro_attribute]
pub fn cec_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);

    let fn_name = &input_fn.sig.ident;
    let fn_name_str = fn_name.to_string();

    let device_type = match parse_device_type(attr) {
        DeviceTypeFilter::Any => quote! { ::core::option::Option::None },
        DeviceTypeFilter::Sink => quote! {
            ::core::option::Option::Some(::cec_hal_conformance::profile::DeviceType::Sink)
        },
        DeviceTypeFilter::Source => quote! {
            ::core::option::Option::Some(::cec_hal_conformance::profile::DeviceType::Source)
        },
    };

    // Generate the case function and inventory registration
    let expanded = quote! {
        #input_fn

        ::inventory::submit! {
            ::cec_hal_conformance::harness::CaseEntry::new(
                #fn_name_str,
                #device_type,
                #fn_name,
            )
        }
    };

    TokenStream::from(expanded)
}

enum DeviceTypeFilter {
    Any,
    Sink,
    Source,
}

fn parse_device_type(attr: TokenStream) -> DeviceTypeFilter {
    if attr.is_empty() {
        return DeviceTypeFilter::Any;
    }

    let meta: Result<Meta, _> = syn::parse(attr.clone());
    if let Ok(Meta::NameValue(nv)) = meta {
        if nv.path.is_ident("device_type") {
            if let Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) = nv.value
            {
                return match s.value().as_str() {
                    "sink" => DeviceTypeFilter::Sink,
                    "source" => DeviceTypeFilter::Source,
                    other => panic!(
                        "cec_test: unknown device_type '{}'. Supported: \"sink\", \"source\"",
                        other
                    ),
                };
            }
            panic!(
                "cec_test: device_type expects a string literal, \
                 e.g., #[cec_test(device_type = \"sink\")]"
            );
        }
    }

    panic!(
        "cec_test: unknown attribute '{}'. Supported: device_type = \"sink\" | \"source\"",
        attr
    );
}
