//! Derive macros for single-entry event taxonomies
//!
//! # Available Macros
//!
//! - `#[derive(Event)]` - Generates the compile-time name table of an event enum
//!
//! # Example
//!
//! ```ignore
//! use single_entry_macros::Event;
//!
//! #[derive(Event, Clone, Debug)]
//! enum ProfileEvent {
//!     #[intent]
//!     SystemShowsUserProfileView,
//!
//!     #[completion]
//!     NetworkFinishesLoadingProfile(Ticket, Result<Profile, EffectError>),
//! }
//!
//! // Generated:
//! assert_eq!(ProfileEvent::SystemShowsUserProfileView.name(), "systemShowsUserProfileView");
//! assert_eq!(ProfileEvent::NAMES.len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, parse_macro_input};

/// Derive macro for event enums
///
/// Implements `single_entry_core::event::Named` with one exhaustive match arm
/// per variant and adds an associated `NAMES` constant listing every name in
/// declaration order.
///
/// Names are the variant identifier with its first letter lowercased
/// (`UserTapsChangeEmailButton` → `"userTapsChangeEmailButton"`).
///
/// # Attributes
///
/// Every variant must carry exactly one of:
///
/// - `#[intent]` - The variant originates outside the reducer
/// - `#[completion]` - The variant carries the result of an effect
///
/// # Panics
///
/// This macro will produce a compile error (not a runtime panic) if:
/// - Applied to a non-enum type or to an enum without variants
/// - A variant has neither or both of `#[intent]` and `#[completion]`
#[proc_macro_derive(Event, attributes(intent, completion))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_event(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Build the `Named` impl and `NAMES` constant for an event enum
fn expand_event(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(Event)] can only be used on enums",
        ));
    };

    if data_enum.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "#[derive(Event)] needs at least one variant",
        ));
    }

    let mut name_arms = Vec::new();
    let mut kind_arms = Vec::new();
    let mut names = Vec::new();

    for variant in &data_enum.variants {
        let variant_name = &variant.ident;
        let is_intent = has_attribute(&variant.attrs, "intent");
        let is_completion = has_attribute(&variant.attrs, "completion");

        let kind = match (is_intent, is_completion) {
            (true, false) => quote! { ::single_entry_core::event::EventKind::Intent },
            (false, true) => quote! { ::single_entry_core::event::EventKind::Completion },
            (true, true) => {
                return Err(syn::Error::new_spanned(
                    variant,
                    "Variant cannot be both #[intent] and #[completion]",
                ));
            }
            (false, false) => {
                return Err(syn::Error::new_spanned(
                    variant,
                    "Variant must be marked #[intent] or #[completion]",
                ));
            }
        };

        let stable_name = lower_camel(&variant_name.to_string());
        let pattern = match &variant.fields {
            Fields::Named(_) => quote! { Self::#variant_name { .. } },
            Fields::Unnamed(_) => quote! { Self::#variant_name(..) },
            Fields::Unit => quote! { Self::#variant_name },
        };

        name_arms.push(quote! { #pattern => #stable_name, });
        kind_arms.push(quote! { #pattern => #kind, });
        names.push(stable_name);
    }

    Ok(quote! {
        impl #impl_generics ::single_entry_core::event::Named for #name #ty_generics #where_clause {
            fn name(&self) -> &'static str {
                match self {
                    #(#name_arms)*
                }
            }

            fn kind(&self) -> ::single_entry_core::event::EventKind {
                match self {
                    #(#kind_arms)*
                }
            }
        }

        impl #impl_generics #name #ty_generics #where_clause {
            /// Stable names of every variant, in declaration order
            pub const NAMES: &'static [&'static str] = &[#(#names),*];
        }
    })
}

/// Lowercase the first character of a variant identifier
fn lower_camel(ident: &str) -> String {
    let mut chars = ident.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

/// Helper function to check if an attribute list contains a specific attribute
fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}
