/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
#![forbid(unsafe_code)]

//! AASB Macro Library
//!
//! Procedural macros for declaring typed AASB payloads.
//!
//! # Message Macro
//!
//! The [`aasb_message`] macro binds a payload type to the `(topic, action)`
//! address it travels under:
//!
//! ```ignore
//! #[aasb_message(topic = "PhoneCallController", action = "create_call_id")]
//! pub struct CreateCallId {}
//!
//! #[aasb_message(topic = "PhoneCallController", action = "dial")]
//! pub struct Dial {
//!     pub call_id: String,
//!     pub callee: String,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::Span;

use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr};

fn has_derive(input: &DeriveInput, trait_name: &str) -> bool {
    input.attrs.iter().any(|attr| {
        if attr.path().is_ident("derive") {
            let mut found = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident(trait_name) {
                    found = true;
                }
                Ok(())
            });
            found
        } else {
            false
        }
    })
}

fn has_serde_attr(input: &DeriveInput) -> bool {
    input.attrs.iter().any(|attr| attr.path().is_ident("serde"))
}

/// Address parsed from `#[aasb_message(topic = "...", action = "...")]`.
#[derive(Default)]
struct MessageAddress {
    topic: Option<LitStr>,
    action: Option<LitStr>,
}

impl MessageAddress {
    fn parse(&mut self, meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
        if meta.path.is_ident("topic") {
            self.topic = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("action") {
            self.action = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported aasb_message property, expected `topic` or `action`"))
        }
    }
}

/// Declares a typed AASB payload bound to a topic and action.
///
/// ```ignore
/// use aasb_broker::prelude::*;
///
/// #[aasb_message(topic = "Navigation", action = "start_navigation")]
/// pub struct StartNavigation {
///     pub payload: String,
/// }
/// ```
///
/// This expands to:
/// - `#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]`, skipping
///   any of them the type already derives
/// - `#[serde(rename_all = "camelCase")]` when the macro supplies the serde
///   derives and the type carries no `#[serde]` attribute of its own, so
///   `call_id` travels as `callId`
/// - an implementation of `AasbMessage` with `TOPIC` and `ACTION` set to the
///   given strings
///
/// Both `topic` and `action` are required and must be non-empty. Unit structs
/// are rejected because they serialize to `null` rather than an object.
///
/// **Note:** the expansion refers to `serde` directly, so it must be a
/// dependency of the crate using the macro.
#[proc_macro_attribute]
pub fn aasb_message(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut address = MessageAddress::default();
    let address_parser = syn::meta::parser(|meta| address.parse(&meta));
    parse_macro_input!(attr with address_parser);

    let input = parse_macro_input!(item as DeriveInput);

    let (topic, action) = match (address.topic, address.action) {
        (Some(topic), Some(action)) if !topic.value().is_empty() && !action.value().is_empty() => {
            (topic, action)
        }
        _ => {
            return syn::Error::new(
                Span::call_site(),
                "aasb_message requires non-empty `topic = \"...\"` and `action = \"...\"`",
            )
            .to_compile_error()
            .into();
        }
    };

    if let syn::Data::Struct(data) = &input.data {
        if matches!(data.fields, syn::Fields::Unit) {
            return syn::Error::new_spanned(
                &input.ident,
                "AASB payloads are JSON objects; declare an empty payload as `struct Name {}`",
            )
            .to_compile_error()
            .into();
        }
    }

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let derives = {
        let mut traits = Vec::new();
        if !has_derive(&input, "Clone") {
            traits.push(quote!(Clone));
        }
        if !has_derive(&input, "Debug") {
            traits.push(quote!(Debug));
        }
        if !has_derive(&input, "Serialize") {
            traits.push(quote!(serde::Serialize));
        }
        if !has_derive(&input, "Deserialize") {
            traits.push(quote!(serde::Deserialize));
        }
        if traits.is_empty() {
            quote!()
        } else {
            quote!(#[derive(#(#traits),*)])
        }
    };

    let rename = if has_serde_attr(&input)
        || has_derive(&input, "Serialize")
        || has_derive(&input, "Deserialize")
    {
        quote!()
    } else {
        quote!(#[serde(rename_all = "camelCase")])
    };

    let expanded = quote! {
        #derives
        #rename
        #input

        impl #impl_generics ::aasb_broker::prelude::AasbMessage for #name #ty_generics #where_clause {
            const TOPIC: &'static str = #topic;
            const ACTION: &'static str = #action;
        }
    };

    TokenStream::from(expanded)
}
