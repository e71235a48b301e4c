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

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Runs an async test body on a fresh multi-threaded Tokio runtime.
///
/// The body executes inside an `aasb_test` tracing span. A panic hook records
/// any panic raised on any thread while the test runs, including panics that
/// the broker isolates inside subscriber callbacks, and the test fails with
/// the recorded location and message. Tests that panic on purpose should use
/// `#[tokio::test]` instead.
#[proc_macro_attribute]
pub fn aasb_test(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;
    let attrs = &input.attrs;
    let name = &sig.ident;
    let inputs = &sig.inputs;
    let output = &sig.output;

    let async_name = syn::Ident::new(&format!("__{name}_async"), name.span());

    let output = quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() {
            use std::sync::atomic::{AtomicBool, Ordering};
            use std::sync::Arc;
            use std::panic;
            use ::aasb_test::__private::parking_lot;
            use ::aasb_test::__private::tracing;

            #[derive(Clone, Default)]
            struct PanicRecord {
                occurred: Arc<AtomicBool>,
                message: Arc<parking_lot::Mutex<Option<String>>>,
                location: Arc<parking_lot::Mutex<Option<String>>>,
            }

            let record = PanicRecord::default();
            let hook_record = record.clone();

            let orig_hook = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                hook_record.occurred.store(true, Ordering::SeqCst);
                let message = info
                    .payload()
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| info.payload().downcast_ref::<String>().cloned());
                *hook_record.message.lock() = message.clone();
                *hook_record.location.lock() = info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
                let cleaned = message
                    .unwrap_or_else(|| "No error message".to_string())
                    .trim()
                    .replace('\n', " ");
                tracing::error!("Panic: {}", cleaned);
                orig_hook(info);
            }));

            let runtime = ::aasb_test::__private::tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("failed to build the aasb_test runtime");

            let result = runtime.block_on(async {
                let test_span = tracing::info_span!("aasb_test", name = stringify!(#name));
                let _enter = test_span.enter();
                #async_name().await
            });

            if record.occurred.load(Ordering::SeqCst) {
                let message = record.message.lock().clone();
                let location = record
                    .location
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "unknown location".to_string());
                let cleaned = message
                    .unwrap_or_else(|| "No error message".to_string())
                    .trim()
                    .replace('\n', " ");
                panic!("Panic at {}: {}", location, cleaned);
            }

            result.unwrap()
        }

        async fn #async_name(#inputs) #output #body
    };

    output.into()
}
