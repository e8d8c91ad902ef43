//! Test attribute that runs an async test body on its own Tokio runtime and fails it when
//! it does not finish in time.
//!
//! ```ignore
//! #[test_timeout::tokio_timeout_test]
//! async fn single_threaded() {}
//!
//! #[test_timeout::tokio_timeout_test(timeout = 10, workers = 4)]
//! async fn racing_callers() {}
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Attribute, Expr, ExprLit, ItemFn, Lit, LitInt, MetaNameValue, Token};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

struct TestOptions {
    timeout_secs: u64,
    workers: Option<u64>,
}

#[proc_macro_attribute]
pub fn tokio_timeout_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = match parse_options(attr) {
        Ok(options) => options,
        Err(err) => return err.to_compile_error().into(),
    };

    let ItemFn {
        attrs,
        vis,
        mut sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            &sig.ident,
            "tokio_timeout_test can only be applied to async functions",
        )
        .to_compile_error()
        .into();
    }
    sig.asyncness = None;

    let filtered_attrs: Vec<Attribute> = attrs
        .into_iter()
        .filter(|attr| !is_test_attribute(attr))
        .collect();

    let timeout = options.timeout_secs;
    let runtime = match options.workers {
        Some(workers) => {
            let workers = workers as usize;
            quote! {
                tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(#workers)
                    .enable_all()
                    .build()
            }
        }
        None => quote! {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
        },
    };

    TokenStream::from(quote! {
        #[test]
        #(#filtered_attrs)*
        #vis #sig {
            let timeout_duration = std::time::Duration::from_secs(#timeout);
            let (sender, receiver) = std::sync::mpsc::channel();
            std::thread::spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    let runtime = #runtime.expect("failed to build Tokio runtime");
                    runtime.block_on(async move #block);
                }));
                let _ = sender.send(result);
            });
            match receiver.recv_timeout(timeout_duration) {
                Ok(Ok(())) => {}
                Ok(Err(payload)) => std::panic::resume_unwind(payload),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    panic!("test timed out after {:?}", timeout_duration)
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    panic!("test thread failed before reporting result")
                }
            }
        }
    })
}

/// Accepts nothing, a bare timeout in seconds, or `timeout = N, workers = M`.
fn parse_options(attr: TokenStream) -> syn::Result<TestOptions> {
    let mut options = TestOptions {
        timeout_secs: DEFAULT_TIMEOUT_SECS,
        workers: None,
    };
    if attr.is_empty() {
        return Ok(options);
    }
    if let Ok(lit) = syn::parse::<LitInt>(attr.clone()) {
        options.timeout_secs = positive(&lit)?;
        return Ok(options);
    }

    let args = Punctuated::<MetaNameValue, Token![,]>::parse_terminated.parse(attr)?;
    for arg in args {
        let lit = match &arg.value {
            Expr::Lit(ExprLit {
                lit: Lit::Int(lit), ..
            }) => lit,
            other => return Err(syn::Error::new_spanned(other, "expected an integer literal")),
        };
        if arg.path.is_ident("timeout") {
            options.timeout_secs = positive(lit)?;
        } else if arg.path.is_ident("workers") {
            options.workers = Some(positive(lit)?);
        } else {
            return Err(syn::Error::new_spanned(
                &arg.path,
                "unknown option, expected `timeout` or `workers`",
            ));
        }
    }
    Ok(options)
}

fn positive(lit: &LitInt) -> syn::Result<u64> {
    let value: u64 = lit.base10_parse()?;
    if value == 0 {
        return Err(syn::Error::new_spanned(lit, "value must be greater than zero"));
    }
    Ok(value)
}

fn is_test_attribute(attr: &Attribute) -> bool {
    let path = attr.path();
    path.is_ident("test")
        || matches!(
            path.segments.iter().map(|s| s.ident.to_string()).collect::<Vec<_>>().as_slice(),
            [first, second] if first == "tokio" && second == "test"
        )
}
