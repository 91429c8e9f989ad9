//! Procedural macros used by `udpview`.
//!
//! Do not use this crate directly, use `udpview` instead.

use proc_macro::{Span, TokenStream};
use quote::quote;
use syn::{parse::Error, ItemFn};

/// Runs the annotated `main` function on a background thread, with the GUI event loop on the
/// main thread.
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    match expand_main(args, item.clone()) {
        Ok(tokens) => tokens,
        Err(err) => {
            // Emit the `compile_error!` invocation, alongside the original item, in an attempt to
            // improve IDE support.
            let mut error = item;
            error.extend(TokenStream::from(err.to_compile_error()));
            error
        }
    }
}

fn expand_main(args: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    if !args.is_empty() {
        return Err(Error::new(
            Span::call_site().into(),
            "`#[udpview::main]` does not accept arguments",
        ));
    }

    let item = syn::parse::<ItemFn>(item)?;

    if item.sig.ident != "main" {
        return Err(Error::new(
            item.sig.ident.span(),
            "`#[udpview::main]` must be applied to a function called `main`",
        ));
    }
    if item.sig.asyncness.is_some() {
        return Err(Error::new(
            item.sig.fn_token.span,
            "`#[udpview::main]` cannot be applied to an `async fn`",
        ));
    }
    if !item.sig.inputs.is_empty() {
        return Err(Error::new(
            item.sig.ident.span(),
            "`main` must not take any arguments",
        ));
    }

    Ok(quote! {
        fn main() {
            #item

            ::udpview::init_logger!();

            ::udpview::run(main);
        }
    }
    .into())
}
