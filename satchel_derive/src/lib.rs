mod enumeration;
mod message;

use proc_macro::TokenStream;
use proc_macro_error::{abort, proc_macro_error};
use syn::spanned::Spanned;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

/// Implement `Portable` and `Message` for a struct with named fields.
///
/// ```ignore
/// #[derive(Default, Message)]
/// #[message(history = order_history, message_trail = false)]
/// struct Order {
///     id: u32,
///     lines: Vec<Line>,
///     #[message(skip)]
///     total_cache: f64,
/// }
/// ```
#[proc_macro_derive(Message, attributes(message))]
#[proc_macro_error]
pub fn message_fn(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    if input.generics.lt_token.is_some() {
        abort!(input.generics.span(), "Generics are not supported");
    }
    let ds = match &input.data {
        Data::Struct(ds) => ds,
        Data::Enum(_) => {
            abort!(input.span(), "Enums are records of one kind only, use #[derive(Enumeration)]");
        }
        Data::Union(_) => {
            abort!(input.span(), "Unions are not supported");
        }
    };
    let Fields::Named(fields) = &ds.fields else {
        abort!(ds.fields.span(), "Only structs with named fields are supported");
    };
    let options = message::parse_options(&input.attrs);
    message::expand(&input.ident, fields, &options).into()
}

/// Implement `Portable` for a fieldless enum, carried as an `Enumeration`.
#[proc_macro_derive(Enumeration)]
#[proc_macro_error]
pub fn enumeration_fn(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    if input.generics.lt_token.is_some() {
        abort!(input.generics.span(), "Generics are not supported");
    }
    let Data::Enum(de) = &input.data else {
        abort!(input.span(), "Only fieldless enums are supported");
    };
    enumeration::expand(&input.ident, de).into()
}
