use proc_macro2::TokenStream;
use proc_macro_error::abort;
use quote::quote;
use syn::spanned::Spanned;
use syn::{DataEnum, Fields, Ident};

pub fn expand(ident: &Ident, de: &DataEnum) -> TokenStream {
    let ident_str = ident.to_string();
    let mut names = Vec::new();
    let mut variants = Vec::new();
    for variant in de.variants.iter() {
        if !matches!(variant.fields, Fields::Unit) {
            abort!(variant.span(), "Enumeration members cannot carry fields");
        }
        names.push(variant.ident.to_string());
        variants.push(&variant.ident);
    }
    if variants.is_empty() {
        abort!(ident.span(), "Enumeration needs at least one member");
    }

    quote!(
        impl ::satchel_base::Portable for #ident {
            fn declare(graph: &mut ::satchel_base::TypeGraph) -> ::satchel_base::NodeId {
                let members = [#( (#names, Self::#variants as i64) ),*];
                match ::satchel_base::Enumeration::new(#ident_str, members) {
                    Ok(e) => graph.fixed(::satchel_base::TypeExpr::Enumeration(
                        ::std::sync::Arc::new(e),
                    )),
                    // Fails again with the full track when fixed.
                    Err(_) => graph.class(::satchel_base::Kind::Enumeration),
                }
            }

            fn to_value(&self) -> ::satchel_base::Value {
                let n = match self {
                    #( Self::#variants => Self::#variants as i64, )*
                };
                ::satchel_base::Value::Enumeration(n)
            }

            fn from_value(
                value: ::satchel_base::Value,
            ) -> ::core::result::Result<Self, ::satchel_base::ValueError> {
                let n = match value {
                    ::satchel_base::Value::Enumeration(n) | ::satchel_base::Value::Integer(n) => n,
                    other => return Err(other.mismatch("Enumeration")),
                };
                #(
                    if n == Self::#variants as i64 {
                        return Ok(Self::#variants);
                    }
                )*
                Err(::satchel_base::ValueError::OutOfRange(n.to_string(), #ident_str))
            }
        }
    )
}
