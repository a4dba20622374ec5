use proc_macro2::TokenStream;
use proc_macro_error::abort;
use quote::{quote, TokenStreamExt};
use syn::{Attribute, FieldsNamed, Ident, LitBool, Path};

pub struct MessageOptions {
    history: Option<Path>,
    not_portable: bool,
    message_trail: bool,
    execution_trace: bool,
    copy_before_sending: bool,
}

pub fn parse_options(attrs: &[Attribute]) -> MessageOptions {
    let mut options = MessageOptions {
        history: None,
        not_portable: false,
        message_trail: true,
        execution_trace: true,
        copy_before_sending: true,
    };
    for attr in attrs.iter().filter(|a| a.path().is_ident("message")) {
        let r = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("history") {
                options.history = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("not_portable") {
                options.not_portable = true;
            } else if meta.path.is_ident("message_trail") {
                options.message_trail = meta.value()?.parse::<LitBool>()?.value;
            } else if meta.path.is_ident("execution_trace") {
                options.execution_trace = meta.value()?.parse::<LitBool>()?.value;
            } else if meta.path.is_ident("copy_before_sending") {
                options.copy_before_sending = meta.value()?.parse::<LitBool>()?.value;
            } else {
                return Err(meta.error("unsupported message option"));
            }
            Ok(())
        });
        if let Err(e) = r {
            abort!(e.span(), "{}", e);
        }
    }
    options
}

fn is_skipped(attrs: &[Attribute]) -> bool {
    let mut skip = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("message")) {
        let r = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("only #[message(skip)] is supported on fields"))
            }
        });
        if let Err(e) = r {
            abort!(e.span(), "{}", e);
        }
    }
    skip
}

pub fn expand(ident: &Ident, fields: &FieldsNamed, options: &MessageOptions) -> TokenStream {
    let ident_str = ident.to_string();

    let mut declare_ts = quote!();
    let mut to_value_ts = quote!();
    let mut from_value_ts = quote!();
    for f in &fields.named {
        if is_skipped(&f.attrs) {
            continue;
        }
        let Some(name) = &f.ident else {
            continue;
        };
        let name_str = name.to_string();
        let name_str = name_str.strip_prefix("r#").unwrap_or(&name_str);
        let ty = &f.ty;
        declare_ts.append_all(quote!(
            declarations.declare_with(#name_str, <#ty as ::satchel_base::Portable>::declare);
        ));
        to_value_ts.append_all(quote!(
            .with(#name_str, ::satchel_base::Portable::to_value(&self.#name))
        ));
        from_value_ts.append_all(quote!(
            if let Some(v) = record.take(#name_str) {
                out.#name = <#ty as ::satchel_base::Portable>::from_value(v)
                    .map_err(|e| e.within(#name_str))?;
            }
        ));
    }

    let history_ts = match &options.history {
        Some(path) => quote!(
            fn version_history() -> Option<::satchel_base::VersionHistory> {
                Some(#path())
            }
        ),
        None => quote!(),
    };
    let not_portable = options.not_portable;
    let message_trail = options.message_trail;
    let execution_trace = options.execution_trace;
    let copy_before_sending = options.copy_before_sending;

    quote!(
        impl ::satchel_base::Portable for #ident {
            fn declare(graph: &mut ::satchel_base::TypeGraph) -> ::satchel_base::NodeId {
                graph.user_defined(<Self as ::satchel_base::Message>::PATH)
            }

            fn to_value(&self) -> ::satchel_base::Value {
                ::satchel_base::Value::Record(
                    ::satchel_base::Record::new(<Self as ::satchel_base::Message>::PATH)
                        #to_value_ts
                )
            }

            #[allow(unused_mut)]
            fn from_value(
                value: ::satchel_base::Value,
            ) -> ::core::result::Result<Self, ::satchel_base::ValueError> {
                let mut record = value.into_record(<Self as ::satchel_base::Message>::PATH)?;
                let mut out = <Self as ::core::default::Default>::default();
                #from_value_ts
                Ok(out)
            }
        }

        impl ::satchel_base::Message for #ident {
            const NAME: &'static str = #ident_str;
            const MODULE: &'static str = module_path!();
            const PATH: &'static str = concat!(module_path!(), "::", #ident_str);

            fn explicit(declarations: &mut ::satchel_base::Declarations) {
                #declare_ts
            }

            #history_ts

            fn options() -> ::satchel_base::MessageOptions {
                ::satchel_base::MessageOptions {
                    message_trail: #message_trail,
                    execution_trace: #execution_trace,
                    copy_before_sending: #copy_before_sending,
                    not_portable: #not_portable,
                }
            }
        }
    )
}
