use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Fields, GenericArgument, Ident, LitStr, PathArguments, Type,
    spanned::Spanned,
};

pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "`#[derive(Trigger)]` does not support generic triggers",
        ));
    }

    let event = event_name(input)?;
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "Trigger struct must have named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "`#[derive(Trigger)]` can only be used on structs",
            ));
        }
    };

    let mut base = None;
    let mut rest = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        match base_value_type(&field.ty) {
            Some(value) if base.is_none() => base = Some((ident, value)),
            Some(_) => {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "Trigger struct must have exactly one `TriggerBase<T>` field",
                ));
            }
            None => rest.push(ident),
        }
    }
    let Some((field, value)) = base else {
        return Err(syn::Error::new(
            fields.span(),
            "Trigger struct needs a `TriggerBase<T>` field",
        ));
    };

    let event_str = event.to_string();
    let raise = format_ident!("on_{}", event);
    let wait = format_ident!("{}_async", event);
    let handler = format_ident!("{}_handler", event);
    let stream = format_ident!("{}_stream", event);
    let doc_raise = format!("Deliver a `{event_str}` event to every awaiter.");
    let doc_wait = format!("Wait for the next `{event_str}` event.");
    let doc_handler = format!("A reusable waiter for `{event_str}` events.");
    let doc_stream = format!("Pull `{event_str}` events one at a time.");

    Ok(quote! {
        impl ::cue::Trigger for #name {
            type Value = #value;
            const EVENT: &'static str = #event_str;

            fn from_base(base: ::cue::TriggerBase<#value>) -> Self {
                Self {
                    #field: base,
                    #(#rest: ::core::default::Default::default(),)*
                }
            }

            fn base(&self) -> &::cue::TriggerBase<#value> {
                &self.#field
            }
        }

        impl #name {
            #[doc = #doc_raise]
            pub fn #raise(&self, value: #value) {
                self.#field.raise(value);
            }

            #[doc = #doc_wait]
            pub fn #wait(&self, cancel: &::cue::CancelToken) -> ::cue::Wait<#value> {
                ::cue::EventSourceExt::wait_once(&self.#field, cancel)
            }

            #[doc = #doc_handler]
            pub fn #handler(&self, cancel: &::cue::CancelToken) -> ::cue::ReusableWaiter<#value> {
                ::cue::EventSourceExt::get_handle(&self.#field, cancel)
            }

            #[doc = #doc_stream]
            pub fn #stream(
                &self,
                cancel: &::cue::CancelToken,
            ) -> ::cue::TriggerStream<#value, ::cue::TriggerBase<#value>> {
                ::cue::EventSourceExt::as_stream(&self.#field, cancel)
            }
        }

        ::cue::__submit_trigger! {
            ::cue::TriggerDescriptor::new(
                #event_str,
                ::core::stringify!(#name),
                ::core::module_path!(),
                ::core::stringify!(#value),
            )
        }
    })
}

/// `T` if `ty` is `TriggerBase<T>` (by last path segment).
fn base_value_type(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "TriggerBase" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(value) if args.args.len() == 1 => Some(value),
        _ => None,
    }
}

fn event_name(input: &DeriveInput) -> syn::Result<Ident> {
    let mut event = None;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("trigger")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("event") {
                let lit: LitStr = meta.value()?.parse()?;
                let ident = syn::parse_str::<Ident>(&lit.value()).map_err(|_| {
                    syn::Error::new(lit.span(), "event name must be a valid identifier")
                })?;
                event = Some(Ident::new(&ident.to_string(), lit.span()));
                Ok(())
            } else {
                Err(meta.error("unsupported trigger attribute, expected `event`"))
            }
        })?;
    }
    match event {
        Some(event) => Ok(event),
        None => default_event_name(&input.ident),
    }
}

fn default_event_name(name: &Ident) -> syn::Result<Ident> {
    let raw = name.to_string();
    let stem = raw.strip_suffix("Trigger").unwrap_or(&raw);
    if stem.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "cannot derive an event name, add `#[trigger(event = \"...\")]`",
        ));
    }
    Ok(Ident::new(&snake_case(stem), name.span()))
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.char_indices() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
