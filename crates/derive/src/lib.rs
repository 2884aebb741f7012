#![recursion_limit = "128"]

extern crate proc_macro;

use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{parenthesized, spanned::Spanned, Result};
use syn::{punctuated::Punctuated, token::Comma, DeriveInput};

struct TypeTag {
    pub inner: syn::LitStr,
}

impl Parse for TypeTag {
    fn parse(input: ParseStream) -> Result<Self> {
        let content;
        parenthesized!(content in input);
        let punctuated = Punctuated::<syn::LitStr, Comma>::parse_terminated(&content)?;

        match punctuated.into_iter().next() {
            Some(inner) => Ok(TypeTag { inner }),
            None => Err(content.error("expected a string literal")),
        }
    }
}

#[derive(Default, Debug)]
struct FieldTags {
    is_base: bool,
}

impl Parse for FieldTags {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut is_base = false;

        let content;
        parenthesized!(content in input);
        let punctuated = Punctuated::<syn::Ident, Comma>::parse_terminated(&content)?;

        for ident in punctuated {
            match ident.to_string().as_str() {
                "base" => is_base = true,
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown message field attribute `{}`", other),
                    ))
                }
            }
        }

        Ok(FieldTags { is_base })
    }
}

/// Finds the single field tagged `#[message(base)]`, returning its accessor and type.
fn base_field(ast: &DeriveInput) -> Result<Option<(TokenStream, syn::Type)>> {
    let fields = match &ast.data {
        syn::Data::Struct(data) => &data.fields,
        _ => return Ok(None),
    };

    let mut found: Option<(TokenStream, syn::Type)> = None;

    for (idx, field) in fields.iter().enumerate() {
        for attr in &field.attrs {
            if !attr.path.is_ident("message") {
                continue;
            }

            let tags: FieldTags = syn::parse2(attr.tokens.clone())?;
            if !tags.is_base {
                continue;
            }

            if found.is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "a message can extend at most one base message",
                ));
            }

            let accessor = match &field.ident {
                Some(ident) => quote! { #ident },
                None => {
                    let index = syn::Index::from(idx);
                    quote! { #index }
                }
            };

            found = Some((accessor, field.ty.clone()));
        }
    }

    Ok(found)
}

fn type_tag_name(ast: &DeriveInput, type_tag: Option<String>, namespace: Option<String>) -> TokenStream {
    let class_name = &ast.ident;

    if let Some(tt) = type_tag {
        return quote! { #tt };
    }

    if !ast.generics.params.is_empty() {
        return quote! { core::any::type_name::<Self>() };
    }

    let name = match namespace {
        Some(ns) => format!("{}::{}", ns, class_name),
        None => class_name.to_string(),
    };

    quote! { #name }
}

fn derive_message_impl(ast: DeriveInput) -> Result<TokenStream> {
    let mut type_tag = None;
    let mut namespace = None;

    for attr in &ast.attrs {
        if let Some(i) = attr.path.get_ident() {
            match i.to_string().as_str() {
                "type_tag" => {
                    let tt: TypeTag = syn::parse2(attr.tokens.clone())?;
                    type_tag = Some(tt.inner.value());
                }

                "namespace" => {
                    let tt: TypeTag = syn::parse2(attr.tokens.clone())?;
                    namespace = Some(tt.inner.value());
                }

                _ => (),
            }
        }
    }

    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let tag_name = type_tag_name(&ast, type_tag, namespace);

    let (base_tag, base_part) = match base_field(&ast)? {
        Some((accessor, ty)) => (
            quote! { Some(<#ty as muni::Message>::TYPE_TAG as fn() -> muni::TypeTag) },
            quote! {
                fn base(&self) -> Option<&dyn muni::Message> {
                    Some(&self.#accessor)
                }
            },
        ),
        None => (quote! { None }, quote! {}),
    };

    Ok(quote! {
        impl #impl_generics muni::Message for #name #ty_generics #where_clause {
            #[allow(non_snake_case)]
            fn TYPE_TAG() -> muni::TypeTag {
                muni::TypeTag::new::<Self>(#tag_name, #base_tag)
            }

            fn type_tag(&self) -> muni::TypeTag {
                <Self as muni::Message>::TYPE_TAG()
            }

            fn as_any_ref(&self) -> &dyn core::any::Any {
                self
            }

            #base_part
        }
    })
}

/// Implements `muni::Message` for a struct or enum.
///
/// A struct may mark one field with `#[message(base)]`; that field is the
/// message's parent type, and subscribers of the parent receive it whenever
/// the derived message is posted.
#[proc_macro_derive(Message, attributes(type_tag, message, namespace))]
pub fn derive_message(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let ast = syn::parse_macro_input!(input as DeriveInput);

    match derive_message_impl(ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
