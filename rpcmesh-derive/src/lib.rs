//! Procedural macros generating the field/argument tables
//! `rpcmesh-core`'s declarative object model and RPC object model expect,
//! so callers declare an ordinary struct or function instead of
//! hand-assembling a `FieldDescriptor`/`ArgDescriptor` table themselves.
//! The builder forms those tables feed are public in `rpcmesh-core` and
//! remain available directly for callers who'd rather not use a macro —
//! these two macros just generate what that builder form would have been
//! written by hand.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, FnArg, ItemFn, Pat, ReturnType};

/// Generates `Serialisable`, `TypedSerialiser`, `DescribeType`, and
/// `ListTypes` impls for a struct with named fields. A field's wire name
/// defaults to its Rust name; `#[rpcmesh(name = "...")]` overrides it.
#[proc_macro_derive(Serialisable, attributes(rpcmesh))]
pub fn derive_serialisable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let struct_name = &input.ident;

    let Data::Struct(data) = &input.data else {
        return syn::Error::new_spanned(&input, "Serialisable can only be derived for a struct")
            .to_compile_error()
            .into();
    };
    let Fields::Named(fields) = &data.fields else {
        return syn::Error::new_spanned(&input, "Serialisable requires named fields")
            .to_compile_error()
            .into();
    };

    let type_name = struct_name.to_string();
    let mut descriptors = Vec::new();
    let mut describe_members = Vec::new();
    let mut type_members = Vec::new();
    let mut nested_list_types = Vec::new();

    for field in &fields.named {
        let field_ident = field.ident.as_ref().expect("named field");
        let field_ty = &field.ty;
        let wire_name = field_rename(field).unwrap_or_else(|| field_ident.to_string());

        descriptors.push(quote! {
            rpcmesh_core::object::FieldDescriptor {
                name: #wire_name,
                flags: rpcmesh_core::flags::Flags::none(),
                get: |value: &#struct_name| rpcmesh_core::object::FieldRef::new(&value.#field_ident),
                get_mut: |value: &mut #struct_name| rpcmesh_core::object::FieldRefMut::new(&mut value.#field_ident),
            }
        });
        describe_members.push(quote! {
            filler.add_member(#wire_name, "", &mut |sub| <#field_ty as rpcmesh_core::typed::DescribeType>::describe_type(sub));
        });
        type_members.push(quote! {
            members.add_member(#wire_name, "", &mut |sub| <#field_ty as rpcmesh_core::typed::DescribeType>::describe_type(sub));
        });
        nested_list_types.push(quote! {
            <#field_ty as rpcmesh_core::typed::ListTypes>::list_types(filler);
        });
    }

    let expanded = quote! {
        impl #struct_name {
            fn __rpcmesh_fields() -> &'static [rpcmesh_core::object::FieldDescriptor<#struct_name>] {
                static FIELDS: &[rpcmesh_core::object::FieldDescriptor<#struct_name>] = &[
                    #(#descriptors),*
                ];
                FIELDS
            }
        }

        impl rpcmesh_core::object::Serialisable for #struct_name {
            fn serialise(&self, out: &mut dyn rpcmesh_core::io::StructuredOutput, flags: rpcmesh_core::flags::Flags) {
                rpcmesh_core::object::serialise_fields(self, Self::__rpcmesh_fields(), out, flags);
            }

            fn deserialise(&mut self, input: &mut dyn rpcmesh_core::io::StructuredInput, flags: rpcmesh_core::flags::Flags) -> bool {
                rpcmesh_core::object::deserialise_fields(self, Self::__rpcmesh_fields(), input, flags)
            }

            fn describe(&self, filler: &mut dyn rpcmesh_core::object::PropertyDescriptionFiller) {
                #(#describe_members)*
            }

            fn type_name(&self) -> &'static str {
                #type_name
            }
        }

        impl rpcmesh_core::typed::TypedSerialiser for #struct_name {
            fn serialise_member(value: &Self, out: &mut dyn rpcmesh_core::io::StructuredOutput, flags: rpcmesh_core::flags::Flags) {
                rpcmesh_core::object::Serialisable::serialise(value, out, flags);
            }

            fn deserialise_member(value: &mut Self, input: &mut dyn rpcmesh_core::io::StructuredInput, flags: rpcmesh_core::flags::Flags) {
                rpcmesh_core::object::Serialisable::deserialise(value, input, flags);
            }
        }

        impl rpcmesh_core::typed::DescribeType for #struct_name {
            fn describe_type(filler: &mut dyn rpcmesh_core::object::PropertyDescriptionFiller) {
                filler.add_subobject(Some(#type_name), &mut |_| {});
            }
        }

        impl rpcmesh_core::typed::ListTypes for #struct_name {
            fn list_types(filler: &mut dyn rpcmesh_core::object::SerialisableDescriptionFiller) {
                filler.fill_members(#type_name, &mut |members| {
                    #(#type_members)*
                });
                #(#nested_list_types)*
            }
        }
    };

    expanded.into()
}

fn field_rename(field: &syn::Field) -> Option<String> {
    for attr in &field.attrs {
        if !attr.path().is_ident("rpcmesh") {
            continue;
        }
        let mut renamed = None;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value = meta.value()?;
                let lit: syn::LitStr = value.parse()?;
                renamed = Some(lit.value());
            }
            Ok(())
        });
        if renamed.is_some() {
            return renamed;
        }
    }
    None
}

/// Builds an `RpcLambda` from an ordinary function declaration: each
/// parameter's name and its own `#[doc = "..."]` (or `///`) becomes one
/// entry in the argument table `rpcmesh-wsp` later reads back out, and
/// the function's own doc comment becomes the procedure's description —
/// instead of a caller assembling a tuple type, an `ArgDescriptor` array,
/// and the closure by hand, all three kept in sync manually.
///
/// ```ignore
/// rpcmesh_derive::rpc_method! {
///     /// Adds two integers.
///     pub fn sum(
///         #[doc = "the first addend"]
///         left: i64,
///         right: i64,
///     ) -> i64 {
///         left + right
///     }
/// }
/// ```
///
/// expands to a function returning
/// `RpcLambda<impl Fn((i64, i64)) -> i64 + Send + Sync, (i64, i64), i64>`.
/// Only plain, by-value, simple-named parameters are supported, and at
/// most three of them — the same arity `ArgTuple` is implemented for.
#[proc_macro]
pub fn rpc_method(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemFn);

    let visibility = &item.vis;
    let fn_name = &item.sig.ident;
    let fn_doc = doc_lines(&item.attrs);

    let mut arg_idents = Vec::new();
    let mut arg_types = Vec::new();
    let mut arg_descriptors = Vec::new();

    for arg in &item.sig.inputs {
        let FnArg::Typed(pat_type) = arg else {
            return syn::Error::new_spanned(arg, "rpc_method! does not support a `self` parameter")
                .to_compile_error()
                .into();
        };
        let Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
            return syn::Error::new_spanned(&pat_type.pat, "rpc_method! parameters must be simple names")
                .to_compile_error()
                .into();
        };

        let arg_ident = pat_ident.ident.clone();
        let arg_name = arg_ident.to_string();
        let arg_doc = doc_lines(&pat_type.attrs).first().cloned().unwrap_or_default();

        arg_descriptors.push(quote! {
            rpcmesh_core::rpc::ArgDescriptor::new(#arg_name).with_doc(#arg_doc)
        });
        arg_types.push((*pat_type.ty).clone());
        arg_idents.push(arg_ident);
    }

    let return_ty: TokenStream2 = match &item.sig.output {
        ReturnType::Default => quote! { () },
        ReturnType::Type(_, ty) => quote! { #ty },
    };

    let body = &item.block;
    let args_table_name = format_ident!("__RPCMESH_{}_ARGS", fn_name.to_string().to_uppercase());

    let expanded = quote! {
        #visibility fn #fn_name() -> rpcmesh_core::rpc::RpcLambda<
            impl Fn((#(#arg_types,)*)) -> #return_ty + Send + Sync,
            (#(#arg_types,)*),
            #return_ty,
        > {
            static #args_table_name: &[rpcmesh_core::rpc::ArgDescriptor] = &[
                #(#arg_descriptors),*
            ];
            rpcmesh_core::rpc::RpcLambda::new(
                |(#(#arg_idents,)*): (#(#arg_types,)*)| #body,
                #args_table_name,
            )
            .with_doc(&[#(#fn_doc),*])
        }
    };

    expanded.into()
}

fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter_map(|attr| {
            if !attr.path().is_ident("doc") {
                return None;
            }
            let syn::Meta::NameValue(meta) = &attr.meta else {
                return None;
            };
            let syn::Expr::Lit(expr_lit) = &meta.value else {
                return None;
            };
            let syn::Lit::Str(lit) = &expr_lit.lit else {
                return None;
            };
            Some(lit.value().trim().to_string())
        })
        .collect()
}
