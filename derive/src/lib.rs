//! `#[derive(Record)]`：为结构体生成 tagorm 的记录能力
//!
//! 标签原文通过 `#[orm("...")]` 属性携带，宏只做最小的结构性解析
//! （`-` 排除、`embed`/`nested`、结构体级的 `after_fetch`），完整的
//! 语义解析留给运行期的模型编译器。

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DataStruct, DeriveInput, Fields, LitStr};

/// 为带 `#[orm("...")]` 标签的具名字段结构体实现
/// `tagorm::Record` 与 `tagorm::RecordType`
///
/// ```ignore
/// #[derive(Record, Default)]
/// #[orm("name(administrators);mysql_engine(innodb)")]
/// struct Admin {
///     #[orm("name(id);ai")]
///     id: i64,
///     #[orm("unique(u_name);len(50)")]
///     username: String,
///     #[orm("-")]
///     cached: i64, // 不参与持久化
/// }
/// ```
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let name_lit = LitStr::new(&name.to_string(), name.span());

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record derive does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record derive only supports structs with named fields",
            ));
        }
    };

    // 结构体级标签：多条 #[orm("...")] 用分号拼接
    let container_tag = orm_tag(&input.attrs)?.unwrap_or_default();
    let container_lit = LitStr::new(&container_tag, name.span());
    let wants_hook = prop_names(&container_tag).iter().any(|p| p == "after_fetch");

    let mut metas = Vec::new();
    let mut get_arms = Vec::new();
    let mut set_arms = Vec::new();
    let mut delegate_idents = Vec::new();
    let mut delegate_prefixes = Vec::new();

    for field in fields {
        let ident = field.ident.as_ref().unwrap();
        let fname = ident.to_string();
        let fname_lit = LitStr::new(&fname, ident.span());
        let ty = &field.ty;

        let tag = orm_tag(&field.attrs)?.unwrap_or_default();

        // `-` 打头：彻底排除
        if tag.trim_start().starts_with('-') {
            continue;
        }

        let tag_lit = LitStr::new(&tag, ident.span());
        let props = prop_names(&tag);
        let embedded = props.iter().any(|p| p == "embed");
        let nested = props.iter().any(|p| p == "nested");

        if embedded && nested {
            return Err(syn::Error::new_spanned(
                field,
                "a field cannot be both `embed` and `nested`",
            ));
        }

        if embedded || nested {
            let kind = if embedded {
                quote!(tagorm::FieldKind::Flatten(<#ty as tagorm::RecordType>::record_meta))
            } else {
                quote!(tagorm::FieldKind::Nested(<#ty as tagorm::RecordType>::record_meta))
            };
            metas.push(quote! {
                tagorm::FieldMeta {
                    name: #fname_lit,
                    tag: #tag_lit,
                    native: ::std::option::Option::None,
                    kind: #kind,
                }
            });

            delegate_idents.push(ident.clone());
            delegate_prefixes.push(LitStr::new(&format!("{fname}."), ident.span()));
            continue;
        }

        metas.push(quote! {
            tagorm::FieldMeta {
                name: #fname_lit,
                tag: #tag_lit,
                native: ::std::option::Option::Some(<#ty as tagorm::ColumnType>::NATIVE),
                kind: tagorm::FieldKind::Column,
            }
        });

        get_arms.push(quote! {
            #fname_lit => ::std::option::Option::Some(tagorm::ColumnType::to_value(&self.#ident)),
        });

        set_arms.push(quote! {
            #fname_lit => {
                self.#ident = tagorm::ColumnType::from_value(value)
                    .map_err(|err| err.for_field(#fname_lit))?;
                ::std::result::Result::Ok(true)
            }
        });
    }

    let hook = if wants_hook {
        quote! {
            fn after_fetch(&mut self) -> tagorm::Result<()> {
                tagorm::AfterFetch::after_fetch(self)
            }
        }
    } else {
        quote!()
    };

    Ok(quote! {
        const _: () = {
            static __FIELDS: &[tagorm::FieldMeta] = &[ #(#metas),* ];

            static __META: tagorm::RecordMeta = tagorm::RecordMeta {
                name: #name_lit,
                tag: #container_lit,
                fields: __FIELDS,
            };

            impl tagorm::RecordType for #name {
                fn record_meta() -> &'static tagorm::RecordMeta {
                    &__META
                }
            }

            impl tagorm::Record for #name {
                fn meta(&self) -> &'static tagorm::RecordMeta {
                    &__META
                }

                fn get(&self, field: &str) -> ::std::option::Option<tagorm::Value> {
                    match field {
                        #(#get_arms)*
                        _ => {
                            #(
                                if let ::std::option::Option::Some(rest) =
                                    field.strip_prefix(#delegate_prefixes)
                                {
                                    return tagorm::Record::get(&self.#delegate_idents, rest);
                                }
                            )*
                            ::std::option::Option::None
                        }
                    }
                }

                fn set(&mut self, field: &str, value: tagorm::Value) -> tagorm::Result<bool> {
                    match field {
                        #(#set_arms)*
                        _ => {
                            #(
                                if let ::std::option::Option::Some(rest) =
                                    field.strip_prefix(#delegate_prefixes)
                                {
                                    return tagorm::Record::set(&mut self.#delegate_idents, rest, value);
                                }
                            )*
                            ::std::result::Result::Ok(false)
                        }
                    }
                }

                #hook
            }
        };
    })
}

/// 收集 `#[orm("...")]` 属性，多条之间用分号拼接
fn orm_tag(attrs: &[syn::Attribute]) -> syn::Result<Option<String>> {
    let mut out: Option<String> = None;
    for attr in attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let lit: LitStr = attr.parse_args()?;
        match &mut out {
            Some(existing) => {
                existing.push(';');
                existing.push_str(&lit.value());
            }
            None => out = Some(lit.value()),
        }
    }
    Ok(out)
}

/// 属性名的轻量解析：括号深度为 0 的分号切分，取括号前的名字。
/// 语义校验（参数个数、合法性）都在运行期的模型编译器里。
fn prop_names(tag: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    let mut push = |seg: &str| {
        let name = seg.trim().split('(').next().unwrap_or("").trim().to_string();
        if !name.is_empty() {
            names.push(name);
        }
    };

    for (i, ch) in tag.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                push(&tag[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&tag[start..]);
    names
}
