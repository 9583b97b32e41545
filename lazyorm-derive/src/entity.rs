use crate::attr::{self, EntityField, Kind, ParsedEntity, Role};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::DeriveInput;

// derive_entity
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };
    let parsed = match attr::parse(&input) {
        Ok(parsed) => parsed,
        Err(err) => return err.to_compile_error(),
    };

    let interceptable = interceptable_impl(&input, &parsed);
    let entity = entity_impl(&input, &parsed);
    let accessors = accessors(&input, &parsed);

    quote! {
        #interceptable
        #entity
        #accessors
    }
}

fn conversion_error(name: &str) -> TokenStream {
    quote! {
        |source| ::lazyorm::InterceptError::Conversion {
            field: ::std::string::String::from(#name),
            source,
        }
    }
}

fn unknown_attribute(entity_name: &str) -> TokenStream {
    quote! {
        ::std::result::Result::Err(::lazyorm::InterceptError::UnknownAttribute {
            entity_name: ::std::string::String::from(#entity_name),
            field: ::std::string::String::from(name),
        })
    }
}

/// Expression evaluating to `InterceptResult<LazyValue<Value>>` for the raw
/// state of a field.
fn raw_value_expr(field: &EntityField<'_>) -> TokenStream {
    let ident = field.ident;
    let on_error = conversion_error(&field.name);
    if field.lazy_inner().is_some() {
        quote! {
            self.#ident.with(|raw| {
                raw.as_ref()
                    .try_map(::lazyorm::__private::serde_json::to_value)
                    .map_err(#on_error)
            })
        }
    } else {
        quote! {
            ::lazyorm::__private::serde_json::to_value(&self.#ident)
                .map(::lazyorm::LazyValue::Loaded)
                .map_err(#on_error)
        }
    }
}

// ── Interceptable ────────────────────────────────────────────────

fn interceptable_impl(input: &DeriveInput, parsed: &ParsedEntity<'_>) -> TokenStream {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let entity_name = &parsed.options.name;

    let id = parsed.id();
    let id_ident = id.ident;
    let id_error = conversion_error(&id.name);

    let interceptor_body = match parsed.interceptor() {
        Some(slot) => {
            let slot = slot.ident;
            quote!(self.#slot.get())
        }
        None => quote!(::std::option::Option::None),
    };

    let raw_arms = parsed.persistent().map(|field| {
        let name = &field.name;
        let expr = raw_value_expr(field);
        quote!(#name => #expr,)
    });
    let id_name = &id.name;

    let inject_arms = parsed.lazy().map(|field| {
        let field_ident = field.ident;
        let name = &field.name;
        let on_error = conversion_error(name);
        quote! {
            #name => {
                let value = ::lazyorm::__private::serde_json::from_value(value).map_err(#on_error)?;
                self.#field_ident.set(value);
                ::std::result::Result::Ok(())
            }
        }
    });
    let unknown = unknown_attribute(entity_name);

    quote! {
        impl #impl_generics ::lazyorm::Interceptable for #ident #ty_generics #where_clause {
            fn entity_name(&self) -> &str {
                #entity_name
            }

            fn identifier(&self) -> ::lazyorm::InterceptResult<::lazyorm::__private::serde_json::Value> {
                ::lazyorm::__private::serde_json::to_value(&self.#id_ident).map_err(#id_error)
            }

            fn interceptor(&self) -> ::std::option::Option<&::lazyorm::LazyAttributeInterceptor> {
                #interceptor_body
            }

            fn raw_attribute(
                &self,
                name: &str,
            ) -> ::lazyorm::InterceptResult<::lazyorm::LazyValue<::lazyorm::__private::serde_json::Value>> {
                match name {
                    #id_name => ::lazyorm::Interceptable::identifier(self).map(::lazyorm::LazyValue::Loaded),
                    #(#raw_arms)*
                    _ => #unknown,
                }
            }

            #[allow(unused_variables)]
            fn inject_attribute(
                &self,
                name: &str,
                value: ::lazyorm::__private::serde_json::Value,
            ) -> ::lazyorm::InterceptResult<()> {
                match name {
                    #(#inject_arms)*
                    _ => #unknown,
                }
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    }
}

// ── Entity ───────────────────────────────────────────────────────

fn attribute_metadata(field: &EntityField<'_>) -> Option<TokenStream> {
    let name = &field.name;
    match &field.role {
        Role::Id | Role::Interceptor => None,
        Role::Transient => Some(quote!(::lazyorm::AttributeMetadata::transient(#name))),
        Role::Persistent { kind, inner } => {
            let shorthand = match (kind, inner.is_some()) {
                (Kind::Basic, false) => quote!(basic),
                (Kind::Basic, true) => quote!(lazy),
                (Kind::ToOne, _) => quote!(to_one),
                (Kind::ToMany, _) => quote!(to_many),
                (Kind::Embedded, _) => quote!(embedded),
            };
            let base = quote!(::lazyorm::AttributeMetadata::#shorthand(#name));
            Some(if inner.is_some() && *kind != Kind::Basic {
                quote! {
                    ::lazyorm::AttributeMetadata {
                        fetch: ::lazyorm::FetchMode::Lazy,
                        ..#base
                    }
                }
            } else {
                base
            })
        }
    }
}

fn hydrate_field(field: &EntityField<'_>) -> TokenStream {
    let ident = field.ident;
    let name = &field.name;
    let on_error = conversion_error(name);
    match &field.role {
        Role::Id => quote! {
            #ident: ::lazyorm::__private::serde_json::from_value(id).map_err(#on_error)?,
        },
        Role::Interceptor | Role::Transient => quote! {
            #ident: ::std::default::Default::default(),
        },
        Role::Persistent { inner: Some(_), .. } => quote! {
            #ident: match values.remove(#name) {
                ::std::option::Option::Some(value) => ::lazyorm::LazyField::loaded(
                    ::lazyorm::__private::serde_json::from_value(value).map_err(#on_error)?,
                ),
                ::std::option::Option::None => ::lazyorm::LazyField::unfetched(),
            },
        },
        // A missing eager value reads as null, which only optional types accept.
        Role::Persistent { inner: None, .. } => quote! {
            #ident: ::lazyorm::__private::serde_json::from_value(
                values.remove(#name).unwrap_or(::lazyorm::__private::serde_json::Value::Null),
            )
            .map_err(#on_error)?,
        },
    }
}

fn entity_impl(input: &DeriveInput, parsed: &ParsedEntity<'_>) -> TokenStream {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let entity_name = &parsed.options.name;
    let id_name = &parsed.id().name;

    let attributes = parsed.fields.iter().filter_map(attribute_metadata);
    let lazy_group = parsed
        .options
        .lazy_group
        .then(|| quote!(.with_lazy_group()));

    let hydrate_fields = parsed.fields.iter().map(hydrate_field);

    let dehydrate_entries = parsed.persistent().map(|field| {
        let name = &field.name;
        let expr = raw_value_expr(field);
        quote! {
            attributes.insert(::std::string::String::from(#name), #expr?);
        }
    });

    let install_body = match parsed.interceptor() {
        Some(slot) => {
            let slot = slot.ident;
            quote!(self.#slot.replace(interceptor))
        }
        None => quote! {
            ::std::mem::drop(interceptor);
            ::std::option::Option::None
        },
    };

    quote! {
        impl #impl_generics ::lazyorm::Entity for #ident #ty_generics #where_clause {
            fn metadata() -> ::lazyorm::EntityMetadata {
                ::lazyorm::EntityMetadata::new(#entity_name, #id_name)
                    #(.with_attribute(#attributes))*
                    #lazy_group
            }

            #[allow(unused_mut, unused_variables)]
            fn hydrate(
                id: ::lazyorm::__private::serde_json::Value,
                mut values: ::std::collections::BTreeMap<::std::string::String, ::lazyorm::__private::serde_json::Value>,
            ) -> ::lazyorm::InterceptResult<Self> {
                ::std::result::Result::Ok(Self {
                    #(#hydrate_fields)*
                })
            }

            #[allow(unused_mut)]
            fn dehydrate(
                &self,
            ) -> ::lazyorm::InterceptResult<
                ::std::collections::BTreeMap<
                    ::std::string::String,
                    ::lazyorm::LazyValue<::lazyorm::__private::serde_json::Value>,
                >,
            > {
                let mut attributes = ::std::collections::BTreeMap::new();
                #(#dehydrate_entries)*
                ::std::result::Result::Ok(attributes)
            }

            fn install_interceptor(
                &mut self,
                interceptor: ::std::option::Option<::lazyorm::LazyAttributeInterceptor>,
            ) -> ::std::option::Option<::lazyorm::LazyAttributeInterceptor> {
                #install_body
            }
        }
    }
}

// ── Accessors ────────────────────────────────────────────────────

fn accessors(input: &DeriveInput, parsed: &ParsedEntity<'_>) -> TokenStream {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let entity_name = &parsed.options.name;

    let mark_dirty = parsed.interceptor().map(|slot| {
        let slot = slot.ident;
        quote!(self.#slot.mark_dirty();)
    });

    let getters = parsed.lazy().filter_map(|field| {
        let field_ident = field.ident;
        let name = &field.name;
        let inner = field.lazy_inner()?;
        let doc = format!(" Reads `{name}`, fetching the lazy group on first access.");
        Some(quote! {
            #[doc = #doc]
            pub fn #field_ident(&self) -> ::lazyorm::InterceptResult<#inner> {
                let current = self.#field_ident.get();
                let value = match ::lazyorm::Interceptable::interceptor(self) {
                    ::std::option::Option::Some(interceptor) => interceptor.intercept_as(self, #name, current)?,
                    ::std::option::Option::None => current,
                };
                self.#field_ident.replace(::std::clone::Clone::clone(&value));
                value.into_loaded().ok_or_else(|| {
                    let reason = match ::lazyorm::Interceptable::interceptor(self) {
                        ::std::option::Option::Some(interceptor) if interceptor.is_initializing() => {
                            ::lazyorm::LazyInitFailure::InitializationInProgress
                        }
                        _ => ::lazyorm::LazyInitFailure::NoSession,
                    };
                    ::lazyorm::InterceptError::LazyInitialization {
                        entity_name: ::std::string::String::from(#entity_name),
                        field: ::std::string::String::from(#name),
                        reason,
                    }
                })
            }
        })
    });

    let setters = parsed.persistent().map(|field| {
        let field_ident = field.ident;
        let setter = format_ident!("set_{}", field_ident);
        let doc = format!(" Sets `{}` and marks the entity dirty.", field.name);
        let (ty, store) = match field.lazy_inner() {
            Some(inner) => (quote!(#inner), quote!(self.#field_ident.set(value);)),
            None => {
                let ty = field.ty;
                (quote!(#ty), quote!(self.#field_ident = value;))
            }
        };
        quote! {
            #[doc = #doc]
            pub fn #setter(&mut self, value: #ty) {
                #store
                #mark_dirty
            }
        }
    });

    quote! {
        impl #impl_generics #ident #ty_generics #where_clause {
            #(#getters)*
            #(#setters)*
        }
    }
}
