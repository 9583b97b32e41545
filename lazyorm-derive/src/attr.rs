//! Parsing and validation of `#[entity(...)]` attributes.

use syn::{
    Attribute, Data, DeriveInput, Error, Field, Fields, GenericArgument, Ident, LitStr,
    PathArguments, Type,
};

/// Container-level options.
pub struct EntityOptions {
    pub name: String,
    pub lazy_group: bool,
}

/// Association shape of a persistent field.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Basic,
    ToOne,
    ToMany,
    Embedded,
}

pub enum Role {
    Id,
    Interceptor,
    Transient,
    /// `inner` is the `T` of `LazyField<T>` for lazy fields.
    Persistent { kind: Kind, inner: Option<Type> },
}

pub struct EntityField<'a> {
    pub ident: &'a Ident,
    pub name: String,
    pub ty: &'a Type,
    pub role: Role,
}

impl EntityField<'_> {
    pub const fn is_persistent(&self) -> bool {
        matches!(self.role, Role::Persistent { .. })
    }

    pub fn lazy_inner(&self) -> Option<&Type> {
        match &self.role {
            Role::Persistent { inner, .. } => inner.as_ref(),
            _ => None,
        }
    }
}

/// A parsed and validated entity struct.
pub struct ParsedEntity<'a> {
    pub options: EntityOptions,
    pub fields: Vec<EntityField<'a>>,
}

impl<'a> ParsedEntity<'a> {
    pub fn id(&self) -> &EntityField<'a> {
        // Validation guarantees exactly one.
        let index = self
            .fields
            .iter()
            .position(|f| matches!(f.role, Role::Id))
            .unwrap_or_default();
        &self.fields[index]
    }

    pub fn interceptor(&self) -> Option<&EntityField<'a>> {
        self.fields.iter().find(|f| matches!(f.role, Role::Interceptor))
    }

    pub fn persistent(&self) -> impl Iterator<Item = &EntityField<'a>> {
        self.fields.iter().filter(|f| f.is_persistent())
    }

    pub fn lazy(&self) -> impl Iterator<Item = &EntityField<'a>> {
        self.fields.iter().filter(|f| f.lazy_inner().is_some())
    }
}

#[derive(Default)]
struct FieldFlags {
    id: bool,
    lazy: bool,
    transient: bool,
    interceptor: bool,
    to_one: bool,
    to_many: bool,
    embedded: bool,
}

pub fn parse(input: &DeriveInput) -> syn::Result<ParsedEntity<'_>> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "Entity can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(
            &data.fields,
            "Entity can only be derived for structs with named fields",
        ));
    };

    let options = parse_options(&input.ident, &input.attrs)?;
    let fields = named
        .named
        .iter()
        .map(parse_field)
        .collect::<syn::Result<Vec<_>>>()?;

    let ids = fields.iter().filter(|f| matches!(f.role, Role::Id)).count();
    if ids != 1 {
        return Err(Error::new_spanned(
            &input.ident,
            format!("Entity needs exactly one #[entity(id)] field, found {ids}"),
        ));
    }

    let mut slots = fields.iter().filter(|f| matches!(f.role, Role::Interceptor));
    if let (Some(_), Some(second)) = (slots.next(), slots.next()) {
        return Err(Error::new_spanned(
            second.ident,
            "at most one #[entity(interceptor)] field is allowed",
        ));
    }

    let has_slot = fields.iter().any(|f| matches!(f.role, Role::Interceptor));
    if let Some(lazy) = fields.iter().find(|f| f.lazy_inner().is_some())
        && !has_slot
    {
        return Err(Error::new_spanned(
            lazy.ident,
            "lazy properties need an #[entity(interceptor)] field of type InterceptorSlot",
        ));
    }

    Ok(ParsedEntity { options, fields })
}

fn parse_options(ident: &Ident, attrs: &[Attribute]) -> syn::Result<EntityOptions> {
    let mut options = EntityOptions {
        name: ident.to_string(),
        lazy_group: false,
    };
    for attr in attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|nested| {
            if nested.path.is_ident("name") {
                let lit: LitStr = nested.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(Error::new(lit.span(), "entity name must not be empty"));
                }
                options.name = lit.value();
            } else if nested.path.is_ident("lazy_group") {
                options.lazy_group = true;
            } else {
                return Err(nested.error("unknown entity option, expected `name` or `lazy_group`"));
            }
            Ok(())
        })?;
    }
    Ok(options)
}

fn parse_field(field: &Field) -> syn::Result<EntityField<'_>> {
    let Some(ident) = field.ident.as_ref() else {
        return Err(Error::new_spanned(field, "expected a named field"));
    };

    let mut flags = FieldFlags::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|nested| {
            let flag = match nested.path.get_ident().map(ToString::to_string).as_deref() {
                Some("id") => &mut flags.id,
                Some("lazy") => &mut flags.lazy,
                Some("transient") => &mut flags.transient,
                Some("interceptor") => &mut flags.interceptor,
                Some("to_one") => &mut flags.to_one,
                Some("to_many") => &mut flags.to_many,
                Some("embedded") => &mut flags.embedded,
                _ => return Err(nested.error("unknown entity field option")),
            };
            *flag = true;
            Ok(())
        })?;
    }

    let role = field_role(field, &flags)?;
    Ok(EntityField {
        ident,
        name: ident.to_string(),
        ty: &field.ty,
        role,
    })
}

fn field_role(field: &Field, flags: &FieldFlags) -> syn::Result<Role> {
    let shapes = [flags.to_one, flags.to_many, flags.embedded]
        .into_iter()
        .filter(|set| *set)
        .count();
    if shapes > 1 {
        return Err(Error::new_spanned(
            field,
            "`to_one`, `to_many` and `embedded` are mutually exclusive",
        ));
    }
    if flags.lazy && flags.to_many {
        return Err(Error::new_spanned(
            field,
            "to-many associations cannot be lazy properties",
        ));
    }
    if flags.lazy && flags.transient {
        return Err(Error::new_spanned(field, "transient fields cannot be lazy"));
    }

    let special = [flags.id, flags.interceptor, flags.transient]
        .into_iter()
        .filter(|set| *set)
        .count();
    if special > 1 || (special == 1 && (flags.lazy || shapes > 0)) {
        return Err(Error::new_spanned(
            field,
            "`id`, `interceptor` and `transient` cannot be combined with other options",
        ));
    }

    if flags.id {
        return Ok(Role::Id);
    }
    if flags.interceptor {
        return Ok(Role::Interceptor);
    }
    if flags.transient {
        return Ok(Role::Transient);
    }

    let kind = if flags.to_one {
        Kind::ToOne
    } else if flags.to_many {
        Kind::ToMany
    } else if flags.embedded {
        Kind::Embedded
    } else {
        Kind::Basic
    };

    let inner = if flags.lazy {
        let Some(inner) = lazy_field_inner(&field.ty) else {
            return Err(Error::new_spanned(
                &field.ty,
                "lazy properties must be declared as LazyField<T>",
            ));
        };
        Some(inner.clone())
    } else {
        None
    };

    Ok(Role::Persistent { kind, inner })
}

/// The `T` of `LazyField<T>`.
fn lazy_field_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "LazyField" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
