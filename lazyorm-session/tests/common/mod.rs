//! A hand-mapped entity for session tests.

#![allow(dead_code)]

use lazyorm_intercept::{
    Entity, InterceptError, InterceptResult, Interceptable, InterceptorSlot, LazyAttributeInterceptor,
};
use lazyorm_model::{AttributeMetadata, EntityMetadata, LazyField, LazyValue};
use serde_json::{Value, json};
use std::any::Any;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub body: LazyField<String>,
    pub notes: LazyField<Option<String>>,
    pub interceptor: InterceptorSlot,
}

impl Article {
    pub fn new(id: i64, title: &str, body: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            body: LazyField::loaded(body.to_string()),
            notes: LazyField::loaded(None),
            interceptor: InterceptorSlot::empty(),
        }
    }

    pub fn body(&self) -> InterceptResult<String> {
        let current = self.body.get();
        let value = match self.interceptor.get() {
            Some(interceptor) => interceptor.intercept_as(self, "body", current)?,
            None => current,
        };
        self.body.replace(value.clone());
        value.into_loaded().ok_or_else(|| InterceptError::UnfetchedResult {
            entity_name: "Article".into(),
            field: "body".into(),
        })
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.interceptor.mark_dirty();
    }

    pub fn set_body(&mut self, body: &str) {
        self.body.set(body.to_string());
        self.interceptor.mark_dirty();
    }

    pub fn lazy_interceptor(&self) -> Option<&LazyAttributeInterceptor> {
        self.interceptor.get()
    }
}

fn unknown(field: &str) -> InterceptError {
    InterceptError::UnknownAttribute {
        entity_name: "Article".into(),
        field: field.into(),
    }
}

fn convert<T: serde::de::DeserializeOwned>(field: &str, value: Value) -> InterceptResult<T> {
    serde_json::from_value(value).map_err(|source| InterceptError::Conversion {
        field: field.into(),
        source,
    })
}

impl Interceptable for Article {
    fn entity_name(&self) -> &str {
        "Article"
    }

    fn identifier(&self) -> InterceptResult<Value> {
        Ok(json!(self.id))
    }

    fn interceptor(&self) -> Option<&LazyAttributeInterceptor> {
        self.interceptor.get()
    }

    fn raw_attribute(&self, name: &str) -> InterceptResult<LazyValue<Value>> {
        match name {
            "title" => Ok(LazyValue::Loaded(json!(self.title))),
            "body" => Ok(self.body.get().map(|v| json!(v))),
            "notes" => Ok(self.notes.get().map(|v| json!(v))),
            _ => Err(unknown(name)),
        }
    }

    fn inject_attribute(&self, name: &str, value: Value) -> InterceptResult<()> {
        match name {
            "body" => self.body.set(convert(name, value)?),
            "notes" => self.notes.set(convert(name, value)?),
            _ => return Err(unknown(name)),
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Entity for Article {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Article", "id")
            .with_attribute(AttributeMetadata::basic("title"))
            .with_attribute(AttributeMetadata::lazy("body"))
            .with_attribute(AttributeMetadata::lazy("notes"))
    }

    fn hydrate(id: Value, mut values: BTreeMap<String, Value>) -> InterceptResult<Self> {
        let mut lazy = |name: &str| -> InterceptResult<LazyValue<Value>> {
            Ok(values.remove(name).map_or(LazyValue::Unfetched, LazyValue::Loaded))
        };
        let body = lazy("body")?.try_map(|v| convert("body", v))?;
        let notes = lazy("notes")?.try_map(|v| convert("notes", v))?;
        let title = values
            .remove("title")
            .map(|v| convert("title", v))
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            id: convert("id", id)?,
            title,
            body: body.into(),
            notes: notes.into(),
            interceptor: InterceptorSlot::empty(),
        })
    }

    fn dehydrate(&self) -> InterceptResult<BTreeMap<String, LazyValue<Value>>> {
        ["title", "body", "notes"]
            .into_iter()
            .map(|name| -> InterceptResult<(String, LazyValue<Value>)> {
                Ok((name.to_string(), self.raw_attribute(name)?))
            })
            .collect()
    }

    fn install_interceptor(
        &mut self,
        interceptor: Option<LazyAttributeInterceptor>,
    ) -> Option<LazyAttributeInterceptor> {
        self.interceptor.replace(interceptor)
    }
}
