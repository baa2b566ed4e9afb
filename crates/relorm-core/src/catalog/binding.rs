//! Accessor tables binding Rust types to table schemas.
//!
//! A binding is built once per mapped type from typed closures and erased
//! behind `dyn Any`, so the cascade engine can read and write fields and
//! walk relationships of objects whose concrete type it only knows by
//! mapped type name.
//!
//! ```ignore
//! let binding = EntityBinding::builder("Liquor", Liquor::default)
//!     .field("id", |l: &Liquor| l.id, |l, v| l.id = v)
//!     .field("name", |l: &Liquor| l.name.clone(), |l, v| l.name = v)
//!     .one("brand", |l: &Liquor| l.brand.as_ref(), |l, b| l.brand = b)
//!     .build();
//! registry.bind(binding)?;
//! ```

use crate::error::{Error, Result};
use crate::value::{FromValue, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

type Factory = Box<dyn Fn() -> Box<dyn Any> + Send + Sync>;
type Getter = Box<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type Setter = Box<dyn Fn(&mut dyn Any, Value) -> Option<Result<()>> + Send + Sync>;
type RelatedGetter = Box<dyn for<'a> Fn(&'a dyn Any) -> Option<Vec<&'a dyn Any>> + Send + Sync>;
type RelatedSetter = Box<dyn Fn(&mut dyn Any, Vec<Box<dyn Any>>) -> Option<()> + Send + Sync>;

struct FieldAccessor {
    get: Getter,
    set: Setter,
}

struct RelationAccessor {
    target: TypeId,
    get: RelatedGetter,
    set: RelatedSetter,
}

fn related_getter<F>(f: F) -> RelatedGetter
where
    F: for<'a> Fn(&'a dyn Any) -> Option<Vec<&'a dyn Any>> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Type-erased accessor table for one mapped type.
pub struct EntityBinding {
    mapped_type: String,
    type_id: TypeId,
    type_name: &'static str,
    factory: Factory,
    fields: HashMap<String, FieldAccessor>,
    relations: HashMap<String, RelationAccessor>,
}

impl fmt::Debug for EntityBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<_> = self.fields.keys().collect();
        fields.sort();
        let mut relations: Vec<_> = self.relations.keys().collect();
        relations.sort();
        f.debug_struct("EntityBinding")
            .field("mapped_type", &self.mapped_type)
            .field("type_name", &self.type_name)
            .field("fields", &fields)
            .field("relations", &relations)
            .finish()
    }
}

impl EntityBinding {
    /// Start building a binding for `T`, constructed by `factory` when rows are inflated.
    pub fn builder<T, F>(mapped_type: impl Into<String>, factory: F) -> BindingBuilder<T>
    where
        T: Any,
        F: Fn() -> T + Send + Sync + 'static,
    {
        BindingBuilder {
            binding: EntityBinding {
                mapped_type: mapped_type.into(),
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                factory: Box::new(move || Box::new(factory()) as Box<dyn Any>),
                fields: HashMap::new(),
                relations: HashMap::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Mapped type name this binding serves.
    pub fn mapped_type(&self) -> &str {
        &self.mapped_type
    }

    /// Rust type id of the bound type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the bound type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether a field accessor exists.
    pub fn has_field(&self, variable: &str) -> bool {
        self.fields.contains_key(variable)
    }

    /// Whether a relationship accessor exists.
    pub fn has_relation(&self, refer: &str) -> bool {
        self.relations.contains_key(refer)
    }

    /// Rust type id of a relationship's target.
    pub fn relation_target(&self, refer: &str) -> Option<TypeId> {
        self.relations.get(refer).map(|r| r.target)
    }

    /// Construct a fresh instance.
    pub fn instantiate(&self) -> Box<dyn Any> {
        (self.factory)()
    }

    fn wrong_type(&self) -> Error {
        Error::UnmappedType(format!("{} (bound to {})", self.mapped_type, self.type_name))
    }

    fn missing(&self, name: &str) -> Error {
        Error::MissingAccessor {
            mapped_type: self.mapped_type.clone(),
            name: name.to_string(),
        }
    }

    /// Read a field.
    pub fn get(&self, object: &dyn Any, variable: &str) -> Result<Value> {
        let accessor = self.fields.get(variable).ok_or_else(|| self.missing(variable))?;
        (accessor.get)(object).ok_or_else(|| self.wrong_type())
    }

    /// Write a field, converting the stored value to the field type.
    pub fn set(&self, object: &mut dyn Any, variable: &str, value: Value) -> Result<()> {
        let accessor = self.fields.get(variable).ok_or_else(|| self.missing(variable))?;
        (accessor.set)(object, value).ok_or_else(|| self.wrong_type())?
    }

    /// Objects held by a relationship field; empty when unset.
    pub fn related<'a>(&self, object: &'a dyn Any, refer: &str) -> Result<Vec<&'a dyn Any>> {
        let accessor = self.relations.get(refer).ok_or_else(|| self.missing(refer))?;
        (accessor.get)(object).ok_or_else(|| self.wrong_type())
    }

    /// Replace the objects held by a relationship field.
    pub fn set_related(
        &self,
        object: &mut dyn Any,
        refer: &str,
        related: Vec<Box<dyn Any>>,
    ) -> Result<()> {
        let accessor = self.relations.get(refer).ok_or_else(|| self.missing(refer))?;
        (accessor.set)(object, related).ok_or_else(|| self.wrong_type())
    }
}

/// Typed builder for [`EntityBinding`].
pub struct BindingBuilder<T> {
    binding: EntityBinding,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any> BindingBuilder<T> {
    /// Bind a scalar field by variable name.
    pub fn field<V, G, S>(mut self, variable: impl Into<String>, get: G, set: S) -> Self
    where
        V: Into<Value> + FromValue + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let accessor = FieldAccessor {
            get: Box::new(move |object: &dyn Any| {
                object.downcast_ref::<T>().map(|t| get(t).into())
            }),
            set: Box::new(move |object: &mut dyn Any, value: Value| {
                let target = object.downcast_mut::<T>()?;
                Some(V::from_value(value).map(|v| set(target, v)))
            }),
        };
        self.binding.fields.insert(variable.into(), accessor);
        self
    }

    /// Bind a single-object relationship (one-to-one, many-to-one, many-to-many join).
    pub fn one<R, G, S>(mut self, refer: impl Into<String>, get: G, set: S) -> Self
    where
        R: Any,
        G: Fn(&T) -> Option<&R> + Send + Sync + 'static,
        S: Fn(&mut T, Option<R>) + Send + Sync + 'static,
    {
        let accessor = RelationAccessor {
            target: TypeId::of::<R>(),
            get: related_getter(move |object| {
                let owner = object.downcast_ref::<T>()?;
                Some(get(owner).map(|r| r as &dyn Any).into_iter().collect())
            }),
            set: Box::new(move |object: &mut dyn Any, related: Vec<Box<dyn Any>>| {
                let owner = object.downcast_mut::<T>()?;
                let value = match related.into_iter().next() {
                    Some(boxed) => Some(*boxed.downcast::<R>().ok()?),
                    None => None,
                };
                set(owner, value);
                Some(())
            }),
        };
        self.binding.relations.insert(refer.into(), accessor);
        self
    }

    /// Bind a collection relationship (one-to-many, many-to-many).
    pub fn many<R, G, S>(mut self, refer: impl Into<String>, get: G, set: S) -> Self
    where
        R: Any,
        G: Fn(&T) -> &[R] + Send + Sync + 'static,
        S: Fn(&mut T, Vec<R>) + Send + Sync + 'static,
    {
        let accessor = RelationAccessor {
            target: TypeId::of::<R>(),
            get: related_getter(move |object| {
                let owner = object.downcast_ref::<T>()?;
                Some(get(owner).iter().map(|r| r as &dyn Any).collect())
            }),
            set: Box::new(move |object: &mut dyn Any, related: Vec<Box<dyn Any>>| {
                let owner = object.downcast_mut::<T>()?;
                let mut values = Vec::with_capacity(related.len());
                for boxed in related {
                    values.push(*boxed.downcast::<R>().ok()?);
                }
                set(owner, values);
                Some(())
            }),
        };
        self.binding.relations.insert(refer.into(), accessor);
        self
    }

    /// Finish the binding.
    pub fn build(self) -> EntityBinding {
        self.binding
    }
}
