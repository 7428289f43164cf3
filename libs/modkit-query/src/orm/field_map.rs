use std::collections::HashMap;

use sea_orm::EntityTrait;

use crate::schema::{EntitySchema, FieldDescriptor, FieldKind};

#[derive(Clone)]
pub struct Field<E: EntityTrait> {
    pub col: E::Column,
    pub descriptor: FieldDescriptor,
}

/// API name → column map for a `SeaORM` entity.
///
/// Names are matched case-insensitively, so the map doubles as the
/// [`EntitySchema`] the compilers resolve wire paths against.
#[derive(Clone)]
#[must_use]
pub struct FieldMap<E: EntityTrait> {
    entity: String,
    map: HashMap<String, Field<E>>,
}

impl<E: EntityTrait> Default for FieldMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> FieldMap<E> {
    pub fn new() -> Self {
        Self {
            entity: sea_orm::EntityName::table_name(&E::default()).to_owned(),
            map: HashMap::new(),
        }
    }

    pub fn insert(self, api_name: &'static str, col: E::Column, kind: FieldKind) -> Self {
        self.insert_field(col, FieldDescriptor::new(api_name, kind))
    }

    pub fn insert_nullable(self, api_name: &'static str, col: E::Column, kind: FieldKind) -> Self {
        self.insert_field(col, FieldDescriptor::nullable(api_name, kind))
    }

    pub fn insert_field(mut self, col: E::Column, descriptor: FieldDescriptor) -> Self {
        self.map
            .insert(descriptor.name.to_lowercase(), Field { col, descriptor });
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Field<E>> {
        self.map.get(&name.trim().to_lowercase())
    }
}

impl<E: EntityTrait> EntitySchema for FieldMap<E> {
    fn resolve(&self, path: &str) -> Option<FieldDescriptor> {
        self.get(path).map(|f| f.descriptor)
    }

    fn schema_name(&self) -> &str {
        &self.entity
    }
}
