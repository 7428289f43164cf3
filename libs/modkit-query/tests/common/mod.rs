#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use modkit_query::{Entity, EntityDescriptor, FieldDescriptor, FieldKind, Value};

pub const STATUSES: &[&str] = &["Draft", "Active", "Archived"];

#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: Option<String>,
    pub count: i64,
    pub joined: DateTime<Utc>,
    pub status: &'static str,
    pub tags: Vec<String>,
}

pub static PERSON: EntityDescriptor = EntityDescriptor::new(
    "Person",
    &[
        FieldDescriptor::new("Id", FieldKind::I64),
        FieldDescriptor::nullable("Name", FieldKind::String),
        FieldDescriptor::new("Count", FieldKind::I64),
        FieldDescriptor::new("Joined", FieldKind::DateTimeUtc),
        FieldDescriptor::new("Status", FieldKind::Enum(STATUSES)),
        FieldDescriptor::new("Tags", FieldKind::List),
    ],
);

impl Entity for Person {
    fn descriptor() -> &'static EntityDescriptor {
        &PERSON
    }

    fn value_of(&self, field: &str) -> Value {
        match field {
            "Id" => self.id.into(),
            "Name" => self.name.clone().into(),
            "Count" => self.count.into(),
            "Joined" => self.joined.into(),
            "Status" => self.status.into(),
            "Tags" => self.tags.clone().into(),
            _ => Value::Null,
        }
    }
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// Names [John, Elise, Jack, Mary, null] paired with counts [1, 10, 90, 101, 999].
pub fn people() -> Vec<Person> {
    let rows = [
        (1, Some("John"), 1, at(2024, 3, 1, 0), "Active"),
        (2, Some("Elise"), 10, at(2024, 3, 1, 23), "Draft"),
        (3, Some("Jack"), 90, at(2024, 3, 2, 0), "Archived"),
        (4, Some("Mary"), 101, at(2024, 3, 2, 12), "Active"),
        (5, None, 999, at(2024, 2, 29, 18), "Draft"),
    ];
    rows.into_iter()
        .map(|(id, name, count, joined, status)| Person {
            id,
            name: name.map(str::to_owned),
            count,
            joined,
            status,
            tags: vec![format!("t{id}")],
        })
        .collect()
}

pub fn ids<'a>(rows: impl IntoIterator<Item = &'a Person>) -> Vec<i64> {
    rows.into_iter().map(|p| p.id).collect()
}
