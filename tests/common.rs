//! Shared fixtures: a scriptable fake connection and a small schema.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use lariat::{
    BelongsTo, Connection, ConnectionProvider, Db, Dialect, Field, HasMany, HasOne, ManyToMany,
    Result, Row, Validator, Value, assoc, entity,
};

/// A connection that records every statement and replays scripted rows.
pub struct FakeConnection {
    pub dialect: Dialect,
    pub executed: RefCell<Vec<String>>,
    pub queried: RefCell<Vec<String>>,
    results: RefCell<VecDeque<Vec<Row>>>,
    last_insert_id: Cell<i64>,
    pub last_insert_id_calls: Cell<usize>,
}

impl FakeConnection {
    pub fn new() -> Rc<Self> {
        Self::with_dialect(Dialect::MySql)
    }

    pub fn with_dialect(dialect: Dialect) -> Rc<Self> {
        Rc::new(Self {
            dialect,
            executed: RefCell::new(Vec::new()),
            queried: RefCell::new(Vec::new()),
            results: RefCell::new(VecDeque::new()),
            last_insert_id: Cell::new(0),
            last_insert_id_calls: Cell::new(0),
        })
    }

    /// Queues the rows returned by the next query.
    pub fn push_result(&self, rows: Vec<Row>) {
        self.results.borrow_mut().push_back(rows);
    }

    pub fn set_last_insert_id(&self, id: i64) {
        self.last_insert_id.set(id);
    }

    pub fn statements(&self) -> Vec<String> {
        let mut all = self.queried.borrow().clone();
        all.extend(self.executed.borrow().iter().cloned());
        all
    }
}

impl Connection for FakeConnection {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn execute(&self, sql: &str) -> Result<u64> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(1)
    }

    fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.queried.borrow_mut().push(sql.to_string());
        Ok(self.results.borrow_mut().pop_front().unwrap_or_default())
    }

    fn last_insert_id(&self) -> Result<i64> {
        self.last_insert_id_calls.set(self.last_insert_id_calls.get() + 1);
        Ok(self.last_insert_id.get())
    }
}

/// A provider that counts how often it is consulted.
pub struct CountingProvider {
    pub conn: Rc<FakeConnection>,
    pub calls: Cell<usize>,
}

impl CountingProvider {
    pub fn new(conn: Rc<FakeConnection>) -> Rc<Self> {
        Rc::new(Self { conn, calls: Cell::new(0) })
    }
}

impl ConnectionProvider for CountingProvider {
    fn connect(&self) -> Result<Rc<dyn Connection>> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.conn.clone())
    }
}

/// A registry wired to the given fake connection as its default.
pub fn db_with(conn: &Rc<FakeConnection>) -> Db {
    let db = Db::new();
    db.set_connection(conn.clone());
    db
}

pub fn row(columns: &[(&str, Value)]) -> Row {
    columns.iter().map(|(name, value)| ((*name).to_string(), value.clone())).collect()
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct User {
        pub id: Field<i64>,
        pub name: Field<String>,
        pub role: Field<Option<String>>,
        pub enabled: Field<bool>,
        pub tags: ManyToMany<Tag>,
    }
    config {
        track_changes;
        validators = [Validator::required("name")];
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct Tag {
        pub id: Field<i64>,
        pub label: Field<String>,
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct Customer {
        pub id: Field<i64>,
        pub name: Field<String>,
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct Order {
        pub id: Field<i64>,
        pub reference: Field<String>,
        pub customer_id: Field<i64>,
        pub customer: BelongsTo<Customer>,
        pub items: HasMany<Item>,
    }
    config {
        track_changes;
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct Item {
        pub id: Field<i64>,
        pub order_id: Field<i64>,
        pub label: Field<String>,
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct Person {
        pub id: Field<i64>,
        pub passport: HasOne<Passport>,
        pub settings: HasOne<Settings>,
    }
    config {
        track_changes;
        associations = [assoc("settings").default_instance()];
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct Passport {
        pub id: Field<i64>,
        pub person_id: Field<i64>,
        pub number: Field<String>,
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub id: Field<i64>,
        pub person_id: Field<i64>,
        pub theme: Field<String>,
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct VehicleOwner {
        pub id: Field<i64>,
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct Widget {
        pub widget_id: Field<i64>,
        pub label: Field<String>,
    }
    config {
        primary_key = [widget_id];
        auto_increment = widget_id;
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct Coupon {
        pub id: Field<i64>,
        pub code: Field<String>,
    }
    config {
        auto_increment = none;
    }
}

/// An integer-backed enum column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Active,
    Disabled,
}

impl lariat::ColumnValue for Status {
    fn to_value(&self) -> Value {
        Value::IntEnum(match self {
            Self::Active => 1,
            Self::Disabled => 2,
        })
    }

    fn from_value(value: Value) -> Result<Self> {
        match value.as_int()? {
            1 => Ok(Self::Active),
            2 => Ok(Self::Disabled),
            other => Err(lariat::Error::invalid_value(format!("unknown status {other}"))),
        }
    }
}

entity! {
    #[derive(Debug, Clone, Default)]
    pub struct Note {
        pub id: Field<i64>,
        pub status: Field<Status>,
        pub published_on: Field<chrono::NaiveDate>,
        pub labels: Field<Vec<String>>,
    }
}
