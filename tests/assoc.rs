//! Association loading and cascade behavior.

mod common;

use common::{FakeConnection, Order, Passport, Person, Tag, User, db_with, row};
use lariat::{Error, Record, Value};

fn persisted_tag(id: i64, label: &str) -> Tag {
    let mut tag = Tag::default();
    tag.id.set(id);
    tag.label.set(label);
    tag.state.is_new = false;
    tag
}

#[test]
fn belongs_to_loads_through_the_foreign_key_and_caches() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(3)), ("name", Value::Str("ACME".into()))])]);

    let mut order = Order::default();
    order.customer_id.set(3i64);
    let customer = order.customer(&db).unwrap();
    assert_eq!(customer.name.get().map(String::as_str), Some("ACME"));
    assert_eq!(conn.queried.borrow()[0], "SELECT * FROM `customer` WHERE `id` = 3 LIMIT 1");

    order.customer(&db).unwrap();
    assert_eq!(conn.queried.borrow().len(), 1);
}

#[test]
fn belongs_to_without_a_reference_is_not_found() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);

    let mut order = Order::default();
    assert!(matches!(order.customer(&db), Err(Error::NotFound(_))));
    assert!(conn.queried.borrow().is_empty());
}

#[test]
fn has_many_loads_the_ordered_collection() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(7)), ("reference", Value::Str("A-7".into()))])]);
    conn.push_result(vec![
        row(&[("id", Value::Int(1)), ("order_id", Value::Int(7))]),
        row(&[("id", Value::Int(2)), ("order_id", Value::Int(7))]),
    ]);

    let mut order = Order::find(&db, 7).unwrap();
    let items = order.items(&db).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(
        conn.queried.borrow()[1],
        "SELECT * FROM `item` WHERE `order_id` = 7 ORDER BY id"
    );
}

#[test]
fn has_many_on_a_transient_owner_is_empty_without_a_query() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);

    let mut order = Order::default();
    assert!(order.items(&db).unwrap().is_empty());
    assert!(conn.queried.borrow().is_empty());
}

#[test]
fn has_one_loads_at_most_one_row() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(7))])]);
    conn.push_result(vec![row(&[
        ("id", Value::Int(1)),
        ("person_id", Value::Int(7)),
        ("number", Value::Str("X1".into())),
    ])]);

    let mut person = Person::find(&db, 7).unwrap();
    let passport = person.passport(&db).unwrap().unwrap();
    assert_eq!(passport.number.get().map(String::as_str), Some("X1"));
    assert_eq!(
        conn.queried.borrow()[1],
        "SELECT * FROM `passport` WHERE `person_id` = 7 LIMIT 1"
    );
}

#[test]
fn has_one_miss_yields_none_or_a_default_instance() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(7))])]);
    conn.push_result(vec![]);
    conn.push_result(vec![]);

    let mut person = Person::find(&db, 7).unwrap();
    assert!(person.passport(&db).unwrap().is_none());
    let settings = person.settings(&db).unwrap();
    assert!(settings.is_some());
    assert!(settings.unwrap().theme.get().is_none());
}

#[test]
fn has_one_cascade_saves_the_child_with_the_owner_key() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(7))])]);

    let mut person = Person::find(&db, 7).unwrap();
    let mut passport = Passport::default();
    passport.number.set("X1");
    person.passport.set(Some(passport));
    person.save(&db).unwrap();

    assert_eq!(
        conn.executed.borrow()[0],
        "INSERT INTO `passport` (`person_id`,`number`) VALUES (7,'X1')"
    );
}

#[test]
fn has_one_cascade_deletes_a_cleared_child() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(7))])]);

    let mut person = Person::find(&db, 7).unwrap();
    person.passport.set(None);
    person.save(&db).unwrap();

    assert_eq!(conn.executed.borrow()[0], "DELETE FROM `passport` WHERE `person_id` = 7");
}

#[test]
fn untouched_association_cells_cascade_nothing() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(7))])]);

    let mut person = Person::find(&db, 7).unwrap();
    person.save(&db).unwrap();
    assert!(conn.executed.borrow().is_empty());
}

#[test]
fn many_to_many_loads_through_the_link_table() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(7)), ("name", Value::Str("John".into()))])]);
    conn.push_result(vec![
        row(&[("id", Value::Int(1)), ("label", Value::Str("alpha".into()))]),
        row(&[("id", Value::Int(2)), ("label", Value::Str("beta".into()))]),
    ]);

    let mut user = User::find(&db, 7).unwrap();
    let tags = user.tags(&db).unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(
        conn.queried.borrow()[1],
        "SELECT `tag`.* FROM `tag` INNER JOIN `tag_user` ON `tag_user`.`tag_id` = `tag`.`id` \
         WHERE `tag_user`.`user_id` = 7 ORDER BY id"
    );
}

#[test]
fn many_to_many_cascade_reconciles_the_link_table() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(7)), ("name", Value::Str("John".into()))])]);
    // Links currently on file: 1, 2 and 3.
    conn.push_result(vec![
        row(&[("tag_id", Value::Int(1))]),
        row(&[("tag_id", Value::Int(2))]),
        row(&[("tag_id", Value::Int(3))]),
    ]);

    let mut user = User::find(&db, 7).unwrap();
    user.tags.set(vec![persisted_tag(2, "b"), persisted_tag(3, "c"), persisted_tag(4, "d")]);
    user.save(&db).unwrap();

    let executed = conn.executed.borrow();
    assert_eq!(executed[0], "INSERT INTO `tag_user` (`user_id`,`tag_id`) VALUES (7,4)");
    assert_eq!(executed[1], "DELETE FROM `tag_user` WHERE `user_id` = 7 AND `tag_id` IN (1)");
    assert_eq!(executed.len(), 2);
}

#[test]
fn many_to_many_cascade_saves_transient_members_first() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(7)), ("name", Value::Str("John".into()))])]);
    conn.set_last_insert_id(9);
    conn.push_result(vec![]);

    let mut user = User::find(&db, 7).unwrap();
    let mut tag = Tag::default();
    tag.label.set("fresh");
    user.tags.set(vec![tag]);
    user.save(&db).unwrap();

    let executed = conn.executed.borrow();
    assert_eq!(executed[0], "INSERT INTO `tag` (`label`) VALUES ('fresh')");
    assert_eq!(executed[1], "INSERT INTO `tag_user` (`user_id`,`tag_id`) VALUES (7,9)");
}

#[test]
fn many_to_many_links_write_through_the_owners_connection() {
    let user_conn = FakeConnection::new();
    let tag_conn = FakeConnection::new();
    let db = db_with(&user_conn);
    db.set_connection_for::<Tag>(tag_conn.clone());
    user_conn
        .push_result(vec![row(&[("id", Value::Int(7)), ("name", Value::Str("John".into()))])]);
    tag_conn.set_last_insert_id(9);

    let mut user = User::find(&db, 7).unwrap();
    let mut tag = Tag::default();
    tag.label.set("fresh");
    user.tags.set(vec![tag]);
    user.save(&db).unwrap();

    // The member row goes to its own database, the link rows to the owner's.
    assert_eq!(tag_conn.executed.borrow()[0], "INSERT INTO `tag` (`label`) VALUES ('fresh')");
    assert_eq!(user_conn.queried.borrow()[1], "SELECT `tag_id` FROM `tag_user` WHERE `user_id` = 7");
    assert_eq!(
        user_conn.executed.borrow()[0],
        "INSERT INTO `tag_user` (`user_id`,`tag_id`) VALUES (7,9)"
    );
    assert!(tag_conn.queried.borrow().is_empty());
}

#[test]
fn many_to_many_unchanged_membership_is_quiet() {
    let conn = FakeConnection::new();
    let db = db_with(&conn);
    conn.push_result(vec![row(&[("id", Value::Int(7)), ("name", Value::Str("John".into()))])]);
    conn.push_result(vec![row(&[("tag_id", Value::Int(1))]), row(&[("tag_id", Value::Int(2))])]);

    let mut user = User::find(&db, 7).unwrap();
    user.tags.set(vec![persisted_tag(1, "a"), persisted_tag(2, "b")]);
    user.save(&db).unwrap();

    assert!(conn.executed.borrow().is_empty());
}
