#![cfg(feature = "sqlite")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Models whose primary key is not an integer `id`.

mod common;

use common::connect;
use modkit_paginator::{
    FetchOptions, Filter, KeyType, ModelDescriptor, ModelRegistry, Paginator, PaginatorConfig,
    RelationMeta,
};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use uuid::Uuid;

mod ticket {
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "ticket")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub title: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

const BOOKS: [(&str, &str, &str); 4] = [
    ("978-3", "Dune", "sf"),
    ("978-1", "Emma", "classics"),
    ("978-4", "Ulysses", "classics"),
    ("978-2", "Solaris", "sf"),
];

fn ticket_id(n: u128) -> Uuid {
    Uuid::from_u128(0x5eed_0000_0000_0000_0000_0000_0000_0000 + n)
}

fn registry() -> ModelRegistry {
    ModelRegistry::new()
        .with(
            ModelDescriptor::new("Book", "book")
                .with_primary_key("isbn")
                .with_key_type(KeyType::Text)
                .relation(
                    "shelf",
                    RelationMeta::belongs_to("shelf", "shelf_code")
                        .with_target_key("code")
                        .with_target_key_type(KeyType::Text),
                ),
        )
        .with(
            ModelDescriptor::for_entity::<ticket::Entity>("Ticket").relation(
                "watchers",
                RelationMeta::belongs_to_many("watcher", "ticket_watcher", "ticket_id", "watcher_id"),
            ),
        )
}

async fn seeded() -> anyhow::Result<DatabaseConnection> {
    let conn = connect().await?;
    for ddl in [
        "CREATE TABLE shelf (code TEXT PRIMARY KEY NOT NULL, label TEXT NOT NULL)",
        "CREATE TABLE book (
            isbn TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            shelf_code TEXT NULL REFERENCES shelf(code)
        )",
        "CREATE TABLE watcher (id INTEGER PRIMARY KEY NOT NULL, name TEXT NOT NULL)",
        "CREATE TABLE ticket (id BLOB PRIMARY KEY NOT NULL, title TEXT NOT NULL)",
        "CREATE TABLE ticket_watcher (
            ticket_id BLOB NOT NULL REFERENCES ticket(id),
            watcher_id INTEGER NOT NULL REFERENCES watcher(id),
            PRIMARY KEY (ticket_id, watcher_id)
        )",
        "INSERT INTO shelf (code, label) VALUES ('sf', 'Science fiction'), ('classics', 'Classics')",
        "INSERT INTO watcher (id, name) VALUES (1, 'Ann'), (2, 'Bob')",
    ] {
        conn.execute_unprepared(ddl).await?;
    }
    for (isbn, title, shelf) in BOOKS {
        conn.execute_unprepared(&format!(
            "INSERT INTO book (isbn, title, shelf_code) VALUES ('{isbn}', '{title}', '{shelf}')"
        ))
        .await?;
    }
    // Uuids are stored the way the driver binds them: 16 raw bytes.
    for n in 1..=5_u128 {
        let id = ticket_id(n).simple();
        conn.execute_unprepared(&format!(
            "INSERT INTO ticket (id, title) VALUES (X'{id}', 'Ticket {n}')"
        ))
        .await?;
        conn.execute_unprepared(&format!(
            "INSERT INTO ticket_watcher (ticket_id, watcher_id) VALUES (X'{id}', 2)"
        ))
        .await?;
        if n % 2 == 1 {
            conn.execute_unprepared(&format!(
                "INSERT INTO ticket_watcher (ticket_id, watcher_id) VALUES (X'{id}', 1)"
            ))
            .await?;
        }
    }
    Ok(conn)
}

fn column<'r>(rows: &'r [serde_json::Value], name: &str) -> Vec<&'r str> {
    rows.iter().map(|r| r[name].as_str().unwrap()).collect()
}

#[tokio::test]
async fn default_sort_uses_the_declared_primary_key() -> anyhow::Result<()> {
    let conn = seeded().await?;
    let registry = registry();
    let mut pager = Paginator::new(&conn, &registry, "Book")?;

    let page = pager.paginate(&Filter::new(), &FetchOptions::new()).await?;

    assert_eq!(page.total(), 4);
    assert_eq!(column(page.data(), "isbn"), vec!["978-1", "978-2", "978-3", "978-4"]);

    let page = pager
        .paginate(&Filter::new(), &FetchOptions::new().sort_by("-").limit(2))
        .await?;
    assert_eq!(column(page.data(), "isbn"), vec!["978-4", "978-3"]);
    Ok(())
}

#[tokio::test]
async fn text_keys_hydrate_and_load_belongs_to() -> anyhow::Result<()> {
    let conn = seeded().await?;
    let registry = registry();
    let config = PaginatorConfig::default()
        .filter_by(["shelf.label"])
        .sort_by("title");
    let mut pager = Paginator::with_config(&conn, &registry, "Book", config)?;

    let page = pager
        .paginate(
            &Filter::new().with("shelf.label", "Classics"),
            &FetchOptions::new().with_related("shelf"),
        )
        .await?;

    assert_eq!(page.total(), 2);
    assert_eq!(column(page.data(), "title"), vec!["Emma", "Ulysses"]);
    for row in page.data() {
        assert_eq!(row["shelf"]["code"], "classics");
    }
    Ok(())
}

#[tokio::test]
async fn uuid_keys_hydrate_and_group_many_to_many() -> anyhow::Result<()> {
    let conn = seeded().await?;
    let registry = registry();
    let config = PaginatorConfig::default()
        .filter_by(["watchers.name"])
        .sort_by("-title");
    let mut pager = Paginator::with_config(&conn, &registry, "Ticket", config)?;

    let page = pager
        .paginate(
            &Filter::new().with("watchers.name", "Ann"),
            &FetchOptions::new().with_related("watchers").limit(2),
        )
        .await?;

    assert_eq!(page.total(), 3);
    assert_eq!(column(page.data(), "title"), vec!["Ticket 5", "Ticket 3"]);
    for row in page.data() {
        let watchers: Vec<&str> = row["watchers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["name"].as_str().unwrap())
            .collect();
        assert_eq!(watchers, vec!["Ann", "Bob"]);
    }

    let page = pager
        .paginate(&Filter::new(), &FetchOptions::new().offset(3))
        .await?;
    assert_eq!(page.total(), 5);
    assert_eq!(column(page.data(), "title"), vec!["Ticket 2", "Ticket 1"]);
    Ok(())
}
