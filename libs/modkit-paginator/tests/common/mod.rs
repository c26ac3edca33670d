#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)]

use anyhow::Result;
use modkit_paginator::{ModelDescriptor, ModelRegistry, RelationMeta};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

pub const PEOPLE: i64 = 80;
pub const FEMALES: i64 = 50;

pub const LANGUAGES: [(i64, &str); 4] = [
    (1, "English"),
    (2, "Spanish"),
    (3, "French"),
    (4, "German"),
];

pub const DOMAINS: [(i64, &str); 3] = [(1, "alpha.org"), (2, "beta.org"), (3, "gamma.org")];

pub mod person {
    use sea_orm::entity::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "person")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub firstname: String,
        pub lastname: String,
        pub gender: String,
        pub domain_id: Option<i64>,
        pub meta: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub fn gender_of(id: i64) -> &'static str {
    if id <= FEMALES { "female" } else { "male" }
}

/// Lastnames are a permutation of `Last00..Last79`, unrelated to the id order.
pub fn lastname_of(id: i64) -> String {
    format!("Last{:02}", (id * 37) % PEOPLE)
}

/// Every tenth person has no domain.
pub fn domain_of(id: i64) -> Option<i64> {
    (id % 10 != 0).then_some(id % 3 + 1)
}

pub fn color_of(id: i64) -> &'static str {
    if id % 4 == 0 { "red" } else { "blue" }
}

/// Females speak two languages except the last two, who speak none; males
/// speak one.
pub fn languages_of(id: i64) -> Vec<i64> {
    if id <= FEMALES - 2 {
        vec![id % 4 + 1, (id + 1) % 4 + 1]
    } else if id <= FEMALES {
        Vec::new()
    } else {
        vec![id % 4 + 1]
    }
}

pub fn language_id(name: &str) -> i64 {
    LANGUAGES.iter().find(|(_, n)| *n == name).unwrap().0
}

pub fn registry() -> ModelRegistry {
    ModelRegistry::new()
        .with(
            ModelDescriptor::for_entity::<person::Entity>("Person")
                .relation(
                    "languages",
                    RelationMeta::belongs_to_many(
                        "language",
                        "person_speaks_language",
                        "person_id",
                        "language_id",
                    ),
                )
                .relation("domain", RelationMeta::belongs_to("domain", "domain_id"))
                .relation("friends", RelationMeta::has_many("person", "friend_id")),
        )
        .with(ModelDescriptor::new("Language", "language"))
}

/// Single-connection in-memory database; every pooled connection would
/// otherwise get its own empty database.
pub async fn connect() -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Ok(Database::connect(opts).await?)
}

pub async fn create_schema(conn: &DatabaseConnection) -> Result<()> {
    for ddl in [
        "CREATE TABLE domain (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        )",
        "CREATE TABLE language (
            id INTEGER PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        )",
        "CREATE TABLE person (
            id INTEGER PRIMARY KEY NOT NULL,
            firstname TEXT NOT NULL,
            lastname TEXT NOT NULL,
            gender TEXT NOT NULL,
            domain_id INTEGER NULL REFERENCES domain(id),
            meta TEXT NOT NULL
        )",
        "CREATE TABLE person_speaks_language (
            person_id INTEGER NOT NULL REFERENCES person(id),
            language_id INTEGER NOT NULL REFERENCES language(id),
            PRIMARY KEY (person_id, language_id)
        )",
    ] {
        conn.execute_unprepared(ddl).await?;
    }
    Ok(())
}

pub async fn seed(conn: &DatabaseConnection) -> Result<()> {
    for (id, name) in DOMAINS {
        conn.execute_unprepared(&format!("INSERT INTO domain (id, name) VALUES ({id}, '{name}')"))
            .await?;
    }
    for (id, name) in LANGUAGES {
        conn.execute_unprepared(&format!(
            "INSERT INTO language (id, name) VALUES ({id}, '{name}')"
        ))
        .await?;
    }
    for id in 1..=PEOPLE {
        let domain = domain_of(id).map_or_else(|| "NULL".to_owned(), |d| d.to_string());
        conn.execute_unprepared(&format!(
            "INSERT INTO person (id, firstname, lastname, gender, domain_id, meta) \
             VALUES ({id}, 'First{id}', '{}', '{}', {domain}, '{{\"color\":\"{}\"}}')",
            lastname_of(id),
            gender_of(id),
            color_of(id),
        ))
        .await?;
        for language in languages_of(id) {
            conn.execute_unprepared(&format!(
                "INSERT INTO person_speaks_language (person_id, language_id) VALUES ({id}, {language})"
            ))
            .await?;
        }
    }
    Ok(())
}

pub async fn seeded() -> Result<DatabaseConnection> {
    let conn = connect().await?;
    create_schema(&conn).await?;
    seed(&conn).await?;
    Ok(conn)
}

pub fn ids(rows: &[serde_json::Value]) -> Vec<i64> {
    rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
}
