use chrono::NaiveDateTime;
use sql_tablemap::prelude::*;
use sql_tablemap::{PlanKind, camel_to_snake};

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Invoice {
        pub id: i64,
        pub created: NaiveDateTime,
        pub memo: String,
        pub person_id: i64,
        pub paid: bool,
        #[column = "-"]
        pub display_total: String,
    }
}

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Person {
        pub id: i64,
        #[column = "FName"]
        pub first_name: String,
        pub last_name: Option<String>,
    }
}

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Membership {
        pub club: String,
        pub member: i64,
        pub level: i64,
    }
}

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Tag {
        pub code: String,
        pub label: String,
    }
}

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Flag {
        pub flag: bool,
        pub label: String,
    }
}

record! {
    #[derive(Debug, Default, Clone, PartialEq)]
    pub struct Note {
        pub body: String,
    }
}

const SCHEMA: &str = "
    CREATE TABLE Invoice (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created TEXT NOT NULL,
        memo TEXT NOT NULL UNIQUE,
        person_id INTEGER NOT NULL,
        paid INTEGER NOT NULL
    );
    CREATE TABLE Person (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        FName TEXT NOT NULL,
        last_name TEXT
    );
    CREATE TABLE Membership (
        club TEXT NOT NULL,
        member INTEGER NOT NULL,
        level INTEGER NOT NULL,
        PRIMARY KEY (club, member)
    );
    CREATE TABLE Tag (
        code INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL
    );
    CREATE TABLE Flag (
        flag INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL
    );
";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn setup() -> Result<(TypeRegistry, SqliteDb), TableMapError> {
    init_tracing();
    let registry = TypeRegistry::new();
    registry.register::<Invoice>(None).set_keys(true, &["id"])?;
    registry.register::<Person>(None).set_keys(true, &["id"])?;
    registry
        .register::<Membership>(None)
        .set_keys(false, &["club", "member"])?;

    let db = SqliteDb::open_in_memory()?;
    db.execute_batch(SCHEMA)?;
    Ok((registry, db))
}

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn invoice(memo: &str) -> Invoice {
    Invoice {
        id: 0,
        created: ts("2024-02-03 04:05:06"),
        memo: memo.to_string(),
        person_id: 7,
        paid: false,
        display_total: "not stored".to_string(),
    }
}

#[test]
fn insert_writes_back_generated_keys_and_get_reads_them() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut invoices = [invoice("first"), invoice("second")];
    crud::insert(&registry, &db, &mut invoices)?;

    assert!(invoices[0].id > 0);
    assert_eq!(invoices[1].id, invoices[0].id + 1);

    let mut loaded = Invoice::default();
    crud::get(&registry, &db, &mut loaded, &[RowValues::Int(invoices[1].id)])?;
    assert_eq!(loaded.memo, "second");
    assert_eq!(loaded.created, ts("2024-02-03 04:05:06"));
    assert!(!loaded.paid);
    // transient fields are never read or written
    assert_eq!(loaded.display_total, "");
    Ok(())
}

#[test]
fn storage_name_overrides_and_nullable_fields_round_trip() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut people = [
        Person {
            id: 0,
            first_name: "Ada".into(),
            last_name: None,
        },
        Person {
            id: 0,
            first_name: "Alan".into(),
            last_name: Some("Turing".into()),
        },
    ];
    crud::insert(&registry, &db, &mut people)?;

    let rs = db.query("SELECT FName, last_name FROM Person ORDER BY id", &[])?;
    assert_eq!(rs.column_names(), ["FName", "last_name"]);
    assert_eq!(rs.results[0].get("last_name"), Some(&RowValues::Null));

    let mut alan = Person::default();
    crud::get(&registry, &db, &mut alan, &[RowValues::Int(people[1].id)])?;
    assert_eq!(alan, people[1]);
    Ok(())
}

#[test]
fn update_only_touches_the_matching_row() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut invoices = [invoice("a"), invoice("b")];
    crud::insert(&registry, &db, &mut invoices)?;

    invoices[0].memo = "a-edited".into();
    invoices[0].paid = true;
    let affected = crud::update(&registry, &db, &invoices[..1])?;
    assert_eq!(affected, 1);

    let mut other = Invoice::default();
    crud::get(&registry, &db, &mut other, &[RowValues::Int(invoices[1].id)])?;
    assert_eq!(other.memo, "b");
    assert!(!other.paid);

    let mut edited = Invoice::default();
    crud::get(&registry, &db, &mut edited, &[RowValues::Int(invoices[0].id)])?;
    assert_eq!(edited.memo, "a-edited");
    assert!(edited.paid);
    Ok(())
}

#[test]
fn update_and_delete_of_missing_rows_affect_nothing() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let ghost = Invoice {
        id: 999,
        ..invoice("ghost")
    };
    assert_eq!(crud::update(&registry, &db, std::slice::from_ref(&ghost))?, 0);
    assert_eq!(crud::delete(&registry, &db, &[ghost])?, 0);
    Ok(())
}

#[test]
fn deleted_rows_are_not_found() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut invoices = [invoice("gone"), invoice("kept")];
    crud::insert(&registry, &db, &mut invoices)?;

    assert_eq!(crud::delete(&registry, &db, &invoices[..1])?, 1);

    let mut loaded = Invoice::default();
    let err = crud::get(&registry, &db, &mut loaded, &[RowValues::Int(invoices[0].id)])
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(crud::scalar(&db, "SELECT COUNT(*) FROM Invoice", &[])?, 1);
    Ok(())
}

#[test]
fn composite_keys_bind_in_declared_order() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut rows = [
        Membership {
            club: "chess".into(),
            member: 1,
            level: 3,
        },
        Membership {
            club: "chess".into(),
            member: 2,
            level: 5,
        },
    ];
    crud::insert(&registry, &db, &mut rows)?;

    let mut loaded = Membership::default();
    crud::get(
        &registry,
        &db,
        &mut loaded,
        &[RowValues::Text("chess".into()), RowValues::Int(2)],
    )?;
    assert_eq!(loaded.level, 5);

    rows[0].level = 4;
    assert_eq!(crud::update(&registry, &db, &rows[..1])?, 1);
    let level = crud::scalar(
        &db,
        "SELECT level FROM Membership WHERE club = ? AND member = ?",
        &[RowValues::Text("chess".into()), RowValues::Int(1)],
    )?;
    assert_eq!(level, 4);

    let err = crud::get(&registry, &db, &mut loaded, &[RowValues::Int(2)]).unwrap_err();
    assert!(matches!(
        err,
        TableMapError::KeyCountMismatch {
            expected: 2,
            got: 1,
            ..
        }
    ));
    Ok(())
}

#[test]
fn keyless_tables_fail_before_touching_the_database() -> Result<(), TableMapError> {
    let registry = TypeRegistry::new();
    registry.register::<Note>(None);
    // no Note table exists, so any I/O would surface a driver error instead
    let db = SqliteDb::open_in_memory()?;
    let note = Note { body: "x".into() };

    for err in [
        crud::update(&registry, &db, std::slice::from_ref(&note)).unwrap_err(),
        crud::delete(&registry, &db, std::slice::from_ref(&note)).unwrap_err(),
        crud::get(&registry, &db, &mut Note::default(), &[]).unwrap_err(),
    ] {
        assert!(matches!(err, TableMapError::NoPrimaryKey { ref table } if table == "Note"));
    }
    assert_eq!(db.cached_statements(), 0);
    Ok(())
}

#[test]
fn unregistered_types_are_rejected() -> Result<(), TableMapError> {
    let registry = TypeRegistry::new();
    let db = SqliteDb::open_in_memory()?;
    let err = crud::insert(&registry, &db, &mut [Note::default()]).unwrap_err();
    assert!(matches!(err, TableMapError::UnregisteredType(ref name) if name == "Note"));
    Ok(())
}

#[test]
fn non_integer_auto_increment_field_is_reported_after_insert() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    registry.register::<Tag>(None).set_keys(true, &["code"])?;

    let mut tags = [Tag {
        code: String::new(),
        label: "red".into(),
    }];
    let err = crud::insert(&registry, &db, &mut tags).unwrap_err();
    match err {
        TableMapError::AutoIncrementTypeMismatch { field, sql } => {
            assert_eq!(field, "code");
            assert!(sql.starts_with("INSERT INTO `Tag`"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // the row itself was written
    assert_eq!(crud::scalar(&db, "SELECT COUNT(*) FROM Tag", &[])?, 1);
    Ok(())
}

#[test]
fn bool_auto_increment_field_fails_on_the_first_insert() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    registry.register::<Flag>(None).set_keys(true, &["flag"])?;

    // the first generated key is 1, which a bool read from a row would accept
    let mut flags = [Flag {
        flag: false,
        label: "a".into(),
    }];
    let err = crud::insert(&registry, &db, &mut flags).unwrap_err();
    assert!(matches!(
        err,
        TableMapError::AutoIncrementTypeMismatch { ref field, .. } if field == "flag"
    ));
    assert!(!flags[0].flag);
    Ok(())
}

#[test]
fn failing_batch_keeps_earlier_records() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut invoices = [invoice("one"), invoice("one"), invoice("three")];

    let err = crud::insert(&registry, &db, &mut invoices).unwrap_err();
    assert!(matches!(err, TableMapError::Sqlite(_)));

    assert!(invoices[0].id > 0);
    assert_eq!(invoices[1].id, 0);
    assert_eq!(invoices[2].id, 0);
    let rows = crud::scalar(&db, "SELECT COUNT(*) FROM Invoice", &[])?;
    assert_eq!(rows, 1);
    Ok(())
}

#[test]
fn batch_inside_transaction_is_all_or_nothing() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut invoices = [invoice("one"), invoice("one")];

    let res = db.with_transaction(|tx| crud::insert(&registry, tx, &mut invoices));
    assert!(res.is_err());
    assert_eq!(crud::scalar(&db, "SELECT COUNT(*) FROM Invoice", &[])?, 0);

    let mut ok = [invoice("x"), invoice("y")];
    db.with_transaction(|tx| crud::insert(&registry, tx, &mut ok))?;
    assert_eq!(crud::scalar(&db, "SELECT COUNT(*) FROM Invoice", &[])?, 2);
    Ok(())
}

#[test]
fn put_inserts_new_records_and_updates_existing_ones() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut people = [Person {
        id: 0,
        first_name: "Grace".into(),
        last_name: None,
    }];
    crud::put(&registry, &db, true, &mut people)?;
    people[0].last_name = Some("Hopper".into());
    crud::put(&registry, &db, false, &mut people)?;

    let mut loaded = Person::default();
    crud::get(&registry, &db, &mut loaded, &[RowValues::Int(people[0].id)])?;
    assert_eq!(loaded.last_name.as_deref(), Some("Hopper"));
    Ok(())
}

#[test]
fn select_into_fills_one_record_or_a_vec() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut people = [
        Person {
            id: 0,
            first_name: "B".into(),
            last_name: None,
        },
        Person {
            id: 0,
            first_name: "A".into(),
            last_name: Some("Z".into()),
        },
    ];
    crud::insert(&registry, &db, &mut people)?;

    let mut all: Vec<Person> = Vec::new();
    crud::select_into(
        &registry,
        &db,
        &mut all,
        "SELECT * FROM Person ORDER BY FName",
        &[],
    )?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].first_name, "A");
    assert_eq!(all[0].last_name.as_deref(), Some("Z"));

    let mut one = Person::default();
    crud::select_into(
        &registry,
        &db,
        &mut one,
        "SELECT id, FName FROM Person WHERE FName = ?",
        &[RowValues::Text("B".into())],
    )?;
    assert_eq!(one.id, people[0].id);

    let err = crud::select_into(
        &registry,
        &db,
        &mut one,
        "SELECT id FROM Person WHERE id < 0",
        &[],
    )
    .unwrap_err();
    assert!(err.is_not_found());

    let mut none: Vec<Person> = Vec::new();
    crud::select_into(&registry, &db, &mut none, "SELECT id FROM Person WHERE id < 0", &[])?;
    assert!(none.is_empty());
    Ok(())
}

#[test]
fn select_into_rejects_columns_without_a_field() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut out: Vec<Person> = Vec::new();
    let err = crud::select_into(
        &registry,
        &db,
        &mut out,
        "SELECT 1 AS id, 'x' AS nickname",
        &[],
    )
    .unwrap_err();
    assert!(matches!(err, TableMapError::InvalidDestination(ref msg) if msg.contains("nickname")));
    Ok(())
}

#[test]
fn select_into_works_for_unregistered_types() -> Result<(), TableMapError> {
    let registry = TypeRegistry::with_name_mapper(camel_to_snake);
    let db = SqliteDb::open_in_memory()?;
    let mut notes: Vec<Note> = Vec::new();
    crud::select_into(
        &registry,
        &db,
        &mut notes,
        "SELECT 'hello' AS body UNION ALL SELECT 'world'",
        &[],
    )?;
    assert_eq!(notes.len(), 2);
    assert!(registry.lookup::<Note>().is_none());
    Ok(())
}

#[test]
fn scalar_rejects_non_integers() -> Result<(), TableMapError> {
    let db = SqliteDb::open_in_memory()?;
    assert_eq!(crud::scalar(&db, "SELECT 41 + 1", &[])?, 42);
    assert!(matches!(
        crud::scalar(&db, "SELECT NULL", &[]),
        Err(TableMapError::ValueConversion { .. })
    ));
    assert!(matches!(
        crud::scalar(&db, "SELECT 'seven'", &[]),
        Err(TableMapError::ValueConversion { .. })
    ));
    Ok(())
}

#[test]
fn generated_statements_are_prepared_once_per_connection() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    let mut invoices: Vec<Invoice> = (0..10).map(|i| invoice(&format!("m{i}"))).collect();
    crud::insert(&registry, &db, &mut invoices)?;
    assert_eq!(db.cached_statements(), 1);

    let table = registry.lookup::<Invoice>().unwrap();
    let insert_sql = table.plan(PlanKind::Insert)?.sql().to_string();
    let handle = db.prepare(&insert_sql)?;
    assert_eq!(handle.parameter_count(), 4);
    assert_eq!(db.cached_statements(), 1);
    Ok(())
}

#[test]
fn renamed_table_uses_new_statements() -> Result<(), TableMapError> {
    let (registry, db) = setup()?;
    db.execute_batch("CREATE TABLE people (id INTEGER PRIMARY KEY AUTOINCREMENT, FName TEXT NOT NULL, last_name TEXT);")?;
    registry.register_with_name::<Person>("people");

    let mut p = [Person {
        id: 0,
        first_name: "Edsger".into(),
        last_name: None,
    }];
    crud::insert(&registry, &db, &mut p)?;
    assert_eq!(crud::scalar(&db, "SELECT COUNT(*) FROM people", &[])?, 1);
    assert_eq!(crud::scalar(&db, "SELECT COUNT(*) FROM Person", &[])?, 0);
    Ok(())
}
