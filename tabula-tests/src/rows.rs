use crate::auto_increment_key;
use std::sync::{Arc, LazyLock};
use tabula::{
    BoolValidator, Connection, DriverRegistry, Executor, Int64Validator, StringValidator, Table,
    Value, record, validators,
};
use tokio::sync::Mutex;

pub async fn rows<C: Connection + 'static>(connection: &Arc<C>, registry: &DriverRegistry) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;
    let executor: Arc<dyn Executor> = connection.clone();

    // Setup
    executor
        .execute("DROP TABLE IF EXISTS rows_books;".into())
        .await
        .expect("Failed to drop rows_books table");
    executor
        .execute(
            format!(
                "CREATE TABLE rows_books (id {}, title TEXT NOT NULL, year BIGINT, available BOOLEAN);",
                auto_increment_key(executor.backend())
            )
            .into(),
        )
        .await
        .expect("Failed to create rows_books table");
    let mut table = Table::with_registry(registry, "rows_books", Some(executor.clone()))
        .expect("Could not bind rows_books to the connection");
    table
        .add_column_auto_increment_primary_key("id", validators![Int64Validator::default()])
        .add_column(
            "title",
            validators![StringValidator {
                not_null: true,
                ..Default::default()
            }],
        )
        .add_column(
            "year",
            validators![Int64Validator {
                min: 1400,
                max: 2100,
                ..Default::default()
            }],
        )
        .add_column("available", validators![BoolValidator::default()]);
    let books = [
        ("Dune", 1965, true),
        ("Neuromancer", 1984, false),
        ("Hyperion", 1989, true),
        ("Foundation", 1951, true),
    ];
    for (title, year, available) in books {
        let mut book = record! {
            "title" => title,
            "year" => year,
            "available" => available,
        };
        table
            .insert(None, &mut book)
            .await
            .unwrap_or_else(|e| panic!("Failed to insert {}: {:#}", title, e));
    }

    // Cursor
    let params = [Value::Int64(Some(1960))];
    let mut rows = table
        .select(
            None,
            Some(&["title", "year"][..]),
            "year > $1 ORDER BY year;",
            &params,
        )
        .await
        .expect("Failed to select the books");
    let mut titles = Vec::new();
    while rows.next().await {
        let record = rows.tuple().expect("Failed to read a book");
        assert_eq!(record.len(), 2);
        assert!(matches!(record["year"], Value::Int64(Some(year)) if year > 1960));
        titles.push(record["title"].clone());
        let again = rows.tuple().expect("Failed to read the same book twice");
        assert_eq!(again, record);
    }
    assert!(rows.is_closed());
    assert!(!rows.next().await);
    assert_eq!(
        titles,
        [
            Value::from("Dune"),
            Value::from("Neuromancer"),
            Value::from("Hyperion")
        ]
    );

    // Loaded rows go through the field validators
    let available = table
        .select(None, None, "available = $1 ORDER BY title", &[Value::from(true)])
        .await
        .expect("Failed to select the available books")
        .collect_records()
        .await
        .expect("Failed to collect the available books");
    assert_eq!(available.len(), 3);
    for book in &available {
        assert_eq!(book.len(), 4);
        assert_eq!(book["available"], Value::Boolean(Some(true)));
    }
    assert_eq!(available[0]["title"], Value::from("Dune"));

    // Closing early releases the statement
    let mut rows = table
        .select(None, None, "", &params[..0])
        .await
        .expect("Failed to select every book");
    assert!(rows.next().await);
    rows.tuple().expect("Failed to read the first book");
    rows.close();
    assert!(rows.is_closed());
    assert!(!rows.next().await);
    drop(rows);

    // Nothing matched
    let params = [Value::from("Solaris")];
    let mut rows = table
        .select(None, None, "title = $1", &params)
        .await
        .expect("Failed to select a missing book");
    assert!(!rows.next().await);
    assert!(rows.tuple().is_err());
}
