use crate::auto_increment_key;
use std::sync::{Arc, LazyLock};
use tabula::{
    BoolValidator, Connection, CrudError, DriverRegistry, EmailValidator, Executor,
    Int32Validator, Int64Validator, StringValidator, Table, Value, last_auto_increment, record,
    rows_affected, validators,
};
use tokio::sync::Mutex;

pub async fn simple<C: Connection + 'static>(connection: &Arc<C>, registry: &DriverRegistry) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;
    let executor: Arc<dyn Executor> = connection.clone();

    // Setup
    executor
        .execute("DROP TABLE IF EXISTS simple_people;".into())
        .await
        .expect("Failed to drop simple_people table");
    executor
        .execute(
            format!(
                "CREATE TABLE simple_people (id {}, name TEXT NOT NULL, email TEXT, age INTEGER, active BOOLEAN NOT NULL);",
                auto_increment_key(executor.backend())
            )
            .into(),
        )
        .await
        .expect("Failed to create simple_people table");
    let mut table = Table::with_registry(registry, "simple_people", Some(executor.clone()))
        .expect("Could not bind simple_people to the connection");
    table
        .add_column_auto_increment_primary_key("id", validators![Int64Validator::default()])
        .add_column(
            "name",
            validators![StringValidator {
                not_null: true,
                min_len: 1,
                max_len: 40,
                ..Default::default()
            }],
        )
        .add_column("email", validators![EmailValidator::default()])
        .add_column(
            "age",
            validators![Int32Validator {
                min: 0,
                max: 150,
                ..Default::default()
            }],
        )
        .add_column(
            "active",
            validators![BoolValidator {
                not_null: true,
                default: Some(true.into()),
            }],
        );

    // Insert
    let mut ada = record! {
        "name" => "  Ada Lovelace ",
        "email" => "Ada <ada@example.com>",
        "age" => 36,
    };
    table
        .insert(None, &mut ada)
        .await
        .expect("Failed to insert Ada");
    let id = last_auto_increment(&ada).expect("Insert did not report the generated id");
    assert_eq!(rows_affected(&ada), Some(1));
    assert_eq!(ada["id"], Value::Int64(Some(id)));
    assert_eq!(ada["name"], Value::from("Ada Lovelace"));
    assert_eq!(ada["email"], Value::from("ada@example.com"));
    assert_eq!(ada["active"], Value::Boolean(Some(true)));

    let loaded = table
        .select_by_key(None, None, &[Value::Int64(Some(id))])
        .await
        .expect("Failed to select Ada")
        .expect("Ada was not found");
    assert_eq!(loaded["id"], Value::Int64(Some(id)));
    assert_eq!(loaded["name"], Value::from("Ada Lovelace"));
    assert_eq!(loaded["email"], Value::from("ada@example.com"));
    assert_eq!(loaded["age"], Value::Int32(Some(36)));
    assert_eq!(loaded["active"], Value::Boolean(Some(true)));

    // Projection
    let name = table
        .select_by_key(None, Some(&["name"][..]), &[Value::Int64(Some(id))])
        .await
        .expect("Failed to select the name of Ada")
        .expect("Ada was not found");
    assert_eq!(name.len(), 1);
    assert_eq!(name["name"], Value::from("Ada Lovelace"));

    // Partial update
    let mut patch = record! { "id" => id, "age" => 37 };
    table
        .update(None, &mut patch)
        .await
        .expect("Failed to update the age of Ada");
    assert_eq!(rows_affected(&patch), Some(1));
    assert_eq!(patch["name"], Value::from("Ada Lovelace"));
    assert_eq!(patch["email"], Value::from("ada@example.com"));
    assert_eq!(patch["age"], Value::Int32(Some(37)));
    let loaded = table
        .select_by_key(None, None, &[Value::Int64(Some(id))])
        .await
        .expect("Failed to select Ada")
        .expect("Ada was not found");
    assert_eq!(loaded["age"], Value::Int32(Some(37)));
    assert_eq!(loaded["name"], Value::from("Ada Lovelace"));

    // Setting a column to null
    let mut patch = record! { "id" => id, "email" => None::<String> };
    table
        .update(None, &mut patch)
        .await
        .expect("Failed to clear the email of Ada");
    let loaded = table
        .select_by_key(None, None, &[Value::Int64(Some(id))])
        .await
        .expect("Failed to select Ada")
        .expect("Ada was not found");
    assert!(loaded["email"].is_null());
    assert_eq!(loaded["age"], Value::Int32(Some(37)));

    // Rejected writes do not reach the storage
    let mut old = record! { "name" => "Methuselah", "age" => 969 };
    let error = table
        .insert(None, &mut old)
        .await
        .expect_err("An age out of range must be rejected");
    assert!(matches!(
        error.downcast_ref::<CrudError>(),
        Some(CrudError::Constraint { field, .. }) if field == "age"
    ));
    let mut nameless = record! { "age" => 3 };
    let error = table
        .insert(None, &mut nameless)
        .await
        .expect_err("A missing name must be rejected");
    assert_eq!(
        error.downcast_ref::<CrudError>(),
        Some(&CrudError::NotNull("name".into()))
    );
    let found = table
        .select_one(None, None, "name = $1", &[Value::from("Methuselah")])
        .await
        .expect("Failed to look for Methuselah");
    assert!(found.is_none());

    // Update of a missing row
    let mut ghost = record! { "id" => id + 1000, "age" => 1 };
    let error = table
        .update(None, &mut ghost)
        .await
        .expect_err("Updating a missing row must fail");
    assert_eq!(error.downcast_ref::<CrudError>(), Some(&CrudError::NotFound));

    // Delete
    let mut key = record! { "id" => id };
    table
        .delete(None, &mut key)
        .await
        .expect("Failed to delete Ada");
    assert_eq!(rows_affected(&key), Some(1));
    let error = table
        .delete(None, &mut key)
        .await
        .expect_err("Deleting Ada twice must fail");
    assert_eq!(error.downcast_ref::<CrudError>(), Some(&CrudError::NotFound));
    assert!(
        table
            .select_by_key(None, None, &[Value::Int64(Some(id))])
            .await
            .expect("Failed to select Ada")
            .is_none()
    );
}
