use crate::uuid_type;
use std::sync::{Arc, LazyLock};
use tabula::{
    Connection, CrudError, DriverRegistry, Executor, Int64Validator, StringValidator, Table,
    UidValidator, Value, is_bcrypt_hash, record, validators,
};
use tokio::sync::Mutex;

pub async fn users<C: Connection + 'static>(connection: &Arc<C>, registry: &DriverRegistry) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;
    let executor: Arc<dyn Executor> = connection.clone();

    // Setup
    executor
        .execute("DROP TABLE IF EXISTS user_accounts;".into())
        .await
        .expect("Failed to drop user_accounts table");
    executor
        .execute(
            format!(
                "CREATE TABLE user_accounts (id {} PRIMARY KEY, username TEXT NOT NULL, password TEXT, bio TEXT, created BIGINT, updated BIGINT);",
                uuid_type(executor.backend())
            )
            .into(),
        )
        .await
        .expect("Failed to create user_accounts table");
    let mut table = Table::with_registry(registry, "user_accounts", Some(executor.clone()))
        .expect("Could not bind user_accounts to the connection");
    table
        .add_column_primary_key(
            "id",
            validators![UidValidator {
                not_null: true,
                auto_generate: true,
                ..Default::default()
            }],
        )
        .add_column(
            "username",
            validators![StringValidator {
                not_null: true,
                min_len: 3,
                max_len: 20,
                max_words: 1,
                ..Default::default()
            }],
        )
        .add_column(
            "password",
            validators![StringValidator {
                password: true,
                min_len: 8,
                password_cost: Some(4),
                ..Default::default()
            }],
        )
        .add_column(
            "bio",
            validators![StringValidator {
                max_words: 5,
                ..Default::default()
            }],
        )
        .add_column(
            "created",
            validators![Int64Validator {
                timestamp: true,
                past_only: true,
                insert_now: true,
                ..Default::default()
            }],
        )
        .add_column(
            "updated",
            validators![Int64Validator {
                timestamp: true,
                insert_now: true,
                update_now: true,
                ..Default::default()
            }],
        );

    // Insert generates the key, hashes the password and stamps the row
    let mut grace = record! {
        "username" => "grace",
        "password" => "  correct horse  ",
        "bio" => "Rear admiral",
    };
    table
        .insert(None, &mut grace)
        .await
        .expect("Failed to insert grace");
    let id = grace["id"].clone();
    assert!(matches!(id, Value::Uuid(Some(..))));
    let hash = grace["password"]
        .as_str()
        .expect("The password must be a string")
        .to_owned();
    assert!(is_bcrypt_hash(&hash));
    assert!(grace["created"].as_i64().is_some());
    assert!(grace["updated"].as_i64() >= grace["created"].as_i64());

    let loaded = table
        .select_by_key(None, None, &[id.clone()])
        .await
        .expect("Failed to select grace")
        .expect("grace was not found");
    assert_eq!(loaded["id"], id);
    assert_eq!(loaded["password"], Value::from(hash.as_str()));
    assert_eq!(loaded["created"], grace["created"]);

    // Updating other fields keeps the stored hash
    let mut patch = record! { "id" => id.clone(), "bio" => "Inventor of the compiler" };
    table
        .update(None, &mut patch)
        .await
        .expect("Failed to update the bio of grace");
    assert_eq!(patch["password"], Value::from(hash.as_str()));
    assert_eq!(patch["created"], grace["created"]);
    assert!(patch["updated"].as_i64() >= grace["updated"].as_i64());
    let loaded = table
        .select_one(None, None, "username = $1", &[Value::from("grace")])
        .await
        .expect("Failed to select grace by username")
        .expect("grace was not found by username");
    assert_eq!(loaded["bio"], Value::from("Inventor of the compiler"));
    assert_eq!(loaded["password"], Value::from(hash.as_str()));

    // A new password is hashed again
    let mut patch = record! { "id" => id.clone(), "password" => "battery staple" };
    table
        .update(None, &mut patch)
        .await
        .expect("Failed to change the password of grace");
    let changed = patch["password"]
        .as_str()
        .expect("The password must be a string");
    assert!(is_bcrypt_hash(changed));
    assert_ne!(changed, hash);

    // Rejections
    let mut patch = record! { "id" => id.clone(), "bio" => "one two three four five six" };
    let error = table
        .update(None, &mut patch)
        .await
        .expect_err("A bio of six words must be rejected");
    assert!(matches!(
        error.downcast_ref::<CrudError>(),
        Some(CrudError::Constraint { field, .. }) if field == "bio"
    ));
    let mut short = record! { "username" => "al", "password" => "long enough" };
    let error = table
        .insert(None, &mut short)
        .await
        .expect_err("A username of two chars must be rejected");
    assert!(matches!(
        error.downcast_ref::<CrudError>(),
        Some(CrudError::Constraint { field, .. }) if field == "username"
    ));
    let mut weak = record! { "username" => "alan", "password" => "short" };
    let error = table
        .insert(None, &mut weak)
        .await
        .expect_err("A short password must be rejected");
    assert!(matches!(
        error.downcast_ref::<CrudError>(),
        Some(CrudError::Constraint { field, .. }) if field == "password"
    ));
    let mut future = record! { "username" => "marty", "created" => "2999-01-01" };
    let error = table
        .insert(None, &mut future)
        .await
        .expect_err("A creation date in the future must be rejected");
    assert!(matches!(
        error.downcast_ref::<CrudError>(),
        Some(CrudError::Constraint { field, .. }) if field == "created"
    ));
    let mut invalid = record! { "id" => "not a uid", "username" => "nobody" };
    let error = table
        .insert(None, &mut invalid)
        .await
        .expect_err("An invalid uid must be rejected");
    assert!(matches!(
        error.downcast_ref::<CrudError>(),
        Some(CrudError::Constraint { field, .. }) if field == "id"
    ));

    // Delete needs the whole key
    let mut nothing = record! { "username" => "grace" };
    let error = table
        .delete(None, &mut nothing)
        .await
        .expect_err("Deleting without the key must fail");
    assert_eq!(
        error.downcast_ref::<CrudError>(),
        Some(&CrudError::MissingKey("id".into()))
    );
    table
        .delete(None, &mut record! { "id" => id })
        .await
        .expect("Failed to delete grace");
}
