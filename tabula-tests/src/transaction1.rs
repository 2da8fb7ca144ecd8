use crate::auto_increment_key;
use std::sync::{Arc, LazyLock};
use tabula::{
    Connection, DriverRegistry, Executor, Int64Validator, StringValidator, Table, Transaction,
    Value, record, validators,
};
use tokio::{spawn, sync::Mutex, task::yield_now};

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn transaction1<C: Connection + 'static>(
    connection: &Arc<C>,
    registry: &DriverRegistry,
) {
    let _lock = MUTEX.lock().await;
    let executor: Arc<dyn Executor> = connection.clone();

    // Setup
    let transaction = connection
        .begin()
        .await
        .expect("Could not begin a transaction");
    transaction
        .execute("DROP TABLE IF EXISTS transaction_accounts;".into())
        .await
        .expect("Failed to drop transaction_accounts table");
    transaction
        .execute(
            format!(
                "CREATE TABLE transaction_accounts (id {}, owner TEXT NOT NULL, balance BIGINT NOT NULL);",
                auto_increment_key(executor.backend())
            )
            .into(),
        )
        .await
        .expect("Failed to create transaction_accounts table");
    transaction
        .commit()
        .await
        .expect("Failed to commit the transaction");
    let mut table = Table::with_registry(registry, "transaction_accounts", Some(executor))
        .expect("Could not bind transaction_accounts to the connection");
    table
        .add_column_auto_increment_primary_key("id", validators![Int64Validator::default()])
        .add_column(
            "owner",
            validators![StringValidator {
                not_null: true,
                ..Default::default()
            }],
        )
        .add_column(
            "balance",
            validators![Int64Validator {
                not_null: true,
                default: Some(0i64.into()),
                ..Default::default()
            }],
        );
    let table = Arc::new(table);

    // Rolled back insert
    let transaction = connection
        .begin()
        .await
        .expect("Could not begin a transaction");
    let handle: &dyn Executor = &transaction;
    let mut alice = record! { "owner" => "alice", "balance" => 100 };
    table
        .insert(Some(handle), &mut alice)
        .await
        .expect("Failed to insert alice inside the transaction");
    let id = alice["id"].clone();
    let found = table
        .select_by_key(Some(handle), None, &[id.clone()])
        .await
        .expect("Failed to select alice inside the transaction");
    assert!(found.is_some());
    transaction
        .rollback()
        .await
        .expect("Failed to roll back the transaction");
    let found = table
        .select_by_key(None, None, &[id])
        .await
        .expect("Failed to select alice");
    assert!(found.is_none());

    // Committed transfer
    let mut bob = record! { "owner" => "bob" };
    table
        .insert(None, &mut bob)
        .await
        .expect("Failed to insert bob");
    assert_eq!(bob["balance"], Value::Int64(Some(0)));
    let mut carol = record! { "owner" => "carol", "balance" => 50 };
    table
        .insert(None, &mut carol)
        .await
        .expect("Failed to insert carol");
    let transaction = connection
        .begin()
        .await
        .expect("Could not begin a transaction");
    let handle: &dyn Executor = &transaction;
    let mut debit = record! { "id" => carol["id"].clone(), "balance" => 20 };
    table
        .update(Some(handle), &mut debit)
        .await
        .expect("Failed to debit carol");
    assert_eq!(debit["owner"], Value::from("carol"));
    let mut credit = record! { "id" => bob["id"].clone(), "balance" => 30 };
    table
        .update(Some(handle), &mut credit)
        .await
        .expect("Failed to credit bob");
    transaction
        .commit()
        .await
        .expect("Failed to commit the transfer");
    let balances = table
        .select(None, Some(&["owner", "balance"][..]), "1=1 ORDER BY owner", &[])
        .await
        .expect("Failed to select the balances")
        .collect_records()
        .await
        .expect("Failed to collect the balances");
    assert_eq!(
        balances,
        [
            record! { "owner" => "bob", "balance" => 30i64 },
            record! { "owner" => "carol", "balance" => 20i64 },
        ]
    );

    // Writes outside an open transaction are not part of it
    let transaction = connection
        .begin()
        .await
        .expect("Could not begin a transaction");
    let handle: &dyn Executor = &transaction;
    let mut dave = record! { "owner" => "dave", "balance" => 5 };
    table
        .insert(Some(handle), &mut dave)
        .await
        .expect("Failed to insert dave inside the transaction");
    let outside = spawn({
        let table = table.clone();
        async move {
            let mut erin = record! { "owner" => "erin", "balance" => 7 };
            table.insert(None, &mut erin).await.map(|_| erin)
        }
    });
    yield_now().await;
    transaction
        .rollback()
        .await
        .expect("Failed to roll back the transaction");
    let erin = outside
        .await
        .expect("The insert of erin panicked")
        .expect("Failed to insert erin");
    let found = table
        .select_by_key(None, None, &[erin["id"].clone()])
        .await
        .expect("Failed to select erin");
    assert_eq!(
        found.map(|r| r["owner"].clone()),
        Some(Value::from("erin"))
    );
    let params = [Value::from("dave")];
    let found = table
        .select_one(None, None, "owner = $1", &params)
        .await
        .expect("Failed to select dave");
    assert!(found.is_none());
}
