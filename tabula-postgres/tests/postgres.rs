#[cfg(test)]
mod tests {
    use std::{env, sync::Mutex};
    use tabula_core::{Connection, DriverRegistry, Executor, Query, Value, stream::TryStreamExt};
    use tabula_postgres::{PostgresConnection, register};
    use tabula_tests::{execute_tests, init_logs, silent_logs};

    static MUTEX: Mutex<()> = Mutex::new(());

    /// Url of the server to test against, `None` skips the test.
    fn test_url() -> Option<String> {
        let url = env::var("TABULA_POSTGRES_TEST").ok();
        if url.is_none() {
            log::warn!("TABULA_POSTGRES_TEST is not set, skipping the postgres test");
        }
        url
    }

    #[tokio::test]
    async fn postgres() {
        init_logs();
        let Some(url) = test_url() else {
            return;
        };
        let _guard = MUTEX.lock().unwrap();
        let error_msg = format!("Could not connect to `{url}`");
        let connection = PostgresConnection::connect(&url).await.expect(&error_msg);
        let mut registry = DriverRegistry::new();
        register(&mut registry);
        execute_tests(connection, &registry).await;
    }

    #[tokio::test]
    async fn parameters() {
        init_logs();
        let Some(url) = test_url() else {
            return;
        };
        let _guard = MUTEX.lock().unwrap();
        let connection = PostgresConnection::connect(&url)
            .await
            .expect("Could not connect");
        assert_eq!(connection.backend(), "postgres");
        let rows = connection
            .fetch(Query::new(
                "SELECT $1::BIGINT + 1 AS next, $2::TEXT AS label, $3::BOOLEAN AS flag;",
                vec![
                    Value::Int32(Some(41)),
                    Value::Uuid(Some(uuid::Uuid::nil())),
                    Value::Int64(Some(1)),
                ],
            ))
            .try_collect::<Vec<_>>()
            .await
            .expect("Could not run the query");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].names(), ["next", "label", "flag"]);
        assert_eq!(
            rows[0].values(),
            [
                Value::Int64(Some(42)),
                Value::from("00000000-0000-0000-0000-000000000000"),
                Value::Boolean(Some(true)),
            ]
        );
    }

    #[tokio::test]
    async fn wrong_url() {
        silent_logs! {
            assert!(
                PostgresConnection::connect("mysql://some_url")
                    .await
                    .is_err()
            );
        }
    }
}
