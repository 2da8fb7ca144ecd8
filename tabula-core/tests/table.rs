#[cfg(test)]
mod tests {
    use indoc::indoc;
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };
    use tabula_core::{
        CrudDriver, CrudError, DataState, DriverRegistry, Entity, EntityKind, Error, Executor,
        GenericSqlWriter, Index, IndexKind, Int64Validator, Query, QueryResult,
        RESULT_AUTO_INCREMENT, RESULT_ROWS_AFFECTED, Record, RecordValidator, Result, RowLabeled,
        RowsAffected, SqlDriver, StringValidator, Table, Value, record,
        stream::{self, BoxStream, StreamExt},
        validators,
    };

    /// Executor keeping the queries it receives and answering with scripted results.
    #[derive(Default)]
    struct Recorder {
        queries: Mutex<Vec<Query>>,
        responses: Mutex<VecDeque<Vec<Result<QueryResult>>>>,
    }

    impl Recorder {
        fn respond(&self, results: Vec<QueryResult>) {
            self.responses
                .lock()
                .unwrap()
                .push_back(results.into_iter().map(Ok).collect());
        }
        fn respond_with(&self, results: Vec<Result<QueryResult>>) {
            self.responses.lock().unwrap().push_back(results);
        }
        fn queries(&self) -> Vec<Query> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl Executor for Recorder {
        fn backend(&self) -> &'static str {
            "recorder"
        }
        fn run<'s>(&'s self, query: Query) -> BoxStream<'s, Result<QueryResult>> {
            self.queries.lock().unwrap().push(query);
            let results = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default();
            stream::iter(results).boxed()
        }
    }

    fn affected(rows_affected: u64, last_affected_id: Option<i64>) -> QueryResult {
        QueryResult::Affected(RowsAffected {
            rows_affected,
            last_affected_id,
        })
    }

    fn row(labels: &[&str], values: Vec<Value>) -> QueryResult {
        QueryResult::Row(RowLabeled::new(
            labels.iter().map(|v| v.to_string()).collect(),
            values.into_boxed_slice(),
        ))
    }

    fn registry() -> DriverRegistry {
        let mut registry = DriverRegistry::new();
        registry.register("recorder", |entity| {
            Ok(Box::new(SqlDriver::new(entity, GenericSqlWriter)?) as Box<dyn CrudDriver>)
        });
        registry
    }

    fn users(recorder: &Arc<Recorder>) -> Table {
        let executor: Arc<dyn Executor> = recorder.clone();
        let mut table = Table::with_registry(&registry(), "users", Some(executor)).unwrap();
        table
            .add_column_auto_increment_primary_key("id", validators![Int64Validator::default()])
            .add_column(
                "name",
                validators![StringValidator {
                    not_null: true,
                    max_len: 20,
                    ..Default::default()
                }],
            )
            .add_column(
                "age",
                validators![Int64Validator {
                    min: 1,
                    max: 150,
                    ..Default::default()
                }],
            );
        table
    }

    fn items(recorder: &Arc<Recorder>) -> Table {
        let executor: Arc<dyn Executor> = recorder.clone();
        let mut table = Table::with_registry(&registry(), "items", Some(executor)).unwrap();
        table
            .add_column_primary_key("k", validators![Int64Validator::default()])
            .add_column("a", validators![StringValidator::default()])
            .add_column("b", validators![StringValidator::default()]);
        table
    }

    fn crud_error(error: Error) -> CrudError {
        error
            .downcast_ref::<CrudError>()
            .cloned()
            .expect("Should be a CrudError")
    }

    #[test]
    fn columns_are_classified() {
        let recorder = Arc::new(Recorder::default());
        let mut table = users(&recorder);
        table.add_index(
            Index::new("users_name", IndexKind::Secondary)
                .with_column("name", true)
                .with_column("age", false),
        );
        assert_eq!(table.kind(), EntityKind::Table);
        assert_eq!(table.all_columns().len(), 3);
        assert_eq!(
            table.primary_keys().iter().map(|c| c.name()).collect::<Vec<_>>(),
            ["id"]
        );
        assert_eq!(
            table.columns().iter().map(|c| c.name()).collect::<Vec<_>>(),
            ["name", "age"]
        );
        assert_eq!(table.auto_increment_column().map(|c| c.name()), Some("id"));
        assert_eq!(
            table.indexes()[0].column_names().collect::<Vec<_>>(),
            ["name", "age"]
        );
        assert_eq!(table.indexes()[0].ascending.get(&1), Some(&false));
        assert_eq!(table.driver().unwrap().backend(), "recorder");
    }

    #[tokio::test]
    async fn insert() {
        let recorder = Arc::new(Recorder::default());
        let table = users(&recorder);
        recorder.respond(vec![affected(1, Some(7))]);
        let mut record = record! { "name" => "  Ada ", "age" => 36 };
        table.insert(None, &mut record).await.unwrap();
        let queries = recorder.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0].sql,
            indoc! {r#"
                INSERT INTO "users" ("name", "age") VALUES
                ($1, $2);
            "#}
            .trim()
        );
        assert_eq!(
            queries[0].params,
            [Value::Varchar(Some("Ada".into())), Value::Int64(Some(36))]
        );
        assert_eq!(record["id"], Value::Int64(Some(7)));
        assert_eq!(record[RESULT_AUTO_INCREMENT], Value::Int64(Some(7)));
        assert_eq!(record[RESULT_ROWS_AFFECTED], Value::Int64(Some(1)));
    }

    #[tokio::test]
    async fn insert_rejected_before_storage() {
        let recorder = Arc::new(Recorder::default());
        let table = users(&recorder);
        let mut record = record! { "name" => "Ada", "age" => 0 };
        let error = table.insert(None, &mut record).await.unwrap_err();
        assert!(matches!(crud_error(error), CrudError::Constraint { ref field, .. } if field == "age"));
        let mut record = record! { "age" => 3 };
        let error = table.insert(None, &mut record).await.unwrap_err();
        assert_eq!(crud_error(error), CrudError::NotNull("name".into()));
        assert!(recorder.queries().is_empty());
    }

    #[tokio::test]
    async fn insert_backend_failure() {
        let recorder = Arc::new(Recorder::default());
        let table = users(&recorder);
        recorder.respond_with(vec![Err(Error::msg("disk full"))]);
        let mut record = record! { "name" => "Ada" };
        let error = table.insert(None, &mut record).await.unwrap_err();
        assert_eq!(
            format!("{:#}", error),
            r#"While running insert on table "users": disk full"#
        );
        assert!(!record.contains_key(RESULT_ROWS_AFFECTED));
    }

    #[tokio::test]
    async fn partial_update_merges_with_storage() {
        let recorder = Arc::new(Recorder::default());
        let table = items(&recorder);
        recorder.respond(vec![row(&["a"], vec!["stored a".into()])]);
        recorder.respond(vec![affected(1, None)]);
        let mut record = record! { "k" => 1i64, "b" => " new b " };
        table.update(None, &mut record).await.unwrap();
        let queries = recorder.queries();
        assert_eq!(queries.len(), 2);
        assert_eq!(
            queries[0].sql,
            indoc! {r#"
                SELECT "a"
                FROM "items"
                WHERE "k" = $1;
            "#}
            .trim()
        );
        assert_eq!(queries[0].params, [Value::Int64(Some(1))]);
        assert_eq!(
            queries[1].sql,
            indoc! {r#"
                UPDATE "items"
                SET "b" = $1
                WHERE "k" = $2;
            "#}
            .trim()
        );
        assert_eq!(
            queries[1].params,
            [Value::Varchar(Some("new b".into())), Value::Int64(Some(1))]
        );
        assert_eq!(
            record,
            record! {
                "k" => 1i64,
                "a" => "stored a",
                "b" => "new b",
                RESULT_ROWS_AFFECTED => 1i64,
            }
        );
    }

    #[tokio::test]
    async fn merged_password_is_not_hashed_again() {
        let recorder = Arc::new(Recorder::default());
        let executor: Arc<dyn Executor> = recorder.clone();
        let mut table = Table::with_registry(&registry(), "logins", Some(executor)).unwrap();
        table
            .add_column_primary_key("k", validators![Int64Validator::default()])
            .add_column(
                "password",
                validators![StringValidator {
                    password: true,
                    max_len: 8,
                    password_cost: Some(4),
                    ..Default::default()
                }],
            )
            .add_column("note", validators![StringValidator::default()]);
        let hash = "$2b$04$EGdrhbKUv8Oc9vGiXX0HQOxSg445d458Muh7DAHskb6QbtCvdxcie";
        recorder.respond(vec![row(&["password"], vec![hash.into()])]);
        recorder.respond(vec![affected(1, None)]);
        let mut record = record! { "k" => 3i64, "note" => "hi" };
        table.update(None, &mut record).await.unwrap();
        let queries = recorder.queries();
        assert_eq!(
            queries[1].sql,
            indoc! {r#"
                UPDATE "logins"
                SET "note" = $1
                WHERE "k" = $2;
            "#}
            .trim()
        );
        assert_eq!(record["password"], Value::from(hash));

        // The same hash given by the caller is a new password, too long for it
        let mut record = record! { "k" => 3i64, "password" => hash, "note" => "hi" };
        let error = table.update(None, &mut record).await.unwrap_err();
        assert!(matches!(
            crud_error(error),
            CrudError::Constraint { field, .. } if field == "password"
        ));
        assert_eq!(recorder.queries().len(), 2);
    }

    #[tokio::test]
    async fn update_complete_record_skips_fetch() {
        let recorder = Arc::new(Recorder::default());
        let table = items(&recorder);
        recorder.respond(vec![affected(1, None)]);
        let mut record = record! { "k" => 2i64, "a" => "x", "b" => Value::Null };
        table.update(None, &mut record).await.unwrap();
        let queries = recorder.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(
            queries[0].sql,
            indoc! {r#"
                UPDATE "items"
                SET "a" = $1, "b" = $2
                WHERE "k" = $3;
            "#}
            .trim()
        );
        assert_eq!(
            queries[0].params,
            [Value::from("x"), Value::Null, Value::Int64(Some(2))]
        );
    }

    #[tokio::test]
    async fn update_errors() {
        let recorder = Arc::new(Recorder::default());
        let table = items(&recorder);
        let mut record = record! { "b" => "x" };
        let error = table.update(None, &mut record).await.unwrap_err();
        assert_eq!(crud_error(error), CrudError::MissingKey("k".into()));
        assert!(recorder.queries().is_empty());

        recorder.respond(vec![]);
        let mut record = record! { "k" => 9i64, "b" => "x" };
        let error = table.update(None, &mut record).await.unwrap_err();
        assert_eq!(crud_error(error), CrudError::NotFound);
        assert_eq!(recorder.queries().len(), 1);
    }

    #[tokio::test]
    async fn update_without_primary_key() {
        let recorder = Arc::new(Recorder::default());
        let executor: Arc<dyn Executor> = recorder.clone();
        let mut table = Table::with_registry(&registry(), "logs", Some(executor)).unwrap();
        table.add_column("line", validators![]);
        let mut record = record! { "line" => "x" };
        let error = table.update(None, &mut record).await.unwrap_err();
        assert_eq!(crud_error(error), CrudError::NoPrimaryKey("logs".into()));
        let error = table.select_by_key(None, None, &[]).await.unwrap_err();
        assert_eq!(crud_error(error), CrudError::NoPrimaryKey("logs".into()));
        assert!(recorder.queries().is_empty());
    }

    #[tokio::test]
    async fn delete() {
        let recorder = Arc::new(Recorder::default());
        let table = users(&recorder);
        recorder.respond(vec![affected(1, None)]);
        let mut record = record! { "id" => 3i64, "name" => "ignored" };
        table.delete(None, &mut record).await.unwrap();
        let queries = recorder.queries();
        assert_eq!(
            queries[0].sql,
            indoc! {r#"
                DELETE FROM "users"
                WHERE "id" = $1;
            "#}
            .trim()
        );
        assert_eq!(queries[0].params, [Value::Int64(Some(3))]);
        assert_eq!(record[RESULT_ROWS_AFFECTED], Value::Int64(Some(1)));

        recorder.respond(vec![affected(0, None)]);
        let mut record = record! { "id" => 4i64 };
        let error = table.delete(None, &mut record).await.unwrap_err();
        assert_eq!(crud_error(error), CrudError::NotFound);
        assert_eq!(record[RESULT_ROWS_AFFECTED], Value::Int64(Some(0)));

        let mut record = record! { "name" => "no key" };
        let error = table.delete(None, &mut record).await.unwrap_err();
        assert_eq!(crud_error(error), CrudError::MissingKey("id".into()));
    }

    #[tokio::test]
    async fn select_by_key_and_one() {
        let recorder = Arc::new(Recorder::default());
        let table = users(&recorder);
        recorder.respond(vec![row(
            &["id", "name", "age"],
            vec![5i32.into(), "Bob".into(), 40i32.into()],
        )]);
        let record = table
            .select_by_key(None, None, &[5i64.into()])
            .await
            .unwrap()
            .expect("Should find the row");
        // Loaded rows go through the validators
        assert_eq!(
            record,
            record! { "id" => 5i64, "name" => "Bob", "age" => 40i64 }
        );
        assert_eq!(
            recorder.queries()[0].sql,
            indoc! {r#"
                SELECT "id", "name", "age"
                FROM "users"
                WHERE "id" = $1;
            "#}
            .trim()
        );

        recorder.respond(vec![]);
        let record = table
            .select_one(None, Some(&["name"]), "age > $1", &[30.into()])
            .await
            .unwrap();
        assert_eq!(record, None);
        assert_eq!(
            recorder.queries()[1].sql,
            indoc! {r#"
                SELECT "name"
                FROM "users"
                WHERE age > $1;
            "#}
            .trim()
        );
        assert_eq!(recorder.queries()[1].params, [Value::Int32(Some(30))]);

        let error = table
            .select_by_key(None, None, &[1.into(), 2.into()])
            .await
            .unwrap_err();
        assert_eq!(
            crud_error(error),
            CrudError::KeyCount {
                table: "users".into(),
                expected: 1,
                found: 2,
            }
        );
    }

    #[tokio::test]
    async fn select_rows() {
        let recorder = Arc::new(Recorder::default());
        let table = users(&recorder);
        recorder.respond_with(vec![
            Ok(row(&["id", "name"], vec![1i64.into(), "Ada".into()])),
            // Not a valid name, loaded anyway
            Ok(row(&["id", "name"], vec![2i64.into(), 99i32.into()])),
            Err(Error::msg("connection reset")),
        ]);
        let mut rows = table
            .select(None, Some(&["id", "name"]), "", &[])
            .await
            .unwrap();
        assert_eq!(
            recorder.queries()[0].sql,
            indoc! {r#"
                SELECT "id", "name"
                FROM "users"
                WHERE 1=1;
            "#}
            .trim()
        );
        assert!(rows.next().await);
        assert_eq!(
            rows.tuple().unwrap(),
            record! { "id" => 1i64, "name" => "Ada" }
        );
        assert!(rows.next().await);
        assert_eq!(
            rows.tuple().unwrap(),
            record! { "id" => 2i64, "name" => 99i32 }
        );
        assert!(rows.next().await);
        let error = rows.tuple().unwrap_err();
        assert!(format!("{:#}", error).contains("connection reset"));
        assert!(!rows.next().await);
        assert!(rows.is_closed());
        assert!(rows.tuple().is_err());
        rows.close();
        rows.close();
        assert!(!rows.next().await);
    }

    #[tokio::test]
    async fn select_rows_collect() {
        let recorder = Arc::new(Recorder::default());
        let table = users(&recorder);
        recorder.respond(vec![
            row(&["name"], vec!["a".into()]),
            row(&["name"], vec!["b".into()]),
        ]);
        let rows = table
            .select(None, Some(&["name"]), "age < $1", &[Value::Int64(Some(3))])
            .await
            .unwrap()
            .collect_records()
            .await
            .unwrap();
        assert_eq!(rows, [record! { "name" => "a" }, record! { "name" => "b" }]);
    }

    #[tokio::test]
    async fn transaction_handle_is_used() {
        let recorder = Arc::new(Recorder::default());
        let tx = Recorder::default();
        let handle: &dyn Executor = &tx;
        let table = items(&recorder);
        tx.respond(vec![row(&["a", "b"], vec!["a".into(), "b".into()])]);
        tx.respond(vec![affected(1, None)]);
        tx.respond(vec![affected(1, Some(1))]);
        let mut record = record! { "k" => 1i64 };
        // Nothing changed, the row is written as it is
        table.update(Some(handle), &mut record).await.unwrap();
        let mut record = record! { "k" => 2i64, "a" => "x" };
        table.insert(Some(handle), &mut record).await.unwrap();
        assert!(recorder.queries().is_empty());
        let queries = tx.queries();
        assert_eq!(queries.len(), 3);
        assert!(queries[0].sql.starts_with("SELECT \"a\", \"b\""));
        assert_eq!(
            queries[1].sql,
            indoc! {r#"
                UPDATE "items"
                SET "a" = $1, "b" = $2
                WHERE "k" = $3;
            "#}
            .trim()
        );
        assert!(queries[2].sql.starts_with("INSERT INTO \"items\""));
    }

    #[tokio::test]
    async fn record_validator() {
        struct DistinctFields;
        impl RecordValidator for DistinctFields {
            fn validate(&self, record: &mut Record, state: DataState) -> Result<()> {
                if state == DataState::Insert && record.get("a") == record.get("b") {
                    return Err(Error::msg("a and b must differ"));
                }
                Ok(())
            }
        }
        let recorder = Arc::new(Recorder::default());
        let mut table = items(&recorder);
        table.set_record_validator(Arc::new(DistinctFields));
        let mut record = record! { "k" => 1i64, "a" => "same", "b" => " same" };
        let error = table.insert(None, &mut record).await.unwrap_err();
        assert_eq!(error.to_string(), "a and b must differ");
        assert!(recorder.queries().is_empty());
        table
            .run_validators(None, &mut record! { "a" => "x" }, DataState::Loaded)
            .await
            .unwrap();
    }

    #[test]
    fn registry_resolution() {
        let recorder = Arc::new(Recorder::default());
        let executor: Arc<dyn Executor> = recorder.clone();
        let error = Table::with_registry(&DriverRegistry::new(), "t", Some(executor.clone()))
            .unwrap_err();
        assert_eq!(
            crud_error(error),
            CrudError::NoDriverRegistered("recorder".into())
        );

        let mut table = Table::with_registry(&registry(), "t", None).unwrap();
        assert!(table.connection().is_none());
        assert!(table.driver().is_err());
        table.set_connection(Some(executor)).unwrap();
        assert_eq!(table.driver().unwrap().backend(), "recorder");
        table.set_connection(None).unwrap();
        assert_eq!(
            crud_error(table.driver().err().unwrap()),
            CrudError::Disconnected("t".into())
        );

        let mut registry = registry();
        assert!(registry.contains("recorder"));
        registry.register("recorder", |entity| {
            Ok(Box::new(SqlDriver::new(entity, GenericSqlWriter)?) as Box<dyn CrudDriver>)
        });
        assert!(registry.contains("recorder"));
    }

    #[tokio::test]
    async fn not_a_table() {
        struct Procedure(Option<Arc<dyn Executor>>);
        impl Entity for Procedure {
            fn kind(&self) -> EntityKind {
                EntityKind::Table
            }
            fn name(&self) -> &str {
                "procedure"
            }
            fn connection(&self) -> Option<&Arc<dyn Executor>> {
                self.0.as_ref()
            }
        }
        let recorder = Arc::new(Recorder::default());
        let executor: Arc<dyn Executor> = recorder.clone();
        let entity = Procedure(Some(executor));
        let driver = registry().resolve(&entity).unwrap();
        let error = driver
            .insert(&entity, None, &mut Record::new())
            .await
            .unwrap_err();
        assert!(matches!(
            crud_error(error),
            CrudError::NotImplemented {
                backend: "recorder",
                ..
            }
        ));
        assert!(recorder.queries().is_empty());
    }
}
