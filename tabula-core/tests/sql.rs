#[cfg(test)]
mod tests {
    use indoc::indoc;
    use tabula_core::{GenericSqlWriter, SqlWriter, writer::Context};

    const WRITER: GenericSqlWriter = GenericSqlWriter;

    #[test]
    fn insert() {
        let mut out = String::new();
        WRITER.write_insert(&mut out, "user", &["id", "name", "email"], None);
        assert_eq!(
            out,
            indoc! {r#"
                INSERT INTO "user" ("id", "name", "email") VALUES
                ($1, $2, $3);
            "#}
            .trim()
        );
    }

    #[test]
    fn insert_default_values() {
        let mut out = String::new();
        WRITER.write_insert(&mut out, "log", &[], None);
        assert_eq!(out, r#"INSERT INTO "log" DEFAULT VALUES;"#);
        let mut out = String::new();
        WRITER.write_insert(&mut out, "log", &[], Some("id"));
        assert_eq!(
            out,
            indoc! {r#"
                INSERT INTO "log" DEFAULT VALUES
                RETURNING "id";
            "#}
            .trim()
        );
    }

    #[test]
    fn update_shares_placeholder_counter() {
        let mut out = String::new();
        WRITER.write_update(&mut out, "order", &["status", "total"], &["shop", "id"]);
        assert_eq!(
            out,
            indoc! {r#"
                UPDATE "order"
                SET "status" = $1, "total" = $2
                WHERE "shop" = $3 AND "id" = $4;
            "#}
            .trim()
        );
    }

    #[test]
    fn select() {
        let mut out = String::new();
        WRITER.write_select_by_key(&mut out, "user", &["name", "email"], &["id"]);
        assert_eq!(
            out,
            indoc! {r#"
                SELECT "name", "email"
                FROM "user"
                WHERE "id" = $1;
            "#}
            .trim()
        );
        let mut out = String::new();
        WRITER.write_select(&mut out, "user", &["id"], "age > $1 ORDER BY id;");
        assert_eq!(
            out,
            indoc! {r#"
                SELECT "id"
                FROM "user"
                WHERE age > $1 ORDER BY id;
            "#}
            .trim()
        );
        let mut out = String::new();
        WRITER.write_select(&mut out, "user", &["id", "name"], "  ");
        assert_eq!(
            out,
            indoc! {r#"
                SELECT "id", "name"
                FROM "user"
                WHERE 1=1;
            "#}
            .trim()
        );
    }

    #[test]
    fn delete() {
        let mut out = String::new();
        WRITER.write_delete(&mut out, "user", &["id"]);
        assert_eq!(
            out,
            indoc! {r#"
                DELETE FROM "user"
                WHERE "id" = $1;
            "#}
            .trim()
        );
    }

    #[test]
    fn quoting_doubles_quotes() {
        let mut out = String::new();
        WRITER.write_identifier_quoted(&mut Context::default(), &mut out, r#"we"ird"#);
        assert_eq!(out, r#""we""ird""#);
        let mut out = String::new();
        WRITER.write_delete(&mut out, r#"a"b"#, &[r#""k""#]);
        assert_eq!(
            out,
            indoc! {r#"
                DELETE FROM "a""b"
                WHERE """k""" = $1;
            "#}
            .trim()
        );
        let mut out = String::new();
        WRITER.write_identifier_quoted(&mut Context::default(), &mut out, "ünï\"cödé");
        assert_eq!(out, "\"ünï\"\"cödé\"");
    }

    #[test]
    fn placeholders() {
        let mut context = Context::new();
        let mut out = String::new();
        for _ in 0..11 {
            WRITER.write_placeholder(&mut context, &mut out);
            out.push(' ');
        }
        assert_eq!(out, "$1 $2 $3 $4 $5 $6 $7 $8 $9 $10 $11 ");
        assert_eq!(context.counter, 11);
    }

    #[test]
    fn transaction() {
        let mut out = String::new();
        WRITER.write_transaction_begin(&mut out);
        assert_eq!(out, "BEGIN;");
        let mut out = String::new();
        WRITER.write_transaction_commit(&mut out);
        assert_eq!(out, "COMMIT;");
        let mut out = String::new();
        WRITER.write_transaction_rollback(&mut out);
        assert_eq!(out, "ROLLBACK;");
    }
}
