use crate::{separated_by, writer::Context};

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}

/// Dialect printer producing the statements of the SQL driver.
///
/// Values never appear in the text, every one of them is a placeholder numbered through
/// [`Context::counter`]. Identifiers are always quoted.
pub trait SqlWriter: Send + Sync {
    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    /// Next positional parameter, `$1`, `$2`, ...
    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        context.counter += 1;
        out.push('$');
        write_integer!(out, context.counter);
    }

    fn write_column_list(&self, context: &mut Context, out: &mut String, columns: &[&str]) {
        separated_by(
            out,
            columns,
            |out, v| self.write_identifier_quoted(context, out, v),
            ", ",
        );
    }

    /// Equality on every column, `"a" = $1 AND "b" = $2`.
    fn write_key_condition(&self, context: &mut Context, out: &mut String, columns: &[&str]) {
        separated_by(
            out,
            columns,
            |out, v| {
                self.write_identifier_quoted(context, out, v);
                out.push_str(" = ");
                self.write_placeholder(context, out);
            },
            " AND ",
        );
    }

    /// Caller provided condition, copied verbatim. Empty selects everything.
    fn write_filter(&self, _context: &mut Context, out: &mut String, filter: &str) {
        let filter = filter.trim().trim_end_matches(';').trim_end();
        if filter.is_empty() {
            out.push_str("1=1");
        } else {
            out.push_str(filter);
        }
    }

    /// Whether INSERT can report the generated key with `RETURNING`.
    fn supports_returning(&self) -> bool {
        false
    }

    fn write_returning(&self, context: &mut Context, out: &mut String, column: &str) {
        out.push_str("\nRETURNING ");
        self.write_identifier_quoted(context, out, column);
    }

    /// Emit BEGIN statement.
    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN;");
    }

    /// Emit COMMIT statement.
    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT;");
    }

    /// Emit ROLLBACK statement.
    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK;");
    }

    /// Emit INSERT of a single row, `DEFAULT VALUES` when there are no columns.
    fn write_insert(
        &self,
        out: &mut String,
        table: &str,
        columns: &[&str],
        returning: Option<&str>,
    ) {
        out.reserve(64 + table.len() + columns.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("INSERT INTO ");
        let mut context = Context::new();
        self.write_identifier_quoted(&mut context, out, table);
        if columns.is_empty() {
            out.push_str(" DEFAULT VALUES");
        } else {
            out.push_str(" (");
            self.write_column_list(&mut context, out, columns);
            out.push_str(") VALUES\n(");
            separated_by(
                out,
                columns,
                |out, _| self.write_placeholder(&mut context, out),
                ", ",
            );
            out.push(')');
        }
        if let Some(returning) = returning {
            self.write_returning(&mut context, out, returning);
        }
        out.push(';');
    }

    /// Emit UPDATE of the row matching the key columns.
    fn write_update(&self, out: &mut String, table: &str, columns: &[&str], keys: &[&str]) {
        out.reserve(64 + table.len() + (columns.len() + keys.len()) * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("UPDATE ");
        let mut context = Context::new();
        self.write_identifier_quoted(&mut context, out, table);
        out.push_str("\nSET ");
        separated_by(
            out,
            columns,
            |out, v| {
                self.write_identifier_quoted(&mut context, out, v);
                out.push_str(" = ");
                self.write_placeholder(&mut context, out);
            },
            ", ",
        );
        out.push_str("\nWHERE ");
        self.write_key_condition(&mut context, out, keys);
        out.push(';');
    }

    /// Emit SELECT of the row matching the key columns.
    fn write_select_by_key(&self, out: &mut String, table: &str, columns: &[&str], keys: &[&str]) {
        let mut context = self.write_select_head(out, table, columns);
        self.write_key_condition(&mut context, out, keys);
        out.push(';');
    }

    /// Emit SELECT with a caller provided condition.
    fn write_select(&self, out: &mut String, table: &str, columns: &[&str], filter: &str) {
        let mut context = self.write_select_head(out, table, columns);
        self.write_filter(&mut context, out, filter);
        out.push(';');
    }

    /// `SELECT .. FROM .. WHERE `, the condition is left to the caller.
    fn write_select_head(&self, out: &mut String, table: &str, columns: &[&str]) -> Context {
        out.reserve(64 + table.len() + columns.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("SELECT ");
        let mut context = Context::new();
        if columns.is_empty() {
            out.push('*');
        } else {
            self.write_column_list(&mut context, out, columns);
        }
        out.push_str("\nFROM ");
        self.write_identifier_quoted(&mut context, out, table);
        out.push_str("\nWHERE ");
        context
    }

    /// Emit DELETE of the row matching the key columns.
    fn write_delete(&self, out: &mut String, table: &str, keys: &[&str]) {
        out.reserve(64 + table.len() + keys.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("DELETE FROM ");
        let mut context = Context::new();
        self.write_identifier_quoted(&mut context, out, table);
        out.push_str("\nWHERE ");
        self.write_key_condition(&mut context, out, keys);
        out.push(';');
    }
}

/// Fallback generic SQL writer (closest to PostgreSQL conventions).
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    /// Construct a new generic writer.
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {}
