use crate::ValueHolder;
use tabula_core::{Error, Result, Row, RowNames};

pub(crate) fn labels(row: &tokio_postgres::Row) -> RowNames {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

pub(crate) fn row_to_tabula_row(row: tokio_postgres::Row) -> Result<Row> {
    (0..row.len())
        .map(|i| match row.try_get::<_, ValueHolder>(i) {
            Ok(v) => Ok(v.0),
            Err(e) => {
                let col = &row.columns()[i];
                Err(Error::new(e).context(format!(
                    "Could not deserialize column {} `{}`: {}",
                    i,
                    col.name(),
                    col.type_()
                )))
            }
        })
        .collect()
}

/// Postgres extended queries accept a single statement without the final semicolon.
pub(crate) fn statement(sql: &str) -> &str {
    sql.trim_end().trim_end_matches(';').trim_end()
}
