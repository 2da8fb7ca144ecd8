use tabula_core::SqlWriter;

/// PostgreSQL dialect, generated keys come back through `RETURNING`.
#[derive(Default, Debug, Clone, Copy)]
pub struct PostgresSqlWriter;

impl SqlWriter for PostgresSqlWriter {
    fn supports_returning(&self) -> bool {
        true
    }
}
