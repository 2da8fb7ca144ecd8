use tabula_core::{SqlWriter, writer::Context};

/// SQLite dialect: numbered `?NNN` parameters.
#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteSqlWriter;

impl SqlWriter for SqliteSqlWriter {
    fn write_placeholder(&self, context: &mut Context, out: &mut String) {
        context.counter += 1;
        out.push('?');
        out.push_str(itoa::Buffer::new().format(context.counter));
    }
}
