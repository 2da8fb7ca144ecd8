use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Primary,
    #[default]
    Secondary,
}

/// Index declared on a table. Metadata only, never created or used by the drivers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub kind: IndexKind,
    /// Position in the index to column name.
    pub columns: BTreeMap<u32, String>,
    /// Position in the index to ascending order flag.
    pub ascending: BTreeMap<u32, bool>,
}

impl Index {
    pub fn new(name: impl Into<String>, kind: IndexKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Default::default()
        }
    }

    /// Append a column after the ones already present.
    pub fn with_column(mut self, column: impl Into<String>, ascending: bool) -> Self {
        let position = self
            .columns
            .keys()
            .next_back()
            .map(|v| v + 1)
            .unwrap_or_default();
        self.columns.insert(position, column.into());
        self.ascending.insert(position, ascending);
        self
    }

    /// Column names in index order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.values().map(String::as_str)
    }
}
