use crate::{
    Column, CrudDriver, CrudError, DataState, DriverRegistry, Entity, EntityKind, Executor,
    FieldValidator, FieldValidatorsRunner, Index, RESULT_AUTO_INCREMENT, RESULT_ROWS_AFFECTED,
    Record, RecordValidator, Result, Rows, Value, global_registry, rows_affected,
};
use std::{
    fmt::{self, Debug},
    sync::{Arc, PoisonError},
};

/// Table metadata bound to a connection and to the driver resolved for it.
///
/// Columns are added during setup, before the first operation. Write operations validate the
/// record first and only reach the storage when validation succeeds. Every operation takes an
/// optional transaction, `None` runs on the bound connection.
pub struct Table {
    name: String,
    all_columns: Vec<Arc<Column>>,
    columns: Vec<Arc<Column>>,
    primary_keys: Vec<Arc<Column>>,
    indexes: Vec<Index>,
    validator: Option<Arc<dyn RecordValidator>>,
    connection: Option<Arc<dyn Executor>>,
    driver: Option<Box<dyn CrudDriver>>,
    registry: Option<DriverRegistry>,
}

impl Table {
    /// Table bound to `connection`, the driver comes from the global registry.
    pub fn new(name: impl Into<String>, connection: Option<Arc<dyn Executor>>) -> Result<Self> {
        let mut table = Self::detached(name, None);
        table.set_connection(connection)?;
        Ok(table)
    }

    /// Table bound to `connection`, the driver comes from `registry`.
    pub fn with_registry(
        registry: &DriverRegistry,
        name: impl Into<String>,
        connection: Option<Arc<dyn Executor>>,
    ) -> Result<Self> {
        let mut table = Self::detached(name, Some(registry.clone()));
        table.set_connection(connection)?;
        Ok(table)
    }

    fn detached(name: impl Into<String>, registry: Option<DriverRegistry>) -> Self {
        Self {
            name: name.into(),
            all_columns: Vec::new(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
            indexes: Vec::new(),
            validator: None,
            connection: None,
            driver: None,
            registry,
        }
    }

    /// Bind another connection and resolve its driver. `None` detaches the table.
    ///
    /// On failure the table keeps the previous binding.
    pub fn set_connection(&mut self, connection: Option<Arc<dyn Executor>>) -> Result<()> {
        let previous = std::mem::replace(&mut self.connection, connection);
        if self.connection.is_none() {
            self.driver = None;
            return Ok(());
        }
        let driver = match &self.registry {
            Some(registry) => registry.resolve(&*self),
            None => global_registry()
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .resolve(&*self),
        };
        match driver {
            Ok(driver) => {
                self.driver = Some(driver);
                Ok(())
            }
            Err(e) => {
                self.connection = previous;
                Err(e.context(format!(
                    "Could not resolve the driver of table `{}`",
                    self.name
                )))
            }
        }
    }

    pub fn push_column(&mut self, column: Column) -> &mut Self {
        let column = Arc::new(column);
        if column.primary_key {
            self.primary_keys.push(column.clone());
        } else {
            self.columns.push(column.clone());
        }
        self.all_columns.push(column);
        self
    }
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        validators: Vec<Box<dyn FieldValidator>>,
    ) -> &mut Self {
        self.push_column(Column::new(name, validators))
    }
    pub fn add_column_auto_increment(
        &mut self,
        name: impl Into<String>,
        validators: Vec<Box<dyn FieldValidator>>,
    ) -> &mut Self {
        self.push_column(Column::new_auto_increment(name, validators))
    }
    pub fn add_column_primary_key(
        &mut self,
        name: impl Into<String>,
        validators: Vec<Box<dyn FieldValidator>>,
    ) -> &mut Self {
        self.push_column(Column::new_primary_key(name, validators))
    }
    pub fn add_column_auto_increment_primary_key(
        &mut self,
        name: impl Into<String>,
        validators: Vec<Box<dyn FieldValidator>>,
    ) -> &mut Self {
        self.push_column(Column::new_auto_increment_primary_key(name, validators))
    }
    pub fn add_index(&mut self, index: Index) -> &mut Self {
        self.indexes.push(index);
        self
    }
    /// Record level rule run after the field validators.
    pub fn set_record_validator(&mut self, validator: Arc<dyn RecordValidator>) -> &mut Self {
        self.validator = Some(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn all_columns(&self) -> &[Arc<Column>] {
        &self.all_columns
    }
    /// Columns not part of the primary key.
    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }
    pub fn primary_keys(&self) -> &[Arc<Column>] {
        &self.primary_keys
    }
    pub fn column(&self, name: &str) -> Option<&Arc<Column>> {
        self.all_columns.iter().find(|c| c.name == name)
    }
    /// First auto-increment column, the one receiving the generated id after an insert.
    pub fn auto_increment_column(&self) -> Option<&Arc<Column>> {
        self.all_columns.iter().find(|c| c.auto_increment)
    }
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }
    pub fn driver(&self) -> Result<&dyn CrudDriver> {
        self.driver
            .as_deref()
            .ok_or_else(|| CrudError::Disconnected(self.name.clone()).into())
    }

    /// Complete an update payload with the stored values of the missing non-key columns.
    ///
    /// Returns the values fetched, empty when nothing was missing.
    pub async fn merge_with_storage(
        &self,
        tx: Option<&dyn Executor>,
        record: &mut Record,
    ) -> Result<Record> {
        let mut keys = Vec::with_capacity(self.primary_keys.len());
        for column in &self.primary_keys {
            let Some(value) = record.get(&column.name) else {
                return Err(CrudError::MissingKey(column.name.clone()).into());
            };
            keys.push(value.clone());
        }
        let missing: Vec<&str> = self
            .columns
            .iter()
            .map(|c| c.name())
            .filter(|name| !record.contains_key(*name))
            .collect();
        if missing.is_empty() {
            return Ok(Record::new());
        }
        let Some(mut stored) = self
            .driver()?
            .select_by_key(self, tx, Some(missing.as_slice()), &keys)
            .await?
        else {
            return Err(CrudError::NotFound.into());
        };
        self.validate_loaded(&mut stored);
        for (name, value) in &stored {
            record.insert(name.clone(), value.clone());
        }
        Ok(stored)
    }

    /// Validate `record` for `state`: merge with storage for updates, then the field
    /// validators, then the record validator.
    pub async fn run_validators(
        &self,
        tx: Option<&dyn Executor>,
        record: &mut Record,
        state: DataState,
    ) -> Result<()> {
        self.validate(tx, record, state).await.map(|_| ())
    }

    async fn validate(
        &self,
        tx: Option<&dyn Executor>,
        record: &mut Record,
        state: DataState,
    ) -> Result<Record> {
        let stored = if state == DataState::Update {
            self.merge_with_storage(tx, record).await?
        } else {
            Record::new()
        };
        self.run_columns(record, state, &stored)?;
        if let Some(validator) = &self.validator {
            validator.validate(record, state)?;
        }
        Ok(stored)
    }

    /// Column pass, the fields in `stored` came from storage during an update merge.
    fn run_columns(&self, record: &mut Record, state: DataState, stored: &Record) -> Result<()> {
        for column in &self.all_columns {
            if state == DataState::Loaded && !record.contains_key(&column.name) {
                continue;
            }
            if stored.contains_key(&column.name) {
                column.run_stored_validators(record, state)?;
            } else {
                column.run_validators(record, state)?;
            }
        }
        Ok(())
    }

    fn validate_loaded(&self, record: &mut Record) {
        if let Err(e) = self.run_field_validators(record, DataState::Loaded) {
            log::debug!(
                "Ignoring validation failure of a row loaded from `{}`: {:#}",
                self.name,
                e
            );
        }
    }

    /// Validate and insert, the record receives the side channel keys and the generated id.
    pub async fn insert(&self, tx: Option<&dyn Executor>, record: &mut Record) -> Result<()> {
        let driver = self.driver()?;
        self.validate(tx, record, DataState::Insert).await?;
        driver.insert(self, tx, record).await
    }

    /// Validate and update the row identified by the primary key of `record`.
    ///
    /// Absent columns are taken from storage, `record` ends up holding the full row. The
    /// statement only sets the columns given by the caller or changed by a validator.
    pub async fn update(&self, tx: Option<&dyn Executor>, record: &mut Record) -> Result<()> {
        let driver = self.driver()?;
        let stored = self.validate(tx, record, DataState::Update).await?;
        let mut payload: Record = record
            .iter()
            .filter(|(name, value)| stored.get(*name) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        if !self.columns.iter().any(|c| payload.contains_key(&c.name)) {
            // Nothing changed, write the row as it is
            payload = record.clone();
        }
        driver.update(self, tx, &mut payload).await?;
        copy_side_channel(&payload, record);
        Ok(())
    }

    /// Row with the given primary key values (in key column order), `None` when missing.
    pub async fn select_by_key(
        &self,
        tx: Option<&dyn Executor>,
        columns: Option<&[&str]>,
        keys: &[Value],
    ) -> Result<Option<Record>> {
        let mut record = self
            .driver()?
            .select_by_key(self, tx, columns, keys)
            .await?;
        if let Some(record) = record.as_mut() {
            self.validate_loaded(record);
        }
        Ok(record)
    }

    /// First row matching `filter`, a trusted SQL condition using the backend placeholders.
    pub async fn select_one(
        &self,
        tx: Option<&dyn Executor>,
        columns: Option<&[&str]>,
        filter: &str,
        params: &[Value],
    ) -> Result<Option<Record>> {
        let mut record = self
            .driver()?
            .select_one(self, tx, columns, filter, params)
            .await?;
        if let Some(record) = record.as_mut() {
            self.validate_loaded(record);
        }
        Ok(record)
    }

    /// Rows matching `filter`, a trusted SQL condition using the backend placeholders.
    pub async fn select<'a>(
        &'a self,
        tx: Option<&'a dyn Executor>,
        columns: Option<&'a [&'a str]>,
        filter: &'a str,
        params: &'a [Value],
    ) -> Result<Rows<'a>> {
        let mut rows = self
            .driver()?
            .select(self, tx, columns, filter, params)
            .await?;
        rows.set_field_validators(self);
        Ok(rows)
    }

    /// Delete the row identified by the primary key of `record`, [`CrudError::NotFound`] when
    /// no row matched.
    pub async fn delete(&self, tx: Option<&dyn Executor>, record: &mut Record) -> Result<()> {
        self.driver()?.delete(self, tx, record).await?;
        if rows_affected(record) == Some(0) {
            return Err(CrudError::NotFound.into());
        }
        Ok(())
    }
}

fn copy_side_channel(from: &Record, to: &mut Record) {
    for key in [RESULT_ROWS_AFFECTED, RESULT_AUTO_INCREMENT] {
        if let Some(value) = from.get(key) {
            to.insert(key.to_owned(), value.clone());
        }
    }
}

impl Entity for Table {
    fn kind(&self) -> EntityKind {
        EntityKind::Table
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn connection(&self) -> Option<&Arc<dyn Executor>> {
        self.connection.as_ref()
    }
    fn as_table(&self) -> Option<&Table> {
        Some(self)
    }
}

impl FieldValidatorsRunner for Table {
    /// Run the validators of every column, in column order. Loaded records skip the columns
    /// they don't carry.
    fn run_field_validators(&self, record: &mut Record, state: DataState) -> Result<()> {
        self.run_columns(record, state, &Record::new())
    }
}

impl Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.all_columns)
            .field("indexes", &self.indexes)
            .field("connected", &self.connection.is_some())
            .field(
                "backend",
                &self.driver.as_ref().map(|driver| driver.backend()),
            )
            .finish()
    }
}
