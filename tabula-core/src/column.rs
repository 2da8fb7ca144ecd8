use crate::{DataState, FieldValidator, Record, Result};
use std::fmt::{self, Debug};

/// Column of a table: name, key flags and the validators run on its field.
pub struct Column {
    /// Column name.
    pub name: String,
    /// Storage type, informational only (may be empty).
    pub column_type: String,
    pub primary_key: bool,
    /// Value generated by the database when not supplied.
    pub auto_increment: bool,
    /// Run in order on every record passing through the table.
    pub validators: Vec<Box<dyn FieldValidator>>,
}

impl Column {
    pub fn new(name: impl Into<String>, validators: Vec<Box<dyn FieldValidator>>) -> Self {
        Self {
            name: name.into(),
            column_type: String::new(),
            primary_key: false,
            auto_increment: false,
            validators,
        }
    }
    pub fn new_auto_increment(
        name: impl Into<String>,
        validators: Vec<Box<dyn FieldValidator>>,
    ) -> Self {
        Self {
            auto_increment: true,
            ..Self::new(name, validators)
        }
    }
    pub fn new_primary_key(name: impl Into<String>, validators: Vec<Box<dyn FieldValidator>>) -> Self {
        Self {
            primary_key: true,
            ..Self::new(name, validators)
        }
    }
    pub fn new_auto_increment_primary_key(
        name: impl Into<String>,
        validators: Vec<Box<dyn FieldValidator>>,
    ) -> Self {
        Self {
            primary_key: true,
            auto_increment: true,
            ..Self::new(name, validators)
        }
    }
    pub fn with_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Run the validators of this column on its field of `record`, stopping at the first failure.
    pub fn run_validators(&self, record: &mut Record, state: DataState) -> Result<()> {
        for validator in &self.validators {
            validator.validate_field(record, &self.name, state)?;
        }
        Ok(())
    }
    /// Same as [`Column::run_validators`] for a value merged from storage, validators that
    /// [keep stored values](FieldValidator::keeps_stored) are skipped.
    pub fn run_stored_validators(&self, record: &mut Record, state: DataState) -> Result<()> {
        for validator in self.validators.iter().filter(|v| !v.keeps_stored()) {
            validator.validate_field(record, &self.name, state)?;
        }
        Ok(())
    }
}

impl Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("name", &self.name)
            .field("column_type", &self.column_type)
            .field("primary_key", &self.primary_key)
            .field("auto_increment", &self.auto_increment)
            .field("validators", &self.validators.len())
            .finish()
    }
}
