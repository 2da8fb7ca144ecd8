use crate::{
    DataState, Error, FieldValidatorsRunner, Record, Result, RowLabeled,
    stream::{BoxStream, StreamExt},
};
use std::sync::Arc;

/// Cursor over the rows of a query.
///
/// Advance with [`Rows::next`], read the current row with [`Rows::tuple`]. Rows are keyed by
/// the requested column names and, when a runner is attached, go through the field validators
/// in [`DataState::Loaded`] state with failures ignored. Dropping the cursor closes it.
pub struct Rows<'a> {
    stream: Option<BoxStream<'a, Result<RowLabeled>>>,
    columns: Arc<[String]>,
    current: Option<Result<RowLabeled>>,
    validators: Option<&'a dyn FieldValidatorsRunner>,
}

impl<'a> Rows<'a> {
    pub fn new(stream: BoxStream<'a, Result<RowLabeled>>, columns: Arc<[String]>) -> Self {
        Self {
            stream: Some(stream),
            columns,
            current: None,
            validators: None,
        }
    }

    pub fn set_field_validators(&mut self, validators: &'a dyn FieldValidatorsRunner) {
        self.validators = Some(validators);
    }

    /// Advance to the next row, `false` once exhausted or closed.
    ///
    /// A backend error still yields `true`, it is returned by the following [`Rows::tuple`].
    pub async fn next(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        match stream.next().await {
            Some(row) => {
                self.current = Some(row);
                true
            }
            None => {
                self.close();
                false
            }
        }
    }

    /// The current row, keyed by column name.
    pub fn tuple(&mut self) -> Result<Record> {
        let row = match self.current.take() {
            Some(Ok(row)) => row,
            Some(Err(e)) => return Err(e),
            None => {
                return Err(Error::msg(
                    "Rows::tuple called without a row, call Rows::next first",
                ));
            }
        };
        let mut record: Record = self
            .columns
            .iter()
            .cloned()
            .zip(row.values.iter().cloned())
            .collect();
        self.current = Some(Ok(row));
        if let Some(validators) = self.validators {
            if let Err(e) = validators.run_field_validators(&mut record, DataState::Loaded) {
                log::debug!("Ignoring validation failure of a loaded row: {:#}", e);
            }
        }
        Ok(record)
    }

    /// Release the underlying statement, further calls to [`Rows::next`] return `false`.
    pub fn close(&mut self) {
        self.stream = None;
        self.current = None;
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Read all the remaining rows and close.
    pub async fn collect_records(mut self) -> Result<Vec<Record>> {
        let mut result = Vec::new();
        while self.next().await {
            result.push(self.tuple()?);
        }
        Ok(result)
    }
}
