mod as_value;
mod column;
mod connection;
mod driver;
mod entity;
mod error;
mod executor;
mod index;
mod query;
mod record;
mod registry;
mod rows;
mod sql_driver;
mod table;
mod transaction;
mod util;
mod validator;
mod value;
pub mod writer;

pub use ::anyhow::Context;
pub use as_value::*;
pub use column::*;
pub use connection::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use executor::*;
pub use index::*;
pub use query::*;
pub use record::*;
pub use registry::*;
pub use rows::*;
pub use sql_driver::*;
pub use table::*;
pub use transaction::*;
pub use util::*;
pub use validator::*;
pub use value::*;
pub use writer::{GenericSqlWriter, SqlWriter};
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;
#[doc(hidden)]
pub use ::log;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
