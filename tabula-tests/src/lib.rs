mod rows;
mod simple;
mod transaction1;
mod user;

use crate::{rows::rows, simple::simple, transaction1::transaction1, user::users};
use log::LevelFilter;
use std::{env, sync::Arc};
use tabula::{Connection, DriverRegistry};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Run the whole suite, tables resolve their driver through `registry`.
pub async fn execute_tests<C: Connection + 'static>(connection: C, registry: &DriverRegistry) {
    let connection = Arc::new(connection);
    simple(&connection, registry).await;
    users(&connection, registry).await;
    rows(&connection, registry).await;
    transaction1(&connection, registry).await;
}

/// Column type of an auto increment primary key.
pub(crate) fn auto_increment_key(backend: &str) -> &'static str {
    match backend {
        "postgres" => "BIGSERIAL PRIMARY KEY",
        _ => "INTEGER PRIMARY KEY AUTOINCREMENT",
    }
}

pub(crate) fn uuid_type(backend: &str) -> &'static str {
    match backend {
        "postgres" => "UUID",
        _ => "TEXT",
    }
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
