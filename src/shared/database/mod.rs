/// データベース接続管理
pub mod connection;

pub use connection::{
    create_tables, get_value, initialize_database, open_database, remove_value, set_value,
};
