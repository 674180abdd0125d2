//! One module per subcommand.

pub mod change_password;
pub mod clear;
pub mod export;
pub mod get;
pub mod import_cmd;
pub mod init;
pub mod list;
pub mod macro_cmd;
pub mod remove;
pub mod set;
pub mod status;
pub mod unlock;
