//! One module per subcommand, each exposing `execute`.

pub mod add;
pub mod audit_cmd;
pub mod change_password;
pub mod delete;
pub mod extract;
pub mod init;
pub mod list;
pub mod status;
pub mod wipe;
