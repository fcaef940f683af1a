//! One module per subcommand, each exposing `execute`.

pub mod call;
pub mod clear;
pub mod completions;
pub mod delete;
pub mod get;
pub mod init;
pub mod list;
pub mod set;
