pub mod add;
pub mod breach_cmd;
pub mod completions;
pub mod generate;
pub mod get;
pub mod import_cmd;
pub mod list;
pub mod register;
pub mod rotate;
