pub mod digest;
pub mod list;
pub mod setup;
pub mod ui;
