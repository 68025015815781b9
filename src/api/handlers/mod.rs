pub mod admin;
pub mod root;
