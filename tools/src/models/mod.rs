pub mod account;
pub mod comment;
