pub mod account;
pub mod characters;
