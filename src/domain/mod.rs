pub mod checkout;
pub mod errors;
pub mod media;
pub mod order;
pub mod parse;
pub mod ports;
pub mod product;
pub mod tracking;
pub mod user;
