pub mod errors;
pub mod external;
pub mod local;
pub mod models;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;
