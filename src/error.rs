//! Every fallible operation in the crate reports an `anyhow::Error` with context attached at the
//! IO or SQL boundary where it happened.
pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
