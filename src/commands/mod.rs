pub mod serve;
pub mod validate;

pub use serve::execute_serve;
pub use validate::execute_validate;
