pub mod email;
pub mod enums;
pub mod models;

pub use email::*;
pub use enums::*;
pub use models::*;
