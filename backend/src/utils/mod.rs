pub mod csv;
pub mod email;
pub mod jwt;
pub mod network;
pub mod time;
pub mod token;

pub use jwt::*;
pub use time::*;
