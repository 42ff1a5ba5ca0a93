pub mod account;
pub mod position;

pub use account::Account;
pub use position::Holding;
