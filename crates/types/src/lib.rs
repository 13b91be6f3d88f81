pub mod action;
pub mod intent;
pub mod notification;
pub mod outcome;
pub mod pool;
pub mod token;
pub mod units;

pub use action::*;
pub use intent::*;
pub use notification::*;
pub use outcome::*;
pub use pool::*;
pub use token::*;
pub use units::*;

pub use solana_pubkey::Pubkey;
