mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::{Money, MoneyConversionError, MINOR_UNITS};
pub use secret::Secret;
