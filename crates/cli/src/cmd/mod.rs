pub mod key;
pub mod lookup;
