#![warn(rust_2018_idioms)]

#[cfg(feature = "marshal")]
pub mod marshal;

#[cfg(feature = "marshal")]
pub use crate::marshal::{Marshal, MarshalSize, Unmarshal};

mod error;
pub use error::{Error, Result};
