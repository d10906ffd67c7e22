#![warn(rust_2018_idioms)]

//! Marshal and unmarshal RTCP transport-wide congestion control feedback,
//! <https://datatracker.ietf.org/doc/html/draft-holmer-rmcat-transport-wide-cc-extensions-01>.

pub mod error;
pub mod header;
pub mod packet;
pub mod recorder;
pub mod transport_layer_cc;
pub mod util;

pub use error::{Error, Result};
pub use transport_layer_cc::TransportLayerCc;
