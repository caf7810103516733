// SPDX-License-Identifier: MIT

//! The line-delimited JSON protocol spoken between the client, the daemon,
//! and the worker processes it supervises.

mod request;
mod response;
mod wire;

pub use request::Request;
pub use response::Response;
pub use wire::{decode, encode, read_message, read_request, write_message, write_response, ProtocolError};
