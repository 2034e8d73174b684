//! Streams which transports can hand to the connection client.

pub mod duplex;
pub mod tls;
