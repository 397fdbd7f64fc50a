//! Types shared between the hopgate server and its clients.

pub mod api;
