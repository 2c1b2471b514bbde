//! Tool definitions forwarded to the model with each chat request.

pub mod tools;
