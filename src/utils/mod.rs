pub mod logging;
pub mod scroll;
pub mod url;
