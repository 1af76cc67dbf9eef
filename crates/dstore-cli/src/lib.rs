//! Library side of the `dstore` command line tool.

pub mod logging;
pub mod pipeline;
