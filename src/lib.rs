pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod process;
pub mod render;
pub mod stations;
pub mod window;
