pub mod dispatcher;
pub mod input;
