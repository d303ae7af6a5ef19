pub mod extractor;
pub mod identifier;
pub mod merger;
pub mod orchestrator;
pub mod resolver;
pub mod validator;
