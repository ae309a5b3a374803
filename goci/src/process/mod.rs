//! Process spawning bound to cancellation.

mod command;
mod factory;

pub use command::ContextCommand;
pub use factory::{CommandFactory, SystemCommandFactory};

#[cfg(test)]
pub use factory::MockCommandFactory;
