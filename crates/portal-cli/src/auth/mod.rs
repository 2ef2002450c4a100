//! Session commands.

mod common;
pub mod login;
pub mod logout;
pub mod setup;
pub mod status;

pub use common::{build_manager, prompt, TerminalNavigator};
