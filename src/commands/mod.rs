pub mod poll;

pub use poll::{handle_poll_command, Cli, PollCommand};
