//! Commands typed on stdin.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Load,
    Stop,
    Stats,
    Clear,
    State,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "load" | "l" => Ok(ConsoleCommand::Load),
            "stop" | "s" => Ok(ConsoleCommand::Stop),
            "stats" => Ok(ConsoleCommand::Stats),
            "clear" => Ok(ConsoleCommand::Clear),
            "state" | "status" => Ok(ConsoleCommand::State),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            other => Err(format!("Unknown command `{}` (try `help`)", other)),
        }
    }
}

pub const HELP: &str = "Commands: load, stop, stats, clear, state, help, quit";
