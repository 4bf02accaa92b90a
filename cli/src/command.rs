//! Console command parsing.

use std::str::FromStr;

use rusty_events::Registry;
use thiserror::Error;

use crate::game::{GameEvent, GameEventCategory};

pub const HELP: &str = "\
commands:
  send <Category> [fields..]          dispatch immediately
  queue <Category> [fields..]         dispatch on the next flush
  delay <seconds> <Category> [..]     dispatch after <seconds> of ticks
  tick <seconds>                      advance time, maturing delayed events
  flush                               dispatch every queued event
  pump <seconds>                      tick then flush
  sub <listener> <Category>           subscribe a listener (created on first use)
  unsub <listener> <Category>         unsubscribe a listener from a category
  unsuball <listener>                 unsubscribe a listener from everything
  drop <listener>                     drop a listener without unsubscribing it
  categories                          list event categories and their fields
  status                              show queues and listeners
  teardown | init                     tear the broker down / bring it back
  help | quit";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("unknown command `{0}`, try `help`")]
    UnknownCommand(String),
    #[error("unknown event category `{0}`, try `categories`")]
    UnknownCategory(String),
    #[error("missing {what}")]
    Missing { what: &'static str },
    #[error("invalid {what} `{value}`")]
    Invalid { what: &'static str, value: String },
    #[error("unexpected argument `{0}`")]
    Unexpected(String),
}

/// Positional argument cursor.
pub struct Args<'a> {
    tokens: &'a [&'a str],
    position: usize,
}

impl<'a> Args<'a> {
    pub fn new(tokens: &'a [&'a str]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn word(&mut self, what: &'static str) -> Result<&'a str, ParseError> {
        let token = self
            .tokens
            .get(self.position)
            .copied()
            .ok_or(ParseError::Missing { what })?;
        self.position += 1;
        Ok(token)
    }

    pub fn required<T: FromStr>(&mut self, what: &'static str) -> Result<T, ParseError> {
        let token = self.word(what)?;
        token.parse().map_err(|_| ParseError::Invalid {
            what,
            value: token.to_string(),
        })
    }

    pub fn optional<T: FromStr>(&mut self, what: &'static str) -> Result<Option<T>, ParseError> {
        if self.position < self.tokens.len() {
            self.required(what).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Fail if any arguments are left over.
    pub fn finish(self) -> Result<(), ParseError> {
        match self.tokens.get(self.position) {
            Some(token) => Err(ParseError::Unexpected(token.to_string())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Send(GameEvent),
    Queue(GameEvent),
    Delay { seconds: f32, event: GameEvent },
    Tick(f32),
    Flush,
    Pump(f32),
    Subscribe { listener: String, category: GameEventCategory },
    Unsubscribe { listener: String, category: GameEventCategory },
    UnsubscribeAll { listener: String },
    Drop { listener: String },
    Categories,
    Status,
    Teardown,
    Init,
    Help,
    Quit,
}

/// Parse one console line. Blank lines parse to `None`.
pub fn parse(registry: &Registry<GameEventCategory>, line: &str) -> Result<Option<Command>, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((name, rest)) = tokens.split_first() else {
        return Ok(None);
    };
    let mut args = Args::new(rest);
    let command = match name.to_ascii_lowercase().as_str() {
        "send" => Command::Send(GameEvent::parse(registry, &mut args)?),
        "queue" => Command::Queue(GameEvent::parse(registry, &mut args)?),
        "delay" => Command::Delay {
            seconds: args.required("seconds")?,
            event: GameEvent::parse(registry, &mut args)?,
        },
        "tick" => Command::Tick(args.required("seconds")?),
        "flush" => Command::Flush,
        "pump" => Command::Pump(args.required("seconds")?),
        "sub" => Command::Subscribe {
            listener: args.word("listener")?.to_string(),
            category: category(registry, &mut args)?,
        },
        "unsub" => Command::Unsubscribe {
            listener: args.word("listener")?.to_string(),
            category: category(registry, &mut args)?,
        },
        "unsuball" => Command::UnsubscribeAll {
            listener: args.word("listener")?.to_string(),
        },
        "drop" => Command::Drop {
            listener: args.word("listener")?.to_string(),
        },
        "categories" => Command::Categories,
        "status" => Command::Status,
        "teardown" => Command::Teardown,
        "init" => Command::Init,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    args.finish()?;
    Ok(Some(command))
}

fn category(
    registry: &Registry<GameEventCategory>,
    args: &mut Args<'_>,
) -> Result<GameEventCategory, ParseError> {
    let name = args.word("event category")?;
    registry
        .lookup(name)
        .ok_or_else(|| ParseError::UnknownCategory(name.to_string()))
}
