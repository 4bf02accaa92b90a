//! Console session state: one broker plus the named listeners created from the prompt.

use std::{cell::RefCell, collections::BTreeMap, fmt::Write, rc::Rc};

use log::info;
use rusty_events::{
    Broker, Category, Context, Event, Registry, State, Subscriber, SubscriberId,
};

use crate::{
    command::{Command, HELP},
    game::{GameEvent, GameEventCategory},
};

/// Logs every event it receives.
pub struct Printer {
    name: String,
    received: usize,
}

impl Printer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: 0,
        }
    }

    pub fn received(&self) -> usize {
        self.received
    }
}

impl Subscriber<GameEvent> for Printer {
    fn receive(&mut self, event: &GameEvent, _ctx: &mut Context<'_, GameEvent>) {
        self.received += 1;
        info!("{} <- {:?}", self.name, event);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct Listener {
    id: SubscriberId,
    handle: Rc<RefCell<Printer>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Reply(String),
    Quit,
}

impl Outcome {
    fn reply(text: impl Into<String>) -> Self {
        Outcome::Reply(text.into())
    }
}

pub struct Session {
    broker: Broker<GameEvent>,
    registry: Registry<GameEventCategory>,
    listeners: BTreeMap<String, Listener>,
}

impl Session {
    pub fn new(broker: Broker<GameEvent>) -> Self {
        Self {
            broker,
            registry: Registry::new(),
            listeners: BTreeMap::new(),
        }
    }

    pub fn broker(&self) -> &Broker<GameEvent> {
        &self.broker
    }

    pub fn registry(&self) -> &Registry<GameEventCategory> {
        &self.registry
    }

    /// Events received so far by the named listener.
    pub fn received(&self, listener: &str) -> Option<usize> {
        self.listeners
            .get(listener)
            .map(|listener| listener.handle.borrow().received())
    }

    pub fn execute(&mut self, command: Command) -> rusty_events::Result<Outcome> {
        let outcome = match command {
            Command::Send(event) => {
                let delivered = self.broker.send(&event)?;
                Outcome::reply(format!("{} delivered to {delivered}", event.name()))
            }
            Command::Queue(event) => {
                self.broker.enqueue(&event)?;
                Outcome::reply(format!(
                    "{} queued ({} pending)",
                    event.name(),
                    self.broker.pending_len()
                ))
            }
            Command::Delay { seconds, event } => {
                self.broker.schedule(&event, seconds)?;
                Outcome::reply(format!("{} scheduled in {seconds}s", event.name()))
            }
            Command::Tick(seconds) => {
                let promoted = self.broker.advance_time(seconds)?;
                Outcome::reply(format!("{promoted} matured"))
            }
            Command::Flush => {
                let drained = self.broker.flush_queue()?;
                Outcome::reply(format!("{drained} dispatched"))
            }
            Command::Pump(seconds) => {
                let cycle = self.broker.pump(seconds)?;
                Outcome::reply(format!(
                    "{} matured, {} dispatched",
                    cycle.promoted, cycle.drained
                ))
            }
            Command::Subscribe { listener, category } => {
                let id = self.listener(&listener)?;
                let added = self.broker.subscribe(id, category)?;
                Outcome::reply(if added {
                    format!("{listener} subscribed to {}", category.name())
                } else {
                    format!("{listener} already subscribed to {}", category.name())
                })
            }
            Command::Unsubscribe { listener, category } => {
                let removed = match self.listeners.get(&listener) {
                    Some(entry) => self.broker.unsubscribe(entry.id, category)?,
                    None => false,
                };
                Outcome::reply(if removed {
                    format!("{listener} unsubscribed from {}", category.name())
                } else {
                    format!("{listener} was not subscribed to {}", category.name())
                })
            }
            Command::UnsubscribeAll { listener } => {
                let removed = match self.listeners.get(&listener) {
                    Some(entry) => self.broker.unsubscribe_all(entry.id)?,
                    None => 0,
                };
                Outcome::reply(format!("{listener} left {removed} categories"))
            }
            Command::Drop { listener } => match self.listeners.remove(&listener) {
                Some(_) => Outcome::reply(format!(
                    "{listener} dropped, the broker prunes it on the next dispatch"
                )),
                None => Outcome::reply(format!("no listener named {listener}")),
            },
            Command::Categories => Outcome::reply(self.registry.to_string().trim_end()),
            Command::Status => Outcome::Reply(self.status()),
            Command::Teardown => {
                self.broker.teardown();
                self.listeners.clear();
                Outcome::reply("broker torn down")
            }
            Command::Init => {
                self.broker.initialize()?;
                Outcome::reply("broker initialized")
            }
            Command::Help => Outcome::reply(HELP),
            Command::Quit => Outcome::Quit,
        };
        Ok(outcome)
    }

    /// Id of the named listener, registering a new one on first use.
    fn listener(&mut self, name: &str) -> rusty_events::Result<SubscriberId> {
        if let Some(listener) = self.listeners.get(name) {
            return Ok(listener.id);
        }
        let handle = Rc::new(RefCell::new(Printer::new(name)));
        let id = self.broker.register(&handle)?;
        self.listeners
            .insert(name.to_string(), Listener { id, handle });
        Ok(id)
    }

    fn status(&self) -> String {
        let mut out = String::new();
        let state = match self.broker.state() {
            State::Initialized => "initialized",
            State::TornDown => "torn down",
        };
        let _ = writeln!(
            out,
            "broker {state}: {} pending, {} delayed",
            self.broker.pending_len(),
            self.broker.delayed_len()
        );
        for (name, listener) in &self.listeners {
            let categories: Vec<_> = self
                .broker
                .subscriptions(listener.id)
                .into_iter()
                .map(Category::name)
                .collect();
            let _ = writeln!(
                out,
                "  {name} {}: [{}] received {}",
                listener.id,
                categories.join(", "),
                listener.handle.borrow().received()
            );
        }
        out.trim_end().to_string()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Broker::new())
    }
}
