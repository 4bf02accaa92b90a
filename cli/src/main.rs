use crossbeam::channel::Receiver;
use crossterm::style::Stylize;
use log::{Level, LevelFilter};
use rustyline::{Editor, error::ReadlineError};

use rusty_events::{
    Broker, Config,
    logger::{ChannelLogger, LogMessage},
};
use rusty_events_cli::{
    command,
    session::{Outcome, Session},
};

fn main() {
    let (logger, log_recv) = ChannelLogger::with_receiver(LevelFilter::Debug);
    if let Err(err) = logger.install() {
        eprintln!("unable to install logger: {err}");
    }

    let mut session = Session::new(Broker::with_config(Config::default()));
    let mut editor = Editor::<()>::new();
    println!("rusty_events console, type `help` for commands");
    drain_logs(&log_recv);

    loop {
        match editor.readline("events> ") {
            Ok(line) => {
                editor.add_history_entry(line.as_str());
                let command = match command::parse(session.registry(), &line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(err) => {
                        println!("{}", err.to_string().yellow());
                        continue;
                    }
                };
                let outcome = session.execute(command);
                drain_logs(&log_recv);
                match outcome {
                    Ok(Outcome::Reply(reply)) => println!("{reply}"),
                    Ok(Outcome::Quit) => break,
                    Err(err) => println!("{} {}", err.as_label().red(), err),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("readline failed: {err}").red());
                break;
            }
        }
    }

    session.execute(command::Command::Teardown).ok();
    drain_logs(&log_recv);
}

/// Print every log record received since the last call.
fn drain_logs(receiver: &Receiver<LogMessage>) {
    for message in receiver.try_iter() {
        let level = format!("{:<5}", message.level);
        let level = match message.level {
            Level::Error => level.red(),
            Level::Warn => level.yellow(),
            Level::Info => level.green(),
            Level::Debug => level.blue(),
            Level::Trace => level.dark_grey(),
        };
        println!("{level} {}", message.message);
    }
}
