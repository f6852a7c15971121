//! Interactive fleet console.
//!
//! Each input line parses into one [`ConsoleCommand`]; [`execute`] is the
//! only place commands are acted on.

use std::io::Write;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use fleet::{Fleet, FleetError, JoinOutcome};
use supervisor::NodeSupervisor;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
commands:
  config <node>   print the node's effective configuration
  log <node>      print the node's log file
  out <node>      print the node's captured stdout
  err <node>      print the node's captured stderr
  launch          add a node to the fleet and start it
  launch_cmd      add a node without starting it and print its command line
  status          print the status of every node
  exit            shut the fleet down and leave
  help            print this message
<node> is a numeric id or a name such as validator-0";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Config(String),
    Log(String),
    Stdout(String),
    Stderr(String),
    Launch,
    LaunchCmd,
    Status,
    Exit,
    Help,
}

impl FromStr for ConsoleCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| anyhow!("empty command"))?;
        let node = words.next().map(str::to_string);
        if let Some(extra) = words.next() {
            bail!("unexpected argument {extra:?}");
        }

        let needs_node = |make: fn(String) -> ConsoleCommand| {
            node.clone()
                .map(make)
                .ok_or_else(|| anyhow!("{verb} needs a node id or name"))
        };
        let no_argument = |command: ConsoleCommand| match &node {
            Some(arg) => Err(anyhow!("{verb} takes no argument, got {arg:?}")),
            None => Ok(command),
        };

        match verb.to_ascii_lowercase().as_str() {
            "config" => needs_node(ConsoleCommand::Config),
            "log" => needs_node(ConsoleCommand::Log),
            "out" => needs_node(ConsoleCommand::Stdout),
            "err" => needs_node(ConsoleCommand::Stderr),
            "launch" => no_argument(ConsoleCommand::Launch),
            "launch_cmd" => no_argument(ConsoleCommand::LaunchCmd),
            "status" => no_argument(ConsoleCommand::Status),
            "exit" | "quit" => no_argument(ConsoleCommand::Exit),
            "help" | "?" => no_argument(ConsoleCommand::Help),
            other => bail!("unknown command {other:?}, try help"),
        }
    }
}

/// What the console loop does after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

fn node<'a>(fleet: &'a Fleet, key: &str) -> Result<&'a NodeSupervisor, FleetError> {
    fleet
        .validator(key)
        .ok_or_else(|| FleetError::UnknownNode(key.to_string()))
}

fn dump(out: &mut impl Write, what: &str, text: Option<String>) -> Result<()> {
    match text {
        Some(text) => write!(out, "{text}")?,
        None => writeln!(out, "<no {what} written>")?,
    }
    Ok(())
}

/// Runs one command against `fleet`, writing its output to `out`.
pub async fn execute(fleet: &mut Fleet, command: ConsoleCommand, out: &mut impl Write) -> Result<Flow> {
    match command {
        ConsoleCommand::Config(key) => dump(out, "configuration", node(fleet, &key)?.dump_config())?,
        ConsoleCommand::Log(key) => dump(out, "log", node(fleet, &key)?.dump_log())?,
        ConsoleCommand::Stdout(key) => dump(out, "stdout", node(fleet, &key)?.dump_stdout())?,
        ConsoleCommand::Stderr(key) => dump(out, "stderr", node(fleet, &key)?.dump_stderr())?,
        ConsoleCommand::Launch => {
            let launch = fleet.launch_node(true).await.context("Failed to add node")?;
            match launch.outcome {
                JoinOutcome::Failed(reason) => writeln!(out, "{} started but did not join: {reason}", launch.name)?,
                _ => writeln!(out, "{} joined", launch.name)?,
            }
        }
        ConsoleCommand::LaunchCmd => {
            let launch = fleet.launch_node(false).await.context("Failed to add node")?;
            writeln!(out, "{}", launch.command.join(" "))?;
        }
        ConsoleCommand::Status => {
            for status in fleet.status() {
                writeln!(out, "{status}")?;
            }
        }
        ConsoleCommand::Help => writeln!(out, "{HELP}")?,
        ConsoleCommand::Exit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}

/// Reads commands from stdin until `exit`, end of input or Ctrl-C.
pub async fn run(fleet: &mut Fleet) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{HELP}")?;

    loop {
        write!(stdout, "fleet> ")?;
        stdout.flush()?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            writeln!(stdout)?;
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<ConsoleCommand>() {
            Ok(command) => match execute(fleet, command, &mut stdout).await {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => writeln!(stdout, "error: {e:#}")?,
            },
            Err(e) => writeln!(stdout, "{e}")?,
        }
    }
    Ok(())
}
