//! Console Host - Text rendering and a line-based driver
//!
//! Lets the wizard run in a terminal or from a script file: every mounted
//! step is printed, and each input line is one user action.

use crate::ui::host::WizardHost;
use crate::ui::view::{ControlKind, ControlRef, StepView};
use crate::ui::wizard::{Command, Wizard};
use anyhow::{bail, Result};
use std::fmt::Write as _;
use std::time::Duration;

/// How long a driver command may wait for background work
const TASK_WAIT: Duration = Duration::from_secs(60);

/// Prints to stdout
#[derive(Debug, Default)]
pub struct ConsoleHost {
    titles: Vec<String>,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, index: usize, view: &StepView) {
        let strip: Vec<String> = self
            .titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                if i == index {
                    format!("[{}]", title)
                } else {
                    title.clone()
                }
            })
            .collect();

        println!();
        println!("{}", strip.join(" > "));
        print!("{}", render_view(view));
    }
}

impl WizardHost for ConsoleHost {
    fn render_progress(&mut self, titles: &[String]) {
        self.titles = titles.to_vec();
    }

    fn mount(&mut self, index: usize, _id: &str, view: &StepView) {
        self.print(index, view);
    }

    fn unmount(&mut self, _index: usize, _id: &str) {}

    fn alert(&mut self, message: &str) {
        eprintln!("! {}", message);
    }
}

/// Text form of a step view
pub fn render_view(view: &StepView) -> String {
    let mut out = String::new();

    if let Some(description) = view.description() {
        let _ = writeln!(out, "{}", description);
    }

    for control in view.body().iter().filter(|c| c.visible) {
        let id = control.id.as_deref().unwrap_or("-");
        let off = if control.enabled { "" } else { " (disabled)" };
        let _ = match control.kind {
            ControlKind::Button => writeln!(out, "  <{}> {}{}", id, control.label, off),
            ControlKind::Label if control.label.is_empty() => Ok(()),
            ControlKind::Label => writeln!(out, "  {}", control.label),
            ControlKind::Input => writeln!(out, "  {} [{}]: {}", control.label, id, control.value),
            ControlKind::Choice => writeln!(
                out,
                "  {} [{}]: {:?} of {:?}",
                control.label, id, control.value, control.options
            ),
            ControlKind::Indicator => writeln!(out, "  ..."),
            ControlKind::Table => {
                for row in &control.rows {
                    let _ = writeln!(out, "  | {} |", row.join(" | "));
                }
                Ok(())
            }
        };
    }

    let nav: Vec<String> = view
        .navigation()
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let off = if c.enabled { "" } else { " (disabled)" };
            format!("<#{}> {}{}", i, c.label, off)
        })
        .collect();
    if !nav.is_empty() {
        let _ = writeln!(out, "  {}", nav.join("   "));
    }

    out
}

/// One line of driver input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Navigate without clicking anything
    Navigate(Command),
    /// Activate a control: `click importBtn` or `click #0` for navigation
    Click(ControlRef),
    /// Type into an input or pick a choice
    Set { id: String, value: String },
    /// Print the current step again
    Show,
    NewSession,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match (verb, rest) {
            ("next", "") => Self::Navigate(Command::Next),
            ("prev" | "back", "") => Self::Navigate(Command::Prev),
            ("goto", key) if !key.is_empty() => Self::Navigate(Command::Custom(key.to_string())),
            ("click", target) if !target.is_empty() => Self::Click(parse_target(target)?),
            ("set", args) if !args.is_empty() => {
                let (id, value) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
                Self::Set {
                    id: id.to_string(),
                    value: value.trim().to_string(),
                }
            }
            ("show", "") => Self::Show,
            ("new", "") => Self::NewSession,
            ("help" | "?", "") => Self::Help,
            ("quit" | "exit", "") => Self::Quit,
            _ => bail!("Unknown command: {}", line),
        };

        Ok(Some(command))
    }
}

fn parse_target(target: &str) -> Result<ControlRef> {
    match target.strip_prefix('#') {
        Some(index) => match index.parse() {
            Ok(index) => Ok(ControlRef::Nav(index)),
            Err(_) => bail!("Invalid navigation index: {}", target),
        },
        None => Ok(ControlRef::from(target)),
    }
}

pub const HELP: &str = "\
Commands:
  next | prev | goto <step>   navigate
  click <id> | click #<n>     activate a control (#n = n-th navigation button)
  set <id> <value>            type into an input or pick a choice
  show                        print the current step
  new                         start a new session
  quit";

/// Feeds console commands into a wizard
pub struct ConsoleDriver {
    wizard: Wizard,
}

impl ConsoleDriver {
    pub fn new(wizard: Wizard) -> Self {
        Self { wizard }
    }

    /// Run one input line. Returns `false` once the user quits.
    pub fn execute(&self, line: &str) -> Result<bool> {
        let Some(command) = ConsoleCommand::parse(line)? else {
            return Ok(true);
        };

        let ui = self.wizard.ui().clone();
        match command {
            ConsoleCommand::Navigate(command) => self.wizard.post(command),
            ConsoleCommand::Click(target) => {
                let Some(step) = self.wizard.current_step() else {
                    bail!("No active step");
                };
                if !step.activate(&ui, &target) {
                    bail!("Nothing to activate at {:?}", target);
                }
            }
            ConsoleCommand::Set { id, value } => {
                let Some(step) = self.wizard.current_step() else {
                    bail!("No active step");
                };
                if !step.set_value(&ui, &id, &value) {
                    bail!("'{}' is not an input of this step", id);
                }
            }
            ConsoleCommand::Show => {
                if let Some(step) = self.wizard.current_step() {
                    print!("{}", render_view(&step.view()));
                }
            }
            ConsoleCommand::NewSession => self.wizard.new_session(),
            ConsoleCommand::Help => println!("{}", HELP),
            ConsoleCommand::Quit => return Ok(false),
        }

        if !ui.run_until_idle(TASK_WAIT) {
            tracing::warn!("Background work still running after {:?}", TASK_WAIT);
        }
        self.wizard.sync();

        Ok(true)
    }
}
