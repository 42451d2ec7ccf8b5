//! Test utilities for podsync-lib.
//!
//! [`ScriptedRunner`] answers commands from a script instead of spawning
//! processes, and records every command it was asked to run.

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

use crate::execute::cmd::{CommandOutput, CommandRunner, CommandSpec};

/// A scripted answer to one command invocation.
#[derive(Debug, Clone)]
pub enum Reply {
  Exit(i32, &'static str),
  SpawnError,
}

impl Reply {
  fn into_result(self) -> io::Result<CommandOutput> {
    match self {
      Reply::Exit(code, stdout) => Ok(CommandOutput {
        code: Some(code),
        stdout: stdout.to_string(),
        stderr: String::new(),
      }),
      Reply::SpawnError => Err(io::Error::new(io::ErrorKind::NotFound, "no such program")),
    }
  }
}

struct Rule {
  command_line: String,
  replies: VecDeque<Reply>,
}

/// Runner answering by exact command line. Unscripted commands succeed.
///
/// A rule with several replies hands them out in order and keeps repeating
/// the last one.
#[derive(Default)]
pub struct ScriptedRunner {
  rules: Mutex<Vec<Rule>>,
  calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on(self, command_line: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
    self.rules.lock().unwrap().push(Rule {
      command_line: command_line.to_string(),
      replies: replies.into_iter().collect(),
    });
    self
  }

  /// Every command run so far.
  pub fn calls(&self) -> Vec<CommandSpec> {
    self.calls.lock().unwrap().clone()
  }

  /// Command lines of every command run so far.
  pub fn command_lines(&self) -> Vec<String> {
    self.calls().iter().map(CommandSpec::command_line).collect()
  }

  fn reply(&self, spec: &CommandSpec) -> Reply {
    let line = spec.command_line();
    let mut rules = self.rules.lock().unwrap();
    let Some(rule) = rules.iter_mut().find(|r| r.command_line == line) else {
      return Reply::Exit(0, "");
    };
    if rule.replies.len() > 1 {
      rule.replies.pop_front().unwrap()
    } else {
      rule.replies.front().cloned().unwrap_or(Reply::Exit(0, ""))
    }
  }
}

impl CommandRunner for ScriptedRunner {
  async fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
    self.calls.lock().unwrap().push(spec.clone());
    self.reply(spec).into_result()
  }
}
