//! Scripted [`CommandRunner`] for tests.

use crate::sync::process::{CommandRunner, CommandSpec, ProcessOutput};
use crate::sync::result_error::result::Result;
use std::cell::RefCell;

type Script = Box<dyn Fn(&CommandSpec) -> Result<ProcessOutput>>;

/// Answers every command with `script` and records what was asked.
pub(crate) struct ScriptedRunner {
    script: Script,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub(crate) fn new<F>(script: F) -> Self
    where
        F: Fn(&CommandSpec) -> Result<ProcessOutput> + 'static,
    {
        Self {
            script: Box::new(script),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &CommandSpec) -> Result<ProcessOutput> {
        self.calls.borrow_mut().push(command.clone());
        (self.script)(command)
    }
}
