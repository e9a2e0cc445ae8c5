use crate::sync::probe::FastListProbe;
use crate::sync::profile::ProfileEntry;

pub static FILTER_FLAG: &str = "--filter";
pub static FAST_LIST_FLAG: &str = "--fast-list";

/// Builds the transfer command line for a profile.
///
/// The vector is always laid out as
/// `binary action extra_options.. (--filter rule).. [--fast-list] source destination`.
#[derive(Clone, Debug)]
pub struct CommandBuilder {
    binary: String,
}

impl CommandBuilder {
    pub fn new<S: Into<String>>(binary: S) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn build<P: FastListProbe + ?Sized>(&self, entry: &ProfileEntry, probe: &P) -> Vec<String> {
        let mut args = Vec::with_capacity(
            4 + entry.extra_options().len() + 2 * entry.filter_rules().len(),
        );
        args.push(self.binary.clone());
        args.push(entry.action().command().to_string());
        args.extend(entry.extra_options().iter().cloned());
        for rule in entry.filter_rules() {
            args.push(FILTER_FLAG.to_string());
            args.push(rule.to_string());
        }
        if !entry.disable_fast_list() && probe.supports_fast_enumeration(entry) {
            args.push(FAST_LIST_FLAG.to_string());
        }
        args.push(entry.source_operand());
        args.push(entry.destination_operand());
        args
    }
}
