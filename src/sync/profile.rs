//! Backup profile definitions.
//!
//! A [`ProfileEntry`] describes one transfer between a source and a
//! destination, each of which is either a local directory or a path on a
//! configured remote. Profiles are immutable once loaded.

use crate::sync::result_error::error::Error;
use crate::sync::validate::{validate_absolute_path, validate_hook, validate_local_path};
use bon::Builder;
use derive_more::{Deref, Display};
use getset::{CopyGetters, Getters};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fmt::{Formatter, Write};
use std::result;
use std::str::FromStr;
use validator::{Validate, ValidationError, ValidationErrors};

/// What the transfer does at the destination.
#[derive(Clone, Copy, Debug, Display, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Make the destination identical to the source, deleting extra files.
    #[serde(alias = "sync")]
    #[display("mirror")]
    Mirror,
    /// Add and update files at the destination, never delete.
    #[display("copy")]
    Copy,
}

impl Action {
    /// Sub-command passed to the transfer binary.
    pub fn command(self) -> &'static str {
        match self {
            Action::Mirror => "sync",
            Action::Copy => "copy",
        }
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum FilterSign {
    #[display("+")]
    Include,
    #[display("-")]
    Exclude,
}

/// One filter rule, rendered as `+ pattern` or `- pattern`.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, Getters, CopyGetters)]
#[display("{sign} {pattern}")]
pub struct FilterRule {
    #[getset(get_copy = "pub")]
    sign: FilterSign,
    #[getset(get = "pub")]
    pattern: String,
}

impl FilterRule {
    pub fn include<S: Into<String>>(pattern: S) -> Self {
        Self {
            sign: FilterSign::Include,
            pattern: pattern.into(),
        }
    }

    pub fn exclude<S: Into<String>>(pattern: S) -> Self {
        Self {
            sign: FilterSign::Exclude,
            pattern: pattern.into(),
        }
    }
}

impl FromStr for FilterRule {
    type Err = Error;

    fn from_str(line: &str) -> result::Result<Self, Self::Err> {
        let (sign, pattern) = match line.split_at_checked(2) {
            Some(("+ ", pattern)) => (FilterSign::Include, pattern),
            Some(("- ", pattern)) => (FilterSign::Exclude, pattern),
            _ => return Err(Error::InvalidFilterRule(line.to_string())),
        };
        if pattern.trim().is_empty() {
            return Err(Error::InvalidFilterRule(line.to_string()));
        }

        Ok(Self {
            sign,
            pattern: pattern.to_string(),
        })
    }
}

struct FilterRuleVisitor;

impl Visitor<'_> for FilterRuleVisitor {
    type Value = FilterRule;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a filter rule starting with '+ ' or '- '")
    }

    fn visit_str<E>(self, v: &str) -> result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for FilterRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        deserializer.deserialize_str(FilterRuleVisitor)
    }
}

/// Accepts either a list of rules or one block string with a rule per line.
///
/// In the block form blank lines and `#` comments are skipped.
struct FilterRulesVisitor;

impl<'de> Visitor<'de> for FilterRulesVisitor {
    type Value = Vec<FilterRule>;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a list of filter rules or a block of filter rule lines")
    }

    fn visit_str<E>(self, v: &str) -> result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .map(|line| line.parse().map_err(serde::de::Error::custom))
            .collect()
    }

    fn visit_seq<A>(self, mut seq: A) -> result::Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut rules = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(rule) = seq.next_element()? {
            rules.push(rule);
        }
        Ok(rules)
    }

    fn visit_unit<E>(self) -> result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Vec::new())
    }
}

fn deserialize_filter_rules<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> result::Result<Vec<FilterRule>, D::Error> {
    deserializer.deserialize_any(FilterRulesVisitor)
}

/// A single backup profile.
///
/// `name` is taken from the key of the profile in the configuration mapping.
#[derive(Clone, Debug, Deserialize, Builder, PartialEq, Eq, Getters, CopyGetters)]
#[serde(deny_unknown_fields)]
pub struct ProfileEntry {
    #[serde(skip)]
    #[builder(into)]
    #[getset(get = "pub")]
    name: String,
    #[getset(get_copy = "pub")]
    action: Action,
    #[builder(into)]
    #[getset(get = "pub")]
    source: Option<String>,
    #[builder(into)]
    #[getset(get = "pub")]
    source_path: String,
    #[builder(into)]
    #[getset(get = "pub")]
    destination: Option<String>,
    #[builder(into)]
    #[getset(get = "pub")]
    destination_path: String,
    #[serde(default)]
    #[builder(default)]
    #[getset(get_copy = "pub")]
    disable_fast_list: bool,
    #[serde(default)]
    #[builder(default, into)]
    #[getset(get = "pub")]
    extra_options: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_filter_rules")]
    #[builder(default, into)]
    #[getset(get = "pub")]
    filter_rules: Vec<FilterRule>,
    #[builder(into)]
    #[getset(get = "pub")]
    pre_exec: Option<String>,
    #[builder(into)]
    #[getset(get = "pub")]
    post_exec: Option<String>,
}

fn validate_remote(remote: &str) -> result::Result<(), ValidationError> {
    if remote.trim().is_empty() || remote.contains(':') {
        return Err(ValidationError::new("InvalidRemote")
            .with_message(format!("invalid remote name {remote:?}").into()));
    }

    Ok(())
}

impl Validate for ProfileEntry {
    /// Checks every field and reports all failures together.
    fn validate(&self) -> result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.name.is_empty() {
            errors.add(
                "name",
                ValidationError::new("EmptyName").with_message("profile name is empty".into()),
            );
        }

        let sides = [
            ("source", &self.source, "source_path", &self.source_path),
            ("destination", &self.destination, "destination_path", &self.destination_path),
        ];
        for (remote_field, remote, path_field, path) in sides {
            if let Some(Err(e)) = remote.as_deref().map(validate_remote) {
                errors.add(remote_field, e);
            }
            let path_check = match remote {
                Some(_) => validate_absolute_path(path),
                None => validate_local_path(path),
            };
            if let Err(e) = path_check {
                errors.add(path_field, e);
            }
        }

        for (field, hook) in [("pre_exec", &self.pre_exec), ("post_exec", &self.post_exec)] {
            if let Some(Err(e)) = hook.as_ref().map(validate_hook) {
                errors.add(field, e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn operand(remote: &Option<String>, path: &str) -> String {
    match remote {
        Some(remote) => format!("{remote}:{path}"),
        None => path.to_string(),
    }
}

impl ProfileEntry {
    /// Source operand: `remote:path`, or the bare local path.
    pub fn source_operand(&self) -> String {
        operand(&self.source, &self.source_path)
    }

    /// Destination operand: `remote:path`, or the bare local path.
    pub fn destination_operand(&self) -> String {
        operand(&self.destination, &self.destination_path)
    }

    /// Configured remote names, source first.
    pub fn remotes(&self) -> impl Iterator<Item = &str> {
        [&self.source, &self.destination]
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// One-line description used by the profile listing.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{}: {} {} -> {}",
            self.name,
            self.action,
            self.source_operand(),
            self.destination_operand()
        );
        if !self.filter_rules.is_empty() {
            let _ = write!(summary, " [{} filter rule(s)]", self.filter_rules.len());
        }
        if self.pre_exec.is_some() {
            summary.push_str(" [pre_exec]");
        }
        if self.post_exec.is_some() {
            summary.push_str(" [post_exec]");
        }
        if self.disable_fast_list {
            summary.push_str(" [no fast list]");
        }
        summary
    }
}

/// Profiles in declaration order, read from a name -> profile mapping.
#[derive(Clone, Debug, Default, Deref, PartialEq, Eq)]
pub struct Profiles(Vec<ProfileEntry>);

impl Profiles {
    pub fn get(&self, name: &str) -> Option<&ProfileEntry> {
        self.0.iter().find(|p| p.name == name)
    }
}

impl From<Vec<ProfileEntry>> for Profiles {
    fn from(value: Vec<ProfileEntry>) -> Self {
        Self(value)
    }
}

struct ProfilesVisitor;

impl<'de> Visitor<'de> for ProfilesVisitor {
    type Value = Profiles;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a mapping of profile name to profile")
    }

    fn visit_map<A>(self, mut map: A) -> result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut seen = HashSet::new();
        let mut profiles = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, mut entry)) = map.next_entry::<String, ProfileEntry>()? {
            if !seen.insert(name.clone()) {
                return Err(serde::de::Error::custom(Error::DuplicateProfile(name)));
            }
            entry.name = name;
            profiles.push(entry);
        }
        Ok(Profiles(profiles))
    }

    fn visit_unit<E>(self) -> result::Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Profiles::default())
    }
}

impl<'de> Deserialize<'de> for Profiles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        deserializer.deserialize_any(ProfilesVisitor)
    }
}
