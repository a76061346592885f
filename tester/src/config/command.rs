//! External command descriptions
//!
//! Collaborators (build tools, database utilities, the server and the mount
//! client) are described as a program plus arguments. Arguments may carry
//! `{name}` placeholders that are filled in once the run knows the values,
//! e.g. `{mount_point}` after the workspace has been allocated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Program and arguments of an external collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Run a script through `sh -c`
    pub fn shell<S: Into<String>>(script: S) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Whether the program or any argument carries the `{name}` placeholder
    pub fn mentions(&self, name: &str) -> bool {
        let placeholder = format!("{{{name}}}");
        self.program.contains(&placeholder) || self.args.iter().any(|arg| arg.contains(&placeholder))
    }

    /// Substitute placeholders in the program and every argument
    pub fn expand(&self, placeholders: &Placeholders) -> CommandSpec {
        CommandSpec {
            program: placeholders.apply(&self.program),
            args: self.args.iter().map(|arg| placeholders.apply(arg)).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Values substituted into `{name}` placeholders
#[derive(Debug, Clone, Default)]
pub struct Placeholders {
    values: BTreeMap<&'static str, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: Into<String>>(mut self, key: &'static str, value: S) -> Self {
        self.values.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Replace every known `{key}`; unknown placeholders are left verbatim
    pub fn apply(&self, input: &str) -> String {
        let mut output = input.to_string();
        for (key, value) in &self.values {
            output = output.replace(&format!("{{{key}}}"), value);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_replaces_known_placeholders() {
        let spec = CommandSpec::new("keywhiz-fs")
            .args(["-C", "{ca_cert}", "{server_url}", "{mount_point}"]);
        let placeholders = Placeholders::new()
            .with("ca_cert", "/certs/ca.crt")
            .with("server_url", "https://localhost:4444")
            .with("mount_point", "/tmp/run/mnt");

        let expanded = spec.expand(&placeholders);
        assert_eq!(
            expanded.args,
            vec!["-C", "/certs/ca.crt", "https://localhost:4444", "/tmp/run/mnt"]
        );
        assert_eq!(expanded.program, "keywhiz-fs");
    }

    #[test]
    fn test_unknown_placeholders_are_left_alone() {
        let placeholders = Placeholders::new().with("workspace", "/w");
        assert_eq!(placeholders.apply("{workspace}/{mount_point}"), "/w/{mount_point}");
    }

    #[test]
    fn test_mentions_finds_embedded_placeholders() {
        let spec = CommandSpec::new("java").args(["-jar", "{server_jar}", "server"]);
        assert!(spec.mentions("server_jar"));
        assert!(!spec.mentions("server_config"));
        assert!(CommandSpec::shell("cp {workspace}/a b").mentions("workspace"));
    }

    #[test]
    fn test_shell_and_display() {
        let spec = CommandSpec::shell("touch {mount_point}/.running");
        assert_eq!(spec.to_string(), "sh -c touch {mount_point}/.running");
    }

    #[test]
    fn test_deserialize_without_args() {
        let spec: CommandSpec = serde_json::from_str(r#"{"program":"true"}"#).unwrap();
        assert_eq!(spec, CommandSpec::new("true"));
    }
}
