//! Static command vocabularies.
//!
//! A [`CommandTable`] maps symbolic names to wire templates. Templates use
//! `strfmt` placeholders, so numeric formatting lives in the table rather than
//! in driver code:
//!
//! ```
//! use lab_serial::instrument::{CommandArgs, CommandTable};
//!
//! let table = CommandTable::builder()
//!     .command("DIA", "DIA{param:.2}")
//!     .build();
//! let wire = table.render("DIA", &CommandArgs::new().float("param", 4.6)).unwrap();
//! assert_eq!(wire, "DIA4.60");
//! ```

use crate::error::{DeviceError, DeviceResult};
use std::collections::HashMap;
use strfmt::{strfmt_map, FmtError, Formatter};

/// Whether the instrument answers a command on the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyMode {
    /// One terminated reply line follows the command.
    Line,
    /// The instrument stays silent (moves, learn cycles).
    Silent,
}

/// One table entry: wire template plus reply behaviour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    /// `strfmt` template of the wire text
    pub template: String,
    /// Whether a reply line follows
    pub reply: ReplyMode,
}

/// A single named argument value.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandArg {
    /// Integer, honours width and sign specs
    Int(i64),
    /// Float, honours precision specs such as `{param:.3}`
    Float(f64),
    /// Verbatim text
    Text(String),
}

/// Named arguments substituted into a template.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommandArgs {
    values: HashMap<String, CommandArg>,
}

impl CommandArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an integer argument.
    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.values.insert(key.to_string(), CommandArg::Int(value));
        self
    }

    /// Add a float argument.
    pub fn float(mut self, key: &str, value: f64) -> Self {
        self.values.insert(key.to_string(), CommandArg::Float(value));
        self
    }

    /// Add a text argument.
    pub fn text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values
            .insert(key.to_string(), CommandArg::Text(value.into()));
        self
    }

    /// Argument stored under `key`.
    pub fn get(&self, key: &str) -> Option<&CommandArg> {
        self.values.get(key)
    }

    /// True when no arguments were added.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Immutable mapping from command name to [`CommandSpec`].
#[derive(Clone, Debug, Default)]
pub struct CommandTable {
    commands: HashMap<String, CommandSpec>,
}

impl CommandTable {
    /// Start an empty table.
    pub fn builder() -> CommandTableBuilder {
        CommandTableBuilder::default()
    }

    /// Entry for `name`.
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    /// True if `name` is a known command.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True for a table with no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Command names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Render the wire text for `name` (without line terminator).
    ///
    /// # Errors
    /// `UnknownCommand` if the name is not in the table, `Template` if an
    /// argument is missing or does not fit its placeholder.
    pub fn render(&self, name: &str, args: &CommandArgs) -> DeviceResult<String> {
        let spec = self
            .get(name)
            .ok_or_else(|| DeviceError::UnknownCommand(name.to_string()))?;
        render_template(&spec.template, args).map_err(|e| DeviceError::Template {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Builder collecting table entries; later entries replace earlier ones.
#[derive(Debug, Default)]
pub struct CommandTableBuilder {
    commands: HashMap<String, CommandSpec>,
}

impl CommandTableBuilder {
    /// Add a command answered by one reply line.
    pub fn command(self, name: &str, template: &str) -> Self {
        self.entry(name, template, ReplyMode::Line)
    }

    /// Add a command the instrument does not answer.
    pub fn silent(self, name: &str, template: &str) -> Self {
        self.entry(name, template, ReplyMode::Silent)
    }

    fn entry(mut self, name: &str, template: &str, reply: ReplyMode) -> Self {
        self.commands.insert(
            name.to_string(),
            CommandSpec {
                template: template.to_string(),
                reply,
            },
        );
        self
    }

    /// Freeze the collected entries.
    pub fn build(self) -> CommandTable {
        CommandTable {
            commands: self.commands,
        }
    }
}

fn render_template(template: &str, args: &CommandArgs) -> Result<String, FmtError> {
    strfmt_map(template, |mut fmt: Formatter| match args.get(fmt.key) {
        Some(CommandArg::Int(v)) => fmt.i64(*v),
        Some(CommandArg::Float(v)) => fmt.f64(*v),
        Some(CommandArg::Text(s)) => fmt.str(s),
        None => Err(FmtError::KeyError(format!("missing argument '{}'", fmt.key))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CommandTable {
        CommandTable::builder()
            .command("VER", "VER")
            .command("VOL", "VOL{param:.3}")
            .command("SAF", "SAF{param}")
            .command("DIR", "DIR {param}")
            .command("OUT_SP", "OUT_SP_{x}@{val}")
            .silent("GO", "GO{pos}")
            .build()
    }

    #[test]
    fn test_plain_command() {
        assert_eq!(table().render("VER", &CommandArgs::new()).unwrap(), "VER");
    }

    #[test]
    fn test_float_precision() {
        let args = CommandArgs::new().float("param", 20.0);
        assert_eq!(table().render("VOL", &args).unwrap(), "VOL20.000");
    }

    #[test]
    fn test_int_and_text_args() {
        let t = table();
        assert_eq!(
            t.render("SAF", &CommandArgs::new().int("param", 0)).unwrap(),
            "SAF0"
        );
        assert_eq!(
            t.render("DIR", &CommandArgs::new().text("param", "WDR")).unwrap(),
            "DIR WDR"
        );
        let args = CommandArgs::new().int("x", 4).int("val", 500);
        assert_eq!(t.render("OUT_SP", &args).unwrap(), "OUT_SP_4@500");
    }

    #[test]
    fn test_unknown_command() {
        let err = table().render("FOO", &CommandArgs::new()).unwrap_err();
        assert!(matches!(err, DeviceError::UnknownCommand(name) if name == "FOO"));
    }

    #[test]
    fn test_missing_argument() {
        let err = table().render("VOL", &CommandArgs::new()).unwrap_err();
        assert!(matches!(err, DeviceError::Template { ref name, .. } if name == "VOL"));
    }

    #[test]
    fn test_reply_mode_and_names() {
        let t = table();
        assert_eq!(t.get("GO").unwrap().reply, ReplyMode::Silent);
        assert_eq!(t.get("VER").unwrap().reply, ReplyMode::Line);
        assert_eq!(t.names().first(), Some(&"DIR"));
        assert_eq!(t.len(), 6);
    }
}
