use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKind {
    title: String,
    kind: String,
}

impl ResourceKind {
    pub fn new(title: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: kind.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    pub index: char,
    pub title: String,
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDef {
    pub name: &'static str,
    pub shortcut: char,
    pub description: &'static str,
}

impl ActionDef {
    pub const fn new(name: &'static str, shortcut: char, description: &'static str) -> Self {
        Self {
            name,
            shortcut,
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
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

    pub fn opt_arg(self, flag: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.arg(flag).arg(value),
            None => self,
        }
    }
}

impl Display for Invocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerPurpose {
    Logs,
    Exec,
}

impl ContainerPurpose {
    pub fn action(self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::Exec => "exec",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Capture {
        invocation: Invocation,
        title: String,
        style: Option<String>,
    },
    Interactive { invocation: Invocation, label: String },
    Follow { invocation: Invocation, title: String },
    Mutate { invocation: Invocation, label: String },
    PickContainer {
        target: String,
        selector: String,
        purpose: ContainerPurpose,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Refreshed { kind: String },
    RefreshFailed { kind: String, message: String },
    LogLine { stream: u64, line: String },
    LogEnded { stream: u64, error: Option<String> },
}
