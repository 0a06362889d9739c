// GitHub Actions workflow commands and step outputs
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Severity of a workflow annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Error,
    Warning,
    Notice,
}

impl Annotation {
    fn command(self) -> &'static str {
        match self {
            Annotation::Error => "error",
            Annotation::Warning => "warning",
            Annotation::Notice => "notice",
        }
    }
}

/// Escape data for a single-line workflow command.
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// `::error::message` style line
pub fn format_annotation(kind: Annotation, message: &str) -> String {
    format!("::{}::{}", kind.command(), escape_data(message))
}

/// Writes annotations to stdout and outputs to the `$GITHUB_OUTPUT` file
#[derive(Debug, Clone, Default)]
pub struct ActionsOutput {
    output_file: Option<PathBuf>,
}

impl ActionsOutput {
    pub fn new(output_file: Option<PathBuf>) -> Self {
        Self { output_file }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("GITHUB_OUTPUT")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        )
    }

    pub fn annotate(&self, kind: Annotation, message: &str) {
        println!("{}", format_annotation(kind, message));
    }

    pub fn error(&self, message: &str) {
        self.annotate(Annotation::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.annotate(Annotation::Warning, message);
    }

    pub fn notice(&self, message: &str) {
        self.annotate(Annotation::Notice, message);
    }

    /// Append `name` to the output file using a heredoc so multi-line values
    /// survive. Without an output file the value is only logged.
    pub fn set_output(&self, name: &str, value: &str) -> std::io::Result<()> {
        let Some(path) = &self.output_file else {
            debug!(name, value, "GITHUB_OUTPUT not set; skipping output");
            return Ok(());
        };

        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{name}<<{delimiter}")?;
        writeln!(file, "{value}")?;
        writeln!(file, "{delimiter}")?;
        Ok(())
    }
}
