//! External command templates for processors, adapters and the mosaic step.
//!
//! A template is a whitespace-separated argument list with placeholders:
//!
//! ```text
//! gpt Idepix.S3 -Ssource={input} -t {output} -PcomputeCloudBuffer={param:cloud_buffer}
//! gdal_merge.py -o {output} {inputs}
//! ```
//!
//! A placeholder that makes up a whole argument and names a list (such as
//! `{inputs}`) expands to one argument per element; inside a larger
//! argument a list is joined with commas. Unknown placeholders are errors,
//! never empty strings.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::{
    ConfigurationError, SectionParams, DEFAULT_COMMAND_ATTEMPTS, DEFAULT_COMMAND_TIMEOUT_SECS,
};

/// Lines of stderr kept in an exit error.
const STDERR_TAIL_LINES: usize = 5;

/// Errors from rendering or running an external command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("invalid command template: {0}")]
    Template(String),

    #[error("failed to start '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("'{program}' timed out after {after:?}")]
    Timeout { program: String, after: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateValue {
    One(String),
    Many(Vec<String>),
}

/// Values substituted into a [`CommandTemplate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<String, TemplateValue>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values
            .insert(key.into(), TemplateValue::One(value.into()));
        self
    }

    pub fn set_path(&mut self, key: impl Into<String>, path: &Path) -> &mut Self {
        self.set(key, path.to_string_lossy())
    }

    pub fn set_list<I, S>(&mut self, key: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.values.insert(key.into(), TemplateValue::Many(values));
        self
    }

    /// Exposes every key of a parameter section as `{param:<key>}`.
    pub fn set_params(&mut self, params: &SectionParams) -> &mut Self {
        for (key, value) in params.iter() {
            self.set(format!("param:{}", key), value);
        }
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_]+(?::[A-Za-z0-9_.\-]+)?)\}")
            .expect("placeholder pattern is valid")
    })
}

/// A parsed command line with placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn parse(template: &str) -> Result<Self, CommandError> {
        let args: Vec<String> = template.split_whitespace().map(str::to_string).collect();
        if args.is_empty() {
            return Err(CommandError::Template("empty command".to_string()));
        }
        Ok(Self {
            source: template.trim().to_string(),
            args,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names used by the template, in order of appearance.
    pub fn placeholders(&self) -> Vec<String> {
        self.args
            .iter()
            .flat_map(|arg| placeholder_pattern().captures_iter(arg))
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// Expands the template into an argument vector.
    pub fn render(&self, vars: &TemplateVars) -> Result<Vec<String>, CommandError> {
        let mut argv = Vec::with_capacity(self.args.len());

        for arg in &self.args {
            if let Some(TemplateValue::Many(values)) = whole_placeholder(arg).and_then(|k| vars.values.get(k)) {
                argv.extend(values.iter().cloned());
                continue;
            }

            let mut unknown = None;
            let rendered = placeholder_pattern().replace_all(arg, |caps: &Captures| {
                match vars.values.get(&caps[1]) {
                    Some(TemplateValue::One(value)) => value.clone(),
                    Some(TemplateValue::Many(values)) => values.join(","),
                    None => {
                        unknown.get_or_insert_with(|| caps[1].to_string());
                        String::new()
                    }
                }
            });
            if let Some(key) = unknown {
                return Err(CommandError::Template(format!(
                    "unknown placeholder {{{}}} in '{}'",
                    key, self.source
                )));
            }
            argv.push(rendered.into_owned());
        }

        Ok(argv)
    }
}

fn whole_placeholder(arg: &str) -> Option<&str> {
    let caps = placeholder_pattern().captures(arg)?;
    let whole = caps.get(0)?;
    if whole.start() == 0 && whole.end() == arg.len() {
        caps.get(1).map(|m| m.as_str())
    } else {
        None
    }
}

/// A command template with its attempt and timeout bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    template: CommandTemplate,
    attempts: u32,
    timeout: Duration,
}

impl CommandSpec {
    pub fn new(template: CommandTemplate, attempts: u32, timeout: Duration) -> Self {
        Self {
            template,
            attempts: attempts.max(1),
            timeout,
        }
    }

    /// Reads `command`, `attempts` and `timeout_secs` from a parameter section.
    pub fn from_params(params: &SectionParams) -> Result<Self, ConfigurationError> {
        let command = params.require("command")?;
        let template =
            CommandTemplate::parse(command).map_err(|e| ConfigurationError::InvalidValue {
                section: params.section().to_string(),
                key: "command".to_string(),
                value: command.to_string(),
                reason: e.to_string(),
            })?;
        let attempts = params.parse_or("attempts", DEFAULT_COMMAND_ATTEMPTS)?;
        let timeout_secs = params.parse_or("timeout_secs", DEFAULT_COMMAND_TIMEOUT_SECS)?;
        Ok(Self::new(template, attempts, Duration::from_secs(timeout_secs)))
    }

    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Renders and runs the command, retrying up to the attempt bound.
    ///
    /// Each attempt is killed when it exceeds the timeout.
    pub async fn run(&self, label: &str, vars: &TemplateVars) -> Result<(), CommandError> {
        let argv = self.template.render(vars)?;
        let mut attempt = 1;
        loop {
            match run_once(&argv, self.timeout).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.attempts => {
                    warn!(command = label, attempt, error = %e, "Command failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn run_once(argv: &[String], timeout: Duration) -> Result<(), CommandError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| CommandError::Template("empty command".to_string()))?;

    debug!(program = %program, args = ?args, "Starting command");
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CommandError::Spawn {
            program: program.clone(),
            reason: e.to_string(),
        })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Err(_) => {
            return Err(CommandError::Timeout {
                program: program.clone(),
                after: timeout,
            })
        }
        Ok(result) => result.map_err(|e| CommandError::Spawn {
            program: program.clone(),
            reason: e.to_string(),
        })?,
    };

    if output.status.success() {
        debug!(program = %program, "Command finished");
        Ok(())
    } else {
        Err(CommandError::Exit {
            program: program.clone(),
            status: output.status.to_string(),
            stderr: stderr_tail(&output.stderr),
        })
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars() -> TemplateVars {
        let mut vars = TemplateVars::new();
        vars.set("input", "/l1/S3A.SEN3")
            .set("output", "/l2/out.nc")
            .set("input:IDEPIX", "/l2/idepix.nc")
            .set_list("inputs", ["/a.nc", "/b.nc"]);
        vars
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let template = CommandTemplate::parse("gpt c2rcc -Ssource={input:IDEPIX} -t {output}").unwrap();
        let argv = template.render(&vars()).unwrap();
        assert_eq!(argv, vec!["gpt", "c2rcc", "-Ssource=/l2/idepix.nc", "-t", "/l2/out.nc"]);
    }

    #[test]
    fn test_whole_list_argument_is_spliced() {
        let template = CommandTemplate::parse("merge -o {output} {inputs}").unwrap();
        let argv = template.render(&vars()).unwrap();
        assert_eq!(argv, vec!["merge", "-o", "/l2/out.nc", "/a.nc", "/b.nc"]);
    }

    #[test]
    fn test_embedded_list_is_comma_joined() {
        let template = CommandTemplate::parse("merge --files={inputs}").unwrap();
        let argv = template.render(&vars()).unwrap();
        assert_eq!(argv, vec!["merge", "--files=/a.nc,/b.nc"]);
    }

    #[test]
    fn test_unknown_placeholder_is_error() {
        let template = CommandTemplate::parse("run {param:missing}").unwrap();
        match template.render(&vars()) {
            Err(CommandError::Template(msg)) => assert!(msg.contains("{param:missing}")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_params_are_exposed() {
        let params = SectionParams::new("processor.POLYMER").with("water_model", "PR05");
        let mut vars = TemplateVars::new();
        vars.set_params(&params);

        let argv = CommandTemplate::parse("polymer --model={param:water_model}")
            .unwrap()
            .render(&vars)
            .unwrap();
        assert_eq!(argv[1], "--model=PR05");
    }

    #[test]
    fn test_placeholders_listed() {
        let template = CommandTemplate::parse("x {input} -o {output} {param:a}").unwrap();
        assert_eq!(template.placeholders(), vec!["input", "output", "param:a"]);
    }

    #[test]
    fn test_empty_template_rejected() {
        assert!(matches!(CommandTemplate::parse("  "), Err(CommandError::Template(_))));
    }

    #[test]
    fn test_spec_from_params() {
        let params = SectionParams::new("processor.OC3")
            .with("command", "oc3 {input} {output}")
            .with("attempts", "2")
            .with("timeout_secs", "60");
        let spec = CommandSpec::from_params(&params).unwrap();
        assert_eq!(spec.attempts(), 2);
        assert_eq!(spec.timeout(), Duration::from_secs(60));

        let missing = CommandSpec::from_params(&SectionParams::new("processor.OC3"));
        assert!(matches!(missing, Err(ConfigurationError::MissingKey { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_writes_output() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out.txt");
        let mut vars = TemplateVars::new();
        vars.set_path("output", &output);

        let spec = CommandSpec::new(
            CommandTemplate::parse("touch {output}").unwrap(),
            1,
            Duration::from_secs(10),
        );
        spec.run("touch", &vars).await.unwrap();

        assert!(output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_exit_status() {
        let spec = CommandSpec::new(CommandTemplate::parse("false").unwrap(), 2, Duration::from_secs(10));
        let result = spec.run("false", &TemplateVars::new()).await;
        assert!(matches!(result, Err(CommandError::Exit { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_times_out() {
        let spec = CommandSpec::new(
            CommandTemplate::parse("sleep 5").unwrap(),
            1,
            Duration::from_millis(100),
        );
        let result = spec.run("sleep", &TemplateVars::new()).await;
        assert!(matches!(result, Err(CommandError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let spec = CommandSpec::new(
            CommandTemplate::parse("sencast-no-such-program-xyz").unwrap(),
            1,
            Duration::from_secs(1),
        );
        let result = spec.run("missing", &TemplateVars::new()).await;
        assert!(matches!(result, Err(CommandError::Spawn { .. })));
    }
}
