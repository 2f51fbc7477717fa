// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{RawConfigFile, default_config_path};

/// Command-line arguments for `imgbatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "imgbatch",
    version,
    about = "Send a batch of images through a generative image model, newest first.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `imgbatch.toml` in the current working directory. A missing
    /// file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Prompt template; `{filename}` is replaced by each source's name
    /// without extension. Overrides `[queue].prompt_template`.
    #[arg(long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Group inputs two at a time into one task each.
    #[arg(long)]
    pub paired: bool,

    /// Directory results are written to.
    #[arg(long, value_name = "DIR", default_value = "imgbatch-out")]
    pub output: PathBuf,

    /// Sampling temperature (0.0 - 1.0).
    #[arg(long, value_name = "F")]
    pub temperature: Option<f32>,

    /// Ceiling on tasks in flight at once.
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Make a single attempt per task.
    #[arg(long)]
    pub no_retry: bool,

    /// Space dispatches by the stagger interval.
    #[arg(long)]
    pub stagger: bool,

    /// Process one task at a time.
    #[arg(long)]
    pub sequential: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `IMGBATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load config and inputs, print the planned tasks, but don't call the
    /// service.
    #[arg(long)]
    pub dry_run: bool,

    /// Image files or directories of images.
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,
}

impl CliArgs {
    /// Fold the flags that mirror `[queue]` keys into `raw`, before
    /// validation.
    pub fn apply_overrides(&self, raw: &mut RawConfigFile) {
        let queue = &mut raw.queue;
        if let Some(prompt) = &self.prompt {
            queue.prompt_template = prompt.clone();
        }
        if let Some(temperature) = self.temperature {
            queue.temperature = temperature;
        }
        if let Some(max) = self.max_concurrency {
            queue.max_concurrency = max;
        }
        if self.no_retry {
            queue.auto_retry = false;
        }
        if self.stagger {
            queue.delay_between_dispatches = true;
        }
        if self.sequential {
            queue.concurrency = false;
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_queue_section() {
        let args = CliArgs::parse_from([
            "imgbatch",
            "--prompt",
            "make {filename} blue",
            "--temperature",
            "0.9",
            "--max-concurrency",
            "5",
            "--no-retry",
            "--stagger",
            "--sequential",
            "a.png",
        ]);
        let mut raw = RawConfigFile::default();
        args.apply_overrides(&mut raw);

        assert_eq!(raw.queue.prompt_template, "make {filename} blue");
        assert_eq!(raw.queue.temperature, 0.9);
        assert_eq!(raw.queue.max_concurrency, 5);
        assert!(!raw.queue.auto_retry);
        assert!(raw.queue.delay_between_dispatches);
        assert!(!raw.queue.concurrency);
    }

    #[test]
    fn absent_flags_leave_file_values() {
        let args = CliArgs::parse_from(["imgbatch", "in/"]);
        let mut raw = RawConfigFile::default();
        raw.queue.max_concurrency = 7;
        raw.queue.prompt_template = "from file".into();
        args.apply_overrides(&mut raw);

        assert_eq!(raw.queue.max_concurrency, 7);
        assert_eq!(raw.queue.prompt_template, "from file");
        assert!(raw.queue.auto_retry);
    }

    #[test]
    fn inputs_are_required() {
        assert!(CliArgs::try_parse_from(["imgbatch"]).is_err());
    }
}
