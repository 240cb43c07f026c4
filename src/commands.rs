//! CLI command definitions
//!
//! Defines the clap commands for the restprobe CLI.

use clap::{Args, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenarios defined in YAML files (concurrently, one context each)
    Run {
        /// Paths to YAML scenario files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Print the reports as JSON instead of text
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Check scenario files without sending any request
    Validate {
        /// Paths to YAML scenario files
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Run the built-in create/read/update/delete scenario for /objects
    Objects {
        /// Also check how many objects the listing returns
        #[arg(long)]
        expected_count: Option<usize>,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        options: RunOptions,
    },
}

/// Options shared by the commands that build scenarios
#[derive(Args, Debug, Default)]
pub struct RunOptions {
    /// Base URL exposed to scenarios as {{base_url}} (overrides the config file)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Set a scenario variable: --var fixedId=ff80 (JSON values are parsed)
    /// Can be specified multiple times
    #[arg(long = "var", value_parser = parse_var)]
    pub vars: Vec<(String, Value)>,

    /// Default request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Parse `name=value`, reading the value as JSON when it is valid JSON
pub fn parse_var(s: &str) -> Result<(String, Value), String> {
    let (name, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{}'", s));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_var_string_and_json() {
        assert_eq!(
            parse_var("fixedId=ff808181932badb60194cca874214129").unwrap(),
            ("fixedId".to_string(), json!("ff808181932badb60194cca874214129"))
        );
        assert_eq!(parse_var("count=13").unwrap(), ("count".to_string(), json!(13)));
        assert_eq!(
            parse_var("url=http://x/?a=b").unwrap(),
            ("url".to_string(), json!("http://x/?a=b"))
        );
    }

    #[test]
    fn test_parse_var_rejects_malformed() {
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=1").is_err());
    }
}
