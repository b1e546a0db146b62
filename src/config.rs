// Configuration: CLI flags, environment fallbacks, interactive fill
//
// Priority is CLI > ENV > default. A .env file in the working directory is
// honored. When the session details are missing and stdin is a terminal,
// the user is prompted for them instead of being shown a usage error.

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Input, Password};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::http_client::{DEFAULT_BASE_URL, MOBILE_USER_AGENT};
use crate::records::RecordPath;

/// Export Tata 1mg health-record lab reports to CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Cookie header value from an authenticated 1mg browser session
    #[arg(long, env = "ONEMG_COOKIE", hide_env_values = true)]
    pub cookie: Option<String>,

    /// Member ID from the /health-record page URL
    #[arg(short = 'm', long, env = "ONEMG_MEMBER_ID")]
    pub member_id: Option<String>,

    /// Report ID from the /health-record/<member-id> page (repeatable or comma-separated)
    #[arg(short = 'r', long = "report-id", env = "ONEMG_REPORT_IDS", value_delimiter = ',')]
    pub report_ids: Vec<String>,

    /// Output CSV path (omit to write to stdout)
    #[arg(short = 'o', long, env = "ONEMG_OUT")]
    pub out: Option<String>,

    /// Dot-separated path to the record arrays in the response; `*` fans out over an array
    #[arg(long, env = "ONEMG_RECORDS_PATH", default_value = "data.parameters.*.values")]
    pub records_path: String,

    /// Export only these columns, in this order (comma-separated)
    #[arg(long, env = "ONEMG_FIELDS", value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Vendor endpoint base URL
    #[arg(long, env = "ONEMG_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// User-Agent header (the default impersonates Chrome on iOS)
    #[arg(long, env = "ONEMG_USER_AGENT", default_value = MOBILE_USER_AGENT)]
    pub user_agent: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "ONEMG_HTTP_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ONEMG_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl CliArgs {
    /// True when the session details are incomplete and a prompt could help
    fn missing_credentials(&self) -> bool {
        self.cookie.is_none() || self.member_id.is_none() || self.report_ids.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Session identity
    pub cookie: String,
    pub member_id: String,
    pub report_ids: Vec<String>,

    // Output
    pub out: Option<PathBuf>,

    // Response shape
    pub records_path: RecordPath,
    pub fields: Vec<String>,

    // HTTP client
    pub base_url: String,
    pub user_agent: String,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,

    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut args = CliArgs::parse();

        // Only prompt when someone is actually there to answer
        if args.missing_credentials() && std::io::stdin().is_terminal() {
            fill_credentials_interactively(&mut args)?;
        }

        Self::from_args(args)
    }

    fn from_args(args: CliArgs) -> Result<Self> {
        let config = Config {
            cookie: args
                .cookie
                .context("--cookie is required (or set ONEMG_COOKIE)")?,

            member_id: args
                .member_id
                .context("--member-id is required (or set ONEMG_MEMBER_ID)")?,

            report_ids: clean_list(args.report_ids),

            out: args.out.map(|s| expand_tilde(&s)),

            records_path: RecordPath::parse(&args.records_path)?,

            fields: clean_list(args.fields),

            base_url: args.base_url,

            user_agent: args.user_agent,

            // Env-only setting, alongside the flag-backed ones
            http_connect_timeout: std::env::var("ONEMG_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            http_request_timeout: args.http_timeout,

            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cookie.trim().is_empty() {
            anyhow::bail!("the session cookie is empty");
        }

        if self.member_id.trim().is_empty() {
            anyhow::bail!("the member ID is empty");
        }

        if self.report_ids.is_empty() {
            anyhow::bail!("at least one report ID is required (use --report-id or set ONEMG_REPORT_IDS)");
        }

        if self.http_request_timeout == 0 {
            anyhow::bail!("--http-timeout must be at least 1");
        }

        Ok(())
    }
}

/// Prompt for whichever session details are still missing
///
/// Prompts go to stderr so stdout stays clean for the CSV. The cookie is
/// read password-style: it is a live session secret.
fn fill_credentials_interactively(args: &mut CliArgs) -> Result<()> {
    eprintln!();
    eprintln!("Missing session details. Grab them from an authenticated 1mg browser");
    eprintln!("tab that uses a mobile User-Agent (see README), then paste them here.");
    eprintln!();

    if args.cookie.is_none() {
        let cookie: String = Password::new()
            .with_prompt("Cookie header value")
            .interact()
            .context("failed to read cookie")?;
        args.cookie = Some(cookie);
    }

    if args.member_id.is_none() {
        let member_id: String = Input::new()
            .with_prompt("Member ID (from the /health-record page URL)")
            .interact_text()
            .context("failed to read member ID")?;
        args.member_id = Some(member_id);
    }

    if args.report_ids.is_empty() {
        let ids: String = Input::new()
            .with_prompt("Report IDs, comma-separated (from /health-record/<member-id>)")
            .interact_text()
            .context("failed to read report IDs")?;
        args.report_ids = ids.split(',').map(str::to_string).collect();
    }

    eprintln!();

    Ok(())
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

/// Trim list entries and drop the empty ones
fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            cookie: Some("session=abc123".to_string()),
            member_id: Some("m-42".to_string()),
            report_ids: vec!["r1".to_string()],
            out: None,
            records_path: "data.parameters.*.values".to_string(),
            fields: vec![],
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: MOBILE_USER_AGENT.to_string(),
            http_timeout: 30,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/file.csv");
        assert!(path.to_string_lossy().contains("test/file.csv"));
        assert!(!path.to_string_lossy().starts_with("~"));

        let path = expand_tilde("/absolute/path.csv");
        assert_eq!(path, PathBuf::from("/absolute/path.csv"));
    }

    #[test]
    fn test_expand_tilde_relative_path() {
        let path = expand_tilde("relative/path.csv");
        assert_eq!(path, PathBuf::from("relative/path.csv"));
    }

    #[test]
    fn test_expand_tilde_just_tilde() {
        // Just "~" without slash should not expand
        let path = expand_tilde("~");
        assert_eq!(path, PathBuf::from("~"));
    }

    #[test]
    fn test_clean_list_trims_and_drops_empties() {
        let values = vec![
            " r1 ".to_string(),
            "".to_string(),
            "r2".to_string(),
            "   ".to_string(),
        ];
        assert_eq!(clean_list(values), vec!["r1", "r2"]);
    }

    #[test]
    fn test_report_ids_split_on_commas() {
        let args = CliArgs::try_parse_from([
            "onemg-exporter",
            "--cookie",
            "c",
            "--member-id",
            "m",
            "--report-id",
            "r1,r2",
            "--report-id",
            "r3",
        ])
        .unwrap();
        assert_eq!(args.report_ids, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_fields_split_on_commas() {
        let args = CliArgs::try_parse_from([
            "onemg-exporter",
            "--fields",
            "name,date,id",
        ])
        .unwrap();
        assert_eq!(args.fields, vec!["name", "date", "id"]);
    }

    #[test]
    fn test_from_args_builds_config() {
        let config = Config::from_args(base_args()).unwrap();
        assert_eq!(config.cookie, "session=abc123");
        assert_eq!(config.member_id, "m-42");
        assert_eq!(config.report_ids, vec!["r1"]);
        assert_eq!(config.records_path.to_string(), "data.parameters.*.values");
        assert!(config.out.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_args_requires_cookie() {
        let mut args = base_args();
        args.cookie = None;
        let err = Config::from_args(args).unwrap_err();
        assert!(err.to_string().contains("--cookie"));
    }

    #[test]
    fn test_from_args_requires_member_id() {
        let mut args = base_args();
        args.member_id = None;
        let err = Config::from_args(args).unwrap_err();
        assert!(err.to_string().contains("--member-id"));
    }

    #[test]
    fn test_from_args_rejects_bad_records_path() {
        let mut args = base_args();
        args.records_path = "data..values".to_string();
        assert!(Config::from_args(args).is_err());
    }

    #[test]
    fn test_from_args_expands_out_path() {
        let mut args = base_args();
        args.out = Some("~/exports/labs.csv".to_string());
        let config = Config::from_args(args).unwrap();
        let out = config.out.unwrap();
        assert!(!out.to_string_lossy().starts_with("~"));
        assert!(out.to_string_lossy().ends_with("exports/labs.csv"));
    }

    #[test]
    fn test_validate_rejects_blank_cookie() {
        let mut args = base_args();
        args.cookie = Some("   ".to_string());
        let config = Config::from_args(args).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cookie"));
    }

    #[test]
    fn test_validate_requires_report_ids() {
        let mut args = base_args();
        args.report_ids = vec!["  ".to_string()];
        let config = Config::from_args(args).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("report ID"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut args = base_args();
        args.http_timeout = 0;
        let config = Config::from_args(args).unwrap();
        assert!(config.validate().is_err());
    }
}
