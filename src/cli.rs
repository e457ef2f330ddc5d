//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use outcall_core::{Action, Method};

/// Make one coordinated call to a remote HTTP API.
///
/// The call is retried on transient failures, spaced from earlier calls to
/// the same service (across processes), optionally archived, and the body is
/// printed to stdout.
#[derive(Parser, Debug)]
#[command(name = "outcall")]
#[command(author, version, about)]
pub struct Args {
    /// Target URL
    pub url: String,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// HTTP method (defaults to GET, or POST when a body is given)
    #[arg(short = 'X', long = "request")]
    pub method: Option<Method>,

    /// Extra request header line, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long = "data")]
    pub data: Option<String>,

    /// Basic auth credentials, `user:password` or `user`
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// Follow redirects (at most 5) instead of failing on them
    #[arg(short = 'L', long)]
    pub location: bool,

    /// CA certificate override, `host=path` (`*` matches any host; repeatable)
    #[arg(long = "cert")]
    pub certs: Vec<String>,

    /// Status action override, `code=action` with action one of success,
    /// repeat, break, redirected (repeatable)
    #[arg(long = "action", value_parser = parse_action_override)]
    pub actions: Vec<(u16, Action)>,

    /// Append the raw response to this file
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Gzip-compress the archive
    #[arg(long, requires = "archive")]
    pub gzip: bool,

    /// Parse the body as JSON and pretty-print it
    #[arg(long)]
    pub json: bool,

    /// Accept an empty response body
    #[arg(long)]
    pub allow_empty: bool,

    /// Service name shared by every caller that must be throttled together
    /// (defaults to the URL's host)
    #[arg(long)]
    pub identity: Option<String>,

    /// Minimum spacing between calls to the same service in milliseconds (0 to disable, max 60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub throttle_ms: Option<u64>,

    /// Maximum attempts for transient failures (1-10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Config file (defaults to $XDG_CONFIG_HOME/outcall/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Splits a `host=path` certificate override.
pub fn parse_cert_override(raw: &str) -> Option<(&str, &str)> {
    let (host, path) = raw.split_once('=')?;
    let (host, path) = (host.trim(), path.trim());
    (!host.is_empty() && !path.is_empty()).then_some((host, path))
}

/// Parses a `code=action` status override.
pub fn parse_action_override(raw: &str) -> Result<(u16, Action), String> {
    let (code, action) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected code=action, got '{raw}'"))?;
    let code = code
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("invalid status code '{code}': {e}"))?;
    let action = serde_json::from_value(serde_json::Value::String(action.trim().to_ascii_lowercase()))
        .map_err(|_| format!("unknown action '{action}'"))?;
    Ok((code, action))
}

/// The throttle identity seed: `--identity`, else the target URL's host.
pub fn service_identity(args: &Args) -> Option<String> {
    args.identity.clone().or_else(|| {
        url::Url::parse(&args.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
    })
}

/// Splits `user:password` credentials; a bare user has no password.
pub fn parse_credentials(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once(':') {
        Some((user, password)) => (user, Some(password)),
        None => (raw, None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const URL: &str = "https://api.example.com/v1/items";

    #[test]
    fn test_cli_minimal_args_parses_successfully() {
        let args = Args::try_parse_from(["outcall", URL]).unwrap();
        assert_eq!(args.url, URL);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.method.is_none());
        assert!(args.headers.is_empty());
        assert!(args.max_attempts.is_none());
    }

    #[test]
    fn test_cli_url_is_required() {
        let err = Args::try_parse_from(["outcall"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["outcall", "-vv", URL]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["outcall", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_method_parsed() {
        let args = Args::try_parse_from(["outcall", "-X", "put", URL]).unwrap();
        assert_eq!(args.method, Some(Method::Put));
    }

    #[test]
    fn test_cli_unknown_method_rejected() {
        let err = Args::try_parse_from(["outcall", "-X", "BREW", URL]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_repeatable_headers_and_certs() {
        let args = Args::try_parse_from([
            "outcall",
            "-H",
            "Accept: application/json",
            "-H",
            "X-Trace: 1",
            "--cert",
            "api.example.com=/certs/api.pem",
            "--cert",
            "*=/certs/any.pem",
            URL,
        ])
        .unwrap();
        assert_eq!(args.headers.len(), 2);
        assert_eq!(args.certs.len(), 2);
    }

    #[test]
    fn test_cli_gzip_requires_archive() {
        let err = Args::try_parse_from(["outcall", "--gzip", URL]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_max_attempts_range() {
        assert!(Args::try_parse_from(["outcall", "--max-attempts", "0", URL]).is_err());
        assert!(Args::try_parse_from(["outcall", "--max-attempts", "11", URL]).is_err());
        let args = Args::try_parse_from(["outcall", "--max-attempts", "10", URL]).unwrap();
        assert_eq!(args.max_attempts, Some(10));
    }

    #[test]
    fn test_cli_throttle_over_max_rejected() {
        let err = Args::try_parse_from(["outcall", "--throttle-ms", "60001", URL]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_parse_cert_override() {
        assert_eq!(
            parse_cert_override("api.example.com=/certs/api.pem"),
            Some(("api.example.com", "/certs/api.pem"))
        );
        assert_eq!(parse_cert_override("*=/certs/any.pem"), Some(("*", "/certs/any.pem")));
        assert_eq!(parse_cert_override("no-separator"), None);
        assert_eq!(parse_cert_override("=/path"), None);
    }

    #[test]
    fn test_cli_action_overrides() {
        let args =
            Args::try_parse_from(["outcall", "--action", "429=repeat", "--action", "404=SUCCESS", URL])
                .unwrap();
        assert_eq!(args.actions, vec![(429, Action::Repeat), (404, Action::Success)]);
    }

    #[test]
    fn test_parse_action_override_rejects_garbage() {
        assert!(parse_action_override("429").is_err());
        assert!(parse_action_override("abc=repeat").is_err());
        assert!(parse_action_override("429=later").is_err());
    }

    #[test]
    fn test_service_identity_defaults_to_host() {
        let billing = Args::try_parse_from(["outcall", "https://Billing.example.com/v1"]).unwrap();
        let search = Args::try_parse_from(["outcall", "https://search.example.com/v1"]).unwrap();
        assert_eq!(service_identity(&billing).as_deref(), Some("billing.example.com"));
        assert_eq!(service_identity(&search).as_deref(), Some("search.example.com"));

        let named =
            Args::try_parse_from(["outcall", "--identity", "billing-api", URL]).unwrap();
        assert_eq!(service_identity(&named).as_deref(), Some("billing-api"));

        let unparsable = Args::try_parse_from(["outcall", "not a url"]).unwrap();
        assert_eq!(service_identity(&unparsable), None);
    }

    #[test]
    fn test_parse_credentials() {
        assert_eq!(parse_credentials("alice:s3cr:et"), ("alice", Some("s3cr:et")));
        assert_eq!(parse_credentials("alice"), ("alice", None));
    }
}
