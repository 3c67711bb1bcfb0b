//! Process configuration
//!
//! Everything is read once at startup from flags or environment variables
//! and validated into an immutable [`Config`] that is passed to the webhook.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use zeroize::Zeroizing;

use crate::namespaces::DEFAULT_NAMESPACE_FILE;
use crate::updater::{CacheBusterHook, NoopHook, PostUpdateHook};
use crate::Error;

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

/// ExternalSecret updater - reloads ExternalSecrets on secret-manager events
#[derive(Parser, Debug)]
#[command(name = "externalsecret-updater", version, about, long_about = None)]
pub struct Cli {
    /// Username required by the webhook's basic authentication
    #[arg(long, env = "BASIC_AUTH_USER", hide_env_values = true)]
    pub basic_auth_user: Option<String>,

    /// Password required by the webhook's basic authentication
    #[arg(long, env = "BASIC_AUTH_PASSWORD", hide_env_values = true)]
    pub basic_auth_password: Option<String>,

    /// Update each matched ExternalSecret a second time after a delay.
    /// Only the exact value "true" enables it.
    #[arg(
        long,
        env = "ENABLE_CACHE_BUSTER",
        action = ArgAction::Set,
        default_value = "false",
        value_parser = parse_enable_flag
    )]
    pub enable_cache_buster: bool,

    /// Delay before the second update (e.g. "2s", "500ms", "1m30s")
    #[arg(long, env = "CACHE_BUSTER_WAIT_INTERVAL")]
    pub cache_buster_wait_interval: Option<String>,

    /// Address the webhook server listens on
    #[arg(long, env = "LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Kubeconfig used when in-cluster credentials are unavailable
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// File holding the pod's namespace, used when namespaces cannot be listed
    #[arg(long, env = "POD_NAMESPACE_FILE", default_value = DEFAULT_NAMESPACE_FILE)]
    pub namespace_file: PathBuf,
}

fn parse_enable_flag(value: &str) -> Result<bool, String> {
    Ok(value == "true")
}

/// Basic-auth credentials accepted by the webhook
#[derive(Clone)]
pub struct WebhookCredentials {
    /// Expected username
    pub username: String,
    /// Expected password, wiped from memory on drop
    pub password: Zeroizing<String>,
}

impl std::fmt::Debug for WebhookCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Cache-buster settings
#[derive(Debug, Clone, Default)]
pub struct CacheBusterConfig {
    /// Whether the second update runs at all
    pub enabled: bool,
    /// Raw wait interval text, parsed on use
    pub wait_interval: Option<String>,
}

impl CacheBusterConfig {
    /// Post-update strategy for these settings
    pub fn post_update_hook(&self) -> Arc<dyn PostUpdateHook> {
        if self.enabled {
            Arc::new(CacheBusterHook::new(self.wait_interval.clone()))
        } else {
            Arc::new(NoopHook)
        }
    }
}

/// Validated process configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Webhook basic-auth credentials
    pub credentials: WebhookCredentials,
    /// Cache-buster settings
    pub cache_buster: CacheBusterConfig,
    /// HTTP listen address
    pub listen_addr: SocketAddr,
    /// Optional kubeconfig path for local development
    pub kubeconfig: Option<PathBuf>,
    /// Pod namespace file used as the namespace fallback
    pub namespace_file: PathBuf,
}

impl TryFrom<Cli> for Config {
    type Error = Error;

    fn try_from(cli: Cli) -> Result<Self, Error> {
        let username = cli.basic_auth_user.filter(|s| !s.is_empty());
        let password = cli.basic_auth_password.filter(|s| !s.is_empty());

        let (Some(username), Some(password)) = (username, password) else {
            return Err(Error::config(
                "BASIC_AUTH_USER and BASIC_AUTH_PASSWORD environment variables must be set",
            ));
        };

        Ok(Self {
            credentials: WebhookCredentials {
                username,
                password: Zeroizing::new(password),
            },
            cache_buster: CacheBusterConfig {
                enabled: cli.enable_cache_buster,
                wait_interval: cli.cache_buster_wait_interval,
            },
            listen_addr: cli.listen_addr,
            kubeconfig: cli.kubeconfig,
            namespace_file: cli.namespace_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["externalsecret-updater"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    #[test]
    fn credentials_are_required() {
        let cli = parse(&["--basic-auth-user", "hook"]);
        let err = Config::try_from(cli).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("BASIC_AUTH_PASSWORD"));
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let cli = parse(&["--basic-auth-user", "", "--basic-auth-password", "secret"]);
        assert!(Config::try_from(cli).is_err());
    }

    #[test]
    fn valid_config_uses_defaults() {
        let cli = parse(&["--basic-auth-user", "hook", "--basic-auth-password", "secret"]);
        let config = Config::try_from(cli).unwrap();

        assert_eq!(config.credentials.username, "hook");
        assert_eq!(config.credentials.password.as_str(), "secret");
        assert!(!config.cache_buster.enabled);
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(config.namespace_file, PathBuf::from(DEFAULT_NAMESPACE_FILE));
    }

    #[test]
    fn debug_output_redacts_password() {
        let creds = WebhookCredentials {
            username: "hook".to_string(),
            password: Zeroizing::new("hunter2".to_string()),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("hook"));
        assert!(!debug.contains("hunter2"));
    }

    // =========================================================================
    // Cache buster flag and interval
    // =========================================================================

    #[test]
    fn only_exact_true_enables_cache_buster() {
        let base = ["--basic-auth-user", "u", "--basic-auth-password", "p"];
        for (value, expected) in [("true", true), ("TRUE", false), ("1", false), ("yes", false)] {
            let mut args = base.to_vec();
            args.extend_from_slice(&["--enable-cache-buster", value]);
            assert_eq!(parse(&args).enable_cache_buster, expected, "value {value}");
        }
    }

    #[test]
    fn wait_interval_is_kept_as_raw_text() {
        let cli = parse(&[
            "--basic-auth-user",
            "u",
            "--basic-auth-password",
            "p",
            "--enable-cache-buster",
            "true",
            "--cache-buster-wait-interval",
            "not-a-duration",
        ]);
        let config = Config::try_from(cli).unwrap();

        assert!(config.cache_buster.enabled);
        // parsed (and validated) per use by the cache-buster hook
        assert_eq!(
            config.cache_buster.wait_interval.as_deref(),
            Some("not-a-duration")
        );
    }
}
