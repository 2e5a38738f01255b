use crate::constants::{
    ANY_ORIGIN, DEFAULT_ASSETS_DIR, DEFAULT_ENVIRONMENT, DEFAULT_HOST, DEFAULT_IPFS_CONFIG,
    DEFAULT_PORT, PRODUCTION_ENVIRONMENT,
};
use crate::integrity::ExpectedTree;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::http::Uri;
use cid::Cid;
use clap::{Args, Parser, Subcommand};
use ipfs::IpfsSettings;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "uploader")]
#[command(about = "Uploads NFT metadata into the IPFS mutable file system")]
pub struct Cli {
    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Verify the IPFS tree and serve the upload API (default)
    Serve,
    /// Only verify the IPFS tree against the expected CIDs
    Verify,
    /// Pin a CID or ipfs:// URI on the configured remote pinning service
    Pin {
        /// CID or ipfs:// URI
        cid: String,
    },
    /// Print the content of a CID or ipfs:// URI to stdout
    Cat {
        /// CID or ipfs:// URI
        cid: String,
    },
}

/// Settings read from flags or environment variables
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Server host
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Server port
    #[arg(long, env = "PORT", default_value = DEFAULT_PORT)]
    pub port: u16,

    /// Environment name; "production" hides stack traces from error responses
    #[arg(long = "env", env = "NODE_ENV", default_value = DEFAULT_ENVIRONMENT)]
    pub environment: String,

    /// Allowed CORS origin ("*" for any)
    #[arg(long, env = "ALLOW_ORIGIN", default_value = ANY_ORIGIN)]
    pub allow_origin: String,

    /// Name of the header carrying the API key
    #[arg(long, env = "API_HEADER")]
    pub api_header: Option<String>,

    /// Expected API key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Name of the images directory under the IPFS root
    #[arg(long, env = "IMAGES_DIR")]
    pub images_dir: Option<String>,

    /// Name of the animation directory under the IPFS root
    #[arg(long, env = "ANIMATION_DIR")]
    pub animation_dir: Option<String>,

    /// Expected CID of the IPFS root directory
    #[arg(long, env = "ROOT_DIR_CID")]
    pub root_dir_cid: Option<String>,

    /// Expected CID of the images directory
    #[arg(long, env = "IMAGES_DIR_CID")]
    pub images_dir_cid: Option<String>,

    /// Expected CID of the animation directory
    #[arg(long, env = "ANIMATION_DIR_CID")]
    pub animation_dir_cid: Option<String>,

    /// Directory containing json/<token_id>.json metadata documents
    #[arg(long, env = "ASSETS_DIR", default_value = DEFAULT_ASSETS_DIR)]
    pub assets_dir: PathBuf,

    /// IPFS settings file (API URL, gateway URL, pinning service)
    #[arg(long, env = "IPFS_CONFIG", default_value = DEFAULT_IPFS_CONFIG)]
    pub ipfs_config: PathBuf,
}

/// Configuration errors, reported before anything touches IPFS
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is not a valid CID ({value}): {reason}")]
    InvalidCid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("API_HEADER is not a valid header name: {0}")]
    InvalidHeader(String),

    #[error("ALLOW_ORIGIN is not a valid origin: {0}")]
    InvalidOrigin(String),

    #[error("{0:#}")]
    IpfsSettings(anyhow::Error),
}

/// Server configuration, built once at startup and never mutated
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Environment name (NODE_ENV)
    pub environment: String,
    /// Allowed CORS origin
    pub allow_origin: String,
    /// Header carrying the API key
    pub api_header: HeaderName,
    /// Expected API key
    pub api_key: String,
    /// Directory names and CIDs verified at startup
    pub tree: ExpectedTree,
    /// Directory containing json/<token_id>.json
    pub assets_dir: PathBuf,
    /// IPFS daemon and pinning service settings
    pub ipfs: IpfsSettings,
}

impl ServerConfig {
    pub fn load(args: &SettingsArgs) -> Result<Self, ConfigError> {
        let api_header = required("API_HEADER", &args.api_header)?;
        let api_header = HeaderName::from_bytes(api_header.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(api_header.to_string()))?;

        // Must be usable both as a header value and as the URI the CORS layer parses
        if args.allow_origin != ANY_ORIGIN
            && (args.allow_origin.contains('*')
                || HeaderValue::from_str(&args.allow_origin).is_err()
                || args.allow_origin.parse::<Uri>().is_err())
        {
            return Err(ConfigError::InvalidOrigin(args.allow_origin.clone()));
        }

        let tree = ExpectedTree {
            images_dir: required("IMAGES_DIR", &args.images_dir)?.to_string(),
            animation_dir: required("ANIMATION_DIR", &args.animation_dir)?.to_string(),
            root_cid: required_cid("ROOT_DIR_CID", &args.root_dir_cid)?,
            images_cid: required_cid("IMAGES_DIR_CID", &args.images_dir_cid)?,
            animation_cid: required_cid("ANIMATION_DIR_CID", &args.animation_dir_cid)?,
        };

        Ok(ServerConfig {
            host: args.host.clone(),
            port: args.port,
            environment: args.environment.clone(),
            allow_origin: args.allow_origin.clone(),
            api_header,
            api_key: required("API_KEY", &args.api_key)?.to_string(),
            tree,
            assets_dir: args.assets_dir.clone(),
            ipfs: load_ipfs_settings(args)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_production(&self) -> bool {
        self.environment == PRODUCTION_ENVIRONMENT
    }
}

/// IPFS settings alone, for commands that do not serve
pub fn load_ipfs_settings(args: &SettingsArgs) -> Result<IpfsSettings, ConfigError> {
    IpfsSettings::load(&args.ipfs_config).map_err(ConfigError::IpfsSettings)
}

fn required<'a>(name: &'static str, value: &'a Option<String>) -> Result<&'a str, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// The CID is kept as configured; comparisons at startup are plain string comparisons
fn required_cid(name: &'static str, value: &Option<String>) -> Result<String, ConfigError> {
    let value = required(name, value)?;
    Cid::from_str(value).map_err(|e| ConfigError::InvalidCid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    Ok(value.to_string())
}


#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;

    fn parse(extra: &[&str]) -> SettingsArgs {
        let mut argv = vec![
            "uploader",
            "--api-header",
            "X-Api-Key",
            "--api-key",
            API_KEY,
            "--images-dir",
            "images",
            "--animation-dir",
            "animation",
            "--root-dir-cid",
            ROOT_CID,
            "--images-dir-cid",
            IMAGES_CID,
            "--animation-dir-cid",
            ANIMATION_CID,
            "--ipfs-config",
            "does/not/exist.toml",
        ];
        argv.extend_from_slice(extra);
        Cli::try_parse_from(argv).unwrap().settings
    }

    #[test]
    fn test_load_complete_config() {
        let config = ServerConfig::load(&parse(&["--port", "3000", "--env", "development"])).unwrap();
        assert_eq!(config.api_header.as_str(), "x-api-key");
        assert_eq!(config.port, 3000);
        assert!(config.bind_address().ends_with(":3000"));
        assert_eq!(config.tree, expected_tree());
        assert_eq!(config.ipfs, IpfsSettings::default());
        assert!(!config.is_production());
    }

    #[test]
    fn test_production_mode() {
        let config = ServerConfig::load(&parse(&["--env", "production"])).unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_missing_api_key() {
        let mut args = parse(&[]);
        args.api_key = Some("  ".to_string());
        let err = ServerConfig::load(&args).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("API_KEY")));
    }

    #[test]
    fn test_invalid_cid() {
        let mut args = parse(&[]);
        args.images_dir_cid = Some("not-a-cid".to_string());
        let err = ServerConfig::load(&args).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidCid {
                name: "IMAGES_DIR_CID",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_header_name() {
        let mut args = parse(&[]);
        args.api_header = Some("x api key".to_string());
        assert!(matches!(
            ServerConfig::load(&args).unwrap_err(),
            ConfigError::InvalidHeader(_)
        ));
    }

    #[test]
    fn test_wildcard_subdomain_origin_rejected() {
        let err = ServerConfig::load(&parse(&["--allow-origin", "https://*.example.com"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrigin(_)));
    }

    #[test]
    fn test_origin_that_is_not_a_uri_rejected() {
        let err = ServerConfig::load(&parse(&["--allow-origin", "http://a b"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrigin(origin) if origin == "http://a b"));
    }

    #[test]
    fn test_explicit_origin_accepted() {
        let config = ServerConfig::load(&parse(&["--allow-origin", "https://mint.example.com"])).unwrap();
        assert_eq!(config.allow_origin, "https://mint.example.com");
    }
}
