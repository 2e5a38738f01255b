/// Default server host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_PORT: &str = "8080";

/// Default directory holding `json/<token_id>.json` metadata documents
pub const DEFAULT_ASSETS_DIR: &str = "assets";

/// Default path of the IPFS settings file
pub const DEFAULT_IPFS_CONFIG: &str = "config/ipfs.toml";

/// Default environment name
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Environment name that hides stack traces and disables the access log
pub const PRODUCTION_ENVIRONMENT: &str = "production";

/// Default CORS origin (any)
pub const ANY_ORIGIN: &str = "*";

/// Methods allowed for cross-origin requests
pub const CORS_METHODS: [&str; 4] = ["GET", "PUT", "POST", "DELETE"];

/// Access log line: method, path, status, response size and latency
pub const ACCESS_LOG_FORMAT: &str = "\"%r\" %s %b - %D ms";
