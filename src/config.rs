//! Configuration for Cardway
//!
//! CLI arguments and environment variable handling using clap. The
//! transport binary that fronts the engine parses these and hands them
//! to [`crate::db::MongoClient`] and [`crate::auth::TokenService`].

use clap::Parser;

/// Cardway - deck-fork propagation and review-scheduling engine
#[derive(Parser, Debug, Clone)]
#[command(name = "cardway")]
#[command(about = "Content-propagation and review-scheduling engine for shared flashcard decks")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "cardway")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_TTL_SECONDS", default_value = "900")]
    pub access_token_ttl_seconds: i64,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "REFRESH_TOKEN_TTL_SECONDS", default_value = "1209600")]
    pub refresh_token_ttl_seconds: i64,

    /// Enable development mode (permits a default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false", action = clap::ArgAction::Set)]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> String {
        if self.dev_mode {
            self.jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.jwt_secret
                .clone()
                .expect("JWT_SECRET is required in production mode")
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.access_token_ttl_seconds <= 0 || self.refresh_token_ttl_seconds <= 0 {
            return Err("token lifetimes must be positive".to_string());
        }

        if self.access_token_ttl_seconds > self.refresh_token_ttl_seconds {
            return Err("access token lifetime must not exceed refresh token lifetime".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["cardway", "--dev-mode", "true"])
    }

    #[test]
    fn test_dev_mode_default_secret() {
        let args = base_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.jwt_secret(), "dev-only-insecure-secret");
    }

    #[test]
    fn test_production_requires_secret() {
        let args = Args::parse_from(["cardway"]);
        assert!(args.validate().is_err());

        let args = Args::parse_from(["cardway", "--jwt-secret", "s3cret"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.jwt_secret(), "s3cret");
    }

    #[test]
    fn test_ttl_ordering() {
        let args = Args::parse_from([
            "cardway",
            "--dev-mode",
            "true",
            "--access-token-ttl-seconds",
            "3600",
            "--refresh-token-ttl-seconds",
            "60",
        ]);
        assert!(args.validate().is_err());
    }
}
