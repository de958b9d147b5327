//! Command-line argument parsing

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "docker-manifest-client")]
#[command(about = "Fetch image manifests from Docker Registry v2 registries")]
#[command(version)]
pub struct Args {
    /// Image references, e.g. `debian:bullseye-slim` or `ghcr.io/github/super-linter:v3`
    #[arg(required = true, value_name = "IMAGE")]
    pub images: Vec<String>,

    /// Registry username
    #[arg(
        long = "username",
        short = 'u',
        help = "Username for registry authentication"
    )]
    pub username: Option<String>,

    /// Registry password
    #[arg(
        long = "password",
        short = 'p',
        help = "Password for registry authentication"
    )]
    pub password: Option<String>,

    /// Host the credentials belong to
    #[arg(
        long = "login-host",
        default_value = crate::image::reference::DOCKER_HUB_HOST,
        help = "Registry host the credentials are used for"
    )]
    pub login_host: String,

    /// Hosts reached over plain HTTP
    #[arg(
        long = "insecure",
        value_name = "HOST",
        help = "Registry host to reach over plain HTTP (repeatable)"
    )]
    pub insecure: Vec<String>,

    /// Timeout in seconds for network operations
    #[arg(
        long = "timeout",
        short = 't',
        help = "Timeout for network operations in seconds"
    )]
    pub timeout: Option<u64>,

    /// Output format for results
    #[arg(long = "output", short = 'o', value_enum, default_value = "json")]
    pub output: OutputFormat,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet output
    #[arg(
        long = "quiet",
        short = 'q',
        conflicts_with = "verbose",
        help = "Only print manifests and errors"
    )]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        match (&self.username, &self.password) {
            (Some(_), None) => {
                return Err("Password is required when username is provided".to_string());
            }
            (None, Some(_)) => {
                return Err("Username is required when password is provided".to_string());
            }
            _ => {}
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.images.iter().any(|image| image.trim().is_empty()) {
            return Err("Image references cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let args =
            Args::try_parse_from(["docker-manifest-client", "alpine", "ghcr.io/a/b:v1"]).unwrap();
        assert_eq!(args.images, vec!["alpine", "ghcr.io/a/b:v1"]);
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.login_host, crate::image::reference::DOCKER_HUB_HOST);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_options() {
        let args = Args::try_parse_from([
            "docker-manifest-client",
            "-o",
            "text",
            "--insecure",
            "localhost:5000",
            "--insecure",
            "127.0.0.1:5001",
            "-t",
            "10",
            "-v",
            "localhost:5000/app",
        ])
        .unwrap();
        assert_eq!(args.output, OutputFormat::Text);
        assert_eq!(args.insecure.len(), 2);
        assert_eq!(args.timeout, Some(10));
        assert!(args.verbose);
    }

    #[test]
    fn test_validate_rejects_partial_credentials() {
        let args = Args::try_parse_from(["docker-manifest-client", "-u", "me", "alpine"]).unwrap();
        assert!(args.validate().is_err());

        let args = Args::try_parse_from(["docker-manifest-client", "-t", "0", "alpine"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_requires_an_image() {
        assert!(Args::try_parse_from(["docker-manifest-client"]).is_err());
        assert!(Args::try_parse_from(["docker-manifest-client", "-v", "-q", "alpine"]).is_err());
    }
}
