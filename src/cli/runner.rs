//! Runner for the command-line tool

use crate::cli::args::{Args, OutputFormat};
use crate::config::{ClientConfig, Protocol};
use crate::error::{RegistryError, Result};
use crate::image::manifest::ManifestDocument;
use crate::logging::Logger;
use crate::registry::RegistryClient;
use futures::future::join_all;
use std::time::Duration;

pub struct Runner {
    args: Args,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        args.validate().map_err(RegistryError::Validation)?;

        let output = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };

        Ok(Self { args, output })
    }

    /// Fetches every image concurrently through one client. Returns the number
    /// of images that failed.
    pub async fn run(&self) -> Result<usize> {
        self.output.section("Docker Manifest Client");
        let client = self.create_client()?;
        self.output
            .info(&format!("Fetching {} manifest(s)", self.args.images.len()));

        let fetches = self.args.images.iter().map(|image| {
            let client = &client;
            async move { (image, client.get_manifest(image).await) }
        });
        let results = join_all(fetches).await;

        let mut failed = 0;
        for (image, result) in results {
            match result {
                Ok(manifest) => self.print_manifest(image, &manifest)?,
                Err(err) => {
                    failed += 1;
                    self.output.error(&format!("{}: {}", image, err));
                }
            }
        }

        if failed == 0 {
            self.output.success("All manifests fetched");
        } else {
            self.output.warning(&format!(
                "{} of {} manifest(s) could not be fetched",
                failed,
                self.args.images.len()
            ));
        }

        self.output.summary_kv(
            "Summary",
            &[
                ("Images", self.args.images.len().to_string()),
                ("Failed", failed.to_string()),
                ("Elapsed", self.output.format_duration(self.output.elapsed())),
            ],
        );
        Ok(failed)
    }

    fn create_client(&self) -> Result<RegistryClient> {
        let mut config = ClientConfig::from_env()?;
        if let Some(secs) = self.args.timeout {
            config = config.with_timeout(Duration::from_secs(secs))?;
        }
        if !self.args.insecure.is_empty() {
            let mut hosts = self.args.insecure.clone();
            if let Protocol::HttpsExcept(from_env) = &config.protocol {
                hosts.extend(from_env.iter().cloned());
            }
            config = config.with_protocol(Protocol::HttpsExcept(hosts));
        }

        let client = RegistryClient::builder()
            .with_config(config)
            .with_output(self.output.clone())
            .build()?;

        if let (Some(username), Some(password)) = (&self.args.username, &self.args.password) {
            client.login(&self.args.login_host, username, password)?;
        }
        Ok(client)
    }

    fn print_manifest(&self, image: &str, manifest: &ManifestDocument) -> Result<()> {
        match self.args.output {
            OutputFormat::Json => {
                let line = serde_json::json!({ "image": image, "manifest": manifest });
                println!("{}", serde_json::to_string(&line)?);
            }
            OutputFormat::Text => {
                println!("{} ({})", image, manifest.media_type());
                match manifest {
                    ManifestDocument::List(list) => {
                        for entry in &list.manifests {
                            let platform = entry
                                .platform
                                .as_ref()
                                .map(|p| match &p.variant {
                                    Some(variant) => {
                                        format!("{}/{}/{}", p.os, p.architecture, variant)
                                    }
                                    None => format!("{}/{}", p.os, p.architecture),
                                })
                                .unwrap_or_else(|| "unknown".to_string());
                            println!("  {:<20} {}", platform, entry.digest);
                        }
                    }
                    ManifestDocument::Image(single) => {
                        println!("  config {}", single.config.digest);
                        for layer in &single.layers {
                            println!("  layer  {} ({} bytes)", layer.digest, layer.size);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
