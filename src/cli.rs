//! CLI argument parsing with clap.

use std::path::Path;

use clap::{Args, Parser, Subcommand};

use crate::encode::ImageSource;
use crate::request::Garment;

/// Virtual try-on: put garment photos on a person photo with hosted models.
#[derive(Parser, Debug)]
#[command(name = "fitloop", version, about)]
pub struct Cli {
    /// What to do.
    #[command(subcommand)]
    pub command: Command,

    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a try-on job and wait for the result.
    TryOn(TryOnArgs),
    /// Run the proxy that holds the Replicate key.
    Serve(ServeArgs),
    /// Ask a proxy whether it is up and has a key.
    Health(HealthArgs),
}

/// Arguments for `try-on`.
#[derive(Args, Debug)]
pub struct TryOnArgs {
    /// Photo of the person.
    #[arg(long)]
    pub person: String,

    /// Garment image as `PATH` or `NAME=PATH`. Repeat for several garments.
    #[arg(short, long = "garment")]
    pub garments: Vec<String>,

    /// Clothing category: shirts, jackets, pants, dresses.
    #[arg(short, long, default_value = "shirts")]
    pub category: String,

    /// Model name or short alias.
    #[arg(short, long, default_value = "nano-banana")]
    pub model: String,

    /// Proxy base URL.
    #[arg(long, conflicts_with = "direct")]
    pub proxy: Option<String>,

    /// Call Replicate directly with the configured key instead of a proxy.
    #[arg(long)]
    pub direct: bool,

    /// Delay before each status poll, in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: Option<u64>,

    /// Maximum number of status polls.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,

    /// Downscale images whose longer side exceeds this many pixels.
    #[arg(long, value_parser = clap::value_parser!(u32).range(16..))]
    pub max_dimension: Option<u32>,

    /// Download the result to this path.
    #[arg(short, long, conflicts_with = "save")]
    pub output: Option<String>,

    /// Download the result with a generated file name.
    #[arg(long)]
    pub save: bool,
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Interface to bind (defaults to the config value).
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (defaults to the config value).
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for `health`.
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Proxy base URL.
    #[arg(long)]
    pub proxy: Option<String>,
}

impl TryOnArgs {
    /// Read the person photo.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_person(&self) -> Result<ImageSource, std::io::Error> {
        read_image(&self.person)
    }

    /// Read every garment, naming unnamed ones after their file stem.
    ///
    /// # Errors
    ///
    /// Returns an error if a garment file cannot be read.
    pub fn read_garments(&self) -> Result<Vec<Garment>, std::io::Error> {
        self.garments
            .iter()
            .map(|arg| {
                let (name, path) = parse_garment_arg(arg);
                read_image(path).map(|image| Garment { name, image })
            })
            .collect()
    }

    /// Label used for generated output file names.
    #[must_use]
    pub fn output_label(&self) -> String {
        let names: Vec<String> =
            self.garments.iter().map(|arg| parse_garment_arg(arg).0).collect();
        if names.is_empty() {
            self.category.clone()
        } else {
            names.join(" ")
        }
    }
}

/// Split `NAME=PATH` into its parts; a bare path is named after its file stem.
#[must_use]
pub fn parse_garment_arg(arg: &str) -> (String, &str) {
    if let Some((name, path)) = arg.split_once('=') {
        if !name.trim().is_empty() && !path.is_empty() {
            return (name.trim().to_string(), path);
        }
    }
    let stem = Path::new(arg).file_stem().map(|s| s.to_string_lossy().into_owned());
    (stem.unwrap_or_default(), arg)
}

fn read_image(path: &str) -> Result<ImageSource, std::io::Error> {
    std::fs::read(path)
        .map(ImageSource::Bytes)
        .map_err(|e| std::io::Error::new(e.kind(), format!("{path}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn try_on(args: &[&str]) -> TryOnArgs {
        let mut full = vec!["fitloop", "try-on"];
        full.extend_from_slice(args);
        match Cli::parse_from(full).command {
            Command::TryOn(args) => args,
            other => panic!("expected try-on, got {other:?}"),
        }
    }

    #[test]
    fn default_values() {
        let args = try_on(&["--person", "me.jpg"]);
        assert_eq!(args.person, "me.jpg");
        assert!(args.garments.is_empty());
        assert_eq!(args.category, "shirts");
        assert_eq!(args.model, "nano-banana");
        assert!(args.proxy.is_none());
        assert!(!args.direct);
        assert!(args.interval_ms.is_none());
        assert!(args.max_attempts.is_none());
        assert!(args.output.is_none());
        assert!(!args.save);
    }

    #[test]
    fn all_options() {
        let cli = Cli::parse_from([
            "fitloop",
            "-v",
            "try-on",
            "--person",
            "me.jpg",
            "-g",
            "Blue Tee=tee.png",
            "--garment",
            "jacket.png",
            "-c",
            "jackets",
            "-m",
            "idm-vton",
            "--proxy",
            "http://proxy:3001/api",
            "--interval-ms",
            "500",
            "--max-attempts",
            "10",
            "--max-dimension",
            "1024",
            "-o",
            "out.jpg",
        ]);
        assert!(cli.verbose);
        let Command::TryOn(args) = cli.command else { panic!("expected try-on") };
        assert_eq!(args.garments, vec!["Blue Tee=tee.png", "jacket.png"]);
        assert_eq!(args.category, "jackets");
        assert_eq!(args.model, "idm-vton");
        assert_eq!(args.proxy.as_deref(), Some("http://proxy:3001/api"));
        assert_eq!(args.interval_ms, Some(500));
        assert_eq!(args.max_attempts, Some(10));
        assert_eq!(args.max_dimension, Some(1024));
        assert_eq!(args.output.as_deref(), Some("out.jpg"));
        assert_eq!(args.output_label(), "Blue Tee jacket");
    }

    #[test]
    fn zero_attempts_rejected() {
        let result =
            Cli::try_parse_from(["fitloop", "try-on", "--person", "me.jpg", "--max-attempts", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn proxy_conflicts_with_direct() {
        let result = Cli::try_parse_from([
            "fitloop", "try-on", "--person", "me.jpg", "--direct", "--proxy", "http://x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn serve_options() {
        let cli = Cli::parse_from(["fitloop", "serve", "--port", "8080"]);
        let Command::Serve(args) = cli.command else { panic!("expected serve") };
        assert_eq!(args.port, Some(8080));
        assert!(args.host.is_none());
    }

    #[test]
    fn garment_arg_parsing() {
        assert_eq!(parse_garment_arg("Blue Tee=shirts/tee.png"), ("Blue Tee".into(), "shirts/tee.png"));
        assert_eq!(parse_garment_arg("shirts/tee.png"), ("tee".into(), "shirts/tee.png"));
        assert_eq!(parse_garment_arg("=tee.png"), ("=tee".into(), "=tee.png"));
    }

    #[test]
    fn missing_garment_file_names_path() {
        let args = try_on(&["--person", "me.jpg", "-g", "/nonexistent/tee.png"]);
        let err = args.read_garments().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tee.png"));
    }

    #[test]
    fn reads_garment_files() {
        let dir = std::env::temp_dir().join("fitloop_cli_garment_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hoodie.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let args = try_on(&["--person", "me.jpg", "-g", path.to_str().unwrap()]);
        let garments = args.read_garments().unwrap();
        assert_eq!(garments[0].name, "hoodie");
        assert_eq!(garments[0].image.len(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
