use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::explain::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, ExplainConfig};
use crate::matcher::DEFAULT_THRESHOLD;
use crate::storage::StoragePaths;

const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "healthcare-lookup")]
#[command(about = "Medicine and nearby-hospital lookup over static CSV datasets", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load both datasets and serve the HTTP API.
    Serve(ServeArgs),
    /// Resolve one medicine name and print the JSON result.
    Medicine(MedicineArgs),
    /// Search hospitals around a coordinate and print the JSON result.
    Hospitals(HospitalArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct DataArgs {
    /// Directory holding Medicine_Details.csv and hospital_directory.csv.
    #[arg(long, env = "HEALTHCARE_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Medicine catalog CSV (overrides <data_dir>/Medicine_Details.csv).
    #[arg(long, env = "MEDICINES_CSV")]
    pub medicines_csv: Option<String>,

    /// Hospital directory CSV (overrides <data_dir>/hospital_directory.csv).
    #[arg(long, env = "HOSPITALS_CSV")]
    pub hospitals_csv: Option<String>,
}

impl DataArgs {
    pub fn paths(&self) -> StoragePaths {
        StoragePaths::new(&self.data_dir)
            .with_overrides(self.medicines_csv.as_deref(), self.hospitals_csv.as_deref())
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExplainArgs {
    /// API key for the text-generation service.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Chat model used for explanations.
    #[arg(long, env = "GROQ_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long, env = "GROQ_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// Give up on an explanation after this many seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,
}

impl ExplainArgs {
    pub fn to_config(&self) -> ExplainConfig {
        ExplainConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub explain: ExplainArgs,

    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Minimum fuzzy score (0-100) accepted as a medicine match.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub threshold: u8,
}

#[derive(clap::Args, Debug, Clone)]
pub struct MedicineArgs {
    /// Medicine name as typed by the user.
    pub query: String,

    /// Also request a plain-language explanation.
    #[arg(long)]
    pub explain: bool,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub explain_opts: ExplainArgs,

    #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub threshold: u8,
}

#[derive(clap::Args, Debug, Clone)]
pub struct HospitalArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Search radius in kilometers (defaults to 10, or 25 with --limit).
    #[arg(long)]
    pub radius: Option<f64>,

    /// Return only the N nearest hospitals.
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub data: DataArgs,
}
