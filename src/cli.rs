use crate::blade::BladeKind;
use crate::config::MIN_REFRESH_MS;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "axe",
    version,
    about = "A terminal dashboard for Rio and Kubernetes resources."
)]
pub struct CliArgs {
    /// Path to the kubeconfig used for API discovery and container lookups
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Control plane to browse; defaults to the config file, then rio
    #[arg(long, value_enum)]
    pub blade: Option<BladeKind>,

    /// Refresh interval in milliseconds (default 1500)
    #[arg(long, value_parser = clap::value_parser!(u64).range(MIN_REFRESH_MS..))]
    pub refresh_ms: Option<u64>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// File receiving logs; the terminal is owned by the UI
    #[arg(long, default_value = "axe.log")]
    pub log_file: PathBuf,

    /// Runtime config file, instead of $AXE_CONFIG / ./axe.yaml / ~/.config/axe
    #[arg(long)]
    pub config: Option<PathBuf>,
}
