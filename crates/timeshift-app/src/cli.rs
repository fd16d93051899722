use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "timeshift",
    about = "Play a synthetic video with captions through the delay engine",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Engine configuration file (defaults to the user config dir)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Stored settings as JSON ({"mode", "delay", "enabled"})
    #[arg(long = "settings")]
    pub settings: Option<PathBuf>,

    /// Delay audio instead of video and play a test tone
    #[arg(long = "audio")]
    pub audio: bool,

    /// Delay in milliseconds, overriding the settings file
    #[arg(long = "delay", value_name = "MS")]
    pub delay: Option<u64>,

    /// How long to run
    #[arg(long = "seconds", default_value_t = 10, value_parser = parse_positive_u64)]
    pub seconds: u64,

    /// Skip the GPU and use a counting backend
    #[arg(long = "null-gpu")]
    pub null_gpu: bool,

    /// Write the effective engine configuration to the config path and exit
    #[arg(long = "write-config")]
    pub write_config: bool,
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|_| format!("'{value}' is not a valid number"))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}
