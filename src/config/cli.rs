use crate::config::toml_config::LayerConfig;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "poi-layer")]
#[command(about = "Query nearby points of interest, draw them as markers and route to one on foot")]
#[command(allow_negative_numbers = true)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "poi-layer.toml")]
    pub config: String,

    /// Override query longitude
    #[arg(long)]
    pub longitude: Option<f64>,

    /// Override query latitude
    #[arg(long)]
    pub latitude: Option<f64>,

    /// Override query radius in meters
    #[arg(long)]
    pub radius: Option<f64>,

    /// Override the result cap (the service never returns more than 50)
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Click the N-th feature marker (0-based) and draw a walking route to it
    #[arg(long)]
    pub click: Option<usize>,

    /// Write the rendered markers and route as GeoJSON
    #[arg(short, long)]
    pub output: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Show the request that would be sent without calling the service
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn apply_overrides(&self, config: &mut LayerConfig) {
        if let Some(longitude) = self.longitude {
            config.query.longitude = Some(longitude);
        }
        if let Some(latitude) = self.latitude {
            config.query.latitude = Some(latitude);
        }
        if let Some(radius) = self.radius {
            config.query.radius = radius;
        }
        if let Some(max_items) = self.max_items {
            config.query.max_items = max_items;
        }
    }
}
