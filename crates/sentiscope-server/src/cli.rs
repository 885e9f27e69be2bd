use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "sentiscope")]
#[command(
    author,
    version,
    about = "Multilingual sentiment classification server"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "sentiscope.yaml", env = "SENTISCOPE_CONFIG")]
    pub config: String,

    /// Listen address
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Language used when a request names none or an unsupported one
    #[arg(long)]
    pub default_language: Option<String>,

    /// Load a language's model at startup (repeatable)
    #[arg(long = "preload", value_name = "CODE")]
    pub preload: Vec<String>,

    /// Inference device: cpu, cuda or metal
    #[arg(long)]
    pub device: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
