use clap::{Parser, ValueEnum};
use rt_catalog::{JsonLinesHost, SiteConfig, Variant, handle_request};
use std::io;
use std::path::PathBuf;
use std::process;

/// Add-on flavour selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VariantArg {
    /// RT Documentary series catalog
    Series,
    /// RT News live channels
    Live,
}

impl VariantArg {
    fn default_plugin_url(self) -> &'static str {
        match self {
            VariantArg::Series => "plugin://plugin.video.nextgenrttvseries/",
            VariantArg::Live => "plugin://plugin.video.nextgenrt/",
        }
    }
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Series => Variant::Series,
            VariantArg::Live => Variant::Live,
        }
    }
}

#[derive(Parser)]
#[command(name = "rt_catalog")]
#[command(about = "Browse RT channels and documentary series, answering as JSON lines on stdout")]
struct Cli {
    /// Which add-on to serve
    #[arg(long, value_enum, default_value = "series")]
    variant: VariantArg,

    /// Base URL used for callback targets in listings
    #[arg(long)]
    plugin_url: Option<String>,

    /// Config file overriding the built-in site settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request query string, e.g. "?action=episodes&url=..."
    #[arg(default_value = "")]
    query: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match SiteConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let plugin_url = cli
        .plugin_url
        .unwrap_or_else(|| cli.variant.default_plugin_url().to_string());

    let mut host = JsonLinesHost::new(io::stdout().lock());
    if let Err(e) = handle_request(
        &config,
        cli.variant.into(),
        &plugin_url,
        &cli.query,
        &mut host,
    ) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
