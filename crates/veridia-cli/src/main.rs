mod cli;
mod commands;
mod output;

use std::sync::Arc;

use shared::analyzer::HttpAnalyzerClient;
use shared::config::AnalyzerConfig;
use shared::session::FileSessionStore;
use tracing::{debug, error};

use cli::{CliError, CliOptions};
use commands::App;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "veridia_cli=info,shared=info".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(CliError::HelpRequested) => {
            print_usage();
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    let config = match AnalyzerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read analyzer config: {err}");
            std::process::exit(2);
        }
    };
    debug!(
        api_base_url = %config.api_base_url,
        session_file = %config.session_file.display(),
        "analyzer config loaded"
    );

    let client = match HttpAnalyzerClient::new(&config) {
        Ok(client) => client,
        Err(err) => {
            error!("{err}");
            std::process::exit(2);
        }
    };

    let app = App {
        api: Arc::new(client),
        store: Arc::new(FileSessionStore::new(config.session_file.clone())),
        model: config.model.clone(),
        eviction_policy: config.eviction_policy,
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(err) = app.run(&options.command, &mut stdout).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!(
        "Usage: veridia <command> [options]\n\
         \n\
         Commands:\n\
         - submit --url <URL> --type <ANALYSIS TYPE> [--no-follow]\n\
         \x20   Submit a website for analysis and show the result\n\
         - show [--html]      Show the analysis stored for this session\n\
         - refresh [--html]   Fetch the stored analysis again\n\
         - export [--out DIR] Write the stored analysis as a markdown report\n\
         - list               List all analyses known to the service\n\
         - clear              Forget the stored analysis\n\
         \n\
         Environment:\n\
         - VERIDIA_API_BASE_URL      Analyzer service base URL\n\
         - VERIDIA_API_POST          Override URL for creating analyses\n\
         - VERIDIA_MODEL             Model name sent with each request\n\
         - VERIDIA_TIMEOUT_MS        Request timeout, 0 for none\n\
         - VERIDIA_SESSION_FILE      Where the current analysis id is kept\n\
         - VERIDIA_EVICT_SESSION_ON  any_error (default) or not_found"
    );
}
