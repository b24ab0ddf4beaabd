use clap::Parser;
use pandameme::config::setup_logging;
use tracing::{error, info};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = pandameme::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let options = cli.generator.clone();
    let generator = match tokio::task::spawn_blocking(move || options.build_generator()).await {
        Ok(Ok(generator)) => generator,
        Ok(Err(err)) => {
            error!("Configuration error: {}", err);
            return;
        }
        Err(err) => {
            error!("Startup failed: {}", err);
            return;
        }
    };
    info!(
        "Generating with {} via {} ({})",
        generator.model(),
        generator.backend_name(),
        if generator.has_font() {
            "outline font"
        } else {
            "built-in font"
        }
    );

    if let Err(err) =
        pandameme::web::setup_server(&cli.listen_address, cli.port, generator).await
    {
        error!("Application error: {}", err);
    }
}
