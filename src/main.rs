use std::{io, io::Read, process, sync::Arc};

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use postgen::args::{Args, Command, Settings};
use postgen::generate::LlmGenerator;
use postgen::handle::{PostGenerator, Strategy};
use postgen::server;
use postgen::templates::TemplateTable;

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn build_service(settings: Settings) -> PostGenerator {
    let templates = match TemplateTable::builtin() {
        Ok(table) => Arc::new(table),
        Err(e) => {
            error!("Template error: {}", e);
            process::exit(1)
        }
    };

    let strategy = match settings.api_key {
        Some(api_key) => {
            info!(provider = settings.provider.name(), model = %settings.model.model, "model generation enabled");
            Strategy::Model(Arc::new(LlmGenerator::new(
                settings.provider,
                api_key,
                settings.model,
            )))
        }
        None => {
            info!("no API credential, using templates");
            Strategy::Template
        }
    };

    PostGenerator::new(templates, settings.catalog, strategy)
}

fn read_topic(topic: String) -> String {
    if topic != "-" {
        return topic;
    }
    let mut topic = String::new();
    info!("Reading topic from stdin.");
    if let Err(e) = io::stdin().read_to_string(&mut topic) {
        error!("Can't read from stdin: {}", e);
        process::exit(1)
    }
    topic.trim().to_string()
}

async fn generate_once(service: PostGenerator, topic: String, platform: Option<String>, tone: Option<String>) {
    let body = serde_json::json!({
        "topic": read_topic(topic),
        "platform": platform,
        "tone": tone,
    })
    .to_string();

    let request = match service.parse_request(Some(&body)) {
        Ok(request) => request,
        Err(e) => {
            error!("Request error: {}", e);
            process::exit(1)
        }
    };
    debug!(?request, "generating");

    match service.generate(&request).await {
        Ok(result) => {
            print!("{}", result.text);
        }
        Err(e) => {
            error!("Generation error: {}", e);
            process::exit(1)
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    let settings = match args.settings(|name| std::env::var(name).ok()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {}", e);
            process::exit(1)
        }
    };
    debug!(?settings, "resolved configuration");

    let service = build_service(settings);

    match args.command {
        Command::Serve { bind } => {
            if let Err(e) = server::serve(bind, Arc::new(service)).await {
                error!("Server error: {}", e);
                process::exit(1)
            }
        }
        Command::Generate { topic, platform, tone } => {
            generate_once(service, topic, platform, tone).await
        }
    }
}
