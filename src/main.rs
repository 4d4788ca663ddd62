use clap::Parser;
use people_search::adapters::{csv_export, web};
use people_search::config::{Cli, Command, LogFormat};
use people_search::utils::{logger, validation};
use people_search::utils::validation::Validate;
use people_search::{
    AppConfig, AppError, Authenticator, FileCredentialStore, LocalServerFlow, OAuthClient,
    RecordScraper, SearchClient, SearchService,
};
use std::sync::Arc;

type FileAuthenticator = Authenticator<FileCredentialStore, LocalServerFlow>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::from_file_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config.display(), e);
            eprintln!("💡 Make sure the file is valid TOML");
            std::process::exit(e.exit_code());
        }
    };

    // 初始化日誌
    if cli.json_logs || config.logging.format == LogFormat::Json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting people-search");
    if cli.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    if let Err(e) = run(cli.command, config).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }
}

fn build_authenticator(config: &AppConfig) -> Result<FileAuthenticator, AppError> {
    let oauth = OAuthClient::new(config.oauth.http_timeout())?;
    let store = FileCredentialStore::new(&config.oauth.token_path);
    let flow = LocalServerFlow::new(&config.oauth, oauth.clone());
    Ok(Authenticator::new(store, flow, oauth, &config.oauth))
}

fn build_search_service(
    config: &AppConfig,
) -> Result<SearchService<FileCredentialStore, LocalServerFlow>, AppError> {
    let authenticator = build_authenticator(config)?;
    let client = SearchClient::new(&config.search)?;
    Ok(SearchService::new(authenticator, client))
}

async fn run(command: Command, config: AppConfig) -> Result<(), AppError> {
    match command {
        Command::Serve { bind } => {
            let addr = match bind {
                Some(bind) => validation::validate_socket_addr("--bind", &bind)?,
                None => config.server.socket_addr()?,
            };
            let service = Arc::new(build_search_service(&config)?);
            web::serve(service, addr).await
        }
        Command::Search { query } => {
            let service = build_search_service(&config)?;
            let results = service.run(&query).await?;

            if results.is_empty() {
                println!("No results found.");
            }
            for item in &results {
                println!("{}", item.title().unwrap_or("(untitled)"));
                if let Some(link) = item.link() {
                    println!("  {}", link);
                }
            }
            Ok(())
        }
        Command::Scrape { url, output } => {
            let scraper = RecordScraper::new(&config.scrape)?;
            let records = scraper.scrape(&url).await?;

            for record in &records {
                println!("{}\t{}", record.name, record.address);
            }
            if let Some(path) = output {
                csv_export::write_records_to_file(&path, &records)?;
                println!("📁 {} records saved to: {}", records.len(), path.display());
            }
            Ok(())
        }
        Command::Auth => {
            let authenticator = build_authenticator(&config)?;
            let credential = authenticator.get_valid_credential().await?;
            match credential.expiry {
                Some(expiry) => println!("✅ Credential valid until {}", expiry.to_rfc3339()),
                None => println!("✅ Credential valid (no expiry reported)"),
            }
            Ok(())
        }
    }
}
