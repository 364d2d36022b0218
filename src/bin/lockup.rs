use lib::lockup::api_client::ApiClient;
use lib::lockup::models;
use lib::lockup::run_tool::run;
use lib::lockup::session_store::JsonFileStore;

use clap::Parser;
use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use log::{error, info, warn};
use models::{Args, Config};

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl-C: {}", err);
        futures::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() {
    /* Setup logging */
    env_logger::builder()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    /* Get all the required resources */
    let args = Args::parse();
    let config: Config = match Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Json::file(&args.config_json_path))
        .merge(Env::prefixed("LOCKUP_"))
        .extract()
    {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(2);
        }
    };
    info!("Read config from {}", args.config_json_path.display());

    let client = match ApiClient::from_config(&config) {
        Ok(client) => client,
        Err(err) => {
            error!("{}", err);
            std::process::exit(2);
        }
    };
    let store = JsonFileStore::new(&config.session_json_path);

    match run(&client, &client, &store, &config, args.command, ctrl_c()).await {
        Ok(output) => println!("{}", output),
        Err(err) => {
            if err.is_validation() {
                warn!("{:?}", err);
            } else {
                error!("{:?}", err);
            }
            eprintln!("Error: {}", err.alert_message());
            std::process::exit(1);
        }
    }
}
