use clap::{Parser, Subcommand};
use log::error;
use std::path::PathBuf;
use webcast::client;
use webcast::configuration::Config;
use webcast::controller::controller_handler::Controller;
use webcast::web_interface::types::StartRequest;

#[derive(Parser)]
#[command(name = "webcast")]
#[command(version)]
#[command(about = "Cast a web page to an FCast receiver")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the casting service
    Serve {
        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the configured bind address
        #[arg(long)]
        bind_address: Option<String>,
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
        /// Override the configured sessions directory
        #[arg(long)]
        sessions_dir: Option<PathBuf>,
    },
    /// Start a session on a running service
    Start {
        /// Web page URL
        url: String,
        /// Receiver name
        #[arg(long, short)]
        receiver: String,
        /// Receiver host/IP (bypass discovery)
        #[arg(long)]
        receiver_host: Option<String>,
        /// Receiver port
        #[arg(long)]
        receiver_port: Option<u16>,
        #[arg(long, default_value_t = 1920)]
        width: u32,
        #[arg(long, default_value_t = 1080)]
        height: u32,
        #[arg(long, default_value_t = 15)]
        fps: u32,
        #[arg(long, default_value = "3500k")]
        bitrate: String,
        /// Capture audio from the default PulseAudio device
        #[arg(long)]
        audio: bool,
        /// Path to cookies.json
        #[arg(long)]
        cookies: Option<PathBuf>,
        /// Chromium user-data-dir
        #[arg(long)]
        user_data_dir: Option<PathBuf>,
        /// Media title
        #[arg(long)]
        title: Option<String>,
        /// Show the browser chrome instead of kiosk mode
        #[arg(long)]
        show_browser_ui: bool,
        #[arg(long, env = "WEBCAST_API", default_value = "http://localhost:8080")]
        api: String,
    },
    /// Show one session's status
    Status {
        id: String,
        #[arg(long, env = "WEBCAST_API", default_value = "http://localhost:8080")]
        api: String,
    },
    /// Stop a session
    Stop {
        id: String,
        #[arg(long, env = "WEBCAST_API", default_value = "http://localhost:8080")]
        api: String,
    },
    /// List known receivers
    Receivers {
        #[arg(long, env = "WEBCAST_API", default_value = "http://localhost:8080")]
        api: String,
    },
}

fn load_config(
    path: Option<PathBuf>,
    bind_address: Option<String>,
    port: Option<u16>,
    sessions_dir: Option<PathBuf>,
) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };
    if let Some(bind_address) = bind_address {
        config.server.bind_address = bind_address;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(sessions_dir) = sessions_dir {
        config.sessions_root = sessions_dir;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    let result: Result<(), Box<dyn std::error::Error>> = match args.command {
        Command::Serve {
            config,
            bind_address,
            port,
            sessions_dir,
        } => {
            println!(
                "webcast v{} — cast a web page to an FCast receiver",
                env!("CARGO_PKG_VERSION")
            );
            match load_config(config, bind_address, port, sessions_dir) {
                Ok(config) => match Controller::new(config) {
                    Ok(controller) => controller.run().await.map_err(Into::into),
                    Err(e) => Err(e.into()),
                },
                Err(e) => Err(e),
            }
        }
        Command::Start {
            url,
            receiver,
            receiver_host,
            receiver_port,
            width,
            height,
            fps,
            bitrate,
            audio,
            cookies,
            user_data_dir,
            title,
            show_browser_ui,
            api,
        } => {
            let request = StartRequest {
                url,
                receiver_name: receiver,
                receiver_host,
                receiver_port,
                width,
                height,
                fps,
                video_bitrate: bitrate,
                audio,
                audio_device: None,
                cookies_path: cookies,
                user_data_dir,
                title,
                hide_browser_ui: !show_browser_ui,
            };
            client::run_start(&api, request).await.map_err(Into::into)
        }
        Command::Status { id, api } => client::run_status(&api, &id).await.map_err(Into::into),
        Command::Stop { id, api } => client::run_stop(&api, &id).await.map_err(Into::into),
        Command::Receivers { api } => client::run_receivers(&api).await.map_err(Into::into),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
