use clap::Parser;

use framelinker::config::args::{Args, Command, ConfigAction};
use framelinker::config::{get_config, init_config_from};
use framelinker::errors::FramelinkerError;
use framelinker::runtime::modes::{run_config_generate, run_register, run_server};
use framelinker::system::init_logging;

#[actix_web::main]
async fn main() {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let command = match args.command {
        // 生成配置不需要加载配置和日志
        Some(Command::Config {
            action: ConfigAction::Generate { path },
        }) => {
            if let Err(e) = run_config_generate(path) {
                exit_with(&e);
            }
            return;
        }
        other => other,
    };

    init_config_from(&args.config);
    let config = get_config();

    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            std::process::exit(1);
        }
    };

    match command {
        Some(Command::Register {
            frame_url,
            api_key,
            region,
        }) => {
            if let Err(e) = run_register(&config, frame_url, api_key, region).await {
                exit_with(&e);
            }
        }
        _ => {
            if let Err(e) = run_server().await {
                match e.downcast_ref::<FramelinkerError>() {
                    Some(err) => exit_with(err),
                    None => {
                        eprintln!("Server error: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
        }
    }
}

fn exit_with(err: &FramelinkerError) -> ! {
    eprintln!("{}", err.format_colored());
    std::process::exit(1);
}
