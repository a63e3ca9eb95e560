use std::sync::Arc;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use gemdrive::{config, error, routing, server, state};

fn main() {
    use tokio::runtime::Builder;

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .expect("failed to initialize global tracing subscriber");

    let rt = match Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build() {
        Ok(rt) => rt,
        Err(err) => {
            panic!("failed to start tokio runtime. {}", err);
        }
    };

    if let Err(err) = rt.block_on(init()) {
        tracing::error!("{err}");

        std::process::exit(1);
    }
}

async fn init() -> error::Result<()> {
    let config = config::get_config()?;
    let port = config.settings.port;

    let shared = Arc::new(state::Shared::from_config(&config)?);
    let router = routing::build(shared);

    let server = Arc::new(server::Server::new(port, router));
    let mut events = server.subscribe();

    server.start();

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    tracing::error!("failed to listen for shutdown signal: {err}");

                    break;
                }

                server.stop();
            }
            event = events.recv() => {
                match event {
                    Ok(server::Event::StateUpdated(state)) => {
                        tracing::info!("state updated: {state}");

                        if state == server::State::Stopped {
                            break;
                        }
                    }
                    Ok(server::Event::Error(msg)) => {
                        tracing::error!("server error: {msg}");
                    }
                    Err(_) => {
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
