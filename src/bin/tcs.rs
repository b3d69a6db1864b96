use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use text_classifier_service::{
    ArtefactLoader, InferencePipeline, OnnxModel, TcsArgs, server,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(TcsArgs::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "service stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: TcsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.resolve()?;

    // Nothing is served unless every artefact loads.
    let artefacts = ArtefactLoader::new(&config).load::<OnnxModel>()?;
    let pipeline = InferencePipeline::new(artefacts, config.preprocessing, config.model.activation);
    if args.check {
        tracing::info!("artefact check passed");
        return Ok(());
    }

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    server::serve(listener, Arc::new(pipeline), shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
