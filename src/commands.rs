use crate::cli::{BatchArgs, CloneArgs, ResolveArgs};
use prismctl::batch::{
    BatchDocument, BatchPayloadBuilder, BatchSubmitter, ItemOutcome, ResponseAggregator,
};
use prismctl::clone::{CloneJob, CloneOrchestrator};
use prismctl::config::{self, Config};
use prismctl::observability::Metrics;
use prismctl::resolver::{self, EntityResolver};
use prismctl::transport::{HttpTransport, Transport};
use prismctl::PrismError;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn connect(config: &Config) -> Result<HttpTransport, AnyError> {
    config::require_credentials(config)?;
    let transport = HttpTransport::new(config.http_config(), config.credentials())?;
    info!(endpoint = transport.base_url(), "Prism transport ready");
    Ok(transport)
}

pub async fn resolve(config: &Config, args: ResolveArgs) -> Result<ExitCode, AnyError> {
    let transport = connect(config)?;
    let builder = BatchPayloadBuilder::new(config.payload_settings());

    let index = EntityResolver::new(&transport, config.listing_fields())
        .resolve(&builder.listing_path())
        .await?;

    match args.name {
        Some(name) => {
            let id = resolver::lookup(&index, &name).ok_or(PrismError::NotFound(name.clone()))?;
            println!("{id}");
        }
        None => {
            let mut entries: Vec<_> = index.iter().collect();
            entries.sort_unstable();
            for (name, id) in entries {
                println!("{name}\t{id}");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

pub async fn batch(config: &Config, args: BatchArgs) -> Result<ExitCode, AnyError> {
    let raw = tokio::fs::read(&args.file).await?;
    let document = BatchDocument::from_slice(&raw)?;
    info!(
        file = %args.file.display(),
        items = document.len(),
        "Submitting batch"
    );

    let transport = connect(config)?;
    let response = BatchSubmitter::new(&transport, config.batch_endpoint())
        .submit_document(&document)
        .await?;

    let aggregation =
        ResponseAggregator::new(config.batch.success_status, config.batch.accepted_status)
            .aggregate(&response)?;

    let metrics = Metrics::new();
    for item in &aggregation.items {
        if item.outcome == ItemOutcome::Accepted {
            metrics.item_accepted();
        } else {
            metrics.item_failed();
        }
    }

    println!("{}", serde_json::to_string_pretty(&aggregation)?);

    let snapshot = metrics.snapshot();
    info!(
        accepted = snapshot.items_accepted,
        failed = snapshot.items_failed,
        "Batch finished"
    );

    // Outer failures and empty results carry no items but still fail the run.
    Ok(exit_code(aggregation.all_accepted()))
}

pub async fn clone(config: &Config, args: CloneArgs) -> Result<ExitCode, AnyError> {
    let job = CloneJob::new(args.source, args.names, args.network)?;
    let transport: Arc<dyn Transport> = Arc::new(connect(config)?);
    let metrics = Arc::new(Metrics::new());

    let orchestrator = CloneOrchestrator::new(
        transport,
        BatchPayloadBuilder::new(config.payload_settings()),
        config.listing_fields(),
        config.clone_template(),
    )
    .with_max_concurrency(args.concurrency.unwrap_or(config.clone.max_concurrency))
    .with_metrics(Arc::clone(&metrics));

    let outcomes = orchestrator.clone_fan_out(&job).await?;
    println!("{}", serde_json::to_string_pretty(&outcomes)?);

    let snapshot = metrics.snapshot();
    info!(
        created = snapshot.clones_created,
        failed = snapshot.clones_failed,
        "Clone fan-out finished"
    );

    Ok(exit_code(!snapshot.any_failed()))
}

pub fn show_config(config: &Config) -> Result<ExitCode, AnyError> {
    print!("{}", config.to_toml()?);
    Ok(ExitCode::SUCCESS)
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
