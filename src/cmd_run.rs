//! `run` and `resume` subcommand handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use auditq_config::{Config, ConfigValidator};
use auditq_pipeline::{
    AuditPipeline, HttpProbe, PipelineError, ProbeResult, RunReport, UrlCollector, UrlSource,
};
use auditq_workqueue::ResumeOptions;

use crate::cli::RunArgs;

/// Apply command line overrides on top of the file configuration.
pub(crate) fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(concurrency) = args.concurrency {
        config.queue.max_concurrent = concurrency;
    }
    if let Some(max_retries) = args.max_retries {
        config.queue.max_retries = max_retries;
    }
    if let Some(max_urls) = args.max_urls {
        config.pipeline.max_urls = max_urls;
    }
    if args.persist || args.state_id.is_some() {
        config.persistence.enabled = true;
    }
    if args.state_id.is_some() {
        config.persistence.state_id = args.state_id.clone();
    }
}

fn sources(args: &RunArgs) -> Vec<UrlSource> {
    let mut sources = Vec::new();
    if !args.urls.is_empty() {
        sources.push(UrlSource::List(args.urls.clone()));
    }
    sources.extend(args.sitemap.iter().cloned().map(UrlSource::Sitemap));
    if let Some(path) = &args.sitemap_file {
        sources.push(UrlSource::SitemapFile(path.clone()));
    }
    if let Some(path) = &args.urls_file {
        sources.push(UrlSource::UrlFile(path.clone()));
    }
    sources
}

fn validate(config: &Config) -> Result<()> {
    let warnings = ConfigValidator::validate(config)?.into_result()?;
    for warning in warnings {
        warn!("Config: {}", warning);
    }
    Ok(())
}

/// Start a pipeline and cancel it on Ctrl-C.
async fn start_pipeline(config: Config) -> Result<AuditPipeline> {
    let pipeline = AuditPipeline::new(config)
        .await
        .context("Failed to set up the pipeline")?
        .on_progress(|stats| {
            info!(
                "Progress: {}/{} done ({:.1}%), {} in flight, {} failed",
                stats.completed + stats.failed,
                stats.total,
                stats.completion_percent,
                stats.in_progress,
                stats.failed
            );
        });

    let token = pipeline.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping workers");
            token.cancel();
        }
    });
    Ok(pipeline)
}

/// Handle `auditq run`.
pub(crate) async fn run(mut config: Config, args: RunArgs) -> Result<bool> {
    apply_overrides(&mut config, &args);
    validate(&config)?;

    let sources = sources(&args);
    if sources.is_empty() {
        bail!("No URLs given; pass URLs, --sitemap, --sitemap-file or --urls-file");
    }

    let collector = UrlCollector::new(&config.pipeline)?;
    let urls = collector.collect(&sources).await?;
    if urls.is_empty() {
        return Err(PipelineError::NoUrls.into());
    }
    info!("Collected {} URLs", urls.len());

    let probe = Arc::new(HttpProbe::new(&config.pipeline)?);
    let pipeline = start_pipeline(config).await?;
    let report = pipeline.run(urls, probe).await?;

    finish(&report, args.output.output.as_deref()).await
}

/// Handle `auditq resume`.
pub(crate) async fn resume(
    mut config: Config,
    state_id: &str,
    reprocess: bool,
    output: Option<&Path>,
) -> Result<bool> {
    config.persistence.enabled = true;
    config.persistence.state_id = Some(state_id.to_string());
    validate(&config)?;

    let probe = Arc::new(HttpProbe::new(&config.pipeline)?);
    let pipeline = start_pipeline(config).await?;
    let options = ResumeOptions {
        skip_completed: !reprocess,
    };
    let report = pipeline
        .resume_with(state_id, options, probe)
        .await
        .with_context(|| format!("Failed to resume {}", state_id))?;

    finish(&report, output).await
}

async fn finish(report: &RunReport<ProbeResult>, output: Option<&Path>) -> Result<bool> {
    print_summary(report);

    if let Some(path) = output {
        report
            .write_json(path)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    if report.summary.interrupted {
        if let Some(id) = &report.state_id {
            println!("Resume with: auditq resume {}", id);
        }
    }
    Ok(report.passed())
}

fn print_summary(report: &RunReport<ProbeResult>) {
    let summary = &report.summary;
    println!();
    println!("URLs:       {}", summary.total_urls);
    println!("Completed:  {}", summary.completed);
    println!("Failed:     {}", summary.failed);
    if summary.remaining > 0 {
        println!("Remaining:  {}", summary.remaining);
    }
    println!("Retries:    {}", summary.retries);
    println!("Success:    {:.1}%", summary.success_rate);
    if let Some(avg) = summary.average_duration_ms {
        println!("Avg time:   {:.0}ms", avg);
    }
    println!("Duration:   {}ms", report.total_duration_ms);

    if !report.failures.is_empty() {
        println!();
        println!("Failures:");
        for failure in &report.failures {
            println!(
                "  {} ({} attempts): {}",
                failure.url, failure.attempts, failure.error
            );
        }
    }
}
