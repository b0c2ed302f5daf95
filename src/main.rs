//! Keel - 声明式集群收敛引擎
//!
//! 入口：加载配置、初始化日志、注册处理器，然后执行一次 check 或 export。

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use keel::cli::{Cli, Command};
use keel::cluster::{cluster_kind, ClusterHandler};
use keel::config::load_config;
use keel::handler::{CheckOutcome, HandlerRegistry};
use keel::inventory::HttpInventoryService;
use keel::model::{Exportable, Moniker, Resource};
use keel::orchestration::HttpOrchestrationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    keel::observability::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.clone()).context("Failed to load config")?;

    let mut registry = HandlerRegistry::new();
    registry.register(ClusterHandler::new(
        Arc::new(HttpInventoryService::from_config(&config.inventory)?),
        Arc::new(HttpOrchestrationService::from_config(&config.orchestration)?),
        &config,
    ));

    match cli.command {
        Command::Check { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let resource: Resource<serde_json::Value> =
                serde_yaml::from_str(&raw).context("Invalid resource document")?;

            let outcome = registry.check(&resource).await?;
            match outcome {
                CheckOutcome::Unchanged => println!("{}: up to date", resource.id()),
                CheckOutcome::ActuationInProgress => {
                    println!("{}: actuation in progress, skipped", resource.id())
                }
                CheckOutcome::Actuated {
                    affected_regions,
                    submissions,
                } => {
                    println!("{}: delta in {}", resource.id(), affected_regions.join(", "));
                    for submission in &submissions {
                        match &submission.outcome {
                            Ok(task) => println!("  {} -> task {}", submission.region, task.id),
                            Err(e) => println!("  {} -> failed: {e}", submission.region),
                        }
                    }
                }
            }
        }
        Command::Export {
            account,
            app,
            stack,
            detail,
            regions,
            service_account,
        } => {
            let mut moniker = Moniker::new(app);
            if let Some(stack) = stack {
                moniker = moniker.with_stack(stack);
            }
            if let Some(detail) = detail {
                moniker = moniker.with_detail(detail);
            }
            let exportable = Exportable {
                kind: cluster_kind(),
                account,
                moniker,
                regions: Command::export_regions(&regions),
                service_account,
            };

            let exported = registry.export(&exportable).await?;
            print!("{}", serde_yaml::to_string(&exported)?);
        }
    }

    Ok(())
}
