//! Queue command handlers.

use tabled::Tabled;
use tracing::info;

use semprov_core::{
    Cluster, DeleteQueues, PurgeQueues, QueueSettings, QueueSummary, QueueWorkflow, SetQueuePermission, ShutdownMode,
};

use crate::cli::{GlobalOpts, QueueArgs, QueueCommand, QueueCreateArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct QueueRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Binds")]
    binds: u64,
    #[tabled(rename = "Subscriptions")]
    subscriptions: u64,
    #[tabled(rename = "Spool (MB)")]
    spool: String,
}

impl From<&QueueSummary> for QueueRow {
    fn from(q: &QueueSummary) -> Self {
        Self {
            name: q.name.clone(),
            owner: q.owner.clone().unwrap_or_else(|| "-".into()),
            binds: q.bind_count,
            subscriptions: q.topic_subscription_count,
            spool: format!("{:.2}", q.spool_usage_mb),
        }
    }
}

fn workflow(args: &QueueCreateArgs) -> QueueWorkflow {
    let settings = QueueSettings {
        retries: args.retries,
        exclusive: Some(!args.non_exclusive),
        queue_size: args.size,
        consume: args.consume.clone(),
        max_bind_count: args.max_bind_count,
        owner: args.owner.clone(),
    };
    let config = settings.resolve(&args.vpn);
    args.queues
        .iter()
        .fold(QueueWorkflow::new(&args.vpn), |wf, name| {
            wf.with_queue(name, config.clone())
        })
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(cluster: &Cluster, args: &QueueArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match &args.command {
        QueueCommand::List { vpn, filter } => {
            let queues = cluster.list_queues(vpn, filter).await?;
            let out = output::render_list(&global.output, &queues, |q| QueueRow::from(q), |q| q.name.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        QueueCommand::Create(create) => {
            util::apply(cluster, &workflow(create), create.shutdown, global, false).await
        }

        QueueCommand::Delete {
            vpn,
            queues,
            shutdown_only,
        } => {
            let wf = DeleteQueues {
                vpn: vpn.clone(),
                queues: queues.clone(),
                shutdown_only: *shutdown_only,
            };
            util::apply(cluster, &wf, ShutdownMode::Off, global, true).await
        }

        QueueCommand::Purge { vpn, queues, pattern } => {
            let queues = if *pattern {
                matching_queues(cluster, vpn, queues).await?
            } else {
                queues.clone()
            };
            let wf = PurgeQueues {
                vpn: vpn.clone(),
                queues,
            };
            util::apply(cluster, &wf, ShutdownMode::Off, global, true).await
        }

        QueueCommand::Permission {
            vpn,
            queues,
            permission,
        } => {
            let wf = SetQueuePermission {
                vpn: vpn.clone(),
                queues: queues.clone(),
                permission: *permission,
            };
            util::apply(cluster, &wf, ShutdownMode::Off, global, true).await
        }
    }
}

/// Resolve wildcard patterns to the queue names they match, in order and
/// without repeats.
async fn matching_queues(cluster: &Cluster, vpn: &str, patterns: &[String]) -> Result<Vec<String>, CliError> {
    let mut names: Vec<String> = Vec::new();
    for pattern in patterns {
        for queue in cluster.list_queues(vpn, pattern).await? {
            if !names.contains(&queue.name) {
                names.push(queue.name);
            }
        }
    }
    if names.is_empty() {
        return Err(CliError::NotFound {
            entity: format!("queues matching {} in vpn {vpn}", patterns.join(",")),
        });
    }
    info!(vpn, queues = %names.join(","), "resolved queue patterns");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_resolve_over_queue_defaults() {
        let args = QueueCreateArgs {
            vpn: "dev_testvpn".into(),
            queues: vec!["q1".into(), "q2".into()],
            non_exclusive: true,
            size: Some(2048),
            owner: None,
            consume: None,
            max_bind_count: None,
            retries: Some(3),
            shutdown: ShutdownMode::Off,
        };
        let wf = workflow(&args);
        assert_eq!(wf.vpn, "dev_testvpn");
        assert_eq!(wf.queues.len(), 2);
        let (name, config) = &wf.queues[1];
        assert_eq!(name, "q2");
        assert!(!config.exclusive);
        assert_eq!(config.queue_size, 2048);
        assert_eq!(config.owner, "dev_testvpn");
        assert_eq!(config.retries, Some(3));
    }
}
