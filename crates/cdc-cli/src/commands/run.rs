use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use cdc_core::secret::{PlaintextSecretProvider, SecretProvider};
use cdc_core::transform::{FakeTransformService, HttpTransformService, TransformService};
use cdc_core::{CDCEvent, ColumnValue, Operation};
use cdc_pg::{connect_postgres, ReplicationSession};

use crate::config::load_session_config;
use crate::store::build_checkpoint_store;

pub async fn cmd_run(config_path: &Path, create_slot: bool, cleanup: bool, apply: Option<String>) -> Result<()> {
    let session_config = load_session_config(config_path)?;
    let mut replication_config = cdc_config::to_replication_config(&session_config)?;

    if create_slot {
        replication_config.slot_name_override = Some(replication_config.slot_name());
    }

    let checkpoint_store = build_checkpoint_store(&session_config, &replication_config).await?;

    let transform_service: Arc<dyn TransformService> = match &replication_config.transform_service_url {
        Some(url) => Arc::new(HttpTransformService::new(url.clone())),
        None => Arc::new(FakeTransformService::new()),
    };

    let secret_provider: Arc<dyn SecretProvider> = Arc::new(PlaintextSecretProvider);

    let mut session = ReplicationSession::new(replication_config, checkpoint_store, transform_service, secret_provider)?;
    session.connect(cleanup).await.context("failed to provision session")?;

    // Events from the session's synchronous callback are handed off over a
    // channel to this task, which awaits `apply_event` against the target.
    let mut apply_sink: Option<(mpsc::UnboundedSender<CDCEvent>, tokio::task::JoinHandle<()>)> = None;
    if let Some(target) = apply {
        let client = connect_postgres(&target, cdc_core::TlsMode::Prefer)
            .await
            .context("failed to connect to apply target")?;
        let (tx, mut rx) = mpsc::unbounded_channel::<CDCEvent>();
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = cdc_pg::apply_event(&client, &event).await {
                    error!(table = %event.table, error = %e, "failed to apply event to target");
                }
            }
        });
        apply_sink = Some((tx, task));
    }

    let sender = apply_sink.as_ref().map(|(tx, _)| tx.clone());
    let on_event = move |event: CDCEvent| match &sender {
        Some(tx) => {
            if tx.send(event).is_err() {
                warn!("apply task has stopped, dropping event");
            }
        }
        None => println!("{}", event_to_json(&event)),
    };

    let result = tokio::select! {
        r = session.start(on_event) => r,
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, stopping stream");
            Ok(())
        }
    };

    session.save_checkpoint().await.context("failed to save checkpoint")?;
    session.close();

    if let Some((tx, task)) = apply_sink {
        drop(tx);
        let _ = task.await;
    }

    result?;
    println!("{}", "Session stopped cleanly.".green());
    Ok(())
}

fn event_to_json(event: &CDCEvent) -> Value {
    json!({
        "op": operation_str(event.op),
        "schema": event.schema,
        "table": event.table,
        "lsn": event.lsn,
        "timestamp": event.timestamp,
        "new": event.new.as_ref().map(row_to_json),
        "old": event.old.as_ref().map(row_to_json),
    })
}

fn row_to_json(row: &cdc_core::RowMap) -> Value {
    let mut map = serde_json::Map::new();
    for (column, value) in row {
        map.insert(column.clone(), column_value_to_json(value));
    }
    Value::Object(map)
}

fn column_value_to_json(value: &ColumnValue) -> Value {
    match value {
        ColumnValue::Null => Value::Null,
        ColumnValue::Text(s) => Value::String(s.clone()),
        ColumnValue::Binary(b) => Value::String(hex_encode(b)),
        ColumnValue::UnchangedToast => Value::String("<unchanged-toast>".into()),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn operation_str(op: Operation) -> &'static str {
    op.as_str()
}
