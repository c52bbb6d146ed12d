//! Tests for the cli crate

use clap::Parser;
use nimbus_cli::commands::{Cli, CommandExecutor, Commands, OutputFormat};
use nimbus_provider::{ProviderError, RawPage, ScriptedTransport};
use nimbus_store::export;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn write_config(dir: &Path, extra: serde_json::Value) -> PathBuf {
    let mut config = json!({
        "instance_id": "inst-1",
        "tenant_id": "tenant-1",
        "subscription_id": "sub-1",
        "arm_endpoint": "https://arm.test",
        "graph_endpoint": "https://graph.test",
        "retry": {"max_attempts": 2, "initial_backoff_ms": 0, "max_backoff_ms": 0, "rate_limit_cooldown_ms": 0}
    });
    if let (Some(base), Some(extra)) = (config.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    let path = dir.join("config.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();
    path
}

#[test]
fn test_cli_parsing_run() {
    let args = vec![
        "nimbus", "run", "--config", "azure.json", "--output", "graph.json", "--steps",
        "fetch-account,fetch-users",
    ];
    let cli = Cli::try_parse_from(args).unwrap();

    match cli.command {
        Commands::Run {
            config,
            output,
            steps,
            format,
        } => {
            assert_eq!(config, PathBuf::from("azure.json"));
            assert_eq!(output, Some(PathBuf::from("graph.json")));
            assert_eq!(steps, vec!["fetch-account".to_string(), "fetch-users".to_string()]);
            assert_eq!(format, OutputFormat::Text);
        }
        _ => panic!("Expected Run command"),
    }
}

#[test]
fn test_cli_parsing_steps_without_config() {
    let cli = Cli::try_parse_from(vec!["nimbus", "steps", "--format", "json"]).unwrap();

    match cli.command {
        Commands::Steps { config, format } => {
            assert_eq!(config, None);
            assert_eq!(format, OutputFormat::Json);
        }
        _ => panic!("Expected Steps command"),
    }
}

#[test]
fn test_cli_parsing_verbose_is_global() {
    let cli = Cli::try_parse_from(vec!["nimbus", "validate", "--config", "c.json", "--verbose"]).unwrap();
    assert!(cli.verbose);
    assert!(matches!(cli.command, Commands::Validate { .. }));
}

#[test]
fn test_cli_validate_requires_config() {
    assert!(Cli::try_parse_from(vec!["nimbus", "validate"]).is_err());
}

#[tokio::test]
async fn test_validate_rejects_inactive_dependency() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), json!({"active_steps": ["fetch-group-members"]}));

    let mut executor = CommandExecutor::new();
    let result = executor.execute(Commands::Validate { config: path }).await.unwrap();

    assert!(!result.success);
    assert!(result.message.contains("fetch-group-members"));
}

#[tokio::test]
async fn test_validate_accepts_default_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), json!({}));

    let mut executor = CommandExecutor::new();
    let result = executor.execute(Commands::Validate { config: path }).await.unwrap();

    assert!(result.success);
    let order = result.data.unwrap()["execution_order"].as_array().unwrap().clone();
    assert_eq!(order[0], "fetch-account");
    assert!(!order.iter().any(|id| id == "fetch-storage-file-shares"));
}

#[tokio::test]
async fn test_steps_lists_inactive_steps() {
    let mut executor = CommandExecutor::new();
    let result = executor
        .execute(Commands::Steps {
            config: None,
            format: OutputFormat::Json,
        })
        .await
        .unwrap();

    let steps = result.data.unwrap()["steps"].as_array().unwrap().clone();
    let file_shares = steps
        .iter()
        .find(|s| s["id"] == "fetch-storage-file-shares")
        .unwrap();
    assert_eq!(file_shares["active"], false);
    assert!(!file_shares["required_permissions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_writes_snapshot_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), json!({}));
    let output = dir.path().join("graph.json");

    let transport = Arc::new(ScriptedTransport::new());
    transport.respond(
        "https://graph.test/v1.0/users",
        RawPage::new(vec![json!({"id": "u-1", "displayName": "Ada"})]),
    );
    transport.fail_forever(
        "https://graph.test/v1.0/groups",
        ProviderError::Transient {
            endpoint: "https://graph.test/v1.0/groups".into(),
            status: Some(503),
            message: "Service Unavailable".into(),
        },
    );

    let mut executor = CommandExecutor::with_transport(transport);
    let result = executor
        .execute(Commands::Run {
            config,
            output: Some(output.clone()),
            steps: vec![
                "fetch-account".into(),
                "fetch-users".into(),
                "fetch-groups".into(),
            ],
            format: OutputFormat::Json,
        })
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.message.contains("fetch-groups"));

    let snapshot = export::read_snapshot(&output).await.unwrap();
    assert_eq!(snapshot.statistics.entities_by_type.get("azure_account"), Some(&1));
    assert_eq!(snapshot.statistics.entities_by_type.get("azure_user"), Some(&1));
    assert!(snapshot.statistics.entities_by_type.get("azure_user_group").is_none());
}

#[tokio::test]
async fn test_run_rejects_unknown_step() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), json!({}));

    let mut executor = CommandExecutor::with_transport(Arc::new(ScriptedTransport::new()));
    let result = executor
        .execute(Commands::Run {
            config,
            output: None,
            steps: vec!["fetch-everything".into()],
            format: OutputFormat::Text,
        })
        .await;

    assert!(result.is_err());
}
