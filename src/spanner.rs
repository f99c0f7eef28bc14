use anyhow::{Context, Result};
use async_trait::async_trait;
use gcloud_gax::grpc::{Code, Status};
use gcloud_gax::retry::TryAs;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert_or_update, update};
use gcloud_spanner::session::SessionError;
use gcloud_spanner::statement::Statement;
use gcloud_spanner::transaction_rw::ReadWriteTransaction;
use std::sync::Arc;

use crate::config::SpannerConfig;
use crate::models::{Assignment, Item};
use crate::store::{ItemStore, StoreError, StoreResult};

/// Errors raised inside a read-write transaction.
///
/// gRPC statuses stay visible to the client so aborted transactions are
/// retried by the library.
#[derive(Debug, thiserror::Error)]
enum TxError {
    #[error(transparent)]
    Grpc(#[from] Status),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Row(#[from] gcloud_spanner::row::Error),
    #[error("Failed to decode stored item: {0}")]
    Json(#[from] serde_json::Error),
}

impl TryAs<Status> for TxError {
    fn try_as(&self) -> Option<&Status> {
        match self {
            TxError::Grpc(status) => Some(status),
            _ => None,
        }
    }
}

fn status_error(status: &Status) -> StoreError {
    StoreError::backend(format!("{:?}", status.code()), status.message())
}

impl From<TxError> for StoreError {
    fn from(err: TxError) -> Self {
        match &err {
            TxError::Grpc(status) => status_error(status),
            _ => StoreError::backend("SpannerError", err.to_string()),
        }
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Status>() {
            Some(status) => status_error(status),
            None => StoreError::backend("SpannerError", format!("{:#}", err)),
        }
    }
}

/// Shareable Spanner-backed item store for use across async handlers
#[derive(Clone)]
pub struct SpannerClient {
    inner: Arc<Client>,
    table: Arc<str>,
}

impl SpannerClient {
    /// Create a new Spanner client from configuration
    ///
    /// The gcloud-spanner library automatically detects the
    /// SPANNER_EMULATOR_HOST environment variable and connects to
    /// the emulator when set, or production Spanner otherwise.
    ///
    /// This function also performs auto-provisioning: it will automatically
    /// create the instance, database, and table if they don't exist.
    pub async fn from_config(config: &SpannerConfig, table: &str) -> Result<Self> {
        auto_provision(config, table).await?;

        let database_path = config.database_path();

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
            table: Arc::from(table),
        })
    }

    async fn write(&self, item: &Item) -> Result<()> {
        let document = item.to_document().context("Failed to serialize item")?;

        let mutation = insert_or_update(
            &self.table,
            &["id", "data", "created_at"],
            &[&item.id, &document, &item.created_at],
        );

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to write item to Spanner")?;

        tracing::debug!("Wrote item with id: {}", item.id);
        Ok(())
    }

    async fn read(&self, id: &str) -> Result<Option<Item>> {
        let mut statement = Statement::new(format!(
            "SELECT data FROM `{}` WHERE id = @id",
            self.table
        ));
        statement.add_param("id", &id.to_string());

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query item from Spanner")?;

        if let Some(row) = result_set.next().await? {
            let document: String = row.column_by_name("data")?;
            let item = Item::from_document(&document)
                .context("Failed to deserialize stored item")?;
            Ok(Some(item))
        } else {
            tracing::debug!("Item not found with id: {}", id);
            Ok(None)
        }
    }

    async fn read_page(&self, limit: usize) -> Result<Vec<Item>> {
        let mut statement = Statement::new(format!(
            "SELECT data FROM `{}` LIMIT @limit",
            self.table
        ));
        statement.add_param("limit", &(limit as i64));

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction for scan")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute scan query")?;

        let mut items = Vec::new();
        while let Some(row) = result_set.next().await? {
            let document: String = row.column_by_name("data")?;
            items.push(
                Item::from_document(&document).context("Failed to deserialize stored item")?,
            );
        }

        tracing::debug!("Scanned {} items (limit: {})", items.len(), limit);
        Ok(items)
    }
}

/// Read one item inside a read-write transaction
async fn read_in_tx(
    tx: &mut ReadWriteTransaction,
    table: &str,
    id: &str,
) -> Result<Option<Item>, TxError> {
    let mut statement = Statement::new(format!("SELECT data FROM `{}` WHERE id = @id", table));
    statement.add_param("id", &id.to_string());

    let mut rows = tx.query(statement).await?;
    match rows.next().await? {
        Some(row) => {
            let document: String = row.column_by_name("data")?;
            Ok(Some(Item::from_document(&document)?))
        }
        None => Ok(None),
    }
}

async fn update_in_tx(
    tx: &mut ReadWriteTransaction,
    table: &str,
    id: &str,
    assignments: &[Assignment],
) -> Result<Option<Item>, TxError> {
    let Some(mut item) = read_in_tx(tx, table, id).await? else {
        return Ok(None);
    };

    item.apply(assignments);
    let document = item.to_document()?;
    tx.buffer_write(vec![update(table, &["id", "data"], &[&item.id, &document])]);
    Ok(Some(item))
}

async fn delete_in_tx(
    tx: &mut ReadWriteTransaction,
    table: &str,
    id: &str,
) -> Result<Option<Item>, TxError> {
    let Some(item) = read_in_tx(tx, table, id).await? else {
        return Ok(None);
    };

    tx.buffer_write(vec![delete(table, Key::new(&item.id))]);
    Ok(Some(item))
}

#[async_trait]
impl ItemStore for SpannerClient {
    async fn put(&self, item: &Item) -> StoreResult<()> {
        Ok(self.write(item).await?)
    }

    async fn scan(&self, limit: usize) -> StoreResult<Vec<Item>> {
        Ok(self.read_page(limit).await?)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Item>> {
        Ok(self.read(id).await?)
    }

    async fn update_existing(&self, id: &str, assignments: &[Assignment]) -> StoreResult<Item> {
        let (_, updated) = self
            .inner
            .read_write_transaction(|tx| {
                let table = self.table.clone();
                let id = id.to_string();
                let assignments = assignments.to_vec();
                Box::pin(async move { update_in_tx(tx, &table, &id, &assignments).await })
            })
            .await
            .map_err(StoreError::from)?;

        tracing::debug!("Conditional update of {} applied: {}", id, updated.is_some());
        updated.ok_or(StoreError::ConditionFailed)
    }

    async fn delete_existing(&self, id: &str) -> StoreResult<Item> {
        let (_, deleted) = self
            .inner
            .read_write_transaction(|tx| {
                let table = self.table.clone();
                let id = id.to_string();
                Box::pin(async move { delete_in_tx(tx, &table, &id).await })
            })
            .await
            .map_err(StoreError::from)?;

        tracing::debug!("Conditional delete of {} applied: {}", id, deleted.is_some());
        deleted.ok_or(StoreError::ConditionFailed)
    }
}

/// Automatically provision Spanner instance, database, and table
///
/// This function checks if the configured resources exist and creates them if needed.
/// It's designed to enable zero-setup local development with the emulator.
async fn auto_provision(config: &SpannerConfig, table: &str) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_table_exists(&admin_client, &database_path, table).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Ensure the Spanner instance exists, creating it if necessary
async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if config.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", config.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

/// Ensure the Spanner database exists, creating it if necessary
async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

/// DDL for the items table; the whole item document lives in `data`
fn create_table_ddl(table: &str) -> String {
    format!(
        r#"
CREATE TABLE `{}` (
    id STRING(MAX) NOT NULL,
    data JSON NOT NULL,
    created_at STRING(64) NOT NULL,
) PRIMARY KEY (id)
"#,
        table
    )
    .trim()
    .to_string()
}

/// Whether any DDL statement already creates `table`
fn table_in_ddl(statements: &[String], table: &str) -> bool {
    let plain = format!("CREATE TABLE {} (", table);
    let quoted = format!("CREATE TABLE `{}` (", table);
    statements
        .iter()
        .any(|stmt| stmt.contains(&plain) || stmt.contains(&quoted))
}

/// Ensure the items table exists, creating it if necessary
async fn ensure_table_exists(
    admin_client: &AdminClient,
    database_path: &str,
    table: &str,
) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    if table_in_ddl(&ddl_response.into_inner().statements, table) {
        tracing::info!("Table '{}' already exists", table);
        return Ok(());
    }

    tracing::info!("Table '{}' not found, creating...", table);

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![create_table_ddl(table)],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create table")?;

    tracing::info!("Table '{}' created successfully", table);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ENV_LOCK;
    use serde_json::json;

    fn emulator_config(instance: &str, database: &str) -> SpannerConfig {
        SpannerConfig {
            emulator_host: Some("localhost:9010".to_string()),
            project: "test-project".to_string(),
            instance: instance.to_string(),
            database: database.to_string(),
        }
    }

    /// Connect to the emulator, or `None` when it is not running
    async fn connect(instance: &str, database: &str) -> Option<SpannerClient> {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            std::env::set_var("SPANNER_EMULATOR_HOST", "localhost:9010");
        }

        let result = SpannerClient::from_config(&emulator_config(instance, database), "items").await;

        unsafe {
            std::env::remove_var("SPANNER_EMULATOR_HOST");
        }

        match result {
            Ok(client) => Some(client),
            Err(e) => {
                println!("Spanner test skipped (emulator may not be running): {}", e);
                None
            }
        }
    }

    fn sample_item(name: &str) -> Item {
        let mut fields = serde_json::Map::new();
        fields.insert("name".to_string(), json!(name));
        fields.insert("nested".to_string(), json!({"key": "value", "list": [1, 2, 3]}));
        Item::new(fields)
    }

    #[test]
    fn test_client_is_clonable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<SpannerClient>();
    }

    #[test]
    fn test_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SpannerClient>();
    }

    #[test]
    fn test_table_ddl_detection() {
        let ddl = create_table_ddl("items");
        assert!(ddl.starts_with("CREATE TABLE `items` ("));
        assert!(ddl.contains("PRIMARY KEY (id)"));

        let existing = vec![
            "CREATE TABLE other (\n  id STRING(MAX),\n) PRIMARY KEY(id)".to_string(),
            "CREATE TABLE items (\n  id STRING(MAX) NOT NULL,\n) PRIMARY KEY(id)".to_string(),
        ];
        assert!(table_in_ddl(&existing, "items"));
        assert!(!table_in_ddl(&existing, "item"));
        assert!(!table_in_ddl(&[], "items"));
    }

    #[test]
    fn test_anyhow_status_keeps_code_name() {
        let err = anyhow::Error::new(Status::new(Code::Unavailable, "emulator down"))
            .context("Failed to query item from Spanner");

        match StoreError::from(err) {
            StoreError::Backend { name, message } => {
                assert_eq!(name, "Unavailable");
                assert_eq!(message, "emulator down");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        match StoreError::from(anyhow::anyhow!("plain failure")) {
            StoreError::Backend { name, .. } => assert_eq!(name, "SpannerError"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auto_provisioning_idempotent() {
        if connect("idempotent-test-instance", "idempotent-test-db").await.is_some() {
            assert!(
                connect("idempotent-test-instance", "idempotent-test-db").await.is_some(),
                "Second auto-provisioning call should succeed"
            );
        }
    }

    #[tokio::test]
    async fn test_put_get_and_scan() {
        let Some(client) = connect("crud-test-instance", "crud-test-db").await else {
            return;
        };

        let item = sample_item("stored");
        client.put(&item).await.expect("put should succeed");

        let read = client.get(&item.id).await.expect("get should succeed");
        assert_eq!(read, Some(item.clone()));

        let missing = client.get("never-created").await.expect("get should succeed");
        assert!(missing.is_none());

        let page = client.scan(20).await.expect("scan should succeed");
        assert!(!page.is_empty());
        assert!(page.len() <= 20);
    }

    #[tokio::test]
    async fn test_conditional_update_and_delete() {
        let Some(client) = connect("crud-test-instance", "crud-test-db").await else {
            return;
        };

        let assignments = vec![Assignment {
            placeholder: "f0".to_string(),
            field: "note".to_string(),
            value: json!("x"),
        }];

        let missing = client.update_existing("never-created", &assignments).await;
        assert!(matches!(missing, Err(StoreError::ConditionFailed)));

        let item = sample_item("conditional");
        client.put(&item).await.expect("put should succeed");

        let updated = client
            .update_existing(&item.id, &assignments)
            .await
            .expect("update should succeed");
        assert_eq!(updated.fields["note"], json!("x"));
        assert_eq!(updated.fields["name"], json!("conditional"));
        assert_eq!(updated.created_at, item.created_at);

        let deleted = client
            .delete_existing(&item.id)
            .await
            .expect("delete should succeed");
        assert_eq!(deleted, updated);

        assert!(client.get(&item.id).await.unwrap().is_none());
        assert!(matches!(
            client.delete_existing(&item.id).await,
            Err(StoreError::ConditionFailed)
        ));
    }
}
