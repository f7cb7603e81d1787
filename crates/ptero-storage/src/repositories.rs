//! Repository layer: one `Database` handle wrapping a `PgPool`, one method
//! per query — thin wrappers around `sqlx::query_as` bound straight off
//! the pool, over the workflow/node/link/job/output schema this service
//! persists.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::*;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn from_url(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // ============================================
    // Workflows
    // ============================================

    pub async fn create_workflow(&self, input: CreateWorkflow) -> Result<WorkflowRow> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            INSERT INTO workflow (id, name, status)
            VALUES ($1, $2, 'new')
            RETURNING id, name, status, created_at
            "#,
        )
        .bind(input.id)
        .bind(&input.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_workflow(&self, id: Uuid) -> Result<Option<WorkflowRow>> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            "SELECT id, name, status, created_at FROM workflow WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn set_workflow_status(&self, id: Uuid, status: &str) -> Result<()> {
        sqlx::query("UPDATE workflow SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_workflow_by_name(&self, name: &str) -> Result<Option<WorkflowRow>> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            "SELECT id, name, status, created_at FROM workflow WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Relies on `ON DELETE CASCADE` from `workflow` to sweep every node,
    /// link, job, output, color group, and webhook subscription it owns.
    pub async fn delete_workflow(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM workflow WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ============================================
    // Nodes
    // ============================================

    pub async fn create_node(&self, input: CreateNode) -> Result<NodeRow> {
        let row = sqlx::query_as::<_, NodeRow>(
            r#"
            INSERT INTO node (id, workflow_id, parent_id, name, kind, index, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'new')
            RETURNING id, workflow_id, parent_id, name, kind, index, status
            "#,
        )
        .bind(input.id)
        .bind(input.workflow_id)
        .bind(input.parent_id)
        .bind(&input.name)
        .bind(&input.kind)
        .bind(input.index)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_node(&self, id: Uuid) -> Result<Option<NodeRow>> {
        let row = sqlx::query_as::<_, NodeRow>(
            "SELECT id, workflow_id, parent_id, name, kind, index, status FROM node WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_nodes_for_workflow(&self, workflow_id: Uuid) -> Result<Vec<NodeRow>> {
        let rows = sqlx::query_as::<_, NodeRow>(
            r#"
            SELECT id, workflow_id, parent_id, name, kind, index, status
            FROM node
            WHERE workflow_id = $1
            ORDER BY index ASC
            "#,
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn set_node_status(&self, id: Uuid, status: &str) -> Result<()> {
        sqlx::query("UPDATE node SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ============================================
    // Links & data-flow entries
    // ============================================

    pub async fn create_link(
        &self,
        id: Uuid,
        workflow_id: Uuid,
        source_id: Uuid,
        destination_id: Uuid,
        entries: &[(String, String)],
    ) -> Result<LinkRow> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            INSERT INTO link (id, workflow_id, source_id, destination_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, workflow_id, source_id, destination_id
            "#,
        )
        .bind(id)
        .bind(workflow_id)
        .bind(source_id)
        .bind(destination_id)
        .fetch_one(&mut *tx)
        .await?;

        for (source_property, destination_property) in entries {
            sqlx::query(
                r#"
                INSERT INTO data_flow_entry (link_id, source_property, destination_property)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(id)
            .bind(source_property)
            .bind(destination_property)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    pub async fn list_links_for_workflow(&self, workflow_id: Uuid) -> Result<Vec<LinkRow>> {
        let rows = sqlx::query_as::<_, LinkRow>(
            "SELECT id, workflow_id, source_id, destination_id FROM link WHERE workflow_id = $1",
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_data_flow_entries(&self, link_id: Uuid) -> Result<Vec<DataFlowEntryRow>> {
        let rows = sqlx::query_as::<_, DataFlowEntryRow>(
            "SELECT link_id, source_property, destination_property FROM data_flow_entry WHERE link_id = $1",
        )
        .bind(link_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Jobs & response links
    // ============================================

    /// Fails with a unique-constraint violation on `(node_id, job_id)` if
    /// called twice for the same job — callers treat that as "already
    /// dispatched" rather than propagating it as a fresh error.
    pub async fn create_job(
        &self,
        node_id: Uuid,
        method_name: &str,
        color: i64,
        job_id: &str,
        stdin: serde_json::Value,
        response_links: &[(String, String)],
    ) -> Result<JobRow> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO job (node_id, method_name, color, job_id, stdin)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING node_id, method_name, color, job_id, stdin
            "#,
        )
        .bind(node_id)
        .bind(method_name)
        .bind(color)
        .bind(job_id)
        .bind(&stdin)
        .fetch_one(&mut *tx)
        .await?;

        for (name, url) in response_links {
            sqlx::query(
                r#"
                INSERT INTO response_link (node_id, job_id, name, url)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(node_id)
            .bind(job_id)
            .bind(name)
            .bind(url)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(row)
    }

    pub async fn get_job(&self, node_id: Uuid, job_id: &str) -> Result<Option<JobRow>> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT node_id, method_name, color, job_id, stdin FROM job WHERE node_id = $1 AND job_id = $2",
        )
        .bind(node_id)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Looks a job up by the `(node_id, color)` pair a fresh `execute`
    /// callback carries, so a redelivery can be recognized before it would
    /// otherwise create a second job under a new `job_id`.
    pub async fn get_job_by_color(&self, node_id: Uuid, color: i64) -> Result<Option<JobRow>> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT node_id, method_name, color, job_id, stdin FROM job WHERE node_id = $1 AND color = $2",
        )
        .bind(node_id)
        .bind(color)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Adds any response links a redelivered `execute` callback carries
    /// that the already-dispatched job didn't register the first time
    /// around, leaving existing ones untouched.
    pub async fn add_response_links(
        &self,
        node_id: Uuid,
        job_id: &str,
        response_links: &[(String, String)],
    ) -> Result<()> {
        for (name, url) in response_links {
            sqlx::query(
                r#"
                INSERT INTO response_link (node_id, job_id, name, url)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (node_id, job_id, name) DO NOTHING
                "#,
            )
            .bind(node_id)
            .bind(job_id)
            .bind(name)
            .bind(url)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn list_response_links(&self, node_id: Uuid, job_id: &str) -> Result<Vec<ResponseLinkRow>> {
        let rows = sqlx::query_as::<_, ResponseLinkRow>(
            "SELECT node_id, job_id, name, url FROM response_link WHERE node_id = $1 AND job_id = $2",
        )
        .bind(node_id)
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Execution status history
    // ============================================

    pub async fn append_execution_status(
        &self,
        node_id: Uuid,
        color: i64,
        status: &str,
    ) -> Result<ExecutionStatusRow> {
        let row = sqlx::query_as::<_, ExecutionStatusRow>(
            r#"
            INSERT INTO execution_status_history (node_id, color, status, timestamp)
            VALUES ($1, $2, $3, NOW())
            RETURNING node_id, color, status, timestamp
            "#,
        )
        .bind(node_id)
        .bind(color)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_execution_history(&self, node_id: Uuid, color: i64) -> Result<Vec<ExecutionStatusRow>> {
        let rows = sqlx::query_as::<_, ExecutionStatusRow>(
            r#"
            SELECT node_id, color, status, timestamp
            FROM execution_status_history
            WHERE node_id = $1 AND color = $2
            ORDER BY timestamp ASC
            "#,
        )
        .bind(node_id)
        .bind(color)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Every execution touched since `since`, for one workflow's executions
    /// report — grounded in `get_workflow_executions`'s `since` filter.
    pub async fn list_executions_since(
        &self,
        workflow_id: Uuid,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<ExecutionStatusRow>> {
        let rows = match since {
            Some(ts) => {
                sqlx::query_as::<_, ExecutionStatusRow>(
                    r#"
                    SELECT h.node_id, h.color, h.status, h.timestamp
                    FROM execution_status_history h
                    JOIN node n ON n.id = h.node_id
                    WHERE n.workflow_id = $1 AND h.timestamp > $2
                    ORDER BY h.timestamp ASC
                    "#,
                )
                .bind(workflow_id)
                .bind(ts)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ExecutionStatusRow>(
                    r#"
                    SELECT h.node_id, h.color, h.status, h.timestamp
                    FROM execution_status_history h
                    JOIN node n ON n.id = h.node_id
                    WHERE n.workflow_id = $1
                    ORDER BY h.timestamp ASC
                    "#,
                )
                .bind(workflow_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }

    // ============================================
    // Outputs
    // ============================================

    pub async fn put_output(
        &self,
        node_id: Uuid,
        property: &str,
        color: i64,
        value: serde_json::Value,
    ) -> Result<OutputRow> {
        let row = sqlx::query_as::<_, OutputRow>(
            r#"
            INSERT INTO output (node_id, property, color, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (node_id, property, color) DO UPDATE SET value = EXCLUDED.value
            RETURNING node_id, property, color, value
            "#,
        )
        .bind(node_id)
        .bind(property)
        .bind(color)
        .bind(&value)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_output(&self, node_id: Uuid, property: &str, color: i64) -> Result<Option<OutputRow>> {
        let row = sqlx::query_as::<_, OutputRow>(
            "SELECT node_id, property, color, value FROM output WHERE node_id = $1 AND property = $2 AND color = $3",
        )
        .bind(node_id)
        .bind(property)
        .bind(color)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Every output produced anywhere in a workflow — the source rows for
    /// the flat outputs report and for reconstructing an `OutputStore`.
    pub async fn list_outputs_for_workflow(&self, workflow_id: Uuid) -> Result<Vec<OutputRow>> {
        let rows = sqlx::query_as::<_, OutputRow>(
            r#"
            SELECT o.node_id, o.property, o.color, o.value
            FROM output o
            JOIN node n ON n.id = o.node_id
            WHERE n.workflow_id = $1
            "#,
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Color groups
    // ============================================

    pub async fn create_color_group(
        &self,
        node_id: Uuid,
        parent_color: i64,
        range_begin: i64,
        range_end: i64,
    ) -> Result<ColorGroupRow> {
        let row = sqlx::query_as::<_, ColorGroupRow>(
            r#"
            INSERT INTO color_group (node_id, parent_color, range_begin, range_end)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (node_id, parent_color) DO UPDATE SET range_begin = color_group.range_begin
            RETURNING node_id, parent_color, range_begin, range_end
            "#,
        )
        .bind(node_id)
        .bind(parent_color)
        .bind(range_begin)
        .bind(range_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_color_groups_for_node(&self, node_id: Uuid) -> Result<Vec<ColorGroupRow>> {
        let rows = sqlx::query_as::<_, ColorGroupRow>(
            "SELECT node_id, parent_color, range_begin, range_end FROM color_group WHERE node_id = $1",
        )
        .bind(node_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Every color group allocated anywhere in a workflow — the source
    /// rows for reconstructing a `ColorStore`.
    pub async fn list_color_groups_for_workflow(&self, workflow_id: Uuid) -> Result<Vec<ColorGroupRow>> {
        let rows = sqlx::query_as::<_, ColorGroupRow>(
            r#"
            SELECT cg.node_id, cg.parent_color, cg.range_begin, cg.range_end
            FROM color_group cg
            JOIN node n ON n.id = cg.node_id
            WHERE n.workflow_id = $1
            "#,
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ============================================
    // Webhook subscriptions
    // ============================================

    pub async fn create_webhook_subscription(
        &self,
        input: CreateWebhookSubscription,
    ) -> Result<WebhookSubscriptionRow> {
        let row = sqlx::query_as::<_, WebhookSubscriptionRow>(
            r#"
            INSERT INTO webhook_subscription (id, workflow_id, event, url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, workflow_id, event, url
            "#,
        )
        .bind(input.id)
        .bind(input.workflow_id)
        .bind(&input.event)
        .bind(&input.url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_webhook_subscriptions(
        &self,
        workflow_id: Uuid,
    ) -> Result<Vec<WebhookSubscriptionRow>> {
        let rows = sqlx::query_as::<_, WebhookSubscriptionRow>(
            "SELECT id, workflow_id, event, url FROM webhook_subscription WHERE workflow_id = $1",
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
