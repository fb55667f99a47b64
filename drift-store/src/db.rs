use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create pipeline table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline (
            id SERIAL PRIMARY KEY,
            creator_id INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updater_id INTEGER NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            name VARCHAR(255) NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'OPEN'
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create stage table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stage (
            id SERIAL PRIMARY KEY,
            creator_id INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updater_id INTEGER NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            pipeline_id INTEGER NOT NULL REFERENCES pipeline(id),
            environment VARCHAR(255) NOT NULL,
            name VARCHAR(255) NOT NULL,
            position INTEGER NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'OPEN',
            UNIQUE (pipeline_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create task table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS task (
            id SERIAL PRIMARY KEY,
            creator_id INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updater_id INTEGER NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            pipeline_id INTEGER NOT NULL REFERENCES pipeline(id),
            stage_id INTEGER NOT NULL REFERENCES stage(id),
            database_id INTEGER NOT NULL,
            name VARCHAR(255) NOT NULL,
            statement TEXT NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'PENDING',
            result JSONB
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create issue table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS issue (
            id SERIAL PRIMARY KEY,
            creator_id INTEGER NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updater_id INTEGER NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            pipeline_id INTEGER REFERENCES pipeline(id),
            assignee_id INTEGER,
            name VARCHAR(255) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            status VARCHAR(20) NOT NULL DEFAULT 'OPEN'
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_stage_pipeline_id ON stage(pipeline_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_task_stage_id ON task(stage_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_task_pipeline_id ON task(pipeline_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_task_status ON task(status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issue_pipeline_id ON issue(pipeline_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_issue_assignee_id ON issue(assignee_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
