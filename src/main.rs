use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlmend::compiler::{SqlCompiler, TenantScope};
use sqlmend::config::AgentConfig;
use sqlmend::execution::PgExecutor;
use sqlmend::execution_loop::{RequestContext, RetryOrchestrator};
use sqlmend::llm::LlmClient;
use sqlmend::oracle::LlmOracle;
use sqlmend::query::QueryModel;
use sqlmend::schema::{SchemaRegistry, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlmend")]
#[command(about = "Answer questions over a fixed schema with self-correcting SQL")]
struct Args {
    /// Semantic model JSON to use instead of the built-in schema
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question and run the full retry loop
    Ask {
        question: String,

        /// What the answer should look like
        #[arg(long, default_value = "")]
        expected: String,

        /// Restrict rows to this tenant
        #[arg(long)]
        tenant: Option<i64>,

        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Print the schema context given to the oracle
    Schema {
        #[arg(long)]
        table: Option<String>,
    },
    /// Validate and compile a query model file without touching the database
    Compile {
        model: PathBuf,

        #[arg(long)]
        tenant: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AgentConfig::from_env()?;
    if let Some(path) = args.schema {
        config.schema_path = Some(path);
    }

    let registry = Arc::new(load_registry(config.schema_path.as_deref())?);

    match args.command {
        Command::Ask {
            question,
            expected,
            tenant,
            max_attempts,
        } => {
            if let Some(max_attempts) = max_attempts {
                config.max_attempts = max_attempts;
            }
            config.validate()?;
            ask(&config, registry, question, expected, tenant).await
        }
        Command::Schema { table } => {
            let context = match table {
                Some(table) => registry.table_context_json(table.parse::<Table>()?)?,
                None => registry.context_json()?,
            };
            println!("{}", context);
            Ok(())
        }
        Command::Compile { model, tenant } => {
            let content = std::fs::read_to_string(&model)
                .with_context(|| format!("Failed to read {}", model.display()))?;
            let model: QueryModel = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a valid query model", model.display()))?;

            let mut compiler = SqlCompiler::new(registry).with_row_limit(config.row_limit);
            if let Some(tenant_id) = tenant {
                compiler = compiler.with_tenant(TenantScope::new(config.tenant_column.clone(), tenant_id)?);
            }
            println!("{}", compiler.compile(&model)?);
            Ok(())
        }
    }
}

fn load_registry(path: Option<&Path>) -> Result<SchemaRegistry> {
    let registry = match path {
        Some(path) => {
            info!("Loading schema from {}", path.display());
            SchemaRegistry::load(path)?
        }
        None => SchemaRegistry::builtin()?,
    };
    Ok(registry)
}

async fn ask(
    config: &AgentConfig,
    registry: Arc<SchemaRegistry>,
    question: String,
    expected: String,
    tenant: Option<i64>,
) -> Result<()> {
    let llm = LlmClient::new(
        config.require_api_key()?.to_string(),
        config.openai_model.clone(),
        config.openai_base_url.clone(),
    )
    .with_sampling(config.temperature, config.max_tokens);
    let oracle = LlmOracle::new(llm, config.row_limit);

    let executor =
        PgExecutor::connect(config.require_database_url()?, config.db_max_connections).await?;

    let orchestrator = RetryOrchestrator::new(registry, Arc::new(oracle), Arc::new(executor))
        .with_policy(config.retry_policy())
        .with_row_limit(config.row_limit)
        .with_tenant_column(config.tenant_column.clone());

    let mut ctx = RequestContext::new(question).with_expected_answer(expected);
    if let Some(tenant_id) = tenant {
        ctx = ctx.with_tenant(tenant_id);
    }

    let report = orchestrator.run(ctx).await;
    info!("Run {} finished after {} attempt(s)", report.run_id, report.attempts());
    println!("{}", report.outcome.render());
    Ok(())
}
