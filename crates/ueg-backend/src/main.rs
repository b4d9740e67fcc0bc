use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use ueg_backend::backend::state::AppState;
use ueg_backend::config::{Config, StorageBackend};

#[derive(Debug, Parser)]
#[command(
    name = "ueg-backend",
    about = "API REST de cursos, turmas e alunos"
)]
struct Args {
    /// Arquivo de configuração TOML (padrão: <config dir>/ueg-backend/config.toml, se existir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Endereço de escuta, ex.: 127.0.0.1:8080
    #[arg(long)]
    bind: Option<String>,

    /// Caminho do banco SQLite
    #[arg(long, conflicts_with = "memory")]
    database: Option<PathBuf>,

    /// Usa o repositório em memória (nada é persistido)
    #[arg(long)]
    memory: bool,

    /// Mostra a configuração efetiva em TOML e sai
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// Flags da linha de comando têm precedência sobre o arquivo.
    fn aplicar(&self, config: &mut Config) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(path) = &self.database {
            config.database.backend = StorageBackend::Sqlite;
            config.database.path = path.clone();
        }
        if self.memory {
            config.database.backend = StorageBackend::Memory;
        }
    }
}

fn init_tracing(filtro: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filtro))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();
}

async fn sinal_de_parada() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "não foi possível escutar Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C recebido, encerrando");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    args.aplicar(&mut config);

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_tracing(&config.log.filter);

    let state =
        AppState::from_config(&config.database).context("Falha ao abrir o repositório de dados")?;
    let app = ueg_backend::app(state, &config.server)?;

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Falha ao escutar em {}", config.server.bind))?;
    info!(addr = %listener.local_addr()?, "servidor iniciado");

    axum::serve(listener, app)
        .with_graceful_shutdown(sinal_de_parada())
        .await?;

    info!("servidor encerrado");
    Ok(())
}
