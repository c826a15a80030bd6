mod api;
mod db;
mod router;
mod state;

use std::sync::Arc;

use gatehouse_core::now_millis;
use gatehouse_store::{
    GateLog, MemoryGateLog, MemoryScheduleStore, PgGateLog, PgScheduleStore, ScheduleStore,
};
use tracing::info;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    gatehouse_core::config::load_dotenv();
    let config = gatehouse_core::Config::from_env();
    config.log_summary();

    let timezone = gatehouse_recurrence::parse_tz(&config.gate.timezone);

    let (store, gate_log): (Arc<dyn ScheduleStore>, Arc<dyn GateLog>) =
        match db::init_pg_pool(&config.postgres).await {
            Some(pool) => {
                let gate_log = PgGateLog::new(pool.clone());
                gate_log.ensure_seeded(now_millis()).await?;
                (
                    Arc::new(PgScheduleStore::new(pool)),
                    Arc::new(gate_log),
                )
            }
            None => (
                Arc::new(MemoryScheduleStore::new()),
                Arc::new(MemoryGateLog::new()),
            ),
        };

    let state = Arc::new(AppState::new(store, gate_log, timezone));

    let registered = state.scheduler.bootstrap().await?;
    info!(registered, timezone = %timezone, "timer jobs rebuilt from store");

    let app = router::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
