use procure_core::service::HierarchySearch;
use procure_core::{create_pool, router, AppConfig, AppState, PgCatalog, SpecificationFilterService};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载配置
    let config = AppConfig::load()?;

    // 初始化日志 - 本地时间格式, RUST_LOG 优先于配置
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    let catalog = Arc::new(PgCatalog::new(pool));
    let state = AppState {
        hierarchy: catalog.clone(),
        specifications: Arc::new(SpecificationFilterService::new(
            catalog,
            config.specification.on_fetch_error,
        )),
        search: HierarchySearch::new(config.search.min_chars, config.search.max_results),
    };

    let app = router(state);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/lines/calculate");
    info!("  POST /api/documents/summary");
    info!("  POST /api/documents/export");
    info!("  GET  /api/hierarchy/:level/nodes");
    info!("  GET  /api/hierarchy/search?q=");
    info!("  GET  /api/hierarchy/resolve?codes=");
    info!("  GET  /api/specifications/:category_code/candidates");
    info!("  GET  /api/specifications/:category_code/form-fields");
    info!("  GET  /api/specifications/:category_code/field-values/:field");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
