use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ride_dispatch::config::{DatabaseConfig, DispatchConfig, EnvironmentConfig, StoreBackend};
use ride_dispatch::repositories::{DispatchStore, MemoryDispatchStore, PgDispatchStore};
use ride_dispatch::services::ExpiryService;
use ride_dispatch::{create_app, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚕 Ride Dispatch - Motor de despacho y tarificación");
    info!("================================================");

    let config = EnvironmentConfig::from_env()?;
    let dispatch = DispatchConfig::from_env()?;

    let store: Arc<dyn DispatchStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = match db_config.create_pool().await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("✅ PostgreSQL conectado y migrado");
            Arc::new(PgDispatchStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("⚠️ Store en memoria: los datos se pierden al reiniciar");
            Arc::new(MemoryDispatchStore::new())
        }
    };

    let reaper = ExpiryService::new(store.clone(), dispatch.clone()).spawn();
    info!(
        "⏱️ Expiración: solicitudes {}s, matches {}s, barrido cada {}s",
        dispatch.request_ttl_secs, dispatch.match_ttl_secs, dispatch.expiry_sweep_secs
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = create_app(AppState::new(store, config, dispatch));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🙋 Solicitudes:");
    info!("   POST /api/ride-requests - Crear solicitud");
    info!("   GET  /api/ride-requests/mine - Mis solicitudes");
    info!("   POST /api/ride-requests/quote - Cotizar viaje");
    info!("   GET  /api/ride-requests/:id - Obtener solicitud");
    info!("   POST /api/ride-requests/:id/cancel - Cancelar solicitud");
    info!("   POST /api/ride-requests/:id/offers - Enviar oferta");
    info!("   GET  /api/ride-requests/:id/offers - Ofertas de la solicitud");
    info!("   GET  /api/offers - Mis ofertas");
    info!("🤝 Matches:");
    info!("   GET  /api/matches - Mis matches");
    info!("   GET  /api/matches/:id - Obtener match");
    info!("   POST /api/matches/:id/accept - Aceptar match");
    info!("   POST /api/matches/:id/reject - Rechazar match");
    info!("🚗 Viajes:");
    info!("   GET  /api/rides/mine - Mis viajes");
    info!("   GET  /api/rides/:id - Obtener viaje");
    info!("   POST /api/rides/:id/start - Iniciar viaje");
    info!("   POST /api/rides/:id/complete - Completar viaje");
    info!("💰 Tarifas:");
    info!("   GET  /api/pricing-configs - Listar configuraciones");
    info!("   POST /api/pricing-configs - Crear configuración");
    info!("   PUT  /api/pricing-configs/:id - Actualizar configuración");
    info!("🧭 Conductores:");
    info!("   GET  /api/drivers/me - Mi perfil");
    info!("   POST /api/drivers/me/location - Reportar ubicación");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
    }

    reaper.abort();
    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo instalar el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
