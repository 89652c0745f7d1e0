use pathsense::calibration::StaticCamera;
use pathsense::classes::{self, ClassTable};
use pathsense::pipeline::{self, Navigator, NavigatorSettings};
use pathsense::source::replay::{self, ReplayFrameSource};
use pathsense::state::{AppState, NavigationCooldowns};
use pathsense::{api, config};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

fn init_tracing(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(&config.logging.level);
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        app = %config.app.name,
        "pathsense starting"
    );

    let class_table = load_class_table(&config);

    let mut app_state = AppState::new();
    app_state.set_cooldowns(NavigationCooldowns {
        minimal: config.minimal_cooldown(),
        maximal: config.maximal_cooldown(),
    });
    let calibration = Arc::clone(app_state.calibration());
    let state = Arc::new(RwLock::new(app_state));

    let camera = config.camera_characteristics();
    if camera.is_none() {
        tracing::warn!("No [camera] section configured, distances will be unavailable");
    }
    let navigator = Arc::new(Mutex::new(Navigator::new(
        class_table,
        Box::new(StaticCamera::new(camera)),
        calibration,
        NavigatorSettings::from_config(&config),
    )));

    // Start the frame thread when a recording is available
    let stop_flag = Arc::new(AtomicBool::new(false));
    let _frame_handle = match open_replay(&config) {
        Some(source) => Some(pipeline::spawn_frame_thread(
            source,
            Arc::clone(&navigator),
            Arc::clone(&state),
            config.frame_interval(),
            Arc::clone(&stop_flag),
        )),
        None => {
            tracing::warn!("Frame thread not started - no frame source available");
            None
        }
    };

    let app = api::router(Arc::clone(&state));
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    // Signal frame thread to stop
    stop_flag.store(true, Ordering::Relaxed);

    Ok(())
}

fn load_class_table(config: &config::Config) -> ClassTable {
    match config.class_table_path() {
        Some(path) => match classes::load_from_path(path) {
            Ok(table) => {
                tracing::info!(path = %path.display(), classes = table.len(), "Class table loaded");
                table
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load class table, using COCO defaults");
                ClassTable::coco()
            }
        },
        None => {
            tracing::info!("No class table configured, using COCO defaults");
            ClassTable::coco()
        }
    }
}

fn open_replay(config: &config::Config) -> Option<ReplayFrameSource> {
    let Some(path) = config.replay_path() else {
        tracing::warn!("No [source].replay_path configured");
        return None;
    };
    match replay::load_from_path(path, config.target_size()) {
        Ok(source) => {
            tracing::info!(
                path = %path.display(),
                frames = source.len(),
                "Replay recording loaded"
            );
            Some(source)
        }
        Err(err) => {
            tracing::error!(error = %err, path = %path.display(), "Failed to load replay recording");
            None
        }
    }
}
