// ============================================================================
// BLOG - server-rendered posts, categories, comments and profiles
// ============================================================================

use blog::{AppState, Config, Store, fixtures::Fixtures, router};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "blog=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();

    let config = Config::from_env().expect("invalid configuration");

    // Categories and locations come from a fixture file; there is no admin UI.
    let store = Store::default();
    if let Some(path) = &config.fixtures_path {
        Fixtures::from_file(path)
            .expect("failed to load fixtures")
            .load_into(&store);
    }

    let addr = config.bind_addr.clone();
    let app = router(AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    info!("Server running on http://{}", addr);
    info!("  GET       /                       - Published posts");
    info!("  GET       /category/{{slug}}/       - Posts in a category");
    info!("  GET       /profile/{{username}}/    - Author profile");
    info!("  GET/POST  /posts/create/           - New post (auth)");
    info!("  GET/POST  /auth/registration/      - Create account");
    info!("  GET/POST  /auth/login/             - Login");

    axum::serve(listener, app).await.unwrap();
}
