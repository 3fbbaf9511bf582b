use microblog::{AppState, Config, router};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("microblog=info,tower_http=info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let addr = config.bind_addr.clone();

    let state = AppState::new(config);

    // Idle login throttle entries are dropped once a minute
    let accounts = state.accounts.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            accounts.prune_login_throttle();
        }
    });

    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  GET  /health                      - Health check");
    info!("  GET  /signup | POST /signup       - Create account");
    info!("  GET  /login  | POST /login        - Login");
    info!("  POST /logout                      - Logout (auth)");
    info!("  GET  /home                        - All posts, newest first (auth)");
    info!("  GET  /users/{{username}}            - Profile (auth)");
    info!("  POST /users/{{username}}/follow     - Follow (auth)");
    info!("  POST /users/{{username}}/unfollow   - Unfollow (auth)");
    info!("  GET  /users/{{username}}/following  - Following list (auth)");
    info!("  GET  /users/{{username}}/followers  - Follower list (auth)");
    info!("  GET  /posts/new | POST /posts/new - Create post (auth)");
    info!("  GET  /posts/{{id}}                  - Post detail (auth)");
    info!("  POST /posts/{{id}}/delete           - Delete post (auth, owner only)");
    info!("  POST /posts/{{id}}/like             - Like (auth)");
    info!("  POST /posts/{{id}}/unlike           - Unlike (auth)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available; run until killed
        std::future::pending::<()>().await;
    }
}
