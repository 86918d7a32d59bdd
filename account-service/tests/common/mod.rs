#![allow(dead_code)]

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use account_service::config::ApiConfig;
use account_service::domain::user::ports::UserRepository;
use account_service::domain::user::service::UserService;
use account_service::inbound::http::router::create_router;
use account_service::outbound::repositories::InMemoryUserRepository;
use auth::Authenticator;
use auth::PasswordHasher;
use auth::TokenService;
use auth::WorkFactor;
use serde_json::json;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::Connection;
use sqlx::Executor;
use sqlx::PgConnection;
use sqlx::PgPool;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub token_service: TokenService,
}

impl TestApp {
    /// Spawn the application over an in-memory directory
    pub async fn spawn() -> Self {
        Self::spawn_with(ApiConfig::default()).await
    }

    pub async fn spawn_with(api: ApiConfig) -> Self {
        Self::spawn_with_repository(Arc::new(InMemoryUserRepository::new()), api).await
    }

    pub async fn spawn_with_repository<UR: UserRepository>(
        repository: Arc<UR>,
        api: ApiConfig,
    ) -> Self {
        Self::spawn_with_parts(repository, fast_hasher(), api).await
    }

    /// Spawn the application with a specific password hasher
    pub async fn spawn_with_hasher(password_hasher: PasswordHasher) -> Self {
        Self::spawn_with_parts(
            Arc::new(InMemoryUserRepository::new()),
            password_hasher,
            ApiConfig::default(),
        )
        .await
    }

    /// Spawn the application in a background task and return TestApp
    pub async fn spawn_with_parts<UR: UserRepository>(
        repository: Arc<UR>,
        password_hasher: PasswordHasher,
        api: ApiConfig,
    ) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let authenticator = Arc::new(Authenticator::from_parts(
            password_hasher,
            TokenService::new(JWT_SECRET),
        ));
        let user_service = Arc::new(UserService::new(repository, Arc::clone(&authenticator)));

        let router = create_router(user_service, authenticator, api);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::builder()
                .build()
                .expect("Failed to create reqwest client"),
            token_service: TokenService::new(JWT_SECRET),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Register a user and return the response body
    pub async fn register(
        &self,
        name: &str,
        phone: &str,
        email: &str,
        password: &str,
    ) -> serde_json::Value {
        let response = self
            .post("/auth/register")
            .json(&json!({
                "name": name,
                "phone": phone,
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        response.json().await.expect("Failed to parse response")
    }

    /// Log in and return the issued token
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post("/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        body["data"]["token"]
            .as_str()
            .expect("Missing token")
            .to_string()
    }
}

/// Cheap Argon2id parameters so tests do not spend seconds hashing
pub fn fast_hasher() -> PasswordHasher {
    PasswordHasher::with_work_factor(WorkFactor {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("Invalid test work factor")
}

/// Argon2id parameters heavy enough that one hash outlasts a plain request
pub fn slow_hasher() -> PasswordHasher {
    PasswordHasher::with_work_factor(WorkFactor {
        memory_kib: 64 * 1024,
        iterations: 8,
        parallelism: 1,
    })
    .expect("Invalid test work factor")
}

/// Test database helper
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
}

static DB_COUNTER: AtomicU32 = AtomicU32::new(0);

impl TestDb {
    /// Create a fresh database when `DATABASE_URL` points at a Postgres server
    pub async fn try_new() -> Option<Self> {
        let postgres_url = std::env::var("DATABASE_URL").ok()?;

        let db_name = format!(
            "test_account_service_{}_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_millis(),
            DB_COUNTER.fetch_add(1, Ordering::SeqCst)
        );

        let mut conn = PgConnection::connect(&postgres_url)
            .await
            .expect("Failed to connect to Postgres");

        // Create test database
        conn.execute(format!(r#"CREATE DATABASE "{}";"#, db_name).as_str())
            .await
            .expect("Failed to create test database");

        // Connect to the new test database
        let options = postgres_url
            .parse::<PgConnectOptions>()
            .expect("Failed to parse DATABASE_URL")
            .database(&db_name);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .expect("Failed to connect to test database");

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(Self { pool, db_name })
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        let Ok(postgres_url) = std::env::var("DATABASE_URL") else {
            return;
        };

        // Database cleanup happens asynchronously
        let db_name = self.db_name.clone();
        tokio::spawn(async move {
            if let Ok(mut conn) = PgConnection::connect(&postgres_url).await {
                // Terminate existing connections
                let _ = conn
                    .execute(
                        format!(
                            r#"SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}';"#,
                            db_name
                        )
                        .as_str(),
                    )
                    .await;

                // Drop database
                let _ = conn
                    .execute(format!(r#"DROP DATABASE IF EXISTS "{}";"#, db_name).as_str())
                    .await;
            }
        });
    }
}
