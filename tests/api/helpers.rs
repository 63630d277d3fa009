//! Spawns the app against a freshly created and migrated database for every test.
use std::{net::SocketAddr, sync::OnceLock};

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde_json::Value;
use uuid::Uuid;
use waitlist::{config::AppConfig, database::DbManager, init_dbg_tracing, App};

pub struct TestApp {
    pub addr: SocketAddr,
    pub http_client: Client,
    pub dm: DbManager,
}

/// A stored `waitlist` row.
#[derive(Debug, sqlx::FromRow)]
pub struct StoredEntry {
    pub email: String,
    pub audience: String,
    pub org: Option<String>,
    pub ts: DateTime<Utc>,
    pub ua: Option<String>,
    pub ip: Option<String>,
}

fn _init_test_subscriber() {
    static SUBSCRIBER: OnceLock<()> = OnceLock::new();
    SUBSCRIBER.get_or_init(|| {
        init_dbg_tracing();
    });
}

impl TestApp {
    /// A helper function that tries to spawn a separate thread to serve our app
    /// returning the `TestApp` containing the *socket address* on which it is listening.
    pub async fn spawn() -> Result<Self> {
        // _init_test_subscriber();

        let mut config = AppConfig::load()?;
        // Trying to bind port 0 will trigger an OS scan for an available port
        // which will then be bound to the application.
        config.net_config.host = [127, 0, 0, 1];
        config.net_config.app_port = 0;
        config.db_config.db_name = format!("waitlist_test_{}", Uuid::new_v4().simple());

        DbManager::configure_for_test(&config.db_config).await?;

        let app = App::build_from_config(config).await?;
        let addr = app.local_addr()?;
        let dm = app.app_state.database_mgr.clone();

        tokio::spawn(waitlist::serve(app));

        Ok(TestApp {
            addr,
            http_client: Client::new(),
            dm,
        })
    }

    pub fn waitlist_url(&self) -> String {
        format!("http://{}/api/waitlist", self.addr)
    }

    pub async fn post_waitlist(&self, body: &Value) -> Result<Response> {
        let res = self
            .http_client
            .post(self.waitlist_url())
            .json(body)
            .send()
            .await?;
        Ok(res)
    }

    pub async fn post_waitlist_raw(&self, body: &'static str) -> Result<Response> {
        let res = self
            .http_client
            .post(self.waitlist_url())
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;
        Ok(res)
    }

    pub async fn stored_entries(&self) -> Result<Vec<StoredEntry>> {
        let entries = sqlx::query_as::<_, StoredEntry>(
            "SELECT email, audience, org, ts, ua, ip FROM waitlist ORDER BY email",
        )
        .fetch_all(self.dm.db())
        .await?;
        Ok(entries)
    }
}
