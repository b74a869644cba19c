//! MongoDB wrapper.

use mongodb::{options::ClientOptions, Client, Collection};
use tracing::info;

/// Handle to the bot's MongoDB database.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect and verify the connection with a ping.
    ///
    /// # Errors
    /// Returns an error if the URI is invalid or the server is unreachable.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        client
            .database("admin")
            .run_command(mongodb::bson::doc! { "ping": 1 })
            .await?;

        info!("Connected to MongoDB");

        Ok(Self {
            db: client.database(db_name),
        })
    }

    /// The underlying database, for raw command access.
    pub fn db(&self) -> &mongodb::Database {
        &self.db
    }

    /// A typed collection.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}
