//! Restart marker persistence.

use mongodb::bson::doc;
use mongodb::Collection;

use crate::database::models::RestartMarker;
use crate::database::Database;

type Result<T> = std::result::Result<T, mongodb::error::Error>;

/// Stores the marker /restart leaves behind for the next process.
/// The `state` collection holds at most one marker.
#[derive(Clone)]
pub struct StateRepository {
    state: Collection<RestartMarker>,
}

impl StateRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            state: db.collection("state"),
        }
    }

    /// Record where the restart confirmation should land.
    pub async fn set_restart_marker(
        &self,
        chat_id: i64,
        message_id: i32,
        locale: &str,
    ) -> Result<()> {
        self.state.delete_many(doc! {}).await?;
        self.state
            .insert_one(RestartMarker {
                chat_id,
                message_id,
                locale: locale.to_string(),
                requested_at: chrono::Utc::now().timestamp(),
            })
            .await?;
        Ok(())
    }

    /// Remove and return the pending marker, if any.
    pub async fn take_restart_marker(&self) -> Result<Option<RestartMarker>> {
        let marker = self.state.find_one(doc! {}).await?;
        if marker.is_some() {
            self.state.delete_many(doc! {}).await?;
        }
        Ok(marker)
    }
}
