//! Periodic sweep of reservations past their grace window.

use async_trait::async_trait;
use chrono::Utc;
use poise::serenity_prelude::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{SWEEP_INTERVAL, TIMEZONE};
use crate::modules::reservation::store::SessionStore;
use crate::tasks::Task;

#[derive(Clone)]
pub struct CleanupTask {
    store: Arc<SessionStore>,
}

impl CleanupTask {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Task for CleanupTask {
    fn name(&self) -> &str {
        "ReservationCleanup"
    }

    fn schedule(&self) -> Option<Duration> {
        Some(SWEEP_INTERVAL)
    }

    async fn execute(
        &mut self,
        _ctx: &Context,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let now = Utc::now().with_timezone(&TIMEZONE);
        let removed = self.store.sweep(now);
        if removed > 0 {
            info!(removed, "swept stale reservations");
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn Task> {
        Box::new(self.clone())
    }
}
