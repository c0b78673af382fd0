//! A loaded store wired to its database.

use std::rc::Rc;

use anyhow::{Context, Result};

use lt_core::EventLogStore;
use lt_db::{Database, Persister};

use crate::Config;

/// The store for one CLI invocation, persisted as it changes.
pub struct Session {
    pub store: EventLogStore,
    pub config: Config,
    persister: Persister,
}

impl Session {
    /// Opens the configured database, creating its directory if needed, and
    /// loads the store from it.
    pub fn open(config: Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create database directory")?;
        }

        let db = Database::open(&config.database_path)
            .with_context(|| format!("failed to open {}", config.database_path.display()))?;
        let db = Rc::new(db);
        let mut store = db
            .load_store()
            .context("failed to load saved contractions")?;
        let persister = Persister::new(Rc::clone(&db));
        store.subscribe(Box::new(persister.clone()));

        Ok(Self {
            store,
            config,
            persister,
        })
    }

    /// Ends the session, failing if any change could not be saved.
    pub fn finish(self) -> Result<()> {
        let failures = self.persister.failures();
        if failures > 0 {
            anyhow::bail!(
                "{failures} change(s) could not be saved to {}",
                self.config.database_path.display()
            );
        }
        Ok(())
    }
}
