use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use murmur_core::{Platform, Result};
use murmur_extensions::{Extension, FrameworkExtension};
use murmur_threads::KnownUsers;

/// Startup hook: make sure the user directory exists under its well-known
/// key, so every later read sees a versioned envelope instead of a miss.
pub struct DirectoryBootstrap {
    users: Arc<KnownUsers>,
}

impl DirectoryBootstrap {
    pub fn new(users: Arc<KnownUsers>) -> Self {
        Self { users }
    }
}

impl Extension for DirectoryBootstrap {
    fn name(&self) -> &str {
        "directory_bootstrap"
    }

    fn platforms(&self) -> &[Platform] {
        &[]
    }
}

#[async_trait]
impl FrameworkExtension for DirectoryBootstrap {
    async fn setup(&self) -> Result<()> {
        let created = self
            .users
            .ensure_initialized()
            .map_err(|e| murmur_core::MurmurError::Storage(e.to_string()))?;
        if created {
            info!("user directory initialised");
        }
        Ok(())
    }
}
