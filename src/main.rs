// Yatube - A blog with groups, comments and author subscriptions
// Copyright (C) 2025 Yatube Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.


//! Yatube Core - blog backend for Yatube
//!
//! Runs as a background process serving the blog (listings, posts,
//! comments and subscriptions) to the front end over a JSON-based IPC
//! protocol.

mod blog;
mod cache;
mod config;
mod error;
mod ipc;
mod logger;
mod models;
mod pagination;
mod query;
mod store;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use crate::blog::Blog;
use crate::cache::{Clock, MemoryCache, PageCache, SystemClock};
use crate::config::Config;
use crate::ipc::IpcServer;
use crate::logger::Logger;
use crate::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging system
    Logger::init()?;

    info!("Yatube Core starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let store = Store::open(&config).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backend = MemoryCache::new(clock.clone(), config.index_cache_max_entries);
    let cache = PageCache::new(Arc::new(backend));
    let blog = Blog::new(store, cache, clock, &config);

    let server = Arc::new(IpcServer::new(blog, config.socket_path.clone()));

    match server.run().await {
        Ok(()) => {
            info!("Yatube Core shutting down gracefully");
        }
        Err(e) => {
            error!("Fatal error in IPC server: {:#}", e);
            return Err(e);
        }
    }

    Ok(())
}
