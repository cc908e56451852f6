//! Wire-mode runner
//!
//! Owns the whole stack an external client would talk to: the store, a
//! protocol server bound to it, and one connected client. The runner's own
//! contract stays synchronous; every operation is a single blocking round trip
//! on the runner's tokio runtime.
//!
//! A request interrupted by the operation timeout leaves the connection out of
//! step. The runner then replaces the client, with a fresh handshake, before
//! the next operation, so only the timed-out test fails.
//!
//! Teardown order is client, then server, then store. Each step runs even if an
//! earlier one failed, so a partially opened runner releases what it holds.

use std::net::SocketAddr;
use std::sync::Arc;

use docparity_core::Mode;
use docparity_engine::{Store, UpdateOptions};
use docparity_wire::{ClientOptions, ProtocolClient, ProtocolServer, ServerConfig, ServerHandle, WireError};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::config::{RunnerConfig, WireConfig};
use crate::error::{ActionError, HarnessError};
use crate::operation::Operation;
use crate::outcome::Outcome;
use crate::runner::Runner;

/// Drives a [`Store`] through the protocol server
pub struct WireRunner {
    implementation: String,
    runtime: Runtime,
    client: Option<ProtocolClient>,
    client_options: ClientOptions,
    server: Option<ServerHandle>,
    store: Option<Arc<dyn Store>>,
}

impl WireRunner {
    /// Open the store named by `config.store` and stand up server and client
    pub fn open(config: &RunnerConfig) -> Result<Self, HarnessError> {
        let wire = config.wire()?;
        let location = config.store.to_string_lossy();
        let store = docparity_engine::open(&location).map_err(HarnessError::StoreOpen)?;
        Self::with_store(config.implementation.clone(), &config.database, wire, store)
    }

    /// Serve an already-open store.
    ///
    /// On failure everything created so far, including `store`, is closed.
    pub fn with_store(
        implementation: impl Into<String>,
        database: &str,
        wire: &WireConfig,
        store: Arc<dyn Store>,
    ) -> Result<Self, HarnessError> {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("docparity-wire")
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                let _ = store.close();
                return Err(HarnessError::Io {
                    reason: format!("failed to build runtime: {}", e),
                });
            }
        };

        let mut runner = WireRunner {
            implementation: implementation.into(),
            runtime,
            client: None,
            client_options: ClientOptions {
                database: database.to_string(),
                op_timeout: wire.op_timeout,
            },
            server: None,
            store: Some(Arc::clone(&store)),
        };

        let server_config = ServerConfig {
            listen: wire.listen.clone(),
            ready_timeout: wire.ready_timeout,
        };
        let server = match runner
            .runtime
            .block_on(ProtocolServer::start(&server_config, store))
        {
            Ok(server) => server,
            Err(e) => {
                let _ = runner.close();
                return Err(HarnessError::ServerStart(e));
            }
        };
        let addr = server.local_addr();
        runner.server = Some(server);

        let options = runner.client_options.clone();
        match runner.runtime.block_on(ProtocolClient::connect(addr, options)) {
            Ok(client) => runner.client = Some(client),
            Err(e) => {
                let _ = runner.close();
                return Err(HarnessError::ClientConnect(e));
            }
        }

        info!(target: "docparity::runner", %addr, "Wire runner opened");
        Ok(runner)
    }

    /// Address the protocol server is bound to, while open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(ServerHandle::local_addr)
    }

    /// Replace a poisoned client with a freshly connected one
    fn ensure_client(&mut self) -> Result<(), ActionError> {
        let poisoned = self
            .client
            .as_ref()
            .map_or(false, ProtocolClient::is_poisoned);
        if !poisoned {
            return Ok(());
        }
        let addr = self
            .local_addr()
            .ok_or(ActionError::Wire(WireError::ConnectionClosed))?;
        if let Some(stale) = self.client.take() {
            if let Err(e) = self.runtime.block_on(stale.disconnect()) {
                debug!(target: "docparity::runner", error = %e, "Stale client disconnect failed");
            }
        }
        warn!(target: "docparity::runner", %addr, "Reconnecting after interrupted request");
        let client = self
            .runtime
            .block_on(ProtocolClient::connect(addr, self.client_options.clone()))?;
        self.client = Some(client);
        Ok(())
    }
}

async fn round_trip(
    client: &mut ProtocolClient,
    collection: &str,
    op: &Operation,
) -> Result<Outcome, WireError> {
    let outcome = match op {
        Operation::InsertOne { doc } => {
            let id = client.insert_one(collection, doc.clone()).await?;
            Outcome::inserted(&[id])
        }
        Operation::InsertMany { docs } => {
            Outcome::inserted(&client.insert_many(collection, docs.clone()).await?)
        }
        Operation::Find { filter, options } => {
            Outcome::documents(client.find(collection, filter, options).await?)
        }
        Operation::FindOne { filter } => {
            Outcome::maybe_document(client.find_one(collection, filter).await?)
        }
        Operation::UpdateOne {
            filter,
            update,
            upsert,
        } => {
            let options = UpdateOptions {
                upsert: *upsert,
                multi: false,
            };
            Outcome::updated(client.update(collection, filter, update, options).await?)
        }
        Operation::UpdateMany { filter, update } => {
            let options = UpdateOptions {
                upsert: false,
                multi: true,
            };
            Outcome::updated(client.update(collection, filter, update, options).await?)
        }
        Operation::DeleteOne { filter } => {
            Outcome::deleted(client.delete(collection, filter, true).await?)
        }
        Operation::DeleteMany { filter } => {
            Outcome::deleted(client.delete(collection, filter, false).await?)
        }
        Operation::ReplaceOne {
            filter,
            replacement,
        } => Outcome::replaced(&client.replace_one(collection, filter, replacement).await?),
        Operation::FindAndModify { filter, options } => {
            Outcome::maybe_document(client.find_and_modify(collection, filter, options).await?)
        }
        Operation::Distinct { field, filter } => {
            Outcome::counted(client.distinct(collection, field, filter).await?.len())
        }
        Operation::Aggregate { pipeline } => {
            Outcome::documents(client.aggregate(collection, pipeline).await?)
        }
        Operation::CreateIndex { spec } => {
            Outcome::index_created(&client.create_index(collection, spec).await?)
        }
        Operation::ListIndexes => Outcome::indexes(&client.list_indexes(collection).await?),
        Operation::DropIndex { name } => {
            client.drop_index(collection, name).await?;
            Outcome::empty()
        }
    };
    Ok(outcome)
}

impl Runner for WireRunner {
    fn implementation(&self) -> &str {
        &self.implementation
    }

    fn mode(&self) -> Mode {
        Mode::Wire
    }

    fn execute(&mut self, collection: &str, op: &Operation) -> Result<Outcome, ActionError> {
        self.ensure_client()?;
        let client = self
            .client
            .as_mut()
            .ok_or(ActionError::Wire(WireError::ConnectionClosed))?;
        Ok(self.runtime.block_on(round_trip(client, collection, op))?)
    }

    fn close(&mut self) -> Result<(), HarnessError> {
        let mut first: Option<HarnessError> = None;

        if let Some(client) = self.client.take() {
            if let Err(e) = self.runtime.block_on(client.disconnect()) {
                warn!(target: "docparity::runner", error = %e, "Client disconnect failed");
                first.get_or_insert(HarnessError::teardown("client", e));
            }
        }
        if let Some(mut server) = self.server.take() {
            if let Err(e) = self.runtime.block_on(server.shutdown()) {
                warn!(target: "docparity::runner", error = %e, "Server shutdown failed");
                first.get_or_insert(HarnessError::teardown("server", e));
            }
        }
        if let Some(store) = self.store.take() {
            if let Err(e) = store.close() {
                warn!(target: "docparity::runner", error = %e, "Store close failed");
                first.get_or_insert(HarnessError::teardown("store", e));
            } else {
                info!(target: "docparity::runner", "Wire runner closed");
            }
        }

        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for WireRunner {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
