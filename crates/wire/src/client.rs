//! Protocol client
//!
//! A single-connection client with one request in flight at a time. Typed
//! helpers build command documents and turn replies back into the same result
//! shapes a [`docparity_engine::Store`] returns, the way a database driver does.
//!
//! A request that is abandoned mid-exchange (a timeout, or an I/O error inside
//! a frame) leaves unread bytes on the stream. The client is then poisoned and
//! refuses further requests; callers reconnect.

use std::net::SocketAddr;
use std::time::Duration;

use docparity_core::{doc, Document, Value};
use docparity_engine::{
    default_index_name, FindAndModifyOptions, FindOptions, IndexInfo, IndexSpec, UpdateOptions,
    UpdateResult,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::codec::{read_frame, write_frame};
use crate::envelope::{decode_response, encode_request, Request};
use crate::error::{Result, WireError};

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Database named in every request
    pub database: String,
    /// Per-operation bound; `None` waits indefinitely
    pub op_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            database: "test".to_string(),
            op_timeout: None,
        }
    }
}

/// Connected protocol client
pub struct ProtocolClient {
    stream: TcpStream,
    peer: SocketAddr,
    options: ClientOptions,
    next_id: u64,
    /// Set while a request/response exchange is in progress
    poisoned: bool,
}

impl ProtocolClient {
    /// Connect to `addr` and perform the `hello` handshake
    pub async fn connect(addr: SocketAddr, options: ClientOptions) -> Result<Self> {
        let connect = TcpStream::connect(addr);
        let stream = match options.op_timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| WireError::timeout("connect", limit))?,
            None => connect.await,
        }
        .map_err(|e| WireError::io("connect", e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| WireError::io("set nodelay", e))?;

        let mut client = ProtocolClient {
            stream,
            peer: addr,
            options,
            next_id: 1,
            poisoned: false,
        };
        let hello = client.command("hello", doc! { "hello" => 1 }).await?;
        if hello.get_bool("isWritablePrimary") != Some(true) {
            return Err(WireError::protocol("server is not a writable primary"));
        }
        debug!(target: "docparity::wire", peer = %addr, "Client connected");
        Ok(client)
    }

    /// Address of the server
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Options the client was connected with
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// True once an exchange was interrupted and the stream is out of step
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Send one command and wait for its reply
    pub async fn command(&mut self, op: &str, params: Document) -> Result<Document> {
        if self.poisoned {
            return Err(WireError::protocol(
                "connection out of step after an interrupted request",
            ));
        }
        match self.options.op_timeout {
            Some(limit) => tokio::time::timeout(limit, self.round_trip(op, params))
                .await
                .map_err(|_| WireError::timeout(op, limit))?,
            None => self.round_trip(op, params).await,
        }
    }

    async fn round_trip(&mut self, op: &str, params: Document) -> Result<Document> {
        let id = self.next_id.to_string();
        self.next_id += 1;
        let request = Request::new(id.clone(), op, self.options.database.clone(), params);
        let payload = encode_request(&request)?;

        // cleared only once the whole reply frame has been read
        self.poisoned = true;
        write_frame(&mut self.stream, &payload).await?;
        let bytes = read_frame(&mut self.stream)
            .await?
            .ok_or(WireError::ConnectionClosed)?;
        self.poisoned = false;

        let response = decode_response(&bytes)?;
        if response.id != id {
            return Err(WireError::protocol(format!(
                "response id {} does not match request id {}",
                response.id, id
            )));
        }
        response.into_result()
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.command("ping", doc! { "ping" => 1 }).await.map(|_| ())
    }

    pub async fn insert_one(&mut self, collection: &str, document: Document) -> Result<Value> {
        let mut ids = self.insert_many(collection, vec![document]).await?;
        ids.pop()
            .ok_or_else(|| WireError::protocol("insert reply carried no inserted id"))
    }

    pub async fn insert_many(&mut self, collection: &str, documents: Vec<Document>) -> Result<Vec<Value>> {
        let docs: Vec<Value> = documents.into_iter().map(Value::Document).collect();
        let reply = self
            .command(
                "insert",
                doc! { "insert" => collection, "documents" => docs, "ordered" => true },
            )
            .await?;
        Ok(reply.get_array("insertedIds").map(|ids| ids.to_vec()).unwrap_or_default())
    }

    pub async fn find(&mut self, collection: &str, filter: &Document, options: &FindOptions) -> Result<Vec<Document>> {
        let mut params = doc! { "find" => collection, "filter" => filter.clone() };
        if let Some(sort) = &options.sort {
            params.insert("sort", sort.clone());
        }
        if options.skip > 0 {
            params.insert("skip", options.skip as i64);
        }
        if let Some(limit) = options.limit {
            params.insert("limit", limit as i64);
        }
        if let Some(projection) = &options.projection {
            params.insert("projection", projection.clone());
        }
        let reply = self.command("find", params).await?;
        first_batch(&reply)
    }

    pub async fn find_one(&mut self, collection: &str, filter: &Document) -> Result<Option<Document>> {
        Ok(self
            .find(collection, filter, &FindOptions::one())
            .await?
            .into_iter()
            .next())
    }

    /// Send one update statement; `matched` excludes upserted documents
    pub async fn update(
        &mut self,
        collection: &str,
        filter: &Document,
        update: &Document,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        let statement = doc! {
            "q" => filter.clone(),
            "u" => update.clone(),
            "upsert" => options.upsert,
            "multi" => options.multi,
        };
        let reply = self
            .command(
                "update",
                doc! { "update" => collection, "updates" => vec![Value::Document(statement)] },
            )
            .await?;
        let upserted = reply.get_array("upserted").unwrap_or_default();
        let n = reply.get_i64("n").unwrap_or(0).max(0) as u64;
        Ok(UpdateResult {
            matched_count: n.saturating_sub(upserted.len() as u64),
            modified_count: reply.get_i64("nModified").unwrap_or(0).max(0) as u64,
            upserted_id: upserted
                .first()
                .and_then(Value::as_document)
                .and_then(|u| u.get("_id"))
                .cloned(),
        })
    }

    pub async fn replace_one(&mut self, collection: &str, filter: &Document, replacement: &Document) -> Result<UpdateResult> {
        if replacement.first_key().map(|k| k.starts_with('$')).unwrap_or(false) {
            return Err(WireError::protocol(
                "replacement document must not contain update operators",
            ));
        }
        self.update(collection, filter, replacement, UpdateOptions::default())
            .await
    }

    pub async fn delete(&mut self, collection: &str, filter: &Document, limit_one: bool) -> Result<u64> {
        let statement = doc! { "q" => filter.clone(), "limit" => i32::from(limit_one) };
        let reply = self
            .command(
                "delete",
                doc! { "delete" => collection, "deletes" => vec![Value::Document(statement)] },
            )
            .await?;
        Ok(reply.get_i64("n").unwrap_or(0).max(0) as u64)
    }

    pub async fn find_and_modify(
        &mut self,
        collection: &str,
        filter: &Document,
        options: &FindAndModifyOptions,
    ) -> Result<Option<Document>> {
        let mut params = doc! { "findAndModify" => collection, "query" => filter.clone() };
        if let Some(sort) = &options.sort {
            params.insert("sort", sort.clone());
        }
        if options.remove {
            params.insert("remove", true);
        }
        if let Some(update) = &options.update {
            params.insert("update", update.clone());
        }
        params.insert("new", options.return_new);
        params.insert("upsert", options.upsert);
        let reply = self.command("findAndModify", params).await?;
        Ok(reply.get_document("value").cloned())
    }

    pub async fn distinct(&mut self, collection: &str, field: &str, filter: &Document) -> Result<Vec<Value>> {
        let reply = self
            .command(
                "distinct",
                doc! { "distinct" => collection, "key" => field, "query" => filter.clone() },
            )
            .await?;
        Ok(reply.get_array("values").map(|v| v.to_vec()).unwrap_or_default())
    }

    pub async fn aggregate(&mut self, collection: &str, pipeline: &[Document]) -> Result<Vec<Document>> {
        let stages: Vec<Value> = pipeline.iter().cloned().map(Value::Document).collect();
        let reply = self
            .command(
                "aggregate",
                doc! { "aggregate" => collection, "pipeline" => stages, "cursor" => doc! {} },
            )
            .await?;
        first_batch(&reply)
    }

    /// Create an index; the name defaults to the driver convention
    pub async fn create_index(&mut self, collection: &str, spec: &IndexSpec) -> Result<String> {
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| default_index_name(&spec.keys));
        let mut index = doc! { "key" => spec.keys.clone(), "name" => name.as_str() };
        if spec.unique {
            index.insert("unique", true);
        }
        self.command(
            "createIndexes",
            doc! { "createIndexes" => collection, "indexes" => vec![Value::Document(index)] },
        )
        .await?;
        Ok(name)
    }

    pub async fn list_indexes(&mut self, collection: &str) -> Result<Vec<IndexInfo>> {
        let reply = self
            .command("listIndexes", doc! { "listIndexes" => collection })
            .await?;
        first_batch(&reply)?
            .iter()
            .map(|d| {
                IndexInfo::from_document(d)
                    .ok_or_else(|| WireError::protocol("malformed index document"))
            })
            .collect()
    }

    pub async fn drop_index(&mut self, collection: &str, name: &str) -> Result<()> {
        self.command(
            "dropIndexes",
            doc! { "dropIndexes" => collection, "index" => name },
        )
        .await
        .map(|_| ())
    }

    /// Close the connection
    pub async fn disconnect(mut self) -> Result<()> {
        self.stream
            .shutdown()
            .await
            .map_err(|e| WireError::io("disconnect", e))?;
        debug!(target: "docparity::wire", peer = %self.peer, "Client disconnected");
        Ok(())
    }
}

fn first_batch(reply: &Document) -> Result<Vec<Document>> {
    let batch = reply
        .get_document("cursor")
        .and_then(|c| c.get_array("firstBatch"))
        .ok_or_else(|| WireError::protocol("cursor reply without firstBatch"))?;
    batch
        .iter()
        .map(|v| {
            v.as_document()
                .cloned()
                .ok_or_else(|| WireError::protocol("cursor batch entry is not a document"))
        })
        .collect()
}
