//! In-memory transport
//!
//! [`InMemoryTransport`] keeps a whole remote tree in a `BTreeMap` keyed by
//! normalized path. It behaves like a strict WebDAV server: directories must
//! exist before children are created in them, non-empty collections cannot
//! be deleted, and every call is logged so tests can assert on exactly what
//! a sync run did.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};

use davmirror_core::domain::RemotePath;
use davmirror_core::ports::transport::{ByteStream, ITransport, RemoteEntry, TransportError};

use crate::checksum;

#[derive(Debug, Clone)]
enum Node {
    Directory {
        modified: Option<DateTime<Utc>>,
    },
    File {
        data: Vec<u8>,
        modified: Option<DateTime<Utc>>,
    },
}

/// One call made against the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    List(String),
    Exists(String),
    CreateDirectory(String),
    Download(String),
    Upload(String),
    Delete(String),
    Move(String, String),
    Copy(String, String),
    Close,
}

impl TransportCall {
    /// True for calls that change the remote tree or move file content
    pub fn is_transfer_or_mutation(&self) -> bool {
        !matches!(
            self,
            TransportCall::List(_) | TransportCall::Exists(_) | TransportCall::Close
        )
    }
}

/// Remote tree held in memory
#[derive(Debug)]
pub struct InMemoryTransport {
    nodes: Mutex<BTreeMap<String, Node>>,
    calls: Mutex<Vec<TransportCall>>,
    failing: Mutex<HashSet<String>>,
    publish_hashes: bool,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn parent_key(path: &str) -> Option<String> {
    RemotePath::new(path.to_string())
        .ok()
        .and_then(|p| p.parent())
        .map(String::from)
}

fn is_descendant(key: &str, root: &str) -> bool {
    if root == "/" {
        return key != "/";
    }
    key.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

impl InMemoryTransport {
    /// An empty tree containing only `/`
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Directory { modified: None });
        Self {
            nodes: Mutex::new(nodes),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            publish_hashes: false,
        }
    }

    /// Publish an MD5 for every file in listings, as ownCloud does
    #[must_use]
    pub fn with_hashes(mut self) -> Self {
        self.publish_hashes = true;
        self
    }

    // ------------------------------------------------------------------
    // Seeding and inspection
    // ------------------------------------------------------------------

    /// Create a directory and any missing parents
    pub fn add_dir(&self, path: &str) {
        let Ok(path) = RemotePath::new(path.to_string()) else {
            return;
        };
        let mut nodes = guard(&self.nodes);
        let mut current = RemotePath::root();
        for segment in path.segments() {
            let Ok(next) = current.join(segment) else {
                return;
            };
            nodes
                .entry(next.to_string())
                .or_insert(Node::Directory { modified: None });
            current = next;
        }
    }

    /// Create a file, creating missing parent directories
    pub fn add_file(&self, path: &str, data: &[u8], modified: Option<DateTime<Utc>>) {
        if let Some(parent) = parent_key(path) {
            self.add_dir(&parent);
        }
        if let Ok(path) = RemotePath::new(path.to_string()) {
            guard(&self.nodes).insert(
                path.to_string(),
                Node::File {
                    data: data.to_vec(),
                    modified,
                },
            );
        }
    }

    /// Contents of a file, `None` for directories and missing paths
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        match guard(&self.nodes).get(path) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn modified(&self, path: &str) -> Option<DateTime<Utc>> {
        match guard(&self.nodes).get(path) {
            Some(Node::File { modified, .. } | Node::Directory { modified }) => *modified,
            None => None,
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(guard(&self.nodes).get(path), Some(Node::Directory { .. }))
    }

    pub fn contains(&self, path: &str) -> bool {
        guard(&self.nodes).contains_key(path)
    }

    /// Every path in the tree except `/`, sorted
    pub fn paths(&self) -> Vec<String> {
        guard(&self.nodes)
            .keys()
            .filter(|k| k.as_str() != "/")
            .cloned()
            .collect()
    }

    /// Make downloads and uploads of `path` fail
    pub fn fail_transfers_of(&self, path: &str) {
        guard(&self.failing).insert(path.to_string());
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<TransportCall> {
        guard(&self.calls).clone()
    }

    /// Calls that moved content or changed the tree
    pub fn mutations(&self) -> Vec<TransportCall> {
        guard(&self.calls)
            .iter()
            .filter(|c| c.is_transfer_or_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        guard(&self.calls).clear();
    }

    fn log(&self, call: TransportCall) {
        guard(&self.calls).push(call);
    }

    fn is_failing(&self, path: &RemotePath) -> bool {
        guard(&self.failing).contains(path.as_str())
    }

    fn entry_for(&self, name: &str, node: &Node) -> RemoteEntry {
        match node {
            Node::Directory { modified } => RemoteEntry::directory(name, *modified),
            Node::File { data, modified } => {
                let entry = RemoteEntry::file(name, data.len() as u64, *modified);
                if self.publish_hashes {
                    entry.with_hash(checksum::hash_bytes(data))
                } else {
                    entry
                }
            }
        }
    }

    fn require_parent_dir(
        nodes: &BTreeMap<String, Node>,
        path: &RemotePath,
        operation: &'static str,
    ) -> Result<(), TransportError> {
        let parent = path.parent().unwrap_or_else(RemotePath::root);
        match nodes.get(parent.as_str()) {
            Some(Node::Directory { .. }) => Ok(()),
            _ => Err(TransportError::operation(
                operation,
                path,
                "409 Conflict: parent collection missing",
            )),
        }
    }

    /// Copy the subtree at `from` to `to`, returning the new nodes
    fn subtree(
        nodes: &BTreeMap<String, Node>,
        from: &RemotePath,
        to: &RemotePath,
    ) -> Vec<(String, Node)> {
        nodes
            .iter()
            .filter(|(k, _)| k.as_str() == from.as_str() || is_descendant(k, from.as_str()))
            .map(|(k, node)| {
                let suffix = &k[from.as_str().len()..];
                let key = if to.is_root() {
                    suffix.to_string()
                } else {
                    format!("{}{suffix}", to.as_str())
                };
                (key, node.clone())
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl ITransport for InMemoryTransport {
    async fn list(&self, path: &RemotePath) -> Result<Vec<RemoteEntry>, TransportError> {
        self.log(TransportCall::List(path.to_string()));
        let nodes = guard(&self.nodes);

        match nodes.get(path.as_str()) {
            Some(Node::Directory { .. }) => {}
            Some(Node::File { .. }) => {
                return Err(TransportError::list(path, "not a collection"))
            }
            None => return Err(TransportError::list(path, "404 Not Found")),
        }

        Ok(nodes
            .iter()
            .filter(|(k, _)| parent_key(k).as_deref() == Some(path.as_str()))
            .filter_map(|(k, node)| {
                let name = k.rsplit('/').next()?;
                Some(self.entry_for(name, node))
            })
            .collect())
    }

    async fn exists(&self, path: &RemotePath) -> Result<bool, TransportError> {
        self.log(TransportCall::Exists(path.to_string()));
        Ok(guard(&self.nodes).contains_key(path.as_str()))
    }

    async fn create_directory(&self, path: &RemotePath) -> Result<(), TransportError> {
        self.log(TransportCall::CreateDirectory(path.to_string()));
        let mut nodes = guard(&self.nodes);

        match nodes.get(path.as_str()) {
            Some(Node::Directory { .. }) => return Ok(()),
            Some(Node::File { .. }) => {
                return Err(TransportError::operation(
                    "MKCOL",
                    path,
                    "a file exists at this path",
                ))
            }
            None => {}
        }
        Self::require_parent_dir(&nodes, path, "MKCOL")?;
        nodes.insert(
            path.to_string(),
            Node::Directory {
                modified: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn download(&self, path: &RemotePath) -> Result<ByteStream, TransportError> {
        self.log(TransportCall::Download(path.to_string()));
        let data = match guard(&self.nodes).get(path.as_str()) {
            Some(Node::File { data, .. }) => data.clone(),
            Some(Node::Directory { .. }) => {
                return Err(TransportError::transfer(path, "is a collection"))
            }
            None => return Err(TransportError::NotFound(path.to_string())),
        };

        if self.is_failing(path) {
            // Deliver part of the body, then break the connection
            let half = data[..data.len() / 2].to_vec();
            let err = TransportError::transfer(path, "connection reset");
            return Ok(stream::iter(vec![Ok(half), Err(err)]).boxed());
        }

        let chunks: Vec<Result<Vec<u8>, TransportError>> = data
            .chunks(4096)
            .map(|c| Ok(c.to_vec()))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }

    async fn upload(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        modified: Option<DateTime<Utc>>,
    ) -> Result<(), TransportError> {
        self.log(TransportCall::Upload(path.to_string()));
        if self.is_failing(path) {
            return Err(TransportError::transfer(path, "507 Insufficient Storage"));
        }

        let mut nodes = guard(&self.nodes);
        if let Some(Node::Directory { .. }) = nodes.get(path.as_str()) {
            return Err(TransportError::transfer(path, "a collection exists at this path"));
        }
        Self::require_parent_dir(&nodes, path, "PUT")?;
        nodes.insert(
            path.to_string(),
            Node::File {
                data,
                modified: Some(modified.unwrap_or_else(Utc::now)),
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &RemotePath) -> Result<(), TransportError> {
        self.log(TransportCall::Delete(path.to_string()));
        let mut nodes = guard(&self.nodes);

        if !nodes.contains_key(path.as_str()) {
            return Err(TransportError::NotFound(path.to_string()));
        }
        if path.is_root() {
            return Err(TransportError::operation("DELETE", path, "cannot delete root"));
        }
        if nodes.keys().any(|k| is_descendant(k, path.as_str())) {
            return Err(TransportError::operation(
                "DELETE",
                path,
                "collection is not empty",
            ));
        }
        nodes.remove(path.as_str());
        Ok(())
    }

    async fn move_item(&self, from: &RemotePath, to: &RemotePath) -> Result<(), TransportError> {
        self.log(TransportCall::Move(from.to_string(), to.to_string()));
        let mut nodes = guard(&self.nodes);

        if !nodes.contains_key(from.as_str()) {
            return Err(TransportError::NotFound(from.to_string()));
        }
        Self::require_parent_dir(&nodes, to, "MOVE")?;

        let moved = Self::subtree(&nodes, from, to);
        nodes.retain(|k, _| {
            !(k == to.as_str() || is_descendant(k, to.as_str()))
                && !(k == from.as_str() || is_descendant(k, from.as_str()))
        });
        nodes.extend(moved);
        Ok(())
    }

    async fn copy_item(&self, from: &RemotePath, to: &RemotePath) -> Result<(), TransportError> {
        self.log(TransportCall::Copy(from.to_string(), to.to_string()));
        let mut nodes = guard(&self.nodes);

        if !nodes.contains_key(from.as_str()) {
            return Err(TransportError::NotFound(from.to_string()));
        }
        Self::require_parent_dir(&nodes, to, "COPY")?;

        let copied = Self::subtree(&nodes, from, to);
        nodes.retain(|k, _| !(k == to.as_str() || is_descendant(k, to.as_str())));
        nodes.extend(copied);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.log(TransportCall::Close);
        Ok(())
    }
}
