//! LSP backend implementation for sqlcheck
//!
//! Every open document gets its own [`LiveChecker`]. Edits are forwarded to
//! it as they arrive, and a per-document task publishes diagnostics each
//! time a check settles.

use sqlcheck_core::Config;
use sqlcheck_live::LiveChecker;
use sqlcheck_sql::{Checker, SqlCheck};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams, InitializeParams, InitializeResult, InitializedParams, MessageType,
    SaveOptions, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions, Url,
};
use tower_lsp::{Client, LanguageServer};

use crate::diagnostics::to_diagnostics;

const CONFIG_FILE: &str = "sqlcheck.toml";

/// An open document and the tasks checking it
struct Document {
    live: LiveChecker,
    forwarder: JoinHandle<()>,
}

impl Drop for Document {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// LSP backend for sqlcheck
pub struct Backend {
    /// LSP client for communicating with the editor
    client: Client,
    /// Currently open documents
    documents: Arc<RwLock<HashMap<Url, Document>>>,
    /// Configuration from the workspace root
    config: Arc<RwLock<Config>>,
    /// Project root directory
    root_uri: Arc<RwLock<Option<Url>>>,
}

impl Backend {
    /// Create a new LSP backend
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(RwLock::new(Config::default())),
            root_uri: Arc::new(RwLock::new(None)),
        }
    }

    /// Load sqlcheck.toml from the workspace root, falling back to defaults
    async fn load_config(&self) -> Config {
        let root_uri = self.root_uri.read().await;

        let Some(root_path) = root_uri.as_ref().and_then(|u| u.to_file_path().ok()) else {
            return Config::default();
        };
        let config_path = root_path.join(CONFIG_FILE);

        let Ok(content) = tokio::fs::read_to_string(&config_path).await else {
            return Config::default();
        };

        match Config::from_toml(&content) {
            Ok(config) => {
                self.client
                    .log_message(
                        MessageType::INFO,
                        format!("Loaded config from {}", config_path.display()),
                    )
                    .await;
                config
            }
            Err(e) => {
                self.client
                    .log_message(
                        MessageType::WARNING,
                        format!("Ignoring {}: {}", config_path.display(), e),
                    )
                    .await;
                Config::default()
            }
        }
    }

    /// Start checking a document
    fn open_document(&self, uri: Url, text: String, config: &Config) -> Document {
        let checker: Arc<dyn SqlCheck> = Arc::new(Checker::from_config(config));
        let live = LiveChecker::new(checker, config.live_options());

        let mut updates = live.subscribe();
        let client = self.client.clone();

        let forwarder = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.is_checking {
                    continue;
                }

                let diagnostics = to_diagnostics(&snapshot.result, &snapshot.source);
                tracing::debug!(%uri, count = diagnostics.len(), "publishing diagnostics");
                client.publish_diagnostics(uri.clone(), diagnostics, None).await;
            }
        });

        live.set_input(text);
        Document { live, forwarder }
    }

    /// Rebuild every open document's checker after a config change
    async fn reload_documents(&self, config: &Config) {
        let mut documents = self.documents.write().await;

        let uris: Vec<Url> = documents.keys().cloned().collect();
        for uri in uris {
            if let Some(old) = documents.remove(&uri) {
                let text = old.live.input();
                drop(old);

                let document = self.open_document(uri.clone(), text, config);
                documents.insert(uri, document);
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        // Store root URI
        #[allow(deprecated)]
        let root_uri = params.root_uri.clone();
        *self.root_uri.write().await = root_uri;

        *self.config.write().await = self.load_config().await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(false),
                        })),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "sqlcheck-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "sqlcheck LSP server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.documents.write().await.clear();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let config = self.config.read().await.clone();

        let document = self.open_document(uri.clone(), params.text_document.text, &config);
        self.documents.write().await.insert(uri, document);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change holds the whole text
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };

        let documents = self.documents.read().await;
        if let Some(document) = documents.get(&params.text_document.uri) {
            document.live.set_input(change.text);
        }
    }

    async fn did_save(&self, _: DidSaveTextDocumentParams) {
        let config = self.load_config().await;

        let changed = {
            let mut current = self.config.write().await;
            let changed = *current != config;
            *current = config.clone();
            changed
        };

        if changed {
            tracing::info!(dialect = %config.dialect, "config changed, rechecking open documents");
            self.reload_documents(&config).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;

        // Dropping the document detaches its checker
        self.documents.write().await.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }
}
