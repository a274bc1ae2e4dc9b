//! Session state and the controller that keeps one pod watch alive for it.

use tracing::{debug, error, info, warn};

use crate::consumer::StreamHandle;
use crate::error::Result;
use crate::http::{Endpoint, FetchMode, ResourceClient};
use crate::k8s;
use crate::models::{PodSnapshot, UiEvent, UiSink};
use crate::watch::WatchConsumer;

pub struct Session {
    token: String,
    namespace: String,
    cursor: Option<String>,
    watch: Option<StreamHandle<()>>,
}

impl Session {
    pub fn new(token: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            namespace: namespace.into(),
            cursor: None,
            watch: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resource version of the last snapshot taken for the current namespace.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn watch(&self) -> Option<&StreamHandle<()>> {
        self.watch.as_ref()
    }

    pub fn cancel_watch(&mut self) {
        if let Some(handle) = self.watch.take() {
            handle.cancel();
        }
    }

    fn install_watch(&mut self, handle: StreamHandle<()>) {
        self.cancel_watch();
        self.watch = Some(handle);
    }
}

#[derive(Clone)]
pub struct Controller {
    client: ResourceClient,
    endpoint: Endpoint,
    sink: UiSink,
}

impl Controller {
    pub fn new(client: ResourceClient, endpoint: Endpoint, sink: UiSink) -> Self {
        Self { client, endpoint, sink }
    }

    fn log(&self, line: String) {
        let _ = self.sink.send(UiEvent::Log(line));
    }

    pub async fn fetch_pods(&self, namespace: &str, token: &str) -> Result<PodSnapshot> {
        let response = self.client.fetch_body(&k8s::pods(&self.endpoint, namespace, token)?).await?;
        k8s::parse_pods(&response.body)
    }

    pub async fn list_namespaces(&self, token: &str) -> Result<Vec<String>> {
        let response = self.client.fetch_body(&k8s::namespaces(&self.endpoint, token)?).await?;
        k8s::parse_namespaces(&response.body)
    }

    /// Feed the namespace picker.
    pub async fn load_namespaces(&self, token: &str) {
        match self.list_namespaces(token).await {
            Ok(names) => {
                let _ = self.sink.send(UiEvent::Namespaces(names));
            }
            Err(err) => {
                warn!(%err, "listing namespaces failed");
                self.log(format!("Failed to list namespaces: {err}"));
            }
        }
    }

    /// Snapshot the namespace, remember its resource version, then watch from there.
    pub async fn refresh_pods(&self, session: &mut Session) -> Result<()> {
        let snapshot = self.fetch_pods(&session.namespace, &session.token).await?;
        session.cursor = snapshot.resource_version;
        debug!(namespace = %session.namespace, cursor = ?session.cursor, pods = snapshot.rows.len(), "snapshot taken");

        let _ = self.sink.send(UiEvent::Pods {
            namespace: session.namespace.clone(),
            rows: snapshot.rows,
        });
        self.start_watch(session).await
    }

    pub async fn start_watch(&self, session: &mut Session) -> Result<()> {
        let descriptor = k8s::watch_pods(
            &self.endpoint,
            &session.namespace,
            &session.token,
            session.cursor.as_deref(),
        )?;
        let consumer = WatchConsumer::new(session.namespace.clone(), self.sink.clone());
        let response = self.client.fetch_stream(&descriptor, consumer, FetchMode::Async).await?;
        if let Some(handle) = response.body.into_handle() {
            session.install_watch(handle);
            self.log(format!("Watching for pods changes in namespace {} ...", session.namespace));
        }
        info!(namespace = %session.namespace, "watch started");
        Ok(())
    }

    pub async fn switch_namespace(&self, session: &mut Session, namespace: &str) -> Result<()> {
        session.cancel_watch();
        session.namespace = namespace.to_string();
        session.cursor = None;
        self.refresh_pods(session).await
    }

    /// Follow namespace requests until the sender goes away, then hand the session back.
    ///
    /// Only the latest request matters: one that arrives while a switch is in
    /// flight abandons that switch before it can open a watch.
    pub async fn run(self, mut session: Session, mut requests: tokio::sync::watch::Receiver<String>) -> Session {
        let mut pending = Some(requests.borrow_and_update().clone());
        loop {
            let namespace = match pending.take() {
                Some(namespace) => namespace,
                None => {
                    if requests.changed().await.is_err() {
                        break;
                    }
                    requests.borrow_and_update().clone()
                }
            };

            let superseded = tokio::select! {
                res = self.switch_namespace(&mut session, &namespace) => {
                    if let Err(err) = res {
                        error!(%namespace, %err, "refresh failed");
                        self.log(format!("Failed to load pods for namespace {namespace}: {err}"));
                    }
                    false
                }
                Ok(()) = requests.changed() => true,
            };

            if superseded {
                debug!(%namespace, "namespace switch superseded");
                pending = Some(requests.borrow_and_update().clone());
            }
        }
        session
    }
}
