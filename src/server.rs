//! Live-reload development server.
//!
//! Serves the working root over HTTP. HTML pages get a small client script
//! injected before `</body>`; the script opens a WebSocket on
//! `/__sitepipe/ws` and applies every [`ReloadSignal`] it receives:
//! stylesheets are re-fetched in place for `css`, the page reloads for
//! `full`.

use crate::build::BuildContext;
use crate::reload::{ReloadSignal, Reloader};
use futures_util::{SinkExt, StreamExt};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use warp::filters::path::FullPath;
use warp::ws::{Message, WebSocket, Ws};
use warp::{Filter, Rejection, Reply};

/// Path of the injected client script.
pub const CLIENT_SCRIPT_PATH: &str = "/__sitepipe/livereload.js";

/// Path of the reload WebSocket.
pub const SOCKET_PATH: &str = "/__sitepipe/ws";

const CLIENT_SCRIPT: &str = r#"(function () {
  var url = (location.protocol === "https:" ? "wss://" : "ws://") + location.host + "/__sitepipe/ws";
  function refreshStyles() {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    for (var i = 0; i < links.length; i++) {
      var href = links[i].href.replace(/[?&]sitepipe=\d+/, "");
      links[i].href = href + (href.indexOf("?") < 0 ? "?" : "&") + "sitepipe=" + Date.now();
    }
  }
  function connect() {
    var socket = new WebSocket(url);
    socket.onmessage = function (event) {
      var signal = JSON.parse(event.data);
      if (signal.type === "css") {
        refreshStyles();
      } else {
        location.reload();
      }
    };
    socket.onclose = function () {
      setTimeout(connect, 1000);
    };
  }
  connect();
})();
"#;

/// Dev server failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// Host and port did not resolve
    #[error("cannot resolve server address '{0}'")]
    Address(String),
    /// Async runtime could not start
    #[error("failed to start server runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Listener could not bind
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: warp::Error,
    },
}

/// Insert the client script tag before the last `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let tag = format!("<script src=\"{}\"></script>", CLIENT_SCRIPT_PATH);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..at]);
            out.push_str(&tag);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{}{}", html, tag),
    }
}

/// Map a request path onto an HTML file under `root`.
///
/// Returns `None` for paths that escape the root or do not name HTML.
pub fn html_file_for(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut relative = request_path.trim_start_matches('/').to_string();
    if relative.is_empty() || relative.ends_with('/') {
        relative.push_str("index.html");
    }

    let mut path = root.to_path_buf();
    for segment in relative.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." || segment.contains('\\') {
            return None;
        }
        path.push(segment);
    }

    let ext = crate::tasks::extension(&path);
    (ext == "html" || ext == "htm").then_some(path)
}

async fn serve_html(root: PathBuf, full: FullPath) -> Result<warp::reply::Html<String>, Rejection> {
    let path = html_file_for(&root, full.as_str()).ok_or_else(warp::reject::not_found)?;
    match tokio::fs::read_to_string(&path).await {
        Ok(body) => Ok(warp::reply::html(inject_client(&body))),
        Err(_) => Err(warp::reject::not_found()),
    }
}

async fn client_session(socket: WebSocket, mut signals: broadcast::Receiver<ReloadSignal>) {
    let (mut outgoing, mut incoming) = socket.split();
    tracing::debug!("reload client connected");

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Ok(signal) => {
                    if outgoing.send(Message::text(signal.to_message())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "reload client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = incoming.next() => match message {
                Some(Ok(message)) if message.is_close() => break,
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }

    tracing::debug!("reload client disconnected");
}

/// All dev server routes for `root`.
pub fn routes(
    root: PathBuf,
    reloader: Reloader,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let socket = warp::path!("__sitepipe" / "ws").and(warp::ws()).map(move |ws: Ws| {
        let signals = reloader.subscribe();
        ws.on_upgrade(move |socket| client_session(socket, signals))
    });

    let script = warp::path!("__sitepipe" / "livereload.js").map(|| {
        warp::reply::with_header(CLIENT_SCRIPT, "content-type", "application/javascript")
    });

    let html_root = root.clone();
    let html = warp::get()
        .and(warp::path::full())
        .and_then(move |full: FullPath| serve_html(html_root.clone(), full));

    socket.or(script).or(html).or(warp::fs::dir(root)).with(warp::trace::request())
}

/// A running dev server. Dropping it shuts the server down.
#[derive(Debug)]
pub struct DevServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl DevServer {
    /// Serve the context's working root on the configured host and port.
    pub fn start(ctx: &BuildContext) -> Result<Self, ServerError> {
        let config = &ctx.config().server;
        let wanted = format!("{}:{}", config.host, config.port);
        let addr = wanted
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ServerError::Address(wanted.clone()))?;

        Self::bind(addr, ctx.root_dir(), ctx.reloader().clone())
    }

    /// Serve `root` on `addr` from a background thread.
    pub fn bind(addr: SocketAddr, root: PathBuf, reloader: Reloader) -> Result<Self, ServerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(ServerError::Runtime)?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let (bound, server) = {
            let _guard = runtime.enter();
            warp::serve(routes(root, reloader))
                .try_bind_with_graceful_shutdown(addr, async {
                    signal.await.ok();
                })
                .map_err(|source| ServerError::Bind { addr, source })?
        };

        let thread = std::thread::Builder::new()
            .name("sitepipe-server".to_string())
            .spawn(move || runtime.block_on(server))
            .map_err(ServerError::Runtime)?;

        tracing::info!(addr = %bound, "dev server listening");
        Ok(Self { addr: bound, shutdown: Some(shutdown), thread: Some(thread) })
    }

    /// Address actually bound.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL for browsers.
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.send(()).ok();
        }
        if let Some(thread) = self.thread.take() {
            thread.join().ok();
        }
    }
}
