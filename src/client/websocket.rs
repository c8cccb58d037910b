//! WebSocket channel for the Pong server
//!
//! Each channel (queue, tournament, game) runs its blocking socket on a
//! worker thread. The main thread only exchanges messages with it through
//! bounded queues and polls for events once per frame.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::http::header::COOKIE;
use tungstenite::http::HeaderValue;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{connect, Message, WebSocket};

use super::config::ServerSettings;
use crate::core::error::ChannelError;
use crate::core::io_traits::{ChannelConnector, ChannelEvent, MessageChannel};

/// Queue depth in both directions
const QUEUE_CAPACITY: usize = 128;

/// Sleep between two polls of the non-blocking socket
const POLL_INTERVAL: Duration = Duration::from_millis(5);

// =============================================================================
// URLS
// =============================================================================

/// Build `ws(s)://host/path` from the HTTP base URL
pub fn websocket_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws_base = if base.starts_with("https://") {
        base.replacen("https://", "wss://", 1)
    } else if base.starts_with("http://") {
        base.replacen("http://", "ws://", 1)
    } else {
        base.to_string()
    };
    format!("{}{}", ws_base, path)
}

// =============================================================================
// CHANNEL
// =============================================================================

/// Outgoing messages (main thread -> WS thread)
#[derive(Debug)]
enum Outgoing {
    Text(String),
    Shutdown,
}

/// One WebSocket connection driven by a worker thread
pub struct WsChannel {
    url: String,
    tx: Option<Sender<Outgoing>>,
    rx: Option<Receiver<ChannelEvent>>,
    thread_handle: Option<JoinHandle<()>>,
    shutdown_flag: Arc<AtomicBool>,
    open: bool,
}

impl WsChannel {
    /// Start connecting to `url`. Progress is reported through `poll_event`.
    pub fn connect(url: &str, cookie: Option<String>) -> Result<Self, ChannelError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        if let Some(cookie) = cookie {
            let value =
                HeaderValue::from_str(&cookie).map_err(|e| ChannelError::Connect(e.to_string()))?;
            request.headers_mut().insert(COOKIE, value);
        }

        let (outgoing_tx, outgoing_rx) = bounded::<Outgoing>(QUEUE_CAPACITY);
        let (incoming_tx, incoming_rx) = bounded::<ChannelEvent>(QUEUE_CAPACITY);
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let thread_flag = Arc::clone(&shutdown_flag);
        let thread_url = url.to_string();

        let handle = thread::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                websocket_thread(&thread_url, request, outgoing_rx, &incoming_tx, thread_flag);
            }));

            if let Err(panic_info) = result {
                let msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    format!("WS thread panic: {}", s)
                } else {
                    "WS thread panic".to_string()
                };
                error!("{}", msg);
                let _ = incoming_tx.send(ChannelEvent::Error(msg));
            }
        });

        Ok(Self {
            url: url.to_string(),
            tx: Some(outgoing_tx),
            rx: Some(incoming_rx),
            thread_handle: Some(handle),
            shutdown_flag,
            open: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl MessageChannel for WsChannel {
    fn is_open(&self) -> bool {
        self.open
    }

    fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        if !self.open {
            return Err(ChannelError::NotOpen);
        }
        let tx = self.tx.as_ref().ok_or(ChannelError::NotOpen)?;
        tx.try_send(Outgoing::Text(text)).map_err(|e| match e {
            TrySendError::Full(_) => ChannelError::Send("outgoing queue full".to_string()),
            TrySendError::Disconnected(_) => ChannelError::NotOpen,
        })
    }

    fn poll_event(&mut self) -> Option<ChannelEvent> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(event) => {
                match &event {
                    ChannelEvent::Opened => self.open = true,
                    ChannelEvent::Closed { .. } | ChannelEvent::Error(_) => self.open = false,
                    ChannelEvent::Text(_) => {}
                }
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.open = false;
                self.rx = None;
                None
            }
        }
    }

    fn close(&mut self) {
        self.open = false;
        self.shutdown_flag.store(true, Ordering::SeqCst);
        if let Some(tx) = self.tx.take() {
            let _ = tx.try_send(Outgoing::Shutdown);
        }
        self.rx = None;
        // A thread stuck in the handshake exits on its own once it returns
        if let Some(handle) = self.thread_handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
        debug!(url = %self.url, "[WS] Channel closed locally");
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// WEBSOCKET THREAD
// =============================================================================

fn websocket_thread(
    url: &str,
    request: tungstenite::handshake::client::Request,
    outgoing_rx: Receiver<Outgoing>,
    incoming_tx: &Sender<ChannelEvent>,
    shutdown_flag: Arc<AtomicBool>,
) {
    info!(url = %url, "[WS] Connecting...");
    let mut socket = match connect(request) {
        Ok((socket, _)) => socket,
        Err(e) => {
            error!(url = %url, error = %e, "[WS] Connection failed");
            let _ = incoming_tx.send(ChannelEvent::Error(format!("Connect failed: {}", e)));
            return;
        }
    };

    if shutdown_flag.load(Ordering::SeqCst) {
        let _ = socket.close(None);
        return;
    }

    info!(url = %url, "[WS] Connected");
    let _ = incoming_tx.send(ChannelEvent::Opened);

    let event = match message_loop(&mut socket, &outgoing_rx, incoming_tx, &shutdown_flag) {
        Ok(None) => None,
        Ok(Some(reason)) => Some(ChannelEvent::Closed { reason }),
        Err(e) => {
            warn!(url = %url, error = %e, "[WS] Disconnected");
            Some(ChannelEvent::Error(e))
        }
    };
    let _ = socket.close(None);
    let _ = socket.flush();

    if let Some(event) = event {
        let _ = incoming_tx.send(event);
    }
}

/// Pump the socket until shutdown (`Ok(None)`), server close
/// (`Ok(Some(reason))`) or failure.
fn message_loop(
    socket: &mut WebSocket<MaybeTlsStream<TcpStream>>,
    outgoing_rx: &Receiver<Outgoing>,
    incoming_tx: &Sender<ChannelEvent>,
    shutdown_flag: &Arc<AtomicBool>,
) -> Result<Option<Option<String>>, String> {
    // Set non-blocking
    match socket.get_ref() {
        MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_nonblocking(true);
        }
        MaybeTlsStream::NativeTls(tls) => {
            let _ = tls.get_ref().set_nonblocking(true);
        }
        _ => {}
    }

    loop {
        if shutdown_flag.load(Ordering::SeqCst) {
            return Ok(None);
        }

        // Handle outgoing
        loop {
            match outgoing_rx.try_recv() {
                Ok(Outgoing::Text(text)) => match socket.send(Message::Text(text)) {
                    Ok(()) => {}
                    Err(tungstenite::Error::Io(ref e))
                        if e.kind() == std::io::ErrorKind::WouldBlock => {}
                    Err(e) => return Err(format!("Send error: {}", e)),
                },
                Ok(Outgoing::Shutdown) => return Ok(None),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(None),
            }
        }

        // Handle incoming
        match socket.read() {
            Ok(Message::Text(text)) => {
                if incoming_tx.send(ChannelEvent::Text(text)).is_err() {
                    return Ok(None);
                }
            }
            Ok(Message::Close(frame)) => {
                return Ok(Some(frame.map(|f| f.reason.to_string())));
            }
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(tungstenite::Error::ConnectionClosed) => return Ok(Some(None)),
            Err(e) => return Err(format!("Read error: {}", e)),
            _ => {}
        }

        thread::sleep(POLL_INTERVAL);
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// Opens channels on the configured server, authenticated by cookie
pub struct WsConnector {
    base_url: String,
    cookie: Option<String>,
}

impl WsConnector {
    pub fn new(settings: &ServerSettings) -> Self {
        Self {
            base_url: settings.url.clone(),
            cookie: settings.cookie_header(),
        }
    }
}

impl ChannelConnector for WsConnector {
    type Channel = WsChannel;

    fn open(&mut self, path: &str) -> Result<WsChannel, ChannelError> {
        let url = websocket_url(&self.base_url, path);
        WsChannel::connect(&url, self.cookie.clone())
    }
}
