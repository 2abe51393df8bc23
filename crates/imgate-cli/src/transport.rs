//! JSON-lines Request Transport
//!
//! One request per input line:
//!
//! ```text
//! {"id": 1, "method": "login", "params": {"serviceName": "aol", ...}}
//! ```
//!
//! Replies echo the request id as `{"id": 1, "reply": {...}}`; requests that
//! cannot be routed get `{"id": 1, "error": "..."}`. Requests are answered
//! concurrently, so a login held until its provider connects does not delay
//! later requests. Subscription pushes are
//! written as `{"subscription": "<stream>", "payload": {...}}` once the client
//! has subscribed to the stream. Unsolicited `accountStatus` pushes are always
//! written. The pseudo-method `display` takes a display-feed payload and
//! injects it as a display event.

use imgate_core::{
    AccountIdentity, DeviceConnectionClosedRequest, DisplayEvent, GatewayError, GatewayResult,
    GetBuddyListRequest, LoginRequest, LogoutRequest, Notification, NotificationReceiver,
    RegisterForIncomingMessagesRequest, SendMessageRequest, SetMyAvailabilityRequest,
    SetMyCustomMessageRequest,
};
use imgate_runtime::RuntimeClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Frames
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RequestFrame {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ReplyFrame {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplyFrame {
    fn reply(id: Value, reply: Value) -> Self {
        Self {
            id,
            reply: Some(reply),
            error: None,
        }
    }

    fn error(id: Value, error: &GatewayError) -> Self {
        Self {
            id,
            reply: None,
            error: Some(error.to_string()),
        }
    }
}

// ----------------------------------------------------------------------------
// Subscription Streams
// ----------------------------------------------------------------------------

/// Which pushes a forwarder writes out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFilter {
    /// Snapshot and presence updates for one account
    Buddies(AccountIdentity),
    Messages,
    AccountStatus,
}

impl StreamFilter {
    pub fn accepts(&self, notification: &Notification) -> bool {
        match (self, notification) {
            (
                StreamFilter::Buddies(identity),
                Notification::BuddyList(_) | Notification::BuddyStatus(_),
            ) => {
                let (service_name, username) = notification.account();
                AccountIdentity::new(service_name, username) == *identity
            }
            (StreamFilter::Messages, Notification::IncomingMessage(_)) => true,
            (StreamFilter::AccountStatus, Notification::AccountStatus(_)) => true,
            _ => false,
        }
    }
}

/// Outcome of one routed request
pub struct Routed {
    pub reply: Value,
    pub stream: Option<(NotificationReceiver, StreamFilter)>,
}

impl Routed {
    fn reply<T: Serialize>(reply: &T) -> GatewayResult<Self> {
        Ok(Self {
            reply: serde_json::to_value(reply)?,
            stream: None,
        })
    }
}

// ----------------------------------------------------------------------------
// Routing
// ----------------------------------------------------------------------------

fn params<T: DeserializeOwned>(params: Value) -> GatewayResult<T> {
    let params = match params {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    Ok(serde_json::from_value(params)?)
}

/// Route one request to the runtime and wait for its reply
pub async fn route(client: &RuntimeClient, method: &str, raw: Value) -> GatewayResult<Routed> {
    match method {
        "login" => Routed::reply(&client.login(params::<LoginRequest>(raw)?).await?),
        "logout" => Routed::reply(&client.logout(params::<LogoutRequest>(raw)?).await?),
        "setMyAvailability" => Routed::reply(
            &client
                .set_my_availability(params::<SetMyAvailabilityRequest>(raw)?)
                .await?,
        ),
        "setMyCustomMessage" => Routed::reply(
            &client
                .set_my_custom_message(params::<SetMyCustomMessageRequest>(raw)?)
                .await?,
        ),
        "sendMessage" => {
            Routed::reply(&client.send_message(params::<SendMessageRequest>(raw)?).await?)
        }
        "getBuddyList" => {
            let request: GetBuddyListRequest = params(raw)?;
            let filter =
                StreamFilter::Buddies(AccountIdentity::new(&request.service_name, &request.username));
            let (reply, receiver) = client.get_buddy_list(request).await?;
            let stream = reply.return_value.then_some((receiver, filter));
            Ok(Routed {
                reply: serde_json::to_value(&reply)?,
                stream,
            })
        }
        "registerForIncomingMessages" => {
            let request: RegisterForIncomingMessagesRequest = params(raw)?;
            let (reply, receiver) = client.register_for_incoming_messages(request).await?;
            let stream = reply.return_value.then_some((receiver, StreamFilter::Messages));
            Ok(Routed {
                reply: serde_json::to_value(&reply)?,
                stream,
            })
        }
        "deviceConnectionClosed" => Routed::reply(
            &client
                .device_connection_closed(params::<DeviceConnectionClosedRequest>(raw)?)
                .await?,
        ),
        "enablePresenceQueue" => Routed::reply(&client.enable_presence_queue().await?),
        "disablePresenceQueue" => Routed::reply(&client.disable_presence_queue().await?),
        "getStatus" => Routed::reply(&client.status().await?),
        "display" => {
            let event = DisplayEvent::from_payload(&raw).ok_or_else(|| {
                GatewayError::invalid_parameters("Unrecognised display payload")
            })?;
            client.display_event(event).await?;
            Routed::reply(&json!({ "returnValue": true }))
        }
        other => Err(GatewayError::invalid_parameters(format!(
            "Unknown method: {other}"
        ))),
    }
}

/// Parse and route one input line. Only unrecoverable gateway errors
/// escape; everything else becomes an error frame.
async fn handle_line(
    client: &RuntimeClient,
    line: &str,
) -> GatewayResult<(ReplyFrame, Option<(NotificationReceiver, StreamFilter)>)> {
    let frame: RequestFrame = match serde_json::from_str(line) {
        Ok(frame) => frame,
        Err(err) => {
            let err = GatewayError::from(err);
            warn!("Malformed request line: {}", err);
            return Ok((ReplyFrame::error(Value::Null, &err), None));
        }
    };

    debug!(method = %frame.method, "Routing request");
    match route(client, &frame.method, frame.params).await {
        Ok(routed) => Ok((ReplyFrame::reply(frame.id, routed.reply), routed.stream)),
        Err(err) if err.is_recoverable() => {
            warn!(method = %frame.method, "Request failed: {}", err);
            Ok((ReplyFrame::error(frame.id, &err), None))
        }
        Err(err) => Err(err),
    }
}

// ----------------------------------------------------------------------------
// Output
// ----------------------------------------------------------------------------

struct Forwarder {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

fn send_line<T: Serialize>(output: &mpsc::UnboundedSender<String>, value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => {
            if output.send(line).is_err() {
                debug!("Output writer gone, frame dropped");
            }
        }
        Err(err) => warn!("Failed to encode output frame: {}", err),
    }
}

fn spawn_forwarder(
    mut receiver: NotificationReceiver,
    filter: StreamFilter,
    output: mpsc::UnboundedSender<String>,
) -> Forwarder {
    let (stop, mut stopped) = oneshot::channel();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                received = receiver.recv() => match received {
                    Ok(notification) if filter.accepts(&notification) => {
                        send_line(&output, &notification);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(?filter, missed, "Subscriber lagged, pushes dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = &mut stopped => {
                    while let Ok(notification) = receiver.try_recv() {
                        if filter.accepts(&notification) {
                            send_line(&output, &notification);
                        }
                    }
                    break;
                }
            }
        }
    });
    Forwarder { stop, task }
}

async fn write_lines<W>(mut writer: W, mut lines: mpsc::UnboundedReceiver<String>) -> std::io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(writer)
}

// ----------------------------------------------------------------------------
// Serve Loop
// ----------------------------------------------------------------------------

/// Answer one request line and start the forwarder for any stream it
/// subscribed to. Runs as its own task so held replies never block reading.
async fn answer_line(
    client: RuntimeClient,
    line: String,
    output: mpsc::UnboundedSender<String>,
) -> GatewayResult<Option<Forwarder>> {
    let (reply, stream) = handle_line(&client, &line).await?;
    send_line(&output, &reply);
    Ok(stream.map(|(receiver, filter)| {
        debug!(?filter, "Client subscribed");
        spawn_forwarder(receiver, filter, output)
    }))
}

/// Fold a finished request task into the forwarder list
fn collect_answer(
    joined: std::result::Result<GatewayResult<Option<Forwarder>>, JoinError>,
    forwarders: &mut Vec<Forwarder>,
) -> Result<()> {
    match joined {
        Ok(Ok(Some(forwarder))) => forwarders.push(forwarder),
        Ok(Ok(None)) => {}
        Ok(Err(err)) => return Err(CliError::from(err)),
        Err(err) => warn!("Request task failed: {}", err),
    }
    Ok(())
}

/// Serve requests from `reader` until end of input, writing replies and
/// pushes to `writer`. Each request is answered on its own task, so replies
/// may come back out of order; clients match them by id. Returns the writer
/// once every in-flight reply and pending push is out.
pub async fn serve<R, W>(client: RuntimeClient, reader: R, writer: W) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (output, output_receiver) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_lines(writer, output_receiver));
    let mut forwarders = vec![spawn_forwarder(
        client.subscribe(),
        StreamFilter::AccountStatus,
        output.clone(),
    )];

    let mut requests = JoinSet::new();
    let mut lines = reader.lines();
    let mut outcome = Ok(());
    let mut reading = true;
    while reading {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        let output = output.clone();
                        requests.spawn(answer_line(client.clone(), line.to_owned(), output));
                    }
                }
                Ok(None) => reading = false,
                Err(err) => {
                    outcome = Err(CliError::from(err));
                    break;
                }
            },
            Some(joined) = requests.join_next() => {
                if let Err(err) = collect_answer(joined, &mut forwarders) {
                    outcome = Err(err);
                    break;
                }
            }
        }
    }

    if outcome.is_ok() {
        while let Some(joined) = requests.join_next().await {
            if let Err(err) = collect_answer(joined, &mut forwarders) {
                outcome = Err(err);
                break;
            }
        }
    }
    requests.shutdown().await;

    for forwarder in forwarders {
        let _ = forwarder.stop.send(());
        if let Err(err) = forwarder.task.await {
            warn!("Push forwarder failed: {}", err);
        }
    }
    drop(output);

    let writer = writer_task
        .await
        .map_err(|err| CliError::Config(format!("Output writer failed: {err}")))??;
    outcome.map(|_| writer)
}
