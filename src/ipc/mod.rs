//! IPC transport for controller clients
//!
//! Every Unix socket connection is one client. Each line a client writes is a
//! JSON [`ClientRequest`]; every event queued for it is written back as one
//! JSON [`Message`] line. On connect the client's controller object is bound
//! as object [`CONTROLLER_OBJECT`], so the first lines it reads are the scene
//! replay.
//!
//! One task owns the [`IviController`]; connection tasks forward decoded
//! requests to it over an mpsc channel and receive their events on a
//! per-connection channel.

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};

use crate::controller::{ClientId, IviController, ObjectId};
use crate::layout::LayoutBackend;
use crate::protocol::{Message, Request};

/// Object id of the controller object bound for every connection
pub const CONTROLLER_OBJECT: ObjectId = ObjectId(1);

/// One request line: the target object plus the request itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub object: ObjectId,
    #[serde(flatten)]
    pub request: Request,
}

/// Work items for the controller task
#[derive(Debug)]
enum Command {
    Connect {
        pid: u32,
        events: mpsc::UnboundedSender<Message>,
        reply: oneshot::Sender<ClientId>,
    },
    Request {
        client: ClientId,
        object: ObjectId,
        request: Request,
    },
    Disconnect {
        client: ClientId,
    },
}

/// Unix socket server in front of an [`IviController`]
pub struct IpcServer {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl IpcServer {
    /// Binds the socket, replacing a stale socket file
    pub fn bind<P: AsRef<Path>>(socket_path: P) -> Result<Self> {
        let socket_path = socket_path.as_ref().to_path_buf();
        if socket_path.exists() {
            std::fs::remove_file(&socket_path).with_context(|| {
                format!("Failed to remove existing socket: {:?}", socket_path)
            })?;
        }

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;
        info!("🔗 IVI controller listening on: {:?}", socket_path);

        Ok(Self {
            socket_path,
            listener,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Serves clients until accepting fails.
    ///
    /// The controller moves into its own task.
    pub async fn serve<L>(self, controller: IviController<L>) -> Result<()>
    where
        L: LayoutBackend + Send + 'static,
    {
        let (commands, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_controller(controller, receiver));

        loop {
            let (stream, _) = self
                .listener
                .accept()
                .await
                .context("Failed to accept IPC connection")?;
            let commands = commands.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, commands).await {
                    warn!("⚠️ IPC connection ended with error: {:#}", e);
                }
            });
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!("⚠️ Failed to remove socket file: {}", e);
            }
        }
    }
}

/// Owns the controller and applies commands in arrival order
async fn run_controller<L: LayoutBackend>(
    mut controller: IviController<L>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let mut outputs: HashMap<ClientId, mpsc::UnboundedSender<Message>> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Connect { pid, events, reply } => {
                let client = controller.connect_client(pid);
                if let Err(e) = controller.bind_controller(client, CONTROLLER_OBJECT) {
                    error!("❌ Failed to bind controller for client {}: {}", client, e);
                }
                outputs.insert(client, events);
                if reply.send(client).is_err() {
                    debug!("Client {} went away before its id was delivered", client);
                }
            }
            Command::Request {
                client,
                object,
                request,
            } => controller.dispatch(client, object, request),
            Command::Disconnect { client } => {
                outputs.remove(&client);
                if let Err(e) = controller.disconnect_client(client) {
                    warn!("⚠️ {}", e);
                }
            }
        }

        for (client, output) in &outputs {
            for message in controller.take_events(*client) {
                if output.send(message).is_err() {
                    break;
                }
            }
        }
    }

    info!("Controller task stopped");
}

async fn handle_connection(
    stream: UnixStream,
    commands: mpsc::UnboundedSender<Command>,
) -> Result<()> {
    let pid = stream
        .peer_cred()
        .ok()
        .and_then(|cred| cred.pid())
        .and_then(|pid| u32::try_from(pid).ok())
        .unwrap_or(0);

    let (events, mut incoming_events) = mpsc::unbounded_channel();
    let (reply, client) = oneshot::channel();
    commands
        .send(Command::Connect { pid, events, reply })
        .map_err(|_| anyhow::anyhow!("Controller task is not running"))?;
    let client = client.await.context("Controller task is not running")?;
    info!("🤝 Client {} connected (pid {})", client, pid);

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let result: Result<()> = async {
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Failed to read from client")? else {
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    debug!("📨 Client {}: {}", client, line);

                    match serde_json::from_str::<ClientRequest>(&line) {
                        Ok(ClientRequest { object, request }) => {
                            if commands.send(Command::Request { client, object, request }).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("⚠️ Malformed request from client {}: {}", client, e),
                    }
                }
                Some(message) = incoming_events.recv() => {
                    send_message(&mut writer, &message).await?;
                }
            }
        }
        Ok(())
    }
    .await;

    // The controller task may already be gone during shutdown
    let _ = commands.send(Command::Disconnect { client });
    info!("📪 Client {} disconnected", client);
    result
}

async fn send_message(writer: &mut OwnedWriteHalf, message: &Message) -> Result<()> {
    let mut line = serde_json::to_string(message).context("Failed to encode event")?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .context("Failed to write to client")?;
    Ok(())
}
