//! UDP reference host wiring transport frames into the bridge

use crate::config::HostConfig;
use crate::connections::ConnectionTable;
use crate::delivery::{Bridge, SideChannel, TransmitError};
use crate::events::EventSink;
use crate::features::ServerRules;
use crate::handler::PacketHandler;
use crate::registry::ClientId;
use crate::resolver::World;
use crate::session::SessionListener;
use log::{debug, error, info, warn};
use shared::{is_message_channel, Frame, MAX_PACKET_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to the main host loop
#[derive(Debug)]
pub enum ServerMessage {
    FrameReceived { frame: Frame, addr: SocketAddr },
    ClientTimeout { client_id: ClientId },
    Shutdown,
}

/// Messages consumed by the sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendFrame {
        frame: Frame,
        addr: SocketAddr,
    },
    /// Side channel payload; the address is looked up when it is sent.
    PluginMessage {
        client: ClientId,
        channel: String,
        payload: Vec<u8>,
    },
}

/// Side channel backed by the host's outbound queue.
///
/// Payloads keep the order they were handed over in; the sender task
/// drains a single queue.
#[derive(Clone)]
pub struct UdpSideChannel {
    outbound: mpsc::UnboundedSender<OutboundMessage>,
}

impl UdpSideChannel {
    pub fn new(outbound: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self { outbound }
    }
}

impl SideChannel for UdpSideChannel {
    fn transmit(
        &self,
        client: ClientId,
        channel: &str,
        payload: Vec<u8>,
    ) -> Result<(), TransmitError> {
        self.outbound
            .send(OutboundMessage::PluginMessage {
                client,
                channel: channel.to_string(),
                payload,
            })
            .map_err(|_| TransmitError::Closed)
    }
}

/// Cloneable handle for stopping a running host
#[derive(Clone)]
pub struct ShutdownHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Host already stopped");
        }
    }
}

/// Host coordinating connections, session events and the side channel
pub struct HostServer {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionTable>>,
    listener: SessionListener,
    worlds: Vec<World>,
    rules: ServerRules,
    client_timeout: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: Option<mpsc::UnboundedReceiver<OutboundMessage>>,
}

impl HostServer {
    pub async fn new(
        config: HostConfig,
        handler: Arc<dyn PacketHandler>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Host listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let channel = Arc::new(UdpSideChannel::new(outbound_tx.clone()));
        let bridge = Bridge::new(config.bridge.clone(), channel, handler, events)?;

        let worlds: Vec<World> = config.worlds.iter().map(World::new).collect();
        if config.named_worlds {
            for world in &worlds {
                bridge.register_world_identifier(world.id, |world: &World| world.name.clone());
            }
        }

        Ok(HostServer {
            socket,
            connections: Arc::new(RwLock::new(ConnectionTable::new(config.max_clients))),
            listener: SessionListener::new(bridge),
            worlds,
            rules: config.rules.iter().copied().collect(),
            client_timeout: config.client_timeout,
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        self.listener.bridge()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that continuously listens for incoming frames
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Frame::decode(&buffer[..len]) {
                        Ok(frame) => {
                            if server_tx
                                .send(ServerMessage::FrameReceived { frame, addr })
                                .is_err()
                            {
                                debug!("Host loop gone, stopping receiver");
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to decode frame from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving frame: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that drains the outbound queue
    fn spawn_network_sender(&mut self) {
        let Some(mut outbound_rx) = self.outbound_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);
        let connections = Arc::clone(&self.connections);

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let (frame, addr) = match message {
                    OutboundMessage::SendFrame { frame, addr } => (frame, addr),
                    OutboundMessage::PluginMessage {
                        client,
                        channel,
                        payload,
                    } => {
                        let addr = connections.read().await.addr_of(&client);
                        match addr {
                            Some(addr) => (Frame::PluginMessage { channel, payload }, addr),
                            None => {
                                warn!("{}", TransmitError::NotConnected(client));
                                continue;
                            }
                        }
                    }
                };

                if let Err(e) = Self::send_frame_impl(&socket, &frame, addr).await {
                    error!("Failed to send frame to {}: {}", addr, e);
                }
            }
        });
    }

    /// Spawns task that monitors idle connections
    fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();
        let timeout = self.client_timeout;

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = connections.write().await.check_timeouts(timeout);
                for client_id in timed_out {
                    if server_tx
                        .send(ServerMessage::ClientTimeout { client_id })
                        .is_err()
                    {
                        return;
                    }
                }
            }
        });
    }

    async fn send_frame_impl(
        socket: &UdpSocket,
        frame: &Frame,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = frame.encode()?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_frame(&self, frame: Frame, addr: SocketAddr) {
        if let Err(e) = self.outbound_tx.send(OutboundMessage::SendFrame { frame, addr }) {
            error!("Failed to queue frame for sending: {}", e);
        }
    }

    fn find_world(&self, name: &str) -> Option<&World> {
        self.worlds.iter().find(|world| world.name == name)
    }

    /// Processes one frame from `addr`
    async fn handle_frame(&mut self, frame: Frame, addr: SocketAddr) {
        let client = self.connections.write().await.touch(addr);

        match frame {
            Frame::Connect { client_version } => {
                if let Some(existing) = client {
                    info!("Replacing existing connection {} from {}", existing, addr);
                    self.connections.write().await.remove_connection(&existing);
                    self.listener.on_disconnect(existing);
                }

                let spawn = self.worlds[0].clone();
                let client_id =
                    self.connections
                        .write()
                        .await
                        .add_connection(addr, client_version, spawn.clone());

                match client_id {
                    Some(client_id) => {
                        let world = self.bridge().resolve_world(&spawn);
                        self.send_frame(Frame::Connected { client_id, world }, addr);
                        self.listener.on_connect(client_id);
                        // Queued until the client registers the side channel.
                        self.rules.send_to(self.bridge().as_ref(), [client_id]);
                    }
                    None => self.send_frame(
                        Frame::Disconnected {
                            reason: "Server full".to_string(),
                        },
                        addr,
                    ),
                }
            }

            Frame::RegisterChannel { channel } => {
                let Some(client) = client else {
                    return self.unknown_sender(addr);
                };
                let world = self.connections.read().await.world_of(&client).cloned();
                if let Some(world) = world {
                    self.listener.on_channel_register(client, &channel, &world);
                }
            }

            Frame::UnregisterChannel { channel } => {
                let Some(client) = client else {
                    return self.unknown_sender(addr);
                };
                self.listener.on_channel_unregister(client, &channel);
            }

            Frame::PluginMessage { channel, payload } => {
                let Some(client) = client else {
                    return self.unknown_sender(addr);
                };
                if !is_message_channel(&channel, &self.bridge().config().channel) {
                    debug!("Ignoring message on {} from {}", channel, client);
                    return;
                }
                // Rejections are logged by the bridge.
                let _ = self.bridge().receive(client, &payload);
            }

            Frame::ChangeWorld { world } => {
                let Some(client) = client else {
                    return self.unknown_sender(addr);
                };
                let Some(world) = self.find_world(&world).cloned() else {
                    warn!("Client {} asked for unknown world {}", client, world);
                    return;
                };
                self.connections
                    .write()
                    .await
                    .set_world(&client, world.clone());
                self.listener.on_world_changed(client, &world);
            }

            Frame::Heartbeat => {
                if client.is_none() {
                    self.unknown_sender(addr);
                }
            }

            Frame::Disconnect => {
                if let Some(client) = client {
                    self.connections.write().await.remove_connection(&client);
                    self.listener.on_disconnect(client);
                }
            }

            Frame::Connected { .. } | Frame::Disconnected { .. } => {
                warn!("Unexpected clientbound frame from {}", addr);
            }
        }
    }

    fn unknown_sender(&self, addr: SocketAddr) {
        debug!("Frame from unconnected address {}", addr);
    }

    /// Main host loop
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut status_interval = interval(Duration::from_secs(10));

        info!("Host started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::FrameReceived { frame, addr }) => {
                            self.handle_frame(frame, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            self.listener.on_disconnect(client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Host shutting down");
                            break;
                        }
                    }
                },

                _ = status_interval.tick() => {
                    let connected = self.connections.read().await.len();
                    if connected > 0 {
                        debug!(
                            "{} connections, {} enhanced clients",
                            connected,
                            self.bridge().capable_clients().len()
                        );
                    }
                },
            }
        }

        Ok(())
    }
}
