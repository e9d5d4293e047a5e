use crate::probe::ProbeSession;
use log::{error, info, warn};
use shared::{Frame, MAX_PACKET_SIZE, MESSAGE_CHANNEL};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep_until, Instant};

/// How the probe behaves once connected
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Never register the side channel
    pub vanilla: bool,
    /// Delay between the connect reply and registering the side channel
    pub register_delay: Duration,
    /// World to switch to after registering
    pub change_world: Option<String>,
    /// Total time to stay connected
    pub duration: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            vanilla: false,
            register_delay: Duration::from_millis(100),
            change_world: None,
            duration: Duration::from_secs(5),
        }
    }
}

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    session: ProbeSession,
    options: ProbeOptions,
    register_at: Option<Instant>,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        options: ProbeOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            session: ProbeSession::new(options.vanilla, MESSAGE_CHANNEL),
            options,
            register_at: None,
        })
    }

    pub fn session(&self) -> &ProbeSession {
        &self.session
    }

    async fn send_frame(&self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let data = frame.encode()?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    fn handle_frame(&mut self, frame: Frame) {
        let was_connected = self.session.is_connected();

        if let Err(e) = self.session.handle_frame(frame) {
            warn!("Failed to decode side channel payload: {}", e);
        }

        if !was_connected && self.session.is_connected() && !self.session.is_vanilla() {
            self.register_at = Some(Instant::now() + self.options.register_delay);
        }
    }

    async fn register(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.register_at = None;

        let Some(frame) = self.session.register_frame() else {
            return Ok(());
        };
        info!("Registering {}", MESSAGE_CHANNEL);
        self.send_frame(&frame).await?;

        if let Some(world) = self.options.change_world.clone() {
            info!("Switching to world {}", world);
            self.send_frame(&Frame::ChangeWorld { world }).await?;
        }
        Ok(())
    }

    /// Runs until the configured duration has passed, then disconnects.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");
        let connect = self.session.connect_frame();
        self.send_frame(&connect).await?;

        let end = Instant::now() + self.options.duration;
        let mut heartbeat_interval = interval(Duration::from_secs(1));
        let mut buffer = [0u8; MAX_PACKET_SIZE];

        loop {
            let register_at = self.register_at;

            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => match Frame::decode(&buffer[..len]) {
                            Ok(frame) => self.handle_frame(frame),
                            Err(e) => warn!("Failed to decode frame: {}", e),
                        },
                        Err(e) => error!("Error receiving frame: {}", e),
                    }
                },

                _ = sleep_until(register_at.unwrap_or(end)), if register_at.is_some() => {
                    if let Err(e) = self.register().await {
                        error!("Error registering side channel: {}", e);
                    }
                },

                _ = heartbeat_interval.tick() => {
                    if self.session.is_connected() {
                        if let Err(e) = self.send_frame(&Frame::Heartbeat).await {
                            error!("Error sending heartbeat: {}", e);
                        }
                    }
                },

                _ = sleep_until(end) => break,
            }
        }

        if self.session.is_connected() {
            let _ = self.send_frame(&Frame::Disconnect).await;
        }
        info!("Session finished: {}", self.session.summary());

        Ok(())
    }
}
