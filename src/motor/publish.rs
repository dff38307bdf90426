// Zenoh publisher sink: decoded commands as JSON on a topic

use tracing::info;
use zenoh::Session;
use zenoh::pubsub::Publisher;

use super::sink::{MotorSink, Result, SinkError};
use crate::messages::MotorCommands;

pub struct ZenohSink {
    // Publisher is only valid while the session is open
    _session: Session,
    publisher: Publisher<'static>,
}

impl ZenohSink {
    pub async fn open(topic: &str) -> Result<Self> {
        info!("Opening Zenoh session...");
        let session = zenoh::open(zenoh::Config::default())
            .await
            .map_err(|e| SinkError::Zenoh(e.to_string()))?;

        let publisher = session
            .declare_publisher(topic.to_string())
            .await
            .map_err(|e| SinkError::Zenoh(e.to_string()))?;

        info!("Publishing motor commands to: {}", topic);
        Ok(Self {
            _session: session,
            publisher,
        })
    }
}

impl MotorSink for ZenohSink {
    async fn emit(&mut self, commands: &MotorCommands) -> Result<()> {
        let payload = serde_json::to_string(commands)?;
        self.publisher
            .put(payload)
            .await
            .map_err(|e| SinkError::Zenoh(e.to_string()))
    }
}
