//! Channel senders: the transports that actually deliver a notification.
//!
//! The queue only looks at `Ok` versus `Err`. Any implementation with
//! the right signature (HTTP gateway, stub, simulator) can be plugged in.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, info};

use crate::{Channel, SendError, Variables};

/// Delivers one notification over one channel
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        template: &str,
        variables: &Variables,
    ) -> Result<(), SendError>;
}

#[async_trait]
impl<T: ChannelSender + ?Sized> ChannelSender for Arc<T> {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        template: &str,
        variables: &Variables,
    ) -> Result<(), SendError> {
        (**self).send(channel, recipient, template, variables).await
    }
}

/// Routes each send to the transport registered for its channel
#[derive(Default, Clone)]
pub struct ChannelRouter {
    routes: HashMap<Channel, Arc<dyn ChannelSender>>,
    fallback: Option<Arc<dyn ChannelSender>>,
}

impl ChannelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the transport for a channel, replacing any previous one
    pub fn route(mut self, channel: Channel, sender: impl ChannelSender + 'static) -> Self {
        self.routes.insert(channel, Arc::new(sender));
        self
    }

    /// Transport used for channels without a dedicated route
    pub fn fallback(mut self, sender: impl ChannelSender + 'static) -> Self {
        self.fallback = Some(Arc::new(sender));
        self
    }

    pub fn has_route(&self, channel: Channel) -> bool {
        self.routes.contains_key(&channel) || self.fallback.is_some()
    }
}

#[async_trait]
impl ChannelSender for ChannelRouter {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        template: &str,
        variables: &Variables,
    ) -> Result<(), SendError> {
        let sender = self
            .routes
            .get(&channel)
            .or(self.fallback.as_ref())
            .ok_or_else(|| SendError::NoRoute(channel.to_string()))?;

        sender.send(channel, recipient, template, variables).await
    }
}

/// Logs every notification and reports success
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

#[async_trait]
impl ChannelSender for LogSender {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        template: &str,
        variables: &Variables,
    ) -> Result<(), SendError> {
        info!(
            %channel,
            recipient,
            template,
            variables = variables.len(),
            "Delivered notification"
        );
        Ok(())
    }
}

/// Development transport that succeeds with a per-channel probability
#[derive(Debug, Clone)]
pub struct SimulatedSender {
    default_rate: f64,
    rates: HashMap<Channel, f64>,
    latency: Duration,
}

impl SimulatedSender {
    /// Create a simulator that succeeds with probability `success_rate` on every channel
    pub fn new(success_rate: f64) -> Self {
        Self {
            default_rate: success_rate.clamp(0.0, 1.0),
            rates: HashMap::new(),
            latency: Duration::ZERO,
        }
    }

    /// Override the success probability for one channel
    pub fn with_channel_rate(mut self, channel: Channel, success_rate: f64) -> Self {
        self.rates.insert(channel, success_rate.clamp(0.0, 1.0));
        self
    }

    /// Simulated network latency per send
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn success_rate(&self, channel: Channel) -> f64 {
        self.rates.get(&channel).copied().unwrap_or(self.default_rate)
    }
}

impl Default for SimulatedSender {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[async_trait]
impl ChannelSender for SimulatedSender {
    async fn send(
        &self,
        channel: Channel,
        recipient: &str,
        template: &str,
        _variables: &Variables,
    ) -> Result<(), SendError> {
        // ThreadRng is not Send, roll before the await point
        let delivered = rand::thread_rng().gen_bool(self.success_rate(channel));

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if delivered {
            debug!(%channel, recipient, template, "Simulated delivery succeeded");
            Ok(())
        } else {
            Err(SendError::delivery(format!(
                "simulated {} delivery to {} failed",
                channel, recipient
            )))
        }
    }
}
