//! Entry point of the client
//!
//! A [`Device`] picks the handler family for the running environment, learns
//! the router's capabilities once with [`Device::load`], and creates send and
//! receive transports that share the negotiated result.

use std::collections::HashMap;
use std::sync::Arc;

use ortc_infra_common::QueueOptions;
use ortc_rtp_core::{
    can_send, get_extended_rtp_capabilities, get_recv_rtp_capabilities,
    validate_rtp_capabilities, validate_sctp_capabilities, ExtendedRtpCapabilities, MediaKind,
    RtpCapabilities, SctpCapabilities,
};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::{DeviceOptions, TransportOptions};
use crate::error::{Error, Result};
use crate::events::TransportListener;
use crate::handlers::{detect_device, Handler, HandlerFactory, HandlerName};
use crate::transport::{Transport, TransportParams};
use crate::types::TransportDirection;

/// Result of a successful load
#[derive(Debug)]
struct LoadedCapabilities {
    extended_rtp_capabilities: ExtendedRtpCapabilities,
    recv_rtp_capabilities: RtpCapabilities,
    sctp_capabilities: SctpCapabilities,
    can_produce_by_kind: HashMap<MediaKind, bool>,
}

/// Local endpoint bound to one handler family
pub struct Device {
    handler_name: HandlerName,
    handler_factory: HandlerFactory,
    queue_options: QueueOptions,
    loaded: RwLock<Option<Arc<LoadedCapabilities>>>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("handler_name", &self.handler_name)
            .field("loaded", &self.loaded())
            .finish()
    }
}

fn resolve_handler(options: &DeviceOptions) -> Result<(HandlerName, HandlerFactory)> {
    if let Some(factory) = &options.handler_factory {
        let handler = factory();
        let name = handler.name();
        handler.close();
        return Ok((name, Arc::clone(factory)));
    }

    let name = match (options.handler_name, &options.user_agent) {
        (Some(name), _) => name,
        (None, Some(user_agent)) => detect_device(user_agent).ok_or_else(|| {
            Error::UnsupportedDevice(format!(
                "device not supported [user_agent:{}]",
                user_agent.user_agent
            ))
        })?,
        (None, None) => {
            return Err(Error::UnsupportedDevice(
                "no handler name, factory or user agent given".to_string(),
            ))
        }
    };

    let factory = options.registry.factory(name).ok_or_else(|| {
        Error::UnsupportedDevice(format!("no handler registered for {name}"))
    })?;
    Ok((name, factory))
}

impl Device {
    /// Create a device for the handler `options` select
    pub fn new(options: DeviceOptions) -> Result<Self> {
        let (handler_name, handler_factory) = resolve_handler(&options)?;
        debug!(handler = %handler_name, "device created");

        Ok(Self {
            handler_name,
            handler_factory,
            queue_options: options.queue,
            loaded: RwLock::new(None),
        })
    }

    pub fn handler_name(&self) -> HandlerName {
        self.handler_name
    }

    /// Whether [`load`](Self::load) succeeded
    pub fn loaded(&self) -> bool {
        self.loaded.read().is_some()
    }

    fn loaded_capabilities(&self) -> Result<Arc<LoadedCapabilities>> {
        self.loaded
            .read()
            .clone()
            .ok_or_else(|| Error::invalid_state("not loaded"))
    }

    /// Negotiate against the router's RTP capabilities
    ///
    /// A loaded device cannot be loaded again. The handler used to query the
    /// native capabilities is closed before this returns.
    pub async fn load(&self, router_rtp_capabilities: RtpCapabilities) -> Result<()> {
        if self.loaded() {
            return Err(Error::invalid_state("already loaded"));
        }
        debug!(handler = %self.handler_name, "load()");

        let mut router_rtp_capabilities = router_rtp_capabilities;
        validate_rtp_capabilities(&mut router_rtp_capabilities)?;

        let handler = (self.handler_factory)();
        let negotiated = negotiate(handler.as_ref(), &router_rtp_capabilities).await;
        handler.close();
        let loaded = negotiated?;

        let mut slot = self.loaded.write();
        if slot.is_some() {
            return Err(Error::invalid_state("already loaded"));
        }
        info!(
            handler = %self.handler_name,
            can_produce = ?loaded.can_produce_by_kind,
            "device loaded"
        );
        *slot = Some(Arc::new(loaded));
        Ok(())
    }

    /// RTP capabilities to announce to the router for receiving
    pub fn rtp_capabilities(&self) -> Result<RtpCapabilities> {
        Ok(self.loaded_capabilities()?.recv_rtp_capabilities.clone())
    }

    pub fn sctp_capabilities(&self) -> Result<SctpCapabilities> {
        Ok(self.loaded_capabilities()?.sctp_capabilities)
    }

    /// Whether media of `kind` can be sent to the router
    pub fn can_produce(&self, kind: MediaKind) -> Result<bool> {
        let loaded = self.loaded_capabilities()?;
        Ok(loaded.can_produce_by_kind.get(&kind).copied().unwrap_or(false))
    }

    /// Create a transport for sending media and data
    pub async fn create_send_transport(
        &self,
        options: TransportOptions,
        listener: Arc<dyn TransportListener>,
    ) -> Result<Transport> {
        self.create_transport(TransportDirection::Send, options, listener)
            .await
    }

    /// Create a transport for receiving media and data
    pub async fn create_recv_transport(
        &self,
        options: TransportOptions,
        listener: Arc<dyn TransportListener>,
    ) -> Result<Transport> {
        self.create_transport(TransportDirection::Recv, options, listener)
            .await
    }

    async fn create_transport(
        &self,
        direction: TransportDirection,
        options: TransportOptions,
        listener: Arc<dyn TransportListener>,
    ) -> Result<Transport> {
        let loaded = self.loaded_capabilities()?;
        debug!(%direction, transport_id = %options.id, "create_transport()");

        Transport::new(TransportParams {
            direction,
            options,
            handler: (self.handler_factory)(),
            extended_rtp_capabilities: loaded.extended_rtp_capabilities.clone(),
            can_produce_by_kind: loaded.can_produce_by_kind.clone(),
            queue_options: self.queue_options.clone(),
            listener,
        })
        .await
    }
}

async fn negotiate(
    handler: &dyn Handler,
    router_rtp_capabilities: &RtpCapabilities,
) -> Result<LoadedCapabilities> {
    let mut native_rtp_capabilities = handler.get_native_rtp_capabilities().await?;
    validate_rtp_capabilities(&mut native_rtp_capabilities)?;

    let extended_rtp_capabilities =
        get_extended_rtp_capabilities(&native_rtp_capabilities, router_rtp_capabilities);

    let can_produce_by_kind: HashMap<MediaKind, bool> = [MediaKind::Audio, MediaKind::Video]
        .into_iter()
        .map(|kind| (kind, can_send(kind, &extended_rtp_capabilities)))
        .collect();

    let mut recv_rtp_capabilities = get_recv_rtp_capabilities(&extended_rtp_capabilities);
    validate_rtp_capabilities(&mut recv_rtp_capabilities)?;

    let sctp_capabilities = handler.get_native_sctp_capabilities().await?;
    validate_sctp_capabilities(&sctp_capabilities)?;

    if extended_rtp_capabilities.codecs.is_empty() {
        warn!(handler = %handler.name(), "no codec in common with the router");
    }

    Ok(LoadedCapabilities {
        extended_rtp_capabilities,
        recv_rtp_capabilities,
        sctp_capabilities,
        can_produce_by_kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerRegistry, UserAgentInfo};

    #[test]
    fn test_device_needs_a_handler() {
        let result = Device::new(DeviceOptions::new());
        assert!(matches!(result, Err(Error::UnsupportedDevice(_))));
    }

    #[test]
    fn test_device_unregistered_name() {
        let options = DeviceOptions::new()
            .with_handler_name(HandlerName::Chrome111)
            .with_registry(HandlerRegistry::with_fake());
        assert!(matches!(
            Device::new(options),
            Err(Error::UnsupportedDevice(_))
        ));
    }

    #[test]
    fn test_device_detected_but_unregistered() {
        let info = UserAgentInfo::from_user_agent(
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
        );
        let result = Device::new(DeviceOptions::new().with_user_agent(info));
        assert!(matches!(result, Err(Error::UnsupportedDevice(_))));
    }

    #[tokio::test]
    async fn test_accessors_before_load() {
        let device = Device::new(DeviceOptions::new().with_handler_name(HandlerName::Fake)).unwrap();
        assert_eq!(device.handler_name(), HandlerName::Fake);
        assert!(!device.loaded());
        assert!(matches!(device.rtp_capabilities(), Err(Error::InvalidState(_))));
        assert!(matches!(device.sctp_capabilities(), Err(Error::InvalidState(_))));
        assert!(matches!(
            device.can_produce(MediaKind::Audio),
            Err(Error::InvalidState(_))
        ));
    }
}
