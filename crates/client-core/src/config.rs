//! Option structs for devices and transports
//!
//! Builder-style, the way the rest of the stack configures itself. Transport
//! options mirror what the server hands out when it creates the remote
//! transport, so they deserialize straight from the signaling JSON.

use std::fmt;

use ortc_infra_common::config::CoreConfig;
use ortc_infra_common::QueueOptions;
use ortc_rtp_core::SctpParameters;
use ortc_sdp_core::{DtlsParameters, IceCandidate, IceParameters};
use serde::{Deserialize, Serialize};

use crate::handlers::{HandlerFactory, HandlerName, HandlerRegistry, UserAgentInfo};
use crate::types::{IceServer, IceTransportPolicy};

/// How a [`Device`](crate::Device) picks its handler
///
/// Precedence: an explicit factory, then an explicit handler name, then the
/// name detected from the user agent. Names are resolved in the registry.
#[derive(Clone)]
pub struct DeviceOptions {
    pub handler_name: Option<HandlerName>,
    pub handler_factory: Option<HandlerFactory>,
    pub user_agent: Option<UserAgentInfo>,
    pub registry: HandlerRegistry,
    /// Options of every transport queue this device creates
    pub queue: QueueOptions,
}

impl fmt::Debug for DeviceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceOptions")
            .field("handler_name", &self.handler_name)
            .field("handler_factory", &self.handler_factory.is_some())
            .field("user_agent", &self.user_agent)
            .field("registry", &self.registry)
            .field("queue", &self.queue)
            .finish()
    }
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            handler_name: None,
            handler_factory: None,
            user_agent: None,
            registry: HandlerRegistry::with_fake(),
            queue: QueueOptions::default(),
        }
    }
}

impl DeviceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options taking the queue settings from a loaded configuration
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new().with_queue_options(config.queue.clone().into())
    }

    pub fn with_handler_name(mut self, name: HandlerName) -> Self {
        self.handler_name = Some(name);
        self
    }

    pub fn with_handler_factory(mut self, factory: HandlerFactory) -> Self {
        self.handler_factory = Some(factory);
        self
    }

    pub fn with_user_agent(mut self, info: UserAgentInfo) -> Self {
        self.user_agent = Some(info);
        self
    }

    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_queue_options(mut self, queue: QueueOptions) -> Self {
        self.queue = queue;
        self
    }
}

/// Remote transport parameters plus local engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportOptions {
    /// Server side transport id
    pub id: String,
    pub ice_parameters: IceParameters,
    #[serde(default)]
    pub ice_candidates: Vec<IceCandidate>,
    pub dtls_parameters: DtlsParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sctp_parameters: Option<SctpParameters>,
    #[serde(default)]
    pub ice_servers: Vec<IceServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ice_transport_policy: Option<IceTransportPolicy>,
    #[serde(default)]
    pub app_data: serde_json::Value,
}

impl TransportOptions {
    pub fn new(
        id: impl Into<String>,
        ice_parameters: IceParameters,
        dtls_parameters: DtlsParameters,
    ) -> Self {
        Self {
            id: id.into(),
            ice_parameters,
            ice_candidates: Vec::new(),
            dtls_parameters,
            sctp_parameters: None,
            ice_servers: Vec::new(),
            ice_transport_policy: None,
            app_data: serde_json::Value::Null,
        }
    }

    pub fn with_ice_candidates(mut self, candidates: Vec<IceCandidate>) -> Self {
        self.ice_candidates = candidates;
        self
    }

    pub fn with_sctp_parameters(mut self, parameters: SctpParameters) -> Self {
        self.sctp_parameters = Some(parameters);
        self
    }

    pub fn with_ice_servers(mut self, servers: Vec<IceServer>) -> Self {
        self.ice_servers = servers;
        self
    }

    pub fn with_ice_transport_policy(mut self, policy: IceTransportPolicy) -> Self {
        self.ice_transport_policy = Some(policy);
        self
    }

    pub fn with_app_data(mut self, app_data: serde_json::Value) -> Self {
        self.app_data = app_data;
        self
    }
}
