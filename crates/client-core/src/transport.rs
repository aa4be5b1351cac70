//! Send and receive transports
//!
//! A [`Transport`] pairs one handler instance with one remote transport. All
//! handler operations go through the transport's [`AwaitQueue`], one at a
//! time and in call order. Consumer creation, pause, resume and close are
//! first collected by per-kind [`PendingTaskBatcher`]s so a burst of calls
//! in the same turn becomes a single queued renegotiation.
//!
//! Children (producers, consumers and their data counterparts) keep a weak
//! reference back to the transport. Closing the transport stops the queue,
//! closes the handler and marks every child closed without further handler
//! calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use dashmap::DashMap;
use ortc_infra_common::{AwaitQueue, PendingTaskBatcher, QueueError, QueueOptions, TaskSnapshot};
use ortc_rtp_core::{
    can_receive, generate_probator_rtp_parameters, validate_rtp_parameters,
    validate_sctp_parameters, validate_sctp_stream_parameters, ExtendedRtpCapabilities, MediaKind,
    RtpEncodingParameters, RtpParameters, SctpStreamParameters,
};
use ortc_rtp_core::constants::PROBATOR_MID;
use ortc_sdp_core::{DtlsParameters, IceParameters};
use parking_lot::RwLock;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, warn};

use crate::config::TransportOptions;
use crate::consumer::{Consumer, ConsumerInit, ConsumerOptions};
use crate::data_consumer::{DataConsumer, DataConsumerInit, DataConsumerOptions};
use crate::data_producer::{DataProducer, DataProducerOptions};
use crate::error::{Error, Result};
use crate::events::{ProduceDataRequest, ProduceRequest, TransportEvent, TransportListener};
use crate::handlers::{
    Handler, HandlerListener, HandlerReceiveDataChannelOptions, HandlerReceiveOptions,
    HandlerRunOptions, HandlerSendDataChannelOptions, HandlerSendDataChannelResult,
    HandlerSendOptions, HandlerSendResult,
};
use crate::producer::{Producer, ProducerInit, ProducerOptions};
use crate::types::{ConnectionState, IceServer, TransportDirection};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Connection state and event fan-out of one transport
///
/// Handed to the handler as its [`HandlerListener`].
pub(crate) struct ConnectionContext {
    transport_id: String,
    state: RwLock<ConnectionState>,
    events: broadcast::Sender<TransportEvent>,
    listener: Arc<dyn TransportListener>,
}

impl ConnectionContext {
    fn new(transport_id: String, listener: Arc<dyn TransportListener>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport_id,
            state: RwLock::new(ConnectionState::New),
            events,
            listener,
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn emit(&self, event: TransportEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Final state, set without asking the listener
    fn close(&self) {
        *self.state.write() = ConnectionState::Closed;
        self.emit(TransportEvent::ConnectionStateChanged {
            transport_id: self.transport_id.clone(),
            state: ConnectionState::Closed,
        });
        self.emit(TransportEvent::Closed {
            transport_id: self.transport_id.clone(),
        });
    }
}

#[async_trait]
impl HandlerListener for ConnectionContext {
    async fn on_connect(&self, dtls_parameters: DtlsParameters) -> Result<()> {
        debug!(transport_id = %self.transport_id, role = ?dtls_parameters.role, "connect requested");
        self.listener
            .on_connect(&self.transport_id, dtls_parameters)
            .await
    }

    async fn on_connection_state_change(&self, state: ConnectionState) {
        {
            let mut current = self.state.write();
            if *current == state || *current == ConnectionState::Closed {
                return;
            }
            *current = state;
        }
        debug!(transport_id = %self.transport_id, %state, "connection state changed");

        self.emit(TransportEvent::ConnectionStateChanged {
            transport_id: self.transport_id.clone(),
            state,
        });
        self.listener
            .on_connection_state_change(&self.transport_id, state)
            .await;
    }
}

/// A consume call waiting for its batch
struct PendingConsumer {
    options: ConsumerOptions,
    sender: oneshot::Sender<Result<Consumer>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsumerBatch {
    Pause,
    Resume,
    Close,
}

impl ConsumerBatch {
    fn batcher_name(&self) -> &'static str {
        match self {
            Self::Pause => "pause_consumers",
            Self::Resume => "resume_consumers",
            Self::Close => "close_consumers",
        }
    }

    fn task_name(&self) -> &'static str {
        match self {
            Self::Pause => "transport.pausePendingConsumers()",
            Self::Resume => "transport.resumePendingConsumers()",
            Self::Close => "transport.closePendingConsumers()",
        }
    }

    /// Whether `consumer` still wants this operation once its task runs
    fn applies_to(&self, consumer: &Consumer) -> bool {
        match self {
            Self::Pause => !consumer.closed() && consumer.paused(),
            Self::Resume => !consumer.closed() && !consumer.paused(),
            Self::Close => true,
        }
    }
}

pub(crate) struct TransportInner {
    id: String,
    direction: TransportDirection,
    handler: Arc<dyn Handler>,
    extended_rtp_capabilities: ExtendedRtpCapabilities,
    can_produce_by_kind: HashMap<MediaKind, bool>,
    max_sctp_message_size: Option<u32>,
    app_data: serde_json::Value,
    queue: AwaitQueue,
    closed: AtomicBool,
    connection: Arc<ConnectionContext>,
    listener: Arc<dyn TransportListener>,
    producers: DashMap<String, Producer>,
    consumers: DashMap<String, Consumer>,
    data_producers: DashMap<String, DataProducer>,
    data_consumers: DashMap<String, DataConsumer>,
    probator_consumer_created: AtomicBool,
    create_consumers: PendingTaskBatcher<String, PendingConsumer>,
    pause_consumers: PendingTaskBatcher<String, Consumer>,
    resume_consumers: PendingTaskBatcher<String, Consumer>,
    close_consumers: PendingTaskBatcher<String, Consumer>,
}

/// Everything a device hands a new transport
pub(crate) struct TransportParams {
    pub direction: TransportDirection,
    pub options: TransportOptions,
    pub handler: Arc<dyn Handler>,
    pub extended_rtp_capabilities: ExtendedRtpCapabilities,
    pub can_produce_by_kind: HashMap<MediaKind, bool>,
    pub queue_options: QueueOptions,
    pub listener: Arc<dyn TransportListener>,
}

fn create_batcher(weak: &Weak<TransportInner>) -> PendingTaskBatcher<String, PendingConsumer> {
    let weak = weak.clone();
    PendingTaskBatcher::new(
        "create_consumers",
        move |batch: Vec<(String, PendingConsumer)>| {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.create_pending_consumers(batch).await;
                }
            }
        },
    )
}

fn consumer_batcher(
    weak: &Weak<TransportInner>,
    kind: ConsumerBatch,
) -> PendingTaskBatcher<String, Consumer> {
    let weak = weak.clone();
    PendingTaskBatcher::new(kind.batcher_name(), move |batch: Vec<(String, Consumer)>| {
        let weak = weak.clone();
        async move {
            if let Some(inner) = weak.upgrade() {
                inner.process_consumer_batch(kind, batch).await;
            }
        }
    })
}

impl TransportInner {
    fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed() {
            return Err(Error::invalid_state("transport closed"));
        }
        Ok(())
    }

    fn ensure_direction(&self, direction: TransportDirection) -> Result<()> {
        if self.direction != direction {
            return Err(Error::unsupported(format!(
                "not a {} transport",
                direction.as_str()
            )));
        }
        Ok(())
    }

    async fn create_pending_consumers(self: Arc<Self>, batch: Vec<(String, PendingConsumer)>) {
        let inner = Arc::clone(&self);
        let result = self
            .queue
            .push("transport.createPendingConsumers()", move || async move {
                inner.receive_consumers(batch).await;
                Ok::<(), Error>(())
            })
            .await;

        // A rejected task drops its batch, which settles every waiting consume()
        if let Err(error) = result {
            debug!(transport_id = %self.id, %error, "consumer creation not run");
        }
    }

    async fn receive_consumers(self: &Arc<Self>, batch: Vec<(String, PendingConsumer)>) {
        let options: Vec<HandlerReceiveOptions> = batch
            .iter()
            .map(|(id, pending)| HandlerReceiveOptions {
                track_id: id.clone(),
                kind: pending.options.kind,
                rtp_parameters: pending.options.rtp_parameters.clone(),
                stream_id: pending.options.stream_id.clone(),
            })
            .collect();

        let results = match self.handler.receive(options).await {
            Ok(results) => results,
            Err(error) => {
                error!(transport_id = %self.id, %error, "receive() failed");
                for (_, pending) in batch {
                    let _ = pending.sender.send(Err(error.clone()));
                }
                return;
            }
        };

        let mut probator_source: Option<RtpParameters> = None;

        for ((id, pending), result) in batch.into_iter().zip(results) {
            let PendingConsumer { options, sender } = pending;
            if probator_source.is_none() && options.kind == MediaKind::Video {
                probator_source = Some(options.rtp_parameters.clone());
            }

            let consumer = Consumer::new(
                ConsumerInit {
                    id: id.clone(),
                    local_id: result.local_id,
                    producer_id: options.producer_id,
                    rtp_parameters: options.rtp_parameters,
                    track: result.track,
                    app_data: options.app_data,
                },
                Arc::downgrade(self),
            );
            self.consumers.insert(id.clone(), consumer.clone());
            self.connection
                .emit(TransportEvent::ConsumerCreated { consumer_id: id });

            if let Err(consumer) = sender.send(Ok(consumer)) {
                // Caller went away; keep the consumer registered
                debug!(transport_id = %self.id, ?consumer, "consume() caller dropped");
            }
        }

        if let Some(video_parameters) = probator_source {
            if !self.probator_consumer_created.load(Ordering::SeqCst) {
                self.create_probator(&video_parameters).await;
            }
        }
    }

    async fn create_probator(&self, video_parameters: &RtpParameters) {
        let rtp_parameters = match generate_probator_rtp_parameters(video_parameters) {
            Ok(parameters) => parameters,
            Err(error) => {
                error!(transport_id = %self.id, %error, "cannot generate probator parameters");
                return;
            }
        };

        let options = vec![HandlerReceiveOptions {
            track_id: PROBATOR_MID.to_string(),
            kind: MediaKind::Video,
            rtp_parameters,
            stream_id: None,
        }];

        match self.handler.receive(options).await {
            Ok(_) => {
                debug!(transport_id = %self.id, "probator consumer created");
                self.probator_consumer_created.store(true, Ordering::SeqCst);
            }
            Err(error) => {
                error!(transport_id = %self.id, %error, "probator consumer failed");
            }
        }
    }

    async fn process_consumer_batch(&self, kind: ConsumerBatch, batch: Vec<(String, Consumer)>) {
        let handler = Arc::clone(&self.handler);
        let transport_id = self.id.clone();

        let result = self
            .queue
            .push(kind.task_name(), move || async move {
                // A close or opposite call may land between batching and execution
                let local_ids: Vec<String> = batch
                    .iter()
                    .filter(|(_, consumer)| kind.applies_to(consumer))
                    .map(|(_, consumer)| consumer.local_id().to_string())
                    .collect();
                if local_ids.is_empty() {
                    debug!(%transport_id, batch = ?kind, "consumer batch superseded");
                    return Ok(());
                }

                match kind {
                    ConsumerBatch::Pause => handler.pause_receiving(&local_ids).await,
                    ConsumerBatch::Resume => handler.resume_receiving(&local_ids).await,
                    ConsumerBatch::Close => handler.stop_receiving(&local_ids).await,
                }
            })
            .await;

        match result {
            Ok(()) => {}
            Err(Error::Queue(error)) => {
                debug!(transport_id = %self.id, batch = ?kind, %error, "consumer batch not run");
            }
            Err(error) => {
                error!(transport_id = %self.id, batch = ?kind, %error, "consumer batch failed");
            }
        }
    }

    async fn signal_producer(
        &self,
        kind: MediaKind,
        rtp_parameters: &mut RtpParameters,
        app_data: &serde_json::Value,
    ) -> Result<String> {
        validate_rtp_parameters(rtp_parameters)?;
        self.listener
            .on_produce(
                &self.id,
                ProduceRequest {
                    kind,
                    rtp_parameters: rtp_parameters.clone(),
                    app_data: app_data.clone(),
                },
            )
            .await
    }

    pub(crate) async fn pause_producer(&self, local_id: String) -> Result<()> {
        self.ensure_open()?;
        let handler = Arc::clone(&self.handler);
        self.queue
            .push("producer.pause()", move || async move {
                handler.pause_sending(&local_id).await
            })
            .await
    }

    pub(crate) async fn resume_producer(&self, local_id: String) -> Result<()> {
        self.ensure_open()?;
        let handler = Arc::clone(&self.handler);
        self.queue
            .push("producer.resume()", move || async move {
                handler.resume_sending(&local_id).await
            })
            .await
    }

    pub(crate) async fn set_producer_max_spatial_layer(
        &self,
        local_id: String,
        spatial_layer: u8,
    ) -> Result<()> {
        self.ensure_open()?;
        let handler = Arc::clone(&self.handler);
        self.queue
            .push("producer.setMaxSpatialLayer()", move || async move {
                handler.set_max_spatial_layer(&local_id, spatial_layer).await
            })
            .await
    }

    pub(crate) fn remove_producer(&self, producer: &Producer) {
        self.producers.remove(producer.id());
        self.connection.emit(TransportEvent::ProducerClosed {
            producer_id: producer.id().to_string(),
        });
        if self.closed() {
            return;
        }

        let handler = Arc::clone(&self.handler);
        let local_id = producer.local_id().to_string();
        let stopped = self
            .queue
            .push("producer.close()", move || async move {
                handler.stop_sending(&local_id).await
            });

        let transport_id = self.id.clone();
        tokio::spawn(async move {
            match stopped.await {
                Ok(()) | Err(Error::Queue(_)) => {}
                Err(error) => {
                    error!(%transport_id, %error, "stop_sending() failed");
                }
            }
        });
    }

    pub(crate) fn pause_consumer(&self, consumer: &Consumer) {
        let id = consumer.id().to_string();
        if self.resume_consumers.remove(&id).is_some() {
            return;
        }
        self.pause_consumers.enqueue(id, consumer.clone());
    }

    pub(crate) fn resume_consumer(&self, consumer: &Consumer) {
        let id = consumer.id().to_string();
        if self.pause_consumers.remove(&id).is_some() {
            return;
        }
        self.resume_consumers.enqueue(id, consumer.clone());
    }

    pub(crate) fn close_consumer(&self, consumer: &Consumer) {
        let id = consumer.id().to_string();
        self.consumers.remove(&id);
        self.pause_consumers.remove(&id);
        self.resume_consumers.remove(&id);
        self.connection.emit(TransportEvent::ConsumerClosed {
            consumer_id: id.clone(),
        });
        if self.closed() {
            return;
        }
        self.close_consumers.enqueue(id, consumer.clone());
    }

    pub(crate) fn remove_data_producer(&self, id: &str) {
        self.data_producers.remove(id);
    }

    pub(crate) fn remove_data_consumer(&self, id: &str) {
        self.data_consumers.remove(id);
    }
}

/// One direction of media between the local engine and a remote transport
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("id", &self.inner.id)
            .field("direction", &self.inner.direction)
            .field("connection_state", &self.connection_state())
            .field("closed", &self.closed())
            .finish()
    }
}

impl Transport {
    pub(crate) async fn new(params: TransportParams) -> Result<Self> {
        let TransportParams {
            direction,
            options,
            handler,
            extended_rtp_capabilities,
            can_produce_by_kind,
            queue_options,
            listener,
        } = params;
        let TransportOptions {
            id,
            ice_parameters,
            ice_candidates,
            dtls_parameters,
            sctp_parameters,
            ice_servers,
            ice_transport_policy,
            app_data,
        } = options;

        debug!(transport_id = %id, %direction, "creating transport");

        if let Some(sctp_parameters) = &sctp_parameters {
            validate_sctp_parameters(sctp_parameters)?;
        }

        let connection = Arc::new(ConnectionContext::new(id.clone(), Arc::clone(&listener)));

        let run = handler
            .run(HandlerRunOptions {
                direction,
                ice_parameters,
                ice_candidates,
                dtls_parameters,
                sctp_parameters,
                ice_servers,
                ice_transport_policy,
                extended_rtp_capabilities: extended_rtp_capabilities.clone(),
                listener: Arc::clone(&connection) as Arc<dyn HandlerListener>,
            })
            .await;
        if let Err(error) = run {
            handler.close();
            return Err(error);
        }

        let queue = AwaitQueue::with_options(QueueOptions {
            name: format!("{}:{}", queue_options.name, id),
            ..queue_options
        });

        let inner = Arc::new_cyclic(|weak: &Weak<TransportInner>| TransportInner {
            id,
            direction,
            handler,
            extended_rtp_capabilities,
            can_produce_by_kind,
            max_sctp_message_size: sctp_parameters.map(|p| p.max_message_size),
            app_data,
            queue,
            closed: AtomicBool::new(false),
            connection,
            listener,
            producers: DashMap::new(),
            consumers: DashMap::new(),
            data_producers: DashMap::new(),
            data_consumers: DashMap::new(),
            probator_consumer_created: AtomicBool::new(false),
            create_consumers: create_batcher(weak),
            pause_consumers: consumer_batcher(weak, ConsumerBatch::Pause),
            resume_consumers: consumer_batcher(weak, ConsumerBatch::Resume),
            close_consumers: consumer_batcher(weak, ConsumerBatch::Close),
        });

        Ok(Self { inner })
    }

    /// Remote transport id
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn direction(&self) -> TransportDirection {
        self.inner.direction
    }

    pub fn closed(&self) -> bool {
        self.inner.closed()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    pub fn app_data(&self) -> &serde_json::Value {
        &self.inner.app_data
    }

    /// Name of the handler driving this transport
    pub fn handler_name(&self) -> crate::handlers::HandlerName {
        self.inner.handler.name()
    }

    /// Negotiated capabilities this transport sends and receives with
    pub fn extended_rtp_capabilities(&self) -> &ExtendedRtpCapabilities {
        &self.inner.extended_rtp_capabilities
    }

    /// Subscribe to informational events
    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.inner.connection.events.subscribe()
    }

    /// Handler operations currently queued, the running one first
    pub fn pending_operations(&self) -> Vec<TaskSnapshot> {
        self.inner.queue.dump()
    }

    pub fn producer(&self, id: &str) -> Option<Producer> {
        self.inner.producers.get(id).map(|entry| entry.value().clone())
    }

    pub fn consumer(&self, id: &str) -> Option<Consumer> {
        self.inner.consumers.get(id).map(|entry| entry.value().clone())
    }

    pub fn data_producer(&self, id: &str) -> Option<DataProducer> {
        self.inner.data_producers.get(id).map(|entry| entry.value().clone())
    }

    pub fn data_consumer(&self, id: &str) -> Option<DataConsumer> {
        self.inner.data_consumers.get(id).map(|entry| entry.value().clone())
    }

    pub fn producers(&self) -> Vec<Producer> {
        self.inner.producers.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn consumers(&self) -> Vec<Consumer> {
        self.inner.consumers.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Close the transport and every producer and consumer on it
    ///
    /// Queued operations are rejected with [`QueueError::Stopped`].
    pub fn close(&self) {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(transport_id = %inner.id, "close()");

        inner.queue.stop();
        for (_, pending) in inner.create_consumers.close() {
            let _ = pending.sender.send(Err(Error::Queue(QueueError::Stopped)));
        }
        inner.pause_consumers.close();
        inner.resume_consumers.close();
        inner.close_consumers.close();

        inner.handler.close();
        inner.connection.close();

        let producers: Vec<Producer> = self.producers();
        inner.producers.clear();
        for producer in producers {
            producer.transport_closed();
        }

        let consumers: Vec<Consumer> = self.consumers();
        inner.consumers.clear();
        for consumer in consumers {
            consumer.transport_closed();
        }

        let data_producers: Vec<DataProducer> = inner
            .data_producers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        inner.data_producers.clear();
        for data_producer in data_producers {
            data_producer.transport_closed();
        }

        let data_consumers: Vec<DataConsumer> = inner
            .data_consumers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        inner.data_consumers.clear();
        for data_consumer in data_consumers {
            data_consumer.transport_closed();
        }
    }

    /// Restart ICE with new remote parameters
    pub async fn restart_ice(&self, ice_parameters: IceParameters) -> Result<()> {
        self.inner.ensure_open()?;
        debug!(transport_id = %self.inner.id, "restart_ice()");

        let handler = Arc::clone(&self.inner.handler);
        self.inner
            .queue
            .push("transport.restartIce()", move || async move {
                handler.restart_ice(ice_parameters).await
            })
            .await
    }

    /// Replace the ICE servers
    pub async fn update_ice_servers(&self, ice_servers: Vec<IceServer>) -> Result<()> {
        self.inner.ensure_open()?;
        debug!(transport_id = %self.inner.id, "update_ice_servers()");

        let handler = Arc::clone(&self.inner.handler);
        self.inner
            .queue
            .push("transport.updateIceServers()", move || async move {
                handler.update_ice_servers(ice_servers).await
            })
            .await
    }

    /// Start sending a track
    pub async fn produce(&self, options: ProducerOptions) -> Result<Producer> {
        let inner = &self.inner;
        inner.ensure_open()?;
        inner.ensure_direction(TransportDirection::Send)?;

        let ProducerOptions {
            track,
            encodings,
            codec_options,
            codec,
            app_data,
        } = options;
        let kind = track.kind;

        if !inner.can_produce_by_kind.get(&kind).copied().unwrap_or(false) {
            return Err(Error::unsupported(format!("cannot produce {}", kind.as_str())));
        }
        debug!(transport_id = %inner.id, track_id = %track.id, "produce()");

        let encodings: Vec<RtpEncodingParameters> = encodings
            .into_iter()
            .map(|encoding| RtpEncodingParameters {
                active: Some(encoding.is_active()),
                ..encoding
            })
            .collect();

        let task_inner = Arc::clone(inner);
        inner
            .queue
            .push("transport.produce()", move || async move {
                let HandlerSendResult {
                    local_id,
                    mut rtp_parameters,
                } = task_inner
                    .handler
                    .send(HandlerSendOptions {
                        track: track.clone(),
                        encodings,
                        codec_options,
                        codec,
                    })
                    .await?;

                let id = match task_inner
                    .signal_producer(kind, &mut rtp_parameters, &app_data)
                    .await
                {
                    Ok(id) => id,
                    Err(error) => {
                        if let Err(stop_error) = task_inner.handler.stop_sending(&local_id).await {
                            warn!(%local_id, error = %stop_error, "stop_sending() after failed produce");
                        }
                        return Err(error);
                    }
                };

                let producer = Producer::new(
                    ProducerInit {
                        id: id.clone(),
                        local_id,
                        rtp_parameters,
                        track,
                        app_data,
                    },
                    Arc::downgrade(&task_inner),
                );
                task_inner.producers.insert(id.clone(), producer.clone());
                task_inner
                    .connection
                    .emit(TransportEvent::ProducerCreated { producer_id: id });
                Ok(producer)
            })
            .await
    }

    /// Start receiving a remote producer
    ///
    /// Calls made in the same turn are created together.
    pub async fn consume(&self, options: ConsumerOptions) -> Result<Consumer> {
        let inner = &self.inner;
        inner.ensure_open()?;
        inner.ensure_direction(TransportDirection::Recv)?;

        let mut options = options;
        validate_rtp_parameters(&mut options.rtp_parameters)?;
        if !can_receive(&options.rtp_parameters, &inner.extended_rtp_capabilities)? {
            return Err(Error::unsupported("cannot consume this producer"));
        }
        if inner.consumers.contains_key(&options.id) || inner.create_consumers.contains(&options.id)
        {
            return Err(Error::invalid_state(format!(
                "consumer {} already exists",
                options.id
            )));
        }
        debug!(transport_id = %inner.id, consumer_id = %options.id, "consume()");

        let (sender, receiver) = oneshot::channel();
        let id = options.id.clone();
        if !inner
            .create_consumers
            .enqueue(id, PendingConsumer { options, sender })
        {
            return Err(Error::Queue(QueueError::Stopped));
        }

        receiver
            .await
            .unwrap_or(Err(Error::Queue(QueueError::Stopped)))
    }

    /// Open a data channel for sending
    pub async fn produce_data(&self, options: DataProducerOptions) -> Result<DataProducer> {
        let inner = &self.inner;
        inner.ensure_open()?;
        inner.ensure_direction(TransportDirection::Send)?;
        if inner.max_sctp_message_size.is_none() {
            return Err(Error::unsupported("SCTP not enabled by remote transport"));
        }

        let DataProducerOptions {
            ordered,
            max_packet_life_time,
            max_retransmits,
            label,
            protocol,
            app_data,
        } = options;
        let ordered = if max_packet_life_time.is_some() || max_retransmits.is_some() {
            false
        } else {
            ordered.unwrap_or(true)
        };

        let mut requested = SctpStreamParameters {
            stream_id: 0,
            ordered: Some(ordered),
            max_packet_life_time,
            max_retransmits,
            label: Some(label.clone()),
            protocol: Some(protocol.clone()),
        };
        validate_sctp_stream_parameters(&mut requested)?;
        debug!(transport_id = %inner.id, %label, "produce_data()");

        let task_inner = Arc::clone(inner);
        inner
            .queue
            .push("transport.produceData()", move || async move {
                let HandlerSendDataChannelResult {
                    data_channel,
                    mut sctp_stream_parameters,
                } = task_inner
                    .handler
                    .send_data_channel(HandlerSendDataChannelOptions {
                        ordered,
                        max_packet_life_time,
                        max_retransmits,
                        label: label.clone(),
                        protocol: protocol.clone(),
                    })
                    .await?;

                let signaled = match validate_sctp_stream_parameters(&mut sctp_stream_parameters) {
                    Ok(()) => {
                        task_inner
                            .listener
                            .on_produce_data(
                                &task_inner.id,
                                ProduceDataRequest {
                                    sctp_stream_parameters: sctp_stream_parameters.clone(),
                                    label,
                                    protocol,
                                    app_data: app_data.clone(),
                                },
                            )
                            .await
                    }
                    Err(error) => Err(error.into()),
                };
                let id = match signaled {
                    Ok(id) => id,
                    Err(error) => {
                        data_channel.close();
                        return Err(error);
                    }
                };

                let data_producer = DataProducer::new(
                    id.clone(),
                    data_channel,
                    sctp_stream_parameters,
                    app_data,
                    Arc::downgrade(&task_inner),
                );
                task_inner
                    .data_producers
                    .insert(id.clone(), data_producer.clone());
                task_inner
                    .connection
                    .emit(TransportEvent::DataProducerCreated {
                        data_producer_id: id,
                    });
                Ok(data_producer)
            })
            .await
    }

    /// Open a data channel for a remote data producer
    pub async fn consume_data(&self, options: DataConsumerOptions) -> Result<DataConsumer> {
        let inner = &self.inner;
        inner.ensure_open()?;
        inner.ensure_direction(TransportDirection::Recv)?;
        if inner.max_sctp_message_size.is_none() {
            return Err(Error::unsupported("SCTP not enabled by remote transport"));
        }

        let DataConsumerOptions {
            id,
            data_producer_id,
            mut sctp_stream_parameters,
            label,
            protocol,
            app_data,
        } = options;
        validate_sctp_stream_parameters(&mut sctp_stream_parameters)?;
        debug!(transport_id = %inner.id, data_consumer_id = %id, "consume_data()");

        let task_inner = Arc::clone(inner);
        inner
            .queue
            .push("transport.consumeData()", move || async move {
                let data_channel = task_inner
                    .handler
                    .receive_data_channel(HandlerReceiveDataChannelOptions {
                        sctp_stream_parameters: sctp_stream_parameters.clone(),
                        label,
                        protocol,
                    })
                    .await?;

                let data_consumer = DataConsumer::new(
                    DataConsumerInit {
                        id: id.clone(),
                        data_producer_id,
                        data_channel,
                        sctp_stream_parameters,
                        app_data,
                    },
                    Arc::downgrade(&task_inner),
                );
                task_inner
                    .data_consumers
                    .insert(id.clone(), data_consumer.clone());
                task_inner
                    .connection
                    .emit(TransportEvent::DataConsumerCreated {
                        data_consumer_id: id,
                    });
                Ok::<_, Error>(data_consumer)
            })
            .await
    }
}
