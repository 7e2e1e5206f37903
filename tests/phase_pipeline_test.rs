//! End-to-end scenarios for the flow processing phase: asynchronous
//! dispatch, response delivery failures, scheduling failures, and policy
//! short-circuits.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flowgate_core::event::{Event, EventContext};
use flowgate_core::execution::TransactionConfig;
use flowgate_core::messaging::{ExceptionHandler, MessagingError};
use flowgate_core::notification::{NotificationKind, NotificationPublisher};
use flowgate_core::phase::{
    FlowProcessingPhase, FlowProcessingTemplate, MessageProcessContext, MessageSource, PhaseResult,
    PhaseResultNotifier, PhaseWork, ResponseCompletion, ScheduledWorkPermit, SchedulingError,
    WorkScheduler,
};
use flowgate_core::policy::{
    ComponentIdentifier, PolicyInstance, PolicyRegistry, SourcePolicy, SourcePolicyDecision,
};
use flowgate_core::CoreError;

/// Worker pool that queues submitted units and executes them only when the
/// test drains it.
#[derive(Default, Clone)]
struct InlineScheduler {
    queue: Arc<Mutex<VecDeque<PhaseWork>>>,
}

impl InlineScheduler {
    fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    async fn drain(&self) {
        loop {
            let work = self.queue.lock().pop_front();
            match work {
                Some(work) => work.await,
                None => break,
            }
        }
    }
}

struct InlinePermit {
    queue: Arc<Mutex<VecDeque<PhaseWork>>>,
}

impl ScheduledWorkPermit for InlinePermit {
    fn submit(self: Box<Self>, work: PhaseWork) {
        self.queue.lock().push_back(work);
    }
}

impl WorkScheduler for InlineScheduler {
    fn reserve(&self) -> Result<Box<dyn ScheduledWorkPermit>, SchedulingError> {
        Ok(Box::new(InlinePermit {
            queue: Arc::clone(&self.queue),
        }))
    }
}

/// Worker pool that rejects every reservation.
struct RejectingScheduler;

impl WorkScheduler for RejectingScheduler {
    fn reserve(&self) -> Result<Box<dyn ScheduledWorkPermit>, SchedulingError> {
        Err(SchedulingError::Rejected {
            pool: "rejecting".to_string(),
            reason: "pool is shutting down".to_string(),
        })
    }
}

/// What the stub source does when asked to deliver a response.
#[derive(Clone, Copy, PartialEq)]
enum DeliveryBehavior {
    Deliver,
    FailDelivery,
}

struct StubSource {
    asynchronous: bool,
    scheduler: InlineScheduler,
    rejecting: bool,
    delivery: DeliveryBehavior,
    responses: Mutex<Vec<Event>>,
    failures: Mutex<Vec<String>>,
}

impl StubSource {
    fn asynchronous(scheduler: InlineScheduler) -> Arc<Self> {
        Arc::new(Self {
            asynchronous: true,
            scheduler,
            rejecting: false,
            delivery: DeliveryBehavior::Deliver,
            responses: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        })
    }

    fn with_rejecting_pool() -> Arc<Self> {
        Arc::new(Self {
            asynchronous: true,
            scheduler: InlineScheduler::default(),
            rejecting: true,
            delivery: DeliveryBehavior::Deliver,
            responses: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        })
    }

    fn synchronous(delivery: DeliveryBehavior) -> Arc<Self> {
        Arc::new(Self {
            asynchronous: false,
            scheduler: InlineScheduler::default(),
            rejecting: false,
            delivery,
            responses: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MessageSource for StubSource {
    fn component_identifier(&self) -> ComponentIdentifier {
        ComponentIdentifier::new("httpn", "listener")
    }

    fn supports_asynchronous_processing(&self) -> bool {
        self.asynchronous
    }

    fn work_scheduler(&self) -> Arc<dyn WorkScheduler> {
        if self.rejecting {
            Arc::new(RejectingScheduler)
        } else {
            Arc::new(self.scheduler.clone())
        }
    }

    async fn send_response_to_client(&self, event: Event, completion: ResponseCompletion) {
        match self.delivery {
            DeliveryBehavior::Deliver => {
                self.responses.lock().push(event);
                completion.sent();
            }
            DeliveryBehavior::FailDelivery => {
                completion
                    .sent_with_failure(MessagingError::new("connection reset", event))
                    .await;
            }
        }
    }

    async fn send_failure_response_to_client(
        &self,
        error: MessagingError,
        completion: ResponseCompletion,
    ) {
        match self.delivery {
            DeliveryBehavior::Deliver => {
                self.failures.lock().push(error.message().to_string());
                completion.sent();
            }
            DeliveryBehavior::FailDelivery => {
                completion.sent_with_failure(error).await;
            }
        }
    }
}

struct CountingHandler {
    invocations: AtomicUsize,
    recover: bool,
}

impl CountingHandler {
    fn propagating() -> Arc<Self> {
        Arc::new(Self {
            invocations: AtomicUsize::new(0),
            recover: false,
        })
    }

    fn recovering() -> Arc<Self> {
        Arc::new(Self {
            invocations: AtomicUsize::new(0),
            recover: true,
        })
    }
}

#[async_trait]
impl ExceptionHandler for CountingHandler {
    async fn handle_exception(
        &self,
        error: MessagingError,
        event: Event,
    ) -> Result<Event, MessagingError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.recover {
            Ok(event.to_builder().payload(json!("recovered")).build())
        } else {
            Err(error)
        }
    }
}

struct CountingTemplate {
    inbound: Event,
    routed: AtomicUsize,
    fail_routing: bool,
}

impl CountingTemplate {
    fn ok(inbound: Event) -> Arc<Self> {
        Arc::new(Self {
            inbound,
            routed: AtomicUsize::new(0),
            fail_routing: false,
        })
    }

    fn failing(inbound: Event) -> Arc<Self> {
        Arc::new(Self {
            inbound,
            routed: AtomicUsize::new(0),
            fail_routing: true,
        })
    }
}

#[async_trait]
impl FlowProcessingTemplate for CountingTemplate {
    fn inbound_event(&self) -> Event {
        self.inbound.clone()
    }

    async fn route_event(&self, event: Event) -> Result<Event, MessagingError> {
        self.routed.fetch_add(1, Ordering::SeqCst);
        if self.fail_routing {
            Err(MessagingError::new("route failed", event))
        } else {
            Ok(event.to_builder().payload(json!("routed")).build())
        }
    }
}

struct DenyPolicy;

impl SourcePolicy for DenyPolicy {
    fn name(&self) -> &str {
        "deny-policy"
    }

    fn applies_to_source(&self, identifier: &ComponentIdentifier) -> bool {
        identifier.namespace() == "httpn"
    }

    fn create_source_policy_instance(
        &self,
        identifier: &ComponentIdentifier,
    ) -> Arc<PolicyInstance> {
        Arc::new(PolicyInstance::new("deny-policy", identifier.clone(), |event| {
            let denied = event.to_builder().payload(json!("denied")).build();
            Ok(SourcePolicyDecision::ShortCircuit(denied))
        }))
    }
}

fn inbound() -> Event {
    Event::builder(Arc::new(EventContext::new("orders-flow")))
        .payload(json!("inbound"))
        .build()
}

fn phase_with(policies: Arc<PolicyRegistry>) -> (FlowProcessingPhase, NotificationPublisher) {
    let notifications = NotificationPublisher::new(16);
    (
        FlowProcessingPhase::new(policies, notifications.clone()),
        notifications,
    )
}

fn context(source: Arc<StubSource>, handler: Arc<CountingHandler>) -> MessageProcessContext {
    MessageProcessContext::new(source, "orders-flow", TransactionConfig::none(), handler)
}

#[tokio::test]
async fn async_source_runs_the_full_sequence_when_the_pool_is_polled() {
    let scheduler = InlineScheduler::default();
    let source = StubSource::asynchronous(scheduler.clone());
    let handler = CountingHandler::propagating();
    let (phase, notifications) = phase_with(Arc::new(PolicyRegistry::new()));
    let mut subscriber = notifications.subscribe();
    let (notifier, handle) = PhaseResultNotifier::channel();

    phase
        .run_phase(
            CountingTemplate::ok(inbound()),
            context(Arc::clone(&source), handler),
            notifier,
        )
        .await;

    // The unit was handed off, not executed: nothing has fired yet.
    assert_eq!(scheduler.pending(), 1);
    assert!(subscriber.try_recv().is_err());
    assert!(source.responses.lock().is_empty());

    scheduler.drain().await;

    assert!(handle.wait().await.is_success());
    assert_eq!(source.responses.lock().len(), 1);
    let first = subscriber.try_recv().unwrap();
    let second = subscriber.try_recv().unwrap();
    assert_eq!(first.kind, NotificationKind::MessageReceived);
    assert_eq!(second.kind, NotificationKind::MessageResponse);
    assert!(subscriber.try_recv().is_err());
}

#[tokio::test]
async fn scheduling_failure_reports_phase_failure_without_running_anything() {
    let source = StubSource::with_rejecting_pool();
    let handler = CountingHandler::propagating();
    let (phase, notifications) = phase_with(Arc::new(PolicyRegistry::new()));
    let mut subscriber = notifications.subscribe();
    let (notifier, handle) = PhaseResultNotifier::channel();
    let template = CountingTemplate::ok(inbound());

    phase
        .run_phase(
            Arc::clone(&template) as Arc<dyn FlowProcessingTemplate>,
            context(Arc::clone(&source), Arc::clone(&handler)),
            notifier,
        )
        .await;

    match handle.wait().await {
        PhaseResult::Failure(CoreError::SchedulingError(msg)) => {
            assert!(msg.contains("shutting down"));
        }
        other => panic!("expected scheduling failure, got {other:?}"),
    }
    // The handler never ran and no notification fired: the unit of work was
    // never entered.
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 0);
    assert_eq!(template.routed.load(Ordering::SeqCst), 0);
    assert!(subscriber.try_recv().is_err());
}

#[tokio::test]
async fn send_failure_on_success_path_recovers_through_the_handler() {
    let source = StubSource::synchronous(DeliveryBehavior::FailDelivery);
    let handler = CountingHandler::recovering();
    let (phase, _notifications) = phase_with(Arc::new(PolicyRegistry::new()));
    let (notifier, handle) = PhaseResultNotifier::channel();

    phase
        .run_phase(
            CountingTemplate::ok(inbound()),
            context(Arc::clone(&source), Arc::clone(&handler)),
            notifier,
        )
        .await;

    assert!(handle.wait().await.is_success());
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn send_failure_on_success_path_fails_the_phase_when_the_handler_propagates() {
    let source = StubSource::synchronous(DeliveryBehavior::FailDelivery);
    let handler = CountingHandler::propagating();
    let (phase, _notifications) = phase_with(Arc::new(PolicyRegistry::new()));
    let (notifier, handle) = PhaseResultNotifier::channel();

    phase
        .run_phase(
            CountingTemplate::ok(inbound()),
            context(Arc::clone(&source), Arc::clone(&handler)),
            notifier,
        )
        .await;

    match handle.wait().await {
        PhaseResult::Failure(CoreError::MessagingError(msg)) => {
            assert_eq!(msg, "connection reset");
        }
        other => panic!("expected messaging failure, got {other:?}"),
    }
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_delivery_of_a_failure_response_fails_the_phase() {
    let source = StubSource::synchronous(DeliveryBehavior::FailDelivery);
    let handler = CountingHandler::propagating();
    let (phase, notifications) = phase_with(Arc::new(PolicyRegistry::new()));
    let mut subscriber = notifications.subscribe();
    let (notifier, handle) = PhaseResultNotifier::channel();

    phase
        .run_phase(
            CountingTemplate::failing(inbound()),
            context(Arc::clone(&source), Arc::clone(&handler)),
            notifier,
        )
        .await;

    match handle.wait().await {
        PhaseResult::Failure(CoreError::MessagingError(msg)) => {
            assert_eq!(msg, "route failed");
        }
        other => panic!("expected messaging failure, got {other:?}"),
    }
    // Routing failure ran through the handler once; the delivery failure of
    // the failure response does not consult it again.
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);

    let first = subscriber.try_recv().unwrap();
    let second = subscriber.try_recv().unwrap();
    assert_eq!(first.kind, NotificationKind::MessageReceived);
    assert_eq!(second.kind, NotificationKind::MessageErrorResponse);
}

#[tokio::test]
async fn short_circuiting_policy_skips_routing() {
    let policies = Arc::new(PolicyRegistry::new());
    policies.register(Arc::new(DenyPolicy));
    let source = StubSource::synchronous(DeliveryBehavior::Deliver);
    let handler = CountingHandler::propagating();
    let (phase, notifications) = phase_with(policies);
    let mut subscriber = notifications.subscribe();
    let (notifier, handle) = PhaseResultNotifier::channel();
    let template = CountingTemplate::ok(inbound());

    phase
        .run_phase(
            Arc::clone(&template) as Arc<dyn FlowProcessingTemplate>,
            context(Arc::clone(&source), handler),
            notifier,
        )
        .await;

    assert!(handle.wait().await.is_success());
    assert_eq!(template.routed.load(Ordering::SeqCst), 0);

    let responses = source.responses.lock();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].payload(), &json!("denied"));
    assert!(source.failures.lock().is_empty());

    let first = subscriber.try_recv().unwrap();
    let second = subscriber.try_recv().unwrap();
    assert_eq!(first.kind, NotificationKind::MessageReceived);
    assert_eq!(second.kind, NotificationKind::MessageResponse);
}
