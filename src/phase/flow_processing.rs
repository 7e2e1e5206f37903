//! # Flow Processing Phase
//!
//! The asynchronous phase that routes one message through the flow.
//!
//! ## Overview
//!
//! For every inbound message the phase fires the received notification,
//! applies the source policies that match the message source, executes the
//! flow through the [`ExecutionTemplate`] under the context's transaction
//! and exception-handler semantics, and delivers the success or failure
//! response back to the source. Every path ends in exactly one
//! [`PhaseResultNotifier`] signal.
//!
//! ## Concurrency placement
//!
//! If the source supports asynchronous completion, the whole
//! received-to-responding sequence is submitted to the source's worker pool
//! as one unit and the caller returns immediately; otherwise the unit runs
//! on the calling task. Nothing escapes the unit of work: scheduling
//! failures and processing failures alike are funnelled through the
//! notifier.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

use crate::event::Event;
use crate::execution::ExecutionTemplate;
use crate::messaging::MessagingError;
use crate::notification::{NotificationKind, NotificationPublisher};
use crate::phase::context::{MessageProcessContext, MessageSource};
use crate::phase::notifier::{PhaseResultNotifier, ResponseCompletion};
use crate::phase::{MessagePhase, PhaseRank, PhaseState};
use crate::policy::{ComponentIdentifier, PolicyRegistry, SourcePolicyDecision};

/// Supplies the inbound event and routes it through the target flow.
#[async_trait]
pub trait FlowProcessingTemplate: Send + Sync {
    fn inbound_event(&self) -> Event;

    async fn route_event(&self, event: Event) -> Result<Event, MessagingError>;
}

/// The phase state machine driving one message through the flow.
pub struct FlowProcessingPhase {
    policies: Arc<PolicyRegistry>,
    notifications: NotificationPublisher,
}

impl MessagePhase for FlowProcessingPhase {
    fn name(&self) -> &str {
        "flow-processing"
    }

    fn rank(&self) -> PhaseRank {
        PhaseRank::FlowProcessing
    }
}

impl FlowProcessingPhase {
    pub fn new(policies: Arc<PolicyRegistry>, notifications: NotificationPublisher) -> Self {
        Self {
            policies,
            notifications,
        }
    }

    /// Process one message, signalling `notifier` exactly once.
    pub async fn run_phase(
        &self,
        template: Arc<dyn FlowProcessingTemplate>,
        context: MessageProcessContext,
        notifier: PhaseResultNotifier,
    ) {
        let source = Arc::clone(context.source());
        if source.supports_asynchronous_processing() {
            // Reserve before the work (and the notifier inside it) is built,
            // so a scheduling failure can still reach the notifier.
            match source.work_scheduler().reserve() {
                Ok(permit) => {
                    let work = Self::flow_execution_work(
                        Arc::clone(&self.policies),
                        self.notifications.clone(),
                        template,
                        context,
                        notifier,
                    );
                    permit.submit(Box::pin(work));
                }
                Err(scheduling_error) => {
                    error!(
                        flow = context.flow_name(),
                        error = %scheduling_error,
                        "Failed to schedule flow execution work"
                    );
                    notifier.failure(scheduling_error.into());
                }
            }
        } else {
            Self::flow_execution_work(
                Arc::clone(&self.policies),
                self.notifications.clone(),
                template,
                context,
                notifier,
            )
            .await;
        }
    }

    async fn flow_execution_work(
        policies: Arc<PolicyRegistry>,
        notifications: NotificationPublisher,
        template: Arc<dyn FlowProcessingTemplate>,
        context: MessageProcessContext,
        notifier: PhaseResultNotifier,
    ) {
        let source = Arc::clone(context.source());
        let source_id = source.component_identifier();
        let flow_name = context.flow_name().to_string();

        let inbound = template.inbound_event();
        debug!(
            flow = %flow_name,
            state = %PhaseState::Received,
            correlation_id = inbound.correlation_id(),
            "Flow processing phase transition"
        );
        notifications.notify(NotificationKind::MessageReceived, &inbound, &source_id);

        let execution = ExecutionTemplate::new(
            context.transaction_config().clone(),
            Arc::clone(context.exception_handler()),
        );

        let routed = {
            let template = Arc::clone(&template);
            let policies = Arc::clone(&policies);
            let source_id = source_id.clone();
            let flow_name = flow_name.clone();
            execution
                .execute(inbound, move |event| async move {
                    let decision = apply_source_policies(&policies, &source_id, event)?;
                    debug!(
                        flow = %flow_name,
                        state = %PhaseState::PolicyApplied,
                        "Flow processing phase transition"
                    );
                    match decision {
                        SourcePolicyDecision::ShortCircuit(event) => Ok(event),
                        SourcePolicyDecision::Proceed(event) => {
                            let response = template.route_event(event).await?;
                            debug!(
                                flow = %flow_name,
                                state = %PhaseState::Routed,
                                "Flow processing phase transition"
                            );
                            Ok(response)
                        }
                    }
                })
                .await
        };

        debug!(
            flow = %flow_name,
            state = %PhaseState::Responding,
            success = routed.is_ok(),
            "Flow processing phase transition"
        );

        match routed {
            Ok(response) => {
                notifications.notify(NotificationKind::MessageResponse, &response, &source_id);
                let completion = ResponseCompletion::for_response(
                    notifier,
                    Arc::clone(context.exception_handler()),
                );
                source.send_response_to_client(response, completion).await;
            }
            Err(failure) => {
                notifications.notify(
                    NotificationKind::MessageErrorResponse,
                    failure.event(),
                    &source_id,
                );
                let completion = ResponseCompletion::for_failure_response(notifier);
                source.send_failure_response_to_client(failure, completion).await;
            }
        }
    }
}

/// Apply every registered policy matching the source to the event.
///
/// Works against a snapshot of the registry; instances attach to the event
/// in registration order. A short-circuit decision stops the pass and skips
/// routing.
fn apply_source_policies(
    policies: &PolicyRegistry,
    source_id: &ComponentIdentifier,
    event: Event,
) -> Result<SourcePolicyDecision, MessagingError> {
    let mut current = event;
    for policy in policies.snapshot() {
        if !policy.applies_to_source(source_id) {
            continue;
        }
        let instance = policy.create_source_policy_instance(source_id);
        // The pre-hook sees a fresh envelope around the shared message.
        let policy_event = Event::builder(current.context_arc())
            .message_arc(current.message_arc())
            .build();
        match instance.process_source_pre(policy_event)? {
            SourcePolicyDecision::Proceed(result) => {
                instance.attach_event(result);
                current = current
                    .to_builder()
                    .attach_policy_instance(instance)
                    .build();
            }
            SourcePolicyDecision::ShortCircuit(result) => {
                debug!(
                    policy = instance.policy_name(),
                    source = %source_id,
                    "Source policy short-circuited the flow"
                );
                instance.attach_event(result.clone());
                return Ok(SourcePolicyDecision::ShortCircuit(result));
            }
        }
    }
    Ok(SourcePolicyDecision::Proceed(current))
}
