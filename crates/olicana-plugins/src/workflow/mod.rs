//! Multi-step configuration dialogs.
//!
//! A [`Workflow`] describes a wizard: how many steps it has, which form each
//! step shows, and what to do with the host's answer. [`run_workflow`] owns
//! the transport for the duration of the dialog and performs the I/O, while
//! every state transition is decided by the pure [`apply`] function.
//!
//! While a step's form is open the host may answer with:
//!
//! - `result`: the submitted form, passed to [`Workflow::submit`];
//! - `error`: cancellation, always terminal;
//! - `form_change`: a live edit, answered with a [`FormUpdate`] or `{}`.

use std::fmt;
use std::io::{BufRead, Write};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{PluginError, TransportError};
use crate::protocol::{CANCELLED, FormSpec, FormUpdate, INITIALIZED, Message};
use crate::transport::{LogSink, Transport};

/// Tracing target for workflow operations.
const WORKFLOW_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::workflow");

/// One-based index of a workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Step(usize);

impl Step {
    /// The first step of every workflow.
    pub const FIRST: Self = Self(1);

    /// Creates a step from a one-based index; `0` is not a step.
    #[must_use]
    pub const fn new(index: usize) -> Option<Self> {
        if index == 0 { None } else { Some(Self(index)) }
    }

    /// Returns the one-based index.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Returns the following step.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {}", self.0)
    }
}

/// Decision taken by a workflow after the host submits a step's form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<T> {
    /// Show the next step's form.
    Advance,
    /// Report `message` and show the same step again.
    Retry {
        /// Error text for the host.
        message: String,
    },
    /// Report `message` and go back to an earlier step.
    Regress {
        /// Step to show next; must not be after the current step.
        to: Step,
        /// Error text for the host.
        message: String,
    },
    /// Finish successfully with the collected output.
    Succeed(T),
    /// Abandon the dialog.
    Fail {
        /// Error text for the host.
        message: String,
    },
}

impl<T> Transition<T> {
    /// Convenience constructor for [`Transition::Retry`].
    #[must_use]
    pub fn retry(message: impl Into<String>) -> Self {
        Self::Retry {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Transition::Regress`].
    #[must_use]
    pub fn regress(to: Step, message: impl Into<String>) -> Self {
        Self::Regress {
            to,
            message: message.into(),
        }
    }
}

/// Result of recomputing previews after a live form edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// Nothing the host displays has changed.
    Unchanged,
    /// The host should redraw the form with new values.
    Updated(FormUpdate),
}

/// A multi-step dialog rendered by the host.
pub trait Workflow {
    /// Value produced when the dialog succeeds.
    type Output;

    /// Number of steps; at least one.
    fn step_count(&self) -> usize;

    /// Builds the form for `step` from the best values known so far.
    fn form(&self, step: Step) -> FormSpec;

    /// Handles the host's submission of `step`.
    fn submit(
        &mut self,
        step: Step,
        input: Value,
        log: &mut dyn LogSink,
    ) -> Transition<Self::Output>;

    /// Recomputes derived preview values after a live edit.
    ///
    /// Only called for steps whose form requested change callbacks.
    fn form_change(&mut self, _step: Step, _data: Value, _log: &mut dyn LogSink) -> Preview {
        Preview::Unchanged
    }

    /// Observes cancellation before the terminal reply is written.
    fn cancelled(&mut self, _log: &mut dyn LogSink) {}
}

/// Terminal state of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome<T> {
    /// The last step was submitted and accepted.
    Succeeded(T),
    /// The host cancelled the dialog.
    Cancelled,
    /// The dialog could not continue.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

/// Position of a workflow after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState<T> {
    /// Waiting on the host's answer to a step's form.
    Awaiting(Step),
    /// Terminal; no further reads happen within the workflow.
    Finished(WorkflowOutcome<T>),
}

/// What the host sent while a step's form was open, after the workflow has
/// handled it.
#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent<T> {
    /// The form was submitted and the workflow decided how to proceed.
    Submitted(Transition<T>),
    /// The host cancelled.
    Cancelled,
    /// A live edit was processed.
    FormChanged(Preview),
    /// A message that has no meaning while a form is open.
    Unexpected {
        /// Short label for the message shape.
        kind: &'static str,
    },
    /// The host closed the stream.
    EndOfStream,
}

/// I/O the runner must perform, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Write a control reply.
    Reply(Message),
    /// Build and show the form for a step.
    ShowForm(Step),
}

/// Effects and next state produced by [`apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<T> {
    /// I/O to perform, in order.
    pub effects: Vec<Effect>,
    /// Where the workflow stands afterwards.
    pub state: WorkflowState<T>,
}

impl<T> Applied<T> {
    fn awaiting(step: Step, effects: Vec<Effect>) -> Self {
        Self {
            effects,
            state: WorkflowState::Awaiting(step),
        }
    }

    fn finished(outcome: WorkflowOutcome<T>, effects: Vec<Effect>) -> Self {
        Self {
            effects,
            state: WorkflowState::Finished(outcome),
        }
    }

    fn failed(reason: String) -> Self {
        let reply = Effect::Reply(Message::Error(reason.clone()));
        Self::finished(WorkflowOutcome::Failed { reason }, vec![reply])
    }
}

/// Computes the next state of a workflow waiting on `current`.
///
/// `step_count` bounds [`Transition::Advance`]; advancing from the final step
/// or regressing forwards is a fault in the workflow and fails the dialog.
#[must_use]
pub fn apply<T>(current: Step, step_count: usize, event: StepEvent<T>) -> Applied<T> {
    match event {
        StepEvent::Submitted(transition) => apply_transition(current, step_count, transition),
        StepEvent::Cancelled => Applied::finished(
            WorkflowOutcome::Cancelled,
            vec![Effect::Reply(Message::Error(String::from(CANCELLED)))],
        ),
        StepEvent::FormChanged(Preview::Unchanged) => {
            Applied::awaiting(current, vec![Effect::Reply(Message::Ack)])
        }
        StepEvent::FormChanged(Preview::Updated(update)) => {
            Applied::awaiting(current, vec![Effect::Reply(Message::FormUpdate(update))])
        }
        StepEvent::Unexpected { kind } => {
            let error = PluginError::UnexpectedMessage { kind };
            Applied::awaiting(current, vec![Effect::Reply(Message::Error(error.to_string()))])
        }
        StepEvent::EndOfStream => Applied::finished(
            WorkflowOutcome::Failed {
                reason: String::from("host closed the stream"),
            },
            Vec::new(),
        ),
    }
}

fn apply_transition<T>(current: Step, step_count: usize, transition: Transition<T>) -> Applied<T> {
    match transition {
        Transition::Advance if current.get() < step_count => {
            let next = current.next();
            Applied::awaiting(next, vec![Effect::ShowForm(next)])
        }
        Transition::Advance => Applied::failed(format!("workflow has no step after {current}")),
        Transition::Retry { message } => Applied::awaiting(
            current,
            vec![
                Effect::Reply(Message::Error(message)),
                Effect::ShowForm(current),
            ],
        ),
        Transition::Regress { to, message } if to <= current => Applied::awaiting(
            to,
            vec![Effect::Reply(Message::Error(message)), Effect::ShowForm(to)],
        ),
        Transition::Regress { to, .. } => {
            Applied::failed(format!("workflow cannot regress from {current} to {to}"))
        }
        Transition::Succeed(output) => Applied::finished(
            WorkflowOutcome::Succeeded(output),
            vec![Effect::Reply(Message::Result(Value::from(INITIALIZED)))],
        ),
        Transition::Fail { message } => Applied::failed(message),
    }
}

/// Runs `workflow` to completion over `transport`.
///
/// Shows the first form, then alternates between reading the host's answer
/// and performing the effects [`apply`] prescribes. Exactly one terminal
/// reply is written unless the host closes the stream first.
///
/// # Errors
///
/// Returns an error only when the transport fails.
pub fn run_workflow<R, W, F>(
    transport: &mut Transport<R, W>,
    workflow: &mut F,
) -> Result<WorkflowOutcome<F::Output>, TransportError>
where
    R: BufRead,
    W: Write,
    F: Workflow + ?Sized,
{
    let step_count = workflow.step_count();
    if step_count == 0 {
        let Applied { effects, state } = Applied::failed(String::from("workflow has no steps"));
        return finish(transport, workflow, effects, state);
    }

    let mut current = Step::FIRST;
    let mut live = show_form(transport, workflow, current)?;

    loop {
        let event = match transport.read()? {
            None => StepEvent::EndOfStream,
            Some(Message::Result(input)) => {
                StepEvent::Submitted(workflow.submit(current, input, transport))
            }
            Some(Message::Error(_)) => {
                workflow.cancelled(transport);
                StepEvent::Cancelled
            }
            Some(Message::FormChange { data }) if live => {
                StepEvent::FormChanged(workflow.form_change(current, data, transport))
            }
            Some(Message::FormChange { .. }) => StepEvent::FormChanged(Preview::Unchanged),
            Some(other) => StepEvent::Unexpected { kind: other.kind() },
        };

        let Applied { effects, state } = apply(current, step_count, event);
        let next = match state {
            WorkflowState::Awaiting(next) => next,
            finished @ WorkflowState::Finished(_) => {
                return finish(transport, workflow, effects, finished);
            }
        };
        for effect in effects {
            if let Some(showing) = perform(transport, workflow, effect)? {
                live = showing;
            }
        }
        current = next;
    }
}

/// Performs one effect; returns whether a newly shown form wants live edits.
fn perform<R, W, F>(
    transport: &mut Transport<R, W>,
    workflow: &F,
    effect: Effect,
) -> Result<Option<bool>, TransportError>
where
    W: Write,
    F: Workflow + ?Sized,
{
    match effect {
        Effect::Reply(message) => {
            transport.write_control(&message)?;
            Ok(None)
        }
        Effect::ShowForm(step) => show_form(transport, workflow, step).map(Some),
    }
}

fn show_form<R, W, F>(
    transport: &mut Transport<R, W>,
    workflow: &F,
    step: Step,
) -> Result<bool, TransportError>
where
    W: Write,
    F: Workflow + ?Sized,
{
    let form = workflow.form(step);
    let live = form.handles_form_change();
    debug!(target: WORKFLOW_TARGET, %step, title = form.title(), "showing form");
    transport.write_control(&Message::ShowForm(form))?;
    Ok(live)
}

fn finish<R, W, F>(
    transport: &mut Transport<R, W>,
    workflow: &F,
    effects: Vec<Effect>,
    state: WorkflowState<F::Output>,
) -> Result<WorkflowOutcome<F::Output>, TransportError>
where
    W: Write,
    F: Workflow + ?Sized,
{
    for effect in effects {
        perform(transport, workflow, effect)?;
    }
    let outcome = match state {
        WorkflowState::Finished(outcome) => outcome,
        WorkflowState::Awaiting(step) => WorkflowOutcome::Failed {
            reason: format!("workflow stopped while awaiting {step}"),
        },
    };
    match &outcome {
        WorkflowOutcome::Succeeded(_) => info!(target: WORKFLOW_TARGET, "workflow succeeded"),
        WorkflowOutcome::Cancelled => info!(target: WORKFLOW_TARGET, "workflow cancelled"),
        WorkflowOutcome::Failed { reason } => {
            warn!(target: WORKFLOW_TARGET, %reason, "workflow failed");
        }
    }
    Ok(outcome)
}
