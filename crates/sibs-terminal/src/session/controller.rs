//! Terminal session: lifecycle, commands and the inbound dispatch loop.
//!
//! Transport events are drained by one task and applied in arrival order.
//! Anything that waits on a person (the pairing code) runs beside that loop,
//! never inside it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use sibs_core::error::{Result, SibsError};
use sibs_core::protocol::encode;
use sibs_core::protocol::messages::{
    AmountData, DeletePendingReversalsRequest, Fields, OpenPayload, PairingRequest,
    PairingResponse, PairingStep, ProcessPaymentRequest, ReconciliationRequest, RefundRequest,
    SetAuthCredentialRequest, StatusRequest, StatusResponse,
};
use sibs_core::protocol::Message;

use crate::config::{SessionSection, TerminalConfig};
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::dispatch::dispatcher::{UNRECOGNIZED, WRONG_DIRECTION};
use crate::dispatch::{Dispatcher, Route};
use crate::flows::{
    BootstrapAction, CodeDecision, CredentialBootstrap, PairingCodeProvider, PairingMachine,
    PairingOutcome, PairingState, PaymentRecord, TransactionHistory,
};
use crate::obs::SessionMetrics;
use crate::session::events::{Diagnostic, SessionEvent};
use crate::session::pending::PendingReplies;
use crate::transport::{Transport, TransportEvent};

const TRANSPORT_QUEUE: usize = 1024;

/// One terminal session.
///
/// Cheap to clone; every clone drives the same session. Commands send and
/// return as soon as the frame is handed to the transport. Use `request`
/// (or `pair`) when the reply itself is needed.
#[derive(Clone)]
pub struct TerminalSession {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    cfg: SessionSection,
    metrics: Arc<SessionMetrics>,
    dispatcher: Dispatcher,
    pending: PendingReplies,
    pairing: PairingMachine,
    history: TransactionHistory,
    bootstrap: CredentialBootstrap,
    credentials: Option<Arc<dyn CredentialStore>>,
    codes: Option<Arc<dyn PairingCodeProvider>>,
    events: broadcast::Sender<SessionEvent>,
    active: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    code_task: Mutex<Option<JoinHandle<()>>>,
}

pub struct SessionBuilder {
    transport: Arc<dyn Transport>,
    cfg: TerminalConfig,
    credentials: Option<Arc<dyn CredentialStore>>,
    codes: Option<Arc<dyn PairingCodeProvider>>,
}

impl SessionBuilder {
    /// Replace the credential store derived from `bootstrap.credentials_path`.
    pub fn credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(store);
        self
    }

    /// Ask `provider` for pairing codes. Without one the session emits
    /// `SessionEvent::AwaitingPairingCode` and waits for `validate_pairing`.
    pub fn pairing_codes(mut self, provider: Arc<dyn PairingCodeProvider>) -> Self {
        self.codes = Some(provider);
        self
    }

    pub fn build(self) -> TerminalSession {
        let metrics = Arc::new(SessionMetrics::default());
        let (events, _) = broadcast::channel(self.cfg.session.event_buffer.max(1));

        TerminalSession {
            inner: Arc::new(Inner {
                transport: self.transport,
                cfg: self.cfg.session.clone(),
                dispatcher: Dispatcher::new(Arc::clone(&metrics)),
                metrics,
                pending: PendingReplies::new(),
                pairing: PairingMachine::new(),
                history: TransactionHistory::default(),
                bootstrap: CredentialBootstrap::new(self.cfg.bootstrap.auto_payment.clone()),
                credentials: self.credentials,
                codes: self.codes,
                events,
                active: AtomicBool::new(false),
                worker: Mutex::new(None),
                code_task: Mutex::new(None),
            }),
        }
    }
}

impl TerminalSession {
    pub fn builder(transport: Arc<dyn Transport>, cfg: &TerminalConfig) -> SessionBuilder {
        let credentials = cfg
            .bootstrap
            .credentials_path
            .as_ref()
            .map(|p| Arc::new(FileCredentialStore::new(p.clone())) as Arc<dyn CredentialStore>);
        SessionBuilder {
            transport,
            cfg: cfg.clone(),
            credentials,
            codes: None,
        }
    }

    pub fn new(transport: Arc<dyn Transport>, cfg: &TerminalConfig) -> Self {
        Self::builder(transport, cfg).build()
    }

    // --------------------
    // Lifecycle
    // --------------------

    /// Start the transport on `endpoint` and the dispatch loop behind it.
    ///
    /// Fails while the session is active; after `stop` it can start again.
    pub async fn start(&self, endpoint: &str) -> Result<()> {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            return Err(SibsError::ProtocolViolation("session already active".into()));
        }

        let (tx, rx) = mpsc::channel(TRANSPORT_QUEUE);
        let worker = tokio::spawn(run_dispatch(Arc::clone(&self.inner), rx));
        *self.inner.worker() = Some(worker);

        if let Err(e) = self.inner.transport.start(endpoint, tx).await {
            let worker = self.inner.worker().take();
            if let Some(worker) = worker {
                worker.abort();
            }
            self.inner.active.store(false, Ordering::SeqCst);
            return Err(e);
        }

        tracing::info!(endpoint = %endpoint, "session started");
        Ok(())
    }

    /// Stop dispatching, abort every waiter and release the transport.
    /// Calling it again is a no-op.
    pub async fn stop(&self) -> Result<()> {
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let worker = self.inner.worker().take();
        if let Some(worker) = worker {
            worker.abort();
        }
        self.inner.abort_code_task();
        self.inner.pending.fail_all(|| SibsError::Aborted);
        self.inner.pairing.reset();
        self.inner.history.clear();

        let stopped = self.inner.transport.stop().await;
        tracing::info!("session stopped");
        stopped
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn pairing_state(&self) -> PairingState {
        self.inner.pairing.state()
    }

    /// The payment a refund would reverse.
    pub fn last_payment(&self) -> Option<PaymentRecord> {
        self.inner.history.last()
    }

    // --------------------
    // Commands
    // --------------------

    /// Transmit one command. Pairing requests go through the pairing state
    /// machine first and may be rejected before anything is sent.
    pub async fn send(&self, msg: Message) -> Result<()> {
        self.ensure_active()?;
        match msg {
            Message::PairingRequest(req) => self.send_pairing(req).await,
            other => self.inner.send_message(&other).await,
        }
    }

    /// Send and wait for the correlated response, bounded by
    /// `session.reply_timeout_ms`.
    ///
    /// Only the GENERATE_PAIRING_CODE step of a pairing request has a
    /// PAIRING_RESPONSE; the verdict on a code is awaited with `pair`.
    pub async fn request(&self, msg: Message) -> Result<Message> {
        self.request_within(msg, self.inner.cfg.reply_timeout()).await
    }

    pub async fn request_within(&self, msg: Message, limit: Duration) -> Result<Message> {
        let kind = msg.message_type();
        let expected = kind.response().ok_or_else(|| {
            SibsError::ProtocolViolation(format!("{kind} has no response to wait for"))
        })?;
        if let Message::PairingRequest(req) = &msg {
            if req.pairing_step != PairingStep::GeneratePairingCode {
                return Err(SibsError::ProtocolViolation(format!(
                    "{:?} has no PAIRING_RESPONSE, use pair() to wait for the verdict",
                    req.pairing_step
                )));
            }
        }

        let ticket = self.inner.pending.register(expected);
        if let Err(e) = self.send(msg).await {
            self.inner.pending.cancel(&ticket);
            return Err(e);
        }

        let waited = self.inner.pending.wait(ticket, limit).await;
        if let Err(e) = &waited {
            tracing::warn!(msg_type = %kind, error = %e, "no response");
            self.inner
                .metrics
                .wait_failures
                .inc(&[("outcome", e.code().as_str())]);
        }
        waited
    }

    /// Fire-and-forget status query.
    pub async fn status(&self) -> Result<()> {
        self.send(Message::StatusRequest(StatusRequest {})).await
    }

    pub async fn set_credentials(&self, req: SetAuthCredentialRequest) -> Result<()> {
        self.send(Message::SetAuthCredentialRequest(req)).await
    }

    pub async fn process_payment(&self, amount: f64, reference: Option<String>) -> Result<()> {
        self.send(Message::ProcessPaymentRequest(payment_request(amount, reference)?))
            .await
    }

    /// Refund of the last successful payment. Fails with `ProtocolViolation`
    /// before sending when no payment is cached.
    pub async fn refund(&self, amount: f64, reference: Option<String>) -> Result<()> {
        let req = self.build_refund(amount, reference)?;
        self.send(Message::RefundRequest(req)).await
    }

    pub fn build_refund(&self, amount: f64, reference: Option<String>) -> Result<RefundRequest> {
        self.inner.history.build_refund(amount, reference)
    }

    pub async fn pairing_request(&self) -> Result<()> {
        self.send(Message::PairingRequest(PairingRequest::generate())).await
    }

    /// Always allowed; ends an unresolved pairing as `Cancelled`.
    pub async fn cancel_pairing(&self) -> Result<()> {
        self.send(Message::PairingRequest(PairingRequest::cancel())).await
    }

    /// Answer a displayed pairing code. Anything but digits cancels the
    /// pairing and returns `UserInput`.
    pub async fn validate_pairing(&self, code: &str) -> Result<()> {
        self.send(Message::PairingRequest(PairingRequest::validate(code))).await
    }

    pub async fn reconciliation(&self, iban: Option<String>) -> Result<()> {
        self.send(Message::ReconciliationRequest(ReconciliationRequest { iban }))
            .await
    }

    pub async fn communications(&self) -> Result<()> {
        self.send(Message::CommunicationsRequest(OpenPayload::default())).await
    }

    pub async fn get_merchant_data(&self) -> Result<()> {
        self.send(Message::GetMerchantDataRequest(OpenPayload::default())).await
    }

    pub async fn set_merchant_data(&self, fields: Fields) -> Result<()> {
        self.send(Message::SetMerchantDataRequest(OpenPayload { fields })).await
    }

    pub async fn config_terminal(&self, fields: Fields) -> Result<()> {
        self.send(Message::ConfigTerminalRequest(OpenPayload { fields })).await
    }

    pub async fn customer_data(&self, fields: Fields) -> Result<()> {
        self.send(Message::CustomerDataRequest(OpenPayload { fields })).await
    }

    pub async fn loyalty_inquiry(&self, fields: Fields) -> Result<()> {
        self.send(Message::LoyaltyInquiryRequest(OpenPayload { fields })).await
    }

    pub async fn pending_reversals(&self) -> Result<()> {
        self.send(Message::PendingReversalsRequest(OpenPayload::default())).await
    }

    pub async fn delete_pending_reversals(&self, reversal_id: impl Into<String>) -> Result<()> {
        self.send(Message::DeletePendingReversalsRequest(
            DeletePendingReversalsRequest {
                reversal_id: reversal_id.into(),
            },
        ))
        .await
    }

    /// Run a whole pairing: request a code, let the code provider (or a
    /// `validate_pairing` call) answer, wait for the terminal's verdict.
    /// Bounded by `session.pairing_timeout_ms`; on timeout the pairing is
    /// cancelled on the terminal too.
    pub async fn pair(&self) -> Result<PairingOutcome> {
        self.ensure_active()?;
        let outcome = self.inner.begin_pairing().await?;

        match tokio::time::timeout(self.inner.cfg.pairing_timeout(), outcome).await {
            Ok(Ok(o)) => Ok(o),
            Ok(Err(_)) => Err(SibsError::Aborted),
            Err(_) => {
                tracing::warn!("pairing timed out, cancelling");
                self.inner.metrics.wait_failures.inc(&[("outcome", "TIMEOUT")]);
                if let Err(e) = self.cancel_pairing().await {
                    tracing::warn!(error = %e, "pairing cancel after timeout failed");
                }
                Err(SibsError::Timeout)
            }
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SibsError::Transport("session not started".into()))
        }
    }

    async fn send_pairing(&self, req: PairingRequest) -> Result<()> {
        match req.pairing_step {
            PairingStep::GeneratePairingCode => self.inner.begin_pairing().await.map(drop),
            PairingStep::CancelPairing => {
                if let Some(o) = self.inner.pairing.cancel() {
                    self.inner.publish(SessionEvent::Pairing(o));
                }
                self.inner.send_message(&Message::PairingRequest(req)).await
            }
            PairingStep::ValidatePairingCode => {
                let decision = self.inner.pairing.submit_code(req.pairing_code.as_deref())?;
                let rejected = decision == CodeDecision::Cancel;
                self.inner.send_code_decision(decision).await?;
                if rejected {
                    return Err(SibsError::UserInput(
                        "pairing code must be a non-empty string of digits".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn payment_request(amount: f64, reference: Option<String>) -> Result<ProcessPaymentRequest> {
    if !(amount.is_finite() && amount > 0.0) {
        return Err(SibsError::UserInput(format!("invalid payment amount {amount}")));
    }
    Ok(ProcessPaymentRequest {
        amount_data: AmountData::new(amount),
        reference,
    })
}

// --------------------
// Dispatch loop
// --------------------

/// Drains transport events one at a time. A frame is fully applied before
/// the next one is read.
async fn run_dispatch(inner: Arc<Inner>, mut rx: mpsc::Receiver<TransportEvent>) {
    while let Some(ev) = rx.recv().await {
        match ev {
            TransportEvent::Started => inner.publish(SessionEvent::Started),
            TransportEvent::Connected => inner.on_connected().await,
            TransportEvent::Disconnected => inner.on_disconnected(),
            TransportEvent::Message(raw) => inner.handle_frame(&raw).await,
        }
    }
    tracing::debug!("transport event queue closed");
}

impl Inner {
    fn worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn code_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.code_task.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn abort_code_task(&self) {
        let task = self.code_task().take();
        if let Some(task) = task {
            task.abort();
        }
    }

    fn publish(&self, ev: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(ev);
    }

    fn diagnose(&self, code: &'static str, detail: impl Into<String>) {
        self.publish(SessionEvent::Diagnostic(Diagnostic::new(code, detail)));
    }

    async fn send_message(&self, msg: &Message) -> Result<()> {
        let ty = msg.message_type();
        let text = encode(msg)?;
        self.transport.send(text).await?;
        self.metrics.frames_out.inc(&[("type", ty.as_str())]);
        tracing::debug!(msg_type = %ty, "frame out");
        Ok(())
    }

    async fn begin_pairing(&self) -> Result<oneshot::Receiver<PairingOutcome>> {
        self.pairing.begin()?;
        let outcome = self.pairing.watch();
        if let Err(e) = self
            .send_message(&Message::PairingRequest(PairingRequest::generate()))
            .await
        {
            self.pairing.revert_begin();
            return Err(e);
        }
        Ok(outcome)
    }

    async fn send_code_decision(&self, decision: CodeDecision) -> Result<()> {
        if decision == CodeDecision::Cancel {
            tracing::warn!("pairing code rejected, cancelling pairing");
            self.publish(SessionEvent::Pairing(PairingOutcome::Cancelled));
        }
        self.send_message(&Message::PairingRequest(decision.request()))
            .await
    }

    async fn on_connected(&self) {
        self.publish(SessionEvent::Connected);
        let status = self.bootstrap.on_connected();
        if let Err(e) = self.send_message(&status).await {
            tracing::warn!(error = %e, "status request on connect failed");
            self.diagnose(e.code().as_str(), format!("status request on connect: {e}"));
        }
    }

    fn on_disconnected(&self) {
        self.publish(SessionEvent::Disconnected);
        self.pending
            .fail_all(|| SibsError::Transport("terminal disconnected".into()));
        if self.pairing.state().is_unresolved() {
            self.abort_code_task();
            if let Some(o) = self.pairing.cancel() {
                self.publish(SessionEvent::Pairing(o));
            }
        }
    }

    async fn handle_frame(self: &Arc<Self>, raw: &str) {
        let started = Instant::now();
        let route = self.dispatcher.route(raw);
        let label = route.type_label();

        match route {
            Route::Notify(msg) => self.apply(msg).await,
            Route::AutoReply { request, reply } => {
                self.publish(SessionEvent::Inbound(request));
                if let Err(e) = self.send_message(&reply).await {
                    tracing::warn!(error = %e, "auto reply failed");
                    self.diagnose(e.code().as_str(), format!("auto reply: {e}"));
                }
            }
            Route::Ignored(msg) => {
                self.diagnose(WRONG_DIRECTION, format!("{} is outbound-only", msg.message_type()))
            }
            Route::Unrecognized(header) => {
                self.diagnose(UNRECOGNIZED, format!("type tag {:?}", header.type_tag))
            }
            Route::Malformed(e) => self.diagnose(e.code().as_str(), e.to_string()),
        }

        self.metrics
            .dispatch_duration
            .observe(&[("type", label)], started.elapsed());
    }

    /// State updates first, then waiters and observers, then follow-up sends.
    async fn apply(self: &Arc<Self>, msg: Message) {
        if let Message::ProcessPaymentResponse(rsp) = &msg {
            if self.history.record(rsp) {
                tracing::info!(transaction_id = ?rsp.transaction_id, "payment cached for refund");
            }
        }

        if let Some(id) = self.pending.resolve(&msg) {
            tracing::debug!(waiter = id, msg_type = %msg.message_type(), "waiter released");
        }
        self.publish(SessionEvent::Inbound(msg.clone()));

        match msg {
            Message::StatusResponse(rsp) => self.on_status(&rsp).await,
            Message::PairingResponse(rsp) => self.on_pairing_response(rsp),
            Message::PairingNotification(n) => match self.pairing.on_notification(&n) {
                Some(o) => {
                    tracing::info!(outcome = ?o, "pairing finished");
                    self.publish(SessionEvent::Pairing(o));
                }
                None => tracing::debug!("pairing notification outside validation"),
            },
            _ => {}
        }
    }

    async fn on_status(&self, rsp: &StatusResponse) {
        match self.bootstrap.on_status(rsp) {
            BootstrapAction::Nothing => {}
            BootstrapAction::SendCredentials => {
                let Some(store) = &self.credentials else {
                    tracing::warn!("terminal has no credentials and no credential store is configured");
                    self.diagnose("CONFIG", "terminal has no credentials");
                    return;
                };
                let sent = match store.credentials().await {
                    Ok(req) => self.send_message(&Message::SetAuthCredentialRequest(req)).await,
                    Err(e) => Err(e),
                };
                match sent {
                    Ok(()) => tracing::info!("credentials sent to terminal"),
                    Err(e) => {
                        tracing::warn!(error = %e, "credential bootstrap failed");
                        self.diagnose(e.code().as_str(), format!("credential bootstrap: {e}"));
                    }
                }
            }
            BootstrapAction::AutoPayment(req) => {
                tracing::info!(amount = req.amount_data.amount, "auto payment");
                if let Err(e) = self.send_message(&Message::ProcessPaymentRequest(req)).await {
                    self.diagnose(e.code().as_str(), format!("auto payment: {e}"));
                }
            }
        }
    }

    /// Asks the code provider on its own task so the dispatch loop keeps
    /// serving frames while the operator types.
    fn on_pairing_response(self: &Arc<Self>, rsp: PairingResponse) {
        if !self.pairing.on_response() {
            tracing::debug!("pairing response outside a pairing flow");
            return;
        }

        let Some(codes) = self.codes.clone() else {
            self.publish(SessionEvent::AwaitingPairingCode {
                displayed: rsp.pairing_code,
            });
            return;
        };

        let inner = Arc::clone(self);
        let task = tokio::spawn(async move { inner.answer_pairing(codes, rsp.pairing_code).await });
        let previous = self.code_task().replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn answer_pairing(&self, codes: Arc<dyn PairingCodeProvider>, displayed: Option<String>) {
        let input = tokio::time::timeout(
            self.cfg.pairing_timeout(),
            codes.pairing_code(displayed.as_deref()),
        )
        .await
        .ok()
        .flatten();

        match self.pairing.submit_code(input.as_deref()) {
            Ok(decision) => {
                if let Err(e) = self.send_code_decision(decision).await {
                    self.diagnose(e.code().as_str(), format!("pairing: {e}"));
                }
            }
            Err(e) => tracing::debug!(error = %e, "pairing moved on while waiting for the code"),
        }
    }
}
