//! Frame-side form controller.
//!
//! The controller owns the submission session (credential, selected type,
//! state machine) and drives a [`FormView`] bound once to the frame's DOM.
//! Submitting is split into a synchronous `begin`, an awaited `execute`, and
//! a synchronous `finish` so a `RefCell` borrow never spans an await.

use std::cell::RefCell;
use std::future::Future;

use serde_json::Value;

use crate::LOG_TARGET;
use crate::bridge::BridgeMessage;
use crate::compression::ImageCompressor;
use crate::credential::{Credential, CredentialKind};
use crate::environment::WidgetConfig;
use crate::feedback::{
    FeedbackDraft, FeedbackType, NOT_INITIALIZED, RawImage, SubmitFailure, interpret_response,
    validate,
};
use crate::submission::{ResetTicket, SubmissionEvent, SubmissionMachine, SubmissionState};
use crate::transport::WidgetTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Message,
    Image,
    FeedbackType,
}

/// Typed binding over the embedded document's fixed structure.
pub trait FormView {
    fn message_text(&self) -> String;
    fn render_state(&mut self, state: SubmissionState);
    fn set_field_error(&mut self, field: FormField, text: &str);
    fn render_selection(&mut self, selected: Option<FeedbackType>);
    fn clear_inputs(&mut self);
    fn show_alert(&mut self, text: &str);
    fn hide_alert(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub state: SubmissionState,
    pub reset: Option<ResetTicket>,
    pub alert: Option<AlertTicket>,
}

impl SubmitOutcome {
    fn unchanged(state: SubmissionState, alert: Option<AlertTicket>) -> Self {
        Self {
            state,
            reset: None,
            alert,
        }
    }
}

/// Everything the network phase needs, detached from the controller.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    draft: FeedbackDraft,
    credential: Credential,
    config: WidgetConfig,
}

impl PreparedSubmission {
    pub async fn execute<T, C, F>(
        self,
        image: F,
        transport: &T,
        compressor: &C,
    ) -> Result<Value, SubmitFailure>
    where
        T: WidgetTransport + ?Sized,
        C: ImageCompressor + ?Sized,
        F: Future<Output = Result<Option<RawImage>, String>>,
    {
        let mut draft = self.draft;
        if self.credential.kind == CredentialKind::ApiKey {
            // JSON submissions carry no attachment; leave the file unread.
            tracing::debug!(target: LOG_TARGET, "image attachments are not sent with API key submissions");
        } else if let Some(raw) = image.await.map_err(SubmitFailure::transport)? {
            let compressed = compressor
                .compress(raw)
                .map_err(|error| SubmitFailure::transport(error.to_string()))?;
            draft.image = Some(compressed);
        }
        let request = draft.into_request(&self.config, &self.credential);
        let response = transport
            .send(request)
            .await
            .map_err(|error| SubmitFailure::transport(error.to_string()))?;
        interpret_response(&response)
    }
}

pub struct FormController<V> {
    view: V,
    config: WidgetConfig,
    credential: Option<Credential>,
    selected: Option<FeedbackType>,
    machine: SubmissionMachine,
    alert_generation: u64,
    blocked_alert: Option<AlertTicket>,
}

impl<V: FormView> FormController<V> {
    pub fn new(mut view: V, config: WidgetConfig, credential: Option<Credential>) -> Self {
        view.render_state(SubmissionState::Idle);
        Self {
            view,
            config,
            credential,
            selected: None,
            machine: SubmissionMachine::default(),
            alert_generation: 0,
            blocked_alert: None,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn state(&self) -> SubmissionState {
        self.machine.state()
    }

    pub fn selected(&self) -> Option<FeedbackType> {
        self.selected
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Frame side of the bridge: only `init` matters here.
    pub fn receive(&mut self, message: BridgeMessage) {
        if let BridgeMessage::Init(credential) = message {
            tracing::info!(target: LOG_TARGET, kind = ?credential.kind, "widget initialized with credential from host");
            self.credential = Some(credential);
        }
    }

    /// Returns `false` for values outside the category set.
    pub fn select_type(&mut self, raw: &str) -> bool {
        let Some(feedback_type) = FeedbackType::parse(raw) else {
            return false;
        };
        self.selected = Some(feedback_type);
        self.view.render_selection(self.selected);
        true
    }

    pub fn begin_submit(&mut self) -> Option<PreparedSubmission> {
        if self.machine.state() == SubmissionState::Loading {
            tracing::warn!(target: LOG_TARGET, "submission already in flight");
            return None;
        }

        for field in [FormField::Message, FormField::Image, FormField::FeedbackType] {
            self.view.set_field_error(field, "");
        }

        let draft = match validate(&self.view.message_text(), self.selected) {
            Ok(draft) => draft,
            Err(errors) => {
                if let Some(text) = errors.message.as_deref() {
                    self.view.set_field_error(FormField::Message, text);
                }
                if let Some(text) = errors.feedback_type.as_deref() {
                    self.view.set_field_error(FormField::FeedbackType, text);
                }
                tracing::warn!(target: LOG_TARGET, "submission blocked due to validation errors");
                self.return_to_idle();
                return None;
            }
        };

        let Some(credential) = self.credential.clone() else {
            tracing::warn!(target: LOG_TARGET, "submission blocked: no credential");
            self.blocked_alert = Some(self.raise_alert(NOT_INITIALIZED));
            self.return_to_idle();
            return None;
        };

        if let Err(error) = self.machine.fire(SubmissionEvent::Submit) {
            tracing::warn!(target: LOG_TARGET, %error, "submission rejected");
            return None;
        }
        self.view.render_state(SubmissionState::Loading);

        Some(PreparedSubmission {
            draft,
            credential,
            config: self.config.clone(),
        })
    }

    pub fn finish_submit(&mut self, result: Result<Value, SubmitFailure>) -> SubmitOutcome {
        let accepted = result.is_ok();
        let reset = match self.machine.settle(accepted) {
            Ok(ticket) => ticket,
            Err(error) => {
                tracing::warn!(target: LOG_TARGET, %error, "dropping stale submission result");
                return SubmitOutcome::unchanged(self.machine.state(), None);
            }
        };

        let alert = match result {
            Ok(body) => {
                tracing::info!(target: LOG_TARGET, %body, "submission successful");
                self.selected = None;
                self.view.clear_inputs();
                self.view.render_selection(None);
                None
            }
            Err(failure) => {
                tracing::error!(target: LOG_TARGET, alert = %failure.alert, "submission failed");
                if let Some(content) = failure.content_error.as_deref() {
                    self.view.set_field_error(FormField::Message, content);
                }
                Some(self.raise_alert(&failure.alert))
            }
        };
        self.view.render_state(self.machine.state());

        SubmitOutcome {
            state: self.machine.state(),
            reset: Some(reset),
            alert,
        }
    }

    /// Called when a reset timer fires; stale tickets are ignored.
    pub fn expire_reset(&mut self, ticket: ResetTicket) -> bool {
        let reset = self.machine.expire(ticket);
        if reset {
            self.view.render_state(SubmissionState::Idle);
        }
        reset
    }

    pub fn dismiss_alert(&mut self, ticket: AlertTicket) -> bool {
        if ticket.generation != self.alert_generation {
            return false;
        }
        self.view.hide_alert();
        true
    }

    fn raise_alert(&mut self, text: &str) -> AlertTicket {
        self.alert_generation = self.alert_generation.wrapping_add(1);
        self.view.show_alert(text);
        AlertTicket {
            generation: self.alert_generation,
        }
    }

    fn return_to_idle(&mut self) {
        if matches!(
            self.machine.state(),
            SubmissionState::Success | SubmissionState::Error
        ) && self.machine.fire(SubmissionEvent::ResetElapsed).is_ok()
        {
            self.view.render_state(SubmissionState::Idle);
        }
    }
}

/// Runs one submission end to end against a shared controller.
pub async fn submit_feedback<V, T, C, F>(
    controller: &RefCell<FormController<V>>,
    image: F,
    transport: &T,
    compressor: &C,
) -> SubmitOutcome
where
    V: FormView,
    T: WidgetTransport + ?Sized,
    C: ImageCompressor + ?Sized,
    F: Future<Output = Result<Option<RawImage>, String>>,
{
    let prepared = controller.borrow_mut().begin_submit();
    let Some(prepared) = prepared else {
        let mut controller = controller.borrow_mut();
        let alert = controller.blocked_alert.take();
        return SubmitOutcome::unchanged(controller.state(), alert);
    };
    let result = prepared.execute(image, transport, compressor).await;
    controller.borrow_mut().finish_submit(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::RasterCompressor;
    use crate::feedback::{MESSAGE_REQUIRED, TYPE_REQUIRED};
    use crate::testing::FakeTransport;
    use crate::transport::{RequestBody, TransportError, WidgetResponse};

    #[derive(Debug, Default)]
    struct RecordingView {
        message: String,
        states: Vec<SubmissionState>,
        message_error: String,
        type_error: String,
        selection: Option<FeedbackType>,
        alert: Option<String>,
        cleared: usize,
    }

    impl FormView for RecordingView {
        fn message_text(&self) -> String {
            self.message.clone()
        }
        fn render_state(&mut self, state: SubmissionState) {
            self.states.push(state);
        }
        fn set_field_error(&mut self, field: FormField, text: &str) {
            match field {
                FormField::Message => self.message_error = text.to_string(),
                FormField::FeedbackType => self.type_error = text.to_string(),
                FormField::Image => {}
            }
        }
        fn render_selection(&mut self, selected: Option<FeedbackType>) {
            self.selection = selected;
        }
        fn clear_inputs(&mut self) {
            self.message.clear();
            self.cleared += 1;
        }
        fn show_alert(&mut self, text: &str) {
            self.alert = Some(text.to_string());
        }
        fn hide_alert(&mut self) {
            self.alert = None;
        }
    }

    fn controller(credential: Option<Credential>) -> RefCell<FormController<RecordingView>> {
        RefCell::new(FormController::new(
            RecordingView::default(),
            WidgetConfig::for_hostname("localhost"),
            credential,
        ))
    }

    async fn no_image() -> Result<Option<RawImage>, String> {
        Ok(None)
    }

    #[test]
    fn category_selection_is_mutually_exclusive() {
        let controller = controller(None);
        let mut form = controller.borrow_mut();
        assert!(form.select_type("bug"));
        assert!(form.select_type("feature"));
        assert!(form.select_type("feature"));
        assert_eq!(form.selected(), Some(FeedbackType::Feature));
        assert_eq!(form.view().selection, Some(FeedbackType::Feature));
        assert!(!form.select_type("unknown"));
        assert_eq!(form.selected(), Some(FeedbackType::Feature));
    }

    #[tokio::test]
    async fn empty_form_shows_both_errors_and_stays_idle() {
        let controller = controller(Credential::api_key("abc123"));
        let transport = FakeTransport::default();
        let outcome =
            submit_feedback(&controller, no_image(), &transport, &RasterCompressor::default())
                .await;
        assert_eq!(outcome.state, SubmissionState::Idle);
        let form = controller.borrow();
        assert_eq!(form.view().message_error, MESSAGE_REQUIRED);
        assert_eq!(form.view().type_error, TYPE_REQUIRED);
        assert!(!form.view().states.contains(&SubmissionState::Loading));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_credential_blocks_with_alert() {
        let controller = controller(None);
        {
            let mut form = controller.borrow_mut();
            form.view.message = "hello".to_string();
            form.select_type("general");
        }
        let transport = FakeTransport::default();
        let outcome =
            submit_feedback(&controller, no_image(), &transport, &RasterCompressor::default())
                .await;
        assert_eq!(outcome.state, SubmissionState::Idle);
        assert!(outcome.alert.is_some());
        assert_eq!(controller.borrow().view().alert.as_deref(), Some(NOT_INITIALIZED));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_surfaces_alert_and_error_state() {
        let controller = controller(Credential::project_id("p-1"));
        {
            let mut form = controller.borrow_mut();
            form.view.message = "broken".to_string();
            form.select_type("bug");
        }
        let transport =
            FakeTransport::with_result(Err(TransportError::Network("offline".to_string())));
        let outcome =
            submit_feedback(&controller, no_image(), &transport, &RasterCompressor::default())
                .await;
        assert_eq!(outcome.state, SubmissionState::Error);
        let alert = outcome.alert.expect("alert ticket");
        let mut form = controller.borrow_mut();
        assert_eq!(form.view().alert.as_deref(), Some("offline"));
        assert_eq!(form.view().message, "broken");
        assert!(form.dismiss_alert(alert));
        assert_eq!(form.view().alert, None);
    }

    #[tokio::test]
    async fn unreadable_image_is_an_ordinary_submission_error() {
        let controller = controller(Credential::project_id("p-1"));
        {
            let mut form = controller.borrow_mut();
            form.view.message = "see attached".to_string();
            form.select_type("bug");
        }
        let transport = FakeTransport::default();
        let image = async {
            Ok::<_, String>(Some(RawImage {
                file_name: "broken.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0, 1, 2],
            }))
        };
        let outcome =
            submit_feedback(&controller, image, &transport, &RasterCompressor::default()).await;
        assert_eq!(outcome.state, SubmissionState::Error);
        assert!(transport.requests().is_empty());
        let form = controller.borrow();
        assert!(form
            .view()
            .alert
            .as_deref()
            .is_some_and(|alert| alert.starts_with("could not decode image")));
    }

    #[tokio::test]
    async fn api_key_submission_never_reads_the_image() {
        let controller = controller(Credential::api_key("k"));
        {
            let mut form = controller.borrow_mut();
            form.view.message = "see attached".to_string();
            form.select_type("bug");
        }
        let transport = FakeTransport::replying(WidgetResponse::new(200, r#"{"ok":true}"#));
        let image = async {
            Ok::<_, String>(Some(RawImage {
                file_name: "garbage.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: b"garbage".to_vec(),
            }))
        };
        let outcome =
            submit_feedback(&controller, image, &transport, &RasterCompressor::default()).await;
        assert_eq!(outcome.state, SubmissionState::Success);
        assert_eq!(outcome.alert, None);
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0].body, RequestBody::Json(_)));
    }

    #[tokio::test]
    async fn validation_failure_after_success_cancels_pending_reset() {
        let controller = controller(Credential::api_key("abc123"));
        {
            let mut form = controller.borrow_mut();
            form.view.message = "first".to_string();
            form.select_type("praise");
        }
        let transport = FakeTransport::replying(WidgetResponse::new(200, r#"{"ok":true}"#));
        let first =
            submit_feedback(&controller, no_image(), &transport, &RasterCompressor::default())
                .await;
        assert_eq!(first.state, SubmissionState::Success);
        let stale = first.reset.expect("reset ticket");

        let second =
            submit_feedback(&controller, no_image(), &transport, &RasterCompressor::default())
                .await;
        assert_eq!(second.state, SubmissionState::Idle);
        assert_eq!(second.reset, None);

        let mut form = controller.borrow_mut();
        assert_eq!(form.state(), SubmissionState::Idle);
        assert_eq!(form.view().message_error, MESSAGE_REQUIRED);
        assert_eq!(form.view().type_error, TYPE_REQUIRED);
        assert!(!form.expire_reset(stale));
        assert_eq!(form.view().states.last(), Some(&SubmissionState::Idle));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn double_submit_while_loading_is_rejected() {
        let controller = controller(Credential::api_key("abc123"));
        let mut form = controller.borrow_mut();
        form.view.message = "twice".to_string();
        form.select_type("idea");
        assert!(form.begin_submit().is_some());
        assert!(form.begin_submit().is_none());
        assert_eq!(form.state(), SubmissionState::Loading);
    }

    #[test]
    fn newer_alert_survives_older_dismissal() {
        let controller = controller(None);
        let mut form = controller.borrow_mut();
        let first = form.raise_alert("first");
        let second = form.raise_alert("second");
        assert!(!form.dismiss_alert(first));
        assert_eq!(form.view().alert.as_deref(), Some("second"));
        assert!(form.dismiss_alert(second));
    }

    #[test]
    fn init_message_replaces_frame_credential() {
        let controller = controller(Credential::project_id("default"));
        let mut form = controller.borrow_mut();
        let replacement = Credential::project_id("from-host").expect("credential");
        form.receive(BridgeMessage::Init(replacement.clone()));
        assert_eq!(form.credential(), Some(&replacement));
        form.receive(BridgeMessage::Resize(crate::bridge::ResizeHeight::pixels(10)));
        assert_eq!(form.credential(), Some(&replacement));
    }
}
