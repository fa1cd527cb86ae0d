#[cfg(any(target_arch = "wasm32", test))]
mod styles;
#[cfg(target_arch = "wasm32")]
mod wasm_constants;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::cell::RefCell;
    use std::rc::Rc;

    use gloo_timers::callback::Timeout;
    use tellthedev_core::bridge::TARGET_ORIGIN_ANY;
    use tellthedev_core::credential::{FRAME_MARKER_ATTRIBUTE, bootstrap};
    use tellthedev_core::mount::ERROR_PANEL_MESSAGE;
    use tellthedev_core::submission::{ALERT_DISMISS_MS, RESET_DELAY_MS};
    use tellthedev_core::{
        BridgeMessage, EmbedAttributes, FeedbackType, FormController, FormField, FormView,
        HostEffect, HostSession, LOG_TARGET, RasterCompressor, RawImage, ResizeHeight,
        SubmissionState, SubmitOutcome, ToggleOutcome, TransportError, WidgetConfig,
        WidgetRequest, WidgetResponse, WidgetRole, WidgetStatus, WidgetTransport,
        submit_feedback,
    };
    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::{JsFuture, spawn_local};

    use crate::styles::host_stylesheet;
    use crate::wasm_constants::*;

    mod frame;
    mod host;
    mod logging;
    mod network;

    use frame::*;
    use host::*;
    use logging::*;
    use network::*;

    type EventHandler = Closure<dyn FnMut(web_sys::Event)>;

    thread_local! {
        static HOST: RefCell<Option<HostSession>> = const { RefCell::new(None) };
        static HOST_DOM: RefCell<Option<HostDom>> = const { RefCell::new(None) };
        static FRAME: RefCell<Option<Rc<RefCell<FormController<DomFormView>>>>> = const { RefCell::new(None) };
        static DOM_READY_HANDLER: RefCell<Option<EventHandler>> = const { RefCell::new(None) };
        static TOGGLE_CLICK_HANDLER: RefCell<Option<EventHandler>> = const { RefCell::new(None) };
        static FRAME_LOAD_HANDLER: RefCell<Option<EventHandler>> = const { RefCell::new(None) };
        static HOST_MESSAGE_HANDLER: RefCell<Option<EventHandler>> = const { RefCell::new(None) };
        static FRAME_MESSAGE_HANDLER: RefCell<Option<EventHandler>> = const { RefCell::new(None) };
        static FORM_SUBMIT_HANDLER: RefCell<Option<EventHandler>> = const { RefCell::new(None) };
        static TYPE_CLICK_HANDLERS: RefCell<Vec<EventHandler>> = const { RefCell::new(Vec::new()) };
        static RESIZE_HANDLER: RefCell<Option<Closure<dyn FnMut(JsValue)>>> = const { RefCell::new(None) };
        static RESIZE_OBSERVER: RefCell<Option<web_sys::ResizeObserver>> = const { RefCell::new(None) };
        static RESET_TIMER: RefCell<Option<Timeout>> = const { RefCell::new(None) };
        static ALERT_TIMER: RefCell<Option<Timeout>> = const { RefCell::new(None) };
    }

    #[wasm_bindgen(start)]
    pub fn start() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        install_logging();

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("window is unavailable"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document is unavailable"))?;

        if document.ready_state() == "loading" {
            let handler = Closure::wrap(Box::new(move |_event: web_sys::Event| {
                boot();
            }) as Box<dyn FnMut(web_sys::Event)>);
            document
                .add_event_listener_with_callback("DOMContentLoaded", handler.as_ref().unchecked_ref())
                .map_err(|_| JsValue::from_str("failed to wait for DOMContentLoaded"))?;
            DOM_READY_HANDLER.with(|slot| {
                *slot.borrow_mut() = Some(handler);
            });
        } else {
            boot();
        }
        Ok(())
    }

    /// JSON snapshot of the host-page status, same shape as `window.TellTheDev`.
    #[wasm_bindgen]
    pub fn widget_state_json() -> String {
        let status = HOST.with(|slot| {
            slot.borrow()
                .as_ref()
                .map(HostSession::status)
                .unwrap_or_default()
        });
        serde_json::to_string(&status).unwrap_or_else(|_| "{\"valid\":false}".to_string())
    }

    fn boot() {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };
        match detect_role(&document) {
            WidgetRole::Host => spawn_local(async {
                if let Err(error) = boot_host().await {
                    tracing::error!(target: LOG_TARGET, %error, "failed to mount widget");
                }
            }),
            WidgetRole::Frame => {
                if let Err(error) = boot_frame() {
                    tracing::error!(target: LOG_TARGET, %error, "failed to bind feedback form");
                }
            }
        }
    }

    /// The frame document marks its script tag or root element.
    fn detect_role(document: &web_sys::Document) -> WidgetRole {
        let root_marked = document
            .document_element()
            .is_some_and(|root| root.has_attribute(FRAME_MARKER_ATTRIBUTE));
        if root_marked {
            WidgetRole::Frame
        } else {
            embed_attributes(document).role()
        }
    }

    fn embed_attributes(document: &web_sys::Document) -> EmbedAttributes {
        let script = document.query_selector(EMBED_SCRIPT_SELECTOR).ok().flatten();
        EmbedAttributes::from_lookup(|name| {
            script
                .as_ref()
                .and_then(|script| script.get_attribute(name))
        })
    }

    fn post_bridge_message(target: &web_sys::Window, message: &BridgeMessage) -> Result<(), String> {
        let payload = js_sys::JSON::parse(&message.encode())
            .map_err(|_| "failed to encode bridge message".to_string())?;
        target
            .post_message(&payload, TARGET_ORIGIN_ANY)
            .map_err(|_| "failed to post bridge message".to_string())
    }

    fn decode_message_event(event: &web_sys::Event) -> Option<(String, BridgeMessage)> {
        let event = event.dyn_ref::<web_sys::MessageEvent>()?;
        let raw = js_sys::JSON::stringify(&event.data()).ok()?.as_string()?;
        match BridgeMessage::decode(&raw) {
            Ok(message) => message.map(|message| (event.origin(), message)),
            Err(error) => {
                tracing::debug!(target: LOG_TARGET, %error, "ignoring undecodable message");
                None
            }
        }
    }
}
