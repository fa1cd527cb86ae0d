use super::*;

/// The embedded document's form, bound once when the frame boots.
pub(super) struct DomFormView {
    message: web_sys::HtmlTextAreaElement,
    image_input: Option<web_sys::HtmlInputElement>,
    submit_button: web_sys::HtmlButtonElement,
    type_buttons: Vec<web_sys::Element>,
    message_error: Option<web_sys::Element>,
    image_error: Option<web_sys::Element>,
    type_error: Option<web_sys::Element>,
    alert: Option<web_sys::Element>,
}

impl DomFormView {
    fn bind(document: &web_sys::Document) -> Result<Self, String> {
        let form = document
            .query_selector(FORM_SELECTOR)
            .map_err(|_| "failed to query feedback form".to_string())?
            .ok_or_else(|| "feedback form is missing".to_string())?;
        let message = form
            .query_selector(MESSAGE_SELECTOR)
            .map_err(|_| "failed to query message field".to_string())?
            .ok_or_else(|| "message field is missing".to_string())?
            .dyn_into::<web_sys::HtmlTextAreaElement>()
            .map_err(|_| "message field is not a textarea".to_string())?;
        let image_input = form
            .query_selector(IMAGE_INPUT_SELECTOR)
            .ok()
            .flatten()
            .and_then(|input| input.dyn_into::<web_sys::HtmlInputElement>().ok());
        let submit_button = form
            .query_selector(SUBMIT_BUTTON_SELECTOR)
            .map_err(|_| "failed to query submit button".to_string())?
            .ok_or_else(|| "submit button is missing".to_string())?
            .dyn_into::<web_sys::HtmlButtonElement>()
            .map_err(|_| "submit button is not a button".to_string())?;

        let buttons = document
            .query_selector_all(TYPE_BUTTON_SELECTOR)
            .map_err(|_| "failed to query feedback type buttons".to_string())?;
        let type_buttons = (0..buttons.length())
            .filter_map(|index| buttons.item(index))
            .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
            .collect();

        let message_error = MESSAGE_ERROR_IDS
            .iter()
            .find_map(|id| document.get_element_by_id(id));

        Ok(Self {
            message,
            image_input,
            submit_button,
            type_buttons,
            message_error,
            image_error: document.get_element_by_id(IMAGE_ERROR_ID),
            type_error: document.get_element_by_id(TYPE_ERROR_ID),
            alert: document.get_element_by_id(FORM_ALERT_ID),
        })
    }
}

impl FormView for DomFormView {
    fn message_text(&self) -> String {
        self.message.value()
    }

    fn render_state(&mut self, state: SubmissionState) {
        self.submit_button.set_disabled(state.button_disabled());
        self.submit_button.set_text_content(Some(state.button_label()));
    }

    fn set_field_error(&mut self, field: FormField, text: &str) {
        let target = match field {
            FormField::Message => self.message_error.as_ref(),
            FormField::Image => self.image_error.as_ref(),
            FormField::FeedbackType => self.type_error.as_ref(),
        };
        if let Some(target) = target {
            target.set_text_content(Some(text));
        }
    }

    fn render_selection(&mut self, selected: Option<FeedbackType>) {
        for button in &self.type_buttons {
            let classes = button.class_list();
            for class in SELECTED_TYPE_CLASSES {
                let _ = classes.remove_1(class);
            }
            let is_selected = selected.is_some_and(|selected| {
                button.get_attribute("data-type").as_deref() == Some(selected.as_str())
            });
            if is_selected {
                for class in SELECTED_TYPE_CLASSES {
                    let _ = classes.add_1(class);
                }
            }
        }
    }

    fn clear_inputs(&mut self) {
        self.message.set_value("");
        if let Some(input) = self.image_input.as_ref() {
            input.set_value("");
        }
    }

    fn show_alert(&mut self, text: &str) {
        if let Some(alert) = self.alert.as_ref() {
            alert.set_text_content(Some(text));
            let _ = alert.class_list().remove_1(HIDDEN_CLASS);
        }
    }

    fn hide_alert(&mut self) {
        if let Some(alert) = self.alert.as_ref() {
            let _ = alert.class_list().add_1(HIDDEN_CLASS);
        }
    }
}

pub(super) fn boot_frame() -> Result<(), String> {
    let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
    let document = window
        .document()
        .ok_or_else(|| "document is unavailable".to_string())?;
    let hostname = window
        .location()
        .hostname()
        .map_err(|_| "failed to read location hostname".to_string())?;

    let attributes = embed_attributes(&document);
    let credential = attributes.credential();
    let view = DomFormView::bind(&document)?;
    let form = FormController::new(view, WidgetConfig::for_hostname(&hostname), credential.clone());
    FRAME.with(|slot| {
        *slot.borrow_mut() = Some(Rc::new(RefCell::new(form)));
    });

    install_type_handlers(&document)?;
    install_submit_handler(&document)?;
    install_frame_message_handler(&window, attributes)?;
    install_resize_observer(&document)?;

    if let Some(credential) = credential {
        announce(&BridgeMessage::Init(credential));
    }
    tracing::info!(target: LOG_TARGET, "feedback form bound");
    Ok(())
}

fn controller() -> Option<Rc<RefCell<FormController<DomFormView>>>> {
    FRAME.with(|slot| slot.borrow().clone())
}

/// Posts a message to the embedding page, if there is one.
fn announce(message: &BridgeMessage) {
    let Some(parent) = web_sys::window().and_then(|window| window.parent().ok().flatten()) else {
        return;
    };
    if let Err(error) = post_bridge_message(&parent, message) {
        tracing::warn!(target: LOG_TARGET, %error, "failed to notify host page");
    }
}

fn install_type_handlers(document: &web_sys::Document) -> Result<(), String> {
    let buttons = document
        .query_selector_all(TYPE_BUTTON_SELECTOR)
        .map_err(|_| "failed to query feedback type buttons".to_string())?;
    let mut handlers = Vec::new();
    for index in 0..buttons.length() {
        let Some(button) = buttons.item(index) else {
            continue;
        };
        let value = button
            .dyn_ref::<web_sys::Element>()
            .and_then(|element| element.get_attribute("data-type"))
            .unwrap_or_default();
        let callback = Closure::wrap(Box::new(move |event: web_sys::Event| {
            event.prevent_default();
            let Some(controller) = controller() else {
                return;
            };
            if !controller.borrow_mut().select_type(&value) {
                tracing::debug!(target: LOG_TARGET, value = %value, "ignoring unknown feedback type");
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        button
            .add_event_listener_with_callback("click", callback.as_ref().unchecked_ref())
            .map_err(|_| "failed to bind feedback type handler".to_string())?;
        handlers.push(callback);
    }
    TYPE_CLICK_HANDLERS.with(|slot| {
        *slot.borrow_mut() = handlers;
    });
    Ok(())
}

fn install_submit_handler(document: &web_sys::Document) -> Result<(), String> {
    let form = document
        .query_selector(FORM_SELECTOR)
        .map_err(|_| "failed to query feedback form".to_string())?
        .ok_or_else(|| "feedback form is missing".to_string())?;

    let callback = Closure::wrap(Box::new(move |event: web_sys::Event| {
        event.prevent_default();
        let Some(controller) = controller() else {
            return;
        };
        let image_input = controller.borrow().view().image_input.clone();
        spawn_local(async move {
            let outcome = submit_feedback(
                &controller,
                read_selected_image(image_input),
                &FetchTransport,
                &RasterCompressor::default(),
            )
            .await;
            schedule_timers(outcome);
        });
    }) as Box<dyn FnMut(web_sys::Event)>);

    form.add_event_listener_with_callback("submit", callback.as_ref().unchecked_ref())
        .map_err(|_| "failed to bind form submit handler".to_string())?;
    FORM_SUBMIT_HANDLER.with(|slot| {
        *slot.borrow_mut() = Some(callback);
    });
    Ok(())
}

async fn read_selected_image(
    input: Option<web_sys::HtmlInputElement>,
) -> Result<Option<RawImage>, String> {
    let Some(file) = input
        .and_then(|input| input.files())
        .and_then(|files| files.get(0))
    else {
        return Ok(None);
    };
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|_| "failed to read selected image".to_string())?;
    Ok(Some(RawImage {
        file_name: file.name(),
        content_type: file.type_(),
        bytes: js_sys::Uint8Array::new(&buffer).to_vec(),
    }))
}

/// Replacing a slot drops the previous `Timeout`, which cancels it.
fn schedule_timers(outcome: SubmitOutcome) {
    if let Some(ticket) = outcome.reset {
        let timeout = Timeout::new(RESET_DELAY_MS, move || {
            if let Some(controller) = controller() {
                controller.borrow_mut().expire_reset(ticket);
            }
        });
        RESET_TIMER.with(|slot| {
            *slot.borrow_mut() = Some(timeout);
        });
    }
    if let Some(ticket) = outcome.alert {
        let timeout = Timeout::new(ALERT_DISMISS_MS, move || {
            if let Some(controller) = controller() {
                controller.borrow_mut().dismiss_alert(ticket);
            }
        });
        ALERT_TIMER.with(|slot| {
            *slot.borrow_mut() = Some(timeout);
        });
    }
}

fn install_frame_message_handler(
    window: &web_sys::Window,
    attributes: EmbedAttributes,
) -> Result<(), String> {
    let policy = attributes.origin_policy();
    let callback = Closure::wrap(Box::new(move |event: web_sys::Event| {
        let Some((origin, message)) = decode_message_event(&event) else {
            return;
        };
        if !policy.allows(&origin) {
            tracing::warn!(target: LOG_TARGET, origin = %origin, "dropping message from disallowed origin");
            return;
        }
        if let Some(controller) = controller() {
            controller.borrow_mut().receive(message);
        }
    }) as Box<dyn FnMut(web_sys::Event)>);

    window
        .add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())
        .map_err(|_| "failed to bind frame message handler".to_string())?;
    FRAME_MESSAGE_HANDLER.with(|slot| {
        *slot.borrow_mut() = Some(callback);
    });
    Ok(())
}

/// Measures the body, not the root element, so the panel can also shrink.
fn report_height() {
    let height = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.body())
        .map_or(0.0, |body| body.get_bounding_client_rect().height());
    announce(&BridgeMessage::Resize(ResizeHeight::from_layout(height)));
}

fn install_resize_observer(document: &web_sys::Document) -> Result<(), String> {
    let body = document
        .body()
        .ok_or_else(|| "document body is unavailable".to_string())?;
    let callback = Closure::wrap(Box::new(move |_entries: JsValue| {
        report_height();
    }) as Box<dyn FnMut(JsValue)>);
    let observer = web_sys::ResizeObserver::new(callback.as_ref().unchecked_ref())
        .map_err(|_| "failed to create resize observer".to_string())?;
    observer.observe(&body);

    RESIZE_HANDLER.with(|slot| {
        *slot.borrow_mut() = Some(callback);
    });
    RESIZE_OBSERVER.with(|slot| {
        *slot.borrow_mut() = Some(observer);
    });
    report_height();
    Ok(())
}
