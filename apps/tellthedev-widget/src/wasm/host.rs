use super::*;

/// DOM nodes owned by the host-side mount, resolved once.
pub(super) struct HostDom {
    shadow: web_sys::ShadowRoot,
    toggle: web_sys::Element,
    container: web_sys::HtmlElement,
    frame: web_sys::HtmlIFrameElement,
    error_container: Option<web_sys::Element>,
}

pub(super) async fn boot_host() -> Result<(), String> {
    let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
    let document = window
        .document()
        .ok_or_else(|| "document is unavailable".to_string())?;
    let hostname = window
        .location()
        .hostname()
        .map_err(|_| "failed to read location hostname".to_string())?;

    let config = WidgetConfig::for_hostname(&hostname);
    let attributes = embed_attributes(&document);
    let credential = attributes.credential();
    let verdict = match credential.as_ref() {
        Some(credential) => bootstrap(&FetchTransport, &config, credential).await,
        None => None,
    };

    let session = HostSession::new(credential, verdict, attributes.origin_policy());
    publish_status(&window, &session.status())?;
    let dom = mount_host_dom(&document, &config)?;
    HOST.with(|slot| {
        *slot.borrow_mut() = Some(session);
    });
    HOST_DOM.with(|slot| {
        *slot.borrow_mut() = Some(dom);
    });

    install_toggle_handler()?;
    install_frame_load_handler()?;
    install_host_message_handler(&window)?;
    tracing::info!(
        target: LOG_TARGET,
        environment = config.environment.as_str(),
        frame_url = %config.frame_url,
        "widget mounted"
    );
    Ok(())
}

fn publish_status(window: &web_sys::Window, status: &WidgetStatus) -> Result<(), String> {
    let json = serde_json::to_string(status)
        .map_err(|error| format!("failed to serialize widget status: {error}"))?;
    let value =
        js_sys::JSON::parse(&json).map_err(|_| "failed to parse widget status".to_string())?;
    js_sys::Reflect::set(window, &JsValue::from_str(STATUS_GLOBAL), &value)
        .map_err(|_| "failed to publish widget status".to_string())?;
    Ok(())
}

fn mount_host_dom(document: &web_sys::Document, config: &WidgetConfig) -> Result<HostDom, String> {
    let body = document
        .body()
        .ok_or_else(|| "document body is unavailable".to_string())?;

    let shadow_host = document
        .create_element("div")
        .map_err(|_| "failed to create shadow host".to_string())?;
    shadow_host.set_id(SHADOW_HOST_ID);
    body.append_child(&shadow_host)
        .map_err(|_| "failed to attach shadow host".to_string())?;
    let shadow = shadow_host
        .attach_shadow(&web_sys::ShadowRootInit::new(web_sys::ShadowRootMode::Open))
        .map_err(|_| "failed to attach shadow root".to_string())?;

    let style = document
        .create_element("style")
        .map_err(|_| "failed to create style element".to_string())?;
    style.set_text_content(Some(&host_stylesheet(&config.colors)));
    shadow
        .append_child(&style)
        .map_err(|_| "failed to append style element".to_string())?;

    let toggle = document
        .create_element("button")
        .map_err(|_| "failed to create toggle button".to_string())?;
    toggle.set_class_name(TOGGLE_BUTTON_CLASS);
    let logo = document
        .create_element("img")
        .map_err(|_| "failed to create toggle logo".to_string())?;
    logo.set_attribute("src", &config.assets.logo_icon)
        .map_err(|_| "failed to set toggle logo".to_string())?;
    logo.set_attribute("alt", LOGO_ALT)
        .map_err(|_| "failed to set toggle logo alt".to_string())?;
    toggle
        .append_child(&logo)
        .map_err(|_| "failed to append toggle logo".to_string())?;
    shadow
        .append_child(&toggle)
        .map_err(|_| "failed to append toggle button".to_string())?;

    let container = document
        .create_element("div")
        .map_err(|_| "failed to create widget container".to_string())?
        .dyn_into::<web_sys::HtmlElement>()
        .map_err(|_| "widget container is not an HtmlElement".to_string())?;
    container.set_class_name(WIDGET_CONTAINER_CLASS);
    let frame = document
        .create_element("iframe")
        .map_err(|_| "failed to create widget frame".to_string())?
        .dyn_into::<web_sys::HtmlIFrameElement>()
        .map_err(|_| "widget frame is not an iframe".to_string())?;
    frame.set_src(&config.frame_url);
    container
        .append_child(&frame)
        .map_err(|_| "failed to append widget frame".to_string())?;
    shadow
        .append_child(&container)
        .map_err(|_| "failed to append widget container".to_string())?;

    Ok(HostDom {
        shadow,
        toggle,
        container,
        frame,
        error_container: None,
    })
}

fn create_error_panel(dom: &mut HostDom) -> Result<web_sys::Element, String> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| "document is unavailable".to_string())?;
    let panel = document
        .create_element("div")
        .map_err(|_| "failed to create error panel".to_string())?;
    panel.set_class_name(ERROR_CONTAINER_CLASS);
    let message = document
        .create_element("p")
        .map_err(|_| "failed to create error message".to_string())?;
    message.set_class_name(ERROR_MESSAGE_CLASS);
    message.set_text_content(Some(ERROR_PANEL_MESSAGE));
    panel
        .append_child(&message)
        .map_err(|_| "failed to append error message".to_string())?;
    dom.shadow
        .append_child(&panel)
        .map_err(|_| "failed to append error panel".to_string())?;
    dom.error_container = Some(panel.clone());
    Ok(panel)
}

fn apply_toggle(dom: &mut HostDom, outcome: ToggleOutcome) -> Result<(), String> {
    let target: web_sys::Element = match outcome {
        ToggleOutcome::PanelShown | ToggleOutcome::PanelHidden => dom.container.clone().into(),
        ToggleOutcome::ErrorPanelCreated => create_error_panel(dom)?,
        ToggleOutcome::ErrorPanelShown | ToggleOutcome::ErrorPanelHidden => dom
            .error_container
            .clone()
            .ok_or_else(|| "error panel was never created".to_string())?,
    };
    let classes = target.class_list();
    if outcome.is_visible() {
        classes.add_1(SHOW_CLASS)
    } else {
        classes.remove_1(SHOW_CLASS)
    }
    .map_err(|_| "failed to toggle panel visibility".to_string())
}

fn install_toggle_handler() -> Result<(), String> {
    let toggle = HOST_DOM
        .with(|slot| slot.borrow().as_ref().map(|dom| dom.toggle.clone()))
        .ok_or_else(|| "host DOM is not mounted".to_string())?;

    let callback = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        let Some(outcome) = HOST.with(|slot| slot.borrow_mut().as_mut().map(HostSession::toggle))
        else {
            return;
        };
        let applied = HOST_DOM.with(|slot| match slot.borrow_mut().as_mut() {
            Some(dom) => apply_toggle(dom, outcome),
            None => Err("host DOM is not mounted".to_string()),
        });
        if let Err(error) = applied {
            tracing::error!(target: LOG_TARGET, %error, ?outcome, "failed to apply toggle");
        }
    }) as Box<dyn FnMut(web_sys::Event)>);

    toggle
        .add_event_listener_with_callback("click", callback.as_ref().unchecked_ref())
        .map_err(|_| "failed to bind toggle click handler".to_string())?;
    TOGGLE_CLICK_HANDLER.with(|slot| {
        *slot.borrow_mut() = Some(callback);
    });
    Ok(())
}

fn install_frame_load_handler() -> Result<(), String> {
    let frame = HOST_DOM
        .with(|slot| slot.borrow().as_ref().map(|dom| dom.frame.clone()))
        .ok_or_else(|| "host DOM is not mounted".to_string())?;
    let target = frame.clone();

    let callback = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        let Some(message) = HOST.with(|slot| slot.borrow().as_ref().and_then(HostSession::init_message))
        else {
            tracing::debug!(target: LOG_TARGET, "frame loaded without a credential to forward");
            return;
        };
        let Some(frame_window) = target.content_window() else {
            tracing::warn!(target: LOG_TARGET, "frame window is unavailable");
            return;
        };
        if let Err(error) = post_bridge_message(&frame_window, &message) {
            tracing::error!(target: LOG_TARGET, %error, "failed to initialize frame");
        }
    }) as Box<dyn FnMut(web_sys::Event)>);

    frame
        .add_event_listener_with_callback("load", callback.as_ref().unchecked_ref())
        .map_err(|_| "failed to bind frame load handler".to_string())?;
    FRAME_LOAD_HANDLER.with(|slot| {
        *slot.borrow_mut() = Some(callback);
    });
    Ok(())
}

fn install_host_message_handler(window: &web_sys::Window) -> Result<(), String> {
    let callback = Closure::wrap(Box::new(move |event: web_sys::Event| {
        let Some((origin, message)) = decode_message_event(&event) else {
            return;
        };
        let Some(effect) = HOST.with(|slot| {
            slot.borrow_mut()
                .as_mut()
                .map(|session| session.receive(&origin, message))
        }) else {
            return;
        };
        if let Err(error) = apply_host_effect(effect) {
            tracing::error!(target: LOG_TARGET, %error, "failed to apply bridge message");
        }
    }) as Box<dyn FnMut(web_sys::Event)>);

    window
        .add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())
        .map_err(|_| "failed to bind host message handler".to_string())?;
    HOST_MESSAGE_HANDLER.with(|slot| {
        *slot.borrow_mut() = Some(callback);
    });
    Ok(())
}

fn apply_host_effect(effect: HostEffect) -> Result<(), String> {
    match effect {
        HostEffect::SetPanelHeight(height) => HOST_DOM.with(|slot| {
            let slot = slot.borrow();
            let dom = slot
                .as_ref()
                .ok_or_else(|| "host DOM is not mounted".to_string())?;
            dom.container
                .style()
                .set_property("height", &height)
                .map_err(|_| "failed to set panel height".to_string())
        }),
        HostEffect::CredentialReplaced => {
            let window = web_sys::window().ok_or_else(|| "window is unavailable".to_string())?;
            let status = HOST.with(|slot| slot.borrow().as_ref().map(HostSession::status));
            match status {
                Some(status) => publish_status(&window, &status),
                None => Ok(()),
            }
        }
        HostEffect::Ignored => Ok(()),
    }
}
