pub(crate) const SHADOW_HOST_ID: &str = "tellthedev-shadow-root";
pub(crate) const TOGGLE_BUTTON_CLASS: &str = "tellthedev-toggle-button";
pub(crate) const WIDGET_CONTAINER_CLASS: &str = "tellthedev-widget-container";
pub(crate) const ERROR_CONTAINER_CLASS: &str = "tellthedev-error-container";
pub(crate) const ERROR_MESSAGE_CLASS: &str = "tellthedev-error-message";
pub(crate) const SHOW_CLASS: &str = "show";
pub(crate) const HIDDEN_CLASS: &str = "hidden";
pub(crate) const EMBED_SCRIPT_SELECTOR: &str =
    "script[data-api-key], script[data-project-id], script[data-tellthedev-frame]";
pub(crate) const STATUS_GLOBAL: &str = "TellTheDev";
pub(crate) const LOGO_ALT: &str = "TellTheDev";

pub(crate) const FORM_SELECTOR: &str = "form";
pub(crate) const MESSAGE_SELECTOR: &str = "textarea";
pub(crate) const IMAGE_INPUT_SELECTOR: &str = "input[type=\"file\"]";
pub(crate) const SUBMIT_BUTTON_SELECTOR: &str = "button[type='submit']";
pub(crate) const TYPE_BUTTON_SELECTOR: &str = "[data-type]";
pub(crate) const MESSAGE_ERROR_IDS: [&str; 2] = ["message-error", "content-error"];
pub(crate) const IMAGE_ERROR_ID: &str = "image-error";
pub(crate) const TYPE_ERROR_ID: &str = "type-error";
pub(crate) const FORM_ALERT_ID: &str = "form-error-alert";
pub(crate) const SELECTED_TYPE_CLASSES: [&str; 3] = ["bg-blue-600", "text-white", "hover:bg-blue-600"];
