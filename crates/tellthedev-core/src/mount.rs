use crate::LOG_TARGET;
use crate::bridge::{BridgeMessage, OriginPolicy};
use crate::credential::{Credential, TrustVerdict, WidgetStatus};

pub const ERROR_PANEL_MESSAGE: &str = "❌ Oops! This feedback widget wasn't set up properly. Invalid project ID. Please contact the site owner.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPanel {
    #[default]
    NotCreated,
    Hidden,
    Shown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    PanelShown,
    PanelHidden,
    /// First untrusted click: the error panel must be built before showing.
    ErrorPanelCreated,
    ErrorPanelShown,
    ErrorPanelHidden,
}

impl ToggleOutcome {
    #[must_use]
    pub fn affects_error_panel(self) -> bool {
        !matches!(self, Self::PanelShown | Self::PanelHidden)
    }

    #[must_use]
    pub fn is_visible(self) -> bool {
        matches!(
            self,
            Self::PanelShown | Self::ErrorPanelCreated | Self::ErrorPanelShown
        )
    }
}

/// Visibility of the widget panel and the error panel, tracked independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPanels {
    pub panel_visible: bool,
    pub error_panel: ErrorPanel,
}

impl HostPanels {
    pub fn toggle(&mut self, trusted: bool) -> ToggleOutcome {
        if trusted {
            self.panel_visible = !self.panel_visible;
            return if self.panel_visible {
                ToggleOutcome::PanelShown
            } else {
                ToggleOutcome::PanelHidden
            };
        }

        tracing::info!(target: LOG_TARGET, "invalid or missing credential; showing error panel");
        let (next, outcome) = match self.error_panel {
            ErrorPanel::NotCreated => (ErrorPanel::Shown, ToggleOutcome::ErrorPanelCreated),
            ErrorPanel::Hidden => (ErrorPanel::Shown, ToggleOutcome::ErrorPanelShown),
            ErrorPanel::Shown => (ErrorPanel::Hidden, ToggleOutcome::ErrorPanelHidden),
        };
        self.error_panel = next;
        outcome
    }
}

/// What the host side must do after a bridge message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEffect {
    SetPanelHeight(String),
    CredentialReplaced,
    Ignored,
}

/// Host-page session: credential, verdict, panel state.
#[derive(Debug, Clone)]
pub struct HostSession {
    credential: Option<Credential>,
    verdict: Option<TrustVerdict>,
    origin_policy: OriginPolicy,
    pub panels: HostPanels,
    panel_height: Option<String>,
}

impl HostSession {
    #[must_use]
    pub fn new(
        credential: Option<Credential>,
        verdict: Option<TrustVerdict>,
        origin_policy: OriginPolicy,
    ) -> Self {
        Self {
            credential,
            verdict,
            origin_policy,
            panels: HostPanels::default(),
            panel_height: None,
        }
    }

    #[must_use]
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    #[must_use]
    pub fn is_trusted(&self) -> bool {
        self.verdict.as_ref().is_some_and(|verdict| verdict.valid)
    }

    #[must_use]
    pub fn panel_height(&self) -> Option<&str> {
        self.panel_height.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> WidgetStatus {
        WidgetStatus::from_verdict(self.credential.as_ref(), self.verdict.as_ref())
    }

    pub fn toggle(&mut self) -> ToggleOutcome {
        let trusted = self.is_trusted();
        self.panels.toggle(trusted)
    }

    /// The message the host posts into the frame once it has loaded.
    #[must_use]
    pub fn init_message(&self) -> Option<BridgeMessage> {
        self.credential.clone().map(BridgeMessage::Init)
    }

    /// Applies a message from the frame. The verdict is never recomputed.
    pub fn receive(&mut self, origin: &str, message: BridgeMessage) -> HostEffect {
        if !self.origin_policy.allows(origin) {
            tracing::warn!(target: LOG_TARGET, origin, "dropping message from disallowed origin");
            return HostEffect::Ignored;
        }
        match message {
            BridgeMessage::Resize(height) => {
                let css = height.css_value();
                self.panel_height = Some(css.clone());
                HostEffect::SetPanelHeight(css)
            }
            BridgeMessage::Init(credential) => {
                tracing::info!(target: LOG_TARGET, kind = ?credential.kind, "widget initialized with credential from frame");
                self.credential = Some(credential);
                HostEffect::CredentialReplaced
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ResizeHeight;
    use serde_json::json;

    fn trusted_session() -> HostSession {
        HostSession::new(
            Credential::api_key("abc123"),
            Some(TrustVerdict {
                valid: true,
                environment: Some("prod".to_string()),
                settings: None,
            }),
            OriginPolicy::AcceptAll,
        )
    }

    #[test]
    fn trusted_toggle_flips_widget_panel_only() {
        let mut session = trusted_session();
        assert_eq!(session.toggle(), ToggleOutcome::PanelShown);
        assert_eq!(session.toggle(), ToggleOutcome::PanelHidden);
        assert_eq!(session.panels.error_panel, ErrorPanel::NotCreated);
    }

    #[test]
    fn untrusted_toggle_creates_error_panel_once() {
        let mut session = HostSession::new(None, None, OriginPolicy::AcceptAll);
        assert_eq!(session.toggle(), ToggleOutcome::ErrorPanelCreated);
        assert_eq!(session.toggle(), ToggleOutcome::ErrorPanelHidden);
        assert_eq!(session.toggle(), ToggleOutcome::ErrorPanelShown);
        assert!(!session.panels.panel_visible);
        assert!(ERROR_PANEL_MESSAGE.contains("Invalid project ID."));
    }

    #[test]
    fn resize_sets_height_and_last_value_wins() {
        let mut session = trusted_session();
        let effect = session.receive("*", BridgeMessage::Resize(ResizeHeight::pixels(480)));
        assert_eq!(effect, HostEffect::SetPanelHeight("480px".to_string()));
        session.receive("*", BridgeMessage::Resize(ResizeHeight(json!(100000))));
        assert_eq!(session.panel_height(), Some("100000px"));
    }

    #[test]
    fn frame_init_replaces_host_credential_but_not_verdict() {
        let mut session = trusted_session();
        let replacement = Credential::api_key("from-frame").expect("credential");
        assert_eq!(
            session.receive("https://tellthedev.vercel.app", BridgeMessage::Init(replacement.clone())),
            HostEffect::CredentialReplaced
        );
        assert_eq!(session.credential(), Some(&replacement));
        assert!(session.is_trusted());
        assert_eq!(session.init_message(), Some(BridgeMessage::Init(replacement)));
    }

    #[test]
    fn allow_list_drops_foreign_messages() {
        let mut session = HostSession::new(
            None,
            None,
            OriginPolicy::parse("https://tellthedev.vercel.app"),
        );
        let effect = session.receive(
            "https://evil.example",
            BridgeMessage::Resize(ResizeHeight::pixels(1)),
        );
        assert_eq!(effect, HostEffect::Ignored);
        assert_eq!(session.panel_height(), None);
    }
}
