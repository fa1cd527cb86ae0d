use serde::{Deserialize, Serialize};

pub const DEV_BASE_URL: &str = "http://127.0.0.1:5500";
pub const DEV_FUNCTIONS_URL: &str = "http://127.0.0.1:54321/functions/v1";
pub const PROD_BASE_URL: &str = "https://tellthedev.vercel.app";
pub const PROD_FUNCTIONS_URL: &str = "https://tellthedev.functions.supabase.co";
pub const FRAME_PATH: &str = "/iframe.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Picks development only for loopback hosts and `*.local` names.
#[must_use]
pub fn resolve_environment(hostname: &str) -> Environment {
    let normalized = hostname.trim().trim_end_matches('.').to_ascii_lowercase();
    if normalized == "localhost" || normalized == "127.0.0.1" || normalized.ends_with(".local") {
        Environment::Development
    } else {
        Environment::Production
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub primary: String,
    pub primary_hover: String,
    pub white: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: "#0000ff".to_string(),
            primary_hover: "#0000cc".to_string(),
            white: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUrls {
    pub logo_icon: String,
    pub logo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub environment: Environment,
    pub base_url: String,
    pub functions_url: String,
    pub frame_url: String,
    pub assets: AssetUrls,
    pub colors: Palette,
}

impl WidgetConfig {
    #[must_use]
    pub fn for_hostname(hostname: &str) -> Self {
        Self::for_environment(resolve_environment(hostname))
    }

    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        let (base_url, functions_url, asset_prefix) = match environment {
            Environment::Development => (DEV_BASE_URL, DEV_FUNCTIONS_URL, ""),
            Environment::Production => (PROD_BASE_URL, PROD_FUNCTIONS_URL, PROD_BASE_URL),
        };
        Self {
            environment,
            base_url: base_url.to_string(),
            functions_url: functions_url.to_string(),
            frame_url: format!("{base_url}{FRAME_PATH}"),
            assets: AssetUrls {
                logo_icon: format!("{asset_prefix}/assets/images/logo-icon-white.svg"),
                logo: format!("{asset_prefix}/assets/images/logo.svg"),
            },
            colors: Palette::default(),
        }
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.functions_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
