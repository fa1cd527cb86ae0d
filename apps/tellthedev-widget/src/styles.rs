use tellthedev_core::environment::Palette;

/// Stylesheet injected into the shadow root; only the palette varies.
pub(crate) fn host_stylesheet(colors: &Palette) -> String {
    format!(
        r#"
.tellthedev-widget-container,
.tellthedev-error-container {{
    position: fixed;
    bottom: 80px;
    right: 20px;
    width: 400px;
    height: auto;
    z-index: 9999;
    box-shadow: 0 2px 8px rgba(0,0,0,0.1);
    border-radius: 12px;
    overflow: hidden;
    background: {white};
    display: none;
    transition: transform 0.3s cubic-bezier(0.4, 0, 0.2, 1);
    transform: translateY(20px);
    opacity: 0;
}}

.tellthedev-widget-container {{ padding: 0; }}
.tellthedev-error-container {{ padding: 16px; }}

.tellthedev-widget-container.show,
.tellthedev-error-container.show {{
    display: block;
    transform: translateY(0);
    opacity: 1;
}}

.tellthedev-widget-container iframe {{
    width: 100%;
    height: 100%;
    border: none;
    display: block;
    margin: 0;
    padding: 0;
}}

.tellthedev-toggle-button {{
    position: fixed;
    bottom: 20px;
    right: 20px;
    width: 48px;
    height: 48px;
    border-radius: 50%;
    background-color: {primary};
    border: none;
    cursor: pointer;
    z-index: 10000;
    box-shadow: 0 4px 12px rgba(0, 0, 255, 0.3);
    transition: all 0.2s ease;
    padding: 12px;
    display: flex;
    align-items: center;
    justify-content: center;
}}

.tellthedev-toggle-button:hover {{
    background-color: {primary_hover};
    transform: translateY(-1px);
    box-shadow: 0 6px 16px rgba(0, 0, 255, 0.4);
}}

.tellthedev-toggle-button:active {{ transform: translateY(0); }}

.tellthedev-toggle-button img {{
    width: 100%;
    height: 100%;
    object-fit: contain;
}}

.tellthedev-error-message {{
    color: #dc2626;
    font-size: 14px;
    line-height: 1.5;
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    margin: 0;
}}
"#,
        white = colors.white,
        primary = colors.primary,
        primary_hover = colors.primary_hover,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_uses_palette_colors() {
        let palette = Palette {
            primary: "#123456".to_string(),
            primary_hover: "#654321".to_string(),
            white: "#fefefe".to_string(),
        };
        let css = host_stylesheet(&palette);
        assert!(css.contains("background-color: #123456;"));
        assert!(css.contains("background-color: #654321;"));
        assert!(css.contains("background: #fefefe;"));
    }

    #[test]
    fn visibility_is_driven_by_show_class() {
        let css = host_stylesheet(&Palette::default());
        assert!(css.contains(".tellthedev-widget-container.show"));
        assert!(css.contains(".tellthedev-error-container.show"));
    }
}
