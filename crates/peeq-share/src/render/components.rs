//! Shared HTML fragments for the share page.

use maud::{Markup, PreEscaped, html};

use crate::config::AnalyticsConfig;

/// Inline CSS shown until the client application mounts.
pub const PAGE_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:Inter,-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;background:#000;color:#fff;min-height:100vh}
#root{min-height:100vh}
.boot{display:flex;align-items:center;justify-content:center;min-height:100vh}
.boot img{max-width:min(90vw,450px);height:auto;border-radius:12px}
"#;

/// Open Graph metadata for a page.
pub struct OpenGraphData<'a> {
    pub url: &'a str,
    pub og_type: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub image: &'a str,
    pub image_width: u32,
    pub image_height: u32,
}

/// Open Graph and Twitter card `<meta>` tags.
pub fn open_graph_tags(og: &OpenGraphData<'_>) -> Markup {
    html! {
        meta property="og:url" content=(og.url);
        meta property="og:type" content=(og.og_type);
        meta property="og:title" content=(og.title);
        meta property="og:description" content=(og.description);
        meta property="og:image" content=(og.image);
        meta property="og:image:type" content="image/png";
        meta property="og:image:width" content=(og.image_width);
        meta property="og:image:height" content=(og.image_height);

        meta name="twitter:card" content="summary_large_image";
        meta name="twitter:title" content=(og.title);
        meta name="twitter:description" content=(og.description);
        meta name="twitter:image" content=(og.image);
    }
}

/// Serialize a value for embedding inside a `<script>` element.
///
/// `<` is escaped so no string value can close the script early.
fn script_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
}

/// Analytics bootstrap: exposes the config to the client app and, when a
/// measurement id is configured, loads gtag.
pub fn analytics_bootstrap(analytics: &AnalyticsConfig) -> Markup {
    let config_json = script_json(analytics);
    let measurement_id = script_json(&analytics.measurement_id);

    html! {
        script {
            (PreEscaped(format!("window.peeqAnalyticsConfig={config_json};")))
        }
        @if !analytics.measurement_id.is_empty() {
            script defer src={"https://www.googletagmanager.com/gtag/js?id=" (analytics.measurement_id)} {}
            script {
                (PreEscaped(format!(
                    "window.dataLayer=window.dataLayer||[];function gtag(){{dataLayer.push(arguments);}}gtag('js',new Date());gtag('config',{measurement_id});"
                )))
            }
        }
    }
}

/// Load the pre-built client bundle if it exists; otherwise log to the console.
pub fn bundle_loader(bundle_path: &str) -> Markup {
    let path = script_json(&bundle_path);

    html! {
        script {
            (PreEscaped(format!(
                "(function(){{var src={path};fetch(src,{{method:'HEAD'}}).then(function(r){{if(!r.ok){{throw new Error('status '+r.status);}}var s=document.createElement('script');s.src=src;s.defer=true;document.body.appendChild(s);}}).catch(function(e){{console.error('peeq: client bundle unavailable at '+src,e);}});}})();"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn og_tags_carry_dimensions() {
        let og = OpenGraphData {
            url: "https://peeq.app/share/abc",
            og_type: "website",
            title: "Peeq",
            description: "Watch",
            image: "https://cdn.example/overlay_abc",
            image_width: 450,
            image_height: 800,
        };
        let html = open_graph_tags(&og).into_string();
        assert!(html.contains(r#"<meta property="og:image" content="https://cdn.example/overlay_abc">"#));
        assert!(html.contains(r#"<meta property="og:image:width" content="450">"#));
        assert!(html.contains(r#"<meta property="og:image:height" content="800">"#));
        assert!(html.contains(r#"<meta property="og:type" content="website">"#));
    }

    #[test]
    fn script_json_cannot_close_script() {
        let json = script_json(&"</script><script>alert(1)</script>");
        assert!(!json.contains("</script>"));
    }

    #[test]
    fn gtag_only_with_measurement_id() {
        let without = analytics_bootstrap(&AnalyticsConfig::default()).into_string();
        assert!(without.contains("window.peeqAnalyticsConfig="));
        assert!(!without.contains("googletagmanager"));

        let with = analytics_bootstrap(&AnalyticsConfig {
            measurement_id: "G-TEST123".to_string(),
            ..AnalyticsConfig::default()
        })
        .into_string();
        assert!(with.contains("gtag/js?id=G-TEST123"));
        assert!(with.contains(r#"gtag('config',"G-TEST123")"#));
        assert!(with.contains(r#""measurementId":"G-TEST123""#));
    }

    #[test]
    fn bundle_loader_falls_back_to_console() {
        let html = bundle_loader("/static/js/main.js").into_string();
        assert!(html.contains(r#"var src="/static/js/main.js""#));
        assert!(html.contains("console.error"));
    }
}
