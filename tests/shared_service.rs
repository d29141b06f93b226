//! The process-wide service lives in a `OnceCell`, so this binary owns its
//! lifecycle: configure once, then every accessor sees the same instance.

use std::sync::Arc;

use fenceline::application::render::{
    RenderConfigError, RenderPipelineConfig, init_render_service, prefix_resolver, render,
    render_service,
};

#[test]
fn shared_service_is_configured_once() {
    let configured = init_render_service(RenderPipelineConfig {
        link_resolver: Some(prefix_resolver("/docs/")),
        sanitize: false,
        ..RenderPipelineConfig::default()
    })
    .expect("first initialisation succeeds");

    assert!(Arc::ptr_eq(&configured, &render_service()));

    let second = init_render_service(RenderPipelineConfig::default());
    assert!(matches!(second, Err(RenderConfigError::AlreadyConfigured)));

    let output = render("---\ntitle: Shared\n---\n[next](next.md)\n").expect("render");
    assert_eq!(output.attributes.get("title").map(String::as_str), Some("Shared"));
    assert_eq!(output.html, "<p><a href=\"/docs/next\">next</a></p>\n");
}
