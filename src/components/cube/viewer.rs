//! Leptos wrapper for the cube widget
//!
//! Renders the container/canvas markup and binds a [`CubeWidget`] to it on
//! mount, detaching again when the component is removed.

use leptos::prelude::*;

use super::widget::{CubeWidget, CANVAS_ID};

/// Decorative rotating cube viewer
///
/// Attaches after a short delay so the container has a laid-out size before
/// the canvas is measured.
#[component]
pub fn CubeViewer(
    /// Id of the hosting container element
    #[prop(default = "rubik-3d".to_string())]
    container_id: String,
) -> impl IntoView {
    let widget: StoredValue<Option<CubeWidget>, LocalStorage> = StoredValue::new_local(None);

    let id_mount = container_id.clone();
    Effect::new(move || {
        if widget.with_value(|w| w.is_some()) {
            return;
        }
        let id = id_mount.clone();
        gloo_timers::callback::Timeout::new(100, move || {
            widget.try_set_value(CubeWidget::attach(&id));
        })
        .forget();
    });

    on_cleanup(move || {
        if let Some(widget) = widget.try_update_value(|w| w.take()).flatten() {
            widget.detach();
        }
    });

    view! {
        <div id=container_id class="cube-viewer">
            <canvas id=CANVAS_ID class="cube-canvas"/>
            <div class="cube-controls">
                <span class="cube-hint">"Drag to rotate"</span>
            </div>
        </div>
    }
}
