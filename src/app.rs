use leptos::prelude::*;

use crate::components::CubeViewer;

#[component]
pub fn App() -> impl IntoView {
    view! {
        <div class="app-container">
            <main class="hero">
                <CubeViewer/>
            </main>
        </div>
    }
}
