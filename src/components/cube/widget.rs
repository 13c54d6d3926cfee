//! DOM glue for the cube widget
//!
//! Attaches the pure scene/controller modules to a real container: sizes
//! the canvas, registers pointer/resize/visibility listeners plus the
//! intersection observer, and drives frames with `requestAnimationFrame`.
//! All browser access lives here.

use std::cell::RefCell;
use std::rc::Rc;

use glam::DVec2;
use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    console, CanvasRenderingContext2d, Event, EventTarget, HtmlCanvasElement, HtmlElement,
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit, MouseEvent,
};

use super::controller::{CubeController, RESUME_DELAY_MS};
use super::envmap::{EnvMapGenerator, SPHERE_COLOR};
use super::raster::{self, PixelBuffer};
use super::scene::{Camera, Scene};
use super::viewport::Viewport;
use super::visibility::{VisibilityGate, INTERSECTION_THRESHOLD};

/// Fixed id of the render surface expected inside the container
pub const CANVAS_ID: &str = "cube-canvas";

type SharedController = Rc<RefCell<CubeController>>;
type FrameClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;
type FrameId = Rc<RefCell<Option<i32>>>;
type ResumeTimer = Rc<RefCell<Option<Timeout>>>;

/// Everything the frame callback mutates while rendering
struct RenderState {
    scene: Scene,
    camera: Camera,
    viewport: Viewport,
    pixels: PixelBuffer,
    depth: Vec<f32>,
    ctx: CanvasRenderingContext2d,
    canvas: HtmlCanvasElement,
    container: HtmlElement,
}

/// A registered event listener, removed again on detach
struct Listener {
    target: EventTarget,
    name: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn add(target: &EventTarget, name: &'static str, closure: Closure<dyn FnMut(Event)>) -> Self {
        target
            .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
            .ok();
        Self {
            target: target.clone(),
            name,
            closure,
        }
    }

    fn remove(&self) {
        self.target
            .remove_event_listener_with_callback(self.name, self.closure.as_ref().unchecked_ref())
            .ok();
    }
}

/// A live widget instance bound to one container.
///
/// Dropped listeners would leak their JS closures, so keep the instance
/// around and call [`detach`] when the host region goes away.
///
/// [`detach`]: CubeWidget::detach
pub struct CubeWidget {
    controller: SharedController,
    raf_id: FrameId,
    frame_closure: FrameClosure,
    resume_timer: ResumeTimer,
    observer: IntersectionObserver,
    _observer_closure: Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>,
    listeners: Vec<Listener>,
}

impl CubeWidget {
    /// Attach to the container with the given id.
    ///
    /// A missing container, missing `#cube-canvas` surface or unavailable 2D
    /// context is logged and leaves the widget unbuilt; nothing propagates
    /// to the host page.
    pub fn attach(container_id: &str) -> Option<CubeWidget> {
        let window = web_sys::window()?;
        let document = window.document()?;

        let Some(container) = document.get_element_by_id(container_id) else {
            console::error_1(&format!("Container with id \"{container_id}\" not found.").into());
            return None;
        };
        let Ok(container) = container.dyn_into::<HtmlElement>() else {
            console::error_1(&format!("Container \"{container_id}\" is not an HTML element.").into());
            return None;
        };
        let canvas = match container.query_selector(&format!("#{CANVAS_ID}")) {
            Ok(Some(surface)) => match surface.dyn_into::<HtmlCanvasElement>() {
                Ok(canvas) => canvas,
                Err(_) => {
                    console::error_1(&"Render surface is not a canvas.".into());
                    return None;
                }
            },
            _ => {
                console::error_1(&"Canvas not found inside container.".into());
                return None;
            }
        };

        let width = f64::from(container.client_width());
        let height = f64::from(container.client_height());
        let viewport = Viewport::new(width, height, window.device_pixel_ratio());
        canvas.set_width(viewport.buffer_width());
        canvas.set_height(viewport.buffer_height());

        let ctx = match canvas.get_context("2d") {
            Ok(Some(ctx)) => match ctx.dyn_into::<CanvasRenderingContext2d>() {
                Ok(ctx) => ctx,
                Err(_) => {
                    console::error_1(&"2D context has an unexpected type.".into());
                    return None;
                }
            },
            _ => {
                console::error_1(&"Could not acquire a 2D rendering context.".into());
                return None;
            }
        };

        let mut scene = Scene::build(width, height);
        // One-shot bake; the generator and its scratch space are released
        // as soon as this call returns.
        scene.environment = Some(EnvMapGenerator::new().bake(SPHERE_COLOR));

        let pixels = PixelBuffer::new(viewport.buffer_width(), viewport.buffer_height());
        let depth = vec![
            f32::INFINITY;
            (viewport.buffer_width() * viewport.buffer_height()) as usize
        ];
        let render = Rc::new(RefCell::new(RenderState {
            scene,
            camera: Camera::new(),
            viewport,
            pixels,
            depth,
            ctx,
            canvas: canvas.clone(),
            container: container.clone(),
        }));

        let controller: SharedController = Rc::new(RefCell::new(CubeController::new()));
        let gate = Rc::new(RefCell::new(VisibilityGate::new()));
        let raf_id: FrameId = Rc::new(RefCell::new(None));
        let frame_closure: FrameClosure = Rc::new(RefCell::new(None));
        let resume_timer: ResumeTimer = Rc::new(RefCell::new(None));

        // Per-frame callback: re-arm first, then advance state and render.
        {
            let controller = controller.clone();
            let render = render.clone();
            let raf_id = raf_id.clone();
            let closure_slot = frame_closure.clone();
            let closure = Closure::<dyn FnMut()>::new(move || {
                if !controller.borrow().is_running() {
                    return;
                }
                schedule_frame(&raf_id, &closure_slot);
                let Some(frame) = controller.borrow_mut().tick() else {
                    return;
                };
                let mut state = render.borrow_mut();
                let state = &mut *state;
                state.scene.orbit.position = frame.orbit_light.as_vec3();
                raster::render(
                    &state.scene,
                    &state.camera,
                    frame.rotation.as_vec2(),
                    &mut state.pixels,
                    &mut state.depth,
                );
                if let Ok(image) = state.pixels.to_image_data() {
                    state.ctx.put_image_data(&image, 0.0, 0.0).ok();
                }
            });
            *frame_closure.borrow_mut() = Some(closure);
        }

        let mut listeners = Vec::new();

        let mousedown = {
            let controller = controller.clone();
            let resume_timer = resume_timer.clone();
            Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                // A new drag supersedes any pending auto-rotate resume
                resume_timer.borrow_mut().take();
                controller.borrow_mut().pointer_down(DVec2::new(
                    f64::from(mouse.client_x()),
                    f64::from(mouse.client_y()),
                ));
            })
        };
        listeners.push(Listener::add(canvas.as_ref(), "mousedown", mousedown));

        let mousemove = {
            let controller = controller.clone();
            Closure::<dyn FnMut(Event)>::new(move |event: Event| {
                let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                controller.borrow_mut().pointer_move(DVec2::new(
                    f64::from(mouse.client_x()),
                    f64::from(mouse.client_y()),
                ));
            })
        };
        listeners.push(Listener::add(canvas.as_ref(), "mousemove", mousemove));

        listeners.push(Listener::add(
            canvas.as_ref(),
            "mouseup",
            end_drag_closure(&controller, &resume_timer),
        ));
        listeners.push(Listener::add(
            canvas.as_ref(),
            "mouseleave",
            end_drag_closure(&controller, &resume_timer),
        ));

        let resize = {
            let render = render.clone();
            Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                let mut state = render.borrow_mut();
                let state = &mut *state;
                let width = f64::from(state.container.client_width());
                let height = f64::from(state.container.client_height());
                if !state.viewport.resize(width, height) {
                    return;
                }
                let (bw, bh) = (state.viewport.buffer_width(), state.viewport.buffer_height());
                state.canvas.set_width(bw);
                state.canvas.set_height(bh);
                state.pixels.resize(bw, bh);
                state.depth.clear();
                state.depth.resize((bw * bh) as usize, f32::INFINITY);
            })
        };
        listeners.push(Listener::add(window.as_ref(), "resize", resize));

        let visibility = {
            let gate = gate.clone();
            let controller = controller.clone();
            let raf_id = raf_id.clone();
            let frame_closure = frame_closure.clone();
            Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                let hidden = web_sys::window()
                    .and_then(|w| w.document())
                    .map(|d| d.hidden())
                    .unwrap_or(true);
                let visible = gate.borrow_mut().set_page_visible(!hidden);
                apply_gate(visible, &controller, &raf_id, &frame_closure);
            })
        };
        listeners.push(Listener::add(document.as_ref(), "visibilitychange", visibility));

        let observer_closure = {
            let gate = gate.clone();
            let controller = controller.clone();
            let raf_id = raf_id.clone();
            let frame_closure = frame_closure.clone();
            Closure::<dyn FnMut(js_sys::Array, IntersectionObserver)>::new(
                move |entries: js_sys::Array, _observer: IntersectionObserver| {
                    for entry in entries.iter() {
                        let entry: IntersectionObserverEntry = entry.unchecked_into();
                        let visible = gate
                            .borrow_mut()
                            .set_intersection_ratio(entry.intersection_ratio());
                        apply_gate(visible, &controller, &raf_id, &frame_closure);
                    }
                },
            )
        };
        let options = IntersectionObserverInit::new();
        options.set_threshold(&JsValue::from_f64(INTERSECTION_THRESHOLD));
        let observer = match IntersectionObserver::new_with_options(
            observer_closure.as_ref().unchecked_ref(),
            &options,
        ) {
            Ok(observer) => observer,
            Err(_) => {
                console::error_1(&"IntersectionObserver is unavailable.".into());
                return None;
            }
        };
        // Fires immediately with the current intersection state, which
        // starts the loop if the widget is already on-screen.
        observer.observe(&container);

        Some(CubeWidget {
            controller,
            raf_id,
            frame_closure,
            resume_timer,
            observer,
            _observer_closure: observer_closure,
            listeners,
        })
    }

    /// Tear the widget down: stop the loop, cancel any pending frame and
    /// timer, disconnect the observer and remove every listener.
    pub fn detach(self) {
        self.observer.disconnect();
        for listener in &self.listeners {
            listener.remove();
        }
        self.controller.borrow_mut().stop();
        cancel_frame(&self.raf_id);
        self.frame_closure.borrow_mut().take();
        self.resume_timer.borrow_mut().take();
    }
}

/// Closure shared by mouseup and mouseleave: end the drag and arm the
/// auto-rotate resume timer.
fn end_drag_closure(
    controller: &SharedController,
    resume_timer: &ResumeTimer,
) -> Closure<dyn FnMut(Event)> {
    let controller = controller.clone();
    let resume_timer = resume_timer.clone();
    Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
        if controller.borrow_mut().pointer_up() {
            let controller = controller.clone();
            let timer = Timeout::new(RESUME_DELAY_MS, move || {
                controller.borrow_mut().resume_auto();
            });
            *resume_timer.borrow_mut() = Some(timer);
        }
    })
}

/// Schedule the next animation frame, remembering its id for cancellation.
fn schedule_frame(raf_id: &FrameId, frame_closure: &FrameClosure) {
    let Some(window) = web_sys::window() else {
        return;
    };
    if let Some(closure) = frame_closure.borrow().as_ref() {
        if let Ok(id) = window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            *raf_id.borrow_mut() = Some(id);
        }
    }
}

fn cancel_frame(raf_id: &FrameId) {
    if let Some(id) = raf_id.borrow_mut().take() {
        if let Some(window) = web_sys::window() {
            window.cancel_animation_frame(id).ok();
        }
    }
}

/// Map the gate's combined visibility onto the loop; both directions are
/// idempotent.
fn apply_gate(
    visible: bool,
    controller: &SharedController,
    raf_id: &FrameId,
    frame_closure: &FrameClosure,
) {
    if visible {
        if controller.borrow_mut().start() {
            schedule_frame(raf_id, frame_closure);
        }
    } else {
        controller.borrow_mut().stop();
        cancel_frame(raf_id);
    }
}
