use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes},
};

use maskpaint::{
    brush::BrushMode,
    config::{DEFAULT_CONFIG_FILE, EditorConfig},
    editor::{Editor, TaskAction},
    error::EditError,
    gesture::Point,
    gpu::Gpu,
    input::{MOUSE_POINTER, TouchTracker},
    jobs::Dispatch,
    outbox::OutboxService,
    service::InpaintService,
};

const BRUSH_STEP: f32 = 2.0;
/// How often background job results are checked while the window is idle.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Paint inpainting masks over images and hand them to an inpainting service.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Image to open at startup
    image: Option<PathBuf>,

    /// Settings file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

fn report(action: &str, result: Result<(), EditError>) {
    match result {
        Ok(()) => {}
        Err(e @ (EditError::NoImage | EditError::HistoryUnderflow)) => {
            log::debug!("{}: {}", action, e)
        }
        Err(e) => log::warn!("{} failed: {}", action, e),
    }
}

fn to_point(pos: PhysicalPosition<f64>) -> Point {
    Point::new(pos.x as f32, pos.y as f32)
}

fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Images", &["png", "jpg", "jpeg", "gif"])
        .pick_file()
}

fn task_action(editor: &mut Editor, action: TaskAction) {
    if !editor.act_on_selected(action) {
        log::info!("No task selected, refresh with T and pick one with the arrow keys");
    }
}

fn handle_key(code: KeyCode, editor: &mut Editor) {
    match code {
        KeyCode::KeyO => {
            if let Some(path) = pick_image() {
                report("open", editor.open_image(&path));
            }
        }
        KeyCode::KeyU => report("undo", editor.undo()),
        KeyCode::KeyC => report("clear", editor.clear_mask()),
        KeyCode::KeyA => editor.set_brush_mode(BrushMode::Add),
        KeyCode::KeyE => editor.set_brush_mode(BrushMode::Erase),
        KeyCode::KeyM => editor.set_brush_mode(BrushMode::Move),
        KeyCode::BracketLeft => editor.adjust_brush_size(-BRUSH_STEP),
        KeyCode::BracketRight => editor.adjust_brush_size(BRUSH_STEP),
        KeyCode::Equal => report("zoom in", editor.zoom_in()),
        KeyCode::Minus => report("zoom out", editor.zoom_out()),
        KeyCode::KeyF => report("fit", editor.fit()),
        KeyCode::KeyR => report("reset view", editor.reset_view()),
        KeyCode::KeyI => report("inpaint", editor.request_inpaint()),
        KeyCode::KeyT => {
            if editor.tasks().credentials_required() {
                editor.renew_credentials();
            } else {
                editor.refresh_tasks();
            }
        }
        KeyCode::PageUp => {
            let page = editor.tasks().page().saturating_sub(1);
            editor.show_task_page(page);
        }
        KeyCode::PageDown => {
            let page = editor.tasks().page() + 1;
            editor.show_task_page(page);
        }
        KeyCode::ArrowDown => editor.select_next_task(),
        KeyCode::ArrowUp => editor.select_prev_task(),
        KeyCode::Enter => task_action(editor, TaskAction::Open),
        KeyCode::KeyP => task_action(editor, TaskAction::ShowResult),
        KeyCode::KeyG => task_action(editor, TaskAction::Reprocess),
        KeyCode::Delete | KeyCode::Backspace => task_action(editor, TaskAction::Delete),
        KeyCode::Escape => {
            editor.close_preview();
        }
        _ => {}
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match EditorConfig::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Could not read {}: {}", args.config.display(), e);
            std::process::exit(1);
        }
    };
    let service: Arc<dyn InpaintService> = match OutboxService::new(&config.outbox_dir) {
        Ok(outbox) => {
            log::info!("Spooling requests to {}", outbox.dir().display());
            Arc::new(outbox)
        }
        Err(e) => {
            log::error!("Could not prepare {}: {}", config.outbox_dir.display(), e);
            std::process::exit(1);
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Could not start the event loop: {}", e);
            std::process::exit(1);
        }
    };
    let mut gpu: Option<Gpu> = None;
    let mut window: Option<Arc<Window>> = None;
    let mut editor = match Editor::new(config, service, Dispatch::Pool, 1, 1) {
        Ok(editor) => editor,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    let mut title = String::new();
    let mut startup_image = args.image;
    let mut touches = TouchTracker::new();
    let mut cursor = Point::new(0.0, 0.0);

    let result = event_loop.run(move |event, elwt| match event {
        Event::Resumed => {
            if gpu.is_some() {
                return;
            }
            let attrs = WindowAttributes::default()
                .with_title("maskpaint")
                .with_inner_size(LogicalSize::new(800.0, 600.0));
            let w = match elwt.create_window(attrs) {
                Ok(w) => Arc::new(w),
                Err(e) => {
                    log::error!("Could not create window: {}", e);
                    elwt.exit();
                    return;
                }
            };
            match pollster::block_on(Gpu::new(w.clone())) {
                Ok(g) => gpu = Some(g),
                Err(e) => {
                    log::error!("{}", e);
                    elwt.exit();
                    return;
                }
            }
            let size = w.inner_size();
            editor.resize_surface(size.width.max(1), size.height.max(1));
            if let Some(path) = startup_image.take() {
                report("open", editor.open_image(&path));
            }
            window = Some(w);
        }

        Event::WindowEvent { event, window_id } => {
            let (Some(g), Some(w)) = (gpu.as_mut(), window.as_ref()) else {
                return;
            };
            if window_id != w.id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(new_size) => {
                    g.resize(new_size);
                    editor.resize_surface(new_size.width.max(1), new_size.height.max(1));
                    w.request_redraw();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed && !event.repeat {
                        if let PhysicalKey::Code(code) = event.physical_key {
                            handle_key(code, &mut editor);
                        }
                    }
                }
                WindowEvent::Touch(Touch {
                    phase,
                    location,
                    id,
                    ..
                }) => {
                    let at = to_point(location);
                    let touch = match phase {
                        TouchPhase::Started => Some(touches.press(id, at)),
                        TouchPhase::Moved => touches.moved(id, at),
                        TouchPhase::Ended | TouchPhase::Cancelled => touches.release(id),
                    };
                    if let Some(touch) = touch {
                        editor.handle_touch(&touch);
                    }
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => {
                    let touch = match state {
                        ElementState::Pressed => Some(touches.press(MOUSE_POINTER, cursor)),
                        ElementState::Released => touches.release(MOUSE_POINTER),
                    };
                    if let Some(touch) = touch {
                        editor.handle_touch(&touch);
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor = to_point(position);
                    if let Some(touch) = touches.moved(MOUSE_POINTER, cursor) {
                        editor.handle_touch(&touch);
                    }
                }
                WindowEvent::CursorLeft { .. } => {
                    if touches.release(MOUSE_POINTER).is_some() {
                        editor.cancel_gesture();
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let up = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y > 0.0,
                        MouseScrollDelta::PixelDelta(p) => p.y > 0.0,
                    };
                    let factor = if up {
                        editor.config().zoom_in_step
                    } else {
                        editor.config().zoom_out_step
                    };
                    report("zoom", editor.zoom_at(factor, cursor.x, cursor.y));
                }
                WindowEvent::Focused(false) => {
                    if touches.release_all().is_some() {
                        editor.cancel_gesture();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if let Err(e) = g.render(editor.surface_mut()) {
                        match e {
                            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                                g.reconfigure();
                                editor.surface_mut().dirty = true;
                            }
                            wgpu::SurfaceError::OutOfMemory => elwt.exit(),
                            other => log::warn!("{other:?}"),
                        }
                    }
                }
                _ => {}
            }
        }

        Event::AboutToWait => {
            let now = Instant::now();
            editor.tick(now);
            elwt.set_control_flow(ControlFlow::WaitUntil(now + TICK_INTERVAL));
            if let Some(w) = window.as_ref() {
                let status = format!("maskpaint - {}", editor.status_line());
                if status != title {
                    w.set_title(&status);
                    title = status;
                }
                if editor.surface().dirty {
                    w.request_redraw();
                }
            }
        }

        _ => {}
    });

    if let Err(e) = result {
        log::error!("Event loop error: {}", e);
    }
}
