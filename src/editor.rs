use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::brush::{BrushMode, BrushSettings};
use crate::compositor::{self, Surface};
use crate::config::EditorConfig;
use crate::error::{EditError, ServiceError};
use crate::gesture::TouchEvent;
use crate::ingest::{self, ImageDocument};
use crate::jobs::{Dispatch, Job, JobOutcome, JobRunner};
use crate::service::InpaintService;
use crate::session::Session;
use crate::tasks::TaskBoard;
use crate::transform::ViewTransform;

/// An inpainting result shown in place of the session until closed.
struct Preview {
    document: ImageDocument,
    view: ViewTransform,
}

/// Application state behind the window. Every call that changes what is on
/// screen re-renders `surface` before returning.
pub struct Editor {
    config: EditorConfig,
    brush: BrushSettings,
    session: Option<Session>,
    preview: Option<Preview>,
    surface: Surface,
    jobs: JobRunner,
    tasks: TaskBoard,
}

impl Editor {
    pub fn new(
        config: EditorConfig,
        service: Arc<dyn InpaintService>,
        dispatch: Dispatch,
        width: u32,
        height: u32,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            brush: BrushSettings::new(config.brush_size),
            tasks: TaskBoard::new(config.poll_interval()),
            jobs: JobRunner::new(service, dispatch)?,
            surface: Surface::new(width, height),
            session: None,
            preview: None,
            config,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn brush(&self) -> &BrushSettings {
        &self.brush
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub fn tasks(&self) -> &TaskBoard {
        &self.tasks
    }

    pub fn jobs_in_flight(&self) -> usize {
        self.jobs.in_flight()
    }

    /// Fingerprint of the result on screen, if one is.
    pub fn previewing(&self) -> Option<&str> {
        self.preview.as_ref().map(|p| p.document.fingerprint())
    }

    /// One line summing up the editor, for the window title.
    pub fn status_line(&self) -> String {
        let mut line = match (&self.preview, &self.session) {
            (Some(preview), _) => format!("result {}", preview.document.fingerprint()),
            (None, Some(session)) => {
                let (w, h) = session.document().display_size();
                format!("{} {}x{}", session.fingerprint(), w, h)
            }
            (None, None) => "no image".to_string(),
        };
        line.push_str(&format!(
            " | {} {:.0}px",
            self.brush.mode.label(),
            self.brush.size
        ));
        let (pending, processing) = self.tasks.active_counts();
        line.push_str(&format!(
            " | tasks {} ({} pending, {} processing) page {}/{}",
            self.tasks.total(),
            pending,
            processing,
            self.tasks.page(),
            self.tasks.total_pages()
        ));
        if let Some(entry) = self.tasks.selected() {
            line.push_str(&format!(" | selected {}", entry.fingerprint));
        }
        if self.tasks.credentials_required() {
            line.push_str(" | credentials required");
        }
        line
    }

    /// Loads an image and starts a new session on it. On failure the current
    /// session is kept as it was.
    pub fn open_image(&mut self, path: &Path) -> Result<(), EditError> {
        let document = ingest::load(path, self.config.max_dimension)?;
        self.start_session(Session::new(document, self.config.history_capacity));
        Ok(())
    }

    pub fn open_bytes(&mut self, bytes: Vec<u8>) -> Result<(), EditError> {
        let document = ingest::load_bytes(bytes, self.config.max_dimension)?;
        self.start_session(Session::new(document, self.config.history_capacity));
        Ok(())
    }

    fn start_session(&mut self, mut session: Session) {
        session.fit(self.surface.width as f32, self.surface.height as f32);
        let (w, h) = session.document().display_size();
        log::info!("Editing {} ({}x{})", session.fingerprint(), w, h);
        self.session = Some(session);
        self.preview = None;
        self.render();
    }

    fn session_mut(&mut self) -> Result<&mut Session, EditError> {
        self.session.as_mut().ok_or(EditError::NoImage)
    }

    /// Touches are dropped while a result preview covers the mask.
    pub fn handle_touch(&mut self, event: &TouchEvent) -> bool {
        if self.preview.is_some() {
            return false;
        }
        let brush = self.brush;
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let changed = session.handle_touch(event, &brush);
        if changed {
            self.render();
        }
        changed
    }

    pub fn cancel_gesture(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.cancel_gesture();
        }
    }

    pub fn undo(&mut self) -> Result<(), EditError> {
        self.session_mut()?.undo()?;
        self.render();
        Ok(())
    }

    pub fn clear_mask(&mut self) -> Result<(), EditError> {
        self.session_mut()?.clear_mask();
        self.render();
        Ok(())
    }

    pub fn set_brush_mode(&mut self, mode: BrushMode) {
        if self.brush.mode != mode {
            log::info!("Brush mode: {}", mode.label());
        }
        self.brush.mode = mode;
    }

    pub fn adjust_brush_size(&mut self, delta: f32) {
        self.brush.adjust_size(delta);
        log::debug!("brush size {}", self.brush.size);
    }

    pub fn zoom_in(&mut self) -> Result<(), EditError> {
        self.zoom_centered(self.config.zoom_in_step)
    }

    pub fn zoom_out(&mut self) -> Result<(), EditError> {
        self.zoom_centered(self.config.zoom_out_step)
    }

    fn zoom_centered(&mut self, factor: f32) -> Result<(), EditError> {
        let cx = self.surface.width as f32 / 2.0;
        let cy = self.surface.height as f32 / 2.0;
        self.zoom_at(factor, cx, cy)
    }

    /// Zooms keeping the device point `(x, y)` fixed, e.g. under the mouse cursor.
    pub fn zoom_at(&mut self, factor: f32, x: f32, y: f32) -> Result<(), EditError> {
        self.session_mut()?.zoom_around_point(factor, x, y);
        self.render();
        Ok(())
    }

    pub fn fit(&mut self) -> Result<(), EditError> {
        let (w, h) = (self.surface.width as f32, self.surface.height as f32);
        self.session_mut()?.fit(w, h);
        self.render();
        Ok(())
    }

    pub fn reset_view(&mut self) -> Result<(), EditError> {
        self.session_mut()?.reset_view();
        self.render();
        Ok(())
    }

    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
        if let Some(preview) = self.preview.as_mut() {
            fit_document(&mut preview.view, &preview.document, &self.surface);
        }
        self.render();
    }

    /// Uploads the image if it never was, the mask if it changed since its
    /// last upload, then submits the pair. Everything sent is captured now.
    pub fn request_inpaint(&mut self) -> Result<(), EditError> {
        let session = self.session.as_ref().ok_or(EditError::NoImage)?;
        let image = session
            .needs_image_upload()
            .then(|| session.document().clone());
        let mask = session
            .mask_dirty()
            .then(|| (session.mask().clone(), session.mask_revision()));
        log::info!(
            "Requesting inpaint for {} (image upload: {}, mask upload: {})",
            session.fingerprint(),
            image.is_some(),
            mask.is_some()
        );
        let job = Job::Inpaint {
            fingerprint: session.fingerprint().to_string(),
            image,
            mask,
        };
        self.jobs.dispatch(job);
        Ok(())
    }

    /// Fetches the current task page. Returns false while a refresh is already
    /// running or the service wants new credentials.
    pub fn refresh_tasks(&mut self) -> bool {
        self.start_refresh(Instant::now())
    }

    fn start_refresh(&mut self, now: Instant) -> bool {
        if !self.tasks.can_refresh() {
            return false;
        }
        self.tasks.begin_refresh(now);
        self.jobs.dispatch(Job::ListTasks {
            page: self.tasks.page(),
        });
        true
    }

    pub fn show_task_page(&mut self, page: u32) -> bool {
        self.tasks.set_page(page) && self.refresh_tasks()
    }

    pub fn select_next_task(&mut self) {
        if let Some(entry) = self.tasks.select_next() {
            log::info!("Selected task {} ({:?})", entry.fingerprint, entry.record.status);
        }
    }

    pub fn select_prev_task(&mut self) {
        if let Some(entry) = self.tasks.select_prev() {
            log::info!("Selected task {} ({:?})", entry.fingerprint, entry.record.status);
        }
    }

    fn selected_task(&self) -> Option<String> {
        self.tasks.selected().map(|e| e.fingerprint.clone())
    }

    pub fn delete_task(&mut self, fingerprint: &str) {
        self.jobs.dispatch(Job::DeleteTask {
            fingerprint: fingerprint.to_string(),
        });
    }

    pub fn reprocess_task(&mut self, fingerprint: &str) {
        self.jobs.dispatch(Job::Reprocess {
            fingerprint: fingerprint.to_string(),
        });
    }

    /// Fetches a task's image and mask; they replace the current session
    /// once they arrive.
    pub fn open_task(&mut self, fingerprint: &str) {
        self.jobs.dispatch(Job::FetchTask {
            fingerprint: fingerprint.to_string(),
        });
    }

    /// Fetches a task's inpainted image and shows it until `close_preview`.
    pub fn open_result(&mut self, fingerprint: &str) {
        self.jobs.dispatch(Job::FetchResult {
            fingerprint: fingerprint.to_string(),
        });
    }

    /// Applies one of the task actions to the selected task. Returns false
    /// when nothing is selected.
    pub fn act_on_selected(&mut self, action: TaskAction) -> bool {
        let Some(fingerprint) = self.selected_task() else {
            return false;
        };
        match action {
            TaskAction::Open => self.open_task(&fingerprint),
            TaskAction::ShowResult => self.open_result(&fingerprint),
            TaskAction::Delete => self.delete_task(&fingerprint),
            TaskAction::Reprocess => self.reprocess_task(&fingerprint),
        }
        true
    }

    pub fn close_preview(&mut self) -> bool {
        if self.preview.take().is_none() {
            return false;
        }
        self.render();
        true
    }

    /// Resumes task polling after the service rejected the credentials.
    /// Obtaining new credentials is up to the service implementation.
    pub fn renew_credentials(&mut self) {
        self.tasks.credentials_renewed();
        self.refresh_tasks();
    }

    /// Applies finished background jobs and starts a poll when one is due.
    pub fn tick(&mut self, now: Instant) {
        for outcome in self.jobs.drain() {
            self.apply_outcome(outcome);
        }
        if self.tasks.poll_due(now) {
            log::debug!("polling active tasks");
            self.start_refresh(now);
        }
    }

    fn apply_outcome(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Inpaint {
                fingerprint,
                image_uploaded,
                mask_uploaded,
                result,
            } => {
                if let Some(session) = self.current(&fingerprint) {
                    if image_uploaded {
                        session.mark_image_uploaded();
                    }
                    if let Some(revision) = mask_uploaded {
                        session.mark_mask_uploaded(revision);
                    }
                }
                match result {
                    Ok(message) => {
                        log::info!("Inpaint submitted for {}: {}", fingerprint, message);
                        self.refresh_tasks();
                    }
                    Err(e) => self.service_failed("inpaint", e),
                }
            }
            JobOutcome::Tasks(result) => match result {
                Ok(page) => self.tasks.apply_page(page),
                Err(e) => {
                    self.tasks.refresh_failed();
                    self.service_failed("task list", e);
                }
            },
            JobOutcome::TaskUpdated {
                fingerprint,
                result,
            } => match result {
                Ok(message) => {
                    log::info!("Task {}: {}", fingerprint, message);
                    self.refresh_tasks();
                }
                Err(e) => self.service_failed("task update", e),
            },
            JobOutcome::TaskFetched {
                fingerprint,
                result,
            } => match result {
                Ok((image, mask)) => self.restore_task(fingerprint, image, mask),
                Err(e) => self.service_failed("task fetch", e),
            },
            JobOutcome::ResultFetched {
                fingerprint,
                result,
            } => match result {
                Ok(Some(bytes)) => self.show_result(fingerprint, bytes),
                Ok(None) => log::info!("No result for {} yet", fingerprint),
                Err(e) => self.service_failed("result fetch", e),
            },
        }
    }

    fn restore_task(&mut self, fingerprint: String, image: Vec<u8>, mask: Option<Vec<u8>>) {
        let max = self.config.max_dimension;
        match ingest::load_bytes_with_fingerprint(image, fingerprint, max) {
            Ok(document) => {
                let capacity = self.config.history_capacity;
                let session = Session::from_remote(document, mask.as_deref(), capacity);
                self.start_session(session);
            }
            Err(e) => log::warn!("Could not open task image: {}", e),
        }
    }

    fn show_result(&mut self, fingerprint: String, bytes: Vec<u8>) {
        let max = self.config.max_dimension;
        match ingest::load_bytes_with_fingerprint(bytes, fingerprint, max) {
            Ok(document) => {
                let mut view = ViewTransform::default();
                fit_document(&mut view, &document, &self.surface);
                log::info!("Showing result for {}", document.fingerprint());
                self.preview = Some(Preview { document, view });
                self.render();
            }
            Err(e) => log::warn!("Could not open result image: {}", e),
        }
    }

    /// The session, if it still belongs to `fingerprint`.
    fn current(&mut self, fingerprint: &str) -> Option<&mut Session> {
        self.session
            .as_mut()
            .filter(|s| s.fingerprint() == fingerprint)
    }

    fn service_failed(&mut self, what: &str, error: ServiceError) {
        if error.is_unauthorized() {
            self.tasks.require_credentials();
        } else {
            log::warn!("{} failed: {}", what, error);
        }
    }

    fn render(&mut self) {
        if let Some(preview) = &self.preview {
            compositor::render_image(&preview.document, &preview.view, &mut self.surface);
            return;
        }
        match &self.session {
            Some(session) => compositor::render(
                session.document(),
                session.mask(),
                session.view(),
                self.config.mask_opacity,
                &mut self.surface,
            ),
            None => self.surface.clear(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskAction {
    Open,
    ShowResult,
    Delete,
    Reprocess,
}

fn fit_document(view: &mut ViewTransform, document: &ImageDocument, surface: &Surface) {
    let (w, h) = document.display_size();
    view.fit_to_container(
        surface.width as f32,
        surface.height as f32,
        w as f32,
        h as f32,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Point;
    use crate::jobs::fake::RecordingService;
    use crate::service::{TaskRecord, TaskStatus};
    use std::io::Cursor;
    use std::time::Duration;

    fn png(width: u32, height: u32) -> Vec<u8> {
        solid_png(width, height, [40, 80, 120, 255])
    }

    fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(color));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn editor(service: Arc<RecordingService>) -> Editor {
        Editor::new(EditorConfig::default(), service, Dispatch::Inline, 200, 100).unwrap()
    }

    fn stroke(editor: &mut Editor, x: f32, y: f32) {
        editor.handle_touch(&TouchEvent::start(&[Point::new(x, y)]));
        editor.handle_touch(&TouchEvent::end(&[]));
    }

    fn task_page(ed: &mut Editor, fingerprints: &[&str]) {
        let tasks = fingerprints
            .iter()
            .enumerate()
            .map(|(i, fp)| {
                let record = TaskRecord {
                    status: TaskStatus::Completed,
                    create_time: i as f64,
                    start_time: None,
                    end_time: None,
                    progress: 1.0,
                    message: String::new(),
                };
                (fp.to_string(), record)
            })
            .collect();
        ed.tasks.apply_page(crate::service::TaskPage {
            tasks,
            total: fingerprints.len() as u64,
            page: 1,
            total_pages: 1,
        });
    }

    const DIMMED: [u8; 4] = [20, 40, 60, 255];
    const MASKED: [u8; 4] = [148, 168, 188, 255];

    #[test]
    fn test_edits_without_image_are_rejected() {
        let mut ed = editor(Arc::new(RecordingService::default()));
        assert!(matches!(ed.undo(), Err(EditError::NoImage)));
        assert!(matches!(ed.clear_mask(), Err(EditError::NoImage)));
        assert!(matches!(ed.zoom_in(), Err(EditError::NoImage)));
        assert!(matches!(ed.request_inpaint(), Err(EditError::NoImage)));
        assert!(!ed.handle_touch(&TouchEvent::start(&[Point::new(1.0, 1.0)])));
        assert_eq!(ed.jobs_in_flight(), 0);
    }

    #[test]
    fn test_open_fits_and_renders() {
        let mut ed = editor(Arc::new(RecordingService::default()));
        ed.open_bytes(png(50, 50)).unwrap();
        let view = *ed.session().unwrap().view();
        assert_eq!(view.scale, 2.0);
        assert_eq!((view.offset_x, view.offset_y), (50.0, 0.0));
        // Unmasked pixels are drawn under the half-opaque black mask.
        assert_eq!(ed.surface().get_pixel(100, 50), Some(DIMMED));
        assert_eq!(ed.surface().get_pixel(10, 50), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_stroke_undo_and_pan_reach_the_surface() {
        let mut ed = editor(Arc::new(RecordingService::default()));
        ed.open_bytes(png(50, 50)).unwrap();
        assert_eq!(ed.surface().get_pixel(100, 50), Some(DIMMED));

        stroke(&mut ed, 100.0, 50.0);
        assert_eq!(ed.surface().get_pixel(100, 50), Some(MASKED));
        assert_eq!(ed.surface().get_pixel(140, 50), Some(DIMMED));

        ed.undo().unwrap();
        assert_eq!(ed.surface().get_pixel(100, 50), Some(DIMMED));

        // Panning right by 60 moves the image's left edge from x = 50 to 110.
        ed.set_brush_mode(BrushMode::Move);
        ed.handle_touch(&TouchEvent::start(&[Point::new(100.0, 50.0)]));
        assert!(ed.handle_touch(&TouchEvent::moved(&[Point::new(160.0, 50.0)])));
        ed.handle_touch(&TouchEvent::end(&[]));
        assert_eq!(ed.surface().get_pixel(100, 50), Some([0, 0, 0, 0]));
        assert_eq!(ed.surface().get_pixel(110, 50), Some(DIMMED));
        assert!(ed.session().unwrap().mask().is_blank());
    }

    #[test]
    fn test_zoom_in_keeps_centre() {
        let mut ed = editor(Arc::new(RecordingService::default()));
        ed.open_bytes(png(50, 50)).unwrap();
        let before = ed.session().unwrap().view().to_image_space(100.0, 50.0);
        ed.zoom_in().unwrap();
        let view = *ed.session().unwrap().view();
        assert!((view.scale - 2.4).abs() < 1e-5);
        let after = view.to_image_space(100.0, 50.0);
        assert!((before.0 - after.0).abs() < 1e-4 && (before.1 - after.1).abs() < 1e-4);
    }

    #[test]
    fn test_brush_size_is_clamped() {
        let mut ed = editor(Arc::new(RecordingService::default()));
        assert_eq!(ed.brush().size, 10.0);
        ed.adjust_brush_size(500.0);
        assert_eq!(ed.brush().size, 200.0);
        ed.adjust_brush_size(-500.0);
        assert_eq!(ed.brush().size, 1.0);
    }

    #[test]
    fn test_inpaint_uploads_only_what_changed() {
        let service = Arc::new(RecordingService::default());
        let mut ed = editor(service.clone());
        ed.open_bytes(png(50, 50)).unwrap();
        let fp = ed.session().unwrap().fingerprint().to_string();

        stroke(&mut ed, 100.0, 50.0);
        assert!(ed.session().unwrap().mask_dirty());
        ed.request_inpaint().unwrap();
        ed.tick(Instant::now());
        assert!(!ed.session().unwrap().mask_dirty());
        assert!(!ed.session().unwrap().needs_image_upload());
        assert_eq!(
            service.calls(),
            [
                format!("upload:image:{fp}"),
                format!("upload:mask:{fp}"),
                format!("submit:{fp}"),
                "list:1".to_string(),
            ]
        );

        ed.request_inpaint().unwrap();
        assert_eq!(service.calls().last().unwrap(), &format!("submit:{fp}"));
        assert_eq!(service.calls().len(), 5);
    }

    #[test]
    fn test_unauthorized_suspends_refresh_until_renewed() {
        let service = Arc::new(RecordingService {
            unauthorized: true,
            ..Default::default()
        });
        let mut ed = editor(service.clone());
        assert!(ed.refresh_tasks());
        ed.tick(Instant::now());
        assert!(ed.tasks().credentials_required());
        assert!(ed.status_line().ends_with("credentials required"));
        assert!(!ed.refresh_tasks());
        assert_eq!(service.calls().len(), 1);

        ed.renew_credentials();
        assert_eq!(service.calls().len(), 2);
    }

    #[test]
    fn test_open_task_restores_remote_session() {
        let service = Arc::new(RecordingService::default());
        service
            .stored
            .lock()
            .unwrap()
            .insert("remote".to_string(), (png(30, 20), None));
        let mut ed = editor(service.clone());

        ed.open_task("remote");
        ed.tick(Instant::now());
        let session = ed.session().unwrap();
        assert_eq!(session.fingerprint(), "remote");
        assert_eq!(session.document().display_size(), (30, 20));
        assert!(session.mask().is_blank());
        assert!(!session.needs_image_upload());
    }

    #[test]
    fn test_selected_task_actions_reach_the_service() {
        let service = Arc::new(RecordingService::default());
        let mut ed = editor(service.clone());
        assert!(!ed.act_on_selected(TaskAction::Delete));

        task_page(&mut ed, &["older", "newer"]);
        ed.select_next_task();
        assert!(ed.status_line().ends_with("selected newer"));
        assert!(ed.act_on_selected(TaskAction::Delete));
        ed.tick(Instant::now());
        // A successful update lists the tasks again.
        assert_eq!(service.calls(), ["delete:newer", "list:1"]);

        ed.select_next_task();
        assert!(ed.act_on_selected(TaskAction::Reprocess));
        ed.tick(Instant::now());
        assert_eq!(
            service.calls()[2..],
            ["reprocess:older".to_string(), "list:1".to_string()]
        );
    }

    #[test]
    fn test_result_preview_replaces_view_until_closed() {
        let service = Arc::new(RecordingService::default());
        service
            .results
            .lock()
            .unwrap()
            .insert("done".to_string(), solid_png(50, 50, [200, 10, 10, 255]));
        let mut ed = editor(service.clone());
        ed.open_bytes(png(50, 50)).unwrap();

        ed.open_result("pending");
        ed.tick(Instant::now());
        assert!(ed.previewing().is_none());

        task_page(&mut ed, &["done"]);
        ed.select_next_task();
        assert!(ed.act_on_selected(TaskAction::ShowResult));
        ed.tick(Instant::now());
        assert_eq!(ed.previewing(), Some("done"));
        assert_eq!(ed.surface().get_pixel(100, 50), Some([200, 10, 10, 255]));
        assert!(ed.status_line().starts_with("result done"));

        // The mask underneath cannot be painted while the result is shown.
        assert!(!ed.handle_touch(&TouchEvent::start(&[Point::new(100.0, 50.0)])));
        assert!(ed.session().unwrap().mask().is_blank());

        assert!(ed.close_preview());
        assert!(!ed.close_preview());
        assert_eq!(ed.surface().get_pixel(100, 50), Some(DIMMED));
        assert_eq!(
            service.calls(),
            ["fetch-result:pending", "fetch-result:done"]
        );
    }

    #[test]
    fn test_touch_stays_responsive_while_service_blocks() {
        let delay = Duration::from_millis(1500);
        let service = Arc::new(RecordingService {
            delay,
            ..Default::default()
        });
        let mut ed =
            Editor::new(EditorConfig::default(), service, Dispatch::Pool, 200, 100).unwrap();
        ed.open_bytes(png(50, 50)).unwrap();
        for _ in 0..rayon::current_num_threads() + 2 {
            ed.delete_task("slow");
        }

        // Rendering a stroke uses the global rayon pool.
        let started = Instant::now();
        stroke(&mut ed, 100.0, 50.0);
        assert!(started.elapsed() < delay);
        assert_eq!(ed.surface().get_pixel(100, 50), Some(MASKED));
    }

    #[test]
    fn test_failed_open_keeps_session() {
        let mut ed = editor(Arc::new(RecordingService::default()));
        ed.open_bytes(png(50, 50)).unwrap();
        stroke(&mut ed, 100.0, 50.0);
        let before = ed.session().unwrap().mask().clone();
        let pixels = ed.surface().pixels.clone();

        assert!(ed.open_bytes(b"garbage".to_vec()).is_err());
        assert_eq!(ed.session().unwrap().mask(), &before);
        assert_eq!(ed.surface().pixels, pixels);
    }
}
