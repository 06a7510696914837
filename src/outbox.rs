use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::ServiceError;
use crate::service::{
    FingerprintBody, InpaintService, Reply, ReplyStatus, TaskPage, TaskRecord, TaskStatus,
    UploadKind, UploadReply, UploadRequest,
};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "png", "gif"];
const REQUEST_SUFFIX: &str = ".request.json";
const MASK_SUFFIX: &str = "_mask";
/// Suffix the processing side gives its output, e.g. `<md5>_lama.jpg`.
pub const RESULT_SUFFIX: &str = "_lama";

/// An offline service: uploads and submissions are spooled into a directory,
/// named the way the processing server stores them, for later hand-off.
pub struct OutboxService {
    dir: PathBuf,
}

/// File extension from the magic bytes, for the formats the server accepts.
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
        Some("jpg")
    } else if bytes.starts_with(&[0x89, 0x50, 0x4e, 0x47]) {
        Some("png")
    } else if bytes.starts_with(b"GIF") {
        Some("gif")
    } else {
        None
    }
}

impl OutboxService {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn find_image(&self, stem: &str) -> Option<PathBuf> {
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{stem}.{ext}")))
            .find(|p| p.exists())
    }

    fn image_path(&self, fingerprint: &str) -> Option<PathBuf> {
        self.find_image(fingerprint)
    }

    fn mask_path(&self, fingerprint: &str) -> Option<PathBuf> {
        self.find_image(&format!("{fingerprint}{MASK_SUFFIX}"))
    }

    fn result_path(&self, fingerprint: &str) -> Option<PathBuf> {
        self.find_image(&format!("{fingerprint}{RESULT_SUFFIX}"))
    }

    fn request_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{fingerprint}{REQUEST_SUFFIX}"))
    }

    fn write_request(&self, fingerprint: &str) -> Result<(), ServiceError> {
        let body = serde_json::to_string_pretty(&FingerprintBody {
            md5: fingerprint.to_string(),
        })?;
        fs::write(self.request_path(fingerprint), body)?;
        Ok(())
    }
}

impl InpaintService for OutboxService {
    fn upload(&self, request: &UploadRequest) -> Result<UploadReply, ServiceError> {
        let Some(ext) = sniff_extension(&request.bytes) else {
            return Ok(UploadReply {
                status: ReplyStatus::Error,
                message: "only JPG, PNG or GIF files are accepted".to_string(),
                md5: None,
                file_path: None,
            });
        };
        let suffix = match request.kind {
            UploadKind::Image => "",
            UploadKind::Mask => MASK_SUFFIX,
        };
        let path = self.dir.join(format!("{}{}.{}", request.fingerprint, suffix, ext));
        fs::write(&path, &request.bytes)?;
        log::info!("Spooled {} upload to {}", request.kind.as_str(), path.display());

        Ok(UploadReply {
            status: ReplyStatus::Success,
            message: "stored in outbox".to_string(),
            md5: Some(request.fingerprint.clone()),
            file_path: Some(path.to_string_lossy().into_owned()),
        })
    }

    fn submit(&self, fingerprint: &str) -> Result<Reply, ServiceError> {
        if self.image_path(fingerprint).is_none() || self.mask_path(fingerprint).is_none() {
            return Ok(Reply::error("image or mask not found"));
        }
        self.write_request(fingerprint)?;
        Ok(Reply::success("queued in outbox"))
    }

    /// Every spooled request is listed on a single page: completed once a
    /// result file sits next to it, pending until then.
    fn list_tasks(&self, _page: u32) -> Result<TaskPage, ServiceError> {
        let mut page = TaskPage {
            tasks: Default::default(),
            total: 0,
            page: 1,
            total_pages: 1,
        };
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(fingerprint) = name.strip_suffix(REQUEST_SUFFIX) else {
                continue;
            };
            let create_time = entry
                .metadata()?
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or_default();
            let record = if self.result_path(fingerprint).is_some() {
                TaskRecord {
                    status: TaskStatus::Completed,
                    create_time,
                    start_time: None,
                    end_time: None,
                    progress: 1.0,
                    message: "result available".to_string(),
                }
            } else {
                TaskRecord {
                    status: TaskStatus::Pending,
                    create_time,
                    start_time: None,
                    end_time: None,
                    progress: 0.0,
                    message: "waiting in outbox".to_string(),
                }
            };
            page.tasks.insert(fingerprint.to_string(), record);
        }
        page.total = page.tasks.len() as u64;
        Ok(page)
    }

    fn delete_task(&self, fingerprint: &str) -> Result<Reply, ServiceError> {
        let request = self.request_path(fingerprint);
        if !request.exists() {
            return Ok(Reply::error("task not found"));
        }
        fs::remove_file(request)?;
        let files = [
            self.image_path(fingerprint),
            self.mask_path(fingerprint),
            self.result_path(fingerprint),
        ];
        for path in files.into_iter().flatten() {
            fs::remove_file(path)?;
        }
        Ok(Reply::success("task deleted"))
    }

    fn reprocess(&self, fingerprint: &str) -> Result<Reply, ServiceError> {
        if !self.request_path(fingerprint).exists() {
            return Ok(Reply::error("task not found"));
        }
        self.write_request(fingerprint)?;
        Ok(Reply::success("queued in outbox again"))
    }

    fn fetch_image(&self, fingerprint: &str) -> Result<Vec<u8>, ServiceError> {
        match self.image_path(fingerprint) {
            Some(path) => Ok(fs::read(path)?),
            None => Err(ServiceError::Remote(format!("no image for {fingerprint}"))),
        }
    }

    fn fetch_mask(&self, fingerprint: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        self.mask_path(fingerprint)
            .map(fs::read)
            .transpose()
            .map_err(ServiceError::from)
    }

    fn fetch_result(&self, fingerprint: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        self.result_path(fingerprint)
            .map(fs::read)
            .transpose()
            .map_err(ServiceError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn test_sniff_extension() {
        assert_eq!(sniff_extension(&[0xff, 0xd8, 0xff, 0xe0]), Some("jpg"));
        assert_eq!(sniff_extension(&PNG_MAGIC), Some("png"));
        assert_eq!(sniff_extension(b"GIF89a"), Some("gif"));
        assert_eq!(sniff_extension(b"BM...."), None);
    }

    #[test]
    fn test_upload_uses_server_naming() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = OutboxService::new(dir.path()).unwrap();

        let reply = outbox
            .upload(&UploadRequest::image("abc", PNG_MAGIC.to_vec()))
            .unwrap();
        assert_eq!(reply.status, ReplyStatus::Success);
        assert!(dir.path().join("abc.png").exists());

        outbox
            .upload(&UploadRequest::mask("abc", PNG_MAGIC.to_vec()))
            .unwrap();
        assert!(dir.path().join("abc_mask.png").exists());

        let rejected = outbox
            .upload(&UploadRequest::image("abc", b"text".to_vec()))
            .unwrap();
        assert!(rejected.into_result().is_err());
    }

    #[test]
    fn test_submit_needs_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = OutboxService::new(dir.path()).unwrap();
        outbox
            .upload(&UploadRequest::image("abc", PNG_MAGIC.to_vec()))
            .unwrap();
        assert!(outbox.submit("abc").unwrap().into_result().is_err());

        outbox
            .upload(&UploadRequest::mask("abc", PNG_MAGIC.to_vec()))
            .unwrap();
        assert!(outbox.submit("abc").unwrap().into_result().is_ok());

        let page = outbox.list_tasks(1).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tasks["abc"].status, TaskStatus::Pending);
    }

    #[test]
    fn test_fetch_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = OutboxService::new(dir.path()).unwrap();
        assert!(outbox.fetch_mask("abc").unwrap().is_none());
        assert!(outbox.fetch_image("abc").is_err());

        outbox
            .upload(&UploadRequest::image("abc", PNG_MAGIC.to_vec()))
            .unwrap();
        outbox
            .upload(&UploadRequest::mask("abc", PNG_MAGIC.to_vec()))
            .unwrap();
        outbox.submit("abc").unwrap();
        assert_eq!(outbox.fetch_image("abc").unwrap(), PNG_MAGIC.to_vec());
        assert!(outbox.fetch_mask("abc").unwrap().is_some());
        assert!(outbox.reprocess("abc").unwrap().into_result().is_ok());

        assert!(outbox.delete_task("abc").unwrap().into_result().is_ok());
        assert!(outbox.list_tasks(1).unwrap().tasks.is_empty());
        assert!(!dir.path().join("abc.png").exists());
        assert!(outbox.delete_task("abc").unwrap().into_result().is_err());
    }

    #[test]
    fn test_result_completes_task_and_is_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = OutboxService::new(dir.path()).unwrap();
        outbox
            .upload(&UploadRequest::image("abc", PNG_MAGIC.to_vec()))
            .unwrap();
        outbox
            .upload(&UploadRequest::mask("abc", PNG_MAGIC.to_vec()))
            .unwrap();
        outbox.submit("abc").unwrap();
        assert!(outbox.fetch_result("abc").unwrap().is_none());
        assert_eq!(outbox.list_tasks(1).unwrap().tasks["abc"].status, TaskStatus::Pending);

        let result = dir.path().join(format!("abc{RESULT_SUFFIX}.png"));
        fs::write(&result, PNG_MAGIC).unwrap();
        assert_eq!(outbox.fetch_result("abc").unwrap(), Some(PNG_MAGIC.to_vec()));
        let page = outbox.list_tasks(1).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tasks["abc"].status, TaskStatus::Completed);

        outbox.delete_task("abc").unwrap();
        assert!(!result.exists());
    }
}
