//! Background work against the inpainting service.
//!
//! Jobs carry copies of whatever editor state they need, taken when they are
//! dispatched; results come back through a channel drained on the UI thread.
//! Service calls block, so they get a pool of their own: the global rayon pool
//! stays free for rendering.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::ServiceError;
use crate::ingest::ImageDocument;
use crate::mask::MaskBuffer;
use crate::service::{InpaintService, TaskPage, UploadRequest};

/// Service calls that may be in progress at once.
pub const SERVICE_WORKERS: usize = 2;

pub enum Job {
    /// Uploads whatever is given, then submits the fingerprint for processing.
    Inpaint {
        fingerprint: String,
        image: Option<ImageDocument>,
        mask: Option<(MaskBuffer, u64)>,
    },
    ListTasks {
        page: u32,
    },
    DeleteTask {
        fingerprint: String,
    },
    Reprocess {
        fingerprint: String,
    },
    FetchTask {
        fingerprint: String,
    },
    FetchResult {
        fingerprint: String,
    },
}

#[derive(Debug)]
pub enum JobOutcome {
    Inpaint {
        fingerprint: String,
        image_uploaded: bool,
        mask_uploaded: Option<u64>,
        result: Result<String, ServiceError>,
    },
    Tasks(Result<TaskPage, ServiceError>),
    TaskUpdated {
        fingerprint: String,
        result: Result<String, ServiceError>,
    },
    TaskFetched {
        fingerprint: String,
        result: Result<(Vec<u8>, Option<Vec<u8>>), ServiceError>,
    },
    ResultFetched {
        fingerprint: String,
        result: Result<Option<Vec<u8>>, ServiceError>,
    },
}

fn upload_image(
    service: &dyn InpaintService,
    document: &ImageDocument,
) -> Result<(), ServiceError> {
    let bytes = document.upload_bytes()?;
    service
        .upload(&UploadRequest::image(document.fingerprint(), bytes))?
        .into_result()?;
    Ok(())
}

fn upload_mask(
    service: &dyn InpaintService,
    fingerprint: &str,
    mask: &MaskBuffer,
) -> Result<(), ServiceError> {
    let png = mask.to_png()?;
    service
        .upload(&UploadRequest::mask(fingerprint, png))?
        .into_result()?;
    Ok(())
}

impl Job {
    pub fn run(self, service: &dyn InpaintService) -> JobOutcome {
        match self {
            Job::Inpaint {
                fingerprint,
                image,
                mask,
            } => {
                let mut image_uploaded = false;
                let mut mask_uploaded = None;
                let result = (|| -> Result<String, ServiceError> {
                    if let Some(document) = &image {
                        upload_image(service, document)?;
                        image_uploaded = true;
                    }
                    if let Some((mask, revision)) = &mask {
                        upload_mask(service, &fingerprint, mask)?;
                        mask_uploaded = Some(*revision);
                    }
                    service.submit(&fingerprint)?.into_result()
                })();
                JobOutcome::Inpaint {
                    fingerprint,
                    image_uploaded,
                    mask_uploaded,
                    result,
                }
            }
            Job::ListTasks { page } => JobOutcome::Tasks(service.list_tasks(page)),
            Job::DeleteTask { fingerprint } => {
                let result = service
                    .delete_task(&fingerprint)
                    .and_then(|r| r.into_result());
                JobOutcome::TaskUpdated {
                    fingerprint,
                    result,
                }
            }
            Job::Reprocess { fingerprint } => {
                let result = service
                    .reprocess(&fingerprint)
                    .and_then(|r| r.into_result());
                JobOutcome::TaskUpdated {
                    fingerprint,
                    result,
                }
            }
            Job::FetchTask { fingerprint } => {
                let result = service
                    .fetch_image(&fingerprint)
                    .and_then(|image| Ok((image, service.fetch_mask(&fingerprint)?)));
                JobOutcome::TaskFetched {
                    fingerprint,
                    result,
                }
            }
            Job::FetchResult { fingerprint } => {
                let result = service.fetch_result(&fingerprint);
                JobOutcome::ResultFetched {
                    fingerprint,
                    result,
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Job::Inpaint { .. } => "inpaint",
            Job::ListTasks { .. } => "list-tasks",
            Job::DeleteTask { .. } => "delete-task",
            Job::Reprocess { .. } => "reprocess",
            Job::FetchTask { .. } => "fetch-task",
            Job::FetchResult { .. } => "fetch-result",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Run on the service worker pool.
    Pool,
    /// Run on the caller's thread (headless use).
    Inline,
}

pub struct JobRunner {
    service: Arc<dyn InpaintService>,
    workers: Option<ThreadPool>,
    tx: Sender<JobOutcome>,
    rx: Receiver<JobOutcome>,
    in_flight: usize,
}

impl JobRunner {
    pub fn new(service: Arc<dyn InpaintService>, dispatch: Dispatch) -> Result<Self, ServiceError> {
        let workers = match dispatch {
            Dispatch::Pool => Some(
                ThreadPoolBuilder::new()
                    .num_threads(SERVICE_WORKERS)
                    .thread_name(|i| format!("service-{i}"))
                    .build()?,
            ),
            Dispatch::Inline => None,
        };
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            service,
            workers,
            tx,
            rx,
            in_flight: 0,
        })
    }

    pub fn dispatch(&mut self, job: Job) {
        log::debug!("dispatching {} job", job.name());
        self.in_flight += 1;
        match &self.workers {
            Some(pool) => {
                let service = Arc::clone(&self.service);
                let tx = self.tx.clone();
                pool.spawn(move || {
                    let _ = tx.send(job.run(service.as_ref()));
                });
            }
            None => {
                let _ = self.tx.send(job.run(self.service.as_ref()));
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Finished outcomes, without blocking.
    pub fn drain(&mut self) -> Vec<JobOutcome> {
        let outcomes: Vec<JobOutcome> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(outcomes.len());
        outcomes
    }

    /// Blocks until one outcome arrives or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<JobOutcome> {
        let outcome = self.rx.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(outcome)
    }
}
