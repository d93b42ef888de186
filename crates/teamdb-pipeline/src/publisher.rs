//! Remote publisher — upload changed artifacts, then the full index

use serde::Serialize;
use std::sync::Arc;
use teamdb_core::{Error, Record};
use teamdb_engine::archive::read_archive;
use teamdb_remote::{codec, RemoteStore, ResultUpload};
use tracing::{info, warn};
use uuid::Uuid;

/// What a publish pass got through before finishing or aborting.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct PublishReport {
    /// Records whose artifact was uploaded, in upload order.
    pub published: Vec<String>,
    /// Records selected for upload that had no archive.
    pub skipped: Vec<String>,
    /// The error that aborted publishing, if any.
    pub failure: Option<String>,
    pub index_uploaded: bool,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.index_uploaded
    }
}

/// A fresh identity key for a record that has never been published.
pub fn new_identity_key() -> String {
    Uuid::new_v4().simple().to_string()
}

pub struct Publisher {
    store: Arc<dyn RemoteStore>,
    description_tag: String,
}

impl Publisher {
    pub fn new(store: Arc<dyn RemoteStore>, description_tag: impl Into<String>) -> Self {
        Self {
            store,
            description_tag: description_tag.into(),
        }
    }

    /// Whether `record` has something to upload.
    pub fn selects(record: &Record) -> bool {
        record.changed || record.viewer_key.is_empty()
    }

    /// Upload the artifact of every changed or unkeyed record, then the index.
    ///
    /// The first failure stops the pass; records uploaded before it keep the
    /// identity the store returned and are listed in the report.
    pub async fn publish(&self, records: &mut [Record]) -> PublishReport {
        let mut report = PublishReport::default();

        for record in records.iter_mut().filter(|r| Self::selects(r)) {
            let label = record.label();
            let Some(archive) = record.archive.clone() else {
                warn!("{} has no archive, not uploading", label);
                report.skipped.push(label);
                continue;
            };

            match self.upload(record, &archive).await {
                Ok(id) => {
                    info!("uploaded {} as {}", label, id);
                    record.viewer_key = id;
                    report.published.push(label);
                }
                Err(e) => {
                    warn!("publishing aborted at {}: {}", label, e);
                    report.failure = Some(format!("{}: {}", label, e));
                    return report;
                }
            }
        }

        match self.store.upload_index(records).await {
            Ok(()) => {
                info!("uploaded index of {} records", records.len());
                report.index_uploaded = true;
            }
            Err(e) => {
                let e = Error::from(e);
                warn!("index upload failed: {}", e);
                report.failure = Some(format!("index: {}", e));
            }
        }
        report
    }

    async fn upload(&self, record: &Record, archive: &std::path::Path) -> teamdb_core::Result<String> {
        let key = if record.viewer_key.is_empty() {
            new_identity_key()
        } else {
            record.viewer_key.clone()
        };
        let gz = read_archive(archive).await?;
        let upload = ResultUpload {
            data: codec::encode(&gz),
            author: record.author.clone(),
            description: self.description_tag.clone(),
        };
        Ok(self.store.upload_result(&upload, &key).await?)
    }
}
