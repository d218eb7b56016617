use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{prelude::*, tsv::OutputFile};

/// A vendor backend: fetch one day's payload, then flatten it into the day's
/// dump file.
///
/// The phases are split so that normalization can be exercised on canned
/// payloads without any transport in the way.
#[async_trait]
pub trait Source: Sync {
    type Payload: Send;

    #[instrument(skip_all)]
    async fn dump(&self, base_dir: &Path, on: NaiveDate) -> Result<OutputFile> {
        let payload = self.fetch(on).await?;
        self.normalize_and_write(base_dir, &payload)
    }

    /// Call the vendor API for the given local date.
    async fn fetch(&self, on: NaiveDate) -> Result<Self::Payload>;

    /// Flatten the payload into sorted records and write them out.
    fn normalize_and_write(&self, base_dir: &Path, payload: &Self::Payload)
    -> Result<OutputFile>;
}
