//! Pipeline worker pool
//!
//! A fixed set of independent pipelines, each with its own engine
//! sessions. Free slot indices travel through a bounded channel; a
//! checked-out slot goes back on drop.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::ops::Deref;
use std::sync::Arc;
use tracing::{info, warn};

use super::dictionary::Dictionary;
use super::frame::Image;
use super::ocr::{OcrPipeline, TextResult};
use crate::config::OcrConfig;
use crate::error::OcrError;

pub struct PipelinePool {
    pipelines: Vec<OcrPipeline>,
    free_tx: Sender<usize>,
    free_rx: Receiver<usize>,
}

impl PipelinePool {
    /// Build `workers` pipelines sharing one dictionary and one validated config
    pub fn new(config: &OcrConfig, workers: usize) -> Result<Self, OcrError> {
        if workers == 0 {
            return Err(OcrError::EmptyPool);
        }

        let (det, rec) = config.validate()?;
        let det = Arc::new(det);
        let rec = Arc::new(rec);
        let dictionary = Arc::new(Dictionary::load(&config.dictionary.path)?);
        dictionary.check_expected_size(config.dictionary.expected_size);

        let pipelines = (0..workers)
            .map(|_| OcrPipeline::from_parts(det.clone(), rec.clone(), dictionary.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        info!("Pipeline pool ready with {} workers", workers);
        Self::from_pipelines(pipelines)
    }

    /// Build with the worker count from `[pool]`
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        Self::new(config, config.pool.workers)
    }

    /// Wrap already-built pipelines
    pub fn from_pipelines(pipelines: Vec<OcrPipeline>) -> Result<Self, OcrError> {
        if pipelines.is_empty() {
            return Err(OcrError::EmptyPool);
        }

        let (free_tx, free_rx) = bounded(pipelines.len());
        for index in 0..pipelines.len() {
            free_tx.send(index).map_err(|_| OcrError::PoolClosed)?;
        }

        Ok(Self {
            pipelines,
            free_tx,
            free_rx,
        })
    }

    pub fn size(&self) -> usize {
        self.pipelines.len()
    }

    /// Slots not currently checked out
    pub fn available(&self) -> usize {
        self.free_rx.len()
    }

    /// Block until a slot is free
    pub fn checkout(&self) -> Result<PipelineLease<'_>, OcrError> {
        let index = self.free_rx.recv().map_err(|_| OcrError::PoolClosed)?;
        Ok(PipelineLease { pool: self, index })
    }

    /// Take a free slot if there is one
    pub fn try_checkout(&self) -> Option<PipelineLease<'_>> {
        self.free_rx
            .try_recv()
            .ok()
            .map(|index| PipelineLease { pool: self, index })
    }

    /// Run one request on whichever slot frees up first
    pub fn infer(&self, image: &Image) -> Result<Vec<TextResult>, OcrError> {
        let lease = self.checkout()?;
        Ok(lease.infer(image))
    }

    fn release(&self, index: usize) {
        if let Err(TrySendError::Full(index) | TrySendError::Disconnected(index)) =
            self.free_tx.try_send(index)
        {
            warn!("Pipeline slot {} could not be returned to the pool", index);
        }
    }
}

/// Exclusive use of one pipeline until dropped
pub struct PipelineLease<'a> {
    pool: &'a PipelinePool,
    index: usize,
}

impl PipelineLease<'_> {
    pub fn slot(&self) -> usize {
        self.index
    }
}

impl Deref for PipelineLease<'_> {
    type Target = OcrPipeline;

    fn deref(&self) -> &OcrPipeline {
        &self.pool.pipelines[self.index]
    }
}

impl Drop for PipelineLease<'_> {
    fn drop(&mut self) {
        self.pool.release(self.index);
    }
}
