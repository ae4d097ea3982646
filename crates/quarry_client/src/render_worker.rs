use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use glam::Mat4;
use quarry_shared::block::BlockState;
use quarry_shared::entity::{EntitySnapshot, EntitySource};
use tracing::warn;

use crate::error::RenderError;
use crate::renderer::buffer::LayeredBuffers;
use crate::renderer::format::ENTITY_FORMAT;
use crate::renderer::pool;
use crate::renderer::quad::BakedModel;
use crate::settings::RenderSettings;

pub enum EntityBlockDraw {
    /// A block carried by an entity. Without an entity the worker thread's
    /// context keeps whatever position it was last given.
    Block {
        state: BlockState,
        entity: Option<EntitySnapshot>,
    },
    ItemFrame { frame: EntitySnapshot },
}

pub struct EntityBlockJob {
    pub id: u64,
    pub model: Arc<dyn BakedModel>,
    pub draw: EntityBlockDraw,
    pub transform: Mat4,
    pub overlay: u32,
    pub light: u32,
    pub tick_delta: f32,
}

pub type JobResult = Result<LayeredBuffers, RenderError>;

/// Renders entity-held blocks off the main thread. Every worker thread draws
/// through its own pooled render context.
pub struct RenderWorker {
    pool: ThreadPool,
    completed_rx: Receiver<(u64, JobResult)>,
    completed_tx: Sender<(u64, JobResult)>,
}

impl RenderWorker {
    pub fn new(settings: &RenderSettings) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(settings.worker_threads())
            .thread_name(|index| format!("entity-block-worker-{index}"))
            .build()?;
        let (completed_tx, completed_rx) = mpsc::channel();

        Ok(Self {
            pool,
            completed_rx,
            completed_tx,
        })
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn submit(&self, job: EntityBlockJob) {
        let completed_tx = self.completed_tx.clone();
        self.pool.spawn(move || {
            let result = run_job(&job);
            if let Err(err) = &result {
                warn!("Entity block job {} failed: {err}", job.id);
            }
            let _ = completed_tx.send((job.id, result));
        });
    }

    pub fn poll(&self) -> Vec<(u64, JobResult)> {
        let mut completed = Vec::new();
        while let Ok(result) = self.completed_rx.try_recv() {
            completed.push(result);
        }
        completed
    }

    /// Renders `jobs` in parallel and waits for all of them. Results are in
    /// job order.
    pub fn render_batch(&self, jobs: &[EntityBlockJob]) -> Vec<JobResult> {
        self.pool.install(|| jobs.par_iter().map(run_job).collect())
    }
}

fn run_job(job: &EntityBlockJob) -> JobResult {
    let mut buffers = LayeredBuffers::new(&ENTITY_FORMAT);
    pool::with(|context| {
        context.set_tick_delta(job.tick_delta);
        match &job.draw {
            EntityBlockDraw::Block { state, entity } => {
                context.set_pos_and_world_from_entity(
                    entity.as_ref().map(|entity| entity as &dyn EntitySource),
                );
                context.render_block(
                    job.model.as_ref(),
                    *state,
                    &job.transform,
                    &mut buffers,
                    job.overlay,
                    job.light,
                )
            }
            EntityBlockDraw::ItemFrame { frame } => context.render_item_frame(
                job.model.as_ref(),
                &job.transform,
                &mut buffers,
                job.overlay,
                job.light,
                frame,
            ),
        }
    })?;
    Ok(buffers)
}
