use futures::future::poll_fn;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use tracing::{debug, error, trace};

use crate::error::RenderError;

use super::constants::{CONTENT_CONTAINER_TAG, UPGRADE_FUNCTION};
use super::gate::{Gate, SettlementClock};
use super::region::RegionTable;
use super::sink::OutputSink;
use super::tag_stack::TagStack;
use super::types::{RegionId, RegionState, RenderStats, StreamStatus};

struct ControllerState {
    sink: Box<dyn OutputSink>,
    status: StreamStatus,
    root_tags: TagStack,
    regions: RegionTable,
    new_gates: Vec<Gate>,
    gate_waker: Option<Waker>,
    upgrade_function: String,
    stats: RenderStats,
}

impl ControllerState {
    fn ensure_open(&self) -> Result<(), RenderError> {
        match self.status {
            StreamStatus::Open => Ok(()),
            StreamStatus::Closed | StreamStatus::Errored => Err(RenderError::StreamClosed),
        }
    }

    fn emit(&mut self, chunk: String) {
        self.stats.chunks_emitted += 1;
        self.stats.bytes_emitted += chunk.len();
        self.sink.enqueue(chunk);
    }
}

/// Decides where every chunk goes: straight to the sink, or into the buffer of a
/// pending suspense region that is flushed once its gate settles.
///
/// Clones share the same state. The lock is only held for the duration of a
/// single write and never across an await.
#[derive(Clone)]
pub struct StreamController {
    state: Arc<Mutex<ControllerState>>,
    clock: SettlementClock,
}

impl StreamController {
    pub fn new(sink: impl OutputSink) -> Self {
        Self::with_upgrade_function(sink, UPGRADE_FUNCTION)
    }

    pub fn with_upgrade_function(sink: impl OutputSink, upgrade_function: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState {
                sink: Box::new(sink),
                status: StreamStatus::Open,
                root_tags: TagStack::new(),
                regions: RegionTable::new(),
                new_gates: Vec::new(),
                gate_waker: None,
                upgrade_function: upgrade_function.to_string(),
                stats: RenderStats::default(),
            })),
            clock: SettlementClock::new(),
        }
    }

    pub fn allocate_region(&self) -> RegionId {
        let mut state = self.state.lock();
        let id = state.regions.allocate();
        state.stats.regions_allocated += 1;
        debug!(region = %id, "allocated suspense region");
        id
    }

    /// Gates `id` on `gate`, which is driven by [`await_all_gates`](Self::await_all_gates).
    pub fn register_gate<F>(&self, id: RegionId, gate: F) -> Result<(), RenderError>
    where
        F: Future<Output = Result<(), RenderError>> + Send + 'static,
    {
        self.add_gate(id, || Gate::inline(id, &self.clock, gate))
    }

    /// Gates `id` on `gate`, which starts running on its own task right away.
    pub fn spawn_gate<F>(&self, id: RegionId, gate: F) -> Result<(), RenderError>
    where
        F: Future<Output = Result<(), RenderError>> + Send + 'static,
    {
        self.add_gate(id, || Gate::spawned(id, &self.clock, gate))
    }

    fn add_gate(&self, id: RegionId, gate: impl FnOnce() -> Gate) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        let region = state.regions.pending_mut(id)?;
        if region.gated {
            return Err(RenderError::GateAlreadyRegistered(id));
        }
        region.gated = true;

        state.new_gates.push(gate());
        if let Some(waker) = state.gate_waker.take() {
            waker.wake();
        }

        debug!(region = %id, "registered suspense gate");
        Ok(())
    }

    pub fn open_tag(
        &self,
        name: &str,
        attributes: &str,
        region: Option<RegionId>,
    ) -> Result<(), RenderError> {
        let markup = format!("<{name}{attributes}>");
        let mut state = self.state.lock();
        state.ensure_open()?;

        match region {
            Some(id) => state.regions.pending_mut(id)?.open_tag(name, markup),
            None => {
                state.root_tags.push(name);
                state.emit(markup);
            }
        }

        trace!(tag = name, region = ?region, "open tag");
        Ok(())
    }

    pub fn write(&self, text: &str, region: Option<RegionId>) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        match region {
            Some(id) => state.regions.pending_mut(id)?.write(text),
            None => state.emit(text.to_string()),
        }

        trace!(len = text.len(), region = ?region, "write text");
        Ok(())
    }

    pub fn close_tag(&self, name: &str, region: Option<RegionId>) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        match region {
            Some(id) => state.regions.pending_mut(id)?.close_tag(name),
            None => {
                state.root_tags.pop(name);
                state.emit(format!("</{name}>"));
            }
        }

        trace!(tag = name, region = ?region, "close tag");
        Ok(())
    }

    /// Resolves once every registered gate has settled and been flushed, including
    /// gates registered while waiting. The first failed gate fails the stream.
    ///
    /// Regions flush in the order their gates completed, even when several are
    /// observed at once. Inline gates completing in the same pass are polled
    /// latest-registered first, so they also flush in that order.
    pub async fn await_all_gates(&self) -> Result<(), RenderError> {
        self.state.lock().ensure_open()?;

        let mut gates: Vec<Gate> = Vec::new();
        poll_fn(|cx| self.poll_gates(&mut gates, cx)).await
    }

    fn poll_gates(
        &self,
        gates: &mut Vec<Gate>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), RenderError>> {
        loop {
            {
                let mut state = self.state.lock();
                gates.append(&mut state.new_gates);
                if gates.is_empty() {
                    state.gate_waker = None;
                    return Poll::Ready(Ok(()));
                }
                state.gate_waker = Some(cx.waker().clone());
            }

            let mut settled = Vec::new();
            let mut index = gates.len();
            while index > 0 {
                index -= 1;
                if let Poll::Ready(settlement) = gates[index].poll_settled(cx) {
                    let gate = gates.remove(index);
                    settled.push((gate.id, settlement));
                }
            }
            settled.sort_by_key(|(_, settlement)| settlement.sequence);

            if settled.is_empty() {
                if self.state.lock().new_gates.is_empty() {
                    return Poll::Pending;
                }
                continue;
            }

            for (id, settlement) in settled {
                let outcome = match settlement.result {
                    Ok(()) => self.flush_region(id),
                    Err(e) => Err(self.fail_region(id, e)),
                };

                if let Err(e) = outcome {
                    gates.clear();
                    return Poll::Ready(Err(e));
                }
            }
        }
    }

    fn flush_region(&self, id: RegionId) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        let content = state.regions.pending_mut(id)?.take_content();
        let chunk = format!(
            "<{tag} id=\"{content_id}\">{content}</{tag}><script id=\"{script_id}\">{upgrade}('{id}')</script>",
            tag = CONTENT_CONTAINER_TAG,
            content_id = id.content_id(),
            script_id = id.script_id(),
            upgrade = state.upgrade_function,
        );

        state.stats.regions_flushed += 1;
        state.emit(chunk);

        debug!(region = %id, "flushed suspense region");
        Ok(())
    }

    fn fail_region(&self, id: RegionId, error: RenderError) -> RenderError {
        let error = match error {
            RenderError::RegionTimeout(timed_out, _) if timed_out == id => error,
            other => RenderError::region(id, other),
        };

        if let Ok(region) = self.state.lock().regions.get_mut(id) {
            region.state = RegionState::Failed;
        }

        self.fail(error.clone());
        error
    }

    /// Reports `error` to the sink. Only the first failure reaches it; later writes are refused.
    pub fn fail(&self, error: RenderError) {
        let mut state = self.state.lock();
        if state.status != StreamStatus::Open {
            return;
        }

        error!("Streaming render failed after {} bytes: {}", state.stats.bytes_emitted, error);

        state.status = StreamStatus::Errored;
        state.new_gates.clear();
        state.sink.error(error);
    }

    /// Closes the sink. Every region must have been flushed and every root tag closed.
    pub fn close(&self) -> Result<(), RenderError> {
        let mut state = self.state.lock();
        state.ensure_open()?;

        let pending = state.regions.pending_count();
        if pending > 0 {
            return Err(RenderError::PendingRegions(pending));
        }

        assert!(
            state.root_tags.is_empty(),
            "stream closed with {} unclosed tags (innermost <{}>)",
            state.root_tags.depth(),
            state.root_tags.innermost().unwrap_or_default()
        );

        state.status = StreamStatus::Closed;
        state.sink.close();
        debug!(
            chunks = state.stats.chunks_emitted,
            bytes = state.stats.bytes_emitted,
            "closed HTML stream"
        );
        Ok(())
    }

    pub fn status(&self) -> StreamStatus {
        self.state.lock().status
    }

    pub fn pending_regions(&self) -> usize {
        self.state.lock().regions.pending_count()
    }

    pub fn stats(&self) -> RenderStats {
        self.state.lock().stats.clone()
    }
}
