use crate::drivers::error::ScopeError;
use crate::drivers::source::PayloadSource;
use crate::sweep::{SweepOutcome, SweepScope};
/// High level pipeline that pulls payloads from a source into a scope.
pub struct SweepPipeline<S: PayloadSource> {
    source: S,
    scope: SweepScope,
}
impl<S: PayloadSource> SweepPipeline<S> {
    pub fn new(source: S, scope: SweepScope) -> Self {
        Self { source, scope }
    }
    /// Applies at most one payload. `Ok(None)` when the source had nothing ready.
    pub fn pump_once(&mut self) -> Result<Option<Vec<SweepOutcome>>, ScopeError> {
        let Some(payload) = self.source.next_payload()? else {
            return Ok(None);
        };
        let outcomes = self.scope.on_message(&payload)?;
        Ok(Some(outcomes))
    }
    /// Drains everything currently available. Rejected payloads are skipped.
    pub fn pump_all(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.pump_once() {
                Ok(Some(_)) => applied += 1,
                Ok(None) => break,
                Err(ScopeError::MalformedPayload(_)) => continue,
                Err(err) => {
                    log::warn!("stopping pump: {err}");
                    break;
                }
            }
        }
        applied
    }
    pub fn scope(&self) -> &SweepScope {
        &self.scope
    }
    pub fn scope_mut(&mut self) -> &mut SweepScope {
        &mut self.scope
    }
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}
