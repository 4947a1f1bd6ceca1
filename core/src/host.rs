//! Boundary to the host map editor. The engine only ever sees the host
//! through this trait; the real editor, test fakes, and the cli's scripted
//! host all implement it.

use roadlens_protocol::Envelope;

pub trait MapHost: Send + Sync {
    /// Current viewport zoom level.
    fn zoom(&self) -> u32;

    /// Current viewport extent in the host's projected spatial reference.
    fn extent(&self) -> Envelope;

    /// Editor rank of the signed-in user, used by partition permission
    /// predicates.
    fn editor_rank(&self) -> u32;
}
