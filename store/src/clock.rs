use agora_types::ChainContext;

/// The chain position new submissions are checked against: the height and
/// time of the last block the node has applied.
pub trait ChainClock: Send + Sync {
    fn tip(&self) -> ChainContext;
}

impl<T: ChainClock + ?Sized> ChainClock for std::sync::Arc<T> {
    fn tip(&self) -> ChainContext {
        (**self).tip()
    }
}
