pub mod escrow;
pub mod export;
pub mod reconciler;
pub mod sweeper;
