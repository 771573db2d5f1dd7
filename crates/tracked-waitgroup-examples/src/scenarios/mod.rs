pub mod balanced;
pub mod forgotten_done;
pub mod slow_stragglers;
